//! # peerdex
//!
//! A read-only query engine over a local SQLite index of peer-distributed
//! sites and the records they publish.
//!
//! The index itself is maintained by an external crawler/indexer; peerdex
//! only composes and runs lookups against it, reconstitutes denormalized
//! attribute rows into structured record descriptions, and reconciles which
//! requested origins are actually present in the index.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────────┐   ┌──────────────┐
//! │ Indexer  │──▶│    SQLite      │◀──│   peerdex     │
//! │ (extern) │   │ sites/records │   │ query/count/  │
//! └──────────┘   │ attrs/notifs  │   │ list_sites    │
//!                └───────────────┘   └──────┬───────┘
//!                                           │
//!                                     ┌─────┴─────┐
//!                                     │ CLI (pdx) │
//!                                     └───────────┘
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Filters, contexts, and description projections |
//! | [`origins`] | Origin normalization, privacy scoping, reconciliation |
//! | [`pathspec`] | Simple path-spec parsing |
//! | [`query`] | Record query composition and execution |
//! | [`count`] | Per-origin count aggregation |
//! | [`sites`] | Site listing |
//! | [`db`] | Database connection |
//! | [`fixtures`] | Test schema and seed helpers |

pub mod config;
pub mod count;
pub mod db;
pub mod error;
pub mod fixtures;
pub mod models;
pub mod origins;
pub mod pathspec;
pub mod query;
mod reconstruct;
pub mod sites;

pub use count::count;
pub use error::{Error, Result};
pub use query::query;
pub use sites::list_sites;
