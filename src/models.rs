//! Core data models used throughout peerdex.
//!
//! These types represent the filters callers hand to the query engine and
//! the description projections it hands back. Descriptions are derived,
//! read-only views; nothing here is ever persisted.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Reserved origin for the caller's own private site. Hidden from any
/// caller whose permission context lacks the private-read capability.
pub const PRIVATE_ORIGIN: &str = "private-origin";

/// Attribute key holding a record's resolved body. At most one per record.
pub const ATTR_CONTENT: &str = "content";

/// Attribute key holding one outbound link target. Zero or more per record.
pub const ATTR_LINK: &str = "link";

/// A filter value that may be a single item or a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    /// View the value as a slice regardless of which form was given.
    pub fn as_slice(&self) -> &[T] {
        match self {
            OneOrMany::One(v) => std::slice::from_ref(v),
            OneOrMany::Many(v) => v.as_slice(),
        }
    }
}

impl<T> From<T> for OneOrMany<T> {
    fn from(v: T) -> Self {
        OneOrMany::One(v)
    }
}

impl<T> From<Vec<T>> for OneOrMany<T> {
    fn from(v: Vec<T>) -> Self {
        OneOrMany::Many(v)
    }
}

/// Notification filter: a bare flag (notification required, any read state)
/// or a structured form that additionally constrains read state.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(untagged)]
pub enum NotificationFilter {
    Flag(bool),
    Unread { unread: bool },
}

impl NotificationFilter {
    /// Whether the filter requires a joined notification row at all.
    /// `Flag(false)` is treated as "no notification filter".
    pub fn is_active(self) -> bool {
        match self {
            NotificationFilter::Flag(required) => required,
            NotificationFilter::Unread { .. } => true,
        }
    }

    /// Whether only unread notifications should match.
    pub fn unread_only(self) -> bool {
        matches!(self, NotificationFilter::Unread { unread: true })
    }
}

/// Sort key for record queries.
///
/// `Crtime` and `Mrtime` are computed composites: the first time content
/// became visible by either creation/modification or indexing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    Ctime,
    Mtime,
    #[default]
    Rtime,
    Path,
    Origin,
    /// `min(ctime, rtime)`
    Crtime,
    /// `min(mtime, rtime)`
    Mrtime,
}

impl SortField {
    /// SQL expression for this sort key against the joined record row.
    pub(crate) fn sql(self) -> &'static str {
        match self {
            SortField::Ctime => "records.ctime",
            SortField::Mtime => "records.mtime",
            SortField::Rtime => "records.rtime",
            SortField::Path => "records.path",
            SortField::Origin => "sites.origin",
            SortField::Crtime => "MIN(records.ctime, records.rtime)",
            SortField::Mrtime => "MIN(records.mtime, records.rtime)",
        }
    }
}

impl std::str::FromStr for SortField {
    type Err = crate::error::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ctime" => Ok(SortField::Ctime),
            "mtime" => Ok(SortField::Mtime),
            "rtime" => Ok(SortField::Rtime),
            "path" => Ok(SortField::Path),
            "origin" => Ok(SortField::Origin),
            "crtime" => Ok(SortField::Crtime),
            "mrtime" => Ok(SortField::Mrtime),
            other => Err(crate::error::Error::InvalidInput(format!(
                "unknown sort field: {}. Use ctime, mtime, rtime, path, origin, crtime, or mrtime.",
                other
            ))),
        }
    }
}

/// Filter for `query` and `count`.
///
/// All fields are optional and combine by AND; a list-valued `path`
/// OR-combines its individual specs. `sort`, `reverse`, `offset` and
/// `limit` only apply to the `query` path.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RecordFilter {
    /// Restrict to one origin or a set of origins. Values are normalized
    /// during resolution; raw caller input is never mutated.
    pub origin: Option<OneOrMany<String>>,
    /// One or more path specs (exact path or prefix/extension pattern).
    pub path: Option<OneOrMany<String>>,
    /// Restrict to records carrying an outbound link to this target URL.
    pub links: Option<String>,
    /// Require an associated notification, optionally unread-only.
    pub notification: Option<NotificationFilter>,
    pub sort: SortField,
    pub reverse: bool,
    pub offset: i64,
    /// Omitted limit means unlimited.
    pub limit: Option<i64>,
}

/// Filter for `list_sites`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SiteFilter {
    /// Substring match against site title or description.
    pub search: Option<String>,
    pub writable: Option<bool>,
    pub offset: i64,
    pub limit: Option<i64>,
}

/// Caller capabilities relevant to index queries.
#[derive(Debug, Clone, Copy, Default)]
pub struct Permissions {
    /// May the caller see the reserved private origin?
    pub read_private: bool,
}

/// Per-call context for `query` and `count`.
#[derive(Debug, Clone, Copy, Default)]
pub struct QueryContext {
    pub permissions: Permissions,
    /// Threshold for notification read state: a notification is unread iff
    /// its record's `rtime` is strictly greater than this value.
    pub notification_rtime: i64,
}

/// Site projection returned by `list_sites`.
#[derive(Debug, Clone, Serialize)]
pub struct SiteDescription {
    pub url: String,
    pub title: String,
    pub description: String,
    pub writable: bool,
    pub indexed: bool,
}

/// The site a record belongs to, as embedded in a [`RecordDescription`].
#[derive(Debug, Clone, Serialize)]
pub struct SiteRef {
    pub url: String,
    pub title: String,
}

/// Index-derived state of a record: when it was last indexed and the
/// outbound links collected from it, in stored order.
#[derive(Debug, Clone, Serialize)]
pub struct IndexState {
    pub rtime: i64,
    pub links: Vec<String>,
}

/// Notification attached to a record, with read state resolved against the
/// caller's threshold.
#[derive(Debug, Clone, Serialize)]
pub struct NotificationDescription {
    pub key: String,
    pub subject: String,
    pub unread: bool,
}

/// Record projection returned by `query`.
#[derive(Debug, Clone, Serialize)]
pub struct RecordDescription {
    pub url: String,
    pub path: String,
    pub ctime: i64,
    pub mtime: i64,
    pub metadata: HashMap<String, String>,
    pub index: IndexState,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    pub site: SiteRef,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notification: Option<NotificationDescription>,
}

/// Result of `query`.
///
/// `missed_origins` is `Some` only when the reconciliation lookup ran
/// (explicit origin filter, no links/notification filter); callers can
/// distinguish "not computed" from "computed, empty".
#[derive(Debug, Clone, Serialize)]
pub struct QueryResponse {
    pub records: Vec<RecordDescription>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missed_origins: Option<Vec<String>>,
}

/// Result of `count`.
#[derive(Debug, Clone, Serialize)]
pub struct CountResponse {
    /// Total matching records across all included origins.
    pub count: u64,
    /// Origins that had at least one match, in origin order.
    pub included_origins: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub missed_origins: Option<Vec<String>>,
}
