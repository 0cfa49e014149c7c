//! # peerdex CLI (`pdx`)
//!
//! Read-only queries against an existing index database. The index is
//! produced elsewhere; `pdx` never writes to it.
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pdx sites` | List known sites, optionally filtered |
//! | `pdx query` | Query records with filters, sorting, pagination |
//! | `pdx count` | Count matching records per origin |
//!
//! ## Examples
//!
//! ```bash
//! pdx sites --search blog
//! pdx query --origin mesh://alice --path '/posts/*.md' --sort crtime --limit 20
//! pdx query --notifications --unread --notification-rtime 2026-08-01
//! pdx count --origin mesh://alice --origin mesh://bob
//! ```

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use peerdex::models::{
    NotificationFilter, OneOrMany, Permissions, QueryContext, RecordFilter, SiteFilter, SortField,
};
use peerdex::{config, count, db, list_sites, query};

/// peerdex CLI — query a local index of peer-distributed sites.
#[derive(Parser)]
#[command(
    name = "pdx",
    about = "peerdex — a read-only query engine over a local index of peer-distributed sites",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    #[arg(long, global = true, default_value = "./config/pdx.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List known sites.
    Sites {
        /// Substring match against site title or description.
        #[arg(long)]
        search: Option<String>,

        /// Only writable (true) or read-only (false) sites.
        #[arg(long)]
        writable: Option<bool>,

        #[arg(long, default_value_t = 0)]
        offset: i64,

        /// Maximum number of sites to return (unlimited when omitted).
        #[arg(long)]
        limit: Option<i64>,
    },

    /// Query records.
    Query {
        /// Restrict to an origin; repeat for a set of origins.
        #[arg(long = "origin")]
        origins: Vec<String>,

        /// Path spec (exact path or pattern like '/blog/*.md'); repeatable.
        #[arg(long = "path")]
        paths: Vec<String>,

        /// Restrict to records linking to this target URL.
        #[arg(long)]
        link: Option<String>,

        /// Only records with an associated notification.
        #[arg(long)]
        notifications: bool,

        /// Only records with an unread notification (implies --notifications).
        #[arg(long)]
        unread: bool,

        /// Sort key: ctime, mtime, rtime, path, origin, crtime, or mrtime.
        #[arg(long, default_value = "rtime")]
        sort: String,

        /// Flip the sort direction.
        #[arg(long)]
        reverse: bool,

        #[arg(long, default_value_t = 0)]
        offset: i64,

        /// Maximum number of records to return (unlimited when omitted).
        #[arg(long)]
        limit: Option<i64>,

        /// Act with the capability to see the private origin.
        #[arg(long)]
        include_private: bool,

        /// Read-state threshold: epoch milliseconds or YYYY-MM-DD.
        #[arg(long)]
        notification_rtime: Option<String>,
    },

    /// Count matching records per origin.
    Count {
        /// Restrict to an origin; repeat for a set of origins.
        #[arg(long = "origin")]
        origins: Vec<String>,

        /// Path spec (exact path or pattern like '/blog/*.md'); repeatable.
        #[arg(long = "path")]
        paths: Vec<String>,

        /// Restrict to records linking to this target URL.
        #[arg(long)]
        link: Option<String>,

        /// Only records with an associated notification.
        #[arg(long)]
        notifications: bool,

        /// Only records with an unread notification (implies --notifications).
        #[arg(long)]
        unread: bool,

        /// Act with the capability to see the private origin.
        #[arg(long)]
        include_private: bool,

        /// Read-state threshold: epoch milliseconds or YYYY-MM-DD.
        #[arg(long)]
        notification_rtime: Option<String>,
    },
}

fn one_or_many(values: Vec<String>) -> Option<OneOrMany<String>> {
    match values.len() {
        0 => None,
        1 => Some(values.into_iter().next().unwrap().into()),
        _ => Some(values.into()),
    }
}

fn notification_filter(notifications: bool, unread: bool) -> Option<NotificationFilter> {
    if unread {
        Some(NotificationFilter::Unread { unread: true })
    } else if notifications {
        Some(NotificationFilter::Flag(true))
    } else {
        None
    }
}

/// Parse a read-state threshold given as epoch milliseconds or YYYY-MM-DD.
fn parse_rtime(value: &str) -> anyhow::Result<i64> {
    if let Ok(millis) = value.parse::<i64>() {
        return Ok(millis);
    }
    let date = chrono::NaiveDate::parse_from_str(value, "%Y-%m-%d")?;
    Ok(date
        .and_hms_opt(0, 0, 0)
        .unwrap()
        .and_utc()
        .timestamp_millis())
}

fn query_context(include_private: bool, notification_rtime: Option<String>) -> anyhow::Result<QueryContext> {
    Ok(QueryContext {
        permissions: Permissions {
            read_private: include_private,
        },
        notification_rtime: match notification_rtime {
            Some(value) => parse_rtime(&value)?,
            None => 0,
        },
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .init();

    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;
    let pool = db::connect(&cfg).await?;

    match cli.command {
        Commands::Sites {
            search,
            writable,
            offset,
            limit,
        } => {
            let filter = SiteFilter {
                search,
                writable,
                offset,
                limit,
            };
            let sites = list_sites(&pool, &filter).await?;
            println!("{}", serde_json::to_string_pretty(&sites)?);
        }
        Commands::Query {
            origins,
            paths,
            link,
            notifications,
            unread,
            sort,
            reverse,
            offset,
            limit,
            include_private,
            notification_rtime,
        } => {
            let filter = RecordFilter {
                origin: one_or_many(origins),
                path: one_or_many(paths),
                links: link,
                notification: notification_filter(notifications, unread),
                sort: sort.parse::<SortField>()?,
                reverse,
                offset,
                limit,
            };
            let ctx = query_context(include_private, notification_rtime)?;
            let response = query(&pool, &filter, &ctx).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Commands::Count {
            origins,
            paths,
            link,
            notifications,
            unread,
            include_private,
            notification_rtime,
        } => {
            let filter = RecordFilter {
                origin: one_or_many(origins),
                path: one_or_many(paths),
                links: link,
                notification: notification_filter(notifications, unread),
                ..Default::default()
            };
            let ctx = query_context(include_private, notification_rtime)?;
            let response = count(&pool, &filter, &ctx).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
    }

    pool.close().await;
    Ok(())
}
