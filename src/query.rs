//! Record query composition and execution.
//!
//! One call produces at most three lookups: the main filtered/joined/sorted
//! record lookup, a secondary "which requested origins are indexed" lookup
//! issued concurrently with it, and a keyed attribute fetch for the rows the
//! main lookup returned. Filter composition is shared with the count path so
//! the two cannot drift.

use std::collections::HashMap;

use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::error::Result;
use crate::models::{QueryContext, QueryResponse, RecordFilter, PRIVATE_ORIGIN};
use crate::origins::{self, OriginScope, ResolvedOrigins};
use crate::pathspec::{self, PathPredicate};
use crate::reconstruct::{self, AttributeRow, NotificationRow, RecordRow};

/// Bind value for a dynamically composed query.
#[derive(Debug, Clone)]
pub(crate) enum QueryParam {
    Text(String),
    Int(i64),
}

/// A fully composed WHERE clause with its ordered bind parameters.
pub(crate) struct ComposedFilter {
    pub clauses: Vec<String>,
    pub params: Vec<QueryParam>,
    pub join_notifications: bool,
    pub resolved: ResolvedOrigins,
    /// Whether the secondary indexed-origins lookup applies: explicit
    /// origin filter, no links filter, no active notification filter.
    pub wants_reconciliation: bool,
}

/// Translate a [`RecordFilter`] into WHERE clauses and bind parameters.
///
/// Every filter contributes an independent predicate; predicates combine by
/// AND, and a list-valued path filter OR-combines its specs inside one
/// parenthesized clause. Sort and pagination are not part of the composed
/// filter; the query and count paths apply their own tails.
pub(crate) fn compose_filter(filter: &RecordFilter, ctx: &QueryContext) -> Result<ComposedFilter> {
    let resolved = origins::resolve_origins(filter.origin.as_ref(), ctx.permissions)?;

    let mut clauses = vec!["sites.indexed = 1".to_string()];
    let mut params: Vec<QueryParam> = Vec::new();

    match &resolved.scope {
        OriginScope::AllExceptPrivate => {
            clauses.push("sites.origin != ?".to_string());
            params.push(QueryParam::Text(PRIVATE_ORIGIN.to_string()));
        }
        OriginScope::IndexTargets => {
            clauses.push("sites.is_index_target = 1".to_string());
        }
        OriginScope::Origins(list) => {
            if list.is_empty() {
                clauses.push("1 = 0".to_string());
            } else {
                clauses.push(format!("sites.origin IN ({})", placeholders(list.len())));
                params.extend(list.iter().cloned().map(QueryParam::Text));
            }
        }
    }

    if let Some(path) = &filter.path {
        let mut alternatives = Vec::new();
        for spec in path.as_slice() {
            match pathspec::parse_path_spec(spec)? {
                PathPredicate::Exact(p) => {
                    alternatives.push("records.path = ?".to_string());
                    params.push(QueryParam::Text(p));
                }
                PathPredicate::Pattern {
                    prefix,
                    extension: Some(ext),
                } => {
                    alternatives
                        .push("(records.prefix = ? AND records.extension = ?)".to_string());
                    params.push(QueryParam::Text(prefix));
                    params.push(QueryParam::Text(ext));
                }
                PathPredicate::Pattern {
                    prefix,
                    extension: None,
                } => {
                    alternatives.push("records.prefix = ?".to_string());
                    params.push(QueryParam::Text(prefix));
                }
            }
        }
        clauses.push(format!("({})", alternatives.join(" OR ")));
    }

    if let Some(link) = &filter.links {
        clauses.push(
            "EXISTS (SELECT 1 FROM record_attributes ra \
             WHERE ra.record_id = records.id AND ra.key = 'link' AND ra.value = ?)"
                .to_string(),
        );
        params.push(QueryParam::Text(origins::normalize_url(link)));
    }

    let mut join_notifications = false;
    if let Some(notification) = filter.notification {
        if notification.is_active() {
            join_notifications = true;
            if notification.unread_only() {
                clauses.push("records.rtime > ?".to_string());
                params.push(QueryParam::Int(ctx.notification_rtime));
            }
        }
    }

    let wants_reconciliation =
        resolved.requested.is_some() && filter.links.is_none() && !join_notifications;

    Ok(ComposedFilter {
        clauses,
        params,
        join_notifications,
        resolved,
        wants_reconciliation,
    })
}

/// Query the index for records matching `filter` under `ctx`.
///
/// The main lookup and the indexed-origins lookup run concurrently; the
/// call completes only after both resolve, and a failure from either
/// propagates immediately.
pub async fn query(
    pool: &SqlitePool,
    filter: &RecordFilter,
    ctx: &QueryContext,
) -> Result<QueryResponse> {
    let composed = compose_filter(filter, ctx)?;
    let sql = build_record_select(&composed, filter);
    debug!(sql = %sql, "record query");

    let reconcile_with = composed
        .wants_reconciliation
        .then(|| composed.resolved.requested.as_deref())
        .flatten();

    let (rows, indexed) = tokio::try_join!(
        fetch_record_rows(pool, &sql, &composed.params, composed.join_notifications),
        fetch_indexed_origins(pool, reconcile_with),
    )?;

    let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();
    let mut attributes = fetch_attributes(pool, &ids).await?;

    let records = rows
        .into_iter()
        .map(|row| {
            let attrs = attributes.remove(&row.id).unwrap_or_default();
            reconstruct::build_record(row, attrs, ctx)
        })
        .collect();

    let missed_origins = match (&composed.resolved.requested, indexed) {
        (Some(requested), Some(indexed)) => Some(origins::missed_origins(requested, &indexed)),
        _ => None,
    };

    Ok(QueryResponse {
        records,
        missed_origins,
    })
}

/// `?, ?, ...` for an IN list of `n` values.
pub(crate) fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

/// Bind composed parameters onto a query in order.
pub(crate) fn bind_params<'q>(
    sql: &'q str,
    params: &'q [QueryParam],
) -> sqlx::query::Query<'q, sqlx::Sqlite, sqlx::sqlite::SqliteArguments<'q>> {
    let mut q = sqlx::query(sql);
    for param in params {
        q = match param {
            QueryParam::Text(s) => q.bind(s.as_str()),
            QueryParam::Int(i) => q.bind(*i),
        };
    }
    q
}

fn build_record_select(composed: &ComposedFilter, filter: &RecordFilter) -> String {
    let mut sql = String::from(
        "SELECT records.id, records.path, records.ctime, records.mtime, records.rtime, \
         sites.origin, sites.title",
    );
    if composed.join_notifications {
        sql.push_str(
            ", notifications.key AS notification_key, \
             notifications.subject_origin, notifications.subject_path",
        );
    }
    sql.push_str(" FROM records JOIN sites ON sites.id = records.site_id");
    if composed.join_notifications {
        sql.push_str(" JOIN notifications ON notifications.record_id = records.id");
    }
    sql.push_str(" WHERE ");
    sql.push_str(&composed.clauses.join(" AND "));

    sql.push_str(" ORDER BY ");
    sql.push_str(filter.sort.sql());
    sql.push_str(if filter.reverse { " DESC" } else { " ASC" });
    // Deterministic tiebreak so pagination never overlaps or gaps.
    sql.push_str(", records.id ASC");

    // LIMIT -1 is SQLite's "unlimited"; it lets OFFSET compose with an
    // omitted limit.
    sql.push_str(&format!(
        " LIMIT {} OFFSET {}",
        filter.limit.unwrap_or(-1),
        filter.offset.max(0)
    ));
    sql
}

async fn fetch_record_rows(
    pool: &SqlitePool,
    sql: &str,
    params: &[QueryParam],
    with_notifications: bool,
) -> Result<Vec<RecordRow>> {
    let rows = bind_params(sql, params).fetch_all(pool).await?;

    Ok(rows
        .iter()
        .map(|row| RecordRow {
            id: row.get("id"),
            path: row.get("path"),
            ctime: row.get("ctime"),
            mtime: row.get("mtime"),
            rtime: row.get("rtime"),
            origin: row.get("origin"),
            title: row.get("title"),
            notification: with_notifications.then(|| NotificationRow {
                key: row.get("notification_key"),
                subject_origin: row.get("subject_origin"),
                subject_path: row.get("subject_path"),
            }),
        })
        .collect())
}

/// Secondary lookup: which of the requested origins are currently indexed.
/// Skipped entirely (returns `None`) when reconciliation does not apply.
pub(crate) async fn fetch_indexed_origins(
    pool: &SqlitePool,
    requested: Option<&[String]>,
) -> Result<Option<Vec<String>>> {
    let Some(requested) = requested else {
        return Ok(None);
    };
    if requested.is_empty() {
        return Ok(Some(Vec::new()));
    }

    let sql = format!(
        "SELECT origin FROM sites WHERE indexed = 1 AND origin IN ({})",
        placeholders(requested.len())
    );
    let mut q = sqlx::query(&sql);
    for origin in requested {
        q = q.bind(origin.as_str());
    }
    let rows = q.fetch_all(pool).await?;

    Ok(Some(rows.iter().map(|row| row.get("origin")).collect()))
}

/// Keyed attribute fetch: all attribute rows for the given record ids,
/// grouped by record id with stored order preserved.
async fn fetch_attributes(
    pool: &SqlitePool,
    record_ids: &[i64],
) -> Result<HashMap<i64, Vec<AttributeRow>>> {
    let mut grouped: HashMap<i64, Vec<AttributeRow>> = HashMap::new();
    if record_ids.is_empty() {
        return Ok(grouped);
    }

    let sql = format!(
        "SELECT record_id, key, value FROM record_attributes \
         WHERE record_id IN ({}) ORDER BY record_id, id",
        placeholders(record_ids.len())
    );
    let mut q = sqlx::query(&sql);
    for id in record_ids {
        q = q.bind(*id);
    }
    let rows = q.fetch_all(pool).await?;

    for row in &rows {
        let record_id: i64 = row.get("record_id");
        grouped.entry(record_id).or_default().push(AttributeRow {
            key: row.get("key"),
            value: row.get("value"),
        });
    }
    Ok(grouped)
}
