//! Per-origin count aggregation.
//!
//! Applies the same composed filter as the query path but groups by origin
//! and counts matches instead of joining attributes, sorting, or paginating.

use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::error::Result;
use crate::models::{CountResponse, QueryContext, RecordFilter};
use crate::origins;
use crate::query::{bind_params, compose_filter, fetch_indexed_origins};

/// Count records matching `filter` under `ctx`, grouped by origin.
///
/// `sort`, `reverse`, `offset` and `limit` on the filter are ignored here;
/// every other field carries the same semantics as [`crate::query::query`].
pub async fn count(
    pool: &SqlitePool,
    filter: &RecordFilter,
    ctx: &QueryContext,
) -> Result<CountResponse> {
    let composed = compose_filter(filter, ctx)?;

    let mut sql = String::from(
        "SELECT sites.origin, COUNT(records.id) AS hits \
         FROM records JOIN sites ON sites.id = records.site_id",
    );
    if composed.join_notifications {
        sql.push_str(" JOIN notifications ON notifications.record_id = records.id");
    }
    sql.push_str(" WHERE ");
    sql.push_str(&composed.clauses.join(" AND "));
    sql.push_str(" GROUP BY sites.origin ORDER BY sites.origin ASC");
    debug!(sql = %sql, "record count");

    let reconcile_with = composed
        .wants_reconciliation
        .then(|| composed.resolved.requested.as_deref())
        .flatten();

    let (rows, indexed) = tokio::try_join!(
        async {
            let rows = bind_params(&sql, &composed.params).fetch_all(pool).await?;
            Ok::<_, crate::error::Error>(rows)
        },
        fetch_indexed_origins(pool, reconcile_with),
    )?;

    let mut total: u64 = 0;
    let mut included_origins = Vec::with_capacity(rows.len());
    for row in &rows {
        let hits: i64 = row.get("hits");
        total += hits as u64;
        included_origins.push(row.get("origin"));
    }

    let missed_origins = match (&composed.resolved.requested, indexed) {
        (Some(requested), Some(indexed)) => Some(origins::missed_origins(requested, &indexed)),
        _ => None,
    };

    Ok(CountResponse {
        count: total,
        included_origins,
        missed_origins,
    })
}
