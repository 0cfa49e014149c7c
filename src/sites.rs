//! Site listing.
//!
//! A simpler, independent path from record queries: paginated site
//! descriptions with an optional substring match against title or
//! description and an optional writability filter. No privacy gating is
//! applied here; the private origin appears in listings for every caller.

use sqlx::{Row, SqlitePool};
use tracing::debug;

use crate::error::Result;
use crate::models::{SiteDescription, SiteFilter};
use crate::origins;
use crate::query::QueryParam;

/// Escape `%`, `_` and `\` in a LIKE pattern operand.
fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

/// List known sites matching `filter`, ordered by origin.
pub async fn list_sites(pool: &SqlitePool, filter: &SiteFilter) -> Result<Vec<SiteDescription>> {
    let mut clauses: Vec<String> = Vec::new();
    let mut params: Vec<QueryParam> = Vec::new();

    if let Some(writable) = filter.writable {
        clauses.push("sites.writable = ?".to_string());
        params.push(QueryParam::Int(i64::from(writable)));
    }

    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", escape_like(search));
        clauses.push(
            "(sites.title LIKE ? ESCAPE '\\' OR sites.description LIKE ? ESCAPE '\\')".to_string(),
        );
        params.push(QueryParam::Text(pattern.clone()));
        params.push(QueryParam::Text(pattern));
    }

    let mut sql = String::from(
        "SELECT sites.origin, sites.title, sites.description, sites.writable, sites.indexed \
         FROM sites",
    );
    if !clauses.is_empty() {
        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
    sql.push_str(" ORDER BY sites.origin ASC");
    sql.push_str(&format!(
        " LIMIT {} OFFSET {}",
        filter.limit.unwrap_or(-1),
        filter.offset.max(0)
    ));
    debug!(sql = %sql, "site listing");

    let mut q = sqlx::query(&sql);
    for param in &params {
        q = match param {
            QueryParam::Text(s) => q.bind(s.as_str()),
            QueryParam::Int(i) => q.bind(*i),
        };
    }
    let rows = q.fetch_all(pool).await?;

    Ok(rows
        .iter()
        .map(|row| {
            let origin: String = row.get("origin");
            let title: String = row.get("title");
            let title = if title.trim().is_empty() {
                origins::friendly_title(&origin)
            } else {
                title
            };
            SiteDescription {
                url: origin,
                title,
                description: row.get("description"),
                writable: row.get::<i64, _>("writable") != 0,
                indexed: row.get::<i64, _>("indexed") != 0,
            }
        })
        .collect())
}
