//! Index fixtures for tests.
//!
//! The index is populated by an external crawler; these helpers let tests
//! stand up the mirrored schema and seed sites, records, attributes, and
//! notifications without that component. The query engine itself never
//! writes through here.

use sqlx::SqlitePool;

use crate::error::Result;

/// Create the mirrored index schema. Idempotent.
pub async fn create_schema(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sites (
            id INTEGER PRIMARY KEY,
            origin TEXT NOT NULL UNIQUE,
            title TEXT NOT NULL DEFAULT '',
            description TEXT NOT NULL DEFAULT '',
            writable INTEGER NOT NULL DEFAULT 0,
            indexed INTEGER NOT NULL DEFAULT 0,
            is_index_target INTEGER NOT NULL DEFAULT 0
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS records (
            id INTEGER PRIMARY KEY,
            site_id INTEGER NOT NULL,
            path TEXT NOT NULL,
            prefix TEXT NOT NULL,
            extension TEXT NOT NULL,
            ctime INTEGER NOT NULL,
            mtime INTEGER NOT NULL,
            rtime INTEGER NOT NULL,
            UNIQUE(site_id, path),
            FOREIGN KEY (site_id) REFERENCES sites(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS record_attributes (
            id INTEGER PRIMARY KEY,
            record_id INTEGER NOT NULL,
            key TEXT NOT NULL,
            value TEXT NOT NULL,
            FOREIGN KEY (record_id) REFERENCES records(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS notifications (
            id INTEGER PRIMARY KEY,
            record_id INTEGER NOT NULL UNIQUE,
            key TEXT NOT NULL,
            subject_origin TEXT NOT NULL,
            subject_path TEXT NOT NULL,
            FOREIGN KEY (record_id) REFERENCES records(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_records_site_id ON records(site_id)")
        .execute(pool)
        .await?;
    sqlx::query(
        "CREATE INDEX IF NOT EXISTS idx_record_attributes_record_id \
         ON record_attributes(record_id, key)",
    )
    .execute(pool)
    .await?;

    Ok(())
}

/// A site row to seed, with the defaults tests usually want.
#[derive(Debug, Clone)]
pub struct SiteSeed {
    pub origin: String,
    pub title: String,
    pub description: String,
    pub writable: bool,
    pub indexed: bool,
    pub is_index_target: bool,
}

impl SiteSeed {
    pub fn new(origin: &str) -> Self {
        Self {
            origin: origin.to_string(),
            title: String::new(),
            description: String::new(),
            writable: false,
            indexed: true,
            is_index_target: true,
        }
    }

    pub fn title(mut self, title: &str) -> Self {
        self.title = title.to_string();
        self
    }

    pub fn description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }

    pub fn writable(mut self, writable: bool) -> Self {
        self.writable = writable;
        self
    }

    pub fn indexed(mut self, indexed: bool) -> Self {
        self.indexed = indexed;
        self
    }

    pub fn index_target(mut self, is_index_target: bool) -> Self {
        self.is_index_target = is_index_target;
        self
    }
}

/// Insert a site row, returning its id.
pub async fn insert_site(pool: &SqlitePool, seed: &SiteSeed) -> Result<i64> {
    let result = sqlx::query(
        "INSERT INTO sites (origin, title, description, writable, indexed, is_index_target) \
         VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(&seed.origin)
    .bind(&seed.title)
    .bind(&seed.description)
    .bind(seed.writable as i64)
    .bind(seed.indexed as i64)
    .bind(seed.is_index_target as i64)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Insert a record row, deriving `prefix` and `extension` from the path the
/// same way the indexer does. Returns the record id.
pub async fn insert_record(
    pool: &SqlitePool,
    site_id: i64,
    path: &str,
    ctime: i64,
    mtime: i64,
    rtime: i64,
) -> Result<i64> {
    let (prefix, extension) = split_path(path);
    let result = sqlx::query(
        "INSERT INTO records (site_id, path, prefix, extension, ctime, mtime, rtime) \
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(site_id)
    .bind(path)
    .bind(&prefix)
    .bind(&extension)
    .bind(ctime)
    .bind(mtime)
    .bind(rtime)
    .execute(pool)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Append one attribute row to a record.
pub async fn insert_attribute(
    pool: &SqlitePool,
    record_id: i64,
    key: &str,
    value: &str,
) -> Result<()> {
    sqlx::query("INSERT INTO record_attributes (record_id, key, value) VALUES (?, ?, ?)")
        .bind(record_id)
        .bind(key)
        .bind(value)
        .execute(pool)
        .await?;
    Ok(())
}

/// Attach a notification to a record.
pub async fn insert_notification(
    pool: &SqlitePool,
    record_id: i64,
    key: &str,
    subject_origin: &str,
    subject_path: &str,
) -> Result<()> {
    sqlx::query(
        "INSERT INTO notifications (record_id, key, subject_origin, subject_path) \
         VALUES (?, ?, ?, ?)",
    )
    .bind(record_id)
    .bind(key)
    .bind(subject_origin)
    .bind(subject_path)
    .execute(pool)
    .await?;
    Ok(())
}

/// Split a record path into its directory prefix (up to, not including, the
/// final `/`) and file extension (final `.`-suffix, empty when absent).
fn split_path(path: &str) -> (String, String) {
    let slash = path.rfind('/').unwrap_or(0);
    let prefix = path[..slash].to_string();
    let name = &path[slash..];
    let extension = match name.rfind('.') {
        Some(dot) if dot > 1 => name[dot..].to_string(),
        _ => String::new(),
    };
    (prefix, extension)
}
