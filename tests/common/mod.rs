use sqlx::SqlitePool;
use tempfile::TempDir;

use peerdex::config::{Config, DbConfig};
use peerdex::{db, fixtures};

/// Temp-dir SQLite database with the mirrored index schema in place.
/// The TempDir must stay alive for the duration of the test.
pub async fn test_pool() -> (TempDir, SqlitePool) {
    let tmp = TempDir::new().unwrap();
    let config = Config {
        db: DbConfig {
            path: tmp.path().join("index.sqlite"),
            max_connections: 5,
        },
    };
    let pool = db::connect(&config).await.unwrap();
    fixtures::create_schema(&pool).await.unwrap();
    (tmp, pool)
}
