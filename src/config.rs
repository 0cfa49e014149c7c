//! TOML configuration parsing.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub db: DbConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DbConfig {
    /// Path to the SQLite index database maintained by the external indexer.
    pub path: PathBuf,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
}

fn default_max_connections() -> u32 {
    5
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        Error::Config(format!(
            "failed to read config file {}: {}",
            path.display(),
            e
        ))
    })?;

    let config: Config =
        toml::from_str(&content).map_err(|e| Error::Config(format!("failed to parse config file: {}", e)))?;

    if config.db.max_connections == 0 {
        return Err(Error::Config("db.max_connections must be > 0".to_string()));
    }

    Ok(config)
}
