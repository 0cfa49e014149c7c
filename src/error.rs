//! Error types for peerdex.

use thiserror::Error;

/// Result type alias using peerdex's [`Error`] type.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for index query operations.
#[derive(Error, Debug)]
pub enum Error {
    /// The caller asked for the private origin without holding the
    /// capability to see it. Contract violation, never retried.
    #[error("Permission denied: origin '{0}' is not visible to this caller")]
    PermissionDenied(String),

    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A path spec could not be parsed.
    #[error("Invalid path spec: {0}")]
    InvalidPathSpec(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True when the error is the permission contract violation.
    pub fn is_permission_denied(&self) -> bool {
        matches!(self, Error::PermissionDenied(_))
    }
}
