//! Common error types for VMT

use thiserror::Error;

/// Common result type for VMT operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across VMT crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database read error (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found (template, report, issue)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Report content or stored blob could not be interpreted
    #[error("Malformed input: {0}")]
    MalformedInput(String),

    /// A write to the backing store failed
    #[error("Storage failure: {0}")]
    StorageFailure(String),

    /// Resource already exists (e.g. duplicate template name)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::MalformedInput(format!(
            "invalid JSON at line {} column {}: {}",
            error.line(),
            error.column(),
            error
        ))
    }
}

impl Error {
    /// Wrap a failed store write, keeping the operation name for the log trail
    pub fn storage(operation: &str, err: impl std::fmt::Display) -> Self {
        Error::StorageFailure(format!("{}: {}", operation, err))
    }
}
