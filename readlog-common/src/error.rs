//! Common error types for readlog

use thiserror::Error;

use crate::validation::ValidationError;

/// Common result type for readlog operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across the readlog crates
#[derive(Error, Debug)]
pub enum Error {
    /// Backing-store failure (wraps sqlx::Error)
    ///
    /// Logged and surfaced as a generic failure; never retried automatically.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode failure of a stored document
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Raw import record without a usable title (skipped by batch imports)
    #[error("Invalid record: {0}")]
    InvalidRecord(String),

    /// Field-shape or constraint violation
    #[error("{0}")]
    Validation(#[from] ValidationError),

    /// Malformed import payload, raised before any write
    #[error("Parse error: {0}")]
    Parse(String),

    /// Internal server error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for failures of the backing store itself
    pub fn is_transport(&self) -> bool {
        matches!(self, Error::Database(_))
    }
}
