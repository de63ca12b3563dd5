//! Common error types for DubSync

use thiserror::Error;

/// Common result type for DubSync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across DubSync services
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error).
    /// Connection/timeout class failures land here and are the only
    /// class the retry wrapper considers transient.
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Malformed input handed to a store primitive (caller bug, never retried)
    #[error("Invalid input: {0}")]
    Validation(String),

    /// Store invariant violated, e.g. get-or-create yielded no row
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// Transport failure talking to the remote history source
    #[error("Remote source error: {0}")]
    RemoteSource(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
