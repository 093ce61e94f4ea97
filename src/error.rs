//! Error types for counter stores and the serving process.
//!
//! Store errors are returned to the request handler that triggered them;
//! everything else in [`Error`] only happens at startup or while rendering.

use thiserror::Error;

/// Errors that can occur while counting or listing identifiers.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Cannot connect to or communicate with the storage backend.
    #[error("connection error: {0}")]
    Connection(String),

    /// A statement that must touch exactly one row touched a different number.
    #[error("constraint error: {0}")]
    Constraint(String),

    /// A stored count could not be read back as a non-negative integer.
    #[error("decode error: {0}")]
    Decode(String),

    /// A table or key prefix name that cannot be used safely.
    #[error("invalid store name: {0}")]
    InvalidName(String),

    /// Database error from SQLx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Error from the key-value backend.
    #[error("key-value error: {0}")]
    KeyValue(#[from] redis::RedisError),
}

/// Result type alias for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;

impl StoreError {
    /// Returns true if trying the same call again may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            StoreError::Connection(_) => true,
            StoreError::Database(err) => matches!(
                err,
                sqlx::Error::Io(_) | sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed
            ),
            StoreError::KeyValue(err) => err.is_io_error() || err.is_timeout(),
            _ => false,
        }
    }
}

/// Top-level errors for startup and page rendering.
#[derive(Debug, Error)]
pub enum Error {
    /// A backend failed while opening stores.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// Invalid environment configuration.
    #[error("config error: {0}")]
    Config(String),

    /// A route pattern failed to compile.
    #[error("invalid route pattern: {0}")]
    Route(#[from] regex::Error),

    /// The index page could not be rendered.
    #[error("render error: {0}")]
    Render(#[from] std::fmt::Error),

    /// Binding or serving the listener failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
