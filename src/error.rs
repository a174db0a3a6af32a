//! Common error types for the greenhouse alert monitor

use thiserror::Error;

/// Common result type for library operations
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for setup and configuration paths
///
/// Per-message and per-write failures have their own local error types
/// (`decoder::DecodeError`, `storage::StorageError`, ...) because they are
/// recovered where they occur and never bubble up here.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Durable storage error (wraps the storage capability's error)
    #[error("Storage error: {0}")]
    Storage(#[from] crate::storage::StorageError),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
