//! Error types for stash core operations.
//!
//! Errors are descriptive at the core level; the CLI layer maps these
//! to user-friendly messages. Bookkeeping misses (absent key, disabled
//! undo) are normal control flow and return `None`/`false`, never an
//! error.

use thiserror::Error;

/// Result type alias for stash operations.
pub type Result<T> = std::result::Result<T, StashError>;

/// Core error type for stash operations.
#[derive(Debug, Error)]
pub enum StashError {
    /// Value could not be serialized into an envelope
    #[error("Encode error: {0}")]
    Encode(String),

    /// Raw string carried the envelope marker but did not parse
    #[error("Decode error: {0}")]
    Decode(String),

    /// Storage backend error. Quota-class exhaustion from the backend
    /// surfaces through this variant untouched; the core makes no
    /// retry or eviction decision.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Operation not supported by the resolved backend
    #[error("Unsupported operation: {0}")]
    Unsupported(&'static str),

    /// Resolver found no usable backend
    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),
}

impl From<std::io::Error> for StashError {
    fn from(err: std::io::Error) -> Self {
        StashError::Storage(err.to_string())
    }
}

impl From<rusqlite::Error> for StashError {
    fn from(err: rusqlite::Error) -> Self {
        StashError::Storage(format!("SQLite error: {}", err))
    }
}

impl From<serde_json::Error> for StashError {
    fn from(err: serde_json::Error) -> Self {
        StashError::Encode(err.to_string())
    }
}
