//! Error types for convo-tracker.

use thiserror::Error;

use crate::store::StorageError;

/// Main error type for convo-tracker operations.
#[derive(Error, Debug)]
pub enum TrackerError {
    /// Session with the given ID was not found.
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// Request failed validation before reaching the store.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Document store failure other than a uniqueness conflict.
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl TrackerError {
    /// Whether the caller can fix this by changing the request.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::SessionNotFound(_) | Self::InvalidRequest(_))
    }
}

/// Convenience Result type for convo-tracker operations.
pub type Result<T> = std::result::Result<T, TrackerError>;
