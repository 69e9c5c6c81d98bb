//! Error types for workload store operations.

use thiserror::Error;

/// Result type alias for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors returned by a [`WorkloadStore`](crate::WorkloadStore).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("server timeout: {0}")]
    ServerTimeout(String),

    #[error("too many requests: {0}")]
    TooManyRequests(String),

    #[error("service unavailable: {0}")]
    Unavailable(String),

    #[error("invalid request: {0}")]
    Invalid(String),

    #[error("forbidden: {0}")]
    Forbidden(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}

impl StoreError {
    /// Whether a retry of the same request may succeed.
    pub fn is_retriable(&self) -> bool {
        matches!(
            self,
            StoreError::Conflict(_)
                | StoreError::ServerTimeout(_)
                | StoreError::TooManyRequests(_)
                | StoreError::Unavailable(_)
        )
    }
}
