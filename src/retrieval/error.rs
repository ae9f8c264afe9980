use thiserror::Error;

use crate::retry::Retryable;

#[derive(Debug, Error)]
/// Errors returned by search backends.
pub enum RetrievalError {
    /// Could not reach the backend.
    #[error("search backend '{backend}' unavailable: {message}")]
    Unavailable { backend: String, message: String },

    /// The backend accepted the request but failed to execute it.
    #[error("search in '{collection}' failed: {message}")]
    SearchFailed { collection: String, message: String },

    /// The backend rejected the request as malformed.
    #[error("invalid search request: {reason}")]
    InvalidQuery { reason: String },

    /// Query vector does not match the collection dimension.
    #[error("invalid vector dimension: expected {expected}, got {actual}")]
    InvalidDimension { expected: usize, actual: usize },

    /// Collection or payload index setup failed.
    #[error("failed to prepare collection '{collection}': {message}")]
    CreateCollectionFailed { collection: String, message: String },
}

impl Retryable for RetrievalError {
    fn is_retryable(&self) -> bool {
        matches!(
            self,
            RetrievalError::Unavailable { .. } | RetrievalError::SearchFailed { .. }
        )
    }
}

pub type RetrievalResult<T> = Result<T, RetrievalError>;
