use thiserror::Error;

use crate::retry::Retryable;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding provider unreachable at {endpoint}: {message}")]
    Unavailable { endpoint: String, message: String },

    #[error("embedding request rejected with HTTP {status}: {body}")]
    Http { status: u16, body: String },

    #[error("invalid embedding response: {reason}")]
    InvalidResponse { reason: String },

    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid embedding input: {reason}")]
    InvalidInput { reason: String },

    #[error("invalid embedding client configuration: {reason}")]
    InvalidConfig { reason: String },
}

impl Retryable for EmbeddingError {
    fn is_retryable(&self) -> bool {
        match self {
            EmbeddingError::Unavailable { .. } => true,
            EmbeddingError::Http { status, .. } => is_retryable_status(*status),
            EmbeddingError::InvalidResponse { .. }
            | EmbeddingError::DimensionMismatch { .. }
            | EmbeddingError::InvalidInput { .. }
            | EmbeddingError::InvalidConfig { .. } => false,
        }
    }
}

/// 408, 429 and 5xx are worth retrying; every other status is a malformed request.
pub fn is_retryable_status(status: u16) -> bool {
    status == 408 || status == 429 || (500..=599).contains(&status)
}

impl From<reqwest::Error> for EmbeddingError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            return EmbeddingError::InvalidResponse {
                reason: err.to_string(),
            };
        }
        if let Some(status) = err.status() {
            return EmbeddingError::Http {
                status: status.as_u16(),
                body: err.to_string(),
            };
        }
        EmbeddingError::Unavailable {
            endpoint: err
                .url()
                .map(|u| u.to_string())
                .unwrap_or_else(|| "<unknown>".to_string()),
            message: err.to_string(),
        }
    }
}
