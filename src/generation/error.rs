use thiserror::Error;

use crate::retry::Retryable;

#[derive(Debug, Error)]
pub enum GenerationError {
    /// Transport failure or upstream 5xx-class error.
    #[error("generation provider for model {model} failed: {message}")]
    Provider { model: String, message: String },

    /// The provider refused the request outright (auth, malformed request).
    #[error("generation request for model {model} rejected: {message}")]
    Rejected { model: String, message: String },

    #[error("generation provider returned no answer text for model {model}")]
    EmptyAnswer { model: String },

    #[error("invalid generation request: {reason}")]
    InvalidRequest { reason: String },
}

impl Retryable for GenerationError {
    fn is_retryable(&self) -> bool {
        matches!(self, GenerationError::Provider { .. })
    }
}
