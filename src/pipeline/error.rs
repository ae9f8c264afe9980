use thiserror::Error;

use super::state::PipelineStage;
use crate::embedding::EmbeddingError;
use crate::generation::GenerationError;
use crate::retry::RetryError;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("{stage} provider unavailable: {message}")]
    RemoteUnavailable {
        stage: PipelineStage,
        message: String,
    },

    #[error("{stage} timed out after {attempts} attempt(s)")]
    Timeout {
        stage: PipelineStage,
        attempts: u32,
    },

    #[error("invalid {stage} response: {reason}")]
    InvalidResponse {
        stage: PipelineStage,
        reason: String,
    },

    #[error("no candidates found after all fallbacks")]
    NoCandidates,

    #[error("answer generation failed: {message}")]
    GenerationFailed { message: String },

    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },

    #[error("query cancelled by caller")]
    Cancelled,
}

impl PipelineError {
    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            PipelineError::RemoteUnavailable { .. } => "remote_unavailable",
            PipelineError::Timeout { .. } => "timeout",
            PipelineError::InvalidResponse { .. } => "invalid_response",
            PipelineError::NoCandidates => "no_candidates",
            PipelineError::GenerationFailed { .. } => "generation_failed",
            PipelineError::InvalidRequest { .. } => "invalid_request",
            PipelineError::Cancelled => "cancelled",
        }
    }

    pub fn invalid_request(reason: impl Into<String>) -> Self {
        PipelineError::InvalidRequest {
            reason: reason.into(),
        }
    }

    pub(crate) fn from_embedding(err: RetryError<EmbeddingError>) -> Self {
        let stage = PipelineStage::Embedding;
        match err {
            RetryError::Timeout { attempts, .. } => PipelineError::Timeout { stage, attempts },
            RetryError::Exhausted { last: source, .. } | RetryError::Aborted { source, .. } => {
                match source {
                    EmbeddingError::InvalidResponse { .. }
                    | EmbeddingError::DimensionMismatch { .. } => PipelineError::InvalidResponse {
                        stage,
                        reason: source.to_string(),
                    },
                    other => PipelineError::RemoteUnavailable {
                        stage,
                        message: other.to_string(),
                    },
                }
            }
        }
    }

    /// Every generation failure surfaces as [`PipelineError::GenerationFailed`]; the
    /// message keeps the underlying cause.
    pub(crate) fn from_generation(err: RetryError<GenerationError>) -> Self {
        PipelineError::GenerationFailed {
            message: err.to_string(),
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;
