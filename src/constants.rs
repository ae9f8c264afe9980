//! Tuning defaults shared by the config layer, the retriever and the reranker.
//!
//! The embedding width is fixed by the external provider. The pipeline checks every
//! returned vector with [`validate_embedding_dim`] before it reaches cosine arithmetic, so a
//! provider swap shows up as an `InvalidResponse` instead of silently wrong scores.

use thiserror::Error;

pub const DEFAULT_EMBEDDING_DIM: usize = 1536;

/// Weight of cosine similarity in the hybrid score.
pub const DEFAULT_VECTOR_WEIGHT: f32 = 0.7;
/// Weight of lexical rank in the hybrid score.
pub const DEFAULT_LEXICAL_WEIGHT: f32 = 0.3;

/// Vector candidates fetched before filtering: `max(factor * k, min)`.
pub const DEFAULT_OVERSAMPLE_FACTOR: usize = 4;
pub const DEFAULT_OVERSAMPLE_MIN: usize = 32;

pub const DEFAULT_MMR_LAMBDA: f32 = 0.75;
pub const DEFAULT_MMR_FETCH_MULTIPLIER: usize = 2;

pub const DEFAULT_TOP_K: usize = 5;
pub const DEFAULT_MIN_SIMILARITY: f32 = 0.5;
pub const MAX_TOP_K: usize = 50;

/// Lower bound for threshold relaxation after every fallback came back empty.
pub const DEFAULT_MIN_SIMILARITY_FLOOR: f32 = 0.1;
pub const DEFAULT_RELAXATION_FACTOR: f32 = 0.5;

pub const DEFAULT_CACHE_TTL_SECS: u64 = 5 * 60;
pub const DEFAULT_CACHE_CAPACITY: u64 = 10_000;

/// Largest vector size a Qdrant collection accepts.
pub const MAX_EMBEDDING_DIM: usize = 65_536;

/// Embedding width agreed between the embedder and the search backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimConfig {
    pub embedding_dim: usize,
}

impl Default for DimConfig {
    fn default() -> Self {
        Self::new(DEFAULT_EMBEDDING_DIM)
    }
}

impl DimConfig {
    pub fn new(embedding_dim: usize) -> Self {
        Self { embedding_dim }
    }

    pub fn validate(&self) -> Result<(), DimValidationError> {
        match self.embedding_dim {
            0 => Err(DimValidationError::ZeroDimension),
            dim if dim > MAX_EMBEDDING_DIM => Err(DimValidationError::TooLarge {
                max: MAX_EMBEDDING_DIM,
                actual: dim,
            }),
            _ => Ok(()),
        }
    }

    /// Vector size in the form the Qdrant collection API takes.
    pub fn as_u64(&self) -> u64 {
        self.embedding_dim as u64
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DimValidationError {
    #[error("embedding dimension must be non-zero")]
    ZeroDimension,

    #[error("embedding dimension {actual} exceeds the maximum of {max}")]
    TooLarge { max: usize, actual: usize },

    #[error("embedder returned {actual} floats, collection expects {expected}")]
    DimensionMismatch { expected: usize, actual: usize },
}

/// Checks a vector length returned by the embedder against the configured width.
///
/// ```
/// use groundline::constants::{DEFAULT_EMBEDDING_DIM, validate_embedding_dim};
///
/// assert!(validate_embedding_dim(1536, DEFAULT_EMBEDDING_DIM).is_ok());
/// assert!(validate_embedding_dim(768, DEFAULT_EMBEDDING_DIM).is_err());
/// ```
pub fn validate_embedding_dim(actual: usize, expected: usize) -> Result<(), DimValidationError> {
    if actual == expected {
        Ok(())
    } else {
        Err(DimValidationError::DimensionMismatch { expected, actual })
    }
}
