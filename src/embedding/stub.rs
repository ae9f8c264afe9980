//! Deterministic offline embedder.
//!
//! Feature-hashes lowercase tokens into `dimension` signed buckets, so texts that share
//! words produce positively correlated vectors. Used when no embedding endpoint is
//! configured and throughout the tests.

use async_trait::async_trait;
use tracing::debug;

use super::error::EmbeddingError;
use super::provider::EmbeddingProvider;
use super::vector::l2_normalize;
use crate::retrieval::lexical::tokenize;

pub const STUB_MODEL_NAME: &str = "hash-embedder";

#[derive(Debug, Clone)]
pub struct HashEmbedder {
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension: dimension.max(1),
        }
    }

    /// Synchronous embedding; the async trait method delegates here.
    pub fn embed_sync(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(EmbeddingError::InvalidInput {
                reason: "cannot embed empty text".to_string(),
            });
        }

        debug!(text_len = text.len(), "Generating stub embedding");

        let mut tokens = tokenize(trimmed);
        if tokens.is_empty() {
            tokens.push(trimmed.to_lowercase());
        }

        let mut embedding = vec![0.0f32; self.dimension];
        for token in &tokens {
            let hash = blake3::hash(token.as_bytes());
            let bytes = hash.as_bytes();

            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&bytes[0..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimension as u64) as usize;
            let sign = if bytes[8] & 1 == 0 { 1.0 } else { -1.0 };

            embedding[bucket] += sign;
        }

        l2_normalize(&embedding).ok_or_else(|| EmbeddingError::InvalidResponse {
            reason: "stub embedding collapsed to a zero vector".to_string(),
        })
    }
}

#[async_trait]
impl EmbeddingProvider for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        self.embed_sync(text)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        STUB_MODEL_NAME
    }

    fn is_stub(&self) -> bool {
        true
    }
}
