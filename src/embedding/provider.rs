use async_trait::async_trait;

use super::error::EmbeddingError;

/// Turns text into a dense vector.
///
/// Implementations return the raw provider vector. Normalisation and dimension checks
/// happen in the pipeline so every provider is held to the same contract.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;

    /// Dimension every returned vector is expected to have.
    fn dimension(&self) -> usize;

    fn model_name(&self) -> &str;

    /// `true` for the offline hash embedder.
    fn is_stub(&self) -> bool {
        false
    }
}
