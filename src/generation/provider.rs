use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::GenerationError;

/// Evidence handed to the answer generator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub question: String,
    /// Chunk texts in reranked order.
    pub context_fragments: Vec<String>,
}

impl GenerationRequest {
    pub fn new(question: impl Into<String>, context_fragments: Vec<String>) -> Self {
        Self {
            question: question.into(),
            context_fragments,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationResponse {
    pub answer: String,
    /// Model that produced the answer.
    pub model: String,
}

/// Turns a question plus retrieved context into prose.
#[async_trait]
pub trait GenerationProvider: Send + Sync {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError>;

    fn model_name(&self) -> &str;

    /// Models the provider can serve.
    async fn list_models(&self) -> Result<Vec<String>, GenerationError>;
}
