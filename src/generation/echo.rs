use async_trait::async_trait;

use super::error::GenerationError;
use super::provider::{GenerationProvider, GenerationRequest, GenerationResponse};

pub const ECHO_MODEL_NAME: &str = "echo";

/// Offline generator that answers with the top context fragment.
///
/// Used when the server runs with `GROUNDLINE_MOCK_PROVIDER`. Output depends only on
/// the request.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoGenerator;

impl EchoGenerator {
    pub fn answer_for(request: &GenerationRequest) -> String {
        match request.context_fragments.first() {
            Some(top) => format!(
                "Based on {} source(s): {}",
                request.context_fragments.len(),
                top.trim()
            ),
            None => format!("No context available for: {}", request.question.trim()),
        }
    }
}

#[async_trait]
impl GenerationProvider for EchoGenerator {
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        Ok(GenerationResponse {
            answer: Self::answer_for(request),
            model: ECHO_MODEL_NAME.to_string(),
        })
    }

    fn model_name(&self) -> &str {
        ECHO_MODEL_NAME
    }

    async fn list_models(&self) -> Result<Vec<String>, GenerationError> {
        Ok(vec![ECHO_MODEL_NAME.to_string()])
    }
}
