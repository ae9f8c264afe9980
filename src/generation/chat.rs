//! Answer generation through the `genai` multi-provider client.

use async_trait::async_trait;
use genai::Client;
use genai::adapter::AdapterKind;
use genai::chat::{ChatMessage, ChatRequest};
use genai::webc;
use tracing::{debug, instrument};

use crate::embedding::is_retryable_status;

use super::error::GenerationError;
use super::provider::{GenerationProvider, GenerationRequest, GenerationResponse};

const SYSTEM_INSTRUCTION: &str = "Answer the question using only the numbered context passages. \
If they do not contain the answer, say so.";

/// Chat-completion backed generator. The provider is resolved from the model name.
#[derive(Clone)]
pub struct GenaiGenerator {
    client: Client,
    model: String,
}

impl GenaiGenerator {
    pub fn new(model: impl Into<String>) -> Self {
        Self::with_client(Client::default(), model)
    }

    pub fn with_client(client: Client, model: impl Into<String>) -> Self {
        Self {
            client,
            model: model.into(),
        }
    }

    fn chat_request(request: &GenerationRequest) -> ChatRequest {
        ChatRequest::new(vec![
            ChatMessage::system(SYSTEM_INSTRUCTION),
            ChatMessage::user(render_prompt(request)),
        ])
    }
}

/// Numbered context passages followed by the question.
pub fn render_prompt(request: &GenerationRequest) -> String {
    let mut prompt = String::new();
    for (i, fragment) in request.context_fragments.iter().enumerate() {
        prompt.push_str(&format!("[{}] {}\n\n", i + 1, fragment.trim()));
    }
    prompt.push_str("Question: ");
    prompt.push_str(request.question.trim());
    prompt
}

/// Splits `genai` failures into retryable provider errors and outright rejections.
///
/// Only transport failures, streaming hiccups and 408/429/5xx responses are worth another
/// attempt. Auth, resolver and request-shape errors, and every other status, are rejections.
pub(crate) fn classify_error(model: &str, err: genai::Error) -> GenerationError {
    let retryable = match &err {
        genai::Error::WebModelCall { webc_error, .. }
        | genai::Error::WebAdapterCall { webc_error, .. } => is_retryable_web_error(webc_error),
        genai::Error::NoChatResponse { .. }
        | genai::Error::WebStream { .. }
        | genai::Error::ReqwestEventSource(_) => true,
        _ => false,
    };

    if retryable {
        GenerationError::Provider {
            model: model.to_string(),
            message: err.to_string(),
        }
    } else {
        GenerationError::Rejected {
            model: model.to_string(),
            message: err.to_string(),
        }
    }
}

fn is_retryable_web_error(err: &webc::Error) -> bool {
    match err {
        webc::Error::ResponseFailedStatus { status, .. } => is_retryable_status(status.as_u16()),
        // No status means the connection itself failed.
        webc::Error::Reqwest(e) => e.status().is_none_or(|s| is_retryable_status(s.as_u16())),
        _ => false,
    }
}

impl std::fmt::Debug for GenaiGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenaiGenerator")
            .field("model", &self.model)
            .finish()
    }
}

#[async_trait]
impl GenerationProvider for GenaiGenerator {
    #[instrument(
        skip(self, request),
        fields(model = %self.model, fragments = request.context_fragments.len())
    )]
    async fn generate(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, GenerationError> {
        if request.question.trim().is_empty() {
            return Err(GenerationError::InvalidRequest {
                reason: "question is empty".to_string(),
            });
        }

        let response = self
            .client
            .exec_chat(&self.model, Self::chat_request(request), None)
            .await
            .map_err(|e| classify_error(&self.model, e))?;

        let answer = response.first_text().unwrap_or_default().trim().to_string();
        if answer.is_empty() {
            return Err(GenerationError::EmptyAnswer {
                model: self.model.clone(),
            });
        }

        debug!(answer_len = answer.len(), "Generated answer");
        Ok(GenerationResponse {
            answer,
            model: self.model.clone(),
        })
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    async fn list_models(&self) -> Result<Vec<String>, GenerationError> {
        let kind = AdapterKind::from_model(&self.model).map_err(|e| GenerationError::Rejected {
            model: self.model.clone(),
            message: e.to_string(),
        })?;

        self.client
            .all_model_names(kind)
            .await
            .map_err(|e| classify_error(&self.model, e))
    }
}
