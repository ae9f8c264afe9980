//! OpenAI-compatible embeddings client.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::EmbeddingError;
use super::provider::EmbeddingProvider;

/// Calls `POST {base_url}/embeddings` for a single input.
#[derive(Clone)]
pub struct HttpEmbeddingClient {
    client: Client,
    endpoint: String,
    model: String,
    dimension: usize,
}

impl std::fmt::Debug for HttpEmbeddingClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpEmbeddingClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("dimension", &self.dimension)
            .finish()
    }
}

impl HttpEmbeddingClient {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: Option<&str>,
        dimension: usize,
    ) -> Result<Self, EmbeddingError> {
        if model.trim().is_empty() {
            return Err(EmbeddingError::InvalidConfig {
                reason: "embedding model name is empty".to_string(),
            });
        }
        if dimension == 0 {
            return Err(EmbeddingError::InvalidConfig {
                reason: "embedding dimension must be > 0".to_string(),
            });
        }

        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Some(key) = api_key.map(str::trim).filter(|k| !k.is_empty()) {
            let value = HeaderValue::from_str(&format!("Bearer {key}")).map_err(|_| {
                EmbeddingError::InvalidConfig {
                    reason: "API key is not a valid header value".to_string(),
                }
            })?;
            headers.insert(AUTHORIZATION, value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| EmbeddingError::InvalidConfig {
                reason: e.to_string(),
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/embeddings", base_url.trim_end_matches('/')),
            model: model.to_string(),
            dimension,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if text.trim().is_empty() {
            return Err(EmbeddingError::InvalidInput {
                reason: "cannot embed empty text".to_string(),
            });
        }

        let request = EmbeddingRequest {
            model: &self.model,
            input: [text],
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| EmbeddingError::Unavailable {
                endpoint: self.endpoint.clone(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "<body unavailable>".to_string());
            return Err(EmbeddingError::Http {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: EmbeddingResponse = response.json().await?;
        let embedding = parsed
            .data
            .into_iter()
            .min_by_key(|entry| entry.index)
            .map(|entry| entry.embedding)
            .ok_or_else(|| EmbeddingError::InvalidResponse {
                reason: "response contained no embeddings".to_string(),
            })?;

        if embedding.is_empty() {
            return Err(EmbeddingError::InvalidResponse {
                reason: "embedding vector is empty".to_string(),
            });
        }

        debug!(dim = embedding.len(), model = %self.model, "Embedding received");
        Ok(embedding)
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: [&'a str; 1],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    #[serde(default)]
    index: usize,
}
