//! reqwest wrapper around the gateway routes.

use std::time::Duration;

use groundline::pipeline::{QueryRequest, QueryResponse};
use groundline::{CACHE_STATUS_HEADER, SERVICE_STATUS_HEADER};
use serde::Deserialize;
use serde::de::DeserializeOwned;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

pub struct TestClient {
    http: reqwest::Client,
    base_url: String,
}

/// Body the gateway sends with every non-200 query response.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayErrorBody {
    pub error: String,
    pub code: u16,
    #[serde(skip)]
    pub service_status: Option<String>,
}

impl TestClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        let http = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("reqwest client should build");

        Self {
            http,
            base_url: base_url.into(),
        }
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    /// POSTs the request and returns the body with the cache header (`HIT`/`MISS`).
    pub async fn query(
        &self,
        request: &QueryRequest,
    ) -> Result<(QueryResponse, String), TestClientError> {
        let resp = self
            .http
            .post(self.endpoint("/v1/query"))
            .json(request)
            .send()
            .await?;

        let cache = header(&resp, CACHE_STATUS_HEADER).unwrap_or_default();
        if resp.status().is_success() {
            return Ok((resp.json().await?, cache));
        }

        let status = resp.status().as_u16();
        let service_status = header(&resp, SERVICE_STATUS_HEADER);
        let text = resp.text().await.unwrap_or_default();
        match serde_json::from_str::<GatewayErrorBody>(&text) {
            Ok(mut body) if status == 400 => {
                body.service_status = service_status;
                Err(TestClientError::BadRequest(body))
            }
            _ => Err(TestClientError::UnexpectedStatus(status, text)),
        }
    }

    pub async fn health(&self) -> Result<HealthResponse, TestClientError> {
        self.get_json("/healthz").await
    }

    pub async fn ready(&self) -> Result<ReadyResponse, TestClientError> {
        self.get_json("/ready").await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, TestClientError> {
        let resp = self.http.get(self.endpoint(path)).send().await?;
        let status = resp.status();
        if status.is_success() {
            Ok(resp.json().await?)
        } else {
            let text = resp.text().await.unwrap_or_default();
            Err(TestClientError::UnexpectedStatus(status.as_u16(), text))
        }
    }
}

fn header(resp: &reqwest::Response, name: &str) -> Option<String> {
    resp.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::to_owned)
}

#[derive(Debug, Clone, Deserialize)]
pub struct HealthResponse {
    pub status: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComponentStatus {
    pub http: String,
    pub search_backend: String,
    pub embedding: String,
    pub embedder_mode: String,
    pub generation: String,
    pub generation_model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReadyResponse {
    pub status: String,
    pub components: ComponentStatus,
}

impl ReadyResponse {
    pub fn is_ok(&self) -> bool {
        self.status == "ok"
    }
}

#[derive(Debug, thiserror::Error)]
pub enum TestClientError {
    #[error("transport: {0}")]
    RequestFailed(#[from] reqwest::Error),

    #[error("rejected ({}): {}", .0.code, .0.error)]
    BadRequest(GatewayErrorBody),

    #[error("status {0}: {1}")]
    UnexpectedStatus(u16, String),
}
