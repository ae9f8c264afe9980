//! HTTP gateway (Axum) in front of the query pipeline.
//!
//! - `POST /v1/query` answers a question; every structured outcome is a `200`.
//! - `GET /healthz` reports liveness.
//! - `GET /ready` reports whether the search backend can serve queries.

pub mod error;
pub mod handler;
pub mod state;


use axum::{
    Json, Router,
    extract::State,
    http::{HeaderMap, StatusCode, header::HeaderValue},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

pub use error::{ErrorResponse, GatewayError};
pub use handler::query_handler;
pub use state::HandlerState;

use crate::cache::{
    SERVICE_STATUS_HEADER, SERVICE_STATUS_HEALTHY, SERVICE_STATUS_NOT_READY, SERVICE_STATUS_READY,
};
use crate::retrieval::SearchBackend;

pub fn create_router_with_state<B>(state: HandlerState<B>) -> Router
where
    B: SearchBackend + 'static,
{
    Router::new()
        .route("/healthz", get(health_handler))
        .route("/ready", get(ready_handler::<B>))
        .route("/v1/query", post(query_handler::<B>))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(serde::Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}

#[derive(serde::Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub components: ComponentStatus,
}

#[derive(serde::Serialize)]
pub struct ComponentStatus {
    pub http: &'static str,
    pub search_backend: &'static str,
    pub embedding: &'static str,
    pub embedder_mode: &'static str,
    /// Whether the generation provider answered a model listing. Informational only.
    pub generation: &'static str,
    pub generation_model: String,
}

#[tracing::instrument]
pub async fn health_handler() -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        SERVICE_STATUS_HEADER,
        HeaderValue::from_static(SERVICE_STATUS_HEALTHY),
    );

    (
        StatusCode::OK,
        headers,
        Json(HealthResponse { status: "ok" }),
    )
        .into_response()
}

#[tracing::instrument(skip(state))]
pub async fn ready_handler<B>(State(state): State<HandlerState<B>>) -> Response
where
    B: SearchBackend + 'static,
{
    let pipeline = &state.pipeline;

    let search_backend = if pipeline.is_ready().await {
        SERVICE_STATUS_READY
    } else {
        SERVICE_STATUS_NOT_READY
    };

    let embedder_mode = if pipeline.embedder().is_stub() {
        "stub"
    } else {
        "remote"
    };

    let generation = match pipeline.generation_models().await {
        Ok(_) => SERVICE_STATUS_READY,
        Err(e) => {
            tracing::warn!(error = %e, "Generation provider did not list models");
            SERVICE_STATUS_NOT_READY
        }
    };

    let components = ComponentStatus {
        http: SERVICE_STATUS_READY,
        search_backend,
        embedding: SERVICE_STATUS_READY,
        embedder_mode,
        generation,
        generation_model: pipeline.generator().model_name().to_string(),
    };

    let is_ready = components.search_backend == SERVICE_STATUS_READY;
    let (status_code, status_msg) = if is_ready {
        (StatusCode::OK, "ok")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "pending")
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        SERVICE_STATUS_HEADER,
        HeaderValue::from_static(if is_ready {
            SERVICE_STATUS_READY
        } else {
            SERVICE_STATUS_NOT_READY
        }),
    );

    (
        status_code,
        headers,
        Json(ReadyResponse {
            status: status_msg,
            components,
        }),
    )
        .into_response()
}
