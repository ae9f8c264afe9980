use std::sync::Arc;

use axum::{
    Json,
    body::Bytes,
    extract::State,
    http::{HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use tokio::sync::oneshot;
use tracing::{debug, error, instrument};

use crate::cache::{CACHE_STATUS_HEADER, CacheStatus};
use crate::gateway::error::GatewayError;
use crate::gateway::state::HandlerState;
use crate::pipeline::{QueryRequest, QueryResponse};
use crate::retrieval::SearchBackend;

#[instrument(skip(state, body), fields(body_len = body.len(), status = tracing::field::Empty))]
pub async fn query_handler<B>(
    State(state): State<HandlerState<B>>,
    body: Bytes,
) -> Result<Response, GatewayError>
where
    B: SearchBackend + 'static,
{
    let request = parse_query_request(&body)?;

    // The pipeline runs on its own task so that a dropped connection cancels it through
    // `answer_until` and still leaves a log record behind.
    let (_connection_alive, closed) = oneshot::channel::<()>();
    let pipeline = Arc::clone(&state.pipeline);
    let task = tokio::spawn(async move {
        pipeline
            .answer_until(request, async move {
                let _ = closed.await;
            })
            .await
    });

    let response = task.await.map_err(|e| {
        error!(error = %e, "Query task failed");
        GatewayError::InternalError("query task failed".to_string())
    })??;

    tracing::Span::current().record("status", tracing::field::display(response.status));
    Ok(make_response(response))
}

pub(crate) fn parse_query_request(body: &[u8]) -> Result<QueryRequest, GatewayError> {
    if body.is_empty() {
        return Err(GatewayError::InvalidRequest(
            "request body is empty".to_string(),
        ));
    }
    serde_json::from_slice::<QueryRequest>(body)
        .map_err(|e| GatewayError::InvalidRequest(format!("Invalid request schema: {e}")))
}

pub(crate) fn make_response(response: QueryResponse) -> Response {
    let status = if response.metadata.cache_hit {
        CacheStatus::Hit
    } else {
        CacheStatus::Miss
    };
    debug!(cache = %status, outcome = %response.status, "Sending query response");

    let mut headers = HeaderMap::new();
    headers.insert(
        CACHE_STATUS_HEADER,
        HeaderValue::from_static(status.as_header_value()),
    );
    (StatusCode::OK, headers, Json(response)).into_response()
}
