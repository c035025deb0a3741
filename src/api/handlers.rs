//! HTTP request handlers

use super::types::{ErrorResponse, RelayRequest};
use super::AppState;
use axum::{
    body::Body,
    extract::{rejection::JsonRejection, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use futures::stream::{self, StreamExt};
use std::convert::Infallible;
use std::time::Duration;

/// Chunks emitted by the diagnostic stream
const TEST_STREAM_CHUNKS: usize = 5;
const TEST_STREAM_INTERVAL: Duration = Duration::from_millis(500);

/// Create the relay router
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/api/chat", post(relay_chat))
        .route("/api/test-stream", get(test_stream))
        .route("/version", get(get_version))
        .with_state(state)
}

// ============================================================
// Chat relay
// ============================================================

async fn relay_chat(
    State(state): State<AppState>,
    request: Result<Json<RelayRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = request.map_err(|e| {
        tracing::warn!(error = %e, "Unreadable chat request");
        AppError::Internal(e.body_text())
    })?;
    let message = request
        .message
        .filter(|m| !m.is_empty())
        .ok_or_else(|| AppError::BadRequest("Message is required".to_string()))?;

    let preview: String = message.chars().take(100).collect();
    tracing::info!(
        upstream = %state.upstream_url,
        message = %preview,
        "Forwarding chat request"
    );

    let response = state
        .client
        .post(&*state.upstream_url)
        .json(&RelayRequest {
            message: Some(message),
        })
        .send()
        .await
        .map_err(|e| {
            tracing::error!(error = %e, "Chat relay failed");
            AppError::Internal(e.to_string())
        })?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::error!(status = %status, body = %body, "Orchestrator error");
        return Err(AppError::Upstream(status.as_u16()));
    }

    Ok(event_stream(Body::from_stream(response.bytes_stream())))
}

/// Wrap `body` with headers that keep every hop from buffering it
fn event_stream(body: Body) -> Response {
    let mut response = Response::new(body);
    let headers = response.headers_mut();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/event-stream"),
    );
    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static("no-cache, no-transform"),
    );
    // Disables proxy buffering (nginx)
    headers.insert("x-accel-buffering", HeaderValue::from_static("no"));
    response
}

// ============================================================
// Diagnostics
// ============================================================

/// Paced plain lines, for checking that nothing between here and the
/// client buffers the stream
async fn test_stream() -> Response {
    let chunks = stream::iter(0..TEST_STREAM_CHUNKS).then(|i| async move {
        if i > 0 {
            tokio::time::sleep(TEST_STREAM_INTERVAL).await;
        }
        Ok::<_, Infallible>(format!("Data chunk {i}\n"))
    });
    event_stream(Body::from_stream(chunks.boxed()))
}

async fn get_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

// ============================================================
// Error Handling
// ============================================================

enum AppError {
    BadRequest(String),
    Upstream(u16),
    Internal(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, ErrorResponse::new(msg)),
            AppError::Upstream(code) => (
                StatusCode::from_u16(code).unwrap_or(StatusCode::BAD_GATEWAY),
                ErrorResponse::new(format!("Orchestrator error: {code}")),
            ),
            AppError::Internal(details) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                ErrorResponse::new("Internal server error").with_details(details),
            ),
        };

        (status, Json(body)).into_response()
    }
}
