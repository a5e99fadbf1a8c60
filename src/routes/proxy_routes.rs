use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tracing::{info, warn};

use crate::errors::AppError;
use crate::models::ChatRequest;
use crate::service::backend_client::BackendClient;
use crate::session::ChatController;

/// POST `/api/chat` — forwards the query to the backend and streams its
/// answer frames back untouched.
pub async fn chat_proxy_handler(
    State(backend): State<BackendClient>,
    Json(request): Json<ChatRequest>,
) -> Response {
    let query = match ChatController::validate_query(&request.query) {
        Ok(q) => q,
        Err(e) => return error_response(&e),
    };

    match backend.send_chat(query).await {
        Ok(upstream) => {
            info!("proxying answer stream for a {}-byte query", query.len());
            (
                [
                    (header::CONTENT_TYPE, "text/event-stream"),
                    (header::CACHE_CONTROL, "no-cache"),
                ],
                Body::from_stream(upstream.bytes_stream()),
            )
                .into_response()
        }
        Err(e) => error_response(&e),
    }
}

/// GET `/uploads/{*path}` — serves stored documents from the backend on this
/// origin so the PDF renderer can fetch them.
pub async fn upload_proxy_handler(
    State(backend): State<BackendClient>,
    Path(path): Path<String>,
) -> Response {
    match backend.fetch_upload(&path).await {
        Ok((content_type, upstream)) => (
            [(header::CONTENT_TYPE, content_type)],
            Body::from_stream(upstream.bytes_stream()),
        )
            .into_response(),
        Err(e) => error_response(&e),
    }
}

/// GET `/health`
pub async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

// ── Helper ────────────────────────────────────────────────────────────────────

fn error_response(err: &AppError) -> Response {
    let status = match err {
        e if e.is_validation() => StatusCode::BAD_REQUEST,
        AppError::UpstreamStatus { status: 404, .. } => StatusCode::NOT_FOUND,
        e if e.is_transport() => StatusCode::BAD_GATEWAY,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    warn!("proxy request failed with {status}: {err}");
    (status, Json(json!({ "detail": err.to_string() }))).into_response()
}
