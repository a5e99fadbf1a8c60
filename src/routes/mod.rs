pub mod proxy_routes;

use std::path::Path;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use crate::service::backend_client::BackendClient;
use proxy_routes::{chat_proxy_handler, health_handler, upload_proxy_handler};

/// Full application router: API proxy, document proxy, and the built frontend.
///
/// Unknown paths fall back to `index.html` so deep links such as
/// `/viewer?pdf_url=...` load the single-page app.
pub fn app_router(backend: BackendClient, frontend_dist: &Path) -> Router {
    let spa = ServeDir::new(frontend_dist)
        .fallback(ServeFile::new(frontend_dist.join("index.html")));

    Router::new()
        .route("/api/chat", post(chat_proxy_handler))
        .route("/uploads/{*path}", get(upload_proxy_handler))
        .route("/health", get(health_handler))
        .fallback_service(spa)
        .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
        .layer(TraceLayer::new_for_http())
        .with_state(backend)
}
