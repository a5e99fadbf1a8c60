use tracing::info;

use rag_chat::config::AppConfig;
use rag_chat::routes::app_router;
use rag_chat::service::backend_client::BackendClient;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (development convenience)
    dotenvy::dotenv().ok();

    // Initialise tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "rag_chat=debug,tower_http=debug".into()),
        )
        .init();

    let config = AppConfig::from_env()?;

    // ── Backend + router ──────────────────────────────────────────────────────
    let backend = BackendClient::new(&config.backend_url);
    info!("Proxying RAG backend at {}", backend.base_url());

    if !config.frontend_dist.join("index.html").exists() {
        tracing::warn!(
            "No built frontend in {}; only the API routes will respond",
            config.frontend_dist.display()
        );
    }
    let app = app_router(backend, &config.frontend_dist);

    // ── Listen ────────────────────────────────────────────────────────────────
    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Listening on http://{addr}/");

    axum::serve(listener, app).await?;
    Ok(())
}
