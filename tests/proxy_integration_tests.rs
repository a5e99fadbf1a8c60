//! End-to-end tests against an in-process fake RAG backend.

use std::cell::RefCell;
use std::convert::Infallible;
use std::path::Path;

use axum::body::{Body, Bytes};
use axum::extract::Path as UrlPath;
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;

use rag_chat::models::{ChatRequest, MessageStatus};
use rag_chat::routes::app_router;
use rag_chat::service::backend_client::BackendClient;
use rag_chat::session::{ChatController, StreamPhase};
use rag_chat::transcript::{Transcript, STREAM_FAILED_MESSAGE};

/// Answer frames split at awkward places, as a real connection might.
const ANSWER_CHUNKS: &[&str] = &[
    "data: Tight",
    "en to\n\ndata:  45 Nm\n\n",
    "data: {\"type\":\"final\",\"answer\":\"Tighten to 45 Nm.\",\"citations\":[{\"doc_id\":\"d1\",",
    "\"title\":\"Service manual\",\"pdf_url\":\"/uploads/manual.pdf\",\"page\":12,",
    "\"bbox\":[72,700,300,720],\"snippet\":\"45 Nm\",\"score\":0.91}]}\n\n",
    "data: [DONE]\n\n",
];

async fn fake_chat(Json(request): Json<ChatRequest>) -> impl IntoResponse {
    assert!(!request.query.is_empty());
    let chunks = ANSWER_CHUNKS
        .iter()
        .map(|c| Ok::<_, Infallible>(Bytes::from_static(c.as_bytes())));
    (
        [(header::CONTENT_TYPE, "text/event-stream")],
        Body::from_stream(futures_util::stream::iter(chunks)),
    )
}

async fn fake_upload(UrlPath(path): UrlPath<String>) -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "application/pdf")], format!("%PDF-1.7 {path}"))
}

/// Serve `router` on an ephemeral port and return its base URL.
async fn serve(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{addr}")
}

async fn start_backend() -> String {
    serve(
        Router::new()
            .route("/chat", post(fake_chat))
            .route("/uploads/{*path}", get(fake_upload)),
    )
    .await
}

async fn start_proxy(backend_url: &str) -> String {
    let backend = BackendClient::new(backend_url);
    serve(app_router(backend, Path::new("does-not-exist/dist"))).await
}

/// A port nothing listens on.
async fn dead_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

#[tokio::test]
async fn ask_streams_tokens_then_final_answer() {
    let backend = BackendClient::new(&start_backend().await);
    let sink = RefCell::new(Transcript::new());
    let mut controller = ChatController::new();

    let outcome = backend.ask(&mut controller, &sink, "  torque for the rear axle?  ").await.unwrap();

    assert_eq!(outcome.phase, StreamPhase::Completed);
    assert_eq!(outcome.answer, "Tighten to 45 Nm.");

    let transcript = sink.borrow();
    assert_eq!(transcript.len(), 2);
    assert_eq!(transcript.messages()[0].content, "torque for the rear axle?");
    let answer = transcript.get(&outcome.message_id).unwrap();
    assert_eq!(answer.status, MessageStatus::Complete);
    assert_eq!(answer.citations.len(), 1);
    assert_eq!(answer.citations[0].doc_title, "Service manual");
    assert_eq!(answer.citations[0].page, 12);
    assert!(answer.citations[0].highlight().is_some());
}

#[tokio::test]
async fn ask_against_dead_backend_fails_the_message() {
    let backend = BackendClient::new(&dead_url().await);
    let sink = RefCell::new(Transcript::new());
    let mut controller = ChatController::new();

    let err = backend.ask(&mut controller, &sink, "hello").await.unwrap_err();
    assert!(err.is_transport());

    let transcript = sink.borrow();
    let answer = transcript.last_assistant().unwrap();
    assert_eq!(answer.content, STREAM_FAILED_MESSAGE);
    assert_eq!(answer.status, MessageStatus::Failed);
    assert!(!transcript.is_streaming());
}

#[tokio::test]
async fn proxy_passes_answer_bytes_through() {
    let proxy = start_proxy(&start_backend().await).await;

    let resp = reqwest::Client::new()
        .post(format!("{proxy}/api/chat"))
        .json(&json!({ "query": "torque?" }))
        .send()
        .await
        .unwrap();

    assert!(resp.status().is_success());
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/event-stream");
    assert_eq!(resp.text().await.unwrap(), ANSWER_CHUNKS.concat());
}

#[tokio::test]
async fn proxy_rejects_blank_queries() {
    let proxy = start_proxy(&start_backend().await).await;

    let resp = reqwest::Client::new()
        .post(format!("{proxy}/api/chat"))
        .json(&json!({ "query": "   " }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = resp.json().await.unwrap();
    assert!(body["detail"].as_str().unwrap().contains("query"));
}

#[tokio::test]
async fn proxy_reports_unreachable_backend_as_bad_gateway() {
    let proxy = start_proxy(&dead_url().await).await;

    let resp = reqwest::Client::new()
        .post(format!("{proxy}/api/chat"))
        .json(&json!({ "query": "hello" }))
        .send()
        .await
        .unwrap();

    assert_eq!(resp.status(), reqwest::StatusCode::BAD_GATEWAY);
}

#[tokio::test]
async fn uploads_are_served_on_the_proxy_origin() {
    let proxy = start_proxy(&start_backend().await).await;

    let resp = reqwest::get(format!("{proxy}/uploads/team%20docs/manual.pdf")).await.unwrap();
    assert!(resp.status().is_success());
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "application/pdf");
    assert_eq!(resp.text().await.unwrap(), "%PDF-1.7 team docs/manual.pdf");
}

#[tokio::test]
async fn health_reports_ok() {
    let proxy = start_proxy(&dead_url().await).await;
    let body: Value = reqwest::get(format!("{proxy}/health")).await.unwrap().json().await.unwrap();
    assert_eq!(body, json!({ "status": "ok" }));
}
