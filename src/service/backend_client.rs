use reqwest::header::{ACCEPT, CONTENT_TYPE};
use tracing::{error, info};

use crate::errors::AppError;
use crate::models::ChatRequest;
use crate::session::{pump, ChatController, StreamOutcome, TranscriptSink};

/// HTTP client for the RAG backend.
#[derive(Clone)]
pub struct BackendClient {
    http: reqwest::Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn chat_url(&self) -> String {
        format!("{}/chat", self.base_url)
    }

    /// `path` is relative to `/uploads/`, already decoded.
    pub fn upload_url(&self, path: &str) -> String {
        let encoded: Vec<String> = path
            .split('/')
            .map(|segment| urlencoding::encode(segment).into_owned())
            .collect();
        format!("{}/uploads/{}", self.base_url, encoded.join("/"))
    }

    /// Submit one query and return the streaming response.
    pub async fn send_chat(&self, query: &str) -> Result<reqwest::Response, AppError> {
        let url = self.chat_url();
        let resp = self
            .http
            .post(&url)
            .header(ACCEPT, "text/event-stream")
            .json(&ChatRequest { query: query.to_string() })
            .send()
            .await
            .map_err(|e| {
                error!("chat request to {url} failed: {e}");
                AppError::transport(&url, e)
            })?;

        if !resp.status().is_success() {
            return Err(AppError::UpstreamStatus { url, status: resp.status().as_u16() });
        }
        Ok(resp)
    }

    /// Fetch a stored document. Returns the content type and the response to stream.
    pub async fn fetch_upload(&self, path: &str) -> Result<(String, reqwest::Response), AppError> {
        let url = self.upload_url(path);
        let resp = self.http.get(&url).send().await.map_err(|e| AppError::transport(&url, e))?;
        if !resp.status().is_success() {
            return Err(AppError::UpstreamStatus { url, status: resp.status().as_u16() });
        }
        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("application/pdf")
            .to_string();
        Ok((content_type, resp))
    }

    /// Run one full chat turn: record it in the transcript behind `sink`, stream
    /// the answer into it, and report how the stream ended.
    ///
    /// A request that fails before streaming starts closes the assistant
    /// message with the stream error and is returned as `Err`.
    pub async fn ask<K: TranscriptSink>(
        &self,
        controller: &mut ChatController,
        sink: &K,
        query: &str,
    ) -> Result<StreamOutcome, AppError> {
        let mut submitted = None;
        sink.update(|t| submitted = Some(controller.submit(t, query)));
        let mut session = submitted.unwrap_or_else(|| {
            Err(AppError::Unexpected("transcript sink skipped the update".to_string()))
        })?;

        let resp = match self.send_chat(query).await {
            Ok(resp) => resp,
            Err(e) => {
                let message = e.to_string();
                sink.update(|t| session.fail(&message, t));
                return Err(e);
            }
        };

        info!(generation = session.generation(), "streaming answer from {}", self.chat_url());
        Ok(pump(session, resp.bytes_stream(), sink).await)
    }
}
