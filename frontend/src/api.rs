use futures_util::Stream;
use gloo_net::http::Request;
use js_sys::{Reflect, Uint8Array};
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{AbortSignal, ReadableStreamDefaultReader};

use rag_chat::models::ChatRequest;

/// Chat endpoint on the serving origin (proxied to the RAG backend).
const CHAT_ENDPOINT: &str = "/api/chat";

/// Submits one query and returns the raw answer body as a stream of byte chunks.
///
/// Chunks are handed over exactly as the browser delivers them; frame
/// reassembly happens in the session.
pub async fn open_chat_stream(
    query: &str,
    signal: Option<&AbortSignal>,
) -> Result<impl Stream<Item = Result<Vec<u8>, String>>, String> {
    let body = ChatRequest { query: query.to_string() };

    let resp = Request::post(CHAT_ENDPOINT)
        .header("Accept", "text/event-stream")
        .abort_signal(signal)
        .json(&body)
        .map_err(|e| format!("Serialize error: {e}"))?
        .send()
        .await
        .map_err(|e| format!("Network error: {e}"))?;

    if !resp.ok() {
        return Err(format!("Server error: {}", resp.status()));
    }

    let reader: ReadableStreamDefaultReader = resp
        .body()
        .ok_or_else(|| "Response has no body".to_string())?
        .get_reader()
        .unchecked_into();

    Ok(futures_util::stream::unfold(Some(reader), |reader| async move {
        let reader = reader?;
        match read_chunk(&reader).await {
            Ok(Some(bytes)) => Some((Ok(bytes), Some(reader))),
            Ok(None) => None,
            Err(e) => Some((Err(e), None)),
        }
    }))
}

/// One `reader.read()`; `None` once the body is exhausted.
async fn read_chunk(reader: &ReadableStreamDefaultReader) -> Result<Option<Vec<u8>>, String> {
    let result = JsFuture::from(reader.read()).await.map_err(js_error)?;
    let done = Reflect::get(&result, &JsValue::from_str("done"))
        .map_err(js_error)?
        .as_bool()
        .unwrap_or(true);
    if done {
        return Ok(None);
    }
    let value = Reflect::get(&result, &JsValue::from_str("value")).map_err(js_error)?;
    Ok(Some(value.unchecked_into::<Uint8Array>().to_vec()))
}

pub fn js_error(value: JsValue) -> String {
    value
        .dyn_ref::<js_sys::Error>()
        .map(|e| String::from(e.message()))
        .or_else(|| value.as_string())
        .unwrap_or_else(|| format!("{value:?}"))
}
