// Event classification for complete frame lines.

use serde::Deserialize;

use crate::models::Citation;

/// Prefix identifying a protocol line.
pub const FRAME_MARKER: &str = "data:";
/// Payload that ends the stream.
pub const TERMINATION_TOKEN: &str = "[DONE]";
/// Value of the `type` discriminant carried by the final frame.
pub const FINAL_DISCRIMINANT: &str = "final";

/// One application-level event reconstructed from the stream.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Token { text: String },
    FinalAnswer { answer: String, citations: Vec<Citation> },
    Termination,
}

/// Outcome of attempting to read a payload as the structured final frame.
#[derive(Debug)]
pub enum FramePayload {
    Final { answer: String, citations: Vec<Citation> },
    /// Well-formed structured data without the final discriminant.
    NotFinal,
    /// Looked structured but did not parse.
    Malformed(serde_json::Error),
}

#[derive(Debug, Deserialize)]
struct FinalFrame {
    #[serde(default)]
    answer: String,
    #[serde(default)]
    citations: Vec<Citation>,
}

/// Strip the frame marker and surrounding whitespace.
///
/// Returns `None` for lines that carry no protocol payload: blank lines and
/// lines without the marker.
pub fn frame_payload(line: &str) -> Option<&str> {
    if line.trim().is_empty() {
        return None;
    }
    line.strip_prefix(FRAME_MARKER).map(str::trim)
}

/// Try to read `payload` as the final frame.
pub fn parse_structured(payload: &str) -> FramePayload {
    let value: serde_json::Value = match serde_json::from_str(payload) {
        Ok(v) => v,
        Err(e) => return FramePayload::Malformed(e),
    };
    let is_final = value
        .get("type")
        .and_then(|t| t.as_str())
        .is_some_and(|t| t == FINAL_DISCRIMINANT);
    if !is_final {
        return FramePayload::NotFinal;
    }
    match serde_json::from_value::<FinalFrame>(value) {
        Ok(frame) => FramePayload::Final { answer: frame.answer, citations: frame.citations },
        Err(e) => FramePayload::Malformed(e),
    }
}

/// Classify a payload (marker already stripped). First match wins:
/// termination token, then a structured final frame, then plain token.
pub fn classify_payload(payload: &str) -> StreamEvent {
    if payload == TERMINATION_TOKEN {
        return StreamEvent::Termination;
    }

    if payload.starts_with('{') || payload.starts_with('[') {
        match parse_structured(payload) {
            FramePayload::Final { answer, citations } => {
                return StreamEvent::FinalAnswer { answer, citations };
            }
            FramePayload::NotFinal => {}
            FramePayload::Malformed(e) => {
                tracing::debug!("structured payload did not parse, treating as token: {e}");
            }
        }
    }

    StreamEvent::Token { text: payload.to_string() }
}

/// Classify a complete line, or `None` if the line is not a protocol line.
pub fn classify_line(line: &str) -> Option<StreamEvent> {
    frame_payload(line).map(classify_payload)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ignores_blank_and_unmarked_lines() {
        assert_eq!(classify_line(""), None);
        assert_eq!(classify_line("   "), None);
        assert_eq!(classify_line("event: ping"), None);
        assert_eq!(classify_line(": keep-alive"), None);
    }

    #[test]
    fn termination_token() {
        assert_eq!(classify_line("data: [DONE]"), Some(StreamEvent::Termination));
        assert_eq!(classify_line("data:[DONE]  "), Some(StreamEvent::Termination));
    }

    #[test]
    fn plain_tokens_are_trimmed() {
        assert_eq!(
            classify_line("data:  Hello  "),
            Some(StreamEvent::Token { text: "Hello".into() })
        );
    }

    #[test]
    fn final_frame_with_citations() {
        let line = r#"data: {"type":"final","answer":"Forty-two.","citations":[{"title":"guide.pdf","pdf_url":"/uploads/guide.pdf","page":7,"snippet":"the answer"}]}"#;
        match classify_line(line) {
            Some(StreamEvent::FinalAnswer { answer, citations }) => {
                assert_eq!(answer, "Forty-two.");
                assert_eq!(citations.len(), 1);
                assert_eq!(citations[0].doc_title, "guide.pdf");
                assert_eq!(citations[0].page, 7);
            }
            other => panic!("expected final answer, got {other:?}"),
        }
    }

    #[test]
    fn malformed_structured_payload_becomes_token() {
        let line = r#"data: {"type":"final","answer":"#;
        assert_eq!(
            classify_line(line),
            Some(StreamEvent::Token { text: r#"{"type":"final","answer":"#.into() })
        );
        assert!(matches!(parse_structured(r#"{"type":"#), FramePayload::Malformed(_)));
    }

    #[test]
    fn structured_payload_without_discriminant_is_a_token() {
        assert!(matches!(parse_structured(r#"{"answer":"x"}"#), FramePayload::NotFinal));
        assert_eq!(
            classify_line("data: [1, 2]"),
            Some(StreamEvent::Token { text: "[1, 2]".into() })
        );
    }

    #[test]
    fn final_frame_with_bad_citation_shape_falls_back() {
        let payload = r#"{"type":"final","answer":"a","citations":[{"page":"one"}]}"#;
        assert!(matches!(parse_structured(payload), FramePayload::Malformed(_)));
        assert_eq!(classify_payload(payload), StreamEvent::Token { text: payload.into() });
    }
}
