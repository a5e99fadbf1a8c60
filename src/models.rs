use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    User,
    Assistant,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Assistant => "assistant",
        }
    }

    /// Label shown above a message bubble.
    pub fn label(&self) -> &'static str {
        match self {
            MessageRole::User => "You",
            MessageRole::Assistant => "Assistant",
        }
    }
}

impl std::fmt::Display for MessageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for MessageRole {
    type Error = String;
    fn try_from(s: String) -> Result<Self, Self::Error> {
        match s.to_lowercase().as_str() {
            "user" => Ok(MessageRole::User),
            "assistant" => Ok(MessageRole::Assistant),
            other => Err(format!("Unknown role: {other}")),
        }
    }
}

/// Lifecycle of a message. Only an assistant message is ever `Open`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageStatus {
    Open,
    Complete,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub role: MessageRole,
    pub content: String,
    #[serde(default)]
    pub citations: Vec<Citation>,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
}

impl ChatMessage {
    pub fn new(role: MessageRole, content: String, status: MessageStatus) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            role,
            content,
            citations: Vec::new(),
            status,
            created_at: Utc::now(),
        }
    }

    pub fn is_open(&self) -> bool {
        self.status == MessageStatus::Open
    }
}

/// Axis-aligned box in page-native units: origin bottom-left, y grows upward.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 4]", into = "[f64; 4]")]
pub struct BBox {
    pub x0: f64,
    pub y0: f64,
    pub x1: f64,
    pub y1: f64,
}

impl BBox {
    pub fn new(x0: f64, y0: f64, x1: f64, y1: f64) -> Self {
        Self { x0, y0, x1, y1 }
    }

    /// A box whose upper/right bound is below its lower/left bound, or that
    /// carries a non-finite coordinate, cannot be highlighted.
    pub fn is_valid(&self) -> bool {
        [self.x0, self.y0, self.x1, self.y1].iter().all(|v| v.is_finite())
            && self.x1 >= self.x0
            && self.y1 >= self.y0
    }

    pub fn width(&self) -> f64 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f64 {
        self.y1 - self.y0
    }
}

impl From<[f64; 4]> for BBox {
    fn from([x0, y0, x1, y1]: [f64; 4]) -> Self {
        Self { x0, y0, x1, y1 }
    }
}

impl From<BBox> for [f64; 4] {
    fn from(b: BBox) -> Self {
        [b.x0, b.y0, b.x1, b.y1]
    }
}

/// A reference to the page (and optionally the region) that supports an answer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Citation {
    #[serde(default)]
    pub doc_id: String,
    #[serde(alias = "title")]
    pub doc_title: String,
    pub pdf_url: String,
    /// 1-based.
    pub page: u32,
    /// Anything other than four numbers reads as no box.
    #[serde(default, deserialize_with = "lenient_bbox", skip_serializing_if = "Option::is_none")]
    pub bbox: Option<BBox>,
    #[serde(default)]
    pub snippet: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

fn lenient_bbox<'de, D>(deserializer: D) -> Result<Option<BBox>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(raw.and_then(|value| <[f64; 4]>::deserialize(value).ok()).map(BBox::from))
}

impl Citation {
    /// The bounding box, if it is usable for a highlight.
    pub fn highlight(&self) -> Option<BBox> {
        self.bbox.filter(BBox::is_valid)
    }
}

/// Body of the outbound `POST /chat` request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub query: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn citation_accepts_backend_title_alias() {
        let json = r#"{"title":"manual.pdf","pdf_url":"/uploads/manual.pdf","page":3,"snippet":"Torque"}"#;
        let c: Citation = serde_json::from_str(json).unwrap();
        assert_eq!(c.doc_title, "manual.pdf");
        assert_eq!(c.doc_id, "");
        assert_eq!(c.page, 3);
        assert!(c.bbox.is_none());
        assert!(c.score.is_none());
    }

    #[test]
    fn citation_bbox_is_a_four_element_array() {
        let json = r#"{"doc_id":"d1","doc_title":"A","pdf_url":"/a.pdf","page":1,
                       "bbox":[72,700,300,720],"snippet":"","score":0.82}"#;
        let c: Citation = serde_json::from_str(json).unwrap();
        assert_eq!(c.bbox, Some(BBox::new(72.0, 700.0, 300.0, 720.0)));
        assert_eq!(c.score, Some(0.82));

        let back = serde_json::to_value(&c).unwrap();
        assert_eq!(back["bbox"], serde_json::json!([72.0, 700.0, 300.0, 720.0]));
    }

    #[test]
    fn misshapen_bbox_reads_as_absent() {
        for bbox in ["[1,2,3]", "[1,2,3,4,5]", "[1,2,null,4]", "null", "{\"x0\":1}"] {
            let json = format!(r#"{{"title":"A","pdf_url":"/a.pdf","page":4,"bbox":{bbox}}}"#);
            let c: Citation = serde_json::from_str(&json).unwrap();
            assert_eq!(c.bbox, None, "bbox {bbox}");
            assert_eq!(c.page, 4);
        }
    }

    #[test]
    fn inverted_bbox_yields_no_highlight() {
        let mut c: Citation = serde_json::from_str(
            r#"{"doc_title":"A","pdf_url":"/a.pdf","page":1,"bbox":[100,100,100,50]}"#,
        )
        .unwrap();
        assert!(c.bbox.is_some());
        assert!(c.highlight().is_none());

        c.bbox = Some(BBox::new(0.0, f64::NAN, 1.0, 1.0));
        assert!(c.highlight().is_none());
    }

    #[test]
    fn role_round_trips_through_strings() {
        assert_eq!(MessageRole::try_from("Assistant".to_string()), Ok(MessageRole::Assistant));
        assert!(MessageRole::try_from("system".to_string()).is_err());
        assert_eq!(MessageRole::User.to_string(), "user");
    }
}
