use thiserror::Error;

/// Top-level application error shared by the server, the CLI and the browser client.
/// All variants carry a human-readable message for display/logging.
#[derive(Debug, Error)]
pub enum AppError {
    // ── Transport errors ─────────────────────────────────────────────────────
    #[error("Backend unreachable at {url}: {message}")]
    Transport { url: String, message: String },

    #[error("Backend answered {status} for {url}")]
    UpstreamStatus { url: String, status: u16 },

    // ── Validation errors ────────────────────────────────────────────────────
    #[error("Field '{field_name}' cannot be empty")]
    EmptyField { field_name: String },

    #[error("Field '{field_name}' exceeds max length of {max_length} (actual: {actual_length})")]
    FieldTooLong { field_name: String, max_length: usize, actual_length: usize },

    #[error("Invalid citation link: {reason}")]
    InvalidDeepLink { reason: String },

    // ── Citation preview errors ──────────────────────────────────────────────
    #[error("Failed to render page {page} of {pdf_url}: {message}")]
    Rasterization { pdf_url: String, page: u32, message: String },

    // ── System errors ────────────────────────────────────────────────────────
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn transport(url: impl Into<String>, message: impl ToString) -> Self {
        AppError::Transport { url: url.into(), message: message.to_string() }
    }

    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            AppError::EmptyField { .. }
                | AppError::FieldTooLong { .. }
                | AppError::InvalidDeepLink { .. }
        )
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, AppError::Transport { .. } | AppError::UpstreamStatus { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classification_helpers() {
        let empty = AppError::EmptyField { field_name: "query".into() };
        assert!(empty.is_validation());
        assert!(!empty.is_transport());

        let down = AppError::transport("http://127.0.0.1:8000/chat", "connection refused");
        assert!(down.is_transport());
        assert_eq!(
            down.to_string(),
            "Backend unreachable at http://127.0.0.1:8000/chat: connection refused"
        );
    }
}
