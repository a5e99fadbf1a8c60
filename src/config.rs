use std::path::PathBuf;

use crate::errors::AppError;

pub const DEFAULT_BACKEND_URL: &str = "http://127.0.0.1:8000";
pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_FRONTEND_DIST: &str = "frontend/dist";

/// Runtime settings, read from the environment (`.env` is loaded by the binaries).
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    /// Root of the RAG backend, e.g. `http://127.0.0.1:8000`.
    pub backend_url: String,
    pub port: u16,
    /// Built frontend served by the proxy.
    pub frontend_dist: PathBuf,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let backend_url = lookup("RAG_BACKEND_URL")
            .unwrap_or_else(|| DEFAULT_BACKEND_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let port = match lookup("PORT") {
            Some(p) => p
                .parse()
                .map_err(|_| AppError::Config(format!("PORT must be a port number, got '{p}'")))?,
            None => DEFAULT_PORT,
        };

        let frontend_dist = lookup("FRONTEND_DIST")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_FRONTEND_DIST));

        Ok(Self { backend_url, port, frontend_dist })
    }

    /// Address the proxy listens on.
    pub fn listen_addr(&self) -> String {
        format!("0.0.0.0:{}", self.port)
    }

    /// Origin the browser reaches the proxy at; used to print viewer links.
    pub fn public_origin(&self) -> String {
        format!("http://localhost:{}", self.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_when_unset() {
        let cfg = AppConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(cfg.backend_url, DEFAULT_BACKEND_URL);
        assert_eq!(cfg.port, 3000);
        assert_eq!(cfg.frontend_dist, PathBuf::from("frontend/dist"));
    }

    #[test]
    fn overrides_and_trailing_slash() {
        let cfg = AppConfig::from_lookup(lookup(&[
            ("RAG_BACKEND_URL", "http://rag.internal:9000/"),
            ("PORT", "8081"),
            ("FRONTEND_DIST", "/srv/rag-chat"),
        ]))
        .unwrap();
        assert_eq!(cfg.backend_url, "http://rag.internal:9000");
        assert_eq!(cfg.listen_addr(), "0.0.0.0:8081");
        assert_eq!(cfg.frontend_dist, PathBuf::from("/srv/rag-chat"));
    }

    #[test]
    fn rejects_bad_values() {
        let err = AppConfig::from_lookup(lookup(&[("PORT", "eighty")])).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn unrelated_variables_are_ignored() {
        let cfg = AppConfig::from_lookup(lookup(&[("RENDER_SCALE", "-1")])).unwrap();
        assert_eq!(cfg, AppConfig::from_lookup(lookup(&[])).unwrap());
    }
}
