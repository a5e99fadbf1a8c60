//! Streaming chat client for a retrieval-augmented question-answering backend.
//!
//! The platform-neutral core (frame parsing, transcript, sessions, citation
//! geometry) builds for both native targets and `wasm32`; the browser
//! frontend depends on it directly. The backend client, the proxy routes and
//! configuration are native-only.

pub mod deeplink;
pub mod errors;
pub mod geometry;
pub mod models;
pub mod preview;
pub mod session;
pub mod stream;
pub mod transcript;

#[cfg(not(target_arch = "wasm32"))]
pub mod config;
#[cfg(not(target_arch = "wasm32"))]
pub mod routes;
#[cfg(not(target_arch = "wasm32"))]
pub mod service;
