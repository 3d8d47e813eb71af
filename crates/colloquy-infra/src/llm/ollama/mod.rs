//! Ollama-compatible chat backend.
//!
//! Talks to a locally hosted inference server speaking the Ollama HTTP API:
//! `GET /api/tags` for readiness and `POST /api/chat` for streaming chat.

pub mod client;
pub mod streaming;

pub use client::OllamaBackend;
