//! Chat backend implementations.

pub mod ollama;
