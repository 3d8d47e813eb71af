//! Infrastructure layer for Colloquy.
//!
//! Contains the concrete adapters for the ports defined in `colloquy-core`:
//! the Ollama HTTP backend, the config file loader, and the persona catalog.

pub mod config;
pub mod llm;
pub mod persona;
