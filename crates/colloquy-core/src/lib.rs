//! Conversation orchestration engine for Colloquy.
//!
//! This crate defines the ports (backend, persona provider, console
//! collaborators) and the engine that drives them. It depends only on
//! `colloquy-types` -- never on `colloquy-infra` or any HTTP/terminal crate.

pub mod chat;
pub mod llm;
pub mod ui;

#[cfg(test)]
mod testing;
