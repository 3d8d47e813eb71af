//! Shared domain types for Colloquy.
//!
//! This crate contains the core domain types used across the workspace:
//! chat wire types, personas, conversation configuration, global settings,
//! and the conversation error taxonomy.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod config;
pub mod conversation;
pub mod error;
pub mod llm;
pub mod persona;
