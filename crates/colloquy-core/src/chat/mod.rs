//! Multi-persona conversation engine.
//!
//! `TurnScheduler` drives the conversation; the other modules hold the
//! pieces it composes: persona lookup, prompt building, transcript, and
//! per-run state.

pub mod persona;
pub mod prompt;
pub mod scheduler;
pub mod session;
pub mod transcript;
