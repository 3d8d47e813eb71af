//! Observability setup for Colloquy: log filtering and optional trace export.

pub mod tracing_setup;
