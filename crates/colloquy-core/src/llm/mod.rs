//! Chat backend abstractions for Colloquy.
//!
//! - `ChatBackend`: RPITIT trait implemented by concrete HTTP clients
//! - `StreamDecoder`: incremental NDJSON decoding with cancellation checks
//! - `RetryPolicy` / `RetryState`: exponential backoff bookkeeping
//! - `ResilientTransport`: probe, retry, and decode in one call

pub mod backend;
pub mod decoder;
pub mod retry;
pub mod transport;
