//! ChatBackend trait definition.
//!
//! This is the seam between the orchestration engine and the HTTP client
//! that talks to the inference server. Uses RPITIT for the async methods;
//! the response body is a boxed byte stream so the decoder stays
//! independent of the HTTP library.

use std::future::Future;
use std::pin::Pin;

use futures_util::Stream;

use colloquy_types::error::ConversationError;
use colloquy_types::llm::ChatRequest;

/// Raw response body of a streaming chat request, chunked as it arrives.
pub type ByteStream =
    Pin<Box<dyn Stream<Item = Result<Vec<u8>, ConversationError>> + Send + 'static>>;

/// Trait for streaming chat backends.
///
/// Implementations classify their failures:
/// - [`ConversationError::BackendUnavailable`] from `probe` when the server is not up
/// - [`ConversationError::Transport`] for network-level failures (retryable)
/// - [`ConversationError::Application`] for structured errors such as an unknown model
///
/// Implementations live in colloquy-infra (e.g., `OllamaBackend`).
pub trait ChatBackend: Send + Sync {
    /// Human-readable backend name (e.g., "ollama").
    fn name(&self) -> &str;

    /// Short-timeout liveness check. Never retried.
    fn probe(&self) -> impl Future<Output = Result<(), ConversationError>> + Send;

    /// Issue a streaming chat request and return the response body once the
    /// status line has been accepted.
    fn open_chat(
        &self,
        request: &ChatRequest,
    ) -> impl Future<Output = Result<ByteStream, ConversationError>> + Send;
}
