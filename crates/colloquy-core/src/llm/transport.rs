//! Resilient transport: readiness gate, retry with backoff, live decoding.
//!
//! Every logical request follows the same path:
//!
//! 1. probe the backend once; failure is fatal and never retried
//! 2. open the chat stream, retrying [`ConversationError::Transport`] failures
//!    with the configured backoff
//! 3. decode the body, forwarding fragments to a [`ReplySink`]
//!
//! A transport failure in the middle of a body restarts the whole request.
//! Whatever was already streamed is discarded and the request is replayed
//! from scratch, sharing the same attempt budget.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, instrument, warn};

use colloquy_types::error::ConversationError;
use colloquy_types::llm::ChatRequest;
use colloquy_types::persona::ColorToken;

use super::backend::{ByteStream, ChatBackend};
use super::decoder::{Decoded, StreamDecoder};
use super::retry::{RetryPolicy, RetryState, sleep_or_cancel};
use crate::ui::ConsoleReporter;

/// Receives the live output of a request.
///
/// Attempt hooks bracket every request attempt, including failed ones, so
/// implementations can run a progress indicator per attempt.
pub trait ReplySink {
    /// Attempt number `attempt` (1-based) is about to be sent.
    fn attempt_started(&mut self, _attempt: u32) {}

    /// A piece of content arrived.
    fn fragment(&mut self, text: &str);

    /// The current attempt ended, successfully or not.
    fn attempt_finished(&mut self) {}

    /// Everything streamed by the last attempt is being thrown away.
    fn discard(&mut self) {}
}

/// Chat transport with readiness probing and bounded retries.
pub struct ResilientTransport<B> {
    backend: B,
    policy: RetryPolicy,
    reporter: Arc<dyn ConsoleReporter>,
}

impl<B: ChatBackend> ResilientTransport<B> {
    pub fn new(backend: B, policy: RetryPolicy, reporter: Arc<dyn ConsoleReporter>) -> Self {
        Self {
            backend,
            policy,
            reporter,
        }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Probe, then open a streaming request and hand back the raw body.
    #[instrument(skip_all, fields(backend = self.backend.name(), model = %request.model))]
    pub async fn send(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ByteStream, ConversationError> {
        self.ensure_ready(cancel).await?;

        let mut retry = RetryState::new(&self.policy);
        loop {
            match self.open(request, cancel).await {
                Ok(stream) => return Ok(stream),
                Err(err) if err.is_retryable() => self.backoff(&mut retry, err, cancel).await?,
                Err(err) => return Err(err),
            }
        }
    }

    /// Probe, send, and decode a full reply.
    ///
    /// Returns [`Decoded::Interrupted`] when cancellation is observed while
    /// the body is streaming, and [`ConversationError::Interrupted`] when it
    /// is observed before or between attempts.
    #[instrument(skip_all, fields(backend = self.backend.name(), model = %request.model))]
    pub async fn exchange<S: ReplySink>(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
        sink: &mut S,
    ) -> Result<Decoded, ConversationError> {
        self.ensure_ready(cancel).await?;

        let mut retry = RetryState::new(&self.policy);
        loop {
            sink.attempt_started(retry.attempt());
            let (result, emitted) = self.attempt(request, cancel, sink).await;
            sink.attempt_finished();

            match result {
                Ok(decoded) => return Ok(decoded),
                Err(err) if err.is_retryable() => {
                    if emitted {
                        warn!(
                            attempt = retry.attempt(),
                            "reply broke off mid-stream; discarding partial output and \
                             replaying the request, the backend may repeat itself"
                        );
                        sink.discard();
                    }
                    self.backoff(&mut retry, err, cancel).await?;
                }
                Err(err) => return Err(err),
            }
        }
    }

    async fn ensure_ready(&self, cancel: &CancellationToken) -> Result<(), ConversationError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ConversationError::Interrupted),
            result = self.backend.probe() => result,
        }
    }

    async fn open(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ByteStream, ConversationError> {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ConversationError::Interrupted),
            result = self.backend.open_chat(request) => result,
        }
    }

    /// One open-and-decode attempt. The flag reports whether any content
    /// reached the sink.
    async fn attempt<S: ReplySink>(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
        sink: &mut S,
    ) -> (Result<Decoded, ConversationError>, bool) {
        let stream = match self.open(request, cancel).await {
            Ok(stream) => stream,
            Err(err) => return (Err(err), false),
        };

        let mut emitted = false;
        let result = StreamDecoder::decode(stream, cancel, |fragment| {
            emitted = true;
            sink.fragment(fragment);
        })
        .await;
        (result, emitted)
    }

    /// Wait before the next attempt, or give up when none are left.
    async fn backoff(
        &self,
        retry: &mut RetryState,
        err: ConversationError,
        cancel: &CancellationToken,
    ) -> Result<(), ConversationError> {
        let failed_attempt = retry.attempt();
        let Some(delay) = retry.next_delay() else {
            error!(attempts = failed_attempt, error = %err, "chat request failed, giving up");
            return Err(ConversationError::RetriesExhausted {
                attempts: failed_attempt,
                last: Box::new(err),
            });
        };

        warn!(
            attempt = failed_attempt,
            max_attempts = retry.max_attempts(),
            delay_ms = delay.as_millis() as u64,
            error = %err,
            "chat request failed, retrying"
        );
        self.reporter.line(
            &format!(
                "⚠ {err}. Retrying in {:.1}s (attempt {}/{})...",
                delay.as_secs_f64(),
                retry.attempt(),
                retry.max_attempts()
            ),
            ColorToken::Yellow,
        );

        sleep_or_cancel(delay, cancel).await?;
        debug!(attempt = retry.attempt(), "retrying chat request");
        Ok(())
    }
}
