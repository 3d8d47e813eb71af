//! Exponential backoff for transport failures.
//!
//! `RetryPolicy` is the immutable configuration; `RetryState` is scoped to a
//! single logical request and discarded on success or final failure.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use colloquy_types::config::RetryConfig;
use colloquy_types::error::ConversationError;

/// Backoff parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Total attempts including the first.
    pub max_attempts: u32,
    /// Wait before the second attempt, used unmodified.
    pub initial_delay: Duration,
    /// Growth factor applied to every later wait.
    pub multiplier: f64,
    /// Cap on any single wait.
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            initial_delay: Duration::from_millis(config.initial_delay_ms),
            multiplier: sanitize_multiplier(config.multiplier),
            max_delay: Duration::from_millis(config.max_delay_ms),
        }
    }
}

/// Growth factor used when the configured one is unusable.
const FALLBACK_MULTIPLIER: f64 = 1.5;

/// Non-finite or shrinking multipliers fall back to the default growth.
fn sanitize_multiplier(multiplier: f64) -> f64 {
    if multiplier.is_finite() && multiplier >= 1.0 {
        multiplier
    } else {
        tracing::warn!(multiplier, "invalid retry multiplier, using {FALLBACK_MULTIPLIER}");
        FALLBACK_MULTIPLIER
    }
}

impl RetryPolicy {
    /// The full sequence of waits this policy would produce.
    ///
    /// Has `max_attempts - 1` entries.
    pub fn schedule(&self) -> Vec<Duration> {
        let mut state = RetryState::new(self);
        std::iter::from_fn(|| state.next_delay()).collect()
    }
}

/// Per-request retry bookkeeping.
#[derive(Debug, Clone)]
pub struct RetryState {
    policy: RetryPolicy,
    attempt: u32,
    current_delay: Option<Duration>,
}

impl RetryState {
    pub fn new(policy: &RetryPolicy) -> Self {
        Self {
            policy: policy.clone(),
            attempt: 1,
            current_delay: None,
        }
    }

    /// 1-based number of the attempt currently in flight.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    pub fn max_attempts(&self) -> u32 {
        self.policy.max_attempts
    }

    /// Advance to the next attempt and return how long to wait before it.
    ///
    /// Returns `None` once all attempts are used up.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempt >= self.policy.max_attempts {
            return None;
        }
        self.attempt += 1;

        let delay = match self.current_delay {
            None => self.policy.initial_delay,
            Some(previous) => {
                let grown = previous.as_secs_f64() * self.policy.multiplier;
                Duration::try_from_secs_f64(grown)
                    .map_or(self.policy.max_delay, |d| d.min(self.policy.max_delay))
            }
        };
        self.current_delay = Some(delay);
        Some(delay)
    }
}

/// Sleep for `delay` unless `cancel` fires first.
///
/// Returns [`ConversationError::Interrupted`] as soon as the token is
/// cancelled, including when it already was.
pub async fn sleep_or_cancel(
    delay: Duration,
    cancel: &CancellationToken,
) -> Result<(), ConversationError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ConversationError::Interrupted),
        _ = tokio::time::sleep(delay) => Ok(()),
    }
}
