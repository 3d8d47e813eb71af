//! Console-facing collaborator traits.
//!
//! The orchestration engine never writes to a terminal directly. It reports
//! text through a [`ConsoleReporter`], shows activity through a
//! [`ProgressIndicator`], and asks the human for input through a
//! [`HumanInput`]. The CLI crate supplies terminal implementations; tests
//! supply recording ones.

use std::future::Future;

use colloquy_types::persona::ColorToken;

/// Renders colored text. Purely cosmetic.
pub trait ConsoleReporter: Send + Sync {
    /// Print `text` followed by a newline.
    fn line(&self, text: &str, color: ColorToken);

    /// Print `text` with no trailing newline, flushing immediately.
    fn fragment(&self, text: &str, color: ColorToken);
}

/// What a progress indicator needs to draw its own line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProgressLabel {
    pub text: String,
    pub label_color: ColorToken,
    pub text_color: ColorToken,
}

/// Handle to a running progress indicator.
///
/// `stop` is idempotent: calling it more than once, or after the indicator
/// already finished on its own, is a no-op.
pub trait ProgressHandle: Send + Sync {
    fn stop(&self);
}

/// Starts a visual affordance that runs while a request is in flight.
pub trait ProgressIndicator: Send + Sync {
    fn start(&self, label: &ProgressLabel) -> Box<dyn ProgressHandle>;
}

/// Progress indicator that draws nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopProgress;

struct NoopHandle;

impl ProgressHandle for NoopHandle {
    fn stop(&self) {}
}

impl ProgressIndicator for NoopProgress {
    fn start(&self, _label: &ProgressLabel) -> Box<dyn ProgressHandle> {
        Box::new(NoopHandle)
    }
}

/// Result of asking the human for the next message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    /// A submitted line, already trimmed. May be empty.
    Message(String),
    /// End of input (Ctrl+D or closed stdin).
    Eof,
    /// Interrupt at the prompt (Ctrl+C).
    Interrupted,
}

/// Source of human messages in interactive mode.
pub trait HumanInput: Send {
    fn read_message(&mut self, prompt: &str) -> impl Future<Output = InputEvent> + Send;
}
