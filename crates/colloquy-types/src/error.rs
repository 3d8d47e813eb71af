use thiserror::Error;

/// Errors produced while running a conversation.
///
/// Only [`ConversationError::Transport`] is retryable. [`ConversationError::Interrupted`]
/// is a graceful stop and is never reported to the user as a failure.
#[derive(Debug, Error)]
pub enum ConversationError {
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("backend error: {0}")]
    Application(String),

    #[error("malformed stream chunk: {0}")]
    Decode(String),

    #[error("interrupted")]
    Interrupted,

    #[error("invalid conversation: {0}")]
    Validation(String),

    #[error("unknown persona '{0}'")]
    UnknownPersona(String),

    #[error("request failed after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        #[source]
        last: Box<ConversationError>,
    },

    #[error("failed to save transcript: {0}")]
    Persistence(String),
}

impl ConversationError {
    /// Whether the transport should try the request again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ConversationError::Transport(_))
    }

    pub fn is_interrupted(&self) -> bool {
        matches!(self, ConversationError::Interrupted)
    }
}
