//! Conversation configuration and results.

use std::collections::HashSet;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ConversationError;
use crate::persona::Persona;

/// Fewest participants a conversation may have.
pub const MIN_PARTICIPANTS: usize = 2;

/// Most participants a conversation may have.
pub const MAX_PARTICIPANTS: usize = 15;

/// Parameters of a single conversation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationConfig {
    /// Persona names in speaking order.
    pub participants: Vec<String>,
    /// First message, attributed to the human user.
    pub starter_message: String,
    /// Turn limit; 0 means unbounded.
    #[serde(default)]
    pub max_turns: u32,
    /// When true no human participates after the starter message.
    #[serde(default)]
    pub auto_mode: bool,
    /// Where to write the transcript when the conversation ends.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub save_file: Option<PathBuf>,
}

impl ConversationConfig {
    /// Check participant count and case-insensitive uniqueness.
    ///
    /// Resolvability against a persona provider is checked separately by
    /// the scheduler, still before any network call.
    pub fn validate(&self) -> Result<(), ConversationError> {
        self.validate_participants()?;

        if self.starter_message.trim().is_empty() {
            return Err(ConversationError::Validation(
                "starter message must not be empty".to_string(),
            ));
        }

        Ok(())
    }

    /// The participant half of [`validate`](Self::validate), usable before
    /// a starter message is known.
    pub fn validate_participants(&self) -> Result<(), ConversationError> {
        let count = self.participants.len();
        if !(MIN_PARTICIPANTS..=MAX_PARTICIPANTS).contains(&count) {
            return Err(ConversationError::Validation(format!(
                "a conversation needs between {MIN_PARTICIPANTS} and {MAX_PARTICIPANTS} participants, got {count}"
            )));
        }

        let mut seen = HashSet::with_capacity(count);
        for name in &self.participants {
            let canonical = Persona::canonical_name(name);
            if canonical.is_empty() {
                return Err(ConversationError::Validation(
                    "participant names must not be empty".to_string(),
                ));
            }
            if !seen.insert(canonical) {
                return Err(ConversationError::Validation(format!(
                    "participant '{name}' is listed more than once"
                )));
            }
        }

        Ok(())
    }
}

/// How a conversation ended without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationOutcome {
    /// Turn limit reached or the human ended the conversation.
    Completed,
    /// Cancellation was observed.
    Stopped,
}

/// Summary returned when the scheduler terminates.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationSummary {
    pub conversation_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    pub outcome: ConversationOutcome,
    /// Turns in which every participant replied.
    pub turns_completed: u32,
    pub transcript_lines: usize,
    /// Set when a save file was configured and writing it succeeded.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_to: Option<PathBuf>,
}
