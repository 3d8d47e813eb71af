//! Mutable state of one running conversation.
//!
//! Created when the scheduler starts, mutated once per participant step and
//! once per turn boundary, dropped when the scheduler returns.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::time::Instant;
use uuid::Uuid;

use colloquy_types::llm::Message;
use colloquy_types::persona::Persona;

use super::transcript::Transcript;

pub struct ConversationState {
    pub conversation_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub last_active_at: DateTime<Utc>,
    clock: Instant,
    /// 1-based turn number.
    pub current_turn: u32,
    /// Turns in which every participant replied.
    pub turns_completed: u32,
    /// Message the next participant responds to.
    pub current_message: String,
    pub transcript: Transcript,
    /// Last request sent to each participant, keyed by canonical name.
    requests: HashMap<String, Vec<Message>>,
}

impl ConversationState {
    /// Start a conversation seeded with the human's starter message.
    pub fn new(starter_message: &str) -> Self {
        let now = Utc::now();
        let mut transcript = Transcript::new();
        transcript.push_user(starter_message);

        Self {
            conversation_id: Uuid::now_v7(),
            started_at: now,
            last_active_at: now,
            clock: Instant::now(),
            current_turn: 1,
            turns_completed: 0,
            current_message: starter_message.trim().to_string(),
            transcript,
            requests: HashMap::new(),
        }
    }

    /// Replace `persona`'s request list with `messages`.
    pub fn set_request(&mut self, persona: &Persona, messages: Vec<Message>) {
        self.requests
            .insert(Persona::canonical_name(&persona.name), messages);
    }

    pub fn request_for(&self, name: &str) -> Option<&[Message]> {
        self.requests
            .get(&Persona::canonical_name(name))
            .map(Vec::as_slice)
    }

    pub fn record_reply(&mut self, persona: &Persona, text: &str) {
        self.transcript.push_persona(persona, text);
        self.current_message = text.trim().to_string();
        self.touch();
    }

    pub fn record_user_message(&mut self, text: &str) {
        self.transcript.push_user(text);
        self.current_message = text.trim().to_string();
        self.touch();
    }

    pub fn complete_turn(&mut self) {
        self.turns_completed = self.current_turn;
        self.touch();
    }

    pub fn advance_turn(&mut self) {
        self.current_turn += 1;
        self.touch();
    }

    pub fn elapsed(&self) -> Duration {
        self.clock.elapsed()
    }

    fn touch(&mut self) {
        self.last_active_at = Utc::now();
    }
}

/// Compact elapsed-time rendering: `42s`, `3m 07s`, `1h 02m 09s`.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs();
    let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
    if h > 0 {
        format!("{h}h {m:02}m {s:02}s")
    } else if m > 0 {
        format!("{m}m {s:02}s")
    } else {
        format!("{s}s")
    }
}
