//! Flat conversation transcript.
//!
//! One entry per message, rendered as `"<emoji> <name>: <text>"`. The
//! transcript is the only conversational memory personas get: each request
//! embeds a short trailing window of it.

use std::path::Path;

use tracing::info;

use colloquy_types::error::ConversationError;
use colloquy_types::persona::{Persona, USER_DISPLAY_NAME, USER_EMOJI};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Transcript {
    lines: Vec<String>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message from the human user.
    pub fn push_user(&mut self, text: &str) {
        self.lines
            .push(format!("{USER_EMOJI} {USER_DISPLAY_NAME}: {}", text.trim()));
    }

    /// Append a reply from `persona`.
    pub fn push_persona(&mut self, persona: &Persona, text: &str) {
        self.lines
            .push(format!("{}: {}", persona.label(), text.trim()));
    }

    /// The last `k` entries, oldest first.
    pub fn tail(&self, k: usize) -> &[String] {
        let start = self.lines.len().saturating_sub(k);
        &self.lines[start..]
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Newline-separated text with a trailing newline.
    pub fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            out.push_str(line);
            out.push('\n');
        }
        out
    }

    /// Write the transcript to `path`, replacing any existing file.
    pub async fn save(&self, path: &Path) -> Result<(), ConversationError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                ConversationError::Persistence(format!("{}: {e}", parent.display()))
            })?;
        }

        tokio::fs::write(path, self.render())
            .await
            .map_err(|e| ConversationError::Persistence(format!("{}: {e}", path.display())))?;

        info!(path = %path.display(), lines = self.lines.len(), "transcript saved");
        Ok(())
    }
}
