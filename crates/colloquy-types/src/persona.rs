//! Persona types.
//!
//! A persona is a named conversational identity applied to one participant.
//! Personas are resolved before a conversation starts and stay immutable for
//! its duration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Display name used for the human participant in transcripts and rosters.
pub const USER_DISPLAY_NAME: &str = "User";

/// Emoji prefix for human transcript lines.
pub const USER_EMOJI: &str = "👤";

/// Named terminal color applied to persona labels and text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorToken {
    Black,
    Red,
    Green,
    Yellow,
    Blue,
    Magenta,
    Cyan,
    #[default]
    White,
    Dim,
}

impl fmt::Display for ColorToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ColorToken::Black => "black",
            ColorToken::Red => "red",
            ColorToken::Green => "green",
            ColorToken::Yellow => "yellow",
            ColorToken::Blue => "blue",
            ColorToken::Magenta => "magenta",
            ColorToken::Cyan => "cyan",
            ColorToken::White => "white",
            ColorToken::Dim => "dim",
        };
        f.write_str(name)
    }
}

impl FromStr for ColorToken {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "black" => Ok(ColorToken::Black),
            "red" => Ok(ColorToken::Red),
            "green" => Ok(ColorToken::Green),
            "yellow" => Ok(ColorToken::Yellow),
            "blue" => Ok(ColorToken::Blue),
            "magenta" | "purple" => Ok(ColorToken::Magenta),
            "cyan" => Ok(ColorToken::Cyan),
            "white" => Ok(ColorToken::White),
            "dim" | "grey" | "gray" => Ok(ColorToken::Dim),
            other => Err(format!("invalid color: '{other}'")),
        }
    }
}

/// Whether a human takes part after the starter message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConversationMode {
    /// Personas address only each other.
    Auto,
    /// A human is prompted for a new message after every turn.
    Interactive,
}

impl ConversationMode {
    pub fn from_auto_flag(auto_mode: bool) -> Self {
        if auto_mode {
            ConversationMode::Auto
        } else {
            ConversationMode::Interactive
        }
    }

    pub fn is_auto(self) -> bool {
        matches!(self, ConversationMode::Auto)
    }
}

/// A resolved persona snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Persona {
    /// Lookup key (matched case-insensitively).
    pub name: String,
    /// Name shown in transcripts and rosters.
    pub display_name: String,
    #[serde(default = "default_emoji")]
    pub emoji: String,
    #[serde(default)]
    pub label_color: ColorToken,
    #[serde(default)]
    pub text_color: ColorToken,
    /// Base system prompt describing the persona's character.
    pub system_prompt: String,
    /// Extra instructions appended in auto mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_prompt: Option<String>,
    /// Extra instructions appended in interactive mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interactive_prompt: Option<String>,
}

fn default_emoji() -> String {
    "🤖".to_string()
}

impl Persona {
    /// Canonical form of a persona name used for lookups and duplicate checks.
    pub fn canonical_name(name: &str) -> String {
        name.trim().to_lowercase()
    }

    /// Label used for transcript lines: `"<emoji> <display_name>"`.
    pub fn label(&self) -> String {
        format!("{} {}", self.emoji, self.display_name)
    }

    /// Render the system prompt for a conversation.
    ///
    /// `roster` lists the other participants this persona is talking to.
    pub fn render_system_prompt(&self, mode: ConversationMode, roster: &str) -> String {
        let mut prompt = format!(
            "You are {}. {}\n\nYou are in a group conversation with: {}.",
            self.display_name,
            self.system_prompt.trim(),
            roster
        );

        let mode_prompt = match mode {
            ConversationMode::Auto => self.auto_prompt.as_deref().unwrap_or(
                "There is no human in this conversation. Speak directly to the other participants \
                 and keep the discussion moving.",
            ),
            ConversationMode::Interactive => self.interactive_prompt.as_deref().unwrap_or(
                "A human user is part of this conversation and may respond after each round.",
            ),
        };
        prompt.push_str("\n\n");
        prompt.push_str(mode_prompt.trim());
        prompt.push_str(
            "\n\nStay in character. Reply with your own message only; do not write lines for \
             other participants or prefix your reply with your name.",
        );
        prompt
    }
}
