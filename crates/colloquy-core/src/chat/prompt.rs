//! Per-request prompt composition.
//!
//! Every request carries exactly two messages: the persona's system prompt
//! and one synthesized user message embedding a short window of the
//! transcript. Nothing from earlier requests is carried forward.

use colloquy_types::llm::{ChatRequest, Message};
use colloquy_types::persona::{ConversationMode, Persona, USER_DISPLAY_NAME, USER_EMOJI};

/// Comma-separated labels of everyone `participants[self_index]` is talking to.
pub fn build_roster(participants: &[Persona], self_index: usize, mode: ConversationMode) -> String {
    let mut entries: Vec<String> = participants
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != self_index)
        .map(|(_, p)| p.label())
        .collect();

    if !mode.is_auto() {
        entries.push(format!("{USER_EMOJI} {USER_DISPLAY_NAME}"));
    }
    entries.join(", ")
}

/// The user message a participant receives for its turn.
pub fn compose_user_message(window: &[String], previous: &str) -> String {
    let mut message = String::from("Recent conversation:\n\n");
    for line in window {
        message.push_str(line);
        message.push('\n');
    }
    message.push_str("\nThe most recent message was:\n");
    message.push_str(previous.trim());
    message.push_str("\n\nWrite your reply to the group.");
    message
}

/// Build the full request for one participant step.
pub fn compose_request(
    model: &str,
    system_prompt: String,
    window: &[String],
    previous: &str,
) -> ChatRequest {
    ChatRequest::streaming(
        model,
        vec![
            Message::system(system_prompt),
            Message::user(compose_user_message(window, previous)),
        ],
    )
}
