//! Opening banner for a conversation.

use console::style;

use colloquy_types::persona::{ConversationMode, Persona};

use super::renderer::style_for;

/// Print who is talking, with which model, and how the run will end.
pub fn print_conversation_banner(
    personas: &[Persona],
    mode: ConversationMode,
    max_turns: u32,
    model: &str,
    base_url: &str,
) {
    let roster: Vec<String> = personas
        .iter()
        .map(|p| style_for(p.label_color).bold().apply_to(p.label()).to_string())
        .collect();

    println!();
    println!("  {}", roster.join(&format!(" {} ", style("·").dim())));
    println!();
    println!("  {}  {}", style("Model:").bold(), style(model).dim());
    println!("  {}  {}", style("Server:").bold(), style(base_url).dim());
    let turns = if max_turns == 0 {
        "unlimited".to_string()
    } else {
        max_turns.to_string()
    };
    println!("  {}  {}", style("Turns:").bold(), style(turns).dim());
    println!();
    let hint = match mode {
        ConversationMode::Auto => "Personas talk among themselves. Ctrl+C to stop.",
        ConversationMode::Interactive => {
            "You are prompted after every round. Empty line or Ctrl+D to finish, Ctrl+C to stop."
        }
    };
    println!("  {}", style(hint).dim());
    println!("  {}", style("---").dim());
    println!();
}
