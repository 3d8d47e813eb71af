//! Terminal rendering of conversation output.

use std::io::Write;

use console::Style;

use colloquy_core::ui::ConsoleReporter;
use colloquy_types::persona::ColorToken;

/// Map a persona color token to a terminal style.
pub fn style_for(color: ColorToken) -> Style {
    let style = Style::new();
    match color {
        ColorToken::Black => style.black(),
        ColorToken::Red => style.red(),
        ColorToken::Green => style.green(),
        ColorToken::Yellow => style.yellow(),
        ColorToken::Blue => style.blue(),
        ColorToken::Magenta => style.magenta(),
        ColorToken::Cyan => style.cyan(),
        ColorToken::White => style.white(),
        ColorToken::Dim => style.dim(),
    }
}

/// Writes conversation text to stdout. Streamed fragments are flushed
/// immediately so tokens appear as they arrive.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalReporter;

impl ConsoleReporter for TerminalReporter {
    fn line(&self, text: &str, color: ColorToken) {
        println!("{}", style_for(color).apply_to(text));
    }

    fn fragment(&self, text: &str, color: ColorToken) {
        let mut stdout = std::io::stdout().lock();
        let _ = write!(stdout, "{}", style_for(color).apply_to(text));
        let _ = stdout.flush();
    }
}
