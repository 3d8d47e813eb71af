//! Human input for interactive conversations.
//!
//! On a terminal each prompt gets a fresh `rustyline_async::Readline`, so the
//! terminal is only in raw mode while the user is typing and Ctrl+C during
//! streaming still reaches the process signal handler. When stdin is piped,
//! lines are read plainly.

use std::io::{IsTerminal, Write};

use rustyline_async::{Readline, ReadlineEvent};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Lines, Stdin};

use colloquy_core::ui::{HumanInput, InputEvent};

pub struct TerminalInput {
    piped: Option<Lines<BufReader<Stdin>>>,
}

impl TerminalInput {
    pub fn new() -> Self {
        let piped = if std::io::stdin().is_terminal() {
            None
        } else {
            Some(BufReader::new(tokio::io::stdin()).lines())
        };
        Self { piped }
    }
}

impl Default for TerminalInput {
    fn default() -> Self {
        Self::new()
    }
}

impl HumanInput for TerminalInput {
    async fn read_message(&mut self, prompt: &str) -> InputEvent {
        if let Some(lines) = self.piped.as_mut() {
            print!("{prompt}");
            let _ = std::io::stdout().flush();
            let event = next_line(lines).await;
            println!();
            return event;
        }

        let (mut rl, _writer) = match Readline::new(prompt.to_string()) {
            Ok(pair) => pair,
            Err(e) => {
                tracing::warn!("failed to open line editor: {e}");
                return InputEvent::Eof;
            }
        };

        let event = match rl.readline().await {
            Ok(ReadlineEvent::Line(line)) => InputEvent::Message(line.trim().to_string()),
            Ok(ReadlineEvent::Eof) => InputEvent::Eof,
            Ok(ReadlineEvent::Interrupted) => InputEvent::Interrupted,
            Err(e) => {
                tracing::debug!("line editor closed: {e}");
                InputEvent::Eof
            }
        };
        let _ = rl.flush();
        event
    }
}

async fn next_line<R: AsyncBufRead + Unpin>(lines: &mut Lines<R>) -> InputEvent {
    match lines.next_line().await {
        Ok(Some(line)) => InputEvent::Message(line.trim().to_string()),
        Ok(None) => InputEvent::Eof,
        Err(e) => {
            tracing::debug!("stdin read failed: {e}");
            InputEvent::Eof
        }
    }
}
