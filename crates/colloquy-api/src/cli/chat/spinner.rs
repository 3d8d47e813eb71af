//! Thinking spinner shown while a persona's request is in flight.
//!
//! The spinner repaints from its own tokio task on a fixed tick. Stopping
//! cancels that task and clears the line before any reply text is printed.

use std::time::Duration;

use indicatif::{ProgressBar, ProgressStyle};
use tokio_util::sync::CancellationToken;

use colloquy_core::ui::{ProgressHandle, ProgressIndicator, ProgressLabel};

use super::renderer::style_for;

const TICK: Duration = Duration::from_millis(80);

pub struct SpinnerProgress {
    visible: bool,
}

impl Default for SpinnerProgress {
    fn default() -> Self {
        Self::new()
    }
}

impl SpinnerProgress {
    pub fn new() -> Self {
        Self { visible: true }
    }

    /// A spinner that keeps its timing behavior but never draws.
    pub fn hidden() -> Self {
        Self { visible: false }
    }
}

impl ProgressIndicator for SpinnerProgress {
    fn start(&self, label: &ProgressLabel) -> Box<dyn ProgressHandle> {
        let bar = if self.visible {
            ProgressBar::new_spinner()
        } else {
            ProgressBar::hidden()
        };
        if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.cyan} {msg}") {
            bar.set_style(style);
        }
        bar.set_message(style_for(label.label_color).apply_to(&label.text).to_string());

        let token = CancellationToken::new();
        tokio::spawn(repaint(bar.clone(), token.clone()));

        Box::new(SpinnerHandle { bar, token })
    }
}

async fn repaint(bar: ProgressBar, token: CancellationToken) {
    let mut ticker = tokio::time::interval(TICK);
    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            _ = ticker.tick() => bar.tick(),
        }
    }
}

struct SpinnerHandle {
    bar: ProgressBar,
    token: CancellationToken,
}

impl ProgressHandle for SpinnerHandle {
    fn stop(&self) {
        if self.token.is_cancelled() {
            return;
        }
        self.token.cancel();
        self.bar.finish_and_clear();
    }
}

impl Drop for SpinnerHandle {
    fn drop(&mut self) {
        self.stop();
    }
}
