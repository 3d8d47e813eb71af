//! `colloquy chat`: wire the terminal collaborators to the turn scheduler.

pub mod banner;
pub mod input;
pub mod renderer;
pub mod spinner;

use std::io::IsTerminal;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Result, bail};
use console::style;
use tokio_util::sync::CancellationToken;

use colloquy_core::chat::persona::PersonaProvider;
use colloquy_core::chat::scheduler::{SchedulerSettings, TurnScheduler};
use colloquy_core::chat::session::format_elapsed;
use colloquy_core::llm::retry::RetryPolicy;
use colloquy_core::llm::transport::ResilientTransport;
use colloquy_core::ui::{
    ConsoleReporter, HumanInput, InputEvent, NoopProgress, ProgressIndicator,
};
use colloquy_infra::llm::ollama::OllamaBackend;
use colloquy_types::conversation::{ConversationConfig, ConversationOutcome, ConversationSummary};
use colloquy_types::error::ConversationError;
use colloquy_types::persona::{ConversationMode, USER_DISPLAY_NAME, USER_EMOJI};

use self::banner::print_conversation_banner;
use self::input::TerminalInput;
use self::renderer::TerminalReporter;
use self::spinner::SpinnerProgress;
use crate::state::AppState;

pub struct ChatArgs {
    pub personas: Vec<String>,
    pub message: Option<String>,
    pub turns: u32,
    pub auto: bool,
    pub save: Option<PathBuf>,
}

/// Run one conversation in the terminal.
///
/// Returns `Ok(None)` when the user backed out before the conversation
/// started (Ctrl+C or Ctrl+D at the starter prompt).
pub async fn run_chat(
    state: &AppState,
    args: ChatArgs,
    cancel: &CancellationToken,
    json: bool,
) -> Result<Option<ConversationSummary>> {
    let mut config = ConversationConfig {
        participants: args.personas,
        starter_message: args.message.unwrap_or_default(),
        max_turns: args.turns,
        auto_mode: args.auto,
        save_file: args.save,
    };

    config.validate_participants()?;
    let mut personas = Vec::with_capacity(config.participants.len());
    for name in &config.participants {
        match state.personas.resolve(name) {
            Some(persona) => personas.push(persona),
            None => return Err(ConversationError::UnknownPersona(name.clone()).into()),
        }
    }

    let mode = ConversationMode::from_auto_flag(config.auto_mode);
    let mut input = TerminalInput::new();

    if config.starter_message.trim().is_empty() {
        let prompt = format!("{USER_EMOJI} {USER_DISPLAY_NAME} (starter): ");
        match input.read_message(&prompt).await {
            InputEvent::Message(text) if !text.is_empty() => config.starter_message = text,
            InputEvent::Message(_) => bail!("a starter message is required"),
            InputEvent::Eof | InputEvent::Interrupted => return Ok(None),
        }
    }

    let reporter: Arc<dyn ConsoleReporter> = Arc::new(TerminalReporter);
    let progress: Arc<dyn ProgressIndicator> = if std::io::stdout().is_terminal() {
        Arc::new(SpinnerProgress::new())
    } else {
        Arc::new(NoopProgress)
    };

    let backend = OllamaBackend::new(&state.config.backend)?;
    let transport = ResilientTransport::new(
        backend,
        RetryPolicy::from(&state.config.retry),
        reporter.clone(),
    );
    let scheduler = TurnScheduler::new(
        state.persona_provider(),
        transport,
        reporter,
        progress,
        SchedulerSettings::from_config(&state.config),
    );

    if !json {
        print_conversation_banner(
            &personas,
            mode,
            config.max_turns,
            &state.config.backend.model,
            &state.config.backend.base_url,
        );
    }

    let summary = scheduler.run(&config, &mut input, cancel).await?;
    Ok(Some(summary))
}

/// Print how the conversation ended.
pub fn print_summary(summary: &ConversationSummary, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(summary)?);
        return Ok(());
    }

    let elapsed = (summary.ended_at - summary.started_at)
        .to_std()
        .unwrap_or_default();
    let headline = match summary.outcome {
        ConversationOutcome::Completed => style("✓ Conversation finished").green().bold(),
        ConversationOutcome::Stopped => style("■ Conversation stopped").yellow().bold(),
    };

    println!();
    println!("  {headline}");
    println!(
        "  {} turn{} · {} lines · {}",
        style(summary.turns_completed).bold(),
        if summary.turns_completed == 1 { "" } else { "s" },
        summary.transcript_lines,
        style(format_elapsed(elapsed)).dim()
    );
    println!();
    Ok(())
}
