//! Round-robin turn scheduler.
//!
//! Drives the participants of a conversation through bounded turns:
//!
//! ```text
//! INIT -> TURN_START -> PARTICIPANT(0..N) -> TURN_END -> TURN_START | TERMINATED
//! ```
//!
//! Requests are strictly sequential, one in flight at a time, in declared
//! order. Cancellation is observed before each turn, before each
//! participant, and inside the decode loop, and always ends the run as
//! [`ConversationOutcome::Stopped`] rather than an error. The transcript is
//! flushed to the save file on every exit path.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

use colloquy_types::config::GlobalConfig;
use colloquy_types::conversation::{ConversationConfig, ConversationOutcome, ConversationSummary};
use colloquy_types::error::ConversationError;
use colloquy_types::persona::{
    ColorToken, ConversationMode, Persona, USER_DISPLAY_NAME, USER_EMOJI,
};

use super::persona::PersonaProvider;
use super::prompt::{build_roster, compose_request};
use super::session::{ConversationState, format_elapsed};
use crate::llm::backend::ChatBackend;
use crate::llm::decoder::Decoded;
use crate::llm::retry::sleep_or_cancel;
use crate::llm::transport::{ReplySink, ResilientTransport};
use crate::ui::{
    ConsoleReporter, HumanInput, InputEvent, ProgressHandle, ProgressIndicator, ProgressLabel,
};

/// Knobs the scheduler reads from global configuration.
#[derive(Debug, Clone)]
pub struct SchedulerSettings {
    pub model: String,
    /// Pause between turns in auto mode.
    pub inter_turn_delay: Duration,
    /// Trailing transcript lines embedded in each request.
    pub context_lines: usize,
}

impl SchedulerSettings {
    pub fn from_config(config: &GlobalConfig) -> Self {
        Self {
            model: config.backend.model.clone(),
            inter_turn_delay: config.conversation.inter_turn_delay(),
            context_lines: config.conversation.context_lines,
        }
    }
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self::from_config(&GlobalConfig::default())
    }
}

pub struct TurnScheduler<B> {
    personas: Arc<dyn PersonaProvider>,
    transport: ResilientTransport<B>,
    reporter: Arc<dyn ConsoleReporter>,
    progress: Arc<dyn ProgressIndicator>,
    settings: SchedulerSettings,
}

impl<B: ChatBackend> TurnScheduler<B> {
    pub fn new(
        personas: Arc<dyn PersonaProvider>,
        transport: ResilientTransport<B>,
        reporter: Arc<dyn ConsoleReporter>,
        progress: Arc<dyn ProgressIndicator>,
        settings: SchedulerSettings,
    ) -> Self {
        Self {
            personas,
            transport,
            reporter,
            progress,
            settings,
        }
    }

    /// Run a conversation to completion.
    ///
    /// Validation and persona resolution happen before any network call.
    /// Cancellation yields `Ok` with a [`ConversationOutcome::Stopped`]
    /// summary. Any other failure aborts the conversation with that error,
    /// after the transcript has been flushed.
    #[instrument(
        skip_all,
        fields(participants = config.participants.len(), auto = config.auto_mode)
    )]
    pub async fn run<I: HumanInput>(
        &self,
        config: &ConversationConfig,
        input: &mut I,
        cancel: &CancellationToken,
    ) -> Result<ConversationSummary, ConversationError> {
        config.validate()?;
        let participants = self.resolve_participants(config)?;
        let mode = ConversationMode::from_auto_flag(config.auto_mode);

        let mut state = ConversationState::new(&config.starter_message);
        info!(
            conversation_id = %state.conversation_id,
            max_turns = config.max_turns,
            "conversation started"
        );

        let result = self
            .drive(config, &participants, mode, &mut state, input, cancel)
            .await;

        let outcome = match result {
            Ok(outcome) => Ok(outcome),
            Err(err) if err.is_interrupted() => {
                info!(turn = state.current_turn, "conversation interrupted");
                Ok(ConversationOutcome::Stopped)
            }
            Err(err) => {
                warn!(turn = state.current_turn, error = %err, "conversation aborted");
                Err(err)
            }
        };

        let saved_to = self.flush(config, &state).await;

        let outcome = outcome?;
        info!(
            conversation_id = %state.conversation_id,
            turns = state.turns_completed,
            elapsed = %format_elapsed(state.elapsed()),
            "conversation finished"
        );
        Ok(ConversationSummary {
            conversation_id: state.conversation_id,
            started_at: state.started_at,
            ended_at: Utc::now(),
            outcome,
            turns_completed: state.turns_completed,
            transcript_lines: state.transcript.len(),
            saved_to,
        })
    }

    fn resolve_participants(
        &self,
        config: &ConversationConfig,
    ) -> Result<Vec<Persona>, ConversationError> {
        config
            .participants
            .iter()
            .map(|name| {
                self.personas
                    .resolve(name)
                    .ok_or_else(|| ConversationError::UnknownPersona(name.trim().to_string()))
            })
            .collect()
    }

    async fn drive<I: HumanInput>(
        &self,
        config: &ConversationConfig,
        participants: &[Persona],
        mode: ConversationMode,
        state: &mut ConversationState,
        input: &mut I,
        cancel: &CancellationToken,
    ) -> Result<ConversationOutcome, ConversationError> {
        loop {
            if cancel.is_cancelled() {
                return Err(ConversationError::Interrupted);
            }
            self.announce_turn(state, mode);

            for index in 0..participants.len() {
                if cancel.is_cancelled() {
                    return Err(ConversationError::Interrupted);
                }
                self.participant_step(participants, index, mode, state, cancel)
                    .await?;
            }
            state.complete_turn();

            if config.max_turns > 0 && state.current_turn >= config.max_turns {
                debug!(turn = state.current_turn, "turn limit reached");
                return Ok(ConversationOutcome::Completed);
            }

            if mode.is_auto() {
                sleep_or_cancel(self.settings.inter_turn_delay, cancel).await?;
            } else {
                let prompt = format!("{USER_EMOJI} {USER_DISPLAY_NAME}: ");
                let event = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => InputEvent::Interrupted,
                    event = input.read_message(&prompt) => event,
                };
                match event {
                    InputEvent::Message(text) if !text.trim().is_empty() => {
                        state.record_user_message(&text);
                    }
                    InputEvent::Message(_) | InputEvent::Eof => {
                        debug!("empty input, ending conversation");
                        return Ok(ConversationOutcome::Completed);
                    }
                    InputEvent::Interrupted => return Err(ConversationError::Interrupted),
                }
            }
            state.advance_turn();
        }
    }

    fn announce_turn(&self, state: &ConversationState, mode: ConversationMode) {
        self.reporter.line("", ColorToken::White);
        self.reporter.line(
            &format!(
                "── Turn {} · {} ──",
                state.current_turn,
                format_elapsed(state.elapsed())
            ),
            ColorToken::Cyan,
        );

        if state.current_turn == 1 || !mode.is_auto() {
            self.reporter.fragment(
                &format!("{USER_EMOJI} {USER_DISPLAY_NAME}: "),
                ColorToken::Green,
            );
            self.reporter.line(&state.current_message, ColorToken::White);
        } else {
            self.reporter.line("· · ·", ColorToken::Dim);
        }
    }

    async fn participant_step(
        &self,
        participants: &[Persona],
        index: usize,
        mode: ConversationMode,
        state: &mut ConversationState,
        cancel: &CancellationToken,
    ) -> Result<(), ConversationError> {
        let persona = &participants[index];
        let roster = build_roster(participants, index, mode);
        let system_prompt = self.personas.render_system_prompt(persona, mode, &roster);
        let request = compose_request(
            &self.settings.model,
            system_prompt,
            state.transcript.tail(self.settings.context_lines),
            &state.current_message,
        );
        state.set_request(persona, request.messages.clone());
        debug!(
            turn = state.current_turn,
            persona = %persona.name,
            "requesting reply"
        );

        let mut sink = ConsoleSink::new(self.reporter.as_ref(), self.progress.as_ref(), persona);
        match self.transport.exchange(&request, cancel, &mut sink).await? {
            Decoded::Complete(text) => {
                state.record_reply(persona, &text);
                Ok(())
            }
            Decoded::Interrupted { partial } => {
                if !partial.trim().is_empty() {
                    state.record_reply(persona, &partial);
                }
                Err(ConversationError::Interrupted)
            }
        }
    }

    /// Write the transcript if a save file is configured. Failures are
    /// reported and otherwise ignored.
    async fn flush(
        &self,
        config: &ConversationConfig,
        state: &ConversationState,
    ) -> Option<PathBuf> {
        let path = config.save_file.as_ref()?;
        match state.transcript.save(path).await {
            Ok(()) => {
                self.reporter.line(
                    &format!("💾 Transcript saved to {}", path.display()),
                    ColorToken::Green,
                );
                Some(path.clone())
            }
            Err(err) => {
                warn!(error = %err, "transcript not saved");
                self.reporter
                    .line(&format!("⚠ {err}"), ColorToken::Yellow);
                None
            }
        }
    }
}

/// Renders one persona's reply, running a progress indicator per attempt.
struct ConsoleSink<'a> {
    reporter: &'a dyn ConsoleReporter,
    progress: &'a dyn ProgressIndicator,
    persona: &'a Persona,
    spinner: Option<Box<dyn ProgressHandle>>,
    label_printed: bool,
}

impl<'a> ConsoleSink<'a> {
    fn new(
        reporter: &'a dyn ConsoleReporter,
        progress: &'a dyn ProgressIndicator,
        persona: &'a Persona,
    ) -> Self {
        Self {
            reporter,
            progress,
            persona,
            spinner: None,
            label_printed: false,
        }
    }

    fn stop_spinner(&mut self) {
        if let Some(spinner) = self.spinner.take() {
            spinner.stop();
        }
    }
}

impl ReplySink for ConsoleSink<'_> {
    fn attempt_started(&mut self, _attempt: u32) {
        self.stop_spinner();
        self.spinner = Some(self.progress.start(&ProgressLabel {
            text: format!("{} is thinking...", self.persona.label()),
            label_color: self.persona.label_color,
            text_color: self.persona.text_color,
        }));
    }

    fn fragment(&mut self, text: &str) {
        self.stop_spinner();
        if !self.label_printed {
            self.reporter
                .fragment(&format!("{}: ", self.persona.label()), self.persona.label_color);
            self.label_printed = true;
        }
        self.reporter.fragment(text, self.persona.text_color);
    }

    fn attempt_finished(&mut self) {
        self.stop_spinner();
        if self.label_printed {
            self.reporter.line("", self.persona.text_color);
            self.label_printed = false;
        }
    }

    fn discard(&mut self) {
        self.reporter
            .line("(reply cut off, asking again from the start)", ColorToken::Dim);
    }
}
