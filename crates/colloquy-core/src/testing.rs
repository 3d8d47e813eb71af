//! In-memory collaborators for unit tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use futures_util::stream;
use tokio::time::Instant;

use colloquy_types::error::ConversationError;
use colloquy_types::llm::ChatRequest;
use colloquy_types::persona::ColorToken;

use crate::llm::backend::{ByteStream, ChatBackend};
use crate::ui::{
    ConsoleReporter, HumanInput, InputEvent, ProgressHandle, ProgressIndicator, ProgressLabel,
};

/// One scripted backend response.
pub enum Reply {
    /// Stream these content fragments, then `done: true`.
    Text(Vec<String>),
    /// Fail before any body is returned.
    OpenError(ConversationError),
    /// Stream these fragments, then fail mid-body.
    Broken(Vec<String>, ConversationError),
    /// Accept the request and never send a byte.
    Hang,
}

impl Reply {
    pub fn text(fragments: &[&str]) -> Self {
        Reply::Text(fragments.iter().map(|f| f.to_string()).collect())
    }

    pub fn broken(fragments: &[&str], err: ConversationError) -> Self {
        Reply::Broken(fragments.iter().map(|f| f.to_string()).collect(), err)
    }
}

pub fn content_line(content: &str) -> String {
    format!(
        "{}\n",
        serde_json::json!({"message": {"role": "assistant", "content": content}, "done": false})
    )
}

fn ok_chunks(fragments: &[String]) -> Vec<Result<Vec<u8>, ConversationError>> {
    fragments
        .iter()
        .map(|f| Ok(content_line(f).into_bytes()))
        .collect()
}

#[derive(Default)]
struct BackendState {
    replies: VecDeque<Reply>,
    requests: Vec<(ChatRequest, Instant)>,
    probes: usize,
}

/// Backend that replays a queue of [`Reply`] values.
///
/// Once the queue is empty every request is answered with `reply <n>`,
/// where `n` is the 1-based request count.
#[derive(Clone, Default)]
pub struct ScriptedBackend {
    state: Arc<Mutex<BackendState>>,
    unavailable: bool,
}

impl ScriptedBackend {
    pub fn new(replies: Vec<Reply>) -> Self {
        Self {
            state: Arc::new(Mutex::new(BackendState {
                replies: replies.into(),
                ..BackendState::default()
            })),
            unavailable: false,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            unavailable: true,
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        let state = self.state.lock().unwrap();
        state.requests.iter().map(|(r, _)| r.clone()).collect()
    }

    pub fn request_times(&self) -> Vec<Instant> {
        let state = self.state.lock().unwrap();
        state.requests.iter().map(|(_, t)| *t).collect()
    }

    pub fn probes(&self) -> usize {
        self.state.lock().unwrap().probes
    }
}

impl ChatBackend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn probe(&self) -> Result<(), ConversationError> {
        self.state.lock().unwrap().probes += 1;
        if self.unavailable {
            Err(ConversationError::BackendUnavailable(
                "connection refused".to_string(),
            ))
        } else {
            Ok(())
        }
    }

    async fn open_chat(&self, request: &ChatRequest) -> Result<ByteStream, ConversationError> {
        let reply = {
            let mut state = self.state.lock().unwrap();
            state.requests.push((request.clone(), Instant::now()));
            let count = state.requests.len();
            state
                .replies
                .pop_front()
                .unwrap_or_else(|| Reply::Text(vec![format!("reply {count}")]))
        };

        match reply {
            Reply::Text(fragments) => {
                let mut chunks = ok_chunks(&fragments);
                chunks.push(Ok(b"{\"done\":true}\n".to_vec()));
                Ok(Box::pin(stream::iter(chunks)))
            }
            Reply::OpenError(err) => Err(err),
            Reply::Broken(fragments, err) => {
                let mut chunks = ok_chunks(&fragments);
                chunks.push(Err(err));
                Ok(Box::pin(stream::iter(chunks)))
            }
            Reply::Hang => Ok(Box::pin(stream::pending())),
        }
    }
}

/// Console and progress activity, in the order it happened.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiEvent {
    SpinnerStarted,
    SpinnerStopped,
    Line(String),
    Fragment(String),
}

pub type EventLog = Arc<Mutex<Vec<UiEvent>>>;

/// Reporter that keeps everything it is asked to print.
#[derive(Clone, Default)]
pub struct RecordingReporter {
    output: Arc<Mutex<Vec<(String, ColorToken)>>>,
    events: EventLog,
}

impl RecordingReporter {
    /// A reporter appending to `events` alongside other collaborators.
    pub fn sharing(events: &EventLog) -> Self {
        Self {
            output: Arc::default(),
            events: Arc::clone(events),
        }
    }

    pub fn events(&self) -> Vec<UiEvent> {
        self.events.lock().unwrap().clone()
    }

    pub fn lines(&self) -> Vec<String> {
        self.output
            .lock()
            .unwrap()
            .iter()
            .map(|(text, _)| text.clone())
            .collect()
    }

    pub fn text(&self) -> String {
        self.lines().concat()
    }
}

impl ConsoleReporter for RecordingReporter {
    fn line(&self, text: &str, color: ColorToken) {
        self.events.lock().unwrap().push(UiEvent::Line(text.to_string()));
        self.output
            .lock()
            .unwrap()
            .push((format!("{text}\n"), color));
    }

    fn fragment(&self, text: &str, color: ColorToken) {
        self.events.lock().unwrap().push(UiEvent::Fragment(text.to_string()));
        self.output.lock().unwrap().push((text.to_string(), color));
    }
}

/// Progress indicator that counts starts and stops.
#[derive(Clone, Default)]
pub struct CountingProgress {
    pub started: Arc<AtomicUsize>,
    pub stopped: Arc<AtomicUsize>,
    events: EventLog,
}

impl CountingProgress {
    /// A progress indicator appending to `events` alongside other collaborators.
    pub fn sharing(events: &EventLog) -> Self {
        Self {
            events: Arc::clone(events),
            ..Self::default()
        }
    }
}

struct CountingHandle {
    stopped: Arc<AtomicUsize>,
    events: EventLog,
    done: Mutex<bool>,
}

impl ProgressHandle for CountingHandle {
    fn stop(&self) {
        let mut done = self.done.lock().unwrap();
        if !*done {
            *done = true;
            self.stopped.fetch_add(1, Ordering::SeqCst);
            self.events.lock().unwrap().push(UiEvent::SpinnerStopped);
        }
    }
}

impl ProgressIndicator for CountingProgress {
    fn start(&self, _label: &ProgressLabel) -> Box<dyn ProgressHandle> {
        self.started.fetch_add(1, Ordering::SeqCst);
        self.events.lock().unwrap().push(UiEvent::SpinnerStarted);
        Box::new(CountingHandle {
            stopped: Arc::clone(&self.stopped),
            events: Arc::clone(&self.events),
            done: Mutex::new(false),
        })
    }
}

/// Human input that replays canned events, then reports EOF.
pub struct ScriptedInput {
    events: VecDeque<InputEvent>,
    pub prompts: usize,
}

impl ScriptedInput {
    pub fn new(events: Vec<InputEvent>) -> Self {
        Self {
            events: events.into(),
            prompts: 0,
        }
    }

    pub fn messages(messages: &[&str]) -> Self {
        Self::new(
            messages
                .iter()
                .map(|m| InputEvent::Message(m.to_string()))
                .collect(),
        )
    }
}

impl HumanInput for ScriptedInput {
    async fn read_message(&mut self, _prompt: &str) -> InputEvent {
        self.prompts += 1;
        self.events.pop_front().unwrap_or(InputEvent::Eof)
    }
}
