//! `colloquy check`: readiness probe plus a one-line round trip.

use std::sync::Arc;
use std::time::Instant;

use anyhow::Result;
use console::style;
use tokio_util::sync::CancellationToken;

use colloquy_core::llm::backend::ChatBackend;
use colloquy_core::llm::decoder::StreamDecoder;
use colloquy_core::llm::retry::RetryPolicy;
use colloquy_core::llm::transport::ResilientTransport;
use colloquy_infra::llm::ollama::OllamaBackend;
use colloquy_types::error::ConversationError;
use colloquy_types::llm::{ChatRequest, Message};

use crate::cli::chat::renderer::TerminalReporter;
use crate::state::AppState;

fn check_mark(ok: bool) -> String {
    if ok {
        format!("{}", style("✓").green())
    } else {
        format!("{}", style("✗").red())
    }
}

/// Probe the backend, giving up as soon as `cancel` fires.
async fn probe_or_cancel<B: ChatBackend>(
    backend: &B,
    cancel: &CancellationToken,
) -> Result<(), ConversationError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ConversationError::Interrupted),
        result = backend.probe() => result,
    }
}

pub async fn check(state: &AppState, cancel: &CancellationToken, json: bool) -> Result<()> {
    let backend_config = &state.config.backend;
    let backend = OllamaBackend::new(backend_config)?;

    let probe = probe_or_cancel(&backend, cancel).await;
    let reachable = probe.is_ok();

    let mut reply = None;
    let mut reply_error = None;
    let mut latency_ms = None;
    if reachable {
        let transport = ResilientTransport::new(
            backend,
            RetryPolicy {
                max_attempts: 1,
                ..RetryPolicy::from(&state.config.retry)
            },
            Arc::new(TerminalReporter),
        );
        let request = ChatRequest::streaming(
            backend_config.model.clone(),
            vec![Message::user("Reply with the single word: ready")],
        );
        let started = Instant::now();
        let outcome = match transport.send(&request, cancel).await {
            Ok(stream) => StreamDecoder::decode(stream, cancel, |_| {}).await,
            Err(e) => Err(e),
        };
        latency_ms = Some(started.elapsed().as_millis() as u64);
        match outcome {
            Ok(decoded) => reply = Some(decoded.text().trim().to_string()),
            Err(e) => reply_error = Some(e.to_string()),
        }
    }
    let healthy = reachable && reply.is_some();

    if json {
        let report = serde_json::json!({
            "base_url": backend_config.base_url,
            "model": backend_config.model,
            "reachable": reachable,
            "probe_error": probe.as_ref().err().map(|e| e.to_string()),
            "reply": reply,
            "reply_error": reply_error,
            "latency_ms": latency_ms,
            "healthy": healthy,
        });
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!();
        println!(
            "  {} Checking {}",
            style("🔍").bold(),
            style(&backend_config.base_url).cyan()
        );
        println!();
        match &probe {
            Ok(()) => println!("  {} Server reachable", check_mark(true)),
            Err(e) => println!("  {} {e}", check_mark(false)),
        }
        if reachable {
            match (&reply, &reply_error) {
                (Some(text), _) => println!(
                    "  {} Model {} answered in {}ms: {}",
                    check_mark(true),
                    style(&backend_config.model).bold(),
                    latency_ms.unwrap_or_default(),
                    style(text).dim()
                ),
                (None, Some(e)) => println!(
                    "  {} Model {}: {e}",
                    check_mark(false),
                    style(&backend_config.model).bold()
                ),
                (None, None) => {}
            }
        }
        println!();
    }

    if !healthy {
        anyhow::bail!("backend check failed");
    }
    Ok(())
}
