//! Colloquy CLI entry point.
//!
//! Binary name: `colloquy`
//!
//! Parses arguments, sets up tracing, loads configuration and personas,
//! then dispatches to the command handler. Ctrl+C cancels a process-wide
//! token that every long-running operation watches.

mod cli;
mod state;

use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use clap_complete::generate;
use console::style;
use tokio_util::sync::CancellationToken;

use colloquy_core::chat::session::format_elapsed;
use colloquy_observe::tracing_setup::{filter_for_verbosity, init_tracing, shutdown_tracing};

use cli::chat::{ChatArgs, print_summary, run_chat};
use cli::{Cli, Commands};
use state::AppState;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(filter_for_verbosity(cli.verbose, cli.quiet), cli.otel) {
        eprintln!("Warning: failed to initialize tracing: {e}");
    }

    let started = Instant::now();
    let result = run(cli).await;
    shutdown_tracing();

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!();
            eprintln!("  {} {}", style("✗").red().bold(), render_error(&err));
            eprintln!(
                "  {}",
                style(format!("after {}", format_elapsed(started.elapsed()))).dim()
            );
            eprintln!();
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    // Shell completions don't need app state
    if let Commands::Completions { shell } = &cli.command {
        let mut cmd = <Cli as clap::CommandFactory>::command();
        generate(*shell, &mut cmd, "colloquy", &mut std::io::stdout());
        return Ok(());
    }

    let state = AppState::init(cli.host.as_deref(), cli.model.as_deref()).await?;
    let cancel = CancellationToken::new();
    tokio::spawn(watch_interrupts(cancel.clone()));

    match cli.command {
        Commands::Chat {
            personas,
            message,
            turns,
            auto,
            save,
        } => {
            let args = ChatArgs {
                personas,
                message,
                turns,
                auto,
                save,
            };
            if let Some(summary) = run_chat(&state, args, &cancel, cli.json).await? {
                print_summary(&summary, cli.json)?;
            }
        }

        Commands::Personas => cli::personas::list_personas(&state, cli.json)?,

        Commands::Check => cli::check::check(&state, &cancel, cli.json).await?,

        Commands::Completions { .. } => {}
    }

    Ok(())
}

/// First Ctrl+C cancels gracefully; a second one exits immediately.
async fn watch_interrupts(cancel: CancellationToken) {
    if tokio::signal::ctrl_c().await.is_err() {
        tracing::warn!("failed to install Ctrl+C handler");
        return;
    }
    tracing::info!("interrupt received, stopping");
    cancel.cancel();

    if tokio::signal::ctrl_c().await.is_ok() {
        eprintln!();
        std::process::exit(130);
    }
}

/// Top-level message plus any causes it does not already spell out.
fn render_error(err: &anyhow::Error) -> String {
    let mut rendered = err.to_string();
    for cause in err.chain().skip(1) {
        let cause = cause.to_string();
        if !rendered.contains(&cause) {
            rendered.push_str(": ");
            rendered.push_str(&cause);
        }
    }
    rendered
}
