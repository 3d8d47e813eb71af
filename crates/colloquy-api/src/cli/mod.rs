//! CLI command definitions and dispatch for the `colloquy` binary.

pub mod chat;
pub mod check;
pub mod personas;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use clap_complete::Shell;

/// Put several AI personas in one room and let them talk.
#[derive(Parser)]
#[command(name = "colloquy", version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output machine-readable JSON instead of styled text.
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress all log output except errors.
    #[arg(long, global = true)]
    pub quiet: bool,

    /// Detailed logs on stderr (-v for debug, -vv for trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Also export tracing spans through OpenTelemetry (stdout exporter).
    #[arg(long, global = true)]
    pub otel: bool,

    /// Inference server address, overriding OLLAMA_HOST and config.toml.
    #[arg(long, global = true)]
    pub host: Option<String>,

    /// Model to chat with, overriding config.toml.
    #[arg(long, global = true)]
    pub model: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start a conversation between two or more personas.
    Chat {
        /// Persona names, in speaking order.
        #[arg(required = true, num_args = 1..)]
        personas: Vec<String>,

        /// Opening message. Asked for interactively when omitted.
        #[arg(short, long)]
        message: Option<String>,

        /// Stop after this many turns (0 = no limit).
        #[arg(short, long, default_value_t = 0)]
        turns: u32,

        /// Let the personas talk among themselves without prompting you.
        #[arg(long)]
        auto: bool,

        /// Write the transcript to this file when the conversation ends.
        #[arg(short, long)]
        save: Option<PathBuf>,
    },

    /// List available personas.
    #[command(alias = "ls")]
    Personas,

    /// Check that the inference server is reachable and the model answers.
    Check,

    /// Generate shell completions.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_chat_with_all_flags() {
        let cli = Cli::try_parse_from([
            "colloquy", "chat", "ada", "tux", "-m", "Hello", "--turns", "3", "--auto", "--save",
            "out.txt", "--model", "mistral",
        ])
        .unwrap();

        assert_eq!(cli.model.as_deref(), Some("mistral"));
        match cli.command {
            Commands::Chat {
                personas,
                message,
                turns,
                auto,
                save,
            } => {
                assert_eq!(personas, vec!["ada", "tux"]);
                assert_eq!(message.as_deref(), Some("Hello"));
                assert_eq!(turns, 3);
                assert!(auto);
                assert_eq!(save, Some(PathBuf::from("out.txt")));
            }
            _ => panic!("expected chat command"),
        }
    }

    #[test]
    fn test_chat_defaults_to_interactive_unbounded() {
        let cli = Cli::try_parse_from(["colloquy", "chat", "ada", "tux"]).unwrap();
        match cli.command {
            Commands::Chat {
                turns, auto, message, ..
            } => {
                assert_eq!(turns, 0);
                assert!(!auto);
                assert!(message.is_none());
            }
            _ => panic!("expected chat command"),
        }
    }

    #[test]
    fn test_chat_requires_personas() {
        assert!(Cli::try_parse_from(["colloquy", "chat"]).is_err());
    }

    #[test]
    fn test_verbosity_counts() {
        let cli = Cli::try_parse_from(["colloquy", "-vv", "personas"]).unwrap();
        assert_eq!(cli.verbose, 2);
    }
}
