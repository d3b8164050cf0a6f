//! CLI command definitions.
//!
//! This module defines the command structure for the StudyByte CLI.
//! Each subcommand maps to one way of using the renderer or the chat client.

use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::{Args, Parser, Subcommand};

use studybyte_chat::{ClientConfig, ExchangeFailure};

pub mod ask;
pub mod chat;
pub mod health;
pub mod render;

/// StudyByte - study assistant chat client and markdown renderer
#[derive(Parser)]
#[command(name = "studybyte")]
#[command(version, about = "StudyByte - study assistant chat client and markdown renderer")]
#[command(long_about = r#"
StudyByte talks to the StudyByte assistant server and renders its markdown
replies for the terminal.

COMMANDS:
  render  → Render markdown from a file or stdin
  ask     → Send one message and print the rendered reply
  chat    → Interactive conversation, one exchange per line
  health  → Check that the assistant server is reachable

CONFIGURATION:
  <config-root>/.studybyte/settings.json, then STUDYBYTE_API_URL,
  STUDYBYTE_WS_URL, STUDYBYTE_STREAMING and STUDYBYTE_TIMEOUT_SECS.

EXIT CODES:
  0 - Success
  1 - General error
  2 - Invalid arguments or configuration
  3 - Exchange failed
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,

    /// Directory holding .studybyte/settings.json
    #[arg(long, global = true, env = "STUDYBYTE_CONFIG_ROOT")]
    pub config_root: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Render markdown to the terminal or as JSON
    Render(render::RenderArgs),

    /// Send a single message to the assistant
    Ask(ask::AskArgs),

    /// Start an interactive conversation
    Chat(chat::ChatArgs),

    /// Check the assistant server's health endpoint
    Health(health::HealthArgs),
}

/// Options shared by every command.
pub struct Context {
    pub config_root: Option<PathBuf>,
    pub quiet: bool,
}

impl Context {
    pub fn from_cli(cli: &Cli) -> Self {
        Self {
            config_root: cli.config_root.clone(),
            quiet: cli.quiet,
        }
    }

    /// Settings file and environment overrides below the config root
    /// (current directory by default).
    pub fn load_config(&self) -> Result<ClientConfig> {
        let root = match &self.config_root {
            Some(root) => root.clone(),
            None => std::env::current_dir()?,
        };
        ClientConfig::load(&root).context("Failed to load configuration")
    }
}

/// Transport choice flags for commands that talk to the server.
#[derive(Args, Debug, Default)]
pub struct TransportArgs {
    /// Force the single-request HTTP fallback
    #[arg(long, conflicts_with = "streaming")]
    pub fallback: bool,

    /// Force the WebSocket streaming channel
    #[arg(long)]
    pub streaming: bool,
}

impl TransportArgs {
    pub fn apply(&self, mut config: ClientConfig) -> ClientConfig {
        if self.fallback {
            config.streaming = false;
        } else if self.streaming {
            config.streaming = true;
        }
        config
    }
}

/// An exchange that ended with a terminal error.
#[derive(Debug, thiserror::Error)]
#[error("{0}")]
pub struct ExchangeFailed(pub ExchangeFailure);
