//! StudyByte CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments or configuration
//! - 3: Exchange failed

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use studybyte_chat::ChatError;

mod commands;
mod display;

use commands::{Cli, Commands, Context, ExchangeFailed};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const EXCHANGE_FAILED: u8 = 3;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(&cli);

    let context = Context::from_cli(&cli);
    let result = match cli.command {
        Commands::Render(args) => commands::render::execute(args, &context).await,
        Commands::Ask(args) => commands::ask::execute(args, &context).await,
        Commands::Chat(args) => commands::chat::execute(args, &context).await,
        Commands::Health(args) => commands::health::execute(args, &context).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("❌ Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Logs go to stderr so rendered output on stdout stays clean.
fn init_logging(cli: &Cli) {
    let default_filter = if cli.verbose {
        "studybyte=debug,warn"
    } else if cli.quiet {
        "error"
    } else {
        "studybyte=info,warn"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let registry = tracing_subscriber::registry().with(filter);
    let log_result = if cli.log_json {
        registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init()
    } else {
        registry
            .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
            .try_init()
    };

    if log_result.is_err() {
        // Logging already initialized, continue
    }
}

/// Categorize error to determine exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    for cause in e.chain() {
        if cause.downcast_ref::<ExchangeFailed>().is_some() {
            return ExitCodes::EXCHANGE_FAILED;
        }
        if let Some(chat_error) = cause.downcast_ref::<ChatError>() {
            return match chat_error {
                ChatError::InvalidConfig(_) | ChatError::EmptyMessage => ExitCodes::INVALID_ARGS,
                ChatError::TransportUnavailable(_)
                | ChatError::Protocol(_)
                | ChatError::ServerReported(_)
                | ChatError::Timeout(_) => ExitCodes::EXCHANGE_FAILED,
                _ => ExitCodes::GENERAL_ERROR,
            };
        }
    }
    ExitCodes::GENERAL_ERROR
}

#[cfg(test)]
mod tests {
    use super::*;
    use studybyte_chat::ExchangeFailure;

    #[test]
    fn test_exchange_failure_exit_code() {
        let err = anyhow::Error::new(ExchangeFailed(ExchangeFailure::server("boom")));
        assert_eq!(categorize_error(&err), ExitCodes::EXCHANGE_FAILED);
    }

    #[test]
    fn test_config_error_exit_code() {
        let err = anyhow::Error::new(ChatError::InvalidConfig("bad url".into()))
            .context("Failed to load configuration");
        assert_eq!(categorize_error(&err), ExitCodes::INVALID_ARGS);
    }

    #[test]
    fn test_other_errors_are_general() {
        let err = anyhow::anyhow!("something else");
        assert_eq!(categorize_error(&err), ExitCodes::GENERAL_ERROR);
    }
}
