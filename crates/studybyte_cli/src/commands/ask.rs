//! Ask command - Send one message and print the rendered reply.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;
use tracing::info;

use studybyte_chat::{ExchangeOutcome, SessionController, PLACEHOLDER_TEXT};
use studybyte_markdown::render;

use super::{Context, ExchangeFailed, TransportArgs};
use crate::display::{format_document, Style};

#[derive(Args)]
pub struct AskArgs {
    /// Message to send to the assistant
    pub message: String,

    /// Study material forwarded with the message
    #[arg(short, long)]
    pub context: Option<String>,

    #[command(flatten)]
    pub transport: TransportArgs,

    /// Echo raw deltas to stderr as they arrive
    #[arg(long)]
    pub raw: bool,

    /// Save the conversation as JSON to this file
    #[arg(long)]
    pub transcript: Option<PathBuf>,

    /// Disable ANSI styling
    #[arg(long)]
    pub no_color: bool,
}

pub async fn execute(args: AskArgs, ctx: &Context) -> Result<()> {
    let config = args.transport.apply(ctx.load_config()?);
    let mut session = SessionController::from_config(&config)?;
    info!(transport = %session.transport_kind(), "Sending message");

    if !ctx.quiet && !args.raw {
        eprintln!("{}", PLACEHOLDER_TEXT);
    }

    let mut echo = DeltaEcho::default();
    let outcome = session
        .send(&args.message, args.context.clone(), |reply| {
            if args.raw {
                echo.write(&mut std::io::stderr(), &reply.content);
            }
        })
        .await?;
    if args.raw {
        eprintln!();
    }

    if let Some(path) = &args.transcript {
        session
            .transcript()
            .save(path)
            .with_context(|| format!("Failed to save transcript to {}", path.display()))?;
        info!("Transcript saved to {}", path.display());
    }

    match outcome {
        ExchangeOutcome::Completed => {
            if let Some(reply) = session.last_assistant() {
                let style = Style::new(!args.no_color);
                println!("{}", format_document(&render(&reply.content), style));
            }
            Ok(())
        }
        ExchangeOutcome::Failed(failure) => Err(ExchangeFailed(failure).into()),
    }
}

/// Turns successive aggregates back into the text not yet echoed.
#[derive(Debug, Default)]
pub(crate) struct DeltaEcho {
    echoed: String,
}

impl DeltaEcho {
    /// Text to print for the new aggregate `content`.
    ///
    /// An aggregate that does not extend what was already echoed is printed
    /// in full on a new line.
    pub(crate) fn next(&mut self, content: &str) -> String {
        let out = match content.strip_prefix(self.echoed.as_str()) {
            Some(suffix) => suffix.to_string(),
            None => format!("\n{}", content),
        };
        self.echoed = content.to_string();
        out
    }

    pub(crate) fn write(&mut self, out: &mut impl Write, content: &str) {
        let text = self.next(content);
        if text.is_empty() {
            return;
        }
        let _ = write!(out, "{}", text);
        let _ = out.flush();
    }
}
