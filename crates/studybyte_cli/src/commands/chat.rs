//! Chat command - Interactive conversation over stdin.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::info;

use studybyte_chat::{ExchangeOutcome, SessionController};
use studybyte_markdown::render;

use super::ask::DeltaEcho;
use super::{Context, TransportArgs};
use crate::display::{format_document, Style};

const HELP: &str = "Commands: /clear  forget the conversation\n          /help   show this help\n          /quit   leave the chat";

#[derive(Args)]
pub struct ChatArgs {
    /// Study material forwarded with every message
    #[arg(short, long)]
    pub context: Option<String>,

    #[command(flatten)]
    pub transport: TransportArgs,

    /// Echo raw deltas to stderr as they arrive
    #[arg(long)]
    pub raw: bool,

    /// Save the conversation as JSON to this file on exit
    #[arg(long)]
    pub transcript: Option<PathBuf>,

    /// Disable ANSI styling
    #[arg(long)]
    pub no_color: bool,
}

/// One line typed by the user.
#[derive(Debug, PartialEq, Eq)]
enum Input<'a> {
    Empty,
    Quit,
    Clear,
    Help,
    Message(&'a str),
}

fn parse_input(line: &str) -> Input<'_> {
    let line = line.trim();
    match line {
        "" => Input::Empty,
        "/quit" | "/exit" => Input::Quit,
        "/clear" => Input::Clear,
        "/help" => Input::Help,
        _ => Input::Message(line),
    }
}

pub async fn execute(args: ChatArgs, ctx: &Context) -> Result<()> {
    let config = args.transport.apply(ctx.load_config()?);
    let mut session = SessionController::from_config(&config)?;
    let style = Style::new(!args.no_color);

    if !ctx.quiet {
        eprintln!(
            "💬 StudyByte chat ({} transport). Type /help for commands.",
            session.transport_kind()
        );
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut failures = 0usize;

    loop {
        if !ctx.quiet {
            eprint!("> ");
            let _ = std::io::stderr().flush();
        }
        let Some(line) = lines.next_line().await? else {
            break;
        };

        match parse_input(&line) {
            Input::Empty => continue,
            Input::Quit => break,
            Input::Help => eprintln!("{}", HELP),
            Input::Clear => {
                session.clear()?;
                eprintln!("Conversation cleared");
            }
            Input::Message(text) => {
                let mut echo = DeltaEcho::default();
                let outcome = session
                    .send(text, args.context.clone(), |reply| {
                        if args.raw {
                            echo.write(&mut std::io::stderr(), &reply.content);
                        }
                    })
                    .await?;
                if args.raw {
                    eprintln!();
                }

                match outcome {
                    ExchangeOutcome::Completed => {
                        if let Some(reply) = session.last_assistant() {
                            println!("{}\n", format_document(&render(&reply.content), style));
                        }
                    }
                    ExchangeOutcome::Failed(failure) => {
                        failures += 1;
                        eprintln!("❌ {}", failure);
                    }
                }
            }
        }
    }

    let transcript = session.transcript();
    info!(turns = transcript.turns(), failures, "Chat ended");
    if let Some(path) = &args.transcript {
        transcript
            .save(path)
            .with_context(|| format!("Failed to save transcript to {}", path.display()))?;
        println!("📝 Transcript saved to {}", path.display());
    }
    Ok(())
}
