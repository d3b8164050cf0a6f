//! Render command - Render markdown from a file or stdin.

use std::io::Read;
use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::Args;
use tracing::debug;

use studybyte_markdown::{render_with, RenderOptions};

use super::Context;
use crate::display::{format_document, Style};

#[derive(Args)]
pub struct RenderArgs {
    /// Markdown file to render (reads stdin when omitted)
    file: Option<PathBuf>,

    /// Print the document tree as JSON
    #[arg(long)]
    json: bool,

    /// Start a new list when an item switches between ordered and unordered
    #[arg(long)]
    split_mixed_lists: bool,

    /// Disable ANSI styling
    #[arg(long)]
    no_color: bool,
}

pub async fn execute(args: RenderArgs, _ctx: &Context) -> Result<()> {
    let input = read_input(args.file.as_deref())?;
    let options = RenderOptions::default().split_mixed_lists(args.split_mixed_lists);

    let document = render_with(&input, &options);
    debug!("Rendered {} blocks", document.len());

    if args.json {
        println!("{}", serde_json::to_string_pretty(&document)?);
    } else {
        println!("{}", format_document(&document, Style::new(!args.no_color)));
    }
    Ok(())
}

fn read_input(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .context("Failed to read stdin")?;
            Ok(input)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_read_input_from_file() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("reply.md");
        std::fs::write(&path, "## Timing\r\n\r\n- 21 minutes\r\n").unwrap();

        let input = read_input(Some(&path)).unwrap();
        assert_eq!(input, "## Timing\r\n\r\n- 21 minutes\r\n");
    }

    #[test]
    fn test_read_input_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = read_input(Some(&temp.path().join("missing.md"))).unwrap_err();
        assert!(err.to_string().starts_with("Failed to read"));
    }
}
