//! Terminal presentation of rendered documents.
//!
//! Maps each [`Block`] and [`InlineSpan`] to plain text, with ANSI styling
//! when color is enabled.

use studybyte_markdown::{Block, Document, InlineSpan};

const BOLD: (&str, &str) = ("\x1b[1m", "\x1b[22m");
const ITALIC: (&str, &str) = ("\x1b[3m", "\x1b[23m");
const UNDERLINE: (&str, &str) = ("\x1b[4m", "\x1b[24m");
const CODE: (&str, &str) = ("\x1b[36m", "\x1b[39m");
const DIM: (&str, &str) = ("\x1b[2m", "\x1b[22m");

const RULE_WIDTH: usize = 40;
const CODE_INDENT: &str = "    ";

/// Output styling for the terminal presenter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Style {
    pub color: bool,
}

impl Style {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    pub fn plain() -> Self {
        Self::new(false)
    }

    fn wrap(&self, (open, close): (&str, &str), text: &str) -> String {
        if self.color {
            format!("{}{}{}", open, text, close)
        } else {
            text.to_string()
        }
    }
}

/// Format `document` for the terminal, blocks separated by blank lines.
pub fn format_document(document: &Document, style: Style) -> String {
    document
        .iter()
        .map(|block| format_block(block, style))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn format_block(block: &Block, style: Style) -> String {
    match block {
        Block::Paragraph(spans) => format_spans(spans, style),
        Block::Heading { level, spans } => {
            let text = format_spans(spans, style);
            if style.color {
                style.wrap(BOLD, &text)
            } else {
                match level {
                    1 => underline(&text, '='),
                    2 => underline(&text, '-'),
                    _ => text,
                }
            }
        }
        Block::List { ordered, items } => items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let marker = if *ordered {
                    format!("{}.", i + 1)
                } else {
                    "•".to_string()
                };
                format!("{} {}", marker, format_spans(item, style))
            })
            .collect::<Vec<_>>()
            .join("\n"),
        Block::CodeBlock { language, text } => {
            let mut lines: Vec<String> = Vec::new();
            if let Some(language) = language {
                lines.push(style.wrap(DIM, &format!("[{}]", language)));
            }
            lines.extend(
                text.trim_end_matches('\n')
                    .split('\n')
                    .map(|line| style.wrap(CODE, &format!("{}{}", CODE_INDENT, line))),
            );
            lines.join("\n")
        }
        Block::Blockquote(spans) => format_spans(spans, style)
            .lines()
            .map(|line| format!("│ {}", line))
            .collect::<Vec<_>>()
            .join("\n"),
        Block::ThematicBreak => style.wrap(DIM, &"─".repeat(RULE_WIDTH)),
    }
}

pub fn format_spans(spans: &[InlineSpan], style: Style) -> String {
    spans.iter().map(|span| format_span(span, style)).collect()
}

fn format_span(span: &InlineSpan, style: Style) -> String {
    match span {
        InlineSpan::Text(text) => text.clone(),
        InlineSpan::Code(code) => style.wrap(CODE, code),
        InlineSpan::Bold(inner) => style.wrap(BOLD, &format_spans(inner, style)),
        InlineSpan::Italic(inner) => style.wrap(ITALIC, &format_spans(inner, style)),
        InlineSpan::Link { text, href } => format!("{} ({})", style.wrap(UNDERLINE, text), href),
    }
}

fn underline(text: &str, ch: char) -> String {
    let width = text.chars().count().max(1);
    format!("{}\n{}", text, ch.to_string().repeat(width))
}
