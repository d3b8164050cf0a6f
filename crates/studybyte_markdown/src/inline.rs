//! Inline formatter.
//!
//! Turns one block's raw text into [`InlineSpan`]s using three passes in a
//! fixed order: code spans, then emphasis, then links. Each later pass only
//! looks at the `Text` segments left by the earlier ones. Malformed markers
//! never fail; they fall back to literal text.

use std::sync::OnceLock;

use regex::Regex;

use crate::document::InlineSpan;

const BACKTICK: char = '`';
const BACKSLASH: char = '\\';
const BOLD: &str = "**";

/// Format a single block's text into inline spans.
pub fn format_inline(text: &str) -> Vec<InlineSpan> {
    let spans = split_code_spans(text);
    let spans = flat_map_text(spans, split_emphasis);
    let spans = flat_map_text(spans, split_links);
    normalize(spans)
}

/// Apply `pass` to every `Text` span, leaving other spans untouched.
fn flat_map_text(spans: Vec<InlineSpan>, pass: fn(&str) -> Vec<InlineSpan>) -> Vec<InlineSpan> {
    spans
        .into_iter()
        .flat_map(|span| match span {
            InlineSpan::Text(text) => pass(&text),
            other => vec![other],
        })
        .collect()
}

/// Tracks whether the next character is escaped by an unescaped backslash.
#[derive(Default)]
struct Escapes {
    pending: bool,
}

impl Escapes {
    /// Returns whether `ch` is escaped, updating state for the next character.
    fn step(&mut self, ch: char) -> bool {
        let escaped = std::mem::take(&mut self.pending);
        if ch == BACKSLASH && !escaped {
            self.pending = true;
        }
        escaped
    }
}

fn push_text(out: &mut Vec<InlineSpan>, buf: &mut String) {
    if !buf.is_empty() {
        out.push(InlineSpan::Text(std::mem::take(buf)));
    }
}

/// Pass 1: backtick code spans.
fn split_code_spans(text: &str) -> Vec<InlineSpan> {
    let mut out = Vec::new();
    let mut plain = String::new();
    let mut code: Option<String> = None;
    let mut escapes = Escapes::default();

    for ch in text.chars() {
        let escaped = escapes.step(ch);
        if ch == BACKTICK && !escaped {
            match code.take() {
                None => code = Some(String::new()),
                Some(interior) => {
                    push_text(&mut out, &mut plain);
                    out.push(InlineSpan::Code(interior));
                }
            }
            continue;
        }

        match code.as_mut() {
            Some(interior) => interior.push(ch),
            None => plain.push(ch),
        }
    }

    if let Some(interior) = code {
        plain.push(BACKTICK);
        plain.push_str(&interior);
    }
    push_text(&mut out, &mut plain);
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Emphasis {
    Plain,
    Bold,
    Italic(char),
}

/// An underscore between two alphanumerics (`snake_case`) is never a marker.
fn is_intraword_underscore(chars: &[char], i: usize) -> bool {
    let before = i.checked_sub(1).and_then(|j| chars.get(j));
    let after = chars.get(i + 1);
    chars[i] == '_'
        && before.is_some_and(|c| c.is_alphanumeric())
        && after.is_some_and(|c| c.is_alphanumeric())
}

/// Pass 2: `**bold**`, `*italic*` and `_italic_`, one level deep.
fn split_emphasis(text: &str) -> Vec<InlineSpan> {
    let chars: Vec<char> = text.chars().collect();
    let mut out = Vec::new();
    let mut buf = String::new();
    let mut mode = Emphasis::Plain;
    let mut escapes = Escapes::default();
    let mut i = 0;

    while i < chars.len() {
        let ch = chars[i];
        let escaped = escapes.step(ch);
        // Bold is checked first so its second '*' is never an italic opener.
        let double = !escaped && ch == '*' && chars.get(i + 1) == Some(&'*');
        let single = !escaped
            && (ch == '*' || ch == '_')
            && !double
            && !is_intraword_underscore(&chars, i);

        match mode {
            Emphasis::Plain if double => {
                push_text(&mut out, &mut buf);
                mode = Emphasis::Bold;
                i += 2;
            }
            Emphasis::Plain if single => {
                push_text(&mut out, &mut buf);
                mode = Emphasis::Italic(ch);
                i += 1;
            }
            Emphasis::Bold if double => {
                if buf.is_empty() {
                    out.push(InlineSpan::text("****"));
                } else {
                    out.push(InlineSpan::Bold(vec![InlineSpan::Text(std::mem::take(&mut buf))]));
                }
                mode = Emphasis::Plain;
                i += 2;
            }
            Emphasis::Italic(marker) if single && ch == marker => {
                if buf.is_empty() {
                    out.push(InlineSpan::Text(format!("{marker}{marker}")));
                } else {
                    out.push(InlineSpan::Italic(vec![InlineSpan::Text(std::mem::take(&mut buf))]));
                }
                mode = Emphasis::Plain;
                i += 1;
            }
            _ if double => {
                // A bold marker inside italic stays literal.
                buf.push_str(BOLD);
                i += 2;
            }
            _ => {
                buf.push(ch);
                i += 1;
            }
        }
    }

    match mode {
        Emphasis::Plain => {}
        Emphasis::Bold => buf.insert_str(0, BOLD),
        Emphasis::Italic(marker) => buf.insert(0, marker),
    }
    push_text(&mut out, &mut buf);
    out
}

fn link_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"\[([^\]]+)\]\(([^)]+)\)").expect("valid link pattern"))
}

/// Pass 3: `[label](url)` links.
fn split_links(text: &str) -> Vec<InlineSpan> {
    let mut out = Vec::new();
    let mut last = 0;

    for caps in link_pattern().captures_iter(text) {
        let (Some(whole), Some(label), Some(href)) = (caps.get(0), caps.get(1), caps.get(2)) else {
            continue;
        };
        if whole.start() > last {
            out.push(InlineSpan::text(&text[last..whole.start()]));
        }
        out.push(InlineSpan::Link {
            text: label.as_str().to_string(),
            href: href.as_str().to_string(),
        });
        last = whole.end();
    }

    if last < text.len() {
        out.push(InlineSpan::text(&text[last..]));
    }
    out
}

/// Merge adjacent `Text` spans and drop empty ones.
fn normalize(spans: Vec<InlineSpan>) -> Vec<InlineSpan> {
    let mut out: Vec<InlineSpan> = Vec::with_capacity(spans.len());
    for span in spans {
        match (out.last_mut(), span) {
            (_, InlineSpan::Text(text)) if text.is_empty() => {}
            (Some(InlineSpan::Text(prev)), InlineSpan::Text(text)) => prev.push_str(&text),
            (_, span) => out.push(span),
        }
    }
    out
}
