//! Line classifier.
//!
//! Maps a single input line to a [`LineKind`] without looking at the lines
//! around it. The only state consulted is whether a code fence is open.

use std::sync::OnceLock;

use regex::Regex;

/// Marker that opened a fenced code block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fence {
    /// Either '`' or '~'
    pub marker: char,
    /// Length of the opening run, at least three
    pub len: usize,
}

impl Fence {
    const MIN_LEN: usize = 3;

    /// Recognise an opening fence at the start of `line`.
    fn open(line: &str) -> Option<Self> {
        let marker = line.chars().next().filter(|c| *c == '`' || *c == '~')?;
        let len = line.chars().take_while(|c| *c == marker).count();
        (len >= Self::MIN_LEN).then_some(Self { marker, len })
    }

    /// Whether `line` closes this fence.
    pub fn is_closed_by(&self, line: &str) -> bool {
        line.chars().take_while(|c| *c == self.marker).count() >= self.len
    }
}

/// Classification of one line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind<'a> {
    FenceOpen {
        fence: Fence,
        info: Option<&'a str>,
    },
    FenceClose,
    /// Raw line inside an open fence
    FenceContent(&'a str),
    Heading {
        level: u8,
        text: &'a str,
    },
    ListItem {
        ordered: bool,
        text: &'a str,
    },
    Blockquote(&'a str),
    ThematicBreak,
    Blank,
    Text(&'a str),
}

fn heading_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^(#{1,6})\s+(.*)$").expect("valid heading pattern"))
}

fn unordered_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\s*[-*+]\s+(.*)$").expect("valid bullet pattern"))
}

fn ordered_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\s*\d+\.\s+(.*)$").expect("valid ordered pattern"))
}

/// Classify `line`, given the fence currently open (if any).
///
/// First match wins, in this order: fence handling, heading, list item,
/// blockquote, thematic break, blank, text.
pub fn classify<'a>(line: &'a str, open_fence: Option<&Fence>) -> LineKind<'a> {
    if let Some(fence) = open_fence {
        return if fence.is_closed_by(line) {
            LineKind::FenceClose
        } else {
            LineKind::FenceContent(line)
        };
    }

    if let Some(fence) = Fence::open(line) {
        let info = line[fence.len * fence.marker.len_utf8()..].trim();
        return LineKind::FenceOpen {
            fence,
            info: (!info.is_empty()).then_some(info),
        };
    }

    if let Some(caps) = heading_pattern().captures(line) {
        let level = caps.get(1).map_or(1, |m| m.as_str().len()) as u8;
        let text = caps.get(2).map_or("", |m| m.as_str());
        return LineKind::Heading { level, text };
    }

    if let Some(text) = capture_item(unordered_pattern(), line) {
        return LineKind::ListItem {
            ordered: false,
            text,
        };
    }

    if let Some(text) = capture_item(ordered_pattern(), line) {
        return LineKind::ListItem {
            ordered: true,
            text,
        };
    }

    if let Some(rest) = line.strip_prefix("> ") {
        return LineKind::Blockquote(rest);
    }

    if is_thematic_break(line) {
        return LineKind::ThematicBreak;
    }

    if line.trim().is_empty() {
        return LineKind::Blank;
    }

    LineKind::Text(line)
}

fn capture_item<'a>(pattern: &Regex, line: &'a str) -> Option<&'a str> {
    pattern
        .captures(line)
        .map(|caps| caps.get(1).map_or("", |m| m.as_str()))
}

fn is_thematic_break(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.chars().count() >= 3 && trimmed.chars().all(|c| matches!(c, '-' | '*' | '_'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_levels() {
        assert_eq!(
            classify("# Title", None),
            LineKind::Heading { level: 1, text: "Title" }
        );
        assert_eq!(
            classify("###### Deep", None),
            LineKind::Heading { level: 6, text: "Deep" }
        );
        // Seven markers is not a heading
        assert_eq!(classify("####### x", None), LineKind::Text("####### x"));
        // Marker without whitespace is not a heading
        assert_eq!(classify("#tag", None), LineKind::Text("#tag"));
    }

    #[test]
    fn test_list_items() {
        assert_eq!(
            classify("- apples", None),
            LineKind::ListItem { ordered: false, text: "apples" }
        );
        assert_eq!(
            classify("  + pears", None),
            LineKind::ListItem { ordered: false, text: "pears" }
        );
        assert_eq!(
            classify("12. twelfth", None),
            LineKind::ListItem { ordered: true, text: "twelfth" }
        );
        assert_eq!(classify("**bold** start", None), LineKind::Text("**bold** start"));
    }

    #[test]
    fn test_fences() {
        let open = classify("```rust", None);
        let fence = Fence { marker: '`', len: 3 };
        assert_eq!(
            open,
            LineKind::FenceOpen {
                fence,
                info: Some("rust")
            }
        );

        assert_eq!(classify("# not a heading", Some(&fence)), LineKind::FenceContent("# not a heading"));
        assert_eq!(classify("```", Some(&fence)), LineKind::FenceClose);
        assert_eq!(classify("~~~", Some(&fence)), LineKind::FenceContent("~~~"));

        let long = Fence { marker: '`', len: 4 };
        assert_eq!(classify("```", Some(&long)), LineKind::FenceContent("```"));
        assert_eq!(classify("````", Some(&long)), LineKind::FenceClose);

        assert_eq!(classify("``", None), LineKind::Text("``"));
    }

    #[test]
    fn test_blockquote_break_blank() {
        assert_eq!(classify("> quoted", None), LineKind::Blockquote("quoted"));
        assert_eq!(classify(">no space", None), LineKind::Text(">no space"));
        assert_eq!(classify("---", None), LineKind::ThematicBreak);
        assert_eq!(classify("  * * *", None), LineKind::ListItem { ordered: false, text: "* *" });
        assert_eq!(classify(" ___ ", None), LineKind::ThematicBreak);
        assert_eq!(classify("--", None), LineKind::Text("--"));
        assert_eq!(classify("   ", None), LineKind::Blank);
        assert_eq!(classify("", None), LineKind::Blank);
    }
}
