//! Rendered document tree.
//!
//! These types carry no presentation concerns; a front end maps each variant
//! to whatever visual output it needs.

use serde::{Deserialize, Serialize};

/// A formatted fragment within a block's text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InlineSpan {
    /// Plain text
    Text(String),
    /// Inline code, verbatim and never decomposed further
    Code(String),
    /// Strong emphasis
    Bold(Vec<InlineSpan>),
    /// Emphasis
    Italic(Vec<InlineSpan>),
    /// Hyperlink
    Link { text: String, href: String },
}

impl InlineSpan {
    /// Shorthand for a `Text` span.
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Textual content without any markers.
    pub fn plain_text(&self) -> String {
        match self {
            Self::Text(text) | Self::Code(text) => text.clone(),
            Self::Bold(spans) | Self::Italic(spans) => spans_plain_text(spans),
            Self::Link { text, .. } => text.clone(),
        }
    }
}

/// A top-level structural unit of rendered text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Block {
    Paragraph(Vec<InlineSpan>),
    Heading {
        /// 1 through 6
        level: u8,
        spans: Vec<InlineSpan>,
    },
    List {
        ordered: bool,
        items: Vec<Vec<InlineSpan>>,
    },
    CodeBlock {
        /// Info string following the opening fence, if any
        #[serde(default, skip_serializing_if = "Option::is_none")]
        language: Option<String>,
        /// Raw fence content, one `\n` after every line
        text: String,
    },
    Blockquote(Vec<InlineSpan>),
    ThematicBreak,
}

impl Block {
    /// Textual content of the block without any markers.
    pub fn plain_text(&self) -> String {
        match self {
            Self::Paragraph(spans) | Self::Blockquote(spans) => spans_plain_text(spans),
            Self::Heading { spans, .. } => spans_plain_text(spans),
            Self::List { items, .. } => items
                .iter()
                .map(|item| spans_plain_text(item))
                .collect::<Vec<_>>()
                .join("\n"),
            Self::CodeBlock { text, .. } => text.trim_end_matches('\n').to_string(),
            Self::ThematicBreak => String::new(),
        }
    }
}

/// Ordered sequence of blocks produced by one render call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Document {
    blocks: Vec<Block>,
}

impl Document {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    pub fn into_blocks(self) -> Vec<Block> {
        self.blocks
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Block> {
        self.blocks.iter()
    }

    /// Text of every non-empty block, separated by blank lines.
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(Block::plain_text)
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

impl<'a> IntoIterator for &'a Document {
    type Item = &'a Block;
    type IntoIter = std::slice::Iter<'a, Block>;

    fn into_iter(self) -> Self::IntoIter {
        self.blocks.iter()
    }
}

fn spans_plain_text(spans: &[InlineSpan]) -> String {
    spans.iter().map(InlineSpan::plain_text).collect()
}
