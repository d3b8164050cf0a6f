//! Block assembler.
//!
//! Folds classified lines into an ordered sequence of [`Block`]s. All scan
//! state lives in an [`Assembler`] value that is moved through each step, so
//! there is no ambient mutable state between render calls.

use tracing::trace;

use crate::classify::{classify, Fence, LineKind};
use crate::document::Block;
use crate::inline::format_inline;

/// Knobs for the block assembler.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RenderOptions {
    /// Start a new list when an item's type (ordered/unordered) differs from
    /// the open list's type. Off by default: mixed items join the open list.
    pub split_mixed_lists: bool,
}

impl RenderOptions {
    pub fn split_mixed_lists(mut self, split: bool) -> Self {
        self.split_mixed_lists = split;
        self
    }
}

#[derive(Debug)]
struct OpenList {
    ordered: bool,
    items: Vec<String>,
}

#[derive(Debug)]
struct OpenFence {
    fence: Fence,
    language: Option<String>,
    text: String,
}

/// Scan state threaded through the fold over input lines.
#[derive(Debug)]
pub struct Assembler<'o> {
    options: &'o RenderOptions,
    paragraph: Vec<String>,
    list: Option<OpenList>,
    fence: Option<OpenFence>,
    blocks: Vec<Block>,
}

impl<'o> Assembler<'o> {
    pub fn new(options: &'o RenderOptions) -> Self {
        Self {
            options,
            paragraph: Vec::new(),
            list: None,
            fence: None,
            blocks: Vec::new(),
        }
    }

    /// Consume one raw line and return the updated state.
    pub fn feed(mut self, raw: &str) -> Self {
        // Classification ignores a trailing '\r'; fenced content keeps it.
        let line = raw.strip_suffix('\r').unwrap_or(raw);
        let kind = classify(line, self.fence.as_ref().map(|open| &open.fence));
        trace!(?kind, "classified line");

        match kind {
            LineKind::FenceContent(_) => {
                if let Some(open) = self.fence.as_mut() {
                    open.text.push_str(raw);
                    open.text.push('\n');
                }
            }
            LineKind::FenceClose => self.close_fence(),
            LineKind::FenceOpen { fence, info } => {
                self.flush_text_blocks();
                self.fence = Some(OpenFence {
                    fence,
                    language: info.map(str::to_string),
                    text: String::new(),
                });
            }
            LineKind::Heading { level, text } => {
                self.flush_text_blocks();
                self.blocks.push(Block::Heading {
                    level,
                    spans: format_inline(text),
                });
            }
            LineKind::ListItem { ordered, text } => self.push_item(ordered, text),
            LineKind::Blank => {
                if self.list.is_some() {
                    self.close_list();
                } else {
                    self.flush_paragraph();
                }
            }
            LineKind::Blockquote(text) => {
                self.flush_text_blocks();
                self.blocks.push(Block::Blockquote(format_inline(text)));
            }
            LineKind::ThematicBreak => {
                self.flush_text_blocks();
                self.blocks.push(Block::ThematicBreak);
            }
            LineKind::Text(text) => {
                // A plain line ends an open list rather than being folded into it.
                self.close_list();
                self.paragraph.push(text.to_string());
            }
        }

        self
    }

    /// Flush whatever is still open and return the finished blocks.
    pub fn finish(mut self) -> Vec<Block> {
        self.flush_text_blocks();
        if self.fence.is_some() {
            trace!("unterminated code fence flushed at end of input");
            self.close_fence();
        }
        self.blocks
    }

    fn push_item(&mut self, ordered: bool, text: &str) {
        let type_changed = self
            .list
            .as_ref()
            .is_some_and(|list| list.ordered != ordered);
        if type_changed && self.options.split_mixed_lists {
            self.close_list();
        }

        match self.list.as_mut() {
            Some(list) => list.items.push(text.to_string()),
            None => {
                self.flush_paragraph();
                self.list = Some(OpenList {
                    ordered,
                    items: vec![text.to_string()],
                });
            }
        }
    }

    fn flush_text_blocks(&mut self) {
        self.flush_paragraph();
        self.close_list();
    }

    fn flush_paragraph(&mut self) {
        if self.paragraph.is_empty() {
            return;
        }
        let joined = std::mem::take(&mut self.paragraph).join(" ");
        self.blocks.push(Block::Paragraph(format_inline(&joined)));
    }

    fn close_list(&mut self) {
        if let Some(list) = self.list.take() {
            self.blocks.push(Block::List {
                ordered: list.ordered,
                items: list.items.iter().map(|item| format_inline(item)).collect(),
            });
        }
    }

    fn close_fence(&mut self) {
        if let Some(open) = self.fence.take() {
            self.blocks.push(Block::CodeBlock {
                language: open.language,
                text: open.text,
            });
        }
    }
}

/// Assemble the blocks of `text`.
pub fn assemble(text: &str, options: &RenderOptions) -> Vec<Block> {
    // A final newline terminates the last line rather than starting an empty one.
    let text = text.strip_suffix('\n').unwrap_or(text);
    text.split('\n')
        .fold(Assembler::new(options), Assembler::feed)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::InlineSpan;

    fn text(value: &str) -> Vec<InlineSpan> {
        vec![InlineSpan::text(value)]
    }

    #[test]
    fn test_paragraph_lines_are_joined() {
        let blocks = assemble("first line\nsecond line\n\nnext", &RenderOptions::default());
        assert_eq!(
            blocks,
            vec![
                Block::Paragraph(text("first line second line")),
                Block::Paragraph(text("next")),
            ]
        );
    }

    #[test]
    fn test_heading_flushes_paragraph() {
        let blocks = assemble("intro\n## Section\nbody", &RenderOptions::default());
        assert_eq!(
            blocks,
            vec![
                Block::Paragraph(text("intro")),
                Block::Heading {
                    level: 2,
                    spans: text("Section")
                },
                Block::Paragraph(text("body")),
            ]
        );
    }

    #[test]
    fn test_mixed_list_items_join_open_list() {
        let blocks = assemble("- a\n1. b\n* c", &RenderOptions::default());
        assert_eq!(
            blocks,
            vec![Block::List {
                ordered: false,
                items: vec![text("a"), text("b"), text("c")],
            }]
        );
    }

    #[test]
    fn test_mixed_list_items_split_when_enabled() {
        let options = RenderOptions::default().split_mixed_lists(true);
        let blocks = assemble("- a\n1. b\n2. c", &options);
        assert_eq!(
            blocks,
            vec![
                Block::List {
                    ordered: false,
                    items: vec![text("a")],
                },
                Block::List {
                    ordered: true,
                    items: vec![text("b"), text("c")],
                },
            ]
        );
    }

    #[test]
    fn test_text_after_list_closes_it() {
        let blocks = assemble("1. one\n2. two\nafterwards", &RenderOptions::default());
        assert_eq!(
            blocks,
            vec![
                Block::List {
                    ordered: true,
                    items: vec![text("one"), text("two")],
                },
                Block::Paragraph(text("afterwards")),
            ]
        );
    }

    #[test]
    fn test_blockquotes_are_not_joined() {
        let blocks = assemble("> one\n> two", &RenderOptions::default());
        assert_eq!(
            blocks,
            vec![Block::Blockquote(text("one")), Block::Blockquote(text("two"))]
        );
    }

    #[test]
    fn test_fence_keeps_content_verbatim() {
        let blocks = assemble("before\n```py\n  indented\n\n# not heading\n```\nafter", &RenderOptions::default());
        assert_eq!(
            blocks,
            vec![
                Block::Paragraph(text("before")),
                Block::CodeBlock {
                    language: Some("py".to_string()),
                    text: "  indented\n\n# not heading\n".to_string(),
                },
                Block::Paragraph(text("after")),
            ]
        );
    }

    #[test]
    fn test_unterminated_fence_is_flushed() {
        let blocks = assemble("```\npartial", &RenderOptions::default());
        assert_eq!(
            blocks,
            vec![Block::CodeBlock {
                language: None,
                text: "partial\n".to_string(),
            }]
        );
    }

    #[test]
    fn test_trailing_newline_in_unterminated_fence() {
        let blocks = assemble("```\ncode\n", &RenderOptions::default());
        assert_eq!(
            blocks,
            vec![Block::CodeBlock {
                language: None,
                text: "code\n".to_string(),
            }]
        );

        let blocks = assemble("```\ncode\n\n", &RenderOptions::default());
        assert_eq!(
            blocks,
            vec![Block::CodeBlock {
                language: None,
                text: "code\n\n".to_string(),
            }]
        );
    }

    #[test]
    fn test_crlf_fence_content_is_kept() {
        let blocks = assemble("```\r\nline one\r\n\r\n  two\r\n```\r\n", &RenderOptions::default());
        assert_eq!(
            blocks,
            vec![Block::CodeBlock {
                language: None,
                text: "line one\r\n\r\n  two\r\n".to_string(),
            }]
        );
    }

    #[test]
    fn test_crlf_line_endings() {
        let blocks = assemble("# Title\r\nbody\r\n", &RenderOptions::default());
        assert_eq!(
            blocks,
            vec![
                Block::Heading {
                    level: 1,
                    spans: text("Title")
                },
                Block::Paragraph(text("body")),
            ]
        );
    }

    #[test]
    fn test_thematic_break_between_paragraphs() {
        let blocks = assemble("above\n***\nbelow", &RenderOptions::default());
        assert_eq!(
            blocks,
            vec![
                Block::Paragraph(text("above")),
                Block::ThematicBreak,
                Block::Paragraph(text("below")),
            ]
        );
    }
}
