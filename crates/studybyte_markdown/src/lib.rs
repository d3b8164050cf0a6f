//! # studybyte_markdown
//!
//! Markdown renderer for StudyByte assistant replies.
//!
//! The renderer turns raw text into a [`Document`] of tagged [`Block`] and
//! [`InlineSpan`] values. It does not depend on a markdown library, it never
//! fails, and it is rebuilt from scratch on every call, so a chat view can
//! re-render the whole accumulated reply on every streamed update.
//!
//! ## Pipeline
//!
//! ```text
//! raw text ──▶ classify (per line) ──▶ Assembler (fold) ──▶ format_inline (per block)
//! ```
//!
//! - **Line classifier**: one line in, one [`LineKind`] out
//! - **Block assembler**: fences, lists and paragraph joining
//! - **Inline formatter**: code spans, then emphasis, then links
//!
//! Malformed markers degrade to literal text instead of raising errors.
//!
//! ## Example
//!
//! ```rust
//! use studybyte_markdown::{render, Block, InlineSpan};
//!
//! let doc = render("# Notes\n\nRemember `x`.");
//! assert_eq!(doc.len(), 2);
//! assert!(matches!(doc.blocks()[0], Block::Heading { level: 1, .. }));
//! assert_eq!(
//!     doc.blocks()[1],
//!     Block::Paragraph(vec![
//!         InlineSpan::text("Remember "),
//!         InlineSpan::Code("x".into()),
//!         InlineSpan::text("."),
//!     ])
//! );
//! ```

pub mod block;
pub mod classify;
pub mod document;
pub mod inline;

pub use block::{assemble, Assembler, RenderOptions};
pub use classify::{classify, Fence, LineKind};
pub use document::{Block, Document, InlineSpan};
pub use inline::format_inline;

use tracing::debug;

/// Render `raw_text` with default options.
pub fn render(raw_text: &str) -> Document {
    render_with(raw_text, &RenderOptions::default())
}

/// Render `raw_text` with explicit options.
pub fn render_with(raw_text: &str, options: &RenderOptions) -> Document {
    let blocks = assemble(raw_text, options);
    debug!(bytes = raw_text.len(), blocks = blocks.len(), "rendered document");
    Document::new(blocks)
}
