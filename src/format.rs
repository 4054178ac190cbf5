//! Text formatting for chat bubbles.
//!
//! Turns free-form text into a small structured [`Markup`] tree made of
//! paragraphs and fenced code blocks. The only markup ever emitted is the
//! set of tags synthesized here; every character of user or model text is
//! HTML-escaped before it is wrapped.
//!
//! # Example
//!
//! ```rust
//! use htmx_chat::format::{format, Block};
//!
//! let markup = format("hello\n\nworld ```x=1``` done");
//! assert_eq!(markup.blocks().len(), 4);
//! assert!(matches!(&markup.blocks()[2], Block::Code(code) if code == "x=1"));
//! assert_eq!(
//!     markup.to_html(),
//!     "<p>hello</p><p>world</p><pre><code>x=1</code></pre><p>done</p>"
//! );
//! ```

use std::fmt::Write as _;
use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;

/// Matches one complete fenced span; an unmatched opening fence never matches.
static FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)```(.*?)```").expect("fence pattern is valid"));

/// Two or more consecutive newlines separate paragraphs.
static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{2,}").expect("blank line pattern is valid"));

/// A structural block of formatted text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "text", rename_all = "snake_case")]
pub enum Block {
    /// Prose paragraph, one entry per line (joined with explicit line breaks).
    Paragraph(Vec<String>),
    /// Verbatim contents of a fenced code span.
    Code(String),
}

/// Structured, escape-on-render representation of a message body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Markup {
    blocks: Vec<Block>,
}

impl Markup {
    /// The blocks in original order. Never empty.
    #[must_use]
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// Render to HTML.
    ///
    /// Text runs are escaped before the surrounding tags are written, so the
    /// only `<`, `>` and `&` characters in the output belong to `<p>`, `<br>`,
    /// `<pre>` and `<code>` or to entities.
    #[must_use]
    pub fn to_html(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            match block {
                Block::Paragraph(lines) => {
                    let escaped: Vec<String> = lines.iter().map(|l| escape_html(l)).collect();
                    let _ = write!(out, "<p>{}</p>", escaped.join("<br>"));
                }
                Block::Code(code) => {
                    let _ = write!(out, "<pre><code>{}</code></pre>", escape_html(code));
                }
            }
        }
        out
    }

    /// Text content as a reader sees it, used when copying a message.
    ///
    /// Paragraphs are separated by a blank line and code is kept verbatim.
    #[must_use]
    pub fn plain_text(&self) -> String {
        self.blocks
            .iter()
            .map(|block| match block {
                Block::Paragraph(lines) => lines.join("\n"),
                Block::Code(code) => code.clone(),
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    /// Number of code blocks.
    #[must_use]
    pub fn code_block_count(&self) -> usize {
        self.blocks
            .iter()
            .filter(|b| matches!(b, Block::Code(_)))
            .count()
    }
}

/// Format free-form text into [`Markup`].
///
/// Total over every input: unmatched fences stay prose and empty input
/// yields a single empty paragraph.
#[must_use]
pub fn format(text: &str) -> Markup {
    let text = text.replace("\r\n", "\n");
    let mut blocks = Vec::new();
    let mut cursor = 0;

    for caps in FENCE.captures_iter(&text) {
        let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        push_paragraphs(&mut blocks, &text[cursor..whole.start()]);
        blocks.push(Block::Code(inner.as_str().to_string()));
        cursor = whole.end();
    }
    push_paragraphs(&mut blocks, &text[cursor..]);

    if blocks.is_empty() {
        blocks.push(Block::Paragraph(vec![String::new()]));
    }

    Markup { blocks }
}

fn push_paragraphs(blocks: &mut Vec<Block>, prose: &str) {
    for paragraph in BLANK_LINES.split(prose) {
        let paragraph = paragraph.trim();
        if paragraph.is_empty() {
            continue;
        }
        blocks.push(Block::Paragraph(
            paragraph.split('\n').map(str::to_string).collect(),
        ));
    }
}

/// Escape `&`, `<` and `>` so text cannot be read as markup.
#[must_use]
pub fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}
