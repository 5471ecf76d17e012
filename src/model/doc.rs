//! The structured documentation-comment model.
//!
//! A [`CommentBlock`] is an ordered sequence of tag entries. Literal
//! segments are opaque text spans; they are never re-tokenized as source,
//! which is what keeps runnable-looking snippets inside comments from ever
//! reaching the declaration scanner.

use smol_str::SmolStr;
use text_size::TextRange;

/// The tag of a documentation entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocTag {
    Brief,
    Param,
    TParam,
    Return,
    Copydoc,
    /// Free-form prose not introduced by any `@tag`.
    Plain,
}

impl DocTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Brief => "brief",
            Self::Param => "param",
            Self::TParam => "tparam",
            Self::Return => "return",
            Self::Copydoc => "copydoc",
            Self::Plain => "plain",
        }
    }
}

/// One piece of an entry body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocSegment {
    /// Prose text.
    Text(String),
    /// An auto-linked URL. Trailing `.`, `,`, `!`, `?`, `:`, `;` are never
    /// part of the link; a trailing `/` is.
    Link(String),
    /// An indented or fenced literal block, recorded as opaque text.
    Literal(String),
}

impl DocSegment {
    pub fn is_literal(&self) -> bool {
        matches!(self, Self::Literal(_))
    }

    pub fn as_text(&self) -> &str {
        match self {
            Self::Text(s) | Self::Link(s) | Self::Literal(s) => s,
        }
    }
}

/// One tagged entry of a comment block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocEntry {
    pub tag: DocTag,
    /// The named target for `@param`/`@tparam` (the parameter name) and
    /// `@copydoc` (the referenced symbol).
    pub target: Option<SmolStr>,
    pub body: Vec<DocSegment>,
}

impl DocEntry {
    /// The entry body flattened to plain text, literal blocks included.
    pub fn body_text(&self) -> String {
        let mut out = String::new();
        for segment in &self.body {
            if !out.is_empty() {
                out.push('\n');
            }
            out.push_str(segment.as_text());
        }
        out
    }
}

/// A parsed documentation comment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommentBlock {
    pub entries: Vec<DocEntry>,
    pub range: TextRange,
    /// 0-indexed line of the first comment token.
    pub line: u32,
    /// 0-indexed line of the last comment token.
    pub end_line: u32,
}

impl CommentBlock {
    pub fn brief(&self) -> Option<&DocEntry> {
        self.entries.iter().find(|e| e.tag == DocTag::Brief)
    }

    pub fn params(&self) -> impl Iterator<Item = &DocEntry> {
        self.entries.iter().filter(|e| e.tag == DocTag::Param)
    }

    pub fn tparams(&self) -> impl Iterator<Item = &DocEntry> {
        self.entries.iter().filter(|e| e.tag == DocTag::TParam)
    }

    pub fn returns(&self) -> Option<&DocEntry> {
        self.entries.iter().find(|e| e.tag == DocTag::Return)
    }

    /// The pending `@copydoc` target, if this block carries one.
    pub fn copydoc_target(&self) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.tag == DocTag::Copydoc)
            .and_then(|e| e.target.as_deref())
    }

    /// True when the block's sole content is an unresolved `@copydoc`
    /// reference.
    pub fn is_pending_copydoc(&self) -> bool {
        self.copydoc_target().is_some()
            && self
                .entries
                .iter()
                .all(|e| e.tag == DocTag::Copydoc || e.body.is_empty())
    }
}
