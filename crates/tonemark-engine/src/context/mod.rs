//! Structural context of a line, reduced to a short label.
//!
//! A lexical parser (supplied by the host through [`LexicalParser`]) turns
//! the document into a tree of indentation blocks. For any line it can hand
//! back a [`ContextChain`]: the node that owns the line, then each enclosing
//! block, ending at the document root.
//!
//! From that chain this module derives:
//! - a readable description, e.g. `for x in xs inside function main inside app.py`
//!   ([`describe`])
//! - a [`Label`] such as `b4` naming the kind of block and how deeply
//!   control flow is nested ([`classify`])
//! - the [`Cue`] to play for a line, which is the flag tone on flagged lines
//!   ([`CueResolver`])

mod classify;
mod cue;
mod describe;

pub use classify::{Category, Label, classify};
pub use cue::{Cue, CueResolver, CueSource};
pub use describe::{ROOT_PLACEHOLDER, describe};

use std::fmt;

/// Kinds of lexical node a parser reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    Function,
    Class,
    If,
    Elif,
    Else,
    For,
    While,
    Try,
    Except,
    Finally,
    With,
    Async,
    Comment,
    Statement,
    Empty,
    Indent,
}

impl TokenKind {
    pub fn keyword(self) -> &'static str {
        match self {
            TokenKind::Function => "function",
            TokenKind::Class => "class",
            TokenKind::If => "if",
            TokenKind::Elif => "elif",
            TokenKind::Else => "else",
            TokenKind::For => "for",
            TokenKind::While => "while",
            TokenKind::Try => "try",
            TokenKind::Except => "except",
            TokenKind::Finally => "finally",
            TokenKind::With => "with",
            TokenKind::Async => "async",
            TokenKind::Comment => "Comment",
            TokenKind::Statement => "statement",
            TokenKind::Empty => "EMPTY",
            TokenKind::Indent => "INDENT",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    /// Text following the keyword, e.g. the condition of an `if`
    pub attr: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LexNode {
    pub token: Option<Token>,
    /// Set on the document root sentinel
    pub root: bool,
}

impl LexNode {
    pub fn new(kind: TokenKind, attr: Option<&str>) -> Self {
        Self {
            token: Some(Token {
                kind,
                attr: attr.map(str::to_string),
            }),
            root: false,
        }
    }

    pub fn root() -> Self {
        Self {
            token: None,
            root: true,
        }
    }

    pub fn kind(&self) -> Option<TokenKind> {
        self.token.as_ref().map(|token| token.kind)
    }

    pub fn attr(&self) -> Option<&str> {
        self.token.as_ref().and_then(|token| token.attr.as_deref())
    }
}

/// Nodes enclosing one line, innermost first, root last.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ContextChain {
    nodes: Vec<LexNode>,
}

impl ContextChain {
    pub fn new(nodes: Vec<LexNode>) -> Self {
        Self { nodes }
    }

    pub fn innermost(&self) -> Option<&LexNode> {
        self.nodes.first()
    }

    /// Everything after the innermost node, walking outwards
    pub fn ancestors(&self) -> impl Iterator<Item = &LexNode> {
        self.nodes.iter().skip(1)
    }

    pub fn nodes(&self) -> &[LexNode] {
        &self.nodes
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl FromIterator<LexNode> for ContextChain {
    fn from_iter<I: IntoIterator<Item = LexNode>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

/// Tab configuration the parser needs to measure indentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TabSettings {
    pub size: usize,
    /// Indentation uses tab characters rather than spaces
    pub hard: bool,
}

impl Default for TabSettings {
    fn default() -> Self {
        Self {
            size: 4,
            hard: false,
        }
    }
}

/// Host-provided parser producing context chains.
pub trait LexicalParser {
    fn context(&self, text: &str, tabs: TabSettings, line: usize) -> anyhow::Result<ContextChain>;
}
