use std::fmt;

use super::{ContextChain, TokenKind};

/// What kind of block a line sits in, as far as the cue is concerned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    Loop,
    While,
    If,
    Else,
    Elif,
    Async,
    Function,
    Comment,
    Try,
    Except,
    Blank,
    Default,
}

impl Category {
    /// Base note of the cue for this category.
    pub fn note(self) -> &'static str {
        match self {
            Category::Loop => "b",
            Category::While => "d",
            Category::If => "g#",
            Category::Else => "a#",
            Category::Elif => "a",
            Category::Async => "c",
            Category::Function => "c#",
            Category::Comment => "f",
            Category::Try => "eb",
            Category::Except => "e",
            Category::Blank => "f#",
            Category::Default => "g",
        }
    }
}

/// Innermost node kinds that pick a category, highest priority first.
const PRIORITY: [(TokenKind, Category); 10] = [
    (TokenKind::For, Category::Loop),
    (TokenKind::While, Category::While),
    (TokenKind::If, Category::If),
    (TokenKind::Else, Category::Else),
    (TokenKind::Elif, Category::Elif),
    (TokenKind::Async, Category::Async),
    (TokenKind::Function, Category::Function),
    (TokenKind::Comment, Category::Comment),
    (TokenKind::Try, Category::Try),
    (TokenKind::Except, Category::Except),
];

/// Weight given to definitions regardless of nesting.
const DEFINITION_WEIGHT: usize = 4;
const BASE_WEIGHT: usize = 2;

/// A category plus a nesting weight; displays as a note name such as `b4`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Label {
    pub category: Category,
    pub weight: usize,
}

impl Label {
    pub fn note(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.category.note(), self.weight)
    }
}

/// Reduce a context chain to a [`Label`].
///
/// The category comes from the kind of the innermost node. The weight is 2
/// plus the number of `for`, `while`, `if`/`elif` and `else` nodes anywhere
/// in the chain, except for `async` and function definitions which always
/// weigh 4. Attribute text plays no part, so an identifier like `verify_if`
/// cannot change the result.
pub fn classify(chain: &ContextChain) -> Label {
    let innermost = chain.innermost().and_then(|node| node.kind());

    let nesting = chain
        .nodes()
        .iter()
        .filter_map(|node| node.kind())
        .filter(|kind| {
            matches!(
                kind,
                TokenKind::For
                    | TokenKind::While
                    | TokenKind::If
                    | TokenKind::Elif
                    | TokenKind::Else
            )
        })
        .count();
    let weight = nesting + BASE_WEIGHT;

    let matched = innermost.and_then(|kind| {
        PRIORITY
            .iter()
            .find(|(candidate, _)| *candidate == kind)
            .map(|(_, category)| *category)
    });

    match matched {
        Some(category @ (Category::Async | Category::Function)) => Label {
            category,
            weight: DEFINITION_WEIGHT,
        },
        Some(category) => Label { category, weight },
        None if innermost == Some(TokenKind::Empty) => Label {
            category: Category::Blank,
            weight,
        },
        None => Label {
            category: Category::Default,
            weight,
        },
    }
}
