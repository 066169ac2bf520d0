//! Indentation outline for Python-like sources.
//!
//! Good enough to give the terminal host something to classify: each line
//! is recognised by its leading keyword and its enclosing blocks are the
//! nearest preceding lines with less indentation.

use anyhow::bail;
use tonemark_engine::context::{ContextChain, LexNode, LexicalParser, TabSettings, TokenKind};

#[derive(Debug, Default, Clone, Copy)]
pub struct IndentOutline;

impl LexicalParser for IndentOutline {
    fn context(&self, text: &str, tabs: TabSettings, line: usize) -> anyhow::Result<ContextChain> {
        let lines: Vec<&str> = text.split('\n').collect();
        if line >= lines.len() {
            bail!("line {line} is past the end of a {}-line document", lines.len());
        }

        let mut nodes = vec![node_for(lines[line])];
        let mut limit = effective_indent(&lines, line, tabs);
        for above in lines[..line].iter().rev() {
            if limit == 0 {
                break;
            }
            if is_blank(above) || above.trim_start().starts_with('#') {
                continue;
            }
            let indent = indent_width(above, tabs);
            if indent < limit {
                nodes.push(node_for(above));
                limit = indent;
            }
        }
        nodes.push(LexNode::root());
        Ok(ContextChain::new(nodes))
    }
}

fn is_blank(line: &str) -> bool {
    line.trim().is_empty()
}

// Under hard tabs only whole tab stops are indentation; spaces after them
// are alignment.
fn indent_width(line: &str, tabs: TabSettings) -> usize {
    let size = tabs.size.max(1);
    let width = line
        .chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .fold(0, |width, c| match c {
            '\t' => (width / size + 1) * size,
            _ => width + 1,
        });
    if tabs.hard { width - width % size } else { width }
}

// A blank line belongs to the block of the line before it, or inside that
// line if it opens a block.
fn effective_indent(lines: &[&str], line: usize, tabs: TabSettings) -> usize {
    if !is_blank(lines[line]) {
        return indent_width(lines[line], tabs);
    }
    match lines[..line].iter().rev().find(|above| !is_blank(above)) {
        Some(above) if above.trim_end().ends_with(':') => indent_width(above, tabs) + 1,
        Some(above) => indent_width(above, tabs),
        None => 0,
    }
}

fn node_for(line: &str) -> LexNode {
    let text = line.trim();
    if text.is_empty() {
        return LexNode::new(TokenKind::Empty, None);
    }
    if let Some(comment) = text.strip_prefix('#') {
        return LexNode::new(TokenKind::Comment, non_empty(comment.trim()));
    }

    const KEYWORDS: [(&str, TokenKind); 12] = [
        ("async", TokenKind::Async),
        ("def", TokenKind::Function),
        ("class", TokenKind::Class),
        ("if", TokenKind::If),
        ("elif", TokenKind::Elif),
        ("else", TokenKind::Else),
        ("for", TokenKind::For),
        ("while", TokenKind::While),
        ("try", TokenKind::Try),
        ("except", TokenKind::Except),
        ("finally", TokenKind::Finally),
        ("with", TokenKind::With),
    ];
    let word_end = text
        .find(|c: char| !(c.is_alphanumeric() || c == '_'))
        .unwrap_or(text.len());
    let (word, rest) = text.split_at(word_end);

    match KEYWORDS.iter().find(|(keyword, _)| *keyword == word) {
        Some((_, kind @ (TokenKind::Function | TokenKind::Class))) => {
            let name_end = rest.find(['(', ':']).unwrap_or(rest.len());
            LexNode::new(*kind, non_empty(rest[..name_end].trim()))
        }
        Some((_, kind)) => LexNode::new(*kind, non_empty(block_header(rest))),
        None => LexNode::new(TokenKind::Statement, Some(text)),
    }
}

/// Header text after the keyword, without the block colon.
fn block_header(rest: &str) -> &str {
    let rest = rest.trim();
    rest.strip_suffix(':').unwrap_or(rest).trim()
}

fn non_empty(text: &str) -> Option<&str> {
    (!text.is_empty()).then_some(text)
}
