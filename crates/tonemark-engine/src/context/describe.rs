use super::{ContextChain, TokenKind};

/// Used in place of the document name when the host has none to offer.
pub const ROOT_PLACEHOLDER: &str = "the document";

/// Readable description of a line's context.
///
/// The innermost node contributes its keyword and attribute (statements
/// contribute only the attribute), a bare keyword for `else`, `try` and
/// `except`, or `BLANK` for an empty line. Each enclosing block then adds
/// `inside <keyword> <attr>`, and the root adds `inside <document name>`.
pub fn describe(chain: &ContextChain, document_name: Option<&str>) -> String {
    let mut description = String::new();

    if let Some(token) = chain.innermost().and_then(|node| node.token.as_ref()) {
        match (token.kind, token.attr.as_deref()) {
            (TokenKind::Statement, Some(attr)) => description.push_str(attr),
            (kind, Some(attr)) => {
                description.push_str(kind.keyword());
                description.push(' ');
                description.push_str(attr);
            }
            (kind @ (TokenKind::Else | TokenKind::Try | TokenKind::Except), None) => {
                description.push_str(kind.keyword());
            }
            (TokenKind::Empty, None) => description.push_str("BLANK"),
            _ => {}
        }
    }

    for node in chain.ancestors() {
        if let Some(token) = &node.token
            && !matches!(token.kind, TokenKind::Empty | TokenKind::Statement)
        {
            description.push_str(" inside ");
            description.push_str(token.kind.keyword());
            if let Some(attr) = &token.attr {
                description.push(' ');
                description.push_str(attr);
            }
        }
        if node.root {
            description.push_str(" inside ");
            description.push_str(document_name.unwrap_or(ROOT_PLACEHOLDER));
            break;
        }
    }

    description.trim_start().to_string()
}
