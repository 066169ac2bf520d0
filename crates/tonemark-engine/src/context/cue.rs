use relative_path::RelativePathBuf;
use std::path::PathBuf;

use super::{ContextChain, Label, LexicalParser, TabSettings, classify, describe};
use crate::markers::DocumentId;
use crate::tone::Tone;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CueSource {
    /// The line carries a flag
    Flag,
    Context { label: Label, description: String },
}

/// What to play for a line, and why.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cue {
    pub tone: Tone,
    pub source: CueSource,
}

/// Decides the cue for the line under the cursor.
#[derive(Debug, Clone)]
pub struct CueResolver {
    flag_tone: Tone,
    tabs: TabSettings,
    workspace_root: Option<PathBuf>,
}

impl CueResolver {
    pub fn new(flag_tone: Tone, tabs: TabSettings) -> Self {
        Self {
            flag_tone,
            tabs,
            workspace_root: None,
        }
    }

    /// Describe documents relative to `root` when they live under it.
    pub fn with_workspace_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.workspace_root = Some(root.into());
        self
    }

    pub fn flag_tone(&self) -> &Tone {
        &self.flag_tone
    }

    /// Cue for `line` of `document`. Flagged lines skip parsing entirely.
    /// A parser failure is logged and treated as a line without context.
    pub fn resolve(
        &self,
        flagged: bool,
        document: &DocumentId,
        text: &str,
        line: usize,
        parser: &dyn LexicalParser,
    ) -> Cue {
        if flagged {
            return Cue {
                tone: self.flag_tone.clone(),
                source: CueSource::Flag,
            };
        }

        let chain = parser
            .context(text, self.tabs, line)
            .unwrap_or_else(|e| {
                log::warn!("{document}: no context for line {line}: {e:#}");
                ContextChain::default()
            });
        let label = classify(&chain);
        let name = self.document_name(document);
        let description = describe(&chain, Some(&name));
        log::debug!("{document}:{line} {label} <- {description}");

        Cue {
            tone: Tone::for_label(&label),
            source: CueSource::Context { label, description },
        }
    }

    /// Name used for the root of a description: the workspace-relative path
    /// with forward slashes, or the full path outside the workspace.
    pub fn document_name(&self, document: &DocumentId) -> String {
        self.workspace_root
            .as_deref()
            .and_then(|root| document.path().strip_prefix(root).ok())
            .and_then(|relative| RelativePathBuf::from_path(relative).ok())
            .map(|relative| relative.to_string())
            .unwrap_or_else(|| document.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{Category, LexNode, TokenKind};
    use pretty_assertions::assert_eq;
    use std::cell::Cell;

    /// Returns a fixed chain and counts how often it was asked.
    struct FixedParser {
        chain: ContextChain,
        calls: Cell<usize>,
    }

    impl FixedParser {
        fn new(nodes: Vec<LexNode>) -> Self {
            Self {
                chain: ContextChain::new(nodes),
                calls: Cell::new(0),
            }
        }
    }

    impl LexicalParser for FixedParser {
        fn context(&self, _text: &str, _tabs: TabSettings, _line: usize) -> anyhow::Result<ContextChain> {
            self.calls.set(self.calls.get() + 1);
            Ok(self.chain.clone())
        }
    }

    struct FailingParser;

    impl LexicalParser for FailingParser {
        fn context(&self, _text: &str, _tabs: TabSettings, line: usize) -> anyhow::Result<ContextChain> {
            anyhow::bail!("line {line} is out of range")
        }
    }

    fn resolver() -> CueResolver {
        CueResolver::new(Tone::default_flag(), TabSettings::default()).with_workspace_root("/work")
    }

    #[test]
    fn test_flagged_line_short_circuits() {
        let parser = FixedParser::new(vec![LexNode::new(TokenKind::For, Some("x in y")), LexNode::root()]);
        let cue = resolver().resolve(true, &DocumentId::from("/work/a.py"), "", 0, &parser);

        assert_eq!(cue.tone, Tone::default_flag());
        assert_eq!(cue.source, CueSource::Flag);
        assert_eq!(parser.calls.get(), 0);
    }

    #[test]
    fn test_unflagged_line_uses_context() {
        let parser = FixedParser::new(vec![
            LexNode::new(TokenKind::For, Some("x in y")),
            LexNode::new(TokenKind::Function, Some("main")),
            LexNode::root(),
        ]);
        let cue = resolver().resolve(false, &DocumentId::from("/work/src/a.py"), "", 1, &parser);

        assert_eq!(cue.tone, Tone::new("b3", 0));
        assert_eq!(
            cue.source,
            CueSource::Context {
                label: Label {
                    category: Category::Loop,
                    weight: 3
                },
                description: "for x in y inside function main inside src/a.py".to_string(),
            }
        );
    }

    #[test]
    fn test_parser_failure_falls_back_to_default() {
        let cue = resolver().resolve(false, &DocumentId::from("/work/a.py"), "", 99, &FailingParser);
        assert_eq!(cue.tone.note, "g2");
    }

    #[test]
    fn test_document_name_outside_workspace_is_full_path() {
        assert_eq!(
            resolver().document_name(&DocumentId::from("/elsewhere/b.py")),
            "/elsewhere/b.py"
        );
        assert_eq!(
            resolver().document_name(&DocumentId::from("/work/pkg/mod/b.py")),
            "pkg/mod/b.py"
        );
    }
}
