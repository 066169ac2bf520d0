use std::ops::Range;

use crate::FlagError;
use crate::markers::{DocumentId, MarkerSet};

/// Gutter indicator for one flagged line: the first character of the line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlagDecoration {
    pub line: usize,
    pub columns: Range<usize>,
}

impl FlagDecoration {
    pub fn at_line(line: usize) -> Self {
        Self { line, columns: 0..1 }
    }
}

/// Where flag decorations are rendered.
///
/// Each call replaces the full set for `document`. A sink that cannot
/// render returns [`FlagError::DecorationUnavailable`].
pub trait DecorationSink {
    fn set_flag_decorations(
        &mut self,
        document: &DocumentId,
        decorations: &[FlagDecoration],
    ) -> Result<(), FlagError>;
}

pub fn decorations_for(set: Option<&MarkerSet>) -> Vec<FlagDecoration> {
    set.map(|set| set.lines().iter().copied().map(FlagDecoration::at_line).collect())
        .unwrap_or_default()
}
