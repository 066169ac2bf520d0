use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

use crate::FlagError;

/// Stable identity of a document: its canonical file path.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentId(PathBuf);

impl DocumentId {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(path.into())
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Key under which this document's flags are persisted
    pub fn key(&self) -> String {
        self.0.to_string_lossy().into_owned()
    }
}

impl fmt::Display for DocumentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl From<&str> for DocumentId {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

/// The flagged lines of one document together with the line count they
/// were last observed against.
///
/// `marker_lines` is kept strictly increasing: every mutation goes through
/// [`MarkerSet::add`], [`MarkerSet::remove`] or the shift engine, all of
/// which preserve the order without a re-sort.
///
/// The serialized shape is the persisted record:
/// `{"documentId": "...", "lineCount": 12, "markerLines": [2, 5]}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerSet {
    document_id: DocumentId,
    line_count: usize,
    marker_lines: Vec<usize>,
}

impl MarkerSet {
    pub fn new(document_id: DocumentId, line_count: usize) -> Self {
        Self {
            document_id,
            line_count,
            marker_lines: Vec::new(),
        }
    }

    /// Build a set from arbitrary lines, sorting and dropping repeats.
    pub fn with_lines(
        document_id: DocumentId,
        line_count: usize,
        lines: impl IntoIterator<Item = usize>,
    ) -> Self {
        let mut set = Self {
            document_id,
            line_count,
            marker_lines: lines.into_iter().collect(),
        };
        set.normalize();
        set
    }

    pub fn document(&self) -> &DocumentId {
        &self.document_id
    }

    pub fn line_count(&self) -> usize {
        self.line_count
    }

    pub fn set_line_count(&mut self, line_count: usize) {
        self.line_count = line_count;
    }

    /// Flagged lines, ascending
    pub fn lines(&self) -> &[usize] {
        &self.marker_lines
    }

    pub fn contains(&self, line: usize) -> bool {
        self.marker_lines.binary_search(&line).is_ok()
    }

    pub fn len(&self) -> usize {
        self.marker_lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.marker_lines.is_empty()
    }

    /// Flag `line`. Fails without touching the set if it is already flagged.
    pub fn add(&mut self, line: usize) -> Result<(), FlagError> {
        match self.marker_lines.binary_search(&line) {
            Ok(_) => Err(FlagError::DuplicateMarker { line }),
            Err(index) => {
                self.marker_lines.insert(index, line);
                log::debug!("flag added at line {line} in {}", self.document_id);
                Ok(())
            }
        }
    }

    /// Unflag `line`. Fails without touching the set if it was not flagged.
    pub fn remove(&mut self, line: usize) -> Result<(), FlagError> {
        match self.marker_lines.binary_search(&line) {
            Ok(index) => {
                self.marker_lines.remove(index);
                log::debug!("flag removed from line {line} in {}", self.document_id);
                Ok(())
            }
            Err(_) => Err(FlagError::MarkerNotFound { line }),
        }
    }

    /// Drop flags at or beyond `line_count`. Returns how many were dropped.
    pub(crate) fn retain_below(&mut self, line_count: usize) -> usize {
        let before = self.marker_lines.len();
        self.marker_lines.retain(|line| *line < line_count);
        before - self.marker_lines.len()
    }

    pub(crate) fn lines_mut(&mut self) -> &mut Vec<usize> {
        &mut self.marker_lines
    }

    /// Restore the ascending, duplicate-free invariant. Returns how many
    /// repeated lines were dropped.
    pub(crate) fn normalize(&mut self) -> usize {
        let before = self.marker_lines.len();
        self.marker_lines.sort_unstable();
        self.marker_lines.dedup();
        before - self.marker_lines.len()
    }
}
