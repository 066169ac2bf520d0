use crate::persistence::StoreError;

/// Everything that can go wrong while working with line flags.
///
/// Each variant renders as a single line suitable for showing to the user
/// as-is; the command boundary in [`crate::commands::run`] relies on that.
#[derive(Debug, thiserror::Error)]
pub enum FlagError {
    #[error("No active editor")]
    NoActiveDocument,
    #[error("Document must be saved before using line flags")]
    DocumentNotSaved,
    #[error("Line {} already has a flag", .line + 1)]
    DuplicateMarker { line: usize },
    #[error("No flag on line {}", .line + 1)]
    MarkerNotFound { line: usize },
    #[error("No flags in this document")]
    EmptyMarkerSet,
    #[error("Stored flags for {key} are unreadable: {source}")]
    CorruptRecord {
        key: String,
        source: serde_json::Error,
    },
    #[error("Flag decorations are not available")]
    DecorationUnavailable,
    #[error("Flag storage failed: {0}")]
    Storage(#[from] StoreError),
}
