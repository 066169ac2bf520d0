//! Line flags for source files, and audible cues for the line under the cursor.
//!
//! Flags are user-chosen lines that stay attached to their content while the
//! document is edited, survive restarts through a key-value store, and can be
//! cycled through. Every other line gets a cue derived from its structural
//! context (loop, branch, function, ...).

pub mod commands;
pub mod context;
pub mod decoration;
pub mod error;
pub mod markers;
pub mod navigation;
pub mod persistence;
pub mod registry;
pub mod shift;
pub mod tone;

pub use commands::{Command, CommandEnv, CommandOutcome, Notice, execute, run};
pub use decoration::{DecorationSink, FlagDecoration};
pub use error::FlagError;
pub use markers::{DocumentId, MarkerSet};
pub use navigation::CursorTarget;
pub use registry::{ActiveEditor, DocumentRegistry};
pub use shift::{ChangeEvent, ShiftOutcome};
pub use tone::{Tone, ToneSink};
