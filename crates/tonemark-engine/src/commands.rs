use std::fmt;

use crate::FlagError;
use crate::decoration::DecorationSink;
use crate::navigation::{CursorTarget, next_marker_target};
use crate::persistence::KeyValueStore;
use crate::registry::{ActiveEditor, DocumentRegistry};
use crate::tone::{Tone, ToneSink, play_cue};

/// User-facing flag commands. Each acts on the focused editor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    AddFlag,
    DeleteFlag,
    MoveToFlag,
}

impl Command {
    pub const ALL: [Command; 3] = [Command::AddFlag, Command::DeleteFlag, Command::MoveToFlag];
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Command::AddFlag => "Add flag",
            Command::DeleteFlag => "Delete flag",
            Command::MoveToFlag => "Move to flag",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandOutcome {
    Added { line: usize },
    Deleted { line: usize },
    Moved(CursorTarget),
}

/// A command failure, ready to show to the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub command: Command,
    pub message: String,
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.command, self.message)
    }
}

/// Host services a command may touch besides the registry.
pub struct CommandEnv<'a> {
    pub decorations: &'a mut dyn DecorationSink,
    pub audio: &'a mut dyn ToneSink,
    /// Played to confirm a new flag
    pub flag_tone: &'a Tone,
}

/// Run `command` against the focused `editor` (if any).
pub fn execute<S: KeyValueStore>(
    command: Command,
    registry: &mut DocumentRegistry<S>,
    editor: Option<&mut dyn ActiveEditor>,
    env: &mut CommandEnv<'_>,
) -> Result<CommandOutcome, FlagError> {
    let editor = editor.ok_or(FlagError::NoActiveDocument)?;
    let document = editor.document().clone();
    let line = editor.cursor_line();

    match command {
        Command::AddFlag => {
            if !editor.is_saved() {
                return Err(FlagError::DocumentNotSaved);
            }
            restore_flags(registry, editor)?;
            registry.add(&document, line, editor.line_count())?;
            registry.refresh_decorations(&document, env.decorations)?;
            play_cue(env.audio, env.flag_tone);
            Ok(CommandOutcome::Added { line })
        }
        Command::DeleteFlag => {
            if !editor.is_saved() {
                return Err(FlagError::DocumentNotSaved);
            }
            restore_flags(registry, editor)?;
            registry.remove(&document, line)?;
            registry.refresh_decorations(&document, env.decorations)?;
            Ok(CommandOutcome::Deleted { line })
        }
        Command::MoveToFlag => {
            if editor.is_saved() {
                restore_flags(registry, editor)?;
            }
            let target = next_marker_target(registry.lines(&document), line, |flag_line| {
                editor.line_len(flag_line)
            })?;
            editor.set_cursor(target);
            Ok(CommandOutcome::Moved(target))
        }
    }
}

// Stored flags must be loaded before the set is touched, or the next save
// would overwrite them. A corrupt record has already been reported and left
// tracked as empty.
fn restore_flags<S: KeyValueStore>(
    registry: &mut DocumentRegistry<S>,
    editor: &dyn ActiveEditor,
) -> Result<(), FlagError> {
    match registry.hydrate(editor.document(), editor.line_count()) {
        Ok(_) | Err(FlagError::CorruptRecord { .. }) => Ok(()),
        Err(e) => Err(e),
    }
}

/// [`execute`], with failures turned into a one-line [`Notice`] and logged.
pub fn run<S: KeyValueStore>(
    command: Command,
    registry: &mut DocumentRegistry<S>,
    editor: Option<&mut dyn ActiveEditor>,
    env: &mut CommandEnv<'_>,
) -> Result<CommandOutcome, Notice> {
    execute(command, registry, editor, env).map_err(|error| {
        let notice = Notice {
            command,
            message: error.to_string(),
        };
        log::warn!("{notice}");
        notice
    })
}
