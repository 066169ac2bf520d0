//! Flags across a whole session: add, edit around them, save, restart,
//! and reconcile records of files that have since been deleted.

use pretty_assertions::assert_eq;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use tonemark_engine::persistence::{FsExistence, JsonFileStore};
use tonemark_engine::tone::LogSink;
use tonemark_engine::{
    ActiveEditor, ChangeEvent, Command, CommandEnv, CommandOutcome, CursorTarget, DecorationSink,
    DocumentId, DocumentRegistry, FlagDecoration, FlagError, Tone, run,
};

struct Buffer {
    id: DocumentId,
    lines: Vec<String>,
    cursor: CursorTarget,
}

impl Buffer {
    fn open(path: &Path) -> Self {
        let text = fs::read_to_string(path).unwrap();
        Self {
            id: DocumentId::new(path),
            lines: text.lines().map(str::to_string).collect(),
            cursor: CursorTarget { line: 0, column: 0 },
        }
    }

    fn goto(&mut self, line: usize) {
        self.cursor = CursorTarget { line, column: 0 };
    }

    /// Insert `count` blank lines before `at`.
    fn insert_lines(&mut self, at: usize, count: usize) -> ChangeEvent {
        for _ in 0..count {
            self.lines.insert(at, String::new());
        }
        ChangeEvent::new(self.id.clone(), self.lines.len(), vec![at..at])
    }

    /// Delete lines `range`.
    fn delete_lines(&mut self, range: std::ops::Range<usize>) -> ChangeEvent {
        let start = range.start;
        self.lines.drain(range.clone());
        ChangeEvent::new(self.id.clone(), self.lines.len(), vec![start..range.end])
    }
}

impl ActiveEditor for Buffer {
    fn document(&self) -> &DocumentId {
        &self.id
    }
    fn is_saved(&self) -> bool {
        true
    }
    fn cursor_line(&self) -> usize {
        self.cursor.line
    }
    fn line_count(&self) -> usize {
        self.lines.len()
    }
    fn line_len(&self, line: usize) -> usize {
        self.lines[line].chars().count()
    }
    fn set_cursor(&mut self, target: CursorTarget) {
        self.cursor = target;
    }
}

#[derive(Default)]
struct Gutter {
    shown: Vec<usize>,
}

impl DecorationSink for Gutter {
    fn set_flag_decorations(
        &mut self,
        _document: &DocumentId,
        decorations: &[FlagDecoration],
    ) -> Result<(), FlagError> {
        self.shown = decorations.iter().map(|d| d.line).collect();
        Ok(())
    }
}

fn write_source(dir: &Path, name: &str, lines: usize) -> PathBuf {
    let path = dir.join(name);
    let text: String = (0..lines).map(|i| format!("line_{i} = {i}\n")).collect();
    fs::write(&path, text).unwrap();
    path
}

fn open_registry(store_path: &Path) -> DocumentRegistry<JsonFileStore> {
    let store = JsonFileStore::open(store_path).unwrap();
    DocumentRegistry::with_reconciliation(store, FsExistence).unwrap()
}

#[test]
fn test_flags_follow_edits_and_survive_restart() {
    let temp = TempDir::new().unwrap();
    let store_path = temp.path().join("state").join("flags.json");
    let source = write_source(temp.path(), "app.py", 12);

    let mut gutter = Gutter::default();
    let mut audio = LogSink::new();
    let tone = Tone::default_flag();

    {
        let mut registry = open_registry(&store_path);
        let mut buffer = Buffer::open(&source);
        registry.activate(&buffer, &mut gutter).unwrap();
        let mut env = CommandEnv {
            decorations: &mut gutter,
            audio: &mut audio,
            flag_tone: &tone,
        };

        for line in [2, 5, 9] {
            buffer.goto(line);
            run(Command::AddFlag, &mut registry, Some(&mut buffer), &mut env).unwrap();
        }

        let event = buffer.insert_lines(4, 1);
        registry.apply_change(&event, env.decorations).unwrap();
        assert_eq!(registry.lines(&buffer.id), &[2, 6, 10]);

        let event = buffer.delete_lines(0..2);
        registry.apply_change(&event, env.decorations).unwrap();
        assert_eq!(registry.lines(&buffer.id), &[0, 4, 8]);

        registry.save(&buffer.id).unwrap();
        registry.close(&buffer.id);
    }
    assert_eq!(gutter.shown, vec![0, 4, 8]);

    let mut registry = open_registry(&store_path);
    let mut buffer = Buffer::open(&source);
    buffer.lines.truncate(11);
    registry.activate(&buffer, &mut gutter).unwrap();

    assert_eq!(registry.lines(&buffer.id), &[0, 4, 8]);
    assert_eq!(gutter.shown, vec![0, 4, 8]);

    let mut env = CommandEnv {
        decorations: &mut gutter,
        audio: &mut audio,
        flag_tone: &tone,
    };
    buffer.goto(8);
    let outcome = run(Command::MoveToFlag, &mut registry, Some(&mut buffer), &mut env).unwrap();
    assert_eq!(
        outcome,
        CommandOutcome::Moved(CursorTarget {
            line: 0,
            column: "line_0 = 0".len()
        })
    );
}

#[test]
fn test_deleting_every_flag_removes_the_record() {
    let temp = TempDir::new().unwrap();
    let store_path = temp.path().join("flags.json");
    let source = write_source(temp.path(), "lib.py", 6);

    let mut gutter = Gutter::default();
    let mut audio = LogSink::new();
    let tone = Tone::default_flag();
    let mut registry = open_registry(&store_path);
    let mut buffer = Buffer::open(&source);
    let mut env = CommandEnv {
        decorations: &mut gutter,
        audio: &mut audio,
        flag_tone: &tone,
    };

    buffer.goto(3);
    run(Command::AddFlag, &mut registry, Some(&mut buffer), &mut env).unwrap();
    registry.save(&buffer.id).unwrap();
    assert!(fs::read_to_string(&store_path).unwrap().contains("lib.py"));

    run(Command::DeleteFlag, &mut registry, Some(&mut buffer), &mut env).unwrap();
    registry.save(&buffer.id).unwrap();

    let reopened = JsonFileStore::open(&store_path).unwrap();
    let registry = DocumentRegistry::with_reconciliation(reopened, FsExistence).unwrap();
    assert!(registry.storage().keys().unwrap().is_empty());
}

#[test]
fn test_records_of_deleted_files_are_swept() {
    let temp = TempDir::new().unwrap();
    let store_path = temp.path().join("flags.json");
    let kept = write_source(temp.path(), "kept.py", 5);
    let gone = write_source(temp.path(), "gone.py", 5);

    {
        let mut registry = open_registry(&store_path);
        for path in [&kept, &gone] {
            let id = DocumentId::new(path);
            registry.add(&id, 1, 5).unwrap();
            registry.save(&id).unwrap();
        }
    }
    fs::remove_file(&gone).unwrap();

    let mut registry = open_registry(&store_path);
    assert_eq!(registry.pending_reconciliation(), 2);

    let mut removed = 0;
    while registry.pending_reconciliation() > 0 {
        removed += registry.sweep_step(1).unwrap();
    }

    assert_eq!(removed, 1);
    assert_eq!(
        registry.storage().keys().unwrap(),
        vec![DocumentId::new(&kept).key()]
    );
}

#[test]
fn test_corrupt_store_file_is_an_error() {
    let temp = TempDir::new().unwrap();
    let store_path = temp.path().join("flags.json");
    fs::write(&store_path, "not json").unwrap();

    assert!(JsonFileStore::open(&store_path).is_err());
}
