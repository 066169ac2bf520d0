use std::borrow::Cow;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tonemark_engine::{ActiveEditor, ChangeEvent, CursorTarget, DocumentId};
use xi_rope::Rope;
use xi_rope::delta::Builder;

/// The file being edited: an `xi_rope::Rope` plus a cursor.
///
/// Every structural edit goes through a `Delta` and reports the affected
/// line range as a [`ChangeEvent`].
pub struct TextBuffer {
    id: DocumentId,
    path: PathBuf,
    rope: Rope,
    cursor: CursorTarget,
    on_disk: bool,
    modified: bool,
}

impl TextBuffer {
    /// Open `path`, or start an empty buffer for it if the file does not
    /// exist yet.
    pub fn open(path: &Path) -> Result<Self> {
        let (text, on_disk) = match std::fs::read_to_string(path) {
            Ok(text) => (text, true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => (String::new(), false),
            Err(e) => return Err(e).with_context(|| format!("reading {}", path.display())),
        };
        // Flags are keyed by the canonical path so the same file always
        // finds its record
        let resolved = if on_disk {
            std::fs::canonicalize(path)
        } else {
            std::path::absolute(path)
        }
        .with_context(|| format!("resolving {}", path.display()))?;
        Ok(Self::from_text(resolved, &text, on_disk))
    }

    pub fn from_text(path: PathBuf, text: &str, on_disk: bool) -> Self {
        Self {
            id: DocumentId::new(path.clone()),
            path,
            rope: Rope::from(text),
            cursor: CursorTarget { line: 0, column: 0 },
            on_disk,
            modified: false,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn is_modified(&self) -> bool {
        self.modified
    }

    pub fn cursor(&self) -> CursorTarget {
        self.cursor
    }

    pub fn text(&self) -> String {
        self.rope.to_string()
    }

    pub fn line(&self, line: usize) -> Cow<'_, str> {
        let start = self.rope.offset_of_line(line);
        self.rope.slice_to_cow(start..self.line_end(line))
    }

    /// Byte offset of the end of `line`, before its newline.
    fn line_end(&self, line: usize) -> usize {
        if line + 1 >= self.line_count() {
            self.rope.len()
        } else {
            self.rope.offset_of_line(line + 1) - 1
        }
    }

    /// Move the cursor by `delta` lines, keeping the column where possible.
    /// Returns whether the line changed.
    pub fn move_lines(&mut self, delta: isize) -> bool {
        let last = self.line_count().saturating_sub(1) as isize;
        let line = (self.cursor.line as isize + delta).clamp(0, last) as usize;
        let changed = line != self.cursor.line;
        self.cursor.line = line;
        self.cursor.column = self.cursor.column.min(self.line_len(line));
        changed
    }

    pub fn move_columns(&mut self, delta: isize) {
        let max = self.line_len(self.cursor.line) as isize;
        self.cursor.column = (self.cursor.column as isize + delta).clamp(0, max) as usize;
    }

    /// Insert an empty line below the cursor line and move onto it.
    pub fn open_line_below(&mut self) -> ChangeEvent {
        // Inserting at the start of the next line leaves the cursor line,
        // and any flag on it, where it is
        let start_line = self.cursor.line + 1;
        let at = if start_line < self.line_count() {
            self.rope.offset_of_line(start_line)
        } else {
            self.rope.len()
        };

        let mut builder = Builder::new(self.rope.len());
        builder.replace(at..at, Rope::from("\n"));
        self.rope = builder.build().apply(&self.rope);
        self.modified = true;

        self.cursor = CursorTarget {
            line: self.cursor.line + 1,
            column: 0,
        };
        ChangeEvent::new(self.id.clone(), self.line_count(), vec![start_line..start_line])
    }

    /// Delete the cursor line, newline included. The only line of a
    /// document is emptied instead.
    pub fn delete_line(&mut self) -> ChangeEvent {
        let line = self.cursor.line;
        let range = if self.line_count() == 1 {
            0..self.rope.len()
        } else if line + 1 == self.line_count() {
            self.line_end(line - 1)..self.rope.len()
        } else {
            self.rope.offset_of_line(line)..self.rope.offset_of_line(line + 1)
        };
        let start_line = self.rope.line_of_offset(range.start);
        let end_line = self.rope.line_of_offset(range.end);

        let mut builder = Builder::new(self.rope.len());
        builder.delete(range);
        self.rope = builder.build().apply(&self.rope);
        self.modified = true;

        let line = line.min(self.line_count() - 1);
        self.cursor = CursorTarget {
            line,
            column: self.cursor.column.min(self.line_len(line)),
        };
        ChangeEvent::new(self.id.clone(), self.line_count(), vec![start_line..end_line])
    }

    pub fn save(&mut self) -> Result<()> {
        std::fs::write(&self.path, self.text())
            .with_context(|| format!("writing {}", self.path.display()))?;
        self.on_disk = true;
        self.modified = false;
        log::info!("saved {}", self.path.display());

        // A new file only has a canonical path once it exists
        let canonical = std::fs::canonicalize(&self.path)
            .with_context(|| format!("resolving {}", self.path.display()))?;
        if canonical != self.path {
            log::debug!("{} is now keyed as {}", self.path.display(), canonical.display());
            self.id = DocumentId::new(canonical.clone());
            self.path = canonical;
        }
        Ok(())
    }
}

impl ActiveEditor for TextBuffer {
    fn document(&self) -> &DocumentId {
        &self.id
    }

    fn is_saved(&self) -> bool {
        self.on_disk
    }

    fn cursor_line(&self) -> usize {
        self.cursor.line
    }

    fn line_count(&self) -> usize {
        self.rope.line_of_offset(self.rope.len()) + 1
    }

    fn line_len(&self, line: usize) -> usize {
        self.line(line).chars().count()
    }

    fn set_cursor(&mut self, target: CursorTarget) {
        self.cursor = target;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn buffer(text: &str) -> TextBuffer {
        TextBuffer::from_text(PathBuf::from("/w/app.py"), text, true)
    }

    #[test]
    fn test_line_access() {
        let buf = buffer("def f():\n    pass\n");
        assert_eq!(buf.line_count(), 3);
        assert_eq!(buf.line(0), "def f():");
        assert_eq!(buf.line(1), "    pass");
        assert_eq!(buf.line(2), "");
        assert_eq!(buf.line_len(1), 8);
    }

    #[test]
    fn test_open_line_below_reports_insert() {
        let mut buf = buffer("a\nb\nc");
        buf.move_lines(1);

        let event = buf.open_line_below();

        assert_eq!(buf.text(), "a\nb\n\nc");
        assert_eq!(event.new_line_count, 4);
        assert_eq!(event.changes, vec![2..2]);
        assert_eq!(buf.cursor(), CursorTarget { line: 2, column: 0 });
        assert!(buf.is_modified());
    }

    #[test]
    fn test_open_line_below_last_line() {
        let mut buf = buffer("a\nb");
        buf.move_lines(1);

        let event = buf.open_line_below();

        assert_eq!(buf.text(), "a\nb\n");
        assert_eq!(event.changes, vec![2..2]);
        assert_eq!(buf.cursor().line, 2);
    }

    #[test]
    fn test_delete_middle_line() {
        let mut buf = buffer("a\nb\nc");
        buf.move_lines(1);

        let event = buf.delete_line();

        assert_eq!(buf.text(), "a\nc");
        assert_eq!(event.new_line_count, 2);
        assert_eq!(event.changes, vec![1..2]);
        assert_eq!(buf.cursor().line, 1);
    }

    #[test]
    fn test_delete_last_line_takes_preceding_newline() {
        let mut buf = buffer("a\nb\nc");
        buf.move_lines(2);

        let event = buf.delete_line();

        assert_eq!(buf.text(), "a\nb");
        assert_eq!(event.changes, vec![1..2]);
        assert_eq!(buf.cursor().line, 1);
    }

    #[test]
    fn test_delete_only_line_empties_it() {
        let mut buf = buffer("solo");
        let event = buf.delete_line();

        assert_eq!(buf.text(), "");
        assert_eq!(event.new_line_count, 1);
    }

    #[test]
    fn test_cursor_clamps_to_line_length() {
        let mut buf = buffer("longer line\nab");
        buf.move_columns(100);
        assert_eq!(buf.cursor().column, 11);

        assert!(buf.move_lines(1));
        assert_eq!(buf.cursor(), CursorTarget { line: 1, column: 2 });
        assert!(!buf.move_lines(5));
    }

    #[test]
    fn test_new_file_is_unsaved_until_written() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("new.py");
        let mut buf = TextBuffer::open(&path).unwrap();
        assert!(!buf.is_saved());
        assert_eq!(buf.line_count(), 1);

        buf.save().unwrap();

        assert!(buf.is_saved());
        assert!(path.exists());
    }

    #[test]
    fn test_first_save_keys_new_file_by_canonical_path() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir(temp.path().join("sub")).unwrap();
        let mut buf = TextBuffer::open(&temp.path().join("sub").join("..").join("new.py")).unwrap();
        assert!(buf.path().is_absolute());

        buf.save().unwrap();

        let canonical = std::fs::canonicalize(temp.path().join("new.py")).unwrap();
        assert_eq!(buf.path(), canonical.as_path());
        assert_eq!(buf.document(), &DocumentId::new(canonical));
    }
}
