//! The table of open documents and their flags.
//!
//! A [`DocumentRegistry`] is owned by whoever dispatches editor events and
//! commands. It ties the in-memory flag sets to storage: documents are
//! hydrated when they become active, written (or tombstoned) when saved and
//! forgotten when closed.

use std::collections::HashMap;

use crate::FlagError;
use crate::decoration::{DecorationSink, decorations_for};
use crate::markers::{DocumentId, MarkerSet};
use crate::navigation::{CursorTarget, next_marker};
use crate::persistence::{ExistenceCheck, KeyValueStore, MarkerStorage, Reconciler};
use crate::shift::{ChangeEvent, ShiftOutcome, apply_change_event};

/// The host's view of the focused editor.
pub trait ActiveEditor {
    fn document(&self) -> &DocumentId;
    /// `false` for scratch buffers that have never been written to disk
    fn is_saved(&self) -> bool;
    fn cursor_line(&self) -> usize;
    fn line_count(&self) -> usize;
    /// Length of `line` in characters
    fn line_len(&self, line: usize) -> usize;
    fn set_cursor(&mut self, target: CursorTarget);
}

pub struct DocumentRegistry<S> {
    open: HashMap<DocumentId, MarkerSet>,
    storage: MarkerStorage<S>,
    reconciler: Reconciler,
}

impl<S: KeyValueStore> DocumentRegistry<S> {
    pub fn new(storage: MarkerStorage<S>, reconciler: Reconciler) -> Self {
        Self {
            open: HashMap::new(),
            storage,
            reconciler,
        }
    }

    /// Registry whose stored records are reconciled against `check`,
    /// lazily per document and through [`DocumentRegistry::sweep_step`].
    pub fn with_reconciliation(
        store: S,
        check: impl ExistenceCheck + 'static,
    ) -> Result<Self, FlagError> {
        let storage = MarkerStorage::new(store);
        let reconciler = Reconciler::new(check, storage.keys()?);
        Ok(Self::new(storage, reconciler))
    }

    pub fn storage(&self) -> &MarkerStorage<S> {
        &self.storage
    }

    pub fn is_tracked(&self, document: &DocumentId) -> bool {
        self.open.contains_key(document)
    }

    pub fn marker_set(&self, document: &DocumentId) -> Option<&MarkerSet> {
        self.open.get(document)
    }

    /// Flagged lines of `document`, ascending; empty when untracked.
    pub fn lines(&self, document: &DocumentId) -> &[usize] {
        self.open
            .get(document)
            .map(MarkerSet::lines)
            .unwrap_or_default()
    }

    pub fn is_flagged(&self, document: &DocumentId, line: usize) -> bool {
        self.open.get(document).is_some_and(|set| set.contains(line))
    }

    /// Flag `line`, starting to track `document` if this is its first flag.
    pub fn add(
        &mut self,
        document: &DocumentId,
        line: usize,
        line_count: usize,
    ) -> Result<(), FlagError> {
        self.open
            .entry(document.clone())
            .or_insert_with(|| MarkerSet::new(document.clone(), line_count))
            .add(line)
    }

    pub fn remove(&mut self, document: &DocumentId, line: usize) -> Result<(), FlagError> {
        match self.open.get_mut(document) {
            Some(set) => set.remove(line),
            None => Err(FlagError::MarkerNotFound { line }),
        }
    }

    pub fn next_marker(&self, document: &DocumentId, current_line: usize) -> Result<usize, FlagError> {
        next_marker(self.lines(document), current_line)
    }

    /// Load stored flags for `document` unless it is already tracked.
    /// Returns whether a stored record was found.
    ///
    /// Any pending reconciliation of the record happens first.
    pub fn hydrate(&mut self, document: &DocumentId, line_count: usize) -> Result<bool, FlagError> {
        if self.is_tracked(document) {
            return Ok(true);
        }
        if !self.reconciler.settle(&mut self.storage, &document.key())? {
            return Ok(false);
        }
        let loaded = match self.storage.load(document) {
            Ok(loaded) => loaded,
            Err(err @ FlagError::CorruptRecord { .. }) => {
                log::warn!("{err}");
                // Track an empty set so the next save replaces the bad record
                self.open
                    .insert(document.clone(), MarkerSet::new(document.clone(), line_count));
                return Err(err);
            }
            Err(err) => return Err(err),
        };
        let Some(mut set) = loaded else {
            return Ok(false);
        };

        if set.line_count() != line_count {
            log::info!(
                "{document}: stored for {} lines, now {line_count}",
                set.line_count()
            );
            let dropped = set.retain_below(line_count);
            if dropped > 0 {
                log::warn!("{document}: dropped {dropped} flags past the end of the file");
            }
            set.set_line_count(line_count);
        }
        log::info!("{document}: restored {} flags", set.len());
        self.open.insert(document.clone(), set);
        Ok(true)
    }

    /// Focus moved to `editor`: hydrate its document if needed and redraw
    /// its flags. Decorations are redrawn even when hydration fails.
    pub fn activate(
        &mut self,
        editor: &dyn ActiveEditor,
        decorations: &mut dyn DecorationSink,
    ) -> Result<(), FlagError> {
        let hydrated = if editor.is_saved() {
            self.hydrate(editor.document(), editor.line_count()).map(drop)
        } else {
            Ok(())
        };
        self.refresh_decorations(editor.document(), decorations)?;
        hydrated
    }

    /// Keep flags anchored after an edit, redrawing them if any moved.
    pub fn apply_change(
        &mut self,
        event: &ChangeEvent,
        decorations: &mut dyn DecorationSink,
    ) -> Result<ShiftOutcome, FlagError> {
        let Some(set) = self.open.get_mut(&event.document) else {
            return Ok(ShiftOutcome::Unchanged);
        };
        let outcome = apply_change_event(set, event);
        if outcome != ShiftOutcome::Unchanged {
            self.refresh_decorations(&event.document, decorations)?;
        }
        Ok(outcome)
    }

    /// Persist the flags of `document`. Untracked documents are left alone.
    /// A failed write is not retried; the in-memory flags stay as they are.
    pub fn save(&mut self, document: &DocumentId) -> Result<(), FlagError> {
        let Some(set) = self.open.get(document) else {
            return Ok(());
        };
        self.reconciler.mark_settled(&document.key());
        self.storage.save(document, Some(set))
    }

    /// Forget `document`. Unsaved flag changes are discarded.
    pub fn close(&mut self, document: &DocumentId) {
        if self.open.remove(document).is_some() {
            log::debug!("{document}: closed");
        }
    }

    pub fn refresh_decorations(
        &self,
        document: &DocumentId,
        decorations: &mut dyn DecorationSink,
    ) -> Result<(), FlagError> {
        decorations.set_flag_decorations(document, &decorations_for(self.open.get(document)))
    }

    /// Reconcile up to `max` stored records; meant for idle time.
    pub fn sweep_step(&mut self, max: usize) -> Result<usize, FlagError> {
        self.reconciler.sweep_step(&mut self.storage, max)
    }

    pub fn pending_reconciliation(&self) -> usize {
        self.reconciler.pending()
    }
}
