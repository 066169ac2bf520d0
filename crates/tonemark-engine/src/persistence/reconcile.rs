use std::collections::BTreeSet;
use std::fmt;
use std::io;
use std::path::Path;

use super::{KeyValueStore, MarkerStorage};
use crate::FlagError;

/// Answers whether the file behind a stored record still exists.
pub trait ExistenceCheck {
    fn exists(&self, path: &Path) -> io::Result<bool>;
}

/// Checks the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsExistence;

impl ExistenceCheck for FsExistence {
    fn exists(&self, path: &Path) -> io::Result<bool> {
        match std::fs::metadata(path) {
            Ok(_) => Ok(true),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err),
        }
    }
}

/// Removes stored records whose document no longer exists.
///
/// Created from the keys present at startup. Each key is checked at most
/// once: either lazily, right before the first load of that key, or by the
/// host calling [`Reconciler::sweep_step`] while idle. Once a key is settled
/// it is never checked again, so a record written in this session cannot be
/// removed by a stale check.
///
/// A failed existence check counts as "missing" and the record is removed.
pub struct Reconciler {
    check: Box<dyn ExistenceCheck>,
    pending: BTreeSet<String>,
}

impl fmt::Debug for Reconciler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reconciler")
            .field("pending", &self.pending)
            .finish_non_exhaustive()
    }
}

impl Reconciler {
    pub fn new(check: impl ExistenceCheck + 'static, keys: impl IntoIterator<Item = String>) -> Self {
        let pending: BTreeSet<String> = keys.into_iter().collect();
        log::debug!("{} stored flag records awaiting reconciliation", pending.len());
        Self {
            check: Box::new(check),
            pending,
        }
    }

    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    pub fn is_settled(&self, key: &str) -> bool {
        !self.pending.contains(key)
    }

    /// Take `key` out of the pending set without checking it, e.g. because
    /// the document was just saved.
    pub fn mark_settled(&mut self, key: &str) {
        self.pending.remove(key);
    }

    /// Settle `key` if it is still pending. Returns `false` when its record
    /// was removed.
    pub fn settle<S: KeyValueStore>(
        &mut self,
        storage: &mut MarkerStorage<S>,
        key: &str,
    ) -> Result<bool, FlagError> {
        if !self.pending.remove(key) {
            return Ok(true);
        }
        self.check_and_prune(storage, key)
    }

    /// Settle up to `max` pending keys. Returns how many records were removed.
    pub fn sweep_step<S: KeyValueStore>(
        &mut self,
        storage: &mut MarkerStorage<S>,
        max: usize,
    ) -> Result<usize, FlagError> {
        let batch: Vec<String> = self.pending.iter().take(max).cloned().collect();
        let mut removed = 0;
        for key in batch {
            self.pending.remove(&key);
            if !self.check_and_prune(storage, &key)? {
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Settle every pending key.
    pub fn sweep_all<S: KeyValueStore>(
        &mut self,
        storage: &mut MarkerStorage<S>,
    ) -> Result<usize, FlagError> {
        let pending = self.pending.len();
        self.sweep_step(storage, pending)
    }

    fn check_and_prune<S: KeyValueStore>(
        &self,
        storage: &mut MarkerStorage<S>,
        key: &str,
    ) -> Result<bool, FlagError> {
        let exists = match self.check.exists(Path::new(key)) {
            Ok(exists) => exists,
            Err(err) => {
                log::warn!("could not check {key}, dropping its flags: {err}");
                false
            }
        };
        if !exists {
            storage.store_mut().set(key, None)?;
            log::info!("removed stored flags for missing file {key}");
        }
        Ok(exists)
    }
}
