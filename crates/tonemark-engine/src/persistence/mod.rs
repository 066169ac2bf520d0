//! Durable storage for flag sets.
//!
//! Flags are kept in a string-keyed, string-valued store: the key is the
//! document path and the value is the JSON form of its [`MarkerSet`]. An
//! empty set is never written; saving one deletes the record instead.
//!
//! - [`KeyValueStore`]: the storage medium ([`MemoryStore`], [`JsonFileStore`])
//! - [`MarkerStorage`]: encodes and decodes records on top of a store
//! - [`Reconciler`]: drops records whose file has disappeared

mod file_store;
mod reconcile;

pub use file_store::JsonFileStore;
pub use reconcile::{ExistenceCheck, FsExistence, Reconciler};

use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::FlagError;
use crate::markers::{DocumentId, MarkerSet};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Store file {path} is not a JSON object of strings: {source}")]
    Format {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// A durable string-to-string mapping.
///
/// `set(key, None)` deletes the entry.
pub trait KeyValueStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&mut self, key: &str, value: Option<String>) -> Result<(), StoreError>;
    fn keys(&self) -> Result<Vec<String>, StoreError>;
}

/// In-process store, used for scratch sessions and tests.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: Option<String>) -> Result<(), StoreError> {
        match value {
            Some(value) => {
                self.entries.insert(key.to_string(), value);
            }
            None => {
                self.entries.remove(key);
            }
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        Ok(self.entries.keys().cloned().collect())
    }
}

/// Reads and writes [`MarkerSet`] records.
#[derive(Debug)]
pub struct MarkerStorage<S> {
    store: S,
}

impl<S: KeyValueStore> MarkerStorage<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub(crate) fn store_mut(&mut self) -> &mut S {
        &mut self.store
    }

    /// Load the stored flags for `document`, if any.
    pub fn load(&self, document: &DocumentId) -> Result<Option<MarkerSet>, FlagError> {
        let key = document.key();
        let Some(raw) = self.store.get(&key)? else {
            return Ok(None);
        };
        let mut set: MarkerSet = serde_json::from_str(&raw)
            .map_err(|source| FlagError::CorruptRecord { key, source })?;
        let dropped = set.normalize();
        if dropped > 0 {
            log::warn!("{document}: dropped {dropped} repeated flag lines from stored record");
        }
        Ok(Some(set))
    }

    /// Write `set` for `document`; an absent or empty set deletes the record.
    pub fn save(&mut self, document: &DocumentId, set: Option<&MarkerSet>) -> Result<(), FlagError> {
        let key = document.key();
        match set.filter(|set| !set.is_empty()) {
            Some(set) => {
                let raw = serde_json::to_string(set).map_err(|source| StoreError::Format {
                    path: PathBuf::from(&key),
                    source,
                })?;
                self.store.set(&key, Some(raw))?;
                log::debug!("{document}: stored {} flags", set.len());
            }
            None => {
                self.store.set(&key, None)?;
                log::info!("{document}: no flags left, stored record removed");
            }
        }
        Ok(())
    }

    /// Write `set` under its own document.
    pub fn save_set(&mut self, set: &MarkerSet) -> Result<(), FlagError> {
        self.save(set.document(), Some(set))
    }

    pub fn keys(&self) -> Result<Vec<String>, FlagError> {
        Ok(self.store.keys()?)
    }
}
