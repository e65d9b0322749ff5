//! Bounded in-memory store of indexed file contents.
//!
//! Entries are constructed fully before insertion and replaced atomically,
//! never mutated in place, so a reader holding a snapshot can never observe
//! a half-written entry. The indexer is the only writer; the eviction sweep
//! removes entries out-of-band.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use fnv::FnvHashMap;
use parking_lot::RwLock;
use tokio::time::Instant;

/// Hard cap on entries per store. Once full, new files are not admitted;
/// eviction happens out-of-band in the sweep task.
pub const MAX_INDEXED_FILES: usize = 5000;

/// One indexed file.
#[derive(Debug)]
pub struct IndexedFile {
    /// Stable identity (path-equivalent key).
    pub path: PathBuf,
    /// Full text as a single buffer; line boundaries are computed on demand.
    pub content: String,
    /// Byte length of `content` at index time.
    pub size_bytes: u64,
    /// When this entry was last (re)indexed.
    pub indexed_at: Instant,
}

impl IndexedFile {
    pub fn new(path: PathBuf, content: String) -> Self {
        let size_bytes = content.len() as u64;
        Self {
            path,
            content,
            size_bytes,
            indexed_at: Instant::now(),
        }
    }
}

/// Mapping from file identity to indexed content, bounded by
/// [`MAX_INDEXED_FILES`].
#[derive(Debug, Default)]
pub struct IndexStore {
    entries: RwLock<FnvHashMap<PathBuf, Arc<IndexedFile>>>,
}

impl IndexStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces an entry.
    ///
    /// Returns `false` when the store is at capacity and `file` would add a
    /// new key; the file is then not admitted. Replacing an existing key is
    /// always allowed.
    pub fn put(&self, file: IndexedFile) -> bool {
        let mut entries = self.entries.write();
        if entries.len() >= MAX_INDEXED_FILES && !entries.contains_key(&file.path) {
            return false;
        }
        entries.insert(file.path.clone(), Arc::new(file));
        true
    }

    pub fn get(&self, path: &Path) -> Option<Arc<IndexedFile>> {
        self.entries.read().get(path).cloned()
    }

    pub fn remove(&self, path: &Path) -> Option<Arc<IndexedFile>> {
        self.entries.write().remove(path)
    }

    /// Removes `entry` only if it is still the current entry for its path.
    ///
    /// Keeps an eviction sweep working from an older snapshot from removing
    /// an entry that the indexer has since replaced.
    pub fn remove_entry(&self, entry: &Arc<IndexedFile>) -> bool {
        let mut entries = self.entries.write();
        match entries.get(&entry.path) {
            Some(current) if Arc::ptr_eq(current, entry) => {
                entries.remove(&entry.path);
                true
            }
            _ => false,
        }
    }

    /// Path-ordered snapshot of the current entries.
    ///
    /// The returned sequence is restartable and independent of later store
    /// mutations; every element is a fully constructed entry.
    pub fn snapshot(&self) -> Vec<Arc<IndexedFile>> {
        let mut entries: Vec<Arc<IndexedFile>> =
            self.entries.read().values().cloned().collect();
        entries.sort_by(|a, b| a.path.cmp(&b.path));
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn clear(&self) {
        self.entries.write().clear();
    }
}
