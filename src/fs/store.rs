//! Flat key-value persistence keyed by canonical path
//!
//! The store knows nothing about hierarchy. Keys are [`PathKey`] strings
//! kept in sorted order so prefix scans are range queries.

use crate::core::error::{KernelError, Result};
use crate::core::types::{Entry, PathKey};
use std::collections::BTreeMap;
use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Held while a caller performs a check-then-mutate sequence
pub type WriteGuard<'a> = MutexGuard<'a, ()>;

/// Lazy, finite sequence of entries in key order
pub type EntryIter<'a> = Box<dyn Iterator<Item = Entry> + Send + 'a>;

/// One write inside a [`FlatStore::commit`] batch
#[derive(Debug, Clone, PartialEq)]
pub enum StoreOp {
    Put(Entry),
    Delete(PathKey),
}

/// Contract every backing store implements
pub trait FlatStore: Send + Sync {
    /// Fetch one entry
    fn get(&self, path: &PathKey) -> Result<Entry>;

    /// Insert or replace the entry stored under `entry.path`
    fn put(&self, entry: Entry) -> Result<()>;

    /// Remove an entry, returning what was stored
    fn delete(&self, path: &PathKey) -> Result<Entry>;

    /// Entries strictly below `prefix`, ordered by path
    ///
    /// The prefix is normalised to end in exactly one `/`, so `/home`
    /// never matches `/home2/file`.
    fn scan_prefix(&self, prefix: &str) -> EntryIter<'_>;

    /// Number of stored entries, root included
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Serialises writers across every session sharing this store
    fn write_lock(&self) -> WriteGuard<'_>;

    /// Whether [`FlatStore::commit`] applies a batch all at once
    fn supports_commit(&self) -> bool {
        false
    }

    /// Apply every op or none of them; readers never see a partial batch
    fn commit(&self, _ops: &[StoreOp]) -> Result<()> {
        Err(KernelError::internal("batch commit unsupported by this store"))
    }
}

/// Normalise a scan prefix to end in exactly one `/`
pub fn normalize_prefix(prefix: &str) -> String {
    let mut normalized = prefix.trim_end_matches('/').to_string();
    normalized.push('/');
    normalized
}

/// Sorted in-memory store with optional write-through JSON snapshot
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, Entry>>,
    writer: Mutex<()>,
    snapshot: Option<PathBuf>,
}

impl MemoryStore {
    /// Empty in-memory store containing only the root directory
    pub fn new() -> Self {
        let mut entries = BTreeMap::new();
        let root = Entry::directory(PathKey::root());
        entries.insert(root.path.as_str().to_string(), root);
        Self {
            entries: RwLock::new(entries),
            writer: Mutex::new(()),
            snapshot: None,
        }
    }

    /// Open a store backed by a snapshot file, loading it when present
    pub fn open(path: &Path) -> Result<Self> {
        let mut entries = BTreeMap::new();

        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let loaded: Vec<Entry> = serde_json::from_str(&content)?;
            for entry in loaded {
                if !entry.is_well_formed() {
                    tracing::warn!(path = %entry.path, "Skipping malformed snapshot entry");
                    continue;
                }
                entries.insert(entry.path.as_str().to_string(), entry);
            }
            tracing::info!(file = %path.display(), entries = entries.len(), "Loaded store snapshot");
        }

        let root = PathKey::root();
        entries
            .entry(root.as_str().to_string())
            .or_insert_with(|| Entry::directory(root));

        let store = Self {
            entries: RwLock::new(entries),
            writer: Mutex::new(()),
            snapshot: Some(path.to_path_buf()),
        };
        store.persist(&store.read())?;
        Ok(store)
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, Entry>> {
        self.entries.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, Entry>> {
        self.entries.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Rewrite the snapshot file atomically (temp file + rename)
    fn persist(&self, entries: &BTreeMap<String, Entry>) -> Result<()> {
        let Some(path) = &self.snapshot else {
            return Ok(());
        };

        let records: Vec<&Entry> = entries.values().collect();
        let json = serde_json::to_vec_pretty(&records)?;
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, json)
            .and_then(|_| std::fs::rename(&tmp, path))
            .map_err(|e| KernelError::internal_with("snapshot write failed", e))
    }

    /// Next entry after `cursor` that lies under `prefix`
    fn next_under(&self, prefix: &str, cursor: Option<&str>) -> Option<Entry> {
        let entries = self.read();
        let lower = match cursor {
            Some(key) => Bound::Excluded(key),
            None => Bound::Included(prefix),
        };
        entries
            .range::<str, _>((lower, Bound::Unbounded))
            .find(|(key, _)| key.as_str() != prefix)
            .filter(|(key, _)| key.starts_with(prefix))
            .map(|(_, entry)| entry.clone())
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FlatStore for MemoryStore {
    fn get(&self, path: &PathKey) -> Result<Entry> {
        self.read()
            .get(path.as_str())
            .cloned()
            .ok_or_else(|| KernelError::NotFound(path.to_string()))
    }

    fn put(&self, entry: Entry) -> Result<()> {
        let key = entry.path.as_str().to_string();
        let mut entries = self.write();
        let previous = entries.insert(key.clone(), entry);

        if let Err(e) = self.persist(&entries) {
            match previous {
                Some(prev) => entries.insert(key, prev),
                None => entries.remove(&key),
            };
            return Err(e);
        }
        Ok(())
    }

    fn delete(&self, path: &PathKey) -> Result<Entry> {
        let mut entries = self.write();
        let removed = entries
            .remove(path.as_str())
            .ok_or_else(|| KernelError::NotFound(path.to_string()))?;

        if let Err(e) = self.persist(&entries) {
            entries.insert(path.as_str().to_string(), removed);
            return Err(e);
        }
        Ok(removed)
    }

    fn scan_prefix(&self, prefix: &str) -> EntryIter<'_> {
        Box::new(PrefixScan {
            store: self,
            prefix: normalize_prefix(prefix),
            cursor: None,
            done: false,
        })
    }

    fn len(&self) -> usize {
        self.read().len()
    }

    fn write_lock(&self) -> WriteGuard<'_> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn supports_commit(&self) -> bool {
        true
    }

    fn commit(&self, ops: &[StoreOp]) -> Result<()> {
        let mut entries = self.write();

        // Every delete must hit before anything changes
        for op in ops {
            if let StoreOp::Delete(path) = op {
                if !entries.contains_key(path.as_str()) {
                    return Err(KernelError::NotFound(path.to_string()));
                }
            }
        }

        let mut previous: Vec<(String, Option<Entry>)> = Vec::with_capacity(ops.len());
        for op in ops {
            match op {
                StoreOp::Put(entry) => {
                    let key = entry.path.as_str().to_string();
                    let prev = entries.insert(key.clone(), entry.clone());
                    previous.push((key, prev));
                }
                StoreOp::Delete(path) => {
                    let key = path.as_str().to_string();
                    let prev = entries.remove(&key);
                    previous.push((key, prev));
                }
            }
        }

        if let Err(e) = self.persist(&entries) {
            for (key, prev) in previous.into_iter().rev() {
                match prev {
                    Some(entry) => entries.insert(key, entry),
                    None => entries.remove(&key),
                };
            }
            return Err(e);
        }
        Ok(())
    }
}

/// Cursor-based scan; each step re-enters the map, so no lock is held
/// between items
struct PrefixScan<'a> {
    store: &'a MemoryStore,
    prefix: String,
    cursor: Option<String>,
    done: bool,
}

impl Iterator for PrefixScan<'_> {
    type Item = Entry;

    fn next(&mut self) -> Option<Entry> {
        if self.done {
            return None;
        }
        match self.store.next_under(&self.prefix, self.cursor.as_deref()) {
            Some(entry) => {
                self.cursor = Some(entry.path.as_str().to_string());
                Some(entry)
            }
            None => {
                self.done = true;
                None
            }
        }
    }
}
