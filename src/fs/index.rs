//! Hierarchy derived from path prefixes
//!
//! No tree is stored anywhere. Children, existence and parent links are
//! computed from the flat store's keyspace, and every mutation that must
//! check before writing runs under the store's writer lock.

use crate::core::error::{KernelError, Result};
use crate::core::types::{Entry, PathKey};
use crate::fs::store::{normalize_prefix, EntryIter, FlatStore, StoreOp};

/// Read-side hierarchy logic plus the guarded mutations built on it
pub struct PathIndex<'a> {
    store: &'a dyn FlatStore,
}

impl<'a> PathIndex<'a> {
    pub fn new(store: &'a dyn FlatStore) -> Self {
        Self { store }
    }

    pub fn exists(&self, path: &PathKey) -> bool {
        self.store.get(path).is_ok()
    }

    pub fn is_directory(&self, path: &PathKey) -> bool {
        self.store.get(path).map(|e| e.is_directory()).unwrap_or(false)
    }

    /// Root has no parent
    pub fn parent_of(&self, path: &PathKey) -> Option<PathKey> {
        path.parent()
    }

    /// Direct children in lexicographic order
    pub fn children_of(&self, path: &PathKey) -> EntryIter<'a> {
        let prefix = normalize_prefix(path.as_str());
        let offset = prefix.len();
        Box::new(
            self.store
                .scan_prefix(path.as_str())
                .filter(move |entry| !entry.path.as_str()[offset..].contains('/')),
        )
    }

    pub fn lookup(&self, path: &PathKey) -> Result<Entry> {
        self.store.get(path)
    }

    /// Entries directly inside a directory
    pub fn list_dir(&self, path: &PathKey) -> Result<Vec<Entry>> {
        let entry = self.store.get(path)?;
        if !entry.is_directory() {
            return Err(KernelError::NotADirectory(path.to_string()));
        }
        Ok(self.children_of(path).collect())
    }

    fn require_parent_dir(&self, path: &PathKey) -> Result<()> {
        let parent = self
            .parent_of(path)
            .ok_or_else(|| KernelError::AlreadyExists(path.to_string()))?;
        if self.is_directory(&parent) {
            Ok(())
        } else {
            Err(KernelError::ParentNotFound(parent.to_string()))
        }
    }

    pub fn make_dir(&self, path: &PathKey) -> Result<()> {
        let _guard = self.store.write_lock();

        if self.exists(path) {
            return Err(KernelError::AlreadyExists(path.to_string()));
        }
        self.require_parent_dir(path)?;
        self.store.put(Entry::directory(path.clone()))?;
        tracing::debug!(path = %path, "Directory created");
        Ok(())
    }

    pub fn remove_dir(&self, path: &PathKey) -> Result<()> {
        let _guard = self.store.write_lock();

        if path.is_root() {
            return Err(KernelError::InvalidParams("cannot remove root".into()));
        }
        let entry = self.store.get(path)?;
        if !entry.is_directory() {
            return Err(KernelError::NotADirectory(path.to_string()));
        }
        if self.children_of(path).next().is_some() {
            return Err(KernelError::DirectoryNotEmpty(path.to_string()));
        }
        self.store.delete(path)?;
        tracing::debug!(path = %path, "Directory removed");
        Ok(())
    }

    /// Remove a directory or file together with everything below it
    ///
    /// Deepest entries go first, so a failure part-way leaves no orphans.
    pub fn remove_tree(&self, path: &PathKey) -> Result<usize> {
        let _guard = self.store.write_lock();

        if path.is_root() {
            return Err(KernelError::InvalidParams("cannot remove root".into()));
        }
        let entry = self.store.get(path)?;

        let mut doomed: Vec<PathKey> = if entry.is_directory() {
            self.store.scan_prefix(path.as_str()).map(|e| e.path).collect()
        } else {
            Vec::new()
        };
        doomed.push(path.clone());
        doomed.sort_by_key(|p| std::cmp::Reverse(p.as_str().matches('/').count()));

        for victim in &doomed {
            self.store.delete(victim)?;
        }
        tracing::debug!(path = %path, removed = doomed.len(), "Tree removed");
        Ok(doomed.len())
    }

    pub fn read_file(&self, path: &PathKey) -> Result<Vec<u8>> {
        let entry = self.store.get(path)?;
        match entry.payload {
            Some(bytes) if !entry.is_directory() => Ok(bytes),
            _ => Err(KernelError::IsADirectory(path.to_string())),
        }
    }

    /// Create or overwrite a file
    pub fn write_file(&self, path: &PathKey, bytes: Vec<u8>) -> Result<()> {
        let _guard = self.store.write_lock();

        let entry = match self.store.get(path) {
            Ok(existing) if existing.is_directory() => {
                return Err(KernelError::IsADirectory(path.to_string()));
            }
            Ok(existing) => existing.with_payload(bytes),
            Err(KernelError::NotFound(_)) => {
                self.require_parent_dir(path)?;
                Entry::file(path.clone(), bytes)
            }
            Err(e) => return Err(e),
        };
        self.store.put(entry)
    }

    pub fn remove_file(&self, path: &PathKey) -> Result<()> {
        let _guard = self.store.write_lock();

        let entry = self.store.get(path)?;
        if entry.is_directory() {
            return Err(KernelError::IsADirectory(path.to_string()));
        }
        self.store.delete(path)?;
        Ok(())
    }

    /// Move an entry (and, for directories, its whole subtree) to a new key
    ///
    /// Stores with batch support apply the move as one commit. Otherwise new
    /// keys are written first and old keys deleted second; if either half
    /// fails the completed part is undone and `RenameFailed` is returned.
    pub fn rename(&self, old: &PathKey, new: &PathKey) -> Result<()> {
        let _guard = self.store.write_lock();

        if old.is_root() {
            return Err(KernelError::InvalidParams("cannot rename root".into()));
        }
        let source = self.store.get(old)?;
        if self.exists(new) {
            return Err(KernelError::AlreadyExists(new.to_string()));
        }
        self.require_parent_dir(new)?;
        if source.is_directory() && new.is_descendant_of(old) {
            return Err(KernelError::RenameFailed(format!(
                "cannot move {} into itself",
                old
            )));
        }

        let mut moving = vec![source];
        if moving[0].is_directory() {
            moving.extend(self.store.scan_prefix(old.as_str()));
        }
        let targets = moving
            .iter()
            .map(|e| -> Result<Entry> { Ok(e.moved_to(e.path.rebase(old, new)?)) })
            .collect::<Result<Vec<Entry>>>()?;

        if self.store.supports_commit() {
            let mut ops: Vec<StoreOp> = targets.iter().cloned().map(StoreOp::Put).collect();
            ops.extend(moving.iter().rev().map(|e| StoreOp::Delete(e.path.clone())));
            self.store.commit(&ops).map_err(|e| {
                KernelError::RenameFailed(format!("{} -> {}: {}", old, new, e))
            })?;
            tracing::debug!(from = %old, to = %new, entries = targets.len(), "Renamed in one commit");
            return Ok(());
        }

        let mut written: Vec<PathKey> = Vec::with_capacity(targets.len());
        for target in &targets {
            if let Err(e) = self.store.put(target.clone()) {
                self.undo(&written, &[]);
                return Err(KernelError::RenameFailed(format!(
                    "{} -> {}: {}",
                    old, new, e
                )));
            }
            written.push(target.path.clone());
        }

        // Children before parents so a partial delete never orphans anything
        let mut deleted: Vec<Entry> = Vec::with_capacity(moving.len());
        for source in moving.iter().rev() {
            if let Err(e) = self.store.delete(&source.path) {
                self.undo(&written, &deleted);
                return Err(KernelError::RenameFailed(format!(
                    "{} -> {}: {}",
                    old, new, e
                )));
            }
            deleted.push(source.clone());
        }

        tracing::debug!(from = %old, to = %new, entries = targets.len(), "Renamed");
        Ok(())
    }

    /// Compensating rollback for a failed rename
    fn undo(&self, written: &[PathKey], deleted: &[Entry]) {
        tracing::warn!(
            written = written.len(),
            deleted = deleted.len(),
            "Rolling back partial rename"
        );
        for entry in deleted.iter().rev() {
            if let Err(e) = self.store.put(entry.clone()) {
                tracing::error!(path = %entry.path, error = %e, "Rollback could not restore source");
            }
        }
        for path in written.iter().rev() {
            if let Err(e) = self.store.delete(path) {
                tracing::error!(path = %path, error = %e, "Rollback could not remove destination");
            }
        }
    }
}
