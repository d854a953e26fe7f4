//! Key-value storage collaborators.
//!
//! The store only needs `get`/`set`/`remove` on string values. Two backends are
//! provided:
//!
//! - `MemoryStorage` — a shared in-process map with an optional byte quota, used for the
//!   session namespace and in tests.
//! - `FileStorage` — one file per key under a directory, used by the CLI.
//!
//! Write failures are always surfaced as `QuoteError::Persistence` so callers can warn
//! the user that nothing was saved.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use log::debug;

use crate::error::QuoteError;
use crate::result::Result;

/// Storage key of the persisted collection.
pub const COLLECTION_KEY: &str = "dynamic_quotes_v1";
/// Storage key of the persisted category filter.
pub const CATEGORY_KEY: &str = "dynamic_quotes_category_v1";
/// Session key of the last displayed quote.
pub const LAST_VIEWED_KEY: &str = "dynamic_quotes_last_viewed_v1";

/// Minimal key-value contract used by the store.
pub trait KeyValueStore: Send {
    /// Read the value stored under `key`; `Ok(None)` when the key is absent.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Store `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;

    /// Delete `key`. Removing an absent key is not an error.
    fn remove(&mut self, key: &str) -> Result<()>;
}

#[derive(Debug, Default)]
struct MemoryInner {
    entries: HashMap<String, String>,
    quota: Option<usize>,
}

/// In-process storage. Clones share the same entries and quota.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryStorage {
    /// Create an unbounded in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store that rejects writes once the total size of all values would
    /// exceed `max_bytes`.
    pub fn with_quota(max_bytes: usize) -> Self {
        let storage = Self::default();
        storage.set_quota(Some(max_bytes));
        storage
    }

    /// Change the quota seen by every clone; `None` removes the limit.
    pub fn set_quota(&self, max_bytes: Option<usize>) {
        if let Ok(mut inner) = self.inner.lock() {
            inner.quota = max_bytes;
        }
    }

    /// Raw read used by tests and diagnostics; ignores poisoning.
    pub fn peek(&self, key: &str) -> Option<String> {
        self.inner
            .lock()
            .map(|inner| inner.entries.get(key).cloned())
            .unwrap_or(None)
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.inner.lock()?.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let mut inner = self.inner.lock()?;
        if let Some(max_bytes) = inner.quota {
            let others: usize = inner
                .entries
                .iter()
                .filter(|(k, _)| k.as_str() != key)
                .map(|(_, v)| v.len())
                .sum();
            if others + value.len() > max_bytes {
                return Err(QuoteError::Persistence(format!(
                    "storage quota of {} bytes exceeded while writing '{}'",
                    max_bytes, key
                )));
            }
        }
        inner.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.inner.lock()?.entries.remove(key);
        Ok(())
    }
}

/// Directory-backed storage: every key is a file named after it.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Use `dir` as the storage root. The directory is created lazily on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Root directory of this store.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key)
    }
}

impl KeyValueStore for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(QuoteError::Io(e)),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        fs::create_dir_all(&self.dir)
            .and_then(|_| fs::write(&path, value))
            .map_err(|e| QuoteError::Persistence(format!("failed to write {}: {}", path.display(), e)))?;
        debug!("Wrote {} bytes to {}", value.len(), path.display());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(QuoteError::Persistence(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_clones_share_entries() {
        let mut storage = MemoryStorage::new();
        let observer = storage.clone();
        storage.set("k", "v").unwrap();
        assert_eq!(observer.get("k").unwrap().as_deref(), Some("v"));
        storage.remove("k").unwrap();
        assert_eq!(observer.peek("k"), None);
    }

    #[test]
    fn memory_quota_rejects_oversized_writes() {
        let mut storage = MemoryStorage::with_quota(8);
        storage.set("a", "1234").unwrap();
        storage.set("a", "12345678").unwrap();
        let err = storage.set("b", "x").unwrap_err();
        assert!(matches!(err, QuoteError::Persistence(_)));
        assert_eq!(storage.peek("b"), None);
    }

    #[test]
    fn file_storage_roundtrip_and_absent_keys() {
        let dir = tempfile::tempdir().unwrap();
        let mut storage = FileStorage::new(dir.path().join("nested"));
        assert_eq!(storage.get(COLLECTION_KEY).unwrap(), None);

        storage.set(COLLECTION_KEY, "[]").unwrap();
        assert_eq!(storage.get(COLLECTION_KEY).unwrap().as_deref(), Some("[]"));

        storage.remove(COLLECTION_KEY).unwrap();
        storage.remove(COLLECTION_KEY).unwrap();
        assert_eq!(storage.get(COLLECTION_KEY).unwrap(), None);
    }

    #[test]
    fn file_storage_write_failure_is_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "file, not a directory").unwrap();
        let mut storage = FileStorage::new(&blocker);
        assert!(matches!(storage.set("k", "v"), Err(QuoteError::Persistence(_))));
    }
}
