//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use std::sync::Mutex;

use crossbeam_channel::{Receiver, Sender};
use quote_core::ids::SequentialIds;
use quote_core::storage::{COLLECTION_KEY, KeyValueStore, MemoryStorage};
use quote_core::sync::remote::RemoteSource;
use quote_core::{Quote, QuoteError, QuoteStore, Result};
use serde_json::Value;

/// Store over fresh memory storage with ids counting from 1000.
pub fn memory_store() -> (QuoteStore, MemoryStorage) {
    let storage = MemoryStorage::new();
    let store = QuoteStore::load(Box::new(storage.clone()), Box::new(SequentialIds::starting_at(1000)));
    (store, storage)
}

/// Store loaded from a pre-seeded collection blob.
pub fn seeded_store(collection: &str) -> (QuoteStore, MemoryStorage) {
    let mut storage = MemoryStorage::new();
    storage.set(COLLECTION_KEY, collection).unwrap();
    let store = QuoteStore::load(Box::new(storage.clone()), Box::new(SequentialIds::starting_at(1000)));
    (store, storage)
}

/// Remote answering every fetch with a fixed response and recording pushes.
pub struct FakeRemote {
    response: Mutex<std::result::Result<Vec<Value>, String>>,
    pub pushed: Mutex<Vec<Vec<Quote>>>,
    pub fail_push: bool,
}

impl FakeRemote {
    pub fn returning(records: Vec<Value>) -> Self {
        Self {
            response: Mutex::new(Ok(records)),
            pushed: Mutex::new(Vec::new()),
            fail_push: false,
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            response: Mutex::new(Err(message.to_string())),
            pushed: Mutex::new(Vec::new()),
            fail_push: true,
        }
    }

    pub fn set_response(&self, records: Vec<Value>) {
        *self.response.lock().unwrap() = Ok(records);
    }
}

impl RemoteSource for FakeRemote {
    fn fetch(&self) -> Result<Vec<Value>> {
        self.response
            .lock()
            .unwrap()
            .clone()
            .map_err(QuoteError::Sync)
    }

    fn push(&self, quotes: &[Quote]) -> Result<()> {
        if self.fail_push {
            return Err(QuoteError::Sync("push rejected".into()));
        }
        self.pushed.lock().unwrap().push(quotes.to_vec());
        Ok(())
    }
}

/// Remote whose fetch blocks until released, announcing when it has started.
pub struct GatedRemote {
    pub records: Vec<Value>,
    pub entered_tx: Sender<()>,
    pub release_rx: Receiver<()>,
}

impl RemoteSource for GatedRemote {
    fn fetch(&self) -> Result<Vec<Value>> {
        let _ = self.entered_tx.send(());
        self.release_rx
            .recv()
            .map_err(|e| QuoteError::Sync(e.to_string()))?;
        Ok(self.records.clone())
    }

    fn push(&self, _quotes: &[Quote]) -> Result<()> {
        Ok(())
    }
}

/// Storage whose reads always fail while writes reach `inner`.
pub struct UnreadableStorage {
    pub inner: MemoryStorage,
}

impl KeyValueStore for UnreadableStorage {
    fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(QuoteError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "permission denied",
        )))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.inner.set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<()> {
        self.inner.remove(key)
    }
}
