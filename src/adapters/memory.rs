// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory record store adapter.
//!
//! This module provides a record store that keeps every entry in a process-local
//! map. Nothing survives a restart.

use crate::domain::{StoreError, StoreResult};
use crate::ports::{RecordStore, StoredEntry};
use std::collections::BTreeMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Record store backed by an in-process map.
///
/// All operations, across both namespaces, go through a single `RwLock`. The
/// conditional writes hold the write lock for their check and their write, so of
/// two racing `insert` calls on one key exactly one succeeds and the other sees
/// `StoreError::Conflict`.
///
/// Listing returns entries sorted by key.
///
/// # Examples
///
/// ```rust
/// use config_registry::adapters::InMemoryStore;
/// use config_registry::ports::RecordStore;
///
/// let store = InMemoryStore::new();
/// store.put("configs/a/v1", b"first").unwrap();
/// store.put("configs/b/v1", b"second").unwrap();
///
/// let entries = store.list("configs/").unwrap();
/// assert_eq!(entries.len(), 2);
/// assert_eq!(entries[0].key, "configs/a/v1");
/// ```
#[derive(Debug, Default)]
pub struct InMemoryStore {
    /// Stored entries keyed by encoded record key
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl InMemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored entries.
    ///
    /// Fails like every other operation once a writer has poisoned the lock.
    pub fn len(&self) -> StoreResult<usize> {
        Ok(self.read()?.len())
    }

    /// Returns `true` if the store holds no entries.
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.read()?.is_empty())
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, BTreeMap<String, Vec<u8>>>> {
        self.entries.read().map_err(|_| poisoned())
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, BTreeMap<String, Vec<u8>>>> {
        self.entries.write().map_err(|_| poisoned())
    }
}

fn poisoned() -> StoreError {
    StoreError::Backend {
        backend: "memory".to_string(),
        message: "store lock poisoned by a panicked writer".to_string(),
        source: None,
    }
}

fn not_found(key: &str) -> StoreError {
    StoreError::NotFound {
        key: key.to_string(),
    }
}

impl RecordStore for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        self.write()?.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        self.read()?.get(key).cloned().ok_or_else(|| not_found(key))
    }

    fn list(&self, prefix: &str) -> StoreResult<Vec<StoredEntry>> {
        let entries = self.read()?;
        Ok(entries
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(key, value)| StoredEntry::new(key.clone(), value.clone()))
            .collect())
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        self.write()?
            .remove(key)
            .map(|_| ())
            .ok_or_else(|| not_found(key))
    }

    fn insert(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        let mut entries = self.write()?;
        if entries.contains_key(key) {
            return Err(StoreError::Conflict {
                key: key.to_string(),
            });
        }
        entries.insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn replace(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        let mut entries = self.write()?;
        let existing = entries.get_mut(key).ok_or_else(|| not_found(key))?;
        *existing = value.to_vec();
        Ok(())
    }
}
