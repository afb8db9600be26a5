// SPDX-License-Identifier: MIT OR Apache-2.0

//! Record store trait definition.
//!
//! This module defines the `RecordStore` trait, the port every storage backend
//! implements. A store maps string keys to opaque byte values; it knows nothing
//! about configurations, versions or labels.

use crate::domain::StoreResult;

/// A key and the bytes stored under it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StoredEntry {
    /// The encoded record key
    pub key: String,
    /// The serialized record
    pub value: Vec<u8>,
}

impl StoredEntry {
    /// Creates a new entry.
    pub fn new(key: impl Into<String>, value: impl Into<Vec<u8>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A trait for key/value record stores.
///
/// All implementations must behave identically from the caller's point of view:
/// a missing key is always reported as `StoreError::NotFound`, never as an empty
/// value or a generic backend failure, and the conditional writes (`insert` and
/// `replace`) check and write atomically with respect to every other operation on
/// the same store.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; one store instance is shared by every
/// concurrent request.
///
/// # Examples
///
/// ```rust
/// use config_registry::adapters::InMemoryStore;
/// use config_registry::ports::RecordStore;
///
/// let store = InMemoryStore::new();
/// store.insert("configs/app/v1", b"{}").unwrap();
/// assert!(store.insert("configs/app/v1", b"{}").is_err());
/// assert_eq!(store.get("configs/app/v1").unwrap(), b"{}".to_vec());
/// ```
pub trait RecordStore: Send + Sync {
    /// Returns a short identifier for the backend, such as `"memory"` or `"etcd"`.
    fn name(&self) -> &str;

    /// Writes `value` under `key`, overwriting any existing value.
    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()>;

    /// Reads the value stored under `key`.
    ///
    /// # Returns
    ///
    /// * `Ok(Vec<u8>)` - The stored bytes
    /// * `Err(StoreError::NotFound)` - Nothing is stored under the key
    /// * `Err(_)` - The backend failed
    fn get(&self, key: &str) -> StoreResult<Vec<u8>>;

    /// Returns every entry whose key starts with `prefix`.
    ///
    /// Callers must not rely on the order of the returned entries.
    fn list(&self, prefix: &str) -> StoreResult<Vec<StoredEntry>>;

    /// Removes the entry under `key`.
    ///
    /// Fails with `StoreError::NotFound` if nothing is stored under the key.
    fn delete(&self, key: &str) -> StoreResult<()>;

    /// Writes `value` under `key` only if the key is absent.
    ///
    /// Fails with `StoreError::Conflict` and leaves the stored value untouched if
    /// the key already exists.
    fn insert(&self, key: &str, value: &[u8]) -> StoreResult<()>;

    /// Overwrites the value under `key` only if the key is present.
    ///
    /// Fails with `StoreError::NotFound` if the key does not exist.
    fn replace(&self, key: &str, value: &[u8]) -> StoreResult<()>;
}
