// SPDX-License-Identifier: MIT OR Apache-2.0

//! etcd record store adapter.
//!
//! This module provides a record store that keeps entries in an etcd cluster.

use crate::adapters::runtime::{self, DEFAULT_REQUEST_TIMEOUT};
use crate::domain::{StoreError, StoreResult};
use crate::ports::{RecordStore, StoredEntry};
use etcd_client::{Client, Compare, CompareOp, ConnectOptions, GetOptions, Txn, TxnOp};
use std::time::Duration;

const BACKEND: &str = "etcd";

/// Record store adapter for etcd.
///
/// Every key is stored under an optional root prefix so several registries can
/// share one cluster. Conditional writes use etcd transactions, which makes
/// `insert` and `replace` atomic against concurrent writers on other nodes.
///
/// # Examples
///
/// ```rust,no_run
/// use config_registry::adapters::EtcdStore;
/// use config_registry::ports::RecordStore;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = EtcdStore::connect(vec!["localhost:2379"], Some("registry/"))?;
/// store.put("configs/app/v1", b"{}")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct EtcdStore {
    /// etcd client
    client: Client,
    /// Key prefix for namespacing
    root: String,
    /// Deadline for each round trip
    request_timeout: Duration,
}

impl std::fmt::Debug for EtcdStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EtcdStore")
            .field("root", &self.root)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl EtcdStore {
    /// Connects to etcd with the default request timeout.
    ///
    /// # Arguments
    ///
    /// * `endpoints` - List of etcd endpoints (e.g., `["localhost:2379"]`)
    /// * `root` - Optional key prefix for namespacing (e.g., `"registry/"`)
    pub fn connect<S: AsRef<str>>(endpoints: Vec<S>, root: Option<&str>) -> StoreResult<Self> {
        Self::connect_with_timeout(endpoints, root, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Connects to etcd with a custom request timeout.
    ///
    /// The timeout bounds connection setup as well as every later request.
    pub fn connect_with_timeout<S: AsRef<str>>(
        endpoints: Vec<S>,
        root: Option<&str>,
        request_timeout: Duration,
    ) -> StoreResult<Self> {
        let endpoints: Vec<String> = endpoints.iter().map(|s| s.as_ref().to_string()).collect();
        let options = ConnectOptions::new()
            .with_connect_timeout(request_timeout)
            .with_timeout(request_timeout);

        let client = runtime::block_on(BACKEND, request_timeout, async move {
            Client::connect(&endpoints, Some(options))
                .await
                .map_err(|e| StoreError::backend(BACKEND, format!("Failed to connect to etcd: {}", e), e))
        })?;

        tracing::debug!(root = root.unwrap_or(""), "Connected to etcd");

        Ok(Self {
            client,
            root: root.unwrap_or("").to_string(),
            request_timeout,
        })
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.root, key)
    }

    fn run<F, T>(&self, future: F) -> StoreResult<T>
    where
        F: std::future::Future<Output = StoreResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        runtime::block_on(BACKEND, self.request_timeout, future)
    }

    /// Writes `value` under `key` if `compare` holds; returns whether it did.
    fn put_when(&self, key: &str, value: &[u8], compare: Compare) -> StoreResult<bool> {
        let full_key = self.full_key(key);
        let mut client = self.client.clone();
        let txn = Txn::new()
            .when(vec![compare])
            .and_then(vec![TxnOp::put(full_key, value.to_vec(), None)]);

        self.run(async move {
            let response = client
                .txn(txn)
                .await
                .map_err(|e| StoreError::backend(BACKEND, format!("Transaction failed: {}", e), e))?;
            Ok(response.succeeded())
        })
    }
}

impl RecordStore for EtcdStore {
    fn name(&self) -> &str {
        BACKEND
    }

    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        let full_key = self.full_key(key);
        let mut client = self.client.clone();
        let value = value.to_vec();

        self.run(async move {
            client
                .put(full_key, value, None)
                .await
                .map_err(|e| StoreError::backend(BACKEND, format!("Failed to write to etcd: {}", e), e))?;
            Ok(())
        })
    }

    fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        let full_key = self.full_key(key);
        let mut client = self.client.clone();

        let value = self.run(async move {
            let response = client
                .get(full_key, None)
                .await
                .map_err(|e| StoreError::backend(BACKEND, format!("Failed to read from etcd: {}", e), e))?;
            Ok(response.kvs().first().map(|kv| kv.value().to_vec()))
        })?;

        value.ok_or_else(|| StoreError::NotFound {
            key: key.to_string(),
        })
    }

    fn list(&self, prefix: &str) -> StoreResult<Vec<StoredEntry>> {
        let full_prefix = self.full_key(prefix);
        let mut client = self.client.clone();
        let root = self.root.clone();

        self.run(async move {
            let options = GetOptions::new().with_prefix();
            let response = client
                .get(full_prefix, Some(options))
                .await
                .map_err(|e| StoreError::backend(BACKEND, format!("Failed to list keys from etcd: {}", e), e))?;

            let mut entries = Vec::with_capacity(response.kvs().len());
            for kv in response.kvs() {
                let key = match kv.key_str() {
                    Ok(key) => key,
                    Err(e) => {
                        tracing::warn!(error = %e, "Skipping etcd entry with a non UTF-8 key");
                        continue;
                    }
                };
                // Strip root prefix from key
                let key = key.strip_prefix(root.as_str()).unwrap_or(key);
                entries.push(StoredEntry::new(key, kv.value().to_vec()));
            }
            Ok(entries)
        })
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        let full_key = self.full_key(key);
        let mut client = self.client.clone();

        let deleted = self.run(async move {
            let response = client
                .delete(full_key, None)
                .await
                .map_err(|e| StoreError::backend(BACKEND, format!("Failed to delete from etcd: {}", e), e))?;
            Ok(response.deleted())
        })?;

        if deleted == 0 {
            return Err(StoreError::NotFound {
                key: key.to_string(),
            });
        }
        Ok(())
    }

    fn insert(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        let absent = Compare::create_revision(self.full_key(key), CompareOp::Equal, 0);
        if self.put_when(key, value, absent)? {
            Ok(())
        } else {
            Err(StoreError::Conflict {
                key: key.to_string(),
            })
        }
    }

    fn replace(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        let present = Compare::version(self.full_key(key), CompareOp::Greater, 0);
        if self.put_when(key, value, present)? {
            Ok(())
        } else {
            Err(StoreError::NotFound {
                key: key.to_string(),
            })
        }
    }
}
