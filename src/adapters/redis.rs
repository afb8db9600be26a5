// SPDX-License-Identifier: MIT OR Apache-2.0

//! Redis record store adapter.
//!
//! This module provides a record store that keeps entries as Redis string keys.

use crate::adapters::runtime::{self, DEFAULT_REQUEST_TIMEOUT};
use crate::domain::{StoreError, StoreResult};
use crate::ports::{RecordStore, StoredEntry};
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Client};
use std::time::Duration;

const BACKEND: &str = "redis";

/// COUNT hint for each SCAN step.
const SCAN_BATCH: usize = 100;

/// Record store adapter for Redis.
///
/// Each record is one Redis string under `<namespace><key>`. `insert` maps to
/// `SET NX` and `replace` to `SET XX`, so both are atomic on the server.
///
/// # Examples
///
/// ```rust,no_run
/// use config_registry::adapters::RedisStore;
/// use config_registry::ports::RecordStore;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let store = RedisStore::connect("redis://localhost:6379", "registry:")?;
/// store.put("configs/app/v1", b"{}")?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct RedisStore {
    /// Multiplexed connection, shared by all requests
    connection: MultiplexedConnection,
    /// Key prefix
    namespace: String,
    /// Deadline for each round trip
    request_timeout: Duration,
}

impl std::fmt::Debug for RedisStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisStore")
            .field("namespace", &self.namespace)
            .field("request_timeout", &self.request_timeout)
            .finish_non_exhaustive()
    }
}

impl RedisStore {
    /// Validates namespace to prevent injection into SCAN patterns
    fn validate_namespace(namespace: &str) -> StoreResult<()> {
        if namespace.contains(['*', '?', '[', ']', '\\']) {
            return Err(StoreError::Backend {
                backend: BACKEND.to_string(),
                message: "Namespace contains invalid characters (* ? [ ] \\)".to_string(),
                source: None,
            });
        }
        Ok(())
    }

    /// Connects to Redis with the default request timeout.
    ///
    /// # Arguments
    ///
    /// * `url` - Redis connection URL (e.g., `"redis://localhost:6379"`)
    /// * `namespace` - Key prefix (e.g., `"registry:"`)
    pub fn connect(url: &str, namespace: &str) -> StoreResult<Self> {
        Self::connect_with_timeout(url, namespace, DEFAULT_REQUEST_TIMEOUT)
    }

    /// Connects to Redis with a custom request timeout.
    pub fn connect_with_timeout(
        url: &str,
        namespace: &str,
        request_timeout: Duration,
    ) -> StoreResult<Self> {
        Self::validate_namespace(namespace)?;

        let client = Client::open(url).map_err(|e| {
            StoreError::backend(BACKEND, format!("Failed to create Redis client: {}", e), e)
        })?;

        let connection = runtime::block_on(BACKEND, request_timeout, async move {
            client
                .get_multiplexed_async_connection()
                .await
                .map_err(|e| StoreError::backend(BACKEND, format!("Failed to connect to Redis: {}", e), e))
        })?;

        tracing::debug!(namespace = namespace, "Connected to Redis");

        Ok(Self {
            connection,
            namespace: namespace.to_string(),
            request_timeout,
        })
    }

    fn full_key(&self, key: &str) -> String {
        format!("{}{}", self.namespace, key)
    }

    fn run<F, T>(&self, future: F) -> StoreResult<T>
    where
        F: std::future::Future<Output = StoreResult<T>> + Send + 'static,
        T: Send + 'static,
    {
        runtime::block_on(BACKEND, self.request_timeout, future)
    }

    /// Issues `SET key value <condition>`; returns whether the write happened.
    fn set_when(&self, key: &str, value: &[u8], condition: &'static str) -> StoreResult<bool> {
        let full_key = self.full_key(key);
        let mut conn = self.connection.clone();
        let value = value.to_vec();

        self.run(async move {
            let reply: Option<String> = redis::cmd("SET")
                .arg(&full_key)
                .arg(&value)
                .arg(condition)
                .query_async(&mut conn)
                .await
                .map_err(|e| StoreError::backend(BACKEND, format!("Failed to write to Redis: {}", e), e))?;
            Ok(reply.is_some())
        })
    }

    /// One SCAN step from `cursor`, with the values of the matched keys.
    ///
    /// Uses SCAN instead of KEYS to avoid blocking the Redis server.
    fn scan_batch(
        &self,
        cursor: u64,
        pattern: String,
    ) -> StoreResult<(u64, Vec<(String, Option<Vec<u8>>)>)> {
        let mut conn = self.connection.clone();

        self.run(async move {
            let (next_cursor, raw_keys): (u64, Vec<Vec<u8>>) = redis::cmd("SCAN")
                .arg(cursor)
                .arg("MATCH")
                .arg(&pattern)
                .arg("COUNT")
                .arg(SCAN_BATCH)
                .query_async(&mut conn)
                .await
                .map_err(|e| StoreError::backend(BACKEND, format!("Failed to scan keys from Redis: {}", e), e))?;

            let mut keys = Vec::with_capacity(raw_keys.len());
            for raw_key in raw_keys {
                match String::from_utf8(raw_key) {
                    Ok(key) => keys.push(key),
                    Err(e) => tracing::warn!(error = %e, "Skipping Redis entry with a non UTF-8 key"),
                }
            }
            if keys.is_empty() {
                return Ok((next_cursor, Vec::new()));
            }

            let values: Vec<Option<Vec<u8>>> = redis::cmd("MGET")
                .arg(&keys)
                .query_async(&mut conn)
                .await
                .map_err(|e| StoreError::backend(BACKEND, format!("Failed to fetch values from Redis: {}", e), e))?;

            Ok((next_cursor, keys.into_iter().zip(values).collect()))
        })
    }
}

/// Escapes glob metacharacters so `prefix` matches literally in a SCAN pattern.
fn escape_pattern(prefix: &str) -> String {
    let mut escaped = String::with_capacity(prefix.len());
    for c in prefix.chars() {
        if matches!(c, '*' | '?' | '[' | ']' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

impl RecordStore for RedisStore {
    fn name(&self) -> &str {
        BACKEND
    }

    fn put(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        let full_key = self.full_key(key);
        let mut conn = self.connection.clone();
        let value = value.to_vec();

        self.run(async move {
            let _: () = conn
                .set(&full_key, &value)
                .await
                .map_err(|e| StoreError::backend(BACKEND, format!("Failed to write to Redis: {}", e), e))?;
            Ok(())
        })
    }

    fn get(&self, key: &str) -> StoreResult<Vec<u8>> {
        let full_key = self.full_key(key);
        let mut conn = self.connection.clone();

        let value = self.run(async move {
            let value: Option<Vec<u8>> = conn
                .get(&full_key)
                .await
                .map_err(|e| StoreError::backend(BACKEND, format!("Failed to read from Redis: {}", e), e))?;
            Ok(value)
        })?;

        value.ok_or_else(|| StoreError::NotFound {
            key: key.to_string(),
        })
    }

    /// Lists every string entry under `prefix`.
    ///
    /// Each SCAN batch is fetched with a single MGET in the same round trip.
    /// MGET answers nil for keys that vanished since the SCAN and for keys
    /// holding another Redis type, so both are skipped rather than failing the
    /// whole listing.
    fn list(&self, prefix: &str) -> StoreResult<Vec<StoredEntry>> {
        let pattern = format!("{}*", escape_pattern(&self.full_key(prefix)));
        let mut cursor: u64 = 0;
        let mut entries = Vec::new();

        loop {
            let (next_cursor, batch) = self.scan_batch(cursor, pattern.clone())?;

            for (key, value) in batch {
                let Some(value) = value else {
                    tracing::warn!(key = %key, "Skipping Redis key without a string value");
                    continue;
                };
                let key = key.strip_prefix(self.namespace.as_str()).unwrap_or(&key).to_string();
                entries.push(StoredEntry::new(key, value));
            }

            cursor = next_cursor;
            if cursor == 0 {
                break;
            }
        }
        Ok(entries)
    }

    fn delete(&self, key: &str) -> StoreResult<()> {
        let full_key = self.full_key(key);
        let mut conn = self.connection.clone();

        let removed = self.run(async move {
            let removed: i64 = conn
                .del(&full_key)
                .await
                .map_err(|e| StoreError::backend(BACKEND, format!("Failed to delete from Redis: {}", e), e))?;
            Ok(removed)
        })?;

        if removed == 0 {
            return Err(StoreError::NotFound {
                key: key.to_string(),
            });
        }
        Ok(())
    }

    fn insert(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        if self.set_when(key, value, "NX")? {
            Ok(())
        } else {
            Err(StoreError::Conflict {
                key: key.to_string(),
            })
        }
    }

    fn replace(&self, key: &str, value: &[u8]) -> StoreResult<()> {
        if self.set_when(key, value, "XX")? {
            Ok(())
        } else {
            Err(StoreError::NotFound {
                key: key.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_namespace() {
        assert!(RedisStore::validate_namespace("registry:").is_ok());
        assert!(RedisStore::validate_namespace("").is_ok());
        assert!(RedisStore::validate_namespace("reg*").is_err());
        assert!(RedisStore::validate_namespace("reg[1]").is_err());
    }

    #[test]
    fn test_escape_pattern() {
        assert_eq!(escape_pattern("registry:configs/"), "registry:configs/");
        assert_eq!(escape_pattern("a*b?c"), "a\\*b\\?c");
        assert_eq!(escape_pattern("[x]\\"), "\\[x\\]\\\\");
    }

    #[test]
    fn test_invalid_url_is_backend_error() {
        let result = RedisStore::connect("not a url", "registry:");
        assert!(matches!(result, Err(StoreError::Backend { .. })));
    }

    #[test]
    fn test_invalid_namespace_rejected_before_connecting() {
        let result = RedisStore::connect("redis://127.0.0.1:1", "bad*");
        match result {
            Err(StoreError::Backend { message, .. }) => assert!(message.contains("invalid")),
            other => panic!("unexpected result: {:?}", other.map(|_| ())),
        }
    }
}
