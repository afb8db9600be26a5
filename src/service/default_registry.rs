// SPDX-License-Identifier: MIT OR Apache-2.0

//! Default registry service implementation.
//!
//! This module provides the default implementation of the `RegistryService` trait.
//! It is written once against the `RecordStore` port and works unchanged with every
//! store adapter.

use crate::adapters::{InMemoryStore, TracingDiagnostics};
use crate::domain::{
    Configuration, ConfigurationGroup, LabelQuery, Namespace, RecordKey, RegistryError,
    RegistryService, Result, StoreError, VersionedRecord,
};
use crate::ports::{DiagnosticSink, RecordStore};
use std::collections::HashMap;
use std::sync::Arc;

/// Default implementation of the registry service.
///
/// Records are serialized as JSON and stored under their encoded [`RecordKey`].
/// The store and the diagnostic sink are injected, so several isolated registries
/// can live in one process.
///
/// # Examples
///
/// ```rust
/// use config_registry::prelude::*;
/// use std::collections::HashMap;
///
/// # fn main() -> Result<()> {
/// let registry = DefaultRegistry::builder()
///     .with_memory_store()
///     .build()?;
///
/// registry.create_configuration(Configuration::new("db", "v1").with_label("env", "prod"))?;
///
/// let mut query = HashMap::new();
/// query.insert("env".to_string(), "prod".to_string());
/// assert_eq!(registry.search_configurations(&query)?.len(), 1);
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct DefaultRegistry {
    /// Backing record store
    store: Arc<dyn RecordStore>,
    /// Receiver for records skipped during search
    diagnostics: Arc<dyn DiagnosticSink>,
}

impl std::fmt::Debug for DefaultRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultRegistry")
            .field("store", &self.store.name())
            .finish_non_exhaustive()
    }
}

impl DefaultRegistry {
    /// Creates a registry over the given store, logging skipped records via `tracing`.
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            diagnostics: Arc::new(TracingDiagnostics::new()),
        }
    }

    /// Creates a registry over a fresh in-memory store.
    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryStore::new()))
    }

    /// Creates a new registry builder.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    /// Returns the backing store.
    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    fn create_record<R: VersionedRecord>(&self, mut record: R) -> Result<R> {
        if record.id().is_empty() {
            record.set_id(uuid::Uuid::new_v4().to_string());
        }

        let key = record.record_key()?;
        let bytes = encode(&key, &record)?;

        match self.store.insert(&key.encode(), &bytes) {
            Ok(()) => {
                tracing::debug!(key = %key, store = self.store.name(), "Created record");
                Ok(record)
            }
            Err(StoreError::Conflict { .. }) => Err(RegistryError::AlreadyExists {
                id: key.id().to_string(),
                version: key.version().to_string(),
            }),
            Err(e) => Err(e.into()),
        }
    }

    fn get_record<R: VersionedRecord>(&self, id: &str, version: &str) -> Result<R> {
        let key = RecordKey::new(R::NAMESPACE, id, version)?;
        let encoded = key.encode();

        let bytes = self
            .store
            .get(&encoded)
            .map_err(|e| not_found_or_store(e, &key))?;

        serde_json::from_slice(&bytes).map_err(|source| {
            RegistryError::Store(StoreError::Corrupt {
                key: encoded,
                source,
            })
        })
    }

    fn update_record<R: VersionedRecord>(&self, record: R) -> Result<R> {
        let key = record.record_key()?;
        let bytes = encode(&key, &record)?;

        self.store
            .replace(&key.encode(), &bytes)
            .map_err(|e| not_found_or_store(e, &key))?;

        tracing::debug!(key = %key, store = self.store.name(), "Updated record");
        Ok(record)
    }

    fn delete_record(&self, namespace: Namespace, id: &str, version: &str) -> Result<()> {
        let key = RecordKey::new(namespace, id, version)?;

        self.store
            .delete(&key.encode())
            .map_err(|e| not_found_or_store(e, &key))?;

        tracing::debug!(key = %key, store = self.store.name(), "Deleted record");
        Ok(())
    }

    fn search_records<R: VersionedRecord>(&self, labels: &HashMap<String, String>) -> Result<Vec<R>> {
        let query = LabelQuery::new(labels)?;
        let entries = self.store.list(&R::NAMESPACE.prefix())?;

        let mut matches = Vec::new();
        for entry in entries {
            let record: R = match serde_json::from_slice(&entry.value) {
                Ok(record) => record,
                Err(source) => {
                    let error = StoreError::Corrupt {
                        key: entry.key.clone(),
                        source,
                    };
                    self.diagnostics.record_skipped(&entry.key, &error);
                    continue;
                }
            };

            if query.matches(record.labels()) {
                matches.push(record);
            }
        }

        tracing::debug!(
            namespace = %R::NAMESPACE,
            labels = query.len(),
            matches = matches.len(),
            "Label search finished"
        );
        Ok(matches)
    }
}

fn encode<R: VersionedRecord>(key: &RecordKey, record: &R) -> Result<Vec<u8>> {
    serde_json::to_vec(record).map_err(|source| {
        RegistryError::Store(StoreError::Corrupt {
            key: key.encode(),
            source,
        })
    })
}

fn not_found_or_store(error: StoreError, key: &RecordKey) -> RegistryError {
    if error.is_not_found() {
        RegistryError::NotFound {
            id: key.id().to_string(),
            version: key.version().to_string(),
        }
    } else {
        RegistryError::Store(error)
    }
}

impl Default for DefaultRegistry {
    fn default() -> Self {
        Self::in_memory()
    }
}

impl RegistryService for DefaultRegistry {
    fn create_configuration(&self, configuration: Configuration) -> Result<Configuration> {
        self.create_record(configuration)
    }

    fn get_configuration(&self, id: &str, version: &str) -> Result<Configuration> {
        self.get_record(id, version)
    }

    fn update_configuration(&self, configuration: Configuration) -> Result<Configuration> {
        self.update_record(configuration)
    }

    fn delete_configuration(&self, id: &str, version: &str) -> Result<()> {
        self.delete_record(Namespace::Configurations, id, version)
    }

    fn search_configurations(
        &self,
        labels: &HashMap<String, String>,
    ) -> Result<Vec<Configuration>> {
        self.search_records(labels)
    }

    fn create_group(&self, group: ConfigurationGroup) -> Result<ConfigurationGroup> {
        self.create_record(group)
    }

    fn get_group(&self, id: &str, version: &str) -> Result<ConfigurationGroup> {
        self.get_record(id, version)
    }

    fn update_group(&self, group: ConfigurationGroup) -> Result<ConfigurationGroup> {
        self.update_record(group)
    }

    fn delete_group(&self, id: &str, version: &str) -> Result<()> {
        self.delete_record(Namespace::Groups, id, version)
    }

    fn search_groups(&self, labels: &HashMap<String, String>) -> Result<Vec<ConfigurationGroup>> {
        self.search_records(labels)
    }
}

/// Builder for constructing a `DefaultRegistry`.
///
/// When no store is configured, `build` falls back to an in-memory store.
///
/// # Examples
///
/// ```rust
/// use config_registry::adapters::{InMemoryStore, TracingDiagnostics};
/// use config_registry::service::RegistryBuilder;
/// use std::sync::Arc;
///
/// # fn main() -> config_registry::domain::Result<()> {
/// let registry = RegistryBuilder::new()
///     .with_store(Arc::new(InMemoryStore::new()))
///     .with_diagnostics(Arc::new(TracingDiagnostics::new()))
///     .build()?;
/// # Ok(())
/// # }
/// ```
#[derive(Default)]
pub struct RegistryBuilder {
    store: Option<Arc<dyn RecordStore>>,
    diagnostics: Option<Arc<dyn DiagnosticSink>>,
}

impl RegistryBuilder {
    /// Creates a new builder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Uses the given record store.
    pub fn with_store(mut self, store: Arc<dyn RecordStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Uses a fresh in-memory record store.
    pub fn with_memory_store(self) -> Self {
        self.with_store(Arc::new(InMemoryStore::new()))
    }

    /// Connects to etcd and uses it as the record store.
    ///
    /// # Examples
    ///
    /// ```rust,no_run
    /// use config_registry::service::RegistryBuilder;
    ///
    /// # fn main() -> config_registry::domain::Result<()> {
    /// let registry = RegistryBuilder::new()
    ///     .with_etcd(vec!["localhost:2379"], Some("registry/"))?
    ///     .build()?;
    /// # Ok(())
    /// # }
    /// ```
    #[cfg(feature = "etcd")]
    pub fn with_etcd<S: AsRef<str>>(self, endpoints: Vec<S>, root: Option<&str>) -> Result<Self> {
        use crate::adapters::EtcdStore;
        let store = EtcdStore::connect(endpoints, root)?;
        Ok(self.with_store(Arc::new(store)))
    }

    /// Connects to Redis and uses it as the record store.
    #[cfg(feature = "redis")]
    pub fn with_redis(self, url: &str, namespace: &str) -> Result<Self> {
        use crate::adapters::RedisStore;
        let store = RedisStore::connect(url, namespace)?;
        Ok(self.with_store(Arc::new(store)))
    }

    /// Sends records skipped during search to `diagnostics`.
    pub fn with_diagnostics(mut self, diagnostics: Arc<dyn DiagnosticSink>) -> Self {
        self.diagnostics = Some(diagnostics);
        self
    }

    /// Builds the registry.
    pub fn build(self) -> Result<DefaultRegistry> {
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryStore::new()));
        let diagnostics = self
            .diagnostics
            .unwrap_or_else(|| Arc::new(TracingDiagnostics::new()));

        tracing::debug!(store = store.name(), "Built registry");
        Ok(DefaultRegistry { store, diagnostics })
    }
}
