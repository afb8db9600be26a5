// SPDX-License-Identifier: MIT OR Apache-2.0

//! A versioned configuration registry with pluggable storage backends.
//!
//! The registry stores two kinds of records, configurations and configuration
//! groups, each identified by an `(id, version)` pair and carrying a set of
//! labels used for search. Records live in a key-value store behind a single
//! port, so the same registry logic runs over an in-memory map, etcd or Redis.
//!
//! # Architecture
//!
//! The crate follows hexagonal architecture principles:
//!
//! - **Domain Layer**: Records, keys, label queries, errors and the `RegistryService` contract
//! - **Ports**: Trait definitions for the outside world (`RecordStore`, `DiagnosticSink`)
//! - **Adapters**: Store implementations (memory, etcd, Redis) and diagnostics
//! - **Service**: The registry that maps operations onto a record store
//! - **Server**: The HTTP transport, admission limiter and settings (feature `server`)
//!
//! # Feature Flags
//!
//! - `server`: HTTP server, layered settings and the `config-registry` binary (default)
//! - `etcd`: Enable the etcd record store
//! - `redis`: Enable the Redis record store
//! - `remote`: Enable all remote stores (etcd + redis)
//! - `full`: Enable all features
//!
//! # Quick Start
//!
//! ```rust
//! use config_registry::prelude::*;
//! use std::collections::HashMap;
//!
//! # fn main() -> std::result::Result<(), Box<dyn std::error::Error>> {
//! let registry = DefaultRegistry::in_memory();
//!
//! let created = registry.create_configuration(
//!     Configuration::new("", "v1")
//!         .with_label("env", "prod")
//!         .with_parameter("timeout", "30"),
//! )?;
//!
//! let mut query = HashMap::new();
//! query.insert("env".to_string(), "prod".to_string());
//! let found = registry.search_configurations(&query)?;
//! assert_eq!(found, vec![created]);
//! # Ok(())
//! # }
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![warn(clippy::all)]

pub mod adapters;
pub mod domain;
pub mod ports;
#[cfg(feature = "server")]
pub mod server;
pub mod service;

/// Commonly used types and traits.
///
/// This module re-exports the most commonly used types and traits for convenient access.
pub mod prelude {
    pub use crate::domain::{
        Configuration, ConfigurationGroup, KeyValuePair, RegistryError, RegistryService, Result,
        StoreError,
    };
    pub use crate::ports::{DiagnosticSink, RecordStore};
    pub use crate::service::{DefaultRegistry, RegistryBuilder};

    pub use crate::adapters::{InMemoryStore, TracingDiagnostics};
    // Re-export adapters based on feature flags
    #[cfg(feature = "etcd")]
    pub use crate::adapters::EtcdStore;
    #[cfg(feature = "redis")]
    pub use crate::adapters::RedisStore;
}
