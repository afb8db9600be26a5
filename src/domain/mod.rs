// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain layer containing core business logic and types.
//!
//! This module contains the entities, the versioned key scheme, the label search
//! predicate and the error taxonomy. It is independent of any storage backend or
//! transport.

pub mod errors;
pub mod label_query;
pub mod model;
pub mod record_key;
pub mod service;

// Re-export commonly used types
pub use errors::{RegistryError, Result, StoreError, StoreResult};
pub use label_query::LabelQuery;
pub use model::{Configuration, ConfigurationGroup, KeyValuePair, VersionedRecord};
pub use record_key::{Namespace, RecordKey};
pub use service::RegistryService;
