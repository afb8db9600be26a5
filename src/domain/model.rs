// SPDX-License-Identifier: MIT OR Apache-2.0

//! Registry entities.
//!
//! [`Configuration`] and [`ConfigurationGroup`] are the two record kinds kept by the
//! registry. Both are identified by an `(id, version)` pair and carry a free-form
//! label map used for search. The [`VersionedRecord`] trait is the common surface
//! the registry service is written against.

use crate::domain::record_key::{Namespace, RecordKey};
use crate::domain::Result;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;

/// An opaque configuration parameter.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValuePair {
    /// Parameter name
    pub key: String,
    /// Parameter value
    pub value: String,
}

impl KeyValuePair {
    /// Creates a new parameter.
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A single versioned configuration.
///
/// # Examples
///
/// ```
/// use config_registry::domain::{Configuration, KeyValuePair};
///
/// let config = Configuration::new("billing", "v1")
///     .with_label("env", "prod")
///     .with_parameter("timeout", "30");
///
/// assert_eq!(config.labels["env"], "prod");
/// assert_eq!(config.parameters, vec![KeyValuePair::new("timeout", "30")]);
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Configuration {
    /// Record id; assigned by the registry on create when empty
    #[serde(default)]
    pub id: String,
    /// Record version
    #[serde(default)]
    pub version: String,
    /// Search labels
    #[serde(default, deserialize_with = "null_as_default")]
    pub labels: HashMap<String, String>,
    /// Ordered parameters
    #[serde(default, deserialize_with = "null_as_default")]
    pub parameters: Vec<KeyValuePair>,
}

impl Configuration {
    /// Creates an empty configuration with the given identity.
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            ..Default::default()
        }
    }

    /// Adds a label.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Appends a parameter.
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.push(KeyValuePair::new(key, value));
        self
    }
}

/// A versioned group of configurations.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigurationGroup {
    /// Record id; assigned by the registry on create when empty
    #[serde(default)]
    pub id: String,
    /// Record version
    #[serde(default)]
    pub version: String,
    /// Search labels
    #[serde(default, deserialize_with = "null_as_default")]
    pub labels: HashMap<String, String>,
    /// Member configurations, in order
    #[serde(default, deserialize_with = "null_as_default")]
    pub configurations: Vec<Configuration>,
}

impl ConfigurationGroup {
    /// Creates an empty group with the given identity.
    pub fn new(id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            ..Default::default()
        }
    }

    /// Adds a label.
    pub fn with_label(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.labels.insert(key.into(), value.into());
        self
    }

    /// Appends a member configuration.
    pub fn with_configuration(mut self, configuration: Configuration) -> Self {
        self.configurations.push(configuration);
        self
    }
}

/// A record the registry can store under a versioned key.
pub trait VersionedRecord: Serialize + DeserializeOwned + Send + Sync {
    /// The namespace records of this kind live in.
    const NAMESPACE: Namespace;

    /// Returns the record id.
    fn id(&self) -> &str;

    /// Replaces the record id.
    fn set_id(&mut self, id: String);

    /// Returns the record version.
    fn version(&self) -> &str;

    /// Returns the record labels.
    fn labels(&self) -> &HashMap<String, String>;

    /// Builds the validated store key for this record.
    fn record_key(&self) -> Result<RecordKey> {
        RecordKey::new(Self::NAMESPACE, self.id(), self.version())
    }
}

impl VersionedRecord for Configuration {
    const NAMESPACE: Namespace = Namespace::Configurations;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn labels(&self) -> &HashMap<String, String> {
        &self.labels
    }
}

impl VersionedRecord for ConfigurationGroup {
    const NAMESPACE: Namespace = Namespace::Groups;

    fn id(&self) -> &str {
        &self.id
    }

    fn set_id(&mut self, id: String) {
        self.id = id;
    }

    fn version(&self) -> &str {
        &self.version
    }

    fn labels(&self) -> &HashMap<String, String> {
        &self.labels
    }
}

// Older producers write `null` for empty maps and lists.
fn null_as_default<'de, D, T>(deserializer: D) -> std::result::Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
