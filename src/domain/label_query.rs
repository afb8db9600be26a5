// SPDX-License-Identifier: MIT OR Apache-2.0

//! Label predicates for search.

use crate::domain::errors::{RegistryError, Result};
use std::collections::{BTreeMap, HashMap};

/// A non-empty set of required label values.
///
/// A record matches when its labels contain every pair of the query. A missing
/// label or a different value excludes the record.
///
/// # Examples
///
/// ```
/// use config_registry::domain::LabelQuery;
/// use std::collections::HashMap;
///
/// let query = LabelQuery::from_pairs([("env", "prod")]).unwrap();
///
/// let mut labels = HashMap::new();
/// labels.insert("env".to_string(), "prod".to_string());
/// labels.insert("region".to_string(), "eu".to_string());
/// assert!(query.matches(&labels));
///
/// assert!(LabelQuery::from_pairs(Vec::<(&str, &str)>::new()).is_err());
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LabelQuery {
    required: BTreeMap<String, String>,
}

impl LabelQuery {
    /// Builds a query from a label map, rejecting an empty map.
    pub fn new(labels: &HashMap<String, String>) -> Result<Self> {
        Self::from_pairs(labels.iter().map(|(k, v)| (k.as_str(), v.as_str())))
    }

    /// Builds a query from key/value pairs.
    ///
    /// When a key repeats, the first value wins.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut required = BTreeMap::new();
        for (key, value) in pairs {
            required.entry(key.into()).or_insert_with(|| value.into());
        }

        if required.is_empty() {
            return Err(RegistryError::InvalidQuery {
                message: "at least one label is required for search".to_string(),
            });
        }

        Ok(Self { required })
    }

    /// Returns `true` if `labels` contains every required pair.
    pub fn matches(&self, labels: &HashMap<String, String>) -> bool {
        self.required
            .iter()
            .all(|(key, value)| labels.get(key) == Some(value))
    }

    /// Returns the number of required labels.
    pub fn len(&self) -> usize {
        self.required.len()
    }

    /// Always `false`; an empty query cannot be constructed.
    pub fn is_empty(&self) -> bool {
        self.required.is_empty()
    }
}
