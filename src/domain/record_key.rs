// SPDX-License-Identifier: MIT OR Apache-2.0

//! Typed composite keys for versioned records.
//!
//! Every record is addressed by its namespace, id and version. [`RecordKey`] holds
//! those three parts and owns the single, reversible string encoding used by the
//! record stores: `<namespace>/<id>/<version>`.

use crate::domain::errors::{RegistryError, Result};
use std::fmt;

/// Separator between the parts of an encoded key.
pub const KEY_SEPARATOR: char = '/';

/// The partition of the key space a record lives in.
///
/// Identities are unique only within a namespace, so a configuration and a group
/// may share the same id and version.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Namespace {
    /// Individual configurations.
    Configurations,
    /// Configuration groups.
    Groups,
}

impl Namespace {
    /// Returns the path segment used for this namespace in encoded keys.
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Configurations => "configs",
            Namespace::Groups => "groups",
        }
    }

    /// Returns the prefix shared by every encoded key in this namespace.
    ///
    /// # Examples
    ///
    /// ```
    /// use config_registry::domain::Namespace;
    ///
    /// assert_eq!(Namespace::Groups.prefix(), "groups/");
    /// ```
    pub fn prefix(&self) -> String {
        format!("{}{}", self.as_str(), KEY_SEPARATOR)
    }

    fn from_segment(segment: &str) -> Option<Self> {
        match segment {
            "configs" => Some(Namespace::Configurations),
            "groups" => Some(Namespace::Groups),
            _ => None,
        }
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The identity of a stored record.
///
/// # Examples
///
/// ```
/// use config_registry::domain::{Namespace, RecordKey};
///
/// let key = RecordKey::new(Namespace::Configurations, "billing", "v3").unwrap();
/// assert_eq!(key.encode(), "configs/billing/v3");
///
/// let parsed = RecordKey::parse("configs/billing/v3").unwrap();
/// assert_eq!(parsed, key);
/// ```
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RecordKey {
    namespace: Namespace,
    id: String,
    version: String,
}

impl RecordKey {
    /// Creates a validated key.
    ///
    /// Both `id` and `version` must be non-empty and must not contain the key
    /// separator.
    pub fn new(
        namespace: Namespace,
        id: impl Into<String>,
        version: impl Into<String>,
    ) -> Result<Self> {
        let id = id.into();
        let version = version.into();
        validate_part("id", &id)?;
        validate_part("version", &version)?;
        Ok(Self {
            namespace,
            id,
            version,
        })
    }

    /// Parses an encoded key back into its parts.
    pub fn parse(encoded: &str) -> Result<Self> {
        let mut parts = encoded.splitn(3, KEY_SEPARATOR);
        let (Some(namespace), Some(id), Some(version)) = (parts.next(), parts.next(), parts.next())
        else {
            return Err(RegistryError::invalid_input(format!(
                "key '{}' does not have the form namespace/id/version",
                encoded
            )));
        };

        let namespace = Namespace::from_segment(namespace).ok_or_else(|| {
            RegistryError::invalid_input(format!("unknown namespace '{}'", namespace))
        })?;

        Self::new(namespace, id, version)
    }

    /// Returns the namespace of the key.
    pub fn namespace(&self) -> Namespace {
        self.namespace
    }

    /// Returns the record id.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the record version.
    pub fn version(&self) -> &str {
        &self.version
    }

    /// Encodes the key as `<namespace>/<id>/<version>`.
    pub fn encode(&self) -> String {
        format!(
            "{}{sep}{}{sep}{}",
            self.namespace,
            self.id,
            self.version,
            sep = KEY_SEPARATOR
        )
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.encode())
    }
}

fn validate_part(name: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(RegistryError::invalid_input(format!("{} must not be empty", name)));
    }
    if value.contains(KEY_SEPARATOR) {
        return Err(RegistryError::invalid_input(format!(
            "{} '{}' must not contain '{}'",
            name, value, KEY_SEPARATOR
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_encode_configuration_key() {
        let key = RecordKey::new(Namespace::Configurations, "app", "v1").unwrap();
        assert_eq!(key.encode(), "configs/app/v1");
        assert_eq!(key.to_string(), "configs/app/v1");
    }

    #[test]
    fn test_encode_group_key() {
        let key = RecordKey::new(Namespace::Groups, "app", "v1").unwrap();
        assert_eq!(key.encode(), "groups/app/v1");
    }

    #[test]
    fn test_namespaces_do_not_collide() {
        let config = RecordKey::new(Namespace::Configurations, "same", "v1").unwrap();
        let group = RecordKey::new(Namespace::Groups, "same", "v1").unwrap();
        assert_ne!(config.encode(), group.encode());

        let mut set = HashSet::new();
        set.insert(config);
        set.insert(group);
        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_empty_id_rejected() {
        let result = RecordKey::new(Namespace::Configurations, "", "v1");
        assert!(matches!(result, Err(RegistryError::InvalidInput { .. })));
    }

    #[test]
    fn test_empty_version_rejected() {
        let result = RecordKey::new(Namespace::Configurations, "app", "");
        assert!(matches!(result, Err(RegistryError::InvalidInput { .. })));
    }

    #[test]
    fn test_separator_in_parts_rejected() {
        assert!(RecordKey::new(Namespace::Configurations, "a/b", "v1").is_err());
        assert!(RecordKey::new(Namespace::Groups, "a", "v1/evil").is_err());
    }

    #[test]
    fn test_parse_valid_key() {
        let key = RecordKey::parse("groups/payments/2024.1").unwrap();
        assert_eq!(key.namespace(), Namespace::Groups);
        assert_eq!(key.id(), "payments");
        assert_eq!(key.version(), "2024.1");
    }

    #[test]
    fn test_parse_rejects_unknown_namespace() {
        assert!(RecordKey::parse("widgets/a/v1").is_err());
    }

    #[test]
    fn test_parse_rejects_missing_parts() {
        assert!(RecordKey::parse("configs/a").is_err());
        assert!(RecordKey::parse("configs").is_err());
        assert!(RecordKey::parse("").is_err());
    }

    #[test]
    fn test_parse_rejects_extra_separator() {
        assert!(RecordKey::parse("configs/a/v1/extra").is_err());
    }

    #[test]
    fn test_namespace_prefix() {
        assert_eq!(Namespace::Configurations.prefix(), "configs/");
        let key = RecordKey::new(Namespace::Configurations, "x", "y").unwrap();
        assert!(key.encode().starts_with(&Namespace::Configurations.prefix()));
    }
}
