// SPDX-License-Identifier: MIT OR Apache-2.0

//! Registry service trait definition.
//!
//! This module defines the `RegistryService` trait, the operation contract the
//! transport layer (or any other caller) uses to manage configurations and
//! configuration groups. Operations are symmetric across the two namespaces.

use crate::domain::{Configuration, ConfigurationGroup, Result};
use std::collections::HashMap;

/// The registry operation contract.
///
/// Each record is either absent or present. `create_*` moves a record from absent
/// to present, `update_*` replaces a present record, `delete_*` makes it absent
/// again, and `get_*`/`search_*` never change state. Operations on a record in the
/// wrong state fail instead of silently succeeding.
///
/// # Examples
///
/// ```rust
/// use config_registry::domain::{Configuration, RegistryService};
/// use config_registry::service::DefaultRegistry;
///
/// # fn main() -> config_registry::domain::Result<()> {
/// let registry = DefaultRegistry::in_memory();
///
/// let created = registry.create_configuration(
///     Configuration::new("", "v1").with_label("env", "prod"),
/// )?;
/// assert!(!created.id.is_empty());
///
/// let fetched = registry.get_configuration(&created.id, "v1")?;
/// assert_eq!(fetched, created);
/// # Ok(())
/// # }
/// ```
pub trait RegistryService: Send + Sync {
    /// Stores a new configuration.
    ///
    /// An empty `id` is replaced with a generated unique id. Fails with
    /// `AlreadyExists` if the `(id, version)` is taken; the stored record is left
    /// untouched in that case.
    fn create_configuration(&self, configuration: Configuration) -> Result<Configuration>;

    /// Fetches a configuration by identity.
    fn get_configuration(&self, id: &str, version: &str) -> Result<Configuration>;

    /// Replaces an existing configuration with `configuration`.
    ///
    /// The record's own id and version select the target. Fails with `NotFound`
    /// rather than creating a missing record.
    fn update_configuration(&self, configuration: Configuration) -> Result<Configuration>;

    /// Removes a configuration. Fails with `NotFound` if it does not exist.
    fn delete_configuration(&self, id: &str, version: &str) -> Result<()>;

    /// Returns every configuration whose labels contain all of `labels`.
    ///
    /// An empty `labels` map is rejected with `InvalidQuery`.
    fn search_configurations(&self, labels: &HashMap<String, String>)
        -> Result<Vec<Configuration>>;

    /// Stores a new configuration group. See [`create_configuration`](Self::create_configuration).
    fn create_group(&self, group: ConfigurationGroup) -> Result<ConfigurationGroup>;

    /// Fetches a configuration group by identity.
    fn get_group(&self, id: &str, version: &str) -> Result<ConfigurationGroup>;

    /// Replaces an existing configuration group.
    fn update_group(&self, group: ConfigurationGroup) -> Result<ConfigurationGroup>;

    /// Removes a configuration group.
    fn delete_group(&self, id: &str, version: &str) -> Result<()>;

    /// Returns every group whose labels contain all of `labels`.
    fn search_groups(&self, labels: &HashMap<String, String>) -> Result<Vec<ConfigurationGroup>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_service_is_object_safe() {
        fn assert_send_sync<T: Send + Sync + ?Sized>() {}
        assert_send_sync::<dyn RegistryService>();
    }
}
