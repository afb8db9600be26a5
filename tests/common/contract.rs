// SPDX-License-Identifier: MIT OR Apache-2.0

//! Behaviour every `RecordStore` adapter and every registry built on one must show.

use config_registry::domain::{
    Configuration, ConfigurationGroup, RegistryError, RegistryService, StoreError,
};
use config_registry::ports::RecordStore;
use std::collections::HashMap;
use std::sync::{Arc, Barrier};

fn labels(pairs: &[(&str, &str)]) -> HashMap<String, String> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

/// Exercises the raw store primitives.
pub fn store_contract(store: &dyn RecordStore) {
    // get/delete/replace on a missing key
    assert!(matches!(store.get("configs/a/v1"), Err(StoreError::NotFound { .. })));
    assert!(matches!(store.delete("configs/a/v1"), Err(StoreError::NotFound { .. })));
    assert!(matches!(
        store.replace("configs/a/v1", b"x"),
        Err(StoreError::NotFound { .. })
    ));
    assert!(matches!(store.get("configs/a/v1"), Err(StoreError::NotFound { .. })));

    // insert only when absent
    store.insert("configs/a/v1", b"first").unwrap();
    assert!(matches!(
        store.insert("configs/a/v1", b"second"),
        Err(StoreError::Conflict { .. })
    ));
    assert_eq!(store.get("configs/a/v1").unwrap(), b"first");

    // replace only when present
    store.replace("configs/a/v1", b"replaced").unwrap();
    assert_eq!(store.get("configs/a/v1").unwrap(), b"replaced");

    // put overwrites unconditionally
    store.put("configs/a/v1", b"put").unwrap();
    assert_eq!(store.get("configs/a/v1").unwrap(), b"put");

    // list is restricted to the prefix and strips nothing from the keys
    store.put("configs/b/v1", b"b").unwrap();
    store.put("groups/a/v1", b"g").unwrap();
    let mut listed: Vec<String> = store
        .list("configs/")
        .unwrap()
        .into_iter()
        .map(|entry| entry.key)
        .collect();
    listed.sort();
    assert_eq!(listed, vec!["configs/a/v1", "configs/b/v1"]);
    assert!(store.list("missing/").unwrap().is_empty());

    store.delete("configs/a/v1").unwrap();
    assert!(matches!(store.get("configs/a/v1"), Err(StoreError::NotFound { .. })));
    assert!(matches!(store.delete("configs/a/v1"), Err(StoreError::NotFound { .. })));
}

/// Exercises the registry operations over whatever store backs `registry`.
pub fn registry_contract(registry: &dyn RegistryService) {
    create_is_exclusive(registry);
    delete_is_strict(registry);
    update_never_creates(registry);
    empty_search_is_rejected(registry);
    search_matches_label_superset(registry);
    groups_mirror_configurations(registry);
    end_to_end(registry);
}

fn create_is_exclusive(registry: &dyn RegistryService) {
    let original = Configuration::new("exclusive", "v1").with_parameter("pool", "10");
    registry.create_configuration(original.clone()).unwrap();

    let duplicate = Configuration::new("exclusive", "v1").with_parameter("pool", "99");
    match registry.create_configuration(duplicate) {
        Err(RegistryError::AlreadyExists { id, version }) => {
            assert_eq!(id, "exclusive");
            assert_eq!(version, "v1");
        }
        other => panic!("expected AlreadyExists, got {:?}", other),
    }
    assert_eq!(registry.get_configuration("exclusive", "v1").unwrap(), original);

    // A different version is a different record.
    registry
        .create_configuration(Configuration::new("exclusive", "v2"))
        .unwrap();
}

fn delete_is_strict(registry: &dyn RegistryService) {
    registry
        .create_configuration(Configuration::new("doomed", "v1"))
        .unwrap();
    registry.delete_configuration("doomed", "v1").unwrap();

    assert!(matches!(
        registry.get_configuration("doomed", "v1"),
        Err(RegistryError::NotFound { .. })
    ));
    assert!(matches!(
        registry.delete_configuration("doomed", "v1"),
        Err(RegistryError::NotFound { .. })
    ));
}

fn update_never_creates(registry: &dyn RegistryService) {
    let ghost = Configuration::new("ghost", "v1").with_label("env", "prod");
    assert!(matches!(
        registry.update_configuration(ghost),
        Err(RegistryError::NotFound { .. })
    ));
    assert!(matches!(
        registry.get_configuration("ghost", "v1"),
        Err(RegistryError::NotFound { .. })
    ));

    registry
        .create_configuration(Configuration::new("living", "v1"))
        .unwrap();
    let changed = Configuration::new("living", "v1").with_parameter("mode", "fast");
    assert_eq!(registry.update_configuration(changed.clone()).unwrap(), changed);
    assert_eq!(registry.get_configuration("living", "v1").unwrap(), changed);
}

fn empty_search_is_rejected(registry: &dyn RegistryService) {
    let empty = HashMap::new();
    assert!(matches!(
        registry.search_configurations(&empty),
        Err(RegistryError::InvalidQuery { .. })
    ));
    assert!(matches!(
        registry.search_groups(&empty),
        Err(RegistryError::InvalidQuery { .. })
    ));
}

fn search_matches_label_superset(registry: &dyn RegistryService) {
    let prod_web = Configuration::new("search-web", "v1")
        .with_label("tier", "search-test")
        .with_label("env", "prod")
        .with_label("role", "web");
    let prod_db = Configuration::new("search-db", "v1")
        .with_label("tier", "search-test")
        .with_label("env", "prod");
    let dev_web = Configuration::new("search-dev", "v1")
        .with_label("tier", "search-test")
        .with_label("env", "dev")
        .with_label("role", "web");

    for config in [&prod_web, &prod_db, &dev_web] {
        registry.create_configuration(config.clone()).unwrap();
    }

    let mut found = registry
        .search_configurations(&labels(&[("tier", "search-test"), ("env", "prod")]))
        .unwrap();
    found.sort_by(|a, b| a.id.cmp(&b.id));
    assert_eq!(found, vec![prod_db.clone(), prod_web.clone()]);

    let found = registry
        .search_configurations(&labels(&[("tier", "search-test"), ("role", "web"), ("env", "prod")]))
        .unwrap();
    assert_eq!(found, vec![prod_web]);

    let found = registry
        .search_configurations(&labels(&[("tier", "search-test"), ("env", "staging")]))
        .unwrap();
    assert!(found.is_empty());
}

fn groups_mirror_configurations(registry: &dyn RegistryService) {
    let member = Configuration::new("member", "v1").with_parameter("k", "v");
    let group = ConfigurationGroup::new("", "v1")
        .with_label("team", "platform")
        .with_configuration(member);

    let created = registry.create_group(group).unwrap();
    assert!(!created.id.is_empty());
    assert_eq!(registry.get_group(&created.id, "v1").unwrap(), created);

    assert!(matches!(
        registry.create_group(created.clone()),
        Err(RegistryError::AlreadyExists { .. })
    ));

    let found = registry
        .search_groups(&labels(&[("team", "platform")]))
        .unwrap();
    assert!(found.contains(&created));

    // Groups and configurations never see each other.
    assert!(matches!(
        registry.get_configuration(&created.id, "v1"),
        Err(RegistryError::NotFound { .. })
    ));

    let renamed = created.clone().with_label("owner", "infra");
    assert_eq!(registry.update_group(renamed.clone()).unwrap(), renamed);

    registry.delete_group(&created.id, "v1").unwrap();
    assert!(matches!(
        registry.get_group(&created.id, "v1"),
        Err(RegistryError::NotFound { .. })
    ));
    assert!(matches!(
        registry.delete_group(&created.id, "v1"),
        Err(RegistryError::NotFound { .. })
    ));
}

fn end_to_end(registry: &dyn RegistryService) {
    let created = registry
        .create_configuration(
            Configuration::new("", "v1")
                .with_label("env", "prod")
                .with_parameter("timeout", "30"),
        )
        .unwrap();
    assert!(!created.id.is_empty());

    let fetched = registry.get_configuration(&created.id, "v1").unwrap();
    assert_eq!(fetched.parameters, created.parameters);

    let prod = registry
        .search_configurations(&labels(&[("env", "prod")]))
        .unwrap();
    assert!(prod.iter().any(|c| c.id == created.id));

    let dev = registry
        .search_configurations(&labels(&[("env", "dev")]))
        .unwrap();
    assert!(dev.iter().all(|c| c.id != created.id));

    registry.delete_configuration(&created.id, "v1").unwrap();
    assert!(matches!(
        registry.get_configuration(&created.id, "v1"),
        Err(RegistryError::NotFound { .. })
    ));
}

/// Races `threads` creates of one `(id, version)` with distinct payloads.
///
/// Exactly one must win, and the stored record must be the winner's.
pub fn concurrent_create_single_winner(registry: Arc<dyn RegistryService>, threads: usize) {
    let barrier = Arc::new(Barrier::new(threads));

    let handles: Vec<_> = (0..threads)
        .map(|n| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            std::thread::spawn(move || {
                let config = Configuration::new("contended", "v1")
                    .with_parameter("writer", n.to_string());
                barrier.wait();
                (n, registry.create_configuration(config))
            })
        })
        .collect();

    let mut winners = Vec::new();
    let mut conflicts = 0;
    for handle in handles {
        let (n, result) = handle.join().unwrap();
        match result {
            Ok(_) => winners.push(n),
            Err(RegistryError::AlreadyExists { .. }) => conflicts += 1,
            Err(other) => panic!("unexpected error: {:?}", other),
        }
    }

    assert_eq!(winners.len(), 1, "exactly one create must win");
    assert_eq!(conflicts, threads - 1);

    let stored = registry.get_configuration("contended", "v1").unwrap();
    assert_eq!(stored.parameters[0].value, winners[0].to_string());
}
