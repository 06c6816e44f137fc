//! Shared helpers for integration tests

#![allow(dead_code)]

use homestead::host::fake::FakeHost;
use homestead::{AppResourceSet, PropertyMap, ResourceTypeRegistry};
use indexmap::IndexMap;
use serde_json::Value;

pub const APP: &str = "myapp";

/// Fake host with enough capacity that only explicitly constrained
/// collaborators fail.
pub fn host() -> FakeHost {
    FakeHost::new()
}

pub fn manifest(entries: &[(&str, Value)]) -> IndexMap<String, PropertyMap> {
    entries
        .iter()
        .map(|(tag, overrides)| {
            let map = match overrides {
                Value::Object(map) => map.clone(),
                _ => PropertyMap::new(),
            };
            (tag.to_string(), map)
        })
        .collect()
}

pub fn resource_set(entries: &[(&str, Value)]) -> AppResourceSet {
    let registry = ResourceTypeRegistry::builtin();
    AppResourceSet::from_manifest(APP, &manifest(entries), &registry)
        .expect("manifest must be valid")
}
