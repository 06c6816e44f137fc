//! Resource property maps
//!
//! A resource's configuration is a flat mapping of string keys to JSON values:
//! the type's defaults with manifest overrides substituted per key. Overrides
//! replace whole values, they are never deep-merged. String values may contain
//! the `__APP__` placeholder, expanded to the owning app's id at construction.

use serde_json::Value;

/// Property mapping for one resource instance
pub type PropertyMap = serde_json::Map<String, Value>;

/// Treat a JSON literal as a property map; non-object values yield an empty map.
pub(crate) fn object(value: Value) -> PropertyMap {
    match value {
        Value::Object(map) => map,
        _ => PropertyMap::new(),
    }
}

/// Apply `overrides` on top of `defaults`, replacing whole values per key.
pub fn merged(defaults: PropertyMap, overrides: &PropertyMap) -> PropertyMap {
    let mut properties = defaults;
    for (key, value) in overrides {
        properties.insert(key.clone(), value.clone());
    }
    properties
}

/// Expand the `__APP__` placeholder in every string value, recursing through
/// nested maps and arrays.
pub fn expand_placeholders(properties: &mut PropertyMap, app_id: &str) {
    for value in properties.values_mut() {
        expand_value(value, app_id);
    }
}

fn expand_value(value: &mut Value, app_id: &str) {
    match value {
        Value::String(s) => {
            if s.contains("__APP__") {
                *s = s.replace("__APP__", app_id);
            }
        }
        Value::Array(items) => {
            for item in items {
                expand_value(item, app_id);
            }
        }
        Value::Object(map) => {
            for item in map.values_mut() {
                expand_value(item, app_id);
            }
        }
        _ => {}
    }
}

/// Typed read access to a [`PropertyMap`], reporting domain violations as
/// [`InvalidProperty`](crate::error::HomesteadError::InvalidProperty) errors
/// tagged with the owning resource type.
pub struct Props<'a> {
    type_tag: &'static str,
    map: &'a PropertyMap,
}

use crate::error::{Result, invalid_property};

impl<'a> Props<'a> {
    pub fn new(type_tag: &'static str, map: &'a PropertyMap) -> Self {
        Self { type_tag, map }
    }

    fn value(&self, key: &str) -> Result<&'a Value> {
        self.map
            .get(key)
            .ok_or_else(|| invalid_property(self.type_tag, key, "property is missing"))
    }

    pub fn str(&self, key: &str) -> Result<String> {
        match self.value(key)? {
            Value::String(s) => Ok(s.clone()),
            other => Err(self.type_error(key, "a string", other)),
        }
    }

    pub fn bool(&self, key: &str) -> Result<bool> {
        match self.value(key)? {
            Value::Bool(b) => Ok(*b),
            other => Err(self.type_error(key, "a boolean", other)),
        }
    }

    pub fn u64(&self, key: &str) -> Result<u64> {
        let value = self.value(key)?;
        match value {
            Value::Number(n) => n
                .as_u64()
                .ok_or_else(|| self.type_error(key, "a non-negative integer", value)),
            other => Err(self.type_error(key, "an integer", other)),
        }
    }

    pub fn map(&self, key: &str) -> Result<&'a PropertyMap> {
        match self.value(key)? {
            Value::Object(map) => Ok(map),
            other => Err(self.type_error(key, "a mapping", other)),
        }
    }

    pub fn str_list(&self, key: &str) -> Result<Vec<String>> {
        match self.value(key)? {
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::String(s) => Ok(s.clone()),
                    other => Err(self.type_error(key, "a list of strings", other)),
                })
                .collect(),
            other => Err(self.type_error(key, "a list", other)),
        }
    }

    fn type_error(
        &self,
        key: &str,
        expected: &str,
        got: &Value,
    ) -> crate::error::HomesteadError {
        invalid_property(
            self.type_tag,
            key,
            format!("expected {expected}, got {got}"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn map(value: serde_json::Value) -> PropertyMap {
        match value {
            Value::Object(map) => map,
            _ => unreachable!("fixture must be an object"),
        }
    }

    #[test]
    fn test_merged_replaces_whole_values() {
        let defaults = map(json!({"space": "10M", "main": {"url": "/", "protected": false}}));
        let overrides = map(json!({"main": {"url": "/admin"}}));

        let merged = merged(defaults, &overrides);

        assert_eq!(merged["space"], json!("10M"));
        // Shallow override: the whole "main" mapping is replaced, not merged
        assert_eq!(merged["main"], json!({"url": "/admin"}));
    }

    #[test]
    fn test_merged_does_not_touch_original_overrides() {
        let defaults = map(json!({"a": 1}));
        let overrides = map(json!({"b": 2}));
        let out = merged(defaults, &overrides);
        assert_eq!(out.len(), 2);
        assert_eq!(overrides.len(), 1);
    }

    #[test]
    fn test_expand_placeholders_nested() {
        let mut props = map(json!({
            "dir": "/var/www/__APP__",
            "main": {"label": "__APP__", "urls": ["/__APP__/x"]},
            "count": 3,
        }));
        expand_placeholders(&mut props, "myapp");
        assert_eq!(props["dir"], json!("/var/www/myapp"));
        assert_eq!(props["main"]["label"], json!("myapp"));
        assert_eq!(props["main"]["urls"][0], json!("/myapp/x"));
        assert_eq!(props["count"], json!(3));
    }

    #[test]
    fn test_props_typed_accessors() {
        let m = map(json!({"s": "x", "b": true, "n": 42, "l": ["a", "b"], "m": {"k": 1}}));
        let props = Props::new("disk", &m);
        assert_eq!(props.str("s").ok(), Some("x".to_string()));
        assert_eq!(props.bool("b").ok(), Some(true));
        assert_eq!(props.u64("n").ok(), Some(42));
        assert_eq!(props.str_list("l").ok(), Some(vec!["a".into(), "b".into()]));
        assert!(props.map("m").is_ok());
    }

    #[test]
    fn test_props_reports_missing_and_mistyped() {
        let m = map(json!({"b": "not-a-bool"}));
        let props = Props::new("ram", &m);

        let err = props.bool("b").unwrap_err();
        assert!(err.to_string().contains("ram"));
        assert!(err.to_string().contains("boolean"));

        let err = props.str("absent").unwrap_err();
        assert!(err.to_string().contains("missing"));
    }
}
