//! Resource type registry
//!
//! The set of resource types is closed: every variant registers a descriptor
//! in [`ResourceTypeRegistry::builtin`] and manifests can only name tags found
//! there. Lookup of an unknown tag fails loudly so a typo in a manifest aborts
//! the whole load instead of silently skipping a requirement.

use std::collections::HashMap;

use crate::error::{Result, unknown_resource_type};
use crate::properties::{self, PropertyMap};
use crate::resource::{self, AppResource};

type DefaultsFn = fn() -> PropertyMap;
type BuildFn = fn(PropertyMap) -> Result<Box<dyn AppResource>>;

/// A resource type's identity, default configuration and constructor
#[derive(Debug)]
pub struct ResourceDescriptor {
    type_tag: &'static str,
    defaults: DefaultsFn,
    build: BuildFn,
}

impl ResourceDescriptor {
    pub(crate) fn new(type_tag: &'static str, defaults: DefaultsFn, build: BuildFn) -> Self {
        Self {
            type_tag,
            defaults,
            build,
        }
    }

    pub fn type_tag(&self) -> &'static str {
        self.type_tag
    }

    /// A fresh copy of the type's default properties
    pub fn default_properties(&self) -> PropertyMap {
        (self.defaults)()
    }
}

/// Registry mapping type tags to resource descriptors
pub struct ResourceTypeRegistry {
    descriptors: Vec<ResourceDescriptor>,
    by_tag: HashMap<&'static str, usize>,
}

impl ResourceTypeRegistry {
    /// Registry holding every built-in resource type
    pub fn builtin() -> Self {
        let mut registry = Self {
            descriptors: Vec::new(),
            by_tag: HashMap::new(),
        };
        registry.register(resource::disk::descriptor());
        registry.register(resource::ram::descriptor());
        registry.register(resource::apt::descriptor());
        registry.register(resource::sources::descriptor());
        registry.register(resource::routes::descriptor());
        registry.register(resource::port::descriptor());
        registry.register(resource::system_user::descriptor());
        registry.register(resource::install_dir::descriptor());
        registry.register(resource::data_dir::descriptor());
        registry.register(resource::database::descriptor());
        registry
    }

    fn register(&mut self, descriptor: ResourceDescriptor) {
        debug_assert!(
            !self.by_tag.contains_key(descriptor.type_tag),
            "duplicate resource type tag {}",
            descriptor.type_tag
        );
        self.by_tag
            .insert(descriptor.type_tag, self.descriptors.len());
        self.descriptors.push(descriptor);
    }

    pub fn lookup(&self, tag: &str) -> Result<&ResourceDescriptor> {
        self.by_tag
            .get(tag)
            .map(|&index| &self.descriptors[index])
            .ok_or_else(|| unknown_resource_type(tag))
    }

    /// Build one configured resource: the type's defaults with `overrides`
    /// substituted per key (whole-value replacement), `__APP__` placeholders
    /// expanded to `app_id`, then validated by the variant's constructor.
    pub fn instantiate(
        &self,
        app_id: &str,
        tag: &str,
        overrides: &PropertyMap,
    ) -> Result<Box<dyn AppResource>> {
        let descriptor = self.lookup(tag)?;
        let mut props = properties::merged(descriptor.default_properties(), overrides);
        properties::expand_placeholders(&mut props, app_id);
        (descriptor.build)(props)
    }

    /// All registered tags, in registration order
    pub fn tags(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.descriptors.iter().map(|d| d.type_tag)
    }
}

impl Default for ResourceTypeRegistry {
    fn default() -> Self {
        Self::builtin()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_builtin_has_every_variant() {
        let registry = ResourceTypeRegistry::builtin();
        let tags: Vec<_> = registry.tags().collect();
        assert_eq!(
            tags,
            vec![
                "disk",
                "ram",
                "apt",
                "sources",
                "routes",
                "port",
                "system_user",
                "install_dir",
                "data_dir",
                "db",
            ]
        );
    }

    #[test]
    fn test_lookup_unknown_tag_fails() {
        let registry = ResourceTypeRegistry::builtin();
        let err = registry.lookup("gpu").unwrap_err();
        assert!(err.to_string().contains("gpu"));
    }

    #[test]
    fn test_instantiate_applies_overrides_shallowly() {
        let registry = ResourceTypeRegistry::builtin();
        // Valid override
        let overrides = properties::object(json!({ "space": "1G" }));
        assert!(registry.instantiate("myapp", "disk", &overrides).is_ok());
        // Invalid token caught by the variant's constructor
        let overrides = properties::object(json!({ "space": "15M" }));
        assert!(registry.instantiate("myapp", "disk", &overrides).is_err());
    }

    #[test]
    fn test_instantiate_expands_app_placeholder() {
        let registry = ResourceTypeRegistry::builtin();
        let resource = registry
            .instantiate("myapp", "install_dir", &PropertyMap::new())
            .unwrap();
        assert_eq!(resource.type_tag(), "install_dir");
        // Placeholder expansion is observable through provisioning
        let host = crate::host::fake::FakeHost::new();
        let mut settings = crate::settings::Settings::new();
        let mut ctx = crate::context::ProvisioningContext {
            app_id: "myapp",
            action: crate::context::AppAction::Install,
            settings: &mut settings,
        };
        resource
            .provision_or_update(&host.services(), &mut ctx)
            .unwrap();
        assert_eq!(settings.get_str("installdir"), Some("/var/www/myapp"));
    }
}
