//! Web route resource
//!
//! Claims the app's place in the web routing tree and registers its default
//! access-control entry. Where the app is mounted is operator-chosen and
//! read from settings (`domain`, and `path` unless the app takes the whole
//! domain); the resource declares the shape of the entry, not its location.
//!
//! Like sources, the `main` mapping is parsed leniently because a manifest
//! override replaces it wholesale.

use serde_json::{Value, json};

use crate::context::{AppAction, CheckContext, ProvisioningContext};
use crate::error::{Result, invalid_property, missing_setting};
use crate::host::{HostServices, RouteEntry};
use crate::properties::{self, PropertyMap, Props};
use crate::registry::ResourceDescriptor;
use crate::settings::Settings;

use super::AppResource;

pub const TYPE: &str = "routes";

fn default_properties() -> PropertyMap {
    properties::object(json!({
        "full_domain": false,
        "main": {
            "url": "/",
            "additional_urls": [],
            "init_allowed": [],
            "show_tile": true,
            "protected": false,
            "auth_header": true,
            "label": "__APP__",
        },
    }))
}

fn build(properties: PropertyMap) -> Result<Box<dyn AppResource>> {
    Ok(Box::new(RoutesResource::from_properties(&properties)?))
}

pub(crate) fn descriptor() -> ResourceDescriptor {
    ResourceDescriptor::new(TYPE, default_properties, build)
}

#[derive(Debug)]
pub struct RoutesResource {
    full_domain: bool,
    entry: RouteEntry,
}

fn main_bool(main: &PropertyMap, key: &str, default: bool) -> Result<bool> {
    match main.get(key) {
        None => Ok(default),
        Some(Value::Bool(b)) => Ok(*b),
        Some(_) => Err(invalid_property(
            TYPE,
            "main",
            format!("`{key}` must be a boolean"),
        )),
    }
}

fn main_str_list(main: &PropertyMap, key: &str) -> Result<Vec<String>> {
    match main.get(key) {
        None => Ok(Vec::new()),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(s.clone()),
                _ => Err(invalid_property(
                    TYPE,
                    "main",
                    format!("`{key}` must be a list of strings"),
                )),
            })
            .collect(),
        Some(_) => Err(invalid_property(
            TYPE,
            "main",
            format!("`{key}` must be a list"),
        )),
    }
}

impl RoutesResource {
    pub fn from_properties(properties: &PropertyMap) -> Result<Self> {
        let props = Props::new(TYPE, properties);
        let full_domain = props.bool("full_domain")?;
        let main = props.map("main")?;

        let url = match main.get("url") {
            None => "/".to_string(),
            Some(Value::String(url)) if url == "/" => url.clone(),
            Some(_) => {
                return Err(invalid_property(
                    TYPE,
                    "main",
                    "`url` of the main route must be \"/\"",
                ));
            }
        };
        let label = match main.get("label") {
            None => String::new(),
            Some(Value::String(label)) => label.clone(),
            Some(_) => {
                return Err(invalid_property(TYPE, "main", "`label` must be a string"));
            }
        };

        Ok(Self {
            full_domain,
            entry: RouteEntry {
                url,
                additional_urls: main_str_list(main, "additional_urls")?,
                allowed: main_str_list(main, "init_allowed")?,
                show_tile: main_bool(main, "show_tile", true)?,
                protected: main_bool(main, "protected", false)?,
                auth_header: main_bool(main, "auth_header", true)?,
                label,
            },
        })
    }

    /// Where settings say the app is mounted
    fn mount_point(&self, settings: &Settings) -> Result<(String, String)> {
        let domain = settings
            .get_str("domain")
            .ok_or_else(|| missing_setting("domain"))?
            .to_string();
        let path = if self.full_domain {
            "/".to_string()
        } else {
            settings
                .get_str("path")
                .ok_or_else(|| missing_setting("path"))?
                .to_string()
        };
        Ok((domain, path))
    }
}

impl AppResource for RoutesResource {
    fn type_tag(&self) -> &'static str {
        TYPE
    }

    fn check_availability(&self, host: &HostServices<'_>, ctx: &CheckContext<'_>) -> Result<()> {
        let (domain, path) = self.mount_point(ctx.settings)?;
        host.routes.assert_no_conflict(&domain, &path, ctx.app_id)
    }

    fn provision_or_update(
        &self,
        host: &HostServices<'_>,
        ctx: &mut ProvisioningContext<'_>,
    ) -> Result<()> {
        // The entry is only seeded at install; later the operator owns it
        // and upgrades must not clobber their access-control edits.
        if ctx.action != AppAction::Install {
            return Ok(());
        }
        self.mount_point(ctx.settings)?;
        host.routes.register_default_entry(ctx.app_id, &self.entry)?;
        host.routes.synchronize()
    }

    fn deprovision(
        &self,
        host: &HostServices<'_>,
        ctx: &mut ProvisioningContext<'_>,
    ) -> Result<()> {
        host.routes.remove_entries(ctx.app_id)?;
        host.routes.synchronize()?;
        ctx.settings.remove("domain");
        ctx.settings.remove("path");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::host::fake::FakeHost;

    fn routes() -> RoutesResource {
        RoutesResource::from_properties(&default_properties()).unwrap()
    }

    fn settings_at(domain: &str, path: &str) -> Settings {
        let mut settings = Settings::new();
        settings.set("domain", domain);
        settings.set("path", path);
        settings
    }

    #[test]
    fn test_main_url_must_be_root() {
        let properties = properties::object(json!({
            "full_domain": false,
            "main": { "url": "/admin" },
        }));
        let err = RoutesResource::from_properties(&properties).unwrap_err();
        assert!(err.to_string().contains("url"));
    }

    #[test]
    fn test_availability_requires_domain_setting() {
        let host = FakeHost::new();
        let settings = Settings::new();
        let ctx = CheckContext {
            app_id: "myapp",
            settings: &settings,
        };
        let err = routes()
            .check_availability(&host.services(), &ctx)
            .unwrap_err();
        assert!(err.to_string().contains("domain"));
    }

    #[test]
    fn test_overlapping_claim_conflicts_and_sibling_does_not() {
        let host = FakeHost::new();
        host.claim_route("otherapp", "example.org", "/blog");

        let settings = settings_at("example.org", "/blog");
        let ctx = CheckContext {
            app_id: "myapp",
            settings: &settings,
        };
        let err = routes()
            .check_availability(&host.services(), &ctx)
            .unwrap_err();
        assert!(err.to_string().contains("otherapp"));

        let settings = settings_at("example.org", "/shop");
        let ctx = CheckContext {
            app_id: "myapp",
            settings: &settings,
        };
        assert!(routes().check_availability(&host.services(), &ctx).is_ok());
    }

    #[test]
    fn test_full_domain_ignores_missing_path() {
        let host = FakeHost::new();
        let properties = properties::object(json!({ "full_domain": true, "main": {} }));
        let resource = RoutesResource::from_properties(&properties).unwrap();
        let mut settings = Settings::new();
        settings.set("domain", "example.org");
        let ctx = CheckContext {
            app_id: "myapp",
            settings: &settings,
        };
        assert!(resource.check_availability(&host.services(), &ctx).is_ok());
    }

    #[test]
    fn test_install_registers_entry_once_then_leaves_it_alone() {
        let host = FakeHost::new();
        let mut settings = settings_at("example.org", "/blog");
        let resource = routes();

        {
            let mut ctx = ProvisioningContext {
                app_id: "myapp",
                action: AppAction::Install,
                settings: &mut settings,
            };
            resource
                .provision_or_update(&host.services(), &mut ctx)
                .unwrap();
        }
        assert_eq!(host.route_entries().len(), 1);

        let mut ctx = ProvisioningContext {
            app_id: "myapp",
            action: AppAction::Upgrade,
            settings: &mut settings,
        };
        resource
            .provision_or_update(&host.services(), &mut ctx)
            .unwrap();
        assert_eq!(host.route_entries().len(), 1);
    }

    #[test]
    fn test_deprovision_removes_entries_and_mount_settings() {
        let host = FakeHost::new();
        let mut settings = settings_at("example.org", "/blog");
        let resource = routes();

        {
            let mut ctx = ProvisioningContext {
                app_id: "myapp",
                action: AppAction::Install,
                settings: &mut settings,
            };
            resource
                .provision_or_update(&host.services(), &mut ctx)
                .unwrap();
        }

        let mut ctx = ProvisioningContext {
            app_id: "myapp",
            action: AppAction::Remove,
            settings: &mut settings,
        };
        resource.deprovision(&host.services(), &mut ctx).unwrap();

        assert!(host.route_entries().is_empty());
        assert_eq!(settings.get_str("domain"), None);
        assert_eq!(settings.get_str("path"), None);
        let journal = host.journal();
        assert!(journal.contains(&"route-sync".to_string()));
    }
}
