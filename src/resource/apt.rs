//! System package dependency resource
//!
//! Declares the distribution packages an app needs, optionally pulling some
//! of them from extra repositories. Provisioning maintains a per-app
//! dependency meta-package through the package catalog; the preflight check
//! only verifies that the main-repository packages are known to the catalog,
//! since extra repositories are not configured until provisioning runs.

use serde_json::{Value, json};

use crate::context::{CheckContext, ProvisioningContext};
use crate::error::{Result, invalid_property, package_unavailable};
use crate::host::{ExtraRepository, HostServices};
use crate::properties::{self, PropertyMap, Props};
use crate::registry::ResourceDescriptor;

use super::AppResource;

pub const TYPE: &str = "apt";

fn default_properties() -> PropertyMap {
    properties::object(json!({
        "packages": [],
        "extras": {},
    }))
}

fn build(properties: PropertyMap) -> Result<Box<dyn AppResource>> {
    Ok(Box::new(AptResource::from_properties(&properties)?))
}

pub(crate) fn descriptor() -> ResourceDescriptor {
    ResourceDescriptor::new(TYPE, default_properties, build)
}

#[derive(Debug)]
pub struct AptResource {
    packages: Vec<String>,
    extras: Vec<(String, ExtraRepository)>,
}

fn extra_str(name: &str, spec: &PropertyMap, key: &str) -> Result<String> {
    match spec.get(key) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s.clone()),
        _ => Err(invalid_property(
            TYPE,
            "extras",
            format!("entry {name:?} needs a non-empty string {key:?}"),
        )),
    }
}

impl AptResource {
    pub fn from_properties(properties: &PropertyMap) -> Result<Self> {
        let props = Props::new(TYPE, properties);
        let packages = props.str_list("packages")?;

        let mut extras = Vec::new();
        for (name, spec) in props.map("extras")? {
            let Value::Object(spec) = spec else {
                return Err(invalid_property(
                    TYPE,
                    "extras",
                    format!("entry {name:?} must be a map"),
                ));
            };
            extras.push((
                name.clone(),
                ExtraRepository {
                    repo: extra_str(name, spec, "repo")?,
                    key: extra_str(name, spec, "key")?,
                    packages: extra_str(name, spec, "packages")?,
                },
            ));
        }

        Ok(Self { packages, extras })
    }
}

impl AppResource for AptResource {
    fn type_tag(&self) -> &'static str {
        TYPE
    }

    fn check_availability(&self, host: &HostServices<'_>, _ctx: &CheckContext<'_>) -> Result<()> {
        for package in &self.packages {
            if !host.packages.installable(package)? {
                return Err(package_unavailable(package));
            }
        }
        Ok(())
    }

    fn provision_or_update(
        &self,
        host: &HostServices<'_>,
        ctx: &mut ProvisioningContext<'_>,
    ) -> Result<()> {
        let extras: Vec<ExtraRepository> =
            self.extras.iter().map(|(_, extra)| extra.clone()).collect();
        host.packages
            .ensure_app_dependencies(ctx.app_id, &self.packages, &extras)
    }

    fn deprovision(
        &self,
        host: &HostServices<'_>,
        ctx: &mut ProvisioningContext<'_>,
    ) -> Result<()> {
        host.packages.remove_app_dependencies(ctx.app_id)
    }
}
