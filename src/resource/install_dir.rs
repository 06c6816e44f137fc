//! Install directory resource
//!
//! Commits the app's install location to settings and creates the directory.
//! The path recorded at first provisioning wins across upgrades, even if the
//! type's default `dir` changes between versions; a secondary alias key
//! mirrors the canonical value for scripts that still read the legacy name.

use std::path::Path;

use serde_json::json;

use crate::context::{AppAction, CheckContext, ProvisioningContext};
use crate::error::{Result, deprovision_failed, dir_already_exists};
use crate::host::HostServices;
use crate::properties::{self, PropertyMap, Props};
use crate::registry::ResourceDescriptor;

use super::AppResource;

pub const TYPE: &str = "install_dir";

/// Canonical settings key recording the committed path
const SETTING: &str = "installdir";

fn default_properties() -> PropertyMap {
    properties::object(json!({
        "dir": "/var/www/__APP__",
        "alias": "final_path",
    }))
}

fn build(properties: PropertyMap) -> Result<Box<dyn AppResource>> {
    Ok(Box::new(InstallDirResource::from_properties(&properties)?))
}

pub(crate) fn descriptor() -> ResourceDescriptor {
    ResourceDescriptor::new(TYPE, default_properties, build)
}

#[derive(Debug)]
pub struct InstallDirResource {
    dir: String,
    alias: String,
}

impl InstallDirResource {
    pub fn from_properties(properties: &PropertyMap) -> Result<Self> {
        let props = Props::new(TYPE, properties);
        Ok(Self {
            dir: props.str("dir")?,
            alias: props.str("alias")?,
        })
    }
}

/// Refuse to delete suspiciously shallow paths, whatever settings say.
fn deletable(path: &Path) -> bool {
    path.is_absolute() && path.components().count() > 2
}

impl AppResource for InstallDirResource {
    fn type_tag(&self) -> &'static str {
        TYPE
    }

    fn check_availability(&self, host: &HostServices<'_>, _ctx: &CheckContext<'_>) -> Result<()> {
        if host.fs.exists(Path::new(&self.dir)) {
            return Err(dir_already_exists(&self.dir));
        }
        Ok(())
    }

    fn provision_or_update(
        &self,
        host: &HostServices<'_>,
        ctx: &mut ProvisioningContext<'_>,
    ) -> Result<()> {
        let canonical = ctx
            .settings
            .get_str(SETTING)
            .map(str::to_string)
            .unwrap_or_else(|| self.dir.clone());

        // The availability check already rejected an existing directory;
        // re-check here in case one appeared between check and execution.
        if matches!(ctx.action, AppAction::Install | AppAction::Restore)
            && host.fs.exists(Path::new(&canonical))
        {
            return Err(dir_already_exists(&canonical));
        }

        host.fs.create_dir_all(Path::new(&canonical))?;
        ctx.settings.set(SETTING, canonical.clone());
        ctx.settings.set(self.alias.clone(), canonical);
        Ok(())
    }

    fn deprovision(
        &self,
        host: &HostServices<'_>,
        ctx: &mut ProvisioningContext<'_>,
    ) -> Result<()> {
        if let Some(dir) = ctx.settings.get_str(SETTING).map(str::to_string) {
            let path = Path::new(&dir);
            if host.fs.exists(path) {
                if !deletable(path) {
                    return Err(deprovision_failed(
                        TYPE,
                        format!("refusing to delete {dir}"),
                    ));
                }
                host.fs.remove_dir_all(path)?;
            }
        }
        ctx.settings.remove(SETTING);
        ctx.settings.remove(&self.alias);
        Ok(())
    }
}
