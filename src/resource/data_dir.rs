//! Data directory resource
//!
//! Creates the app's persistent data directory and records it in settings.
//! Unlike the install directory, user data is never deleted on removal; only
//! the settings key is dropped so a reinstall starts from a clean record
//! while the data survives on disk.

use std::path::Path;

use serde_json::json;

use crate::context::{CheckContext, ProvisioningContext};
use crate::error::{Result, dir_already_exists};
use crate::host::HostServices;
use crate::properties::{self, PropertyMap, Props};
use crate::registry::ResourceDescriptor;

use super::AppResource;

pub const TYPE: &str = "data_dir";

const SETTING: &str = "datadir";

fn default_properties() -> PropertyMap {
    properties::object(json!({ "dir": "/var/lib/__APP__" }))
}

fn build(properties: PropertyMap) -> Result<Box<dyn AppResource>> {
    Ok(Box::new(DataDirResource::from_properties(&properties)?))
}

pub(crate) fn descriptor() -> ResourceDescriptor {
    ResourceDescriptor::new(TYPE, default_properties, build)
}

#[derive(Debug)]
pub struct DataDirResource {
    dir: String,
}

impl DataDirResource {
    pub fn from_properties(properties: &PropertyMap) -> Result<Self> {
        let props = Props::new(TYPE, properties);
        Ok(Self {
            dir: props.str("dir")?,
        })
    }
}

impl AppResource for DataDirResource {
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

        // No re-check of existence here: a directory left behind by an
        // earlier install carries user data and is adopted, not rejected.
        host.fs.create_dir_all(Path::new(&canonical))?;
        ctx.settings.set(SETTING, canonical);
        Ok(())
    }

    fn deprovision(
        &self,
        _host: &HostServices<'_>,
        ctx: &mut ProvisioningContext<'_>,
    ) -> Result<()> {
        ctx.settings.remove(SETTING);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::context::AppAction;
    use crate::host::fake::FakeHost;
    use crate::settings::Settings;

    fn resource(dir: &str) -> DataDirResource {
        let properties = properties::object(json!({ "dir": dir }));
        DataDirResource::from_properties(&properties).unwrap()
    }

    #[test]
    fn test_provision_creates_dir_and_records_setting() {
        let host = FakeHost::new();
        let mut settings = Settings::new();
        let mut ctx = ProvisioningContext {
            app_id: "myapp",
            action: AppAction::Install,
            settings: &mut settings,
        };
        resource("/var/lib/myapp")
            .provision_or_update(&host.services(), &mut ctx)
            .unwrap();
        assert!(host.has_path("/var/lib/myapp"));
        assert_eq!(settings.get_str("datadir"), Some("/var/lib/myapp"));
    }

    #[test]
    fn test_availability_fails_when_dir_exists() {
        let host = FakeHost::new();
        host.add_path("/var/lib/myapp");
        let settings = Settings::new();
        let ctx = CheckContext {
            app_id: "myapp",
            settings: &settings,
        };
        let err = resource("/var/lib/myapp")
            .check_availability(&host.services(), &ctx)
            .unwrap_err();
        assert!(err.to_string().contains("already exists"));
    }

    #[test]
    fn test_provisioning_adopts_existing_data() {
        let host = FakeHost::new();
        host.add_path("/var/lib/myapp");
        let mut settings = Settings::new();
        let mut ctx = ProvisioningContext {
            app_id: "myapp",
            action: AppAction::Install,
            settings: &mut settings,
        };
        resource("/var/lib/myapp")
            .provision_or_update(&host.services(), &mut ctx)
            .unwrap();
        assert_eq!(settings.get_str("datadir"), Some("/var/lib/myapp"));
    }

    #[test]
    fn test_deprovision_keeps_data_on_disk() {
        let host = FakeHost::new();
        let mut settings = Settings::new();
        {
            let mut ctx = ProvisioningContext {
                app_id: "myapp",
                action: AppAction::Install,
                settings: &mut settings,
            };
            resource("/var/lib/myapp")
                .provision_or_update(&host.services(), &mut ctx)
                .unwrap();
        }

        let mut ctx = ProvisioningContext {
            app_id: "myapp",
            action: AppAction::Remove,
            settings: &mut settings,
        };
        resource("/var/lib/myapp")
            .deprovision(&host.services(), &mut ctx)
            .unwrap();

        assert!(host.has_path("/var/lib/myapp"));
        assert_eq!(settings.get_str("datadir"), None);
    }
}
