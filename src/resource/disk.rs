//! Disk space resource
//!
//! Informational preflight only: verifies free space at the root filesystem
//! and the variable-data mount before an action is permitted. There is no
//! provisioning action.

use std::path::Path;

use serde_json::json;

use crate::context::CheckContext;
use crate::error::{Result, insufficient_space};
use crate::host::HostServices;
use crate::properties::{PropertyMap, Props};
use crate::registry::ResourceDescriptor;

use super::{AppResource, size_threshold};

pub const TYPE: &str = "disk";

/// Mounts whose free space must exceed the declared requirement
const CHECKED_MOUNTS: [&str; 2] = ["/", "/var"];

fn default_properties() -> PropertyMap {
    crate::properties::object(json!({ "space": "10M" }))
}

fn build(properties: PropertyMap) -> Result<Box<dyn AppResource>> {
    Ok(Box::new(DiskResource::from_properties(&properties)?))
}

pub(crate) fn descriptor() -> ResourceDescriptor {
    ResourceDescriptor::new(TYPE, default_properties, build)
}

#[derive(Debug)]
pub struct DiskResource {
    required: u64,
}

impl DiskResource {
    pub fn from_properties(properties: &PropertyMap) -> Result<Self> {
        let props = Props::new(TYPE, properties);
        let token = props.str("space")?;
        Ok(Self {
            required: size_threshold(TYPE, "space", &token)?,
        })
    }
}

impl AppResource for DiskResource {
    fn type_tag(&self) -> &'static str {
        TYPE
    }

    fn check_availability(&self, host: &HostServices<'_>, _ctx: &CheckContext<'_>) -> Result<()> {
        for mount in CHECKED_MOUNTS {
            let available = host.fs.free_space(Path::new(mount))?;
            // Free space exactly equal to the threshold is "not enough"
            if available <= self.required {
                return Err(insufficient_space(mount, self.required, available));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::context::CheckContext;
    use crate::host::fake::FakeHost;
    use crate::settings::Settings;

    fn disk(space: &str) -> DiskResource {
        let mut properties = default_properties();
        properties.insert("space".to_string(), json!(space));
        DiskResource::from_properties(&properties).unwrap()
    }

    #[test]
    fn test_rejects_unknown_token() {
        let mut properties = default_properties();
        properties.insert("space".to_string(), json!("15M"));
        let err = DiskResource::from_properties(&properties).unwrap_err();
        assert!(err.to_string().contains("15M"));
    }

    #[test]
    fn test_available_when_both_mounts_have_room() {
        let host = FakeHost::new();
        let settings = Settings::new();
        let ctx = CheckContext {
            app_id: "myapp",
            settings: &settings,
        };
        assert!(
            disk("10M")
                .check_availability(&host.services(), &ctx)
                .is_ok()
        );
    }

    #[test]
    fn test_boundary_free_space_is_not_enough() {
        let host = FakeHost::new();
        host.set_free_space("/", 10 * 1024 * 1024);
        let settings = Settings::new();
        let ctx = CheckContext {
            app_id: "myapp",
            settings: &settings,
        };
        let err = disk("10M")
            .check_availability(&host.services(), &ctx)
            .unwrap_err();
        assert!(err.to_string().contains("Not enough space"));
    }

    #[test]
    fn test_var_mount_checked_too() {
        let host = FakeHost::new();
        host.set_free_space("/var", 1024);
        let settings = Settings::new();
        let ctx = CheckContext {
            app_id: "myapp",
            settings: &settings,
        };
        let err = disk("10M")
            .check_availability(&host.services(), &ctx)
            .unwrap_err();
        assert!(err.to_string().contains("/var"));
    }
}
