//! Memory resource
//!
//! Preflight only: available memory (optionally plus swap) must exceed the
//! larger of the declared build-time and runtime requirements.

use serde_json::json;

use crate::context::CheckContext;
use crate::error::{Result, insufficient_memory};
use crate::host::HostServices;
use crate::properties::{self, PropertyMap, Props};
use crate::registry::ResourceDescriptor;

use super::{AppResource, size_threshold};

pub const TYPE: &str = "ram";

fn default_properties() -> PropertyMap {
    properties::object(json!({
        "build": "10M",
        "runtime": "10M",
        "include_swap": false,
    }))
}

fn build(properties: PropertyMap) -> Result<Box<dyn AppResource>> {
    Ok(Box::new(RamResource::from_properties(&properties)?))
}

pub(crate) fn descriptor() -> ResourceDescriptor {
    ResourceDescriptor::new(TYPE, default_properties, build)
}

#[derive(Debug)]
pub struct RamResource {
    required: u64,
    include_swap: bool,
}

impl RamResource {
    pub fn from_properties(properties: &PropertyMap) -> Result<Self> {
        let props = Props::new(TYPE, properties);
        let build = size_threshold(TYPE, "build", &props.str("build")?)?;
        let runtime = size_threshold(TYPE, "runtime", &props.str("runtime")?)?;
        Ok(Self {
            required: build.max(runtime),
            include_swap: props.bool("include_swap")?,
        })
    }
}

impl AppResource for RamResource {
    fn type_tag(&self) -> &'static str {
        TYPE
    }

    fn check_availability(&self, host: &HostServices<'_>, _ctx: &CheckContext<'_>) -> Result<()> {
        let mut available = host.mem.available_memory()?;
        if self.include_swap {
            available += host.mem.available_swap()?;
        }
        if available <= self.required {
            return Err(insufficient_memory(self.required, available));
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

    fn ram(build: &str, runtime: &str, include_swap: bool) -> RamResource {
        let properties = properties::object(json!({
            "build": build,
            "runtime": runtime,
            "include_swap": include_swap,
        }));
        RamResource::from_properties(&properties).unwrap()
    }

    fn check(resource: &RamResource, host: &FakeHost) -> Result<()> {
        let settings = Settings::new();
        let ctx = CheckContext {
            app_id: "myapp",
            settings: &settings,
        };
        resource.check_availability(&host.services(), &ctx)
    }

    #[test]
    fn test_requirement_is_max_of_build_and_runtime() {
        let host = FakeHost::new();
        host.set_available_memory(150 * 1024 * 1024);
        // build 100M, runtime 200M: 150M available is not enough
        assert!(check(&ram("100M", "200M", false), &host).is_err());
        assert!(check(&ram("100M", "100M", false), &host).is_ok());
    }

    #[test]
    fn test_boundary_memory_is_not_enough() {
        let host = FakeHost::new();
        host.set_available_memory(10 * 1024 * 1024);
        let err = check(&ram("10M", "10M", false), &host).unwrap_err();
        assert!(err.to_string().contains("Not enough memory"));
    }

    #[test]
    fn test_swap_counts_only_when_requested() {
        let host = FakeHost::new();
        host.set_available_memory(60 * 1024 * 1024);
        host.set_available_swap(60 * 1024 * 1024);
        assert!(check(&ram("100M", "100M", false), &host).is_err());
        assert!(check(&ram("100M", "100M", true), &host).is_ok());
    }

    #[test]
    fn test_rejects_non_boolean_include_swap() {
        let properties = properties::object(json!({
            "build": "10M",
            "runtime": "10M",
            "include_swap": "yes",
        }));
        let err = RamResource::from_properties(&properties).unwrap_err();
        assert!(err.to_string().contains("include_swap"));
    }
}
