//! Network port resource
//!
//! Selects a free port for the app and records it in settings. A previously
//! committed port is never reassigned; candidates are scanned upward from the
//! declared starting value and accepted only when neither listed in the host's
//! listening sockets nor claimed by another app's persisted settings.

use serde_json::json;

use crate::context::ProvisioningContext;
use crate::error::{Result, invalid_property, port_exhausted};
use crate::host::HostServices;
use crate::properties::{self, PropertyMap, Props};
use crate::registry::ResourceDescriptor;

use super::AppResource;

pub const TYPE: &str = "port";

fn default_properties() -> PropertyMap {
    properties::object(json!({ "value": 1000 }))
}

fn build(properties: PropertyMap) -> Result<Box<dyn AppResource>> {
    Ok(Box::new(PortResource::from_properties(&properties)?))
}

pub(crate) fn descriptor() -> ResourceDescriptor {
    ResourceDescriptor::new(TYPE, default_properties, build)
}

#[derive(Debug)]
pub struct PortResource {
    first: u16,
}

impl PortResource {
    pub fn from_properties(properties: &PropertyMap) -> Result<Self> {
        let props = Props::new(TYPE, properties);
        let value = props.u64("value")?;
        let first = u16::try_from(value)
            .ok()
            .filter(|p| *p > 0)
            .ok_or_else(|| invalid_property(TYPE, "value", "expected a port number 1-65535"))?;
        Ok(Self { first })
    }
}

impl AppResource for PortResource {
    fn type_tag(&self) -> &'static str {
        TYPE
    }

    fn provision_or_update(
        &self,
        host: &HostServices<'_>,
        ctx: &mut ProvisioningContext<'_>,
    ) -> Result<()> {
        // A committed port is never reassigned, even if lower ports freed up
        if ctx.settings.get_u64("port").is_some() {
            return Ok(());
        }

        let listening = host.sockets.listening_ports()?;
        let claimed = host.peers.ports_claimed_by_others(ctx.app_id)?;

        let mut candidate = self.first;
        loop {
            if !listening.contains(&candidate) && !claimed.contains(&candidate) {
                break;
            }
            candidate = candidate
                .checked_add(1)
                .ok_or_else(|| port_exhausted(self.first))?;
        }

        ctx.settings.set("port", u64::from(candidate));
        Ok(())
    }

    fn deprovision(
        &self,
        _host: &HostServices<'_>,
        ctx: &mut ProvisioningContext<'_>,
    ) -> Result<()> {
        // Nothing is held at the OS level; releasing the reservation means
        // clearing the recorded value so the port becomes selectable again.
        ctx.settings.remove("port");
        Ok(())
    }
}
