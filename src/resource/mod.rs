//! Resource variants and their lifecycle contract
//!
//! Each variant pairs a typed configuration struct, validated at construction
//! from the merged property map, with the [`AppResource`] lifecycle
//! implementation. Availability checks are read-only; provisioning mutates
//! host state and the app's settings and must be idempotent across upgrades.

pub mod apt;
pub mod data_dir;
pub mod database;
pub mod disk;
pub mod install_dir;
pub mod port;
pub mod ram;
pub mod routes;
pub mod sources;
pub mod system_user;

use crate::context::{CheckContext, ProvisioningContext};
use crate::error::{Result, invalid_size_token};
use crate::host::HostServices;
use crate::size;

/// One configured resource belonging to one application
pub trait AppResource {
    /// The resource type's identity tag
    fn type_tag(&self) -> &'static str;

    /// Read-only preflight: can this requirement be satisfied on this host?
    /// Must not mutate host state or settings.
    fn check_availability(&self, host: &HostServices<'_>, ctx: &CheckContext<'_>) -> Result<()> {
        let _ = (host, ctx);
        Ok(())
    }

    /// Create or update host/state artifacts satisfying this resource.
    /// Safe to call repeatedly for the same app.
    fn provision_or_update(
        &self,
        host: &HostServices<'_>,
        ctx: &mut ProvisioningContext<'_>,
    ) -> Result<()> {
        let _ = (host, ctx);
        Ok(())
    }

    /// Reverse provisioning during removal.
    fn deprovision(
        &self,
        host: &HostServices<'_>,
        ctx: &mut ProvisioningContext<'_>,
    ) -> Result<()> {
        let _ = (host, ctx);
        Ok(())
    }
}

/// Resolve a size token property to its byte threshold.
pub(crate) fn size_threshold(type_tag: &'static str, property: &str, token: &str) -> Result<u64> {
    size::threshold(token).ok_or_else(|| invalid_size_token(type_tag, property, token))
}
