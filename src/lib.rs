//! Homestead provisions the system resources a self-hosted app needs: disk
//! and memory preflight, system account, install and data directories, a free
//! port, web routes, package dependencies, upstream sources and a database.
//!
//! The embedding platform parses an app manifest into an ordered mapping of
//! resource declarations, builds an [`AppResourceSet`] through the
//! [`ResourceTypeRegistry`], and drives the lifecycle:
//!
//! - [`AppResourceSet::check_availability`] is a read-only preflight that
//!   reports every unsatisfiable requirement at once;
//! - [`AppResourceSet::apply`] provisions in declared order for install,
//!   upgrade and restore, and tears down in reverse order for remove, with
//!   rollback of the applied prefix when a step fails mid-pass.
//!
//! All host and platform state is reached through the trait bundle in
//! [`host::HostServices`], so every collaborator can be substituted with the
//! in-memory [`host::fake::FakeHost`] in tests.
//!
//! Execution within one set is strictly sequential; later resources may read
//! settings written by earlier ones. Port and system-user selection read
//! host state shared across all apps, so the caller must serialize
//! provisioning passes across apps (one global provisioning lock).

pub mod context;
pub mod error;
pub mod host;
pub mod properties;
pub mod registry;
pub mod resource;
pub mod set;
pub mod settings;
pub mod size;

pub use context::{AppAction, CheckContext, ProvisioningContext};
pub use error::{HomesteadError, Result};
pub use host::HostServices;
pub use properties::PropertyMap;
pub use registry::{ResourceDescriptor, ResourceTypeRegistry};
pub use set::{AppResourceSet, ApplyOptions};
pub use settings::Settings;
