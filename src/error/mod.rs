//! Error types and handling for Homestead
//!
//! Uses `thiserror` for error definitions and `miette` for pretty diagnostics.
//!
//! Errors fall into two kinds: validation errors raised at construction or
//! availability time, which must abort an action before any host mutation, and
//! provisioning errors raised while mutating host state.
//! [`HomesteadError::is_validation`] tells them apart.
//!
//! This module is organized into sub-modules by error kind:
//! - [`validation`]: configuration and availability errors
//! - [`provision`]: provisioning/deprovisioning errors

pub mod provision;
pub mod validation;

// Re-export convenience constructors from submodules
#[allow(unused_imports)]
pub use provision::{
    checksum_mismatch, deprovision_failed, host_io, port_exhausted, provision_failed,
};
#[allow(unused_imports)]
pub use validation::{
    conflicting_route, dir_already_exists, engine_unavailable, group_already_exists,
    insufficient_memory, insufficient_space, invalid_property, invalid_size_token,
    missing_setting, package_unavailable, source_unreachable, stale_cached_artifact,
    unknown_resource_type, user_already_exists,
};

use miette::Diagnostic;
use thiserror::Error;

/// One resource's failed availability check, collected into
/// [`HomesteadError::ResourcesUnavailable`].
#[derive(Debug)]
pub struct AvailabilityFailure {
    /// Type tag of the failing resource
    pub type_tag: String,
    /// The underlying error
    pub error: Box<HomesteadError>,
}

fn render_failures(failures: &[AvailabilityFailure]) -> String {
    failures
        .iter()
        .map(|f| format!("{}: {}", f.type_tag, f.error))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Main error type for Homestead operations
#[derive(Error, Diagnostic, Debug)]
pub enum HomesteadError {
    // Registry / configuration errors
    #[error("Unknown resource type: {tag}")]
    #[diagnostic(
        code(homestead::registry::unknown_type),
        help(
            "Known types: disk, ram, apt, sources, routes, port, system_user, install_dir, data_dir, db"
        )
    )]
    UnknownResourceType { tag: String },

    #[error("Invalid '{property}' property for {type_tag} resource: {reason}")]
    #[diagnostic(code(homestead::resource::invalid_property))]
    InvalidProperty {
        type_tag: String,
        property: String,
        reason: String,
    },

    #[error("Invalid size token '{token}' for {type_tag}.{property}")]
    #[diagnostic(
        code(homestead::resource::invalid_size_token),
        help("Valid tokens range from 10M to 80G, e.g. 10M, 200M, 1G, 80G")
    )]
    InvalidSizeToken {
        type_tag: String,
        property: String,
        token: String,
    },

    #[error("App settings have no '{key}' key")]
    #[diagnostic(code(homestead::settings::missing_key))]
    MissingSetting { key: String },

    // Availability errors
    #[error("Not enough space on {mount}: {required} bytes required, {available} available")]
    #[diagnostic(code(homestead::disk::insufficient_space))]
    InsufficientSpace {
        mount: String,
        required: u64,
        available: u64,
    },

    #[error("Not enough memory: {required} bytes required, {available} available")]
    #[diagnostic(code(homestead::ram::insufficient_memory))]
    InsufficientMemory { required: u64, available: u64 },

    #[error("Route {domain}{path} conflicts with app '{held_by}'")]
    #[diagnostic(
        code(homestead::routes::conflict),
        help("Pick another path or domain for the app, or remove the conflicting app")
    )]
    ConflictingRoute {
        domain: String,
        path: String,
        held_by: String,
    },

    #[error("System user '{username}' already exists")]
    #[diagnostic(code(homestead::system_user::user_exists))]
    UserAlreadyExists { username: String },

    #[error("System group '{username}' already exists")]
    #[diagnostic(code(homestead::system_user::group_exists))]
    GroupAlreadyExists { username: String },

    #[error("Directory {path} already exists")]
    #[diagnostic(code(homestead::dir::already_exists))]
    DirAlreadyExists { path: String },

    #[error("Package '{package}' is not installable from the configured repositories")]
    #[diagnostic(code(homestead::apt::package_unavailable))]
    PackageUnavailable { package: String },

    #[error("Source URL {url} is not reachable: {reason}")]
    #[diagnostic(code(homestead::sources::unreachable))]
    SourceUnreachable { url: String, reason: String },

    #[error(
        "Cached artifact for {url} does not match its recorded checksum: expected {expected}, got {actual}"
    )]
    #[diagnostic(
        code(homestead::sources::stale_artifact),
        help("Evict the app's cached artifacts or update the recorded sha256sum")
    )]
    StaleCachedArtifact {
        url: String,
        expected: String,
        actual: String,
    },

    #[error("Database engine '{engine}' is not installed or not reachable")]
    #[diagnostic(code(homestead::db::engine_unavailable))]
    EngineUnavailable { engine: String },

    #[error("{} resource(s) failed availability checks: {}", failures.len(), render_failures(failures))]
    #[diagnostic(code(homestead::set::resources_unavailable))]
    ResourcesUnavailable { failures: Vec<AvailabilityFailure> },

    // Provisioning errors
    #[error("No free port found scanning upward from {first}")]
    #[diagnostic(code(homestead::port::exhausted))]
    PortExhausted { first: u16 },

    #[error("Checksum mismatch for {url}: expected {expected}, got {actual}")]
    #[diagnostic(
        code(homestead::sources::checksum_mismatch),
        help("The upstream artifact changed; update the recorded sha256sum in the manifest")
    )]
    ChecksumMismatch {
        url: String,
        expected: String,
        actual: String,
    },

    #[error("Failed to provision {type_tag} resource: {reason}")]
    #[diagnostic(code(homestead::resource::provision_failed))]
    ProvisionFailed { type_tag: String, reason: String },

    #[error("Failed to deprovision {type_tag} resource: {reason}")]
    #[diagnostic(code(homestead::resource::deprovision_failed))]
    DeprovisionFailed { type_tag: String, reason: String },

    #[error("{type_tag} lifecycle call exceeded its {budget_secs}s budget ({elapsed_secs}s)")]
    #[diagnostic(
        code(homestead::set::lifecycle_timeout),
        help("The host operation blocked for too long; treat the app's state as suspect")
    )]
    LifecycleTimeout {
        type_tag: String,
        elapsed_secs: u64,
        budget_secs: u64,
    },

    #[error("Host operation '{operation}' failed: {reason}")]
    #[diagnostic(code(homestead::host::io))]
    HostIo { operation: String, reason: String },
}

impl HomesteadError {
    /// Whether this error was raised before any host mutation (bad
    /// configuration, insufficient capacity, existing conflicting resource).
    pub fn is_validation(&self) -> bool {
        !matches!(
            self,
            Self::PortExhausted { .. }
                | Self::ChecksumMismatch { .. }
                | Self::ProvisionFailed { .. }
                | Self::DeprovisionFailed { .. }
                | Self::LifecycleTimeout { .. }
                | Self::HostIo { .. }
        )
    }
}

/// Result type alias using miette for error handling
pub type Result<T> = miette::Result<T, HomesteadError>;
