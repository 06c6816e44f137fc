//! Host and platform collaborator interfaces
//!
//! Every interaction with shared host state goes through one of these traits,
//! so the same fail conditions can be reproduced with in-memory fakes in tests
//! ([`fake::FakeHost`]) and backed by the real OS in production
//! ([`local::LocalHost`] for the OS-owned subset; route, peer-settings and
//! database collaborators are supplied by the embedding platform).

use std::collections::BTreeSet;
use std::fmt;
use std::path::Path;

use crate::error::Result;

pub mod fake;
pub mod local;

/// Filesystem queries and directory mutation
pub trait HostFilesystem {
    /// Bytes available to unprivileged writers at `path`
    fn free_space(&self, path: &Path) -> Result<u64>;
    fn exists(&self, path: &Path) -> bool;
    fn create_dir_all(&self, path: &Path) -> Result<()>;
    fn remove_dir_all(&self, path: &Path) -> Result<()>;
}

/// Memory and swap availability
pub trait HostMemory {
    fn available_memory(&self) -> Result<u64>;
    fn available_swap(&self) -> Result<u64>;
}

/// What to create for an app's system account
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemUserSpec {
    pub username: String,
    pub home_dir: String,
    pub use_shell: bool,
    pub groups: Vec<String>,
}

/// OS account and group store
pub trait SystemAccounts {
    fn user_exists(&self, name: &str) -> Result<bool>;
    fn group_exists(&self, name: &str) -> Result<bool>;
    fn create_system_user(&self, spec: &SystemUserSpec) -> Result<()>;
    /// Reconcile supplementary group memberships for an existing account
    fn set_user_groups(&self, name: &str, groups: &[String]) -> Result<()>;
    fn delete_system_user(&self, name: &str) -> Result<()>;
    fn delete_group(&self, name: &str) -> Result<()>;
}

/// Currently listening sockets on the host
pub trait SocketTable {
    fn listening_ports(&self) -> Result<BTreeSet<u16>>;
}

/// Default access-control entry registered for an app's main route
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteEntry {
    pub url: String,
    pub additional_urls: Vec<String>,
    pub allowed: Vec<String>,
    pub show_tile: bool,
    pub protected: bool,
    pub auth_header: bool,
    pub label: String,
}

/// Web route conflict detection and access-control registration
pub trait RouteRegistry {
    /// Fails with `ConflictingRoute` when another app claims an overlapping
    /// domain+path.
    fn assert_no_conflict(&self, domain: &str, path: &str, ignore_app: &str) -> Result<()>;
    fn register_default_entry(&self, app_id: &str, entry: &RouteEntry) -> Result<()>;
    fn remove_entries(&self, app_id: &str) -> Result<()>;
    /// Push pending access-control changes out to the enforcement layer
    fn synchronize(&self) -> Result<()>;
}

/// Read access to other apps' persisted settings
pub trait PeerSettings {
    /// Ports recorded as `port` in any app's settings other than `app_id`'s
    fn ports_claimed_by_others(&self, app_id: &str) -> Result<BTreeSet<u16>>;
}

/// An additional package repository declared by an apt resource
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtraRepository {
    pub repo: String,
    pub key: String,
    pub packages: String,
}

/// System package repository queries and app dependency management
pub trait PackageCatalog {
    fn installable(&self, package: &str) -> Result<bool>;
    /// Create or update the app's dependency meta-package
    fn ensure_app_dependencies(
        &self,
        app_id: &str,
        packages: &[String],
        extras: &[ExtraRepository],
    ) -> Result<()>;
    fn remove_app_dependencies(&self, app_id: &str) -> Result<()>;
}

/// Reachability probing and artifact caching for declared download sources
pub trait SourceProbe {
    /// Lightweight existence check of `url` (HEAD or equivalent)
    fn probe(&self, url: &str) -> Result<()>;
    /// Cached artifact bytes for `(app_id, name)`, if previously fetched
    fn cached_artifact(&self, app_id: &str, name: &str) -> Result<Option<Vec<u8>>>;
    /// Download `url` into the cache under `(app_id, name)` and return the bytes
    fn fetch(&self, app_id: &str, name: &str, url: &str) -> Result<Vec<u8>>;
    /// Drop every cached artifact belonging to `app_id`
    fn evict(&self, app_id: &str) -> Result<()>;
}

/// Supported database engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum DbEngine {
    Mysql,
    Postgresql,
}

impl fmt::Display for DbEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Mysql => "mysql",
            Self::Postgresql => "postgresql",
        })
    }
}

/// Database engine administration
pub trait DatabaseAdmin {
    fn engine_available(&self, engine: DbEngine) -> Result<bool>;
    fn database_exists(&self, engine: DbEngine, name: &str) -> Result<bool>;
    fn create_database(&self, engine: DbEngine, name: &str, user: &str, password: &str)
    -> Result<()>;
    fn drop_database(&self, engine: DbEngine, name: &str, user: &str) -> Result<()>;
}

/// Bundle of collaborator references handed to every lifecycle call
#[derive(Clone, Copy)]
pub struct HostServices<'a> {
    pub fs: &'a dyn HostFilesystem,
    pub mem: &'a dyn HostMemory,
    pub accounts: &'a dyn SystemAccounts,
    pub sockets: &'a dyn SocketTable,
    pub routes: &'a dyn RouteRegistry,
    pub peers: &'a dyn PeerSettings,
    pub packages: &'a dyn PackageCatalog,
    pub sources: &'a dyn SourceProbe,
    pub databases: &'a dyn DatabaseAdmin,
}
