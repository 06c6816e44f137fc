//! In-memory host backend for tests
//!
//! [`FakeHost`] implements every collaborator trait over plain maps and sets,
//! reproducing the same fail conditions as the real host. Mutating lifecycle
//! calls are appended to a journal so tests can assert ordering.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::error::{
    Result, conflicting_route, source_unreachable,
};

use super::{
    DatabaseAdmin, DbEngine, ExtraRepository, HostFilesystem, HostMemory, HostServices,
    PackageCatalog, PeerSettings, RouteEntry, RouteRegistry, SocketTable, SourceProbe,
    SystemAccounts, SystemUserSpec,
};

#[derive(Default)]
struct FakeState {
    free_space: BTreeMap<PathBuf, u64>,
    default_free_space: u64,
    paths: BTreeSet<PathBuf>,
    available_memory: u64,
    available_swap: u64,
    users: BTreeMap<String, SystemUserSpec>,
    groups: BTreeSet<String>,
    listening: BTreeSet<u16>,
    // (owning app, domain, path)
    claimed_routes: Vec<(String, String, String)>,
    route_entries: Vec<(String, RouteEntry)>,
    peer_ports: BTreeSet<u16>,
    installable: BTreeSet<String>,
    app_dependencies: BTreeMap<String, Vec<String>>,
    remote_artifacts: BTreeMap<String, Vec<u8>>,
    cached_artifacts: BTreeMap<(String, String), Vec<u8>>,
    engines: BTreeSet<DbEngine>,
    databases: BTreeSet<(DbEngine, String)>,
    journal: Vec<String>,
}

/// Fake host with builder-style mutators; see module docs.
#[derive(Default)]
pub struct FakeHost {
    state: Mutex<FakeState>,
}

impl FakeHost {
    pub fn new() -> Self {
        let host = Self::default();
        {
            let mut state = host.state_mut();
            // Generous defaults so tests only constrain what they assert on
            state.default_free_space = 500 * 1024 * 1024;
            state.available_memory = 500 * 1024 * 1024;
        }
        host
    }

    fn state_mut(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Collaborator bundle backed entirely by this fake
    pub fn services(&self) -> HostServices<'_> {
        HostServices {
            fs: self,
            mem: self,
            accounts: self,
            sockets: self,
            routes: self,
            peers: self,
            packages: self,
            sources: self,
            databases: self,
        }
    }

    pub fn set_free_space(&self, path: impl Into<PathBuf>, bytes: u64) {
        self.state_mut().free_space.insert(path.into(), bytes);
    }

    pub fn set_default_free_space(&self, bytes: u64) {
        self.state_mut().default_free_space = bytes;
    }

    pub fn set_available_memory(&self, bytes: u64) {
        self.state_mut().available_memory = bytes;
    }

    pub fn set_available_swap(&self, bytes: u64) {
        self.state_mut().available_swap = bytes;
    }

    pub fn add_path(&self, path: impl Into<PathBuf>) {
        self.state_mut().paths.insert(path.into());
    }

    pub fn add_user(&self, name: &str) {
        self.state_mut().users.insert(
            name.to_string(),
            SystemUserSpec {
                username: name.to_string(),
                home_dir: String::new(),
                use_shell: false,
                groups: Vec::new(),
            },
        );
    }

    pub fn add_group(&self, name: &str) {
        self.state_mut().groups.insert(name.to_string());
    }

    pub fn add_listening_port(&self, port: u16) {
        self.state_mut().listening.insert(port);
    }

    pub fn add_peer_port(&self, port: u16) {
        self.state_mut().peer_ports.insert(port);
    }

    pub fn claim_route(&self, app_id: &str, domain: &str, path: &str) {
        self.state_mut().claimed_routes.push((
            app_id.to_string(),
            domain.to_string(),
            path.to_string(),
        ));
    }

    pub fn add_installable_package(&self, name: &str) {
        self.state_mut().installable.insert(name.to_string());
    }

    pub fn add_remote_artifact(&self, url: &str, bytes: &[u8]) {
        self.state_mut()
            .remote_artifacts
            .insert(url.to_string(), bytes.to_vec());
    }

    pub fn add_cached_artifact(&self, app_id: &str, name: &str, bytes: &[u8]) {
        self.state_mut()
            .cached_artifacts
            .insert((app_id.to_string(), name.to_string()), bytes.to_vec());
    }

    pub fn add_engine(&self, engine: DbEngine) {
        self.state_mut().engines.insert(engine);
    }

    pub fn add_database(&self, engine: DbEngine, name: &str) {
        self.state_mut().databases.insert((engine, name.to_string()));
    }

    // Observers

    pub fn journal(&self) -> Vec<String> {
        self.state_mut().journal.clone()
    }

    pub fn has_user(&self, name: &str) -> bool {
        self.state_mut().users.contains_key(name)
    }

    pub fn has_group(&self, name: &str) -> bool {
        self.state_mut().groups.contains(name)
    }

    pub fn has_path(&self, path: impl AsRef<Path>) -> bool {
        self.state_mut().paths.contains(path.as_ref())
    }

    pub fn has_database(&self, engine: DbEngine, name: &str) -> bool {
        self.state_mut()
            .databases
            .contains(&(engine, name.to_string()))
    }

    pub fn route_entries(&self) -> Vec<(String, RouteEntry)> {
        self.state_mut().route_entries.clone()
    }

    pub fn app_dependencies(&self, app_id: &str) -> Option<Vec<String>> {
        self.state_mut().app_dependencies.get(app_id).cloned()
    }

    pub fn cached_artifact_bytes(&self, app_id: &str, name: &str) -> Option<Vec<u8>> {
        self.state_mut()
            .cached_artifacts
            .get(&(app_id.to_string(), name.to_string()))
            .cloned()
    }

    fn log(&self, entry: impl Into<String>) {
        self.state_mut().journal.push(entry.into());
    }
}

// Two URL paths overlap when one is the other or an ancestor of the other.
// "/" claims the whole domain.
fn paths_overlap(a: &str, b: &str) -> bool {
    let trim = |p: &str| {
        let t = p.trim_end_matches('/');
        if t.is_empty() { "/".to_string() } else { t.to_string() }
    };
    let a = trim(a);
    let b = trim(b);
    a == "/"
        || b == "/"
        || a == b
        || a.starts_with(&format!("{b}/"))
        || b.starts_with(&format!("{a}/"))
}

impl HostFilesystem for FakeHost {
    fn free_space(&self, path: &Path) -> Result<u64> {
        let state = self.state_mut();
        Ok(state
            .free_space
            .get(path)
            .copied()
            .unwrap_or(state.default_free_space))
    }

    fn exists(&self, path: &Path) -> bool {
        self.state_mut().paths.contains(path)
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        self.log(format!("mkdir {}", path.display()));
        self.state_mut().paths.insert(path.to_path_buf());
        Ok(())
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        self.log(format!("rmdir {}", path.display()));
        self.state_mut().paths.remove(path);
        Ok(())
    }
}

impl HostMemory for FakeHost {
    fn available_memory(&self) -> Result<u64> {
        Ok(self.state_mut().available_memory)
    }

    fn available_swap(&self) -> Result<u64> {
        Ok(self.state_mut().available_swap)
    }
}

impl SystemAccounts for FakeHost {
    fn user_exists(&self, name: &str) -> Result<bool> {
        Ok(self.state_mut().users.contains_key(name))
    }

    fn group_exists(&self, name: &str) -> Result<bool> {
        Ok(self.state_mut().groups.contains(name))
    }

    fn create_system_user(&self, spec: &SystemUserSpec) -> Result<()> {
        self.log(format!("useradd {}", spec.username));
        let mut state = self.state_mut();
        state.users.insert(spec.username.clone(), spec.clone());
        // System accounts get a same-named primary group
        state.groups.insert(spec.username.clone());
        Ok(())
    }

    fn set_user_groups(&self, name: &str, groups: &[String]) -> Result<()> {
        self.log(format!("usermod {name}"));
        if let Some(user) = self.state_mut().users.get_mut(name) {
            user.groups = groups.to_vec();
        }
        Ok(())
    }

    fn delete_system_user(&self, name: &str) -> Result<()> {
        self.log(format!("userdel {name}"));
        self.state_mut().users.remove(name);
        Ok(())
    }

    fn delete_group(&self, name: &str) -> Result<()> {
        self.log(format!("groupdel {name}"));
        self.state_mut().groups.remove(name);
        Ok(())
    }
}

impl SocketTable for FakeHost {
    fn listening_ports(&self) -> Result<BTreeSet<u16>> {
        Ok(self.state_mut().listening.clone())
    }
}

impl RouteRegistry for FakeHost {
    fn assert_no_conflict(&self, domain: &str, path: &str, ignore_app: &str) -> Result<()> {
        let state = self.state_mut();
        for (app, claimed_domain, claimed_path) in &state.claimed_routes {
            if app != ignore_app && claimed_domain == domain && paths_overlap(claimed_path, path) {
                return Err(conflicting_route(domain, path, app.clone()));
            }
        }
        Ok(())
    }

    fn register_default_entry(&self, app_id: &str, entry: &RouteEntry) -> Result<()> {
        self.log(format!("route-register {app_id}"));
        self.state_mut()
            .route_entries
            .push((app_id.to_string(), entry.clone()));
        Ok(())
    }

    fn remove_entries(&self, app_id: &str) -> Result<()> {
        self.log(format!("route-remove {app_id}"));
        self.state_mut()
            .route_entries
            .retain(|(app, _)| app != app_id);
        Ok(())
    }

    fn synchronize(&self) -> Result<()> {
        self.log("route-sync");
        Ok(())
    }
}

impl PeerSettings for FakeHost {
    fn ports_claimed_by_others(&self, _app_id: &str) -> Result<BTreeSet<u16>> {
        Ok(self.state_mut().peer_ports.clone())
    }
}

impl PackageCatalog for FakeHost {
    fn installable(&self, package: &str) -> Result<bool> {
        Ok(self.state_mut().installable.contains(package))
    }

    fn ensure_app_dependencies(
        &self,
        app_id: &str,
        packages: &[String],
        _extras: &[ExtraRepository],
    ) -> Result<()> {
        self.log(format!("apt-ensure {app_id}"));
        self.state_mut()
            .app_dependencies
            .insert(app_id.to_string(), packages.to_vec());
        Ok(())
    }

    fn remove_app_dependencies(&self, app_id: &str) -> Result<()> {
        self.log(format!("apt-remove {app_id}"));
        self.state_mut().app_dependencies.remove(app_id);
        Ok(())
    }
}

impl SourceProbe for FakeHost {
    fn probe(&self, url: &str) -> Result<()> {
        let state = self.state_mut();
        if state.remote_artifacts.contains_key(url) {
            Ok(())
        } else {
            Err(source_unreachable(url, "no such remote artifact"))
        }
    }

    fn cached_artifact(&self, app_id: &str, name: &str) -> Result<Option<Vec<u8>>> {
        Ok(self
            .state_mut()
            .cached_artifacts
            .get(&(app_id.to_string(), name.to_string()))
            .cloned())
    }

    fn fetch(&self, app_id: &str, name: &str, url: &str) -> Result<Vec<u8>> {
        self.log(format!("fetch {url}"));
        let bytes = self
            .state_mut()
            .remote_artifacts
            .get(url)
            .cloned()
            .ok_or_else(|| source_unreachable(url, "no such remote artifact"))?;
        self.state_mut()
            .cached_artifacts
            .insert((app_id.to_string(), name.to_string()), bytes.clone());
        Ok(bytes)
    }

    fn evict(&self, app_id: &str) -> Result<()> {
        self.log(format!("evict {app_id}"));
        self.state_mut()
            .cached_artifacts
            .retain(|(app, _), _| app != app_id);
        Ok(())
    }
}

impl DatabaseAdmin for FakeHost {
    fn engine_available(&self, engine: DbEngine) -> Result<bool> {
        Ok(self.state_mut().engines.contains(&engine))
    }

    fn database_exists(&self, engine: DbEngine, name: &str) -> Result<bool> {
        Ok(self
            .state_mut()
            .databases
            .contains(&(engine, name.to_string())))
    }

    fn create_database(
        &self,
        engine: DbEngine,
        name: &str,
        _user: &str,
        _password: &str,
    ) -> Result<()> {
        self.log(format!("db-create {name}"));
        self.state_mut().databases.insert((engine, name.to_string()));
        Ok(())
    }

    fn drop_database(&self, engine: DbEngine, name: &str, _user: &str) -> Result<()> {
        self.log(format!("db-drop {name}"));
        self.state_mut()
            .databases
            .remove(&(engine, name.to_string()));
        Ok(())
    }
}
