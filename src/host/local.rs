//! Local Linux host backend
//!
//! Implements the OS-owned collaborator traits against the running system:
//! free space via `statvfs`, memory via `/proc/meminfo`, listening sockets via
//! `/proc/net`, accounts via `getent`/`useradd`, and source probing via
//! blocking HTTP requests with an on-disk artifact cache.
//!
//! The platform-internal collaborators (`RouteRegistry`, `PeerSettings`,
//! `PackageCatalog`, `DatabaseAdmin`) are not provided here; the embedding
//! platform supplies them alongside a `LocalHost` when assembling
//! [`HostServices`](super::HostServices).

use std::ffi::CString;
use std::fs;
use std::io::Read;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::error::{Result, host_io, source_unreachable};

use super::{HostFilesystem, HostMemory, SocketTable, SourceProbe, SystemAccounts, SystemUserSpec};

/// Host backend talking to the local Linux system
pub struct LocalHost {
    source_cache: PathBuf,
}

impl LocalHost {
    /// `source_cache` is the directory holding predownloaded source artifacts,
    /// one subdirectory per app.
    pub fn new(source_cache: impl Into<PathBuf>) -> Self {
        Self {
            source_cache: source_cache.into(),
        }
    }

    fn artifact_path(&self, app_id: &str, name: &str) -> PathBuf {
        self.source_cache.join(app_id).join(name)
    }

    fn http_client(&self) -> Result<reqwest::blocking::Client> {
        reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .map_err(|e| host_io("http client", e))
    }
}

fn run_status(what: &str, cmd: &mut Command) -> Result<bool> {
    let output = cmd.output().map_err(|e| host_io(what, e))?;
    Ok(output.status.success())
}

fn run_checked(what: &str, cmd: &mut Command) -> Result<()> {
    let output = cmd.output().map_err(|e| host_io(what, e))?;
    if output.status.success() {
        Ok(())
    } else {
        Err(host_io(what, String::from_utf8_lossy(&output.stderr).trim()))
    }
}

/// Value of a `/proc/meminfo` field in bytes (the file reports kB).
fn meminfo_field(content: &str, key: &str) -> Option<u64> {
    content.lines().find_map(|line| {
        let rest = line.strip_prefix(key)?.strip_prefix(':')?;
        let kb: u64 = rest.trim().trim_end_matches("kB").trim().parse().ok()?;
        Some(kb * 1024)
    })
}

/// Local ports from one `/proc/net/{tcp,tcp6,udp,udp6}` table.
///
/// For TCP only sockets in LISTEN state (0A) count; UDP sockets are counted
/// whenever bound.
fn socket_table_ports(content: &str, tcp: bool) -> Vec<u16> {
    content
        .lines()
        .skip(1)
        .filter_map(|line| {
            let mut fields = line.split_whitespace();
            let _sl = fields.next()?;
            let local = fields.next()?;
            let _remote = fields.next()?;
            let state = fields.next()?;
            if tcp && state != "0A" {
                return None;
            }
            let port_hex = local.rsplit(':').next()?;
            u16::from_str_radix(port_hex, 16).ok()
        })
        .collect()
}

impl HostFilesystem for LocalHost {
    fn free_space(&self, path: &Path) -> Result<u64> {
        let what = format!("statvfs {}", path.display());
        let c_path =
            CString::new(path.as_os_str().as_bytes()).map_err(|e| host_io(&what, e))?;
        let mut stat: libc::statvfs = unsafe { std::mem::zeroed() };
        let rc = unsafe { libc::statvfs(c_path.as_ptr(), &mut stat) };
        if rc != 0 {
            return Err(host_io(&what, std::io::Error::last_os_error()));
        }
        #[allow(clippy::unnecessary_cast)]
        Ok(stat.f_bavail as u64 * stat.f_frsize as u64)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn create_dir_all(&self, path: &Path) -> Result<()> {
        fs::create_dir_all(path).map_err(|e| host_io(format!("mkdir {}", path.display()), e))
    }

    fn remove_dir_all(&self, path: &Path) -> Result<()> {
        fs::remove_dir_all(path).map_err(|e| host_io(format!("rmdir {}", path.display()), e))
    }
}

impl HostMemory for LocalHost {
    fn available_memory(&self) -> Result<u64> {
        let content =
            fs::read_to_string("/proc/meminfo").map_err(|e| host_io("read /proc/meminfo", e))?;
        meminfo_field(&content, "MemAvailable")
            .ok_or_else(|| host_io("read /proc/meminfo", "no MemAvailable field"))
    }

    fn available_swap(&self) -> Result<u64> {
        let content =
            fs::read_to_string("/proc/meminfo").map_err(|e| host_io("read /proc/meminfo", e))?;
        meminfo_field(&content, "SwapFree")
            .ok_or_else(|| host_io("read /proc/meminfo", "no SwapFree field"))
    }
}

impl SocketTable for LocalHost {
    fn listening_ports(&self) -> Result<std::collections::BTreeSet<u16>> {
        let mut ports = std::collections::BTreeSet::new();
        for (table, tcp) in [
            ("/proc/net/tcp", true),
            ("/proc/net/tcp6", true),
            ("/proc/net/udp", false),
            ("/proc/net/udp6", false),
        ] {
            // Tables may be absent when the protocol is disabled
            if let Ok(content) = fs::read_to_string(table) {
                ports.extend(socket_table_ports(&content, tcp));
            }
        }
        Ok(ports)
    }
}

impl SystemAccounts for LocalHost {
    fn user_exists(&self, name: &str) -> Result<bool> {
        run_status("getent passwd", Command::new("getent").args(["passwd", name]))
    }

    fn group_exists(&self, name: &str) -> Result<bool> {
        run_status("getent group", Command::new("getent").args(["group", name]))
    }

    fn create_system_user(&self, spec: &SystemUserSpec) -> Result<()> {
        let shell = if spec.use_shell {
            "/bin/bash"
        } else {
            "/usr/sbin/nologin"
        };
        let mut cmd = Command::new("useradd");
        cmd.args([
            "--system",
            "--user-group",
            "--home-dir",
            &spec.home_dir,
            "--shell",
            shell,
        ]);
        if !spec.groups.is_empty() {
            cmd.args(["--groups", &spec.groups.join(",")]);
        }
        cmd.arg(&spec.username);
        run_checked("useradd", &mut cmd)
    }

    fn set_user_groups(&self, name: &str, groups: &[String]) -> Result<()> {
        run_checked(
            "usermod",
            Command::new("usermod").args(["--groups", &groups.join(","), name]),
        )
    }

    fn delete_system_user(&self, name: &str) -> Result<()> {
        run_checked("userdel", Command::new("userdel").arg(name))
    }

    fn delete_group(&self, name: &str) -> Result<()> {
        run_checked("groupdel", Command::new("groupdel").arg(name))
    }
}

impl SourceProbe for LocalHost {
    fn probe(&self, url: &str) -> Result<()> {
        let response = self
            .http_client()?
            .head(url)
            .send()
            .map_err(|e| source_unreachable(url, e.to_string()))?;
        if response.status().is_success() {
            Ok(())
        } else {
            Err(source_unreachable(
                url,
                format!("HTTP {}", response.status()),
            ))
        }
    }

    fn cached_artifact(&self, app_id: &str, name: &str) -> Result<Option<Vec<u8>>> {
        let path = self.artifact_path(app_id, name);
        if !path.exists() {
            return Ok(None);
        }
        fs::read(&path)
            .map(Some)
            .map_err(|e| host_io(format!("read {}", path.display()), e))
    }

    fn fetch(&self, app_id: &str, name: &str, url: &str) -> Result<Vec<u8>> {
        let mut response = self
            .http_client()?
            .get(url)
            .send()
            .map_err(|e| source_unreachable(url, e.to_string()))?;
        if !response.status().is_success() {
            return Err(source_unreachable(
                url,
                format!("HTTP {}", response.status()),
            ));
        }
        let mut bytes = Vec::new();
        response
            .read_to_end(&mut bytes)
            .map_err(|e| source_unreachable(url, e.to_string()))?;

        let path = self.artifact_path(app_id, name);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| host_io(format!("mkdir {}", parent.display()), e))?;
        }
        fs::write(&path, &bytes).map_err(|e| host_io(format!("write {}", path.display()), e))?;
        Ok(bytes)
    }

    fn evict(&self, app_id: &str) -> Result<()> {
        let dir = self.source_cache.join(app_id);
        if dir.exists() {
            fs::remove_dir_all(&dir).map_err(|e| host_io(format!("rmdir {}", dir.display()), e))?;
        }
        Ok(())
    }
}
