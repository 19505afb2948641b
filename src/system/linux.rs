use super::procfs::{self, has_display, parse_net_table, parse_stat, socket_inode};
use super::{Endpoint, Environment, ProcessControl, ProcessInfo, SystemProbe};
use crate::config::VersionSource;
use crate::error::ProcessError;
use nix::errno::Errno;
use nix::sys::signal::{kill, Signal};
use nix::unistd::Pid;
use std::collections::HashMap;
use std::os::unix::process::CommandExt;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// /proc-backed probe and POSIX-signal process control.
#[derive(Debug, Clone)]
pub struct LinuxSystem {
    proc_root: PathBuf,
}

impl Default for LinuxSystem {
    fn default() -> Self {
        Self {
            proc_root: PathBuf::from("/proc"),
        }
    }
}

impl LinuxSystem {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_process(&self, pid: i32) -> Option<ProcessInfo> {
        let dir = self.proc_root.join(pid.to_string());
        let stat = std::fs::read_to_string(dir.join("stat")).ok()?;
        let (comm, state) = parse_stat(&stat)?;
        if state == 'Z' || state == 'X' {
            return None;
        }
        // An updated binary leaves the old inode behind as "<path> (deleted)".
        let exe = std::fs::read_link(dir.join("exe")).ok().map(|p| {
            let live = p
                .to_str()
                .and_then(|s| s.strip_suffix(" (deleted)"))
                .map(PathBuf::from);
            live.unwrap_or(p)
        });
        let closable = std::fs::read(dir.join("environ"))
            .map(|env| has_display(&env))
            .unwrap_or(false);
        Some(ProcessInfo {
            pid,
            name: comm.to_string(),
            exe,
            closable,
        })
    }

    fn socket_inodes(&self, pid: i32) -> Vec<u64> {
        let fd_dir = self.proc_root.join(pid.to_string()).join("fd");
        let Ok(entries) = std::fs::read_dir(fd_dir) else {
            return Vec::new();
        };
        entries
            .flatten()
            .filter_map(|e| std::fs::read_link(e.path()).ok())
            .filter_map(|link| socket_inode(&link.to_string_lossy()))
            .collect()
    }
}

impl SystemProbe for LinuxSystem {
    fn processes(&self) -> std::io::Result<Vec<ProcessInfo>> {
        let own = std::process::id() as i32;
        let mut out = Vec::new();
        for entry in std::fs::read_dir(&self.proc_root)?.flatten() {
            let Some(pid) = entry
                .file_name()
                .to_str()
                .and_then(|n| n.parse::<i32>().ok())
            else {
                continue;
            };
            if pid == own {
                continue;
            }
            // Processes can exit between listing and reading; skip those.
            if let Some(info) = self.read_process(pid) {
                out.push(info);
            }
        }
        Ok(out)
    }

    fn udp_endpoints(&self, pids: &[i32]) -> std::io::Result<Vec<Endpoint>> {
        let mut owner: HashMap<u64, i32> = HashMap::new();
        for &pid in pids {
            for inode in self.socket_inodes(pid) {
                owner.insert(inode, pid);
            }
        }
        if owner.is_empty() {
            return Ok(Vec::new());
        }

        let mut out = Vec::new();
        let mut read_any = false;
        for table in ["net/udp", "net/udp6"] {
            let Ok(contents) = std::fs::read_to_string(self.proc_root.join(table)) else {
                continue;
            };
            read_any = true;
            for (inode, local) in parse_net_table(&contents) {
                if let Some(&pid) = owner.get(&inode) {
                    out.push(Endpoint { pid, local });
                }
            }
        }
        if !read_any {
            return Err(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "no readable UDP tables under /proc/net",
            ));
        }
        Ok(out)
    }
}

impl Environment for LinuxSystem {
    fn path_exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn read_version(&self, source: &VersionSource) -> Option<String> {
        match source {
            VersionSource::OsRelease => std::fs::read_to_string("/etc/os-release")
                .or_else(|_| std::fs::read_to_string("/usr/lib/os-release"))
                .ok()
                .and_then(|c| procfs::os_release_version(&c)),
            VersionSource::Kernel => {
                std::fs::read_to_string(self.proc_root.join("sys/kernel/osrelease"))
                    .ok()
                    .map(|s| s.trim().to_string())
            }
            VersionSource::File { path } => std::fs::read_to_string(path)
                .ok()
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty()),
        }
    }
}

fn signal(pid: i32, sig: Signal) -> Result<(), ProcessError> {
    match kill(Pid::from_raw(pid), sig) {
        Ok(()) | Err(Errno::ESRCH) => Ok(()),
        Err(source) => Err(ProcessError::Signal { pid, source }),
    }
}

impl ProcessControl for LinuxSystem {
    fn find(&self, name: &str) -> Vec<ProcessInfo> {
        match self.processes() {
            Ok(all) => all.into_iter().filter(|p| p.matches(name)).collect(),
            Err(e) => {
                tracing::debug!(error = %e, "process enumeration failed");
                Vec::new()
            }
        }
    }

    fn request_close(&self, process: &ProcessInfo) -> Result<(), ProcessError> {
        signal(process.pid, Signal::SIGTERM)
    }

    fn is_running(&self, pid: i32) -> bool {
        self.read_process(pid).is_some()
    }

    fn terminate(&self, process: &ProcessInfo) -> Result<(), ProcessError> {
        signal(process.pid, Signal::SIGKILL)
    }

    fn launch(&self, program: &Path, args: &[String]) -> Result<(), ProcessError> {
        Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .process_group(0)
            .spawn()
            .map(|_child| ())
            .map_err(|source| ProcessError::Launch {
                program: program.display().to_string(),
                source,
            })
    }
}
