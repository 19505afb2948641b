//! Operating-system seams used by the workflow.
//!
//! The core only talks to these traits. `LinuxSystem` and `SystemdRunScheduler`
//! are the production implementations; tests supply their own.

mod linux;
mod procfs;
mod systemd;

pub use linux::LinuxSystem;
pub use systemd::SystemdRunScheduler;

use crate::config::VersionSource;
use crate::error::{ProcessError, SchedulingError};
use crate::model::Invocation;
use futures::future::BoxFuture;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use time::OffsetDateTime;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub pid: i32,
    pub name: String,
    pub exe: Option<PathBuf>,
    /// The process has a main interface that can be asked to close.
    pub closable: bool,
}

impl ProcessInfo {
    /// Match against the configured name, accounting for the kernel's 15-byte `comm` limit.
    pub fn matches(&self, wanted: &str) -> bool {
        if self.name == wanted {
            return true;
        }
        if self
            .exe
            .as_deref()
            .and_then(Path::file_name)
            .is_some_and(|f| f == wanted)
        {
            return true;
        }
        wanted.len() > procfs::COMM_LEN
            && wanted.is_char_boundary(procfs::COMM_LEN)
            && self.name == wanted[..procfs::COMM_LEN]
    }
}

/// A bound transport endpoint owned by a process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Endpoint {
    pub pid: i32,
    pub local: SocketAddr,
}

/// Read-only process and network enumeration.
pub trait SystemProbe {
    fn processes(&self) -> std::io::Result<Vec<ProcessInfo>>;
    fn udp_endpoints(&self, pids: &[i32]) -> std::io::Result<Vec<Endpoint>>;
}

/// Snapshot of on-disk and version state used by pending checks.
pub trait Environment {
    fn path_exists(&self, path: &Path) -> bool;
    fn read_version(&self, source: &VersionSource) -> Option<String>;
}

pub trait ProcessControl {
    /// Running processes matching `name`. Enumeration failures yield an empty list.
    fn find(&self, name: &str) -> Vec<ProcessInfo>;
    fn request_close(&self, process: &ProcessInfo) -> Result<(), ProcessError>;
    fn is_running(&self, pid: i32) -> bool;
    fn terminate(&self, process: &ProcessInfo) -> Result<(), ProcessError>;
    fn launch(&self, program: &Path, args: &[String]) -> Result<(), ProcessError>;
}

/// Registers a one-shot future invocation with the OS scheduler.
pub trait ScheduleSink {
    fn register_one_shot<'a>(
        &'a self,
        invocation: &'a Invocation,
        when: OffsetDateTime,
    ) -> BoxFuture<'a, Result<(), SchedulingError>>;
}
