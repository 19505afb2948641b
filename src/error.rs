use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {0}")]
    NotFound(PathBuf),

    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("schedule_hour must be between 0 and 23, got {0}")]
    InvalidScheduleHour(u8),

    #[error("poll_interval must be greater than zero")]
    ZeroPollInterval,

    #[error("app {app}: minimum version '{version}' is not a dotted numeric version")]
    InvalidMinimumVersion { app: String, version: String },
}

/// Failure acting on a single process.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to signal pid {pid}: {source}")]
    Signal {
        pid: i32,
        #[source]
        source: nix::Error,
    },

    #[error("pid {pid} ({name}) is still running after forced termination")]
    Survived { pid: i32, name: String },

    #[error("failed to launch {program}: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Error)]
pub enum SchedulingError {
    #[error("cannot resolve current executable: {0}")]
    CurrentExe(#[source] std::io::Error),

    #[error("failed to start scheduler {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("scheduler {command} exited with {status}: {stderr}")]
    Rejected {
        command: String,
        status: String,
        stderr: String,
    },

    #[error("cannot format fire time: {0}")]
    Format(#[from] time::error::Format),
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error(transparent)]
    Http(#[from] reqwest::Error),

    #[error("webhook returned status {0}")]
    Status(reqwest::StatusCode),
}
