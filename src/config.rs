//! Application profiles and run settings.
//!
//! Profiles are keyed by the closed [`AppId`] enum, so a misspelled app name is
//! rejected when the file is loaded instead of surfacing mid-run.

use crate::error::ConfigError;
use crate::version::Version;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, clap::ValueEnum,
)]
pub enum AppId {
    #[value(name = "Firefox")]
    #[serde(alias = "firefox")]
    Firefox,
    #[value(name = "Chrome")]
    #[serde(alias = "chrome")]
    Chrome,
    #[value(name = "Edge")]
    #[serde(alias = "edge")]
    Edge,
    #[value(name = "Teams")]
    #[serde(alias = "teams")]
    Teams,
    #[value(name = "M365Apps")]
    #[serde(alias = "m365apps")]
    M365Apps,
    #[value(name = "Zoom")]
    #[serde(alias = "zoom")]
    Zoom,
    #[value(name = "FeatureUpdate")]
    #[serde(alias = "featureupdate", alias = "feature-update")]
    FeatureUpdate,
}

impl AppId {
    pub fn as_str(self) -> &'static str {
        match self {
            AppId::Firefox => "Firefox",
            AppId::Chrome => "Chrome",
            AppId::Edge => "Edge",
            AppId::Teams => "Teams",
            AppId::M365Apps => "M365Apps",
            AppId::Zoom => "Zoom",
            AppId::FeatureUpdate => "FeatureUpdate",
        }
    }
}

impl std::fmt::Display for AppId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the live version for a `VersionBelow` check is read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum VersionSource {
    /// `VERSION_ID` in /etc/os-release
    #[default]
    OsRelease,
    /// /proc/sys/kernel/osrelease
    Kernel,
    /// Trimmed contents of a version file written by the component.
    File { path: PathBuf },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PendingCheck {
    PathExists {
        path: PathBuf,
    },
    VersionBelow {
        minimum: String,
        #[serde(default)]
        source: VersionSource,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppProfile {
    pub id: AppId,
    pub display_name: String,
    pub processes: Vec<String>,
    pub restart_args: Option<String>,
    pub pending_check: PendingCheck,
    /// Emit the alert/broadcast/activity triple when the user approves.
    pub announce_approval: bool,
}

/// On-disk shape of a profile; the id comes from the map key.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ProfileEntry {
    #[serde(default)]
    display_name: Option<String>,
    #[serde(default)]
    processes: Vec<String>,
    #[serde(default)]
    restart_args: Option<String>,
    pending_check: PendingCheck,
    #[serde(default)]
    announce_approval: bool,
}

impl ProfileEntry {
    fn into_profile(self, id: AppId) -> AppProfile {
        AppProfile {
            id,
            display_name: self.display_name.unwrap_or_else(|| id.to_string()),
            processes: self.processes,
            restart_args: self.restart_args.filter(|a| !a.trim().is_empty()),
            pending_check: self.pending_check,
            announce_approval: self.announce_approval,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct NotifierSettings {
    #[serde(default)]
    pub webhook_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SchedulerSettings {
    /// Register timers with the per-user systemd instance.
    #[serde(default = "default_true")]
    pub user_scope: bool,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        Self { user_scope: true }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    #[serde(default = "default_countdown")]
    countdown_seconds: u64,
    #[serde(default = "default_schedule_hour")]
    schedule_hour: u8,
    #[serde(default = "default_graceful_timeout", with = "humantime_serde")]
    graceful_timeout: Duration,
    #[serde(default = "default_poll_interval", with = "humantime_serde")]
    poll_interval: Duration,
    #[serde(default = "default_settle_delay", with = "humantime_serde")]
    settle_delay: Duration,
    #[serde(default)]
    notifier: NotifierSettings,
    #[serde(default)]
    scheduler: SchedulerSettings,
    #[serde(default)]
    apps: HashMap<AppId, ProfileEntry>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            countdown_seconds: default_countdown(),
            schedule_hour: default_schedule_hour(),
            graceful_timeout: default_graceful_timeout(),
            poll_interval: default_poll_interval(),
            settle_delay: default_settle_delay(),
            notifier: NotifierSettings::default(),
            scheduler: SchedulerSettings::default(),
            apps: HashMap::new(),
        }
    }
}

fn default_countdown() -> u64 {
    300
}
fn default_schedule_hour() -> u8 {
    19
}
fn default_graceful_timeout() -> Duration {
    Duration::from_secs(5)
}
fn default_poll_interval() -> Duration {
    Duration::from_secs(1)
}
fn default_settle_delay() -> Duration {
    Duration::from_secs(3)
}

/// Waits used by the stop/restart sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LifecycleTimings {
    pub graceful_timeout: Duration,
    pub poll_interval: Duration,
    pub settle_delay: Duration,
}

impl Default for LifecycleTimings {
    fn default() -> Self {
        Self {
            graceful_timeout: default_graceful_timeout(),
            poll_interval: default_poll_interval(),
            settle_delay: default_settle_delay(),
        }
    }
}

/// Run-wide settings that are not tied to one application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub countdown_seconds: u64,
    pub schedule_hour: u8,
    pub timings: LifecycleTimings,
    pub notifier: NotifierSettings,
    pub scheduler: SchedulerSettings,
}

/// Read-only lookup of application profiles.
#[derive(Debug, Clone)]
pub struct Registry {
    profiles: HashMap<AppId, AppProfile>,
}

impl Registry {
    /// Profiles shipped with the binary, used when no config overrides them.
    pub fn builtin() -> Self {
        let marker = |name: &str| default_marker_dir().join(format!("{name}.pending"));
        let mut profiles = HashMap::new();
        let mut add = |p: AppProfile| {
            profiles.insert(p.id, p);
        };

        add(AppProfile {
            id: AppId::Firefox,
            display_name: "Mozilla Firefox".into(),
            processes: vec!["firefox".into()],
            restart_args: None,
            pending_check: PendingCheck::PathExists {
                path: marker("firefox"),
            },
            announce_approval: false,
        });
        add(AppProfile {
            id: AppId::Chrome,
            display_name: "Google Chrome".into(),
            processes: vec!["chrome".into()],
            restart_args: Some("--restore-last-session".into()),
            pending_check: PendingCheck::PathExists {
                path: marker("chrome"),
            },
            announce_approval: false,
        });
        add(AppProfile {
            id: AppId::Edge,
            display_name: "Microsoft Edge".into(),
            processes: vec!["msedge".into()],
            restart_args: Some("--restore-last-session".into()),
            pending_check: PendingCheck::PathExists {
                path: marker("edge"),
            },
            announce_approval: false,
        });
        add(AppProfile {
            id: AppId::Teams,
            display_name: "Microsoft Teams".into(),
            processes: vec!["teams-for-linux".into(), "teams".into()],
            restart_args: None,
            pending_check: PendingCheck::PathExists {
                path: marker("teams"),
            },
            announce_approval: false,
        });
        add(AppProfile {
            id: AppId::M365Apps,
            display_name: "Microsoft 365 Apps".into(),
            processes: vec!["onedrive".into(), "outlook".into()],
            restart_args: None,
            pending_check: PendingCheck::PathExists {
                path: marker("m365apps"),
            },
            announce_approval: false,
        });
        add(AppProfile {
            id: AppId::Zoom,
            display_name: "Zoom".into(),
            processes: vec!["zoom".into()],
            restart_args: None,
            pending_check: PendingCheck::PathExists {
                path: marker("zoom"),
            },
            announce_approval: false,
        });
        add(AppProfile {
            id: AppId::FeatureUpdate,
            display_name: "Operating system feature update".into(),
            processes: Vec::new(),
            restart_args: None,
            pending_check: PendingCheck::VersionBelow {
                minimum: "24.04".into(),
                source: VersionSource::OsRelease,
            },
            announce_approval: true,
        });

        Self { profiles }
    }

    pub fn get(&self, id: AppId) -> Option<&AppProfile> {
        self.profiles.get(&id)
    }

    #[cfg(test)]
    pub fn from_profiles(profiles: impl IntoIterator<Item = AppProfile>) -> Self {
        Self {
            profiles: profiles.into_iter().map(|p| (p.id, p)).collect(),
        }
    }
}

/// Directory holding `<app>.pending` marker files for the built-in profiles.
pub fn default_marker_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("/var/lib"))
        .join("update-gate")
        .join("pending")
}

pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("update-gate").join("config.yaml"))
}

/// Load settings and profiles.
///
/// An explicit `path` must exist. Without one, the default location is tried and
/// built-in values are used when nothing is there.
pub fn load(path: Option<&Path>) -> Result<(Settings, Registry), ConfigError> {
    let file = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ConfigError::NotFound(p.to_path_buf()));
            }
            read_file(p)?
        }
        None => match default_config_path() {
            Some(p) if p.exists() => read_file(&p)?,
            _ => ConfigFile::default(),
        },
    };
    build(file)
}

fn read_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    parse(&raw, path)
}

fn parse(raw: &str, path: &Path) -> Result<ConfigFile, ConfigError> {
    if raw.trim().is_empty() {
        return Ok(ConfigFile::default());
    }
    serde_yaml::from_str(raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn build(file: ConfigFile) -> Result<(Settings, Registry), ConfigError> {
    if file.schedule_hour > 23 {
        return Err(ConfigError::InvalidScheduleHour(file.schedule_hour));
    }
    if file.poll_interval.is_zero() {
        return Err(ConfigError::ZeroPollInterval);
    }

    let mut registry = Registry::builtin();
    for (id, entry) in file.apps {
        let profile = entry.into_profile(id);
        if let PendingCheck::VersionBelow { minimum, .. } = &profile.pending_check {
            if Version::parse(minimum).is_none() {
                return Err(ConfigError::InvalidMinimumVersion {
                    app: id.to_string(),
                    version: minimum.clone(),
                });
            }
        }
        registry.profiles.insert(id, profile);
    }

    let settings = Settings {
        countdown_seconds: file.countdown_seconds,
        schedule_hour: file.schedule_hour,
        timings: LifecycleTimings {
            graceful_timeout: file.graceful_timeout,
            poll_interval: file.poll_interval,
            settle_delay: file.settle_delay,
        },
        notifier: file.notifier,
        scheduler: file.scheduler,
    };
    Ok((settings, registry))
}
