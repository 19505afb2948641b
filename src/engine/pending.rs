use crate::config::{AppProfile, PendingCheck};
use crate::model::PendingState;
use crate::system::Environment;
use crate::version::Version;

/// Decide whether `profile` needs attention. `override_check` bypasses inspection.
pub fn evaluate(profile: &AppProfile, override_check: bool, env: &dyn Environment) -> PendingState {
    if override_check {
        return PendingState::Pending;
    }
    let pending = match &profile.pending_check {
        PendingCheck::PathExists { path } => env.path_exists(path),
        PendingCheck::VersionBelow { minimum, source } => {
            let Some(minimum) = Version::parse(minimum) else {
                tracing::warn!(app = %profile.id, %minimum, "unparsable minimum version");
                return PendingState::NotPending;
            };
            match env.read_version(source).as_deref().and_then(Version::parse) {
                Some(live) => {
                    tracing::debug!(app = %profile.id, %live, %minimum, "comparing versions");
                    live < minimum
                }
                None => {
                    tracing::debug!(app = %profile.id, ?source, "live version unavailable");
                    false
                }
            }
        }
    };
    if pending {
        PendingState::Pending
    } else {
        PendingState::NotPending
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{AppId, VersionSource};
    use std::path::{Path, PathBuf};

    struct FakeEnv {
        existing: Vec<PathBuf>,
        version: Option<&'static str>,
    }

    impl Environment for FakeEnv {
        fn path_exists(&self, path: &Path) -> bool {
            self.existing.iter().any(|p| p == path)
        }
        fn read_version(&self, _source: &VersionSource) -> Option<String> {
            self.version.map(str::to_string)
        }
    }

    fn profile(check: PendingCheck) -> AppProfile {
        AppProfile {
            id: AppId::FeatureUpdate,
            display_name: "Feature update".into(),
            processes: vec![],
            restart_args: None,
            pending_check: check,
            announce_approval: true,
        }
    }

    fn below(minimum: &str) -> AppProfile {
        profile(PendingCheck::VersionBelow {
            minimum: minimum.into(),
            source: VersionSource::OsRelease,
        })
    }

    fn env(version: Option<&'static str>) -> FakeEnv {
        FakeEnv {
            existing: vec![],
            version,
        }
    }

    #[test]
    fn override_is_always_pending() {
        let checks = [
            profile(PendingCheck::PathExists {
                path: "/nope".into(),
            }),
            below("1.0"),
            below("not-a-version"),
        ];
        for p in &checks {
            assert_eq!(evaluate(p, true, &env(None)), PendingState::Pending);
            assert_eq!(evaluate(p, true, &env(Some("99"))), PendingState::Pending);
        }
    }

    #[test]
    fn version_below_is_strict() {
        let p = below("22.04");
        assert_eq!(evaluate(&p, false, &env(Some("20.04"))), PendingState::Pending);
        assert_eq!(evaluate(&p, false, &env(Some("22.4"))), PendingState::NotPending);
        assert_eq!(evaluate(&p, false, &env(Some("22.04.1"))), PendingState::NotPending);
        assert_eq!(evaluate(&p, false, &env(Some("24.04"))), PendingState::NotPending);
    }

    #[test]
    fn unreadable_version_is_not_pending() {
        let p = below("22.04");
        assert_eq!(evaluate(&p, false, &env(None)), PendingState::NotPending);
        assert_eq!(evaluate(&p, false, &env(Some("rolling"))), PendingState::NotPending);
    }

    #[test]
    fn marker_path_presence() {
        let marker = PathBuf::from("/var/lib/update-gate/pending/edge.pending");
        let p = profile(PendingCheck::PathExists {
            path: marker.clone(),
        });
        let present = FakeEnv {
            existing: vec![marker],
            version: None,
        };
        assert_eq!(evaluate(&p, false, &present), PendingState::Pending);
        assert_eq!(evaluate(&p, false, &env(None)), PendingState::NotPending);
    }
}
