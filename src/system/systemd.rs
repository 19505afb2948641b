use super::ScheduleSink;
use crate::error::SchedulingError;
use crate::model::Invocation;
use futures::future::BoxFuture;
use futures::FutureExt;
use time::macros::format_description;
use time::{OffsetDateTime, UtcOffset};

/// Registers transient systemd timers through `systemd-run`.
#[derive(Debug, Clone)]
pub struct SystemdRunScheduler {
    program: String,
    user_scope: bool,
    /// Graphical session variables handed to the deferred run.
    session_env: Vec<(String, String)>,
}

/// Variables a relaunched GUI application needs to find its session.
const SESSION_VARS: &[&str] = &[
    "DISPLAY",
    "WAYLAND_DISPLAY",
    "XDG_RUNTIME_DIR",
    "DBUS_SESSION_BUS_ADDRESS",
];

impl SystemdRunScheduler {
    pub fn new(user_scope: bool) -> Self {
        let session_env = SESSION_VARS
            .iter()
            .filter_map(|k| std::env::var(k).ok().map(|v| (k.to_string(), v)))
            .filter(|(_, v)| !v.is_empty())
            .collect();
        Self {
            program: "systemd-run".into(),
            user_scope,
            session_env,
        }
    }

    /// Arguments for `systemd-run`, everything after the program name.
    pub(crate) fn command_args(
        &self,
        invocation: &Invocation,
        when: OffsetDateTime,
    ) -> Result<Vec<String>, SchedulingError> {
        // OnCalendar only understands zone names, so pin the timer in UTC.
        let calendar = when.to_offset(UtcOffset::UTC).format(format_description!(
            "[year]-[month]-[day] [hour]:[minute]:[second]"
        ))?;
        let unit = format!(
            "update-gate-{}-{}",
            unit_slug(invocation),
            when.unix_timestamp()
        );

        let mut args = Vec::new();
        if self.user_scope {
            args.push("--user".to_string());
        }
        args.push(format!("--unit={unit}"));
        args.push(format!("--on-calendar={calendar} UTC"));
        args.push("--timer-property=AccuracySec=1s".to_string());
        // Relaunched applications stay in the unit's cgroup; only the main
        // process may be stopped when the run exits.
        args.push("--property=KillMode=process".to_string());
        for (key, value) in &self.session_env {
            args.push(format!("--setenv={key}={value}"));
        }
        args.push("--".to_string());
        args.push(invocation.program.display().to_string());
        args.extend(invocation.args.iter().cloned());
        Ok(args)
    }
}

/// App id taken from the `--app` argument, lowercased for unit names.
fn unit_slug(invocation: &Invocation) -> String {
    invocation
        .args
        .iter()
        .skip_while(|a| *a != "--app")
        .nth(1)
        .map(|a| a.to_ascii_lowercase())
        .unwrap_or_else(|| "run".into())
}

impl ScheduleSink for SystemdRunScheduler {
    fn register_one_shot<'a>(
        &'a self,
        invocation: &'a Invocation,
        when: OffsetDateTime,
    ) -> BoxFuture<'a, Result<(), SchedulingError>> {
        async move {
            let args = self.command_args(invocation, when)?;
            tracing::debug!(program = %self.program, ?args, "registering one-shot timer");
            let output = tokio::process::Command::new(&self.program)
                .args(&args)
                .output()
                .await
                .map_err(|source| SchedulingError::Spawn {
                    command: self.program.clone(),
                    source,
                })?;
            if !output.status.success() {
                return Err(SchedulingError::Rejected {
                    command: self.program.clone(),
                    status: output.status.to_string(),
                    stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
                });
            }
            Ok(())
        }
        .boxed()
    }
}
