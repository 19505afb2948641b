//! Graceful-close, forced-kill and relaunch sequence for an application's processes.

use crate::config::LifecycleTimings;
use crate::error::ProcessError;
use crate::model::{LifecycleFailure, ProcessOpResult};
use crate::system::{ProcessControl, ProcessInfo};
use std::path::PathBuf;

/// Stop every running process matching `names`, then relaunch each distinct name
/// that was stopped. Restarts are skipped entirely when any stop failed.
pub async fn stop_then_restart(
    control: &dyn ProcessControl,
    names: &[String],
    restart_args: Option<&str>,
    timings: LifecycleTimings,
) -> ProcessOpResult {
    let mut result = ProcessOpResult::default();
    let mut relaunch: Vec<(String, PathBuf)> = Vec::new();
    let mut stops: Vec<Result<(), ProcessError>> = Vec::new();

    for name in names {
        for process in control.find(name) {
            let outcome = stop_one(control, &process, timings).await;
            match &outcome {
                Ok(forced) => {
                    result.detail_log.push(format!(
                        "{name} (pid {}): {}",
                        process.pid,
                        if *forced {
                            "forcibly terminated"
                        } else {
                            "closed gracefully"
                        }
                    ));
                    if !relaunch.iter().any(|(n, _)| n == name) {
                        let program = process.exe.clone().unwrap_or_else(|| PathBuf::from(name));
                        relaunch.push((name.clone(), program));
                        result.names_acted_on.push(name.clone());
                    }
                }
                Err(e) => {
                    tracing::warn!(process = %name, pid = process.pid, error = %e, "stop failed");
                    result.detail_log.push(format!("{name} (pid {}): stop failed: {e}", process.pid));
                }
            }
            stops.push(outcome.map(|_| ()));
        }
    }

    if stops.iter().any(Result::is_err) {
        result
            .detail_log
            .push("stop phase failed; not restarting".to_string());
        result.failure = Some(LifecycleFailure::StopFailed);
        return result;
    }
    if relaunch.is_empty() {
        result.detail_log.push("no running processes".to_string());
        return result;
    }

    tokio::time::sleep(timings.settle_delay).await;

    let args: Vec<String> = restart_args
        .map(|a| a.split_whitespace().map(str::to_string).collect())
        .unwrap_or_default();
    let restarts: Vec<Result<(), ProcessError>> = relaunch
        .iter()
        .map(|(name, program)| {
            let r = control.launch(program, &args);
            match &r {
                Ok(()) => result.detail_log.push(format!("{name}: restarted")),
                Err(e) => {
                    tracing::warn!(process = %name, error = %e, "restart failed");
                    result.detail_log.push(format!("{name}: restart failed: {e}"));
                }
            }
            r
        })
        .collect();

    if restarts.iter().any(Result::is_err) {
        result.failure = Some(LifecycleFailure::RestartFailed);
    }
    result
}

/// Returns whether forced termination was needed.
async fn stop_one(
    control: &dyn ProcessControl,
    process: &ProcessInfo,
    timings: LifecycleTimings,
) -> Result<bool, ProcessError> {
    if process.closable {
        control.request_close(process)?;
        let polls = (timings.graceful_timeout.as_millis() / timings.poll_interval.as_millis().max(1))
            .max(1);
        for _ in 0..polls {
            tokio::time::sleep(timings.poll_interval).await;
            if !control.is_running(process.pid) {
                return Ok(false);
            }
        }
        tracing::debug!(pid = process.pid, "graceful close timed out");
    }

    control.terminate(process)?;
    tokio::time::sleep(timings.poll_interval).await;
    if control.is_running(process.pid) {
        return Err(ProcessError::Survived {
            pid: process.pid,
            name: process.name.clone(),
        });
    }
    Ok(true)
}
