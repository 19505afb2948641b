use crate::model::CallState;
use crate::system::SystemProbe;

/// Communication clients whose live sessions must never be interrupted.
pub const CALL_CLIENTS: &[&str] = &[
    "teams",
    "teams-for-linux",
    "ms-teams",
    "zoom",
    "ZoomWebviewHost",
    "slack",
    "skypeforlinux",
    "webex",
    "discord",
];

/// A running client with a bound, routable UDP endpoint is treated as being in a call.
/// Enumeration failures count as no activity.
pub fn detect(probe: &dyn SystemProbe) -> CallState {
    let processes = match probe.processes() {
        Ok(p) => p,
        Err(e) => {
            tracing::debug!(error = %e, "process enumeration failed");
            return CallState::Inactive;
        }
    };
    let pids: Vec<i32> = processes
        .iter()
        .filter(|p| CALL_CLIENTS.iter().any(|c| p.matches(c)))
        .map(|p| p.pid)
        .collect();
    if pids.is_empty() {
        return CallState::Inactive;
    }

    let endpoints = match probe.udp_endpoints(&pids) {
        Ok(e) => e,
        Err(e) => {
            tracing::debug!(error = %e, "endpoint enumeration failed");
            return CallState::Inactive;
        }
    };
    let live = endpoints.iter().find(|e| {
        let ip = e.local.ip();
        !ip.is_unspecified() && !ip.is_loopback()
    });
    match live {
        Some(e) => {
            tracing::info!(pid = e.pid, local = %e.local, "call activity detected");
            CallState::Active
        }
        None => CallState::Inactive,
    }
}
