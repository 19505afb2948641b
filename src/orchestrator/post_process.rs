//! Post-decision reporting.
//!
//! Sends approval announcements and lifecycle activity records to the notifier.
//! Delivery problems are logged and never change the run's outcome.

use crate::config::AppProfile;
use crate::model::{DecisionOutcome, ProcessOpResult};
use crate::notify::{deliver, Notice, Notifier};

/// Alert, broadcast and activity record for profiles that announce approval.
pub(crate) async fn announce_approval(
    notifier: &dyn Notifier,
    profile: &AppProfile,
    outcome: DecisionOutcome,
) {
    if !profile.announce_approval || !outcome.is_approval() {
        return;
    }
    let when = match outcome {
        DecisionOutcome::Scheduled(at) => format!("scheduled for {at}"),
        DecisionOutcome::TimedOutDefault => "approved by timeout default".to_string(),
        _ => "approved for immediate install".to_string(),
    };
    let body = format!("{} {when}", profile.display_name);
    deliver(notifier, Notice::alert("update-approval", body.clone())).await;
    deliver(
        notifier,
        Notice::broadcast(format!("{} approved", profile.display_name), body.clone()),
    )
    .await;
    deliver(notifier, Notice::activity(body, "UpdateApproved")).await;
}

pub(crate) async fn report_lifecycle(
    notifier: &dyn Notifier,
    profile: &AppProfile,
    result: &ProcessOpResult,
) {
    let (message, event) = if result.succeeded() {
        (
            format!("{} restarted ({} processes)", profile.id, result.names_acted_on.len()),
            "RestartCompleted",
        )
    } else {
        (
            format!("{} restart sequence failed: {:?}", profile.id, result.failure),
            "RestartFailed",
        )
    };
    deliver(notifier, Notice::activity(message, event)).await;
}
