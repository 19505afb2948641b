//! Run controller.
//!
//! Drives one invocation through pending check, call check, decision and
//! lifecycle/schedule, strictly in that order, and reports progress as events.

use super::post_process::{announce_approval, report_lifecycle};
use crate::config::{AppId, AppProfile, Registry, Settings};
use crate::engine::decision::{self, Presenter, PromptView};
use crate::engine::{call_activity, lifecycle, pending, schedule};
use crate::exit::{map_exit, Terminal};
use crate::model::{CallState, DecisionOutcome, PendingState, WorkflowEvent};
use crate::notify::{deliver, Notice, Notifier};
use crate::system::{Environment, ProcessControl, ScheduleSink, SystemProbe};
use std::path::PathBuf;
use time::OffsetDateTime;
use tokio::sync::mpsc::UnboundedSender;

/// Inputs for a single run.
#[derive(Debug, Clone)]
pub(crate) struct RunRequest {
    pub app: AppId,
    pub override_check: bool,
    /// Pre-approved run registered by an earlier schedule decision.
    pub deferred: bool,
    pub config_path: Option<PathBuf>,
    pub countdown_seconds: u64,
    pub distinct_scheduled_exit: bool,
    pub now: OffsetDateTime,
}

/// External collaborators the workflow talks to.
pub(crate) struct Collaborators<'a> {
    pub env: &'a dyn Environment,
    pub probe: &'a dyn SystemProbe,
    pub control: &'a dyn ProcessControl,
    pub scheduler: &'a dyn ScheduleSink,
    pub notifier: &'a dyn Notifier,
    pub presenter: &'a mut dyn Presenter,
}

struct Progress<'a> {
    tx: &'a UnboundedSender<WorkflowEvent>,
    total: usize,
}

impl Progress<'_> {
    fn stage(&self, index: usize, label: impl Into<String>) {
        let _ = self.tx.send(WorkflowEvent::Stage {
            index,
            total: self.total,
            label: label.into(),
        });
    }

    fn detail(&self, msg: impl Into<String>) {
        let _ = self.tx.send(WorkflowEvent::Detail(msg.into()));
    }
}

pub(crate) async fn run_workflow(
    req: &RunRequest,
    registry: &Registry,
    settings: &Settings,
    c: Collaborators<'_>,
    event_tx: &UnboundedSender<WorkflowEvent>,
) -> Terminal {
    let total = if req.deferred { 3 } else { 5 };
    let progress = Progress {
        tx: event_tx,
        total,
    };
    let terminal = match registry.get(req.app) {
        Some(profile) if req.deferred => run_deferred(profile, settings, &c, &progress).await,
        Some(profile) => run_gated(req, profile, settings, c, &progress).await,
        None => {
            tracing::warn!(app = %req.app, "no profile configured; treating as not pending");
            progress.detail(format!("no profile configured for {}", req.app));
            Terminal::NotPending
        }
    };
    let code = map_exit(&terminal, req.distinct_scheduled_exit).code();
    progress.stage(total, format!("Result: exit {code}"));
    terminal
}

async fn run_gated(
    req: &RunRequest,
    profile: &AppProfile,
    settings: &Settings,
    c: Collaborators<'_>,
    progress: &Progress<'_>,
) -> Terminal {
    progress.stage(1, format!("Checking for pending {} update", profile.display_name));
    if pending::evaluate(profile, req.override_check, c.env) == PendingState::NotPending {
        progress.detail("no update pending");
        return Terminal::NotPending;
    }
    if req.override_check {
        progress.detail("pending check overridden");
    }

    progress.stage(2, "Checking call activity");
    if call_activity::detect(c.probe) == CallState::Active {
        progress.detail("active call detected; update aborted");
        return Terminal::CallActive;
    }

    progress.stage(3, "Waiting for user decision");
    let view = PromptView {
        app: profile.id,
        display_name: profile.display_name.clone(),
        countdown_seconds: req.countdown_seconds,
        schedule_at: schedule::evening_slot(req.now, settings.schedule_hour),
    };
    let outcome = decision::resolve(&view, c.presenter).await;
    progress.detail(describe(outcome));
    announce_approval(c.notifier, profile, outcome).await;

    if outcome.proceeds_now() {
        progress.stage(4, format!("Restarting {}", profile.display_name));
        return restart(profile, settings, &c, progress).await;
    }
    let DecisionOutcome::Scheduled(when) = outcome else {
        return Terminal::Cancelled;
    };
    progress.stage(4, format!("Scheduling deferred update for {when}"));
    let scheduled =
        schedule::schedule_for(c.scheduler, profile.id, when, req.config_path.as_deref()).await;
    match &scheduled {
        Ok(s) => progress.detail(format!("registered: {}", s.payload)),
        Err(e) => progress.detail(format!("scheduling failed: {e}")),
    }
    Terminal::Scheduled(scheduled)
}

/// Pre-approved run: no pending, call or decision stages.
async fn run_deferred(
    profile: &AppProfile,
    settings: &Settings,
    c: &Collaborators<'_>,
    progress: &Progress<'_>,
) -> Terminal {
    progress.stage(1, format!("Deferred run for {}", profile.display_name));
    deliver(
        c.notifier,
        Notice::activity(
            format!("{} deferred update approved", profile.id),
            "DeferredRunStarted",
        ),
    )
    .await;
    progress.stage(2, format!("Restarting {}", profile.display_name));
    restart(profile, settings, c, progress).await
}

async fn restart(
    profile: &AppProfile,
    settings: &Settings,
    c: &Collaborators<'_>,
    progress: &Progress<'_>,
) -> Terminal {
    let result = lifecycle::stop_then_restart(
        c.control,
        &profile.processes,
        profile.restart_args.as_deref(),
        settings.timings,
    )
    .await;
    for line in &result.detail_log {
        progress.detail(line.clone());
    }
    report_lifecycle(c.notifier, profile, &result).await;
    Terminal::Lifecycle(result)
}

fn describe(outcome: DecisionOutcome) -> String {
    match outcome {
        DecisionOutcome::Immediate => "user chose to restart now".into(),
        DecisionOutcome::Scheduled(at) => format!("user scheduled the update for {at}"),
        DecisionOutcome::Cancelled => "user cancelled".into(),
        DecisionOutcome::TimedOutDefault => "no response before countdown expired; restarting".into(),
    }
}
