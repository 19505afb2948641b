use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use time::OffsetDateTime;

/// Whether a live communication session is in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CallState {
    Active,
    Inactive,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PendingState {
    Pending,
    NotPending,
}

/// The single value produced by the decision gate for a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DecisionOutcome {
    Immediate,
    Scheduled(#[serde(with = "time::serde::rfc3339")] OffsetDateTime),
    Cancelled,
    TimedOutDefault,
}

impl DecisionOutcome {
    /// True for outcomes that go straight to the restart step.
    pub fn proceeds_now(self) -> bool {
        matches!(
            self,
            DecisionOutcome::Immediate | DecisionOutcome::TimedOutDefault
        )
    }

    /// True for outcomes that count as user approval of the update.
    pub fn is_approval(self) -> bool {
        !matches!(self, DecisionOutcome::Cancelled)
    }
}

/// Which half of the stop/restart sequence failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LifecycleFailure {
    StopFailed,
    RestartFailed,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessOpResult {
    /// Process names stopped, in the order they were first acted on.
    pub names_acted_on: Vec<String>,
    pub detail_log: Vec<String>,
    pub failure: Option<LifecycleFailure>,
}

impl ProcessOpResult {
    pub fn succeeded(&self) -> bool {
        self.failure.is_none()
    }
}

/// A re-entrant invocation of this binary, handed to the scheduling sink.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invocation {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl std::fmt::Display for Invocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledInvocation {
    pub app_id: crate::config::AppId,
    #[serde(with = "time::serde::rfc3339")]
    pub fired_at: OffsetDateTime,
    pub payload: Invocation,
}

/// Progress events emitted by the workflow controller for presentation layers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkflowEvent {
    Stage {
        index: usize,
        total: usize,
        label: String,
    },
    Detail(String),
}

impl WorkflowEvent {
    /// Render a human-readable line for CLI output.
    pub fn to_message(&self) -> String {
        match self {
            WorkflowEvent::Stage {
                index,
                total,
                label,
            } => format!("[{index}/{total}] {label}"),
            WorkflowEvent::Detail(msg) => format!("      {msg}"),
        }
    }
}
