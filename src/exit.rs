//! Terminal states of a run and the exit codes the operations platform expects.

use crate::error::SchedulingError;
use crate::model::{LifecycleFailure, ProcessOpResult, ScheduledInvocation};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitOutcome {
    Success,
    Failure,
    Cancelled,
    Scheduled,
    RestartFailed,
    CallActive,
    NotPending,
}

impl ExitOutcome {
    pub fn code(self) -> i32 {
        match self {
            ExitOutcome::Success => 0,
            ExitOutcome::Failure => 1,
            ExitOutcome::Cancelled => 2,
            ExitOutcome::Scheduled => 3,
            ExitOutcome::RestartFailed => 88,
            ExitOutcome::CallActive => 99,
            ExitOutcome::NotPending => 100,
        }
    }
}

/// Where a run stopped.
#[derive(Debug)]
pub enum Terminal {
    NotPending,
    CallActive,
    Cancelled,
    Scheduled(Result<ScheduledInvocation, SchedulingError>),
    Lifecycle(ProcessOpResult),
    Failed(anyhow::Error),
}

/// Map a terminal state to its exit code. With `distinct_scheduled`, a successful
/// schedule exits 3 instead of 0.
pub fn map_exit(terminal: &Terminal, distinct_scheduled: bool) -> ExitOutcome {
    match terminal {
        Terminal::NotPending => ExitOutcome::NotPending,
        Terminal::CallActive => ExitOutcome::CallActive,
        Terminal::Cancelled => ExitOutcome::Cancelled,
        Terminal::Scheduled(Ok(_)) if distinct_scheduled => ExitOutcome::Scheduled,
        Terminal::Scheduled(Ok(_)) => ExitOutcome::Success,
        Terminal::Scheduled(Err(_)) => ExitOutcome::Failure,
        Terminal::Lifecycle(r) => match r.failure {
            None => ExitOutcome::Success,
            Some(LifecycleFailure::RestartFailed) => ExitOutcome::RestartFailed,
            Some(LifecycleFailure::StopFailed) => ExitOutcome::Failure,
        },
        Terminal::Failed(_) => ExitOutcome::Failure,
    }
}
