//! Application-level orchestration.
//!
//! Owns the ordering of one run (pending, call, decision, lifecycle/schedule) and
//! the post-decision reporting. The CLI layer supplies collaborators and renders
//! the progress events.

mod post_process;
mod workflow;

pub(crate) use workflow::{run_workflow, Collaborators, RunRequest};
