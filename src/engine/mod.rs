//! Decision and lifecycle components of the update workflow.
//!
//! Each submodule is one stage. They share no state; the orchestrator threads
//! values between them.

pub mod call_activity;
pub mod decision;
pub mod lifecycle;
pub mod pending;
pub mod schedule;
