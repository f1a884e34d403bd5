//! # ceval-state — Evaluation Workflow State Machine
//!
//! The workflow is an explicit tagged union ([`WorkflowState`]) driven by a
//! [`WorkflowMachine`] that only accepts transitions from the table in
//! [`workflow`]. No booleans, no string-typed phases.
//!
//! [`failure`] holds the closed failure taxonomy carried by
//! `WorkflowState::Failed`.

pub mod failure;
pub mod workflow;

pub use failure::{FailureKind, FailureReason};
pub use workflow::{
    Attempt, AttemptKind, Phase, TransitionRecord, WorkflowMachine, WorkflowState,
    WorkflowStateError,
};
