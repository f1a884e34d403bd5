//! # ceval-evaluator — Rule Evaluator and Result Store
//!
//! - [`rules`]: the eligibility predicate, expressed only in homomorphic
//!   operators.
//! - [`store`]: one overwrite-on-write result slot per identity, with the
//!   zero sentinel for identities that never evaluated.
//! - [`events`]: the public `(caller, handle, timestamp)` log.
//! - [`evaluator`]: [`RiskEvaluator`], which verifies all proofs before
//!   any state mutation, then computes, grants, records, and emits.
//!
//! ## Metrics
//!
//! `ceval_evaluations_total` counts calls to `evaluate`;
//! `ceval_evaluations_rejected_total` counts those refused on proof or
//! type checks. Both go through the `metrics` facade; with no recorder
//! installed they are no-ops.

pub mod evaluator;
pub mod events;
pub mod rules;
pub mod store;

pub use evaluator::{EvaluationRequest, EvaluatorError, ProvenInput, RiskEvaluator};
pub use events::{EvaluationEvent, EventLog};
pub use rules::{classify, Operands, AGE_BAND_MAX, AGE_BAND_MIN};
pub use store::{EvaluationRecord, LastResult, ResultStore};
