//! # Evaluation Workflow State Machine
//!
//! One [`WorkflowMachine`] per requester session. It holds the current
//! [`WorkflowState`] and, while an attempt exists, that attempt's id and
//! transition log.
//!
//! ## Transitions
//!
//! ```text
//! Idle ─submit─▶ Encrypting ─▶ Submitting ─▶ Confirming ─▶ Decrypting ─▶ Complete
//!                    │              │             │             │
//!                    └──────────────┴─────────────┴─────────────┴──▶ Failed(reason)
//!
//! Idle ─replay─▶ Decrypting ─▶ Complete
//! Complete | Failed ─submit─▶ Encrypting     (new attempt, old one discarded)
//! Encrypting | Submitting ─cancel─▶ Idle      (until the submission is dispatched)
//! ```
//!
//! ## Security Invariant
//!
//! States only move forward. The single way back is `cancel()` to `Idle`,
//! and only while nothing has reached shared state: before `Confirming`
//! and before [`WorkflowMachine::mark_dispatched`] records that the signed
//! submission was handed to the network. Once dispatched or confirming, the attempt must resolve to `Decrypting` or
//! `Failed`. At most one attempt is in flight: starting another while the
//! current one is non-terminal is an error.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use ceval_core::{AttemptId, Category, Timestamp};

use crate::failure::{FailureKind, FailureReason};

// ── Phase ────────────────────────────────────────────────────────────

/// Payload-free discriminant of [`WorkflowState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// No attempt in flight.
    Idle,
    /// Encrypting the four inputs.
    Encrypting,
    /// Awaiting signature and acceptance of the submission.
    Submitting,
    /// Submission accepted, awaiting evaluator resolution.
    Confirming,
    /// Decrypting the result handle.
    Decrypting,
    /// Category recovered. Terminal.
    Complete,
    /// Attempt failed. Terminal.
    Failed,
}

impl Phase {
    /// Canonical name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::Encrypting => "ENCRYPTING",
            Self::Submitting => "SUBMITTING",
            Self::Confirming => "CONFIRMING",
            Self::Decrypting => "DECRYPTING",
            Self::Complete => "COMPLETE",
            Self::Failed => "FAILED",
        }
    }

    /// Whether this phase ends an attempt.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Failed)
    }

    /// Whether an attempt is currently running.
    pub fn is_in_flight(&self) -> bool {
        matches!(
            self,
            Self::Encrypting | Self::Submitting | Self::Confirming | Self::Decrypting
        )
    }

    /// Whether a new attempt may start from here.
    pub fn accepts_new_attempt(&self) -> bool {
        matches!(self, Self::Idle | Self::Complete | Self::Failed)
    }

    /// Cancellation is only valid before confirming.
    pub fn is_cancellable(&self) -> bool {
        matches!(self, Self::Encrypting | Self::Submitting)
    }

    /// Next phase on the submission path. `Decrypting` leaves via
    /// `complete()`, so it has no plain successor here.
    fn next_forward_phase(&self) -> Option<Phase> {
        match self {
            Self::Encrypting => Some(Self::Submitting),
            Self::Submitting => Some(Self::Confirming),
            Self::Confirming => Some(Self::Decrypting),
            Self::Idle | Self::Decrypting | Self::Complete | Self::Failed => None,
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ── State ────────────────────────────────────────────────────────────

/// Workflow state as a tagged union.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum WorkflowState {
    /// No attempt in flight.
    Idle,
    /// Encrypting inputs.
    Encrypting,
    /// Submitting.
    Submitting,
    /// Confirming.
    Confirming,
    /// Decrypting.
    Decrypting,
    /// Done, with the recovered category.
    Complete(Category),
    /// Done, with the reason.
    Failed(FailureReason),
}

impl WorkflowState {
    /// Discriminant.
    pub fn phase(&self) -> Phase {
        match self {
            Self::Idle => Phase::Idle,
            Self::Encrypting => Phase::Encrypting,
            Self::Submitting => Phase::Submitting,
            Self::Confirming => Phase::Confirming,
            Self::Decrypting => Phase::Decrypting,
            Self::Complete(_) => Phase::Complete,
            Self::Failed(_) => Phase::Failed,
        }
    }

    /// The category if complete.
    pub fn category(&self) -> Option<Category> {
        match self {
            Self::Complete(c) => Some(*c),
            _ => None,
        }
    }

    /// The reason if failed.
    pub fn failure(&self) -> Option<&FailureReason> {
        match self {
            Self::Failed(r) => Some(r),
            _ => None,
        }
    }

    fn from_phase(phase: Phase) -> Option<Self> {
        match phase {
            Phase::Idle => Some(Self::Idle),
            Phase::Encrypting => Some(Self::Encrypting),
            Phase::Submitting => Some(Self::Submitting),
            Phase::Confirming => Some(Self::Confirming),
            Phase::Decrypting => Some(Self::Decrypting),
            Phase::Complete | Phase::Failed => None,
        }
    }
}

impl std::fmt::Display for WorkflowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Complete(c) => write!(f, "COMPLETE({c})"),
            Self::Failed(r) => write!(f, "FAILED({r})"),
            other => f.write_str(other.phase().as_str()),
        }
    }
}

// ── Errors ───────────────────────────────────────────────────────────

/// Rejected state machine operations. The state is unchanged on error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WorkflowStateError {
    /// Transition not in the table.
    #[error("invalid workflow transition from {from} to {to}: {reason}")]
    InvalidTransition {
        /// Current phase.
        from: Phase,
        /// Attempted phase.
        to: Phase,
        /// Why.
        reason: String,
    },

    /// A new attempt was requested while one is running.
    #[error("attempt {attempt} is still in flight at {phase}")]
    AttemptInFlight {
        /// Running attempt.
        attempt: AttemptId,
        /// Its phase.
        phase: Phase,
    },

    /// Operation needs a running attempt.
    #[error("no attempt in flight (state {phase})")]
    NoActiveAttempt {
        /// Current phase.
        phase: Phase,
    },
}

// ── Attempt ──────────────────────────────────────────────────────────

/// How an attempt entered the machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AttemptKind {
    /// Full encrypt/submit/confirm/decrypt path.
    Submission,
    /// Read-only replay of the stored result.
    Replay,
}

/// One recorded transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    /// Phase left.
    pub from: Phase,
    /// Phase entered.
    pub to: Phase,
    /// When.
    pub at: Timestamp,
    /// Failure code if `to` is `Failed`.
    pub failure: Option<FailureKind>,
}

/// The current (or last finished) attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attempt {
    /// Attempt id.
    pub id: AttemptId,
    /// Submission or replay.
    pub kind: AttemptKind,
    /// When it started.
    pub started_at: Timestamp,
    /// Transitions so far, oldest first.
    pub transitions: Vec<TransitionRecord>,
    /// The signed submission has been handed to the gateway.
    #[serde(default)]
    pub dispatched: bool,
}

// ── Machine ──────────────────────────────────────────────────────────

/// The workflow state machine.
#[derive(Debug, Clone)]
pub struct WorkflowMachine {
    state: WorkflowState,
    attempt: Option<Attempt>,
}

impl Default for WorkflowMachine {
    fn default() -> Self {
        Self::new()
    }
}

impl WorkflowMachine {
    /// Machine in `Idle` with no attempt.
    pub fn new() -> Self {
        Self {
            state: WorkflowState::Idle,
            attempt: None,
        }
    }

    /// Current state.
    pub fn state(&self) -> &WorkflowState {
        &self.state
    }

    /// Current phase.
    pub fn phase(&self) -> Phase {
        self.state.phase()
    }

    /// Current or last finished attempt. `None` in `Idle`.
    pub fn attempt(&self) -> Option<&Attempt> {
        self.attempt.as_ref()
    }

    /// Transition log of the current attempt.
    pub fn transitions(&self) -> &[TransitionRecord] {
        self.attempt
            .as_ref()
            .map(|a| a.transitions.as_slice())
            .unwrap_or(&[])
    }

    /// Start a submission attempt: `Idle | Complete | Failed → Encrypting`.
    ///
    /// Plaintext validation happens before this call; a validation failure
    /// never reaches the machine and leaves it where it was.
    pub fn begin_submission(&mut self) -> Result<AttemptId, WorkflowStateError> {
        self.begin(AttemptKind::Submission, Phase::Encrypting)
    }

    /// Start a replay: `Idle | Complete | Failed → Decrypting`.
    ///
    /// Call only once the store has returned a genuine record; a sentinel
    /// reply should leave the machine untouched.
    pub fn begin_replay(&mut self) -> Result<AttemptId, WorkflowStateError> {
        self.begin(AttemptKind::Replay, Phase::Decrypting)
    }

    /// Move to the next phase on the submission path.
    pub fn advance(&mut self) -> Result<Phase, WorkflowStateError> {
        let from = self.phase();
        if !from.is_in_flight() {
            return Err(WorkflowStateError::NoActiveAttempt { phase: from });
        }
        let next = from
            .next_forward_phase()
            .ok_or_else(|| WorkflowStateError::InvalidTransition {
                from,
                to: Phase::Complete,
                reason: "DECRYPTING resolves through complete() or fail()".to_string(),
            })?;
        let state = WorkflowState::from_phase(next).ok_or_else(|| {
            WorkflowStateError::InvalidTransition {
                from,
                to: next,
                reason: "terminal phases need a payload".to_string(),
            }
        })?;
        self.enter(state, None);
        Ok(next)
    }

    /// `Decrypting → Complete(category)`.
    pub fn complete(&mut self, category: Category) -> Result<(), WorkflowStateError> {
        let from = self.phase();
        if from != Phase::Decrypting {
            return Err(WorkflowStateError::InvalidTransition {
                from,
                to: Phase::Complete,
                reason: "only DECRYPTING can complete".to_string(),
            });
        }
        self.enter(WorkflowState::Complete(category), None);
        Ok(())
    }

    /// Any in-flight phase `→ Failed(reason)`.
    pub fn fail(&mut self, reason: FailureReason) -> Result<(), WorkflowStateError> {
        let from = self.phase();
        if !from.is_in_flight() {
            return Err(WorkflowStateError::NoActiveAttempt { phase: from });
        }
        let kind = reason.kind;
        tracing::warn!(from = %from, reason = %reason, "workflow attempt failed");
        self.enter(WorkflowState::Failed(reason), Some(kind));
        Ok(())
    }

    /// Record that the signed submission is about to reach the gateway.
    ///
    /// Only valid in `Submitting`. From here on the attempt can no longer be
    /// cancelled.
    pub fn mark_dispatched(&mut self) -> Result<(), WorkflowStateError> {
        let from = self.phase();
        match self.attempt.as_mut() {
            Some(attempt) if from == Phase::Submitting => {
                attempt.dispatched = true;
                tracing::debug!(attempt_id = %attempt.id, "submission dispatched");
                Ok(())
            }
            Some(_) => Err(WorkflowStateError::InvalidTransition {
                from,
                to: Phase::Confirming,
                reason: "only a SUBMITTING attempt can be dispatched".to_string(),
            }),
            None => Err(WorkflowStateError::NoActiveAttempt { phase: from }),
        }
    }

    /// Abandon the attempt: `Encrypting | Submitting → Idle`.
    ///
    /// Refused once the submission has been dispatched. The attempt is
    /// discarded along with its log.
    pub fn cancel(&mut self) -> Result<(), WorkflowStateError> {
        let from = self.phase();
        if !from.is_cancellable() {
            return Err(WorkflowStateError::InvalidTransition {
                from,
                to: Phase::Idle,
                reason: "cancellation only allowed before CONFIRMING".to_string(),
            });
        }
        if self.attempt.as_ref().is_some_and(|a| a.dispatched) {
            return Err(WorkflowStateError::InvalidTransition {
                from,
                to: Phase::Idle,
                reason: "submission already handed to the network".to_string(),
            });
        }
        if let Some(attempt) = &self.attempt {
            tracing::info!(attempt_id = %attempt.id, from = %from, "workflow attempt cancelled");
        }
        self.state = WorkflowState::Idle;
        self.attempt = None;
        Ok(())
    }

    fn begin(&mut self, kind: AttemptKind, to: Phase) -> Result<AttemptId, WorkflowStateError> {
        let from = self.phase();
        if !from.accepts_new_attempt() {
            return Err(match &self.attempt {
                Some(a) => WorkflowStateError::AttemptInFlight {
                    attempt: a.id,
                    phase: from,
                },
                None => WorkflowStateError::InvalidTransition {
                    from,
                    to,
                    reason: "machine is busy".to_string(),
                },
            });
        }
        let state = WorkflowState::from_phase(to).ok_or_else(|| {
            WorkflowStateError::InvalidTransition {
                from,
                to,
                reason: "an attempt cannot start in a terminal phase".to_string(),
            }
        })?;

        let id = AttemptId::new();
        let now = Timestamp::now();
        self.attempt = Some(Attempt {
            id,
            kind,
            started_at: now,
            transitions: Vec::new(),
            dispatched: false,
        });
        tracing::debug!(attempt_id = %id, ?kind, "workflow attempt started");
        self.enter_at(state, None, from, now);
        Ok(id)
    }

    fn enter(&mut self, state: WorkflowState, failure: Option<FailureKind>) {
        let from = self.phase();
        self.enter_at(state, failure, from, Timestamp::now());
    }

    fn enter_at(
        &mut self,
        state: WorkflowState,
        failure: Option<FailureKind>,
        from: Phase,
        at: Timestamp,
    ) {
        let to = state.phase();
        if let Some(attempt) = self.attempt.as_mut() {
            attempt.transitions.push(TransitionRecord {
                from,
                to,
                at,
                failure,
            });
            tracing::debug!(attempt_id = %attempt.id, from = %from, to = %to, "workflow transition");
        }
        self.state = state;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reason(kind: FailureKind) -> FailureReason {
        FailureReason::new(kind, "test")
    }

    fn machine_at(phase: Phase) -> WorkflowMachine {
        let mut m = WorkflowMachine::new();
        if phase == Phase::Idle {
            return m;
        }
        m.begin_submission().unwrap();
        while m.phase() != phase && m.phase() != Phase::Decrypting {
            m.advance().unwrap();
        }
        match phase {
            Phase::Complete => m.complete(Category::Eligible).unwrap(),
            Phase::Failed => m.fail(reason(FailureKind::TransientNetwork)).unwrap(),
            _ => {}
        }
        assert_eq!(m.phase(), phase);
        m
    }

    #[test]
    fn happy_path() {
        let mut m = WorkflowMachine::new();
        assert_eq!(m.phase(), Phase::Idle);
        assert!(m.attempt().is_none());

        m.begin_submission().unwrap();
        assert_eq!(m.phase(), Phase::Encrypting);
        assert_eq!(m.advance().unwrap(), Phase::Submitting);
        assert_eq!(m.advance().unwrap(), Phase::Confirming);
        assert_eq!(m.advance().unwrap(), Phase::Decrypting);
        m.complete(Category::Moderate).unwrap();

        assert_eq!(m.state(), &WorkflowState::Complete(Category::Moderate));
        assert_eq!(m.state().category(), Some(Category::Moderate));
        let phases: Vec<_> = m.transitions().iter().map(|t| (t.from, t.to)).collect();
        assert_eq!(
            phases,
            vec![
                (Phase::Idle, Phase::Encrypting),
                (Phase::Encrypting, Phase::Submitting),
                (Phase::Submitting, Phase::Confirming),
                (Phase::Confirming, Phase::Decrypting),
                (Phase::Decrypting, Phase::Complete),
            ]
        );
    }

    #[test]
    fn transition_timestamps_are_monotonic() {
        let m = machine_at(Phase::Complete);
        let ts: Vec<_> = m.transitions().iter().map(|t| t.at).collect();
        assert!(ts.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(m.attempt().unwrap().started_at, ts[0]);
    }

    #[test]
    fn advance_from_decrypting_needs_complete() {
        let mut m = machine_at(Phase::Decrypting);
        assert!(matches!(
            m.advance(),
            Err(WorkflowStateError::InvalidTransition {
                from: Phase::Decrypting,
                ..
            })
        ));
        assert_eq!(m.phase(), Phase::Decrypting);
    }

    #[test]
    fn advance_without_attempt_fails() {
        for phase in [Phase::Idle, Phase::Complete, Phase::Failed] {
            let mut m = machine_at(phase);
            assert!(matches!(
                m.advance(),
                Err(WorkflowStateError::NoActiveAttempt { .. })
            ));
            assert_eq!(m.phase(), phase);
        }
    }

    #[test]
    fn complete_only_from_decrypting() {
        for phase in [Phase::Idle, Phase::Encrypting, Phase::Submitting, Phase::Confirming] {
            let mut m = machine_at(phase);
            assert!(m.complete(Category::Eligible).is_err());
            assert_eq!(m.phase(), phase);
        }
    }

    #[test]
    fn fail_from_every_in_flight_phase() {
        for phase in [
            Phase::Encrypting,
            Phase::Submitting,
            Phase::Confirming,
            Phase::Decrypting,
        ] {
            let mut m = machine_at(phase);
            m.fail(reason(FailureKind::ProofVerification)).unwrap();
            assert_eq!(m.phase(), Phase::Failed);
            let last = m.transitions().last().unwrap();
            assert_eq!(last.from, phase);
            assert_eq!(last.failure, Some(FailureKind::ProofVerification));
        }
    }

    #[test]
    fn fail_outside_attempt_is_rejected() {
        for phase in [Phase::Idle, Phase::Complete, Phase::Failed] {
            let mut m = machine_at(phase);
            assert!(m.fail(reason(FailureKind::Encoding)).is_err());
            assert_eq!(m.phase(), phase);
        }
    }

    #[test]
    fn cancel_before_confirming_returns_to_idle() {
        for phase in [Phase::Encrypting, Phase::Submitting] {
            let mut m = machine_at(phase);
            m.cancel().unwrap();
            assert_eq!(m.phase(), Phase::Idle);
            assert!(m.attempt().is_none());
            assert!(m.transitions().is_empty());
        }
    }

    #[test]
    fn cancel_refused_once_dispatched() {
        let mut m = machine_at(Phase::Submitting);
        m.mark_dispatched().unwrap();
        let err = m.cancel().unwrap_err();
        assert!(matches!(
            err,
            WorkflowStateError::InvalidTransition { from: Phase::Submitting, ref reason, .. }
                if reason.contains("network")
        ));
        assert_eq!(m.phase(), Phase::Submitting);
        assert!(m.attempt().is_some_and(|a| a.dispatched));
        assert_eq!(m.advance().unwrap(), Phase::Confirming);
    }

    #[test]
    fn dispatch_only_from_submitting() {
        for phase in [Phase::Encrypting, Phase::Confirming, Phase::Decrypting] {
            let mut m = machine_at(phase);
            assert!(matches!(
                m.mark_dispatched(),
                Err(WorkflowStateError::InvalidTransition { .. })
            ));
            assert!(m.attempt().is_some_and(|a| !a.dispatched));
        }
        let mut idle = WorkflowMachine::new();
        assert!(matches!(
            idle.mark_dispatched(),
            Err(WorkflowStateError::NoActiveAttempt { .. })
        ));
    }

    #[test]
    fn cancel_from_confirming_or_later_rejected() {
        for phase in [
            Phase::Confirming,
            Phase::Decrypting,
            Phase::Complete,
            Phase::Failed,
            Phase::Idle,
        ] {
            let mut m = machine_at(phase);
            let err = m.cancel().unwrap_err();
            assert!(matches!(err, WorkflowStateError::InvalidTransition { to: Phase::Idle, .. }));
            assert_eq!(m.phase(), phase);
        }
    }

    #[test]
    fn second_submission_while_in_flight_is_rejected() {
        for phase in [
            Phase::Encrypting,
            Phase::Submitting,
            Phase::Confirming,
            Phase::Decrypting,
        ] {
            let mut m = machine_at(phase);
            let running = m.attempt().unwrap().id;
            match m.begin_submission() {
                Err(WorkflowStateError::AttemptInFlight { attempt, phase: p }) => {
                    assert_eq!(attempt, running);
                    assert_eq!(p, phase);
                }
                other => panic!("expected AttemptInFlight, got {other:?}"),
            }
            assert!(m.begin_replay().is_err());
        }
    }

    #[test]
    fn terminal_states_reset_on_new_submission() {
        for phase in [Phase::Complete, Phase::Failed] {
            let mut m = machine_at(phase);
            let old = m.attempt().unwrap().id;
            let new = m.begin_submission().unwrap();
            assert_ne!(old, new);
            assert_eq!(m.phase(), Phase::Encrypting);
            assert_eq!(m.transitions().len(), 1);
            assert_eq!(m.transitions()[0].from, phase);
        }
    }

    #[test]
    fn replay_path_skips_to_decrypting() {
        let mut m = WorkflowMachine::new();
        m.begin_replay().unwrap();
        assert_eq!(m.phase(), Phase::Decrypting);
        assert_eq!(m.attempt().unwrap().kind, AttemptKind::Replay);
        m.complete(Category::NotEligible).unwrap();
        assert_eq!(m.transitions().len(), 2);
    }

    #[test]
    fn replay_cannot_be_cancelled() {
        let mut m = WorkflowMachine::new();
        m.begin_replay().unwrap();
        assert!(m.cancel().is_err());
    }

    #[test]
    fn display_forms() {
        assert_eq!(WorkflowState::Idle.to_string(), "IDLE");
        assert_eq!(
            WorkflowState::Complete(Category::NotEligible).to_string(),
            "COMPLETE(Not Eligible)"
        );
        assert_eq!(
            WorkflowState::Failed(FailureReason::new(FailureKind::UserRejected, "declined"))
                .to_string(),
            "FAILED(USER_REJECTED: declined)"
        );
    }

    #[test]
    fn phase_predicates() {
        assert!(Phase::Complete.is_terminal());
        assert!(Phase::Failed.is_terminal());
        assert!(!Phase::Idle.is_terminal());
        assert!(!Phase::Idle.is_in_flight());
        assert!(Phase::Confirming.is_in_flight());
        assert!(!Phase::Confirming.is_cancellable());
        assert!(Phase::Submitting.is_cancellable());
    }
}
