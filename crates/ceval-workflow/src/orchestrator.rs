//! # Evaluation Workflow
//!
//! Drives one requester's attempts through the [`WorkflowMachine`]:
//!
//! 1. **Encrypting**: wait for the key service, encrypt the four validated
//!    inputs for the gateway's evaluator.
//! 2. **Submitting**: have the signer sign the submission, mark the attempt
//!    dispatched, hand it to the gateway. A dispatched attempt cannot be
//!    cancelled.
//! 3. **Confirming**: wait for the evaluator to resolve it.
//! 4. **Decrypting**: sign a fresh authorization for the result handle
//!    with the requester's own key, decrypt, map to a [`Category`].
//!
//! Each phase awaits exactly one external party at a time; phases of one
//! attempt never overlap. The machine sits behind a `parking_lot::Mutex`
//! that is never held across an `.await`, so `cancel()` and state reads
//! can run while an attempt is suspended. A cancelled attempt notices at
//! its next phase boundary and stops without touching shared state.
//!
//! Timeouts are not enforced here. A caller that imposes one drops the
//! `submit` future and calls [`EvaluationWorkflow::record_timeout`].

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;

use ceval_core::{
    ApplicantForm, AttemptId, Category, Identity, Timestamp, ValidatedInputs, ValidationError,
};
use ceval_evaluator::{EvaluationRequest, ProvenInput};
use ceval_fhe::{
    AuthorizationStatement, DecryptionAuthorization, EncryptedValue, Plaintext,
    DEFAULT_VALIDITY_SECS,
};
use ceval_state::{
    FailureKind, FailureReason, TransitionRecord, WorkflowMachine, WorkflowState,
    WorkflowStateError,
};

use crate::boundary::{
    codec_failure_kind, EvaluatorGateway, GatewayError, KeyService, Signer, SigningPurpose,
};
use crate::submission::{SignedSubmission, SubmissionBody};

/// Tunables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowConfig {
    /// Validity of each self-issued decryption authorization.
    pub authorization_validity_secs: u64,
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            authorization_validity_secs: DEFAULT_VALIDITY_SECS,
        }
    }
}

/// Errors from workflow operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum WorkflowError {
    /// Plaintext rejected locally. No attempt was started.
    #[error("invalid input: {0}")]
    Validation(#[from] ValidationError),

    /// The state machine refused the operation (e.g. an attempt is
    /// already in flight).
    #[error(transparent)]
    State(#[from] WorkflowStateError),

    /// The attempt ended in `Failed(reason)`.
    #[error("evaluation failed: {0}")]
    Failed(FailureReason),

    /// The attempt was cancelled while suspended.
    #[error("attempt {0} was cancelled")]
    Cancelled(AttemptId),

    /// The result store has no record for this identity.
    #[error("no prior evaluation for {0}")]
    NoPriorRecord(Identity),

    /// The result store could not be read. No attempt was started.
    #[error("could not read last result: {0}")]
    Lookup(GatewayError),
}

impl WorkflowError {
    /// Failure kind, when the error ended an attempt.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            Self::Failed(r) => Some(r.kind),
            _ => None,
        }
    }
}

/// One requester's evaluation workflow.
#[derive(Debug)]
pub struct EvaluationWorkflow<K, S, G> {
    keys: Arc<K>,
    signer: Arc<S>,
    gateway: Arc<G>,
    config: WorkflowConfig,
    machine: Mutex<WorkflowMachine>,
}

impl<K, S, G> EvaluationWorkflow<K, S, G>
where
    K: KeyService,
    S: Signer,
    G: EvaluatorGateway,
{
    /// Workflow in `Idle`.
    pub fn new(keys: Arc<K>, signer: Arc<S>, gateway: Arc<G>, config: WorkflowConfig) -> Self {
        Self {
            keys,
            signer,
            gateway,
            config,
            machine: Mutex::new(WorkflowMachine::new()),
        }
    }

    /// Requester identity.
    pub fn identity(&self) -> Identity {
        self.signer.identity()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> WorkflowState {
        self.machine.lock().state().clone()
    }

    /// Snapshot of the current attempt's transition log.
    pub fn transitions(&self) -> Vec<TransitionRecord> {
        self.machine.lock().transitions().to_vec()
    }

    /// Run a full attempt for `form`.
    ///
    /// An invalid form returns [`WorkflowError::Validation`] and leaves the
    /// state where it was.
    pub async fn submit(&self, form: &ApplicantForm) -> Result<Category, WorkflowError> {
        let inputs = form.validate()?;
        let attempt = self.machine.lock().begin_submission()?;
        let owner = self.identity();
        tracing::info!(attempt_id = %attempt, owner = %owner.short(), "evaluation submitted");

        // Encrypting
        let request = self.encrypt_inputs(attempt, &owner, inputs).await?;
        self.step(attempt, |m| m.advance().map(drop))?;

        // Submitting
        let body = SubmissionBody {
            caller: owner,
            evaluator: self.gateway.evaluator_id(),
            attempt,
            request,
        };
        let bytes = body
            .signing_bytes()
            .map_err(|e| self.fail(attempt, FailureKind::Encoding, e.to_string()))?;
        let signature = self
            .signer
            .sign(SigningPurpose::Submission, &bytes)
            .await
            .map_err(|e| self.fail(attempt, e.failure_kind(), e.to_string()))?;
        self.step(attempt, |m| m.mark_dispatched())?;
        let tx = self
            .gateway
            .submit(SignedSubmission::new(body, signature))
            .await
            .map_err(|e| self.fail(attempt, e.failure_kind(), e.to_string()))?;
        self.step(attempt, |m| m.advance().map(drop))?;
        tracing::debug!(attempt_id = %attempt, %tx, "submission confirmed pending");

        // Confirming
        let result = self
            .gateway
            .await_confirmation(&tx)
            .await
            .map_err(|e| self.fail(attempt, e.failure_kind(), e.to_string()))?;
        self.step(attempt, |m| m.advance().map(drop))?;

        // Decrypting
        let category = self.decrypt_result(attempt, &result).await?;
        self.step(attempt, |m| m.complete(category))?;
        tracing::info!(attempt_id = %attempt, category = %category, "evaluation complete");
        Ok(category)
    }

    /// Replay the stored result for this requester.
    ///
    /// A zero-sentinel reply returns [`WorkflowError::NoPriorRecord`] and
    /// leaves the state unchanged. Otherwise the machine goes straight to
    /// `Decrypting` and on to `Complete`.
    pub async fn load_last_result(&self) -> Result<Category, WorkflowError> {
        {
            let machine = self.machine.lock();
            if !machine.phase().accepts_new_attempt() {
                if let Some(a) = machine.attempt() {
                    return Err(WorkflowStateError::AttemptInFlight {
                        attempt: a.id,
                        phase: machine.phase(),
                    }
                    .into());
                }
            }
        }

        let owner = self.identity();
        let last = self
            .gateway
            .last_result(&owner)
            .await
            .map_err(WorkflowError::Lookup)?;
        if last.is_sentinel() {
            tracing::debug!(owner = %owner.short(), "no prior record");
            return Err(WorkflowError::NoPriorRecord(owner));
        }

        let attempt = self.machine.lock().begin_replay()?;
        let category = self.decrypt_result(attempt, &last.result).await?;
        self.step(attempt, |m| m.complete(category))?;
        tracing::info!(attempt_id = %attempt, category = %category, "replayed last result");
        Ok(category)
    }

    /// Abandon the current attempt. Only valid before `Confirming` and
    /// before the signed submission has been handed to the gateway.
    pub fn cancel(&self) -> Result<(), WorkflowError> {
        Ok(self.machine.lock().cancel()?)
    }

    /// Mark the in-flight attempt `Failed(TIMEOUT)` after the caller gave up
    /// waiting. Returns `false` if nothing was in flight.
    pub fn record_timeout(&self, limit: Duration) -> bool {
        let mut machine = self.machine.lock();
        if !machine.phase().is_in_flight() {
            return false;
        }
        let reason = FailureReason::new(
            FailureKind::Timeout,
            format!("no resolution within {}ms", limit.as_millis()),
        );
        machine.fail(reason).is_ok()
    }

    // ── Phases ───────────────────────────────────────────────────────

    async fn encrypt_inputs(
        &self,
        attempt: AttemptId,
        owner: &Identity,
        inputs: ValidatedInputs,
    ) -> Result<EvaluationRequest, WorkflowError> {
        self.keys.ready().await.map_err(|e| {
            self.fail(
                attempt,
                FailureKind::TransientNetwork,
                format!("key service not ready: {e}"),
            )
        })?;
        let evaluator = self.gateway.evaluator_id();

        let mut proven = Vec::with_capacity(4);
        for plaintext in [
            Plaintext::Uint(u64::from(inputs.age)),
            Plaintext::Bool(inputs.has_history),
            Plaintext::Bool(inputs.has_chronic),
            Plaintext::Bool(inputs.lifestyle_risk),
        ] {
            self.ensure_current(attempt)?;
            let (value, proof) = self
                .keys
                .encrypt(plaintext, &evaluator, owner)
                .await
                .map_err(|e| self.fail(attempt, codec_failure_kind(&e), e.to_string()))?;
            proven.push(ProvenInput { value, proof });
        }

        match <[ProvenInput; 4]>::try_from(proven) {
            Ok([age, has_history, has_chronic, lifestyle_risk]) => Ok(EvaluationRequest {
                age,
                has_history,
                has_chronic,
                lifestyle_risk,
            }),
            Err(v) => Err(self.fail(
                attempt,
                FailureKind::Encoding,
                format!("expected 4 encrypted inputs, got {}", v.len()),
            )),
        }
    }

    async fn decrypt_result(
        &self,
        attempt: AttemptId,
        result: &EncryptedValue,
    ) -> Result<Category, WorkflowError> {
        let statement = AuthorizationStatement::new(
            self.identity(),
            self.gateway.evaluator_id(),
            result.handle(),
            Timestamp::now(),
            self.config.authorization_validity_secs,
        );
        let bytes = statement
            .signing_bytes()
            .map_err(|e| self.fail(attempt, FailureKind::Authorization, e.to_string()))?;
        let signature = self
            .signer
            .sign(SigningPurpose::DecryptionAuthorization, &bytes)
            .await
            .map_err(|e| self.fail(attempt, e.failure_kind(), e.to_string()))?;
        let auth = DecryptionAuthorization::from_parts(statement, signature);

        let plaintext = self
            .keys
            .decrypt(result, &auth)
            .await
            .map_err(|e| self.fail(attempt, codec_failure_kind(&e), e.to_string()))?;
        match plaintext {
            Plaintext::Uint(v) => Category::from_value(v).map_err(|e| {
                self.fail(
                    attempt,
                    FailureKind::Authorization,
                    format!("result handle does not hold a category: {e}"),
                )
            }),
            Plaintext::Bool(_) => Err(self.fail(
                attempt,
                FailureKind::Authorization,
                "result handle holds a bool, not a category",
            )),
        }
    }

    // ── Machine access ───────────────────────────────────────────────

    fn ensure_current(&self, attempt: AttemptId) -> Result<(), WorkflowError> {
        let machine = self.machine.lock();
        if machine.attempt().map(|a| a.id) == Some(attempt) {
            Ok(())
        } else {
            Err(WorkflowError::Cancelled(attempt))
        }
    }

    fn step<T>(
        &self,
        attempt: AttemptId,
        f: impl FnOnce(&mut WorkflowMachine) -> Result<T, WorkflowStateError>,
    ) -> Result<T, WorkflowError> {
        let mut machine = self.machine.lock();
        if machine.attempt().map(|a| a.id) != Some(attempt) {
            return Err(WorkflowError::Cancelled(attempt));
        }
        Ok(f(&mut machine)?)
    }

    fn fail(
        &self,
        attempt: AttemptId,
        kind: FailureKind,
        detail: impl Into<String>,
    ) -> WorkflowError {
        let reason = FailureReason::new(kind, detail);
        let mut machine = self.machine.lock();
        if machine.attempt().map(|a| a.id) != Some(attempt) {
            return WorkflowError::Cancelled(attempt);
        }
        if let Err(e) = machine.fail(reason.clone()) {
            return WorkflowError::State(e);
        }
        WorkflowError::Failed(reason)
    }
}
