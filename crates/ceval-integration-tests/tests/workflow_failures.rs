//! Failure paths through the whole workflow: each ends in `Failed(kind)`
//! with the store untouched, and a fresh submission recovers.

mod common;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Notify;

use ceval_core::{ApplicantForm, CanonicalBytes, Category, EvaluatorId, Identity};
use ceval_crypto::{Ed25519Signature, LocalKeyProvider};
use ceval_evaluator::LastResult;
use ceval_fhe::{CodecError, DecryptionAuthorization, EncryptedValue, Plaintext, ValidityProof};
use ceval_state::{FailureKind, Phase, WorkflowState};
use ceval_workflow::{
    EvaluationWorkflow, EvaluatorGateway, GatewayError, KeyService, LocalGateway,
    LocalKeyService, LocalSigner, SignedSubmission, Signer, SignerError, SigningPurpose, TxId,
    WorkflowConfig, WorkflowError,
};

use common::Deployment;

fn form() -> ApplicantForm {
    ApplicantForm::new(29, false, false, false)
}

fn failed_with(state: &WorkflowState) -> Option<FailureKind> {
    state.failure().map(|r| r.kind)
}

fn last_phase_before_failure<K, S, G>(wf: &EvaluationWorkflow<K, S, G>) -> Option<Phase>
where
    K: KeyService,
    S: Signer,
    G: ceval_workflow::EvaluatorGateway,
{
    wf.transitions()
        .iter()
        .find(|t| t.to == Phase::Failed)
        .map(|t| t.from)
}

// ── Collaborators with faults ───────────────────────────────────────

/// Encrypts every input for `owner` instead of the caller.
struct MisaddressedKeys {
    inner: LocalKeyService,
    owner: Identity,
}

impl KeyService for MisaddressedKeys {
    async fn ready(&self) -> Result<(), CodecError> {
        self.inner.ready().await
    }

    async fn encrypt(
        &self,
        plaintext: Plaintext,
        evaluator: &EvaluatorId,
        _owner: &Identity,
    ) -> Result<(EncryptedValue, ValidityProof), CodecError> {
        self.inner.encrypt(plaintext, evaluator, &self.owner).await
    }

    async fn decrypt(
        &self,
        value: &EncryptedValue,
        auth: &DecryptionAuthorization,
    ) -> Result<Plaintext, CodecError> {
        self.inner.decrypt(value, auth).await
    }
}

/// A wallet that can be told to never answer.
struct StallingSigner {
    inner: LocalSigner,
    stall: AtomicBool,
}

impl Signer for StallingSigner {
    fn identity(&self) -> Identity {
        self.inner.identity()
    }

    async fn sign(
        &self,
        purpose: SigningPurpose,
        payload: &CanonicalBytes,
    ) -> Result<Ed25519Signature, SignerError> {
        if self.stall.load(Ordering::SeqCst) {
            std::future::pending::<()>().await;
        }
        self.inner.sign(purpose, payload).await
    }
}

/// A gateway whose `submit` announces itself and then waits to be let
/// through.
struct HeldGateway {
    inner: Arc<LocalGateway>,
    entered: Notify,
    release: Notify,
}

impl EvaluatorGateway for HeldGateway {
    fn evaluator_id(&self) -> EvaluatorId {
        self.inner.evaluator_id()
    }

    async fn submit(&self, submission: SignedSubmission) -> Result<TxId, GatewayError> {
        self.entered.notify_one();
        self.release.notified().await;
        self.inner.submit(submission).await
    }

    async fn await_confirmation(&self, tx: &TxId) -> Result<EncryptedValue, GatewayError> {
        self.inner.await_confirmation(tx).await
    }

    async fn last_result(&self, identity: &Identity) -> Result<LastResult, GatewayError> {
        self.inner.last_result(identity).await
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[tokio::test]
async fn user_rejection_then_retry() {
    let d = Deployment::new();
    let (wf, signer) = d.requester();
    signer.set_rejecting(SigningPurpose::Submission, true);

    let err = wf.submit(&form()).await.unwrap_err();
    assert_eq!(err.failure_kind(), Some(FailureKind::UserRejected));
    assert_eq!(failed_with(&wf.state()), Some(FailureKind::UserRejected));
    assert_eq!(last_phase_before_failure(&wf), Some(Phase::Submitting));
    assert!(d.evaluator.get_last_result(&wf.identity()).is_sentinel());
    assert_eq!(d.gateway.pending_len(), 0);

    signer.set_rejecting(SigningPurpose::Submission, false);
    assert_eq!(wf.submit(&form()).await.unwrap(), Category::Eligible);
}

#[tokio::test]
async fn declined_decryption_keeps_the_stored_result() {
    let d = Deployment::new();
    let (wf, signer) = d.requester();
    signer.set_rejecting(SigningPurpose::DecryptionAuthorization, true);

    let err = wf.submit(&form()).await.unwrap_err();
    assert_eq!(err.failure_kind(), Some(FailureKind::UserRejected));
    assert_eq!(last_phase_before_failure(&wf), Some(Phase::Decrypting));
    assert!(!d.evaluator.get_last_result(&wf.identity()).is_sentinel());

    signer.set_rejecting(SigningPurpose::DecryptionAuthorization, false);
    assert_eq!(wf.load_last_result().await.unwrap(), Category::Eligible);
}

#[tokio::test]
async fn gateway_outage_is_transient() {
    let d = Deployment::new();
    let (wf, _) = d.requester();
    d.gateway.set_online(false);

    let err = wf.submit(&form()).await.unwrap_err();
    assert_eq!(err.failure_kind(), Some(FailureKind::TransientNetwork));
    assert_eq!(
        failed_with(&wf.state()).map(|k| k.code()),
        Some("TRANSIENT_NETWORK_ERROR")
    );
    assert_eq!(last_phase_before_failure(&wf), Some(Phase::Submitting));

    d.gateway.set_online(true);
    assert_eq!(wf.submit(&form()).await.unwrap(), Category::Eligible);
}

#[tokio::test]
async fn key_service_outage_before_encryption_is_transient() {
    let d = Deployment::new();
    let (wf, _) = d.requester();
    d.substrate.set_key_service_available(false);

    let err = wf.submit(&form()).await.unwrap_err();
    assert_eq!(err.failure_kind(), Some(FailureKind::TransientNetwork));
    assert_eq!(last_phase_before_failure(&wf), Some(Phase::Encrypting));
    assert!(d.substrate.is_empty());
}

#[tokio::test]
async fn misaddressed_inputs_fail_proof_verification() {
    let d = Deployment::new();
    let signer = Arc::new(LocalSigner::new(Arc::new(LocalKeyProvider::generate())));
    let keys = Arc::new(MisaddressedKeys {
        inner: LocalKeyService::new(d.codec.clone()),
        owner: Identity::from_bytes([0x5A; 32]),
    });
    let wf = EvaluationWorkflow::new(
        keys,
        signer,
        d.gateway.clone(),
        WorkflowConfig::default(),
    );

    let err = wf.submit(&form()).await.unwrap_err();
    assert_eq!(err.failure_kind(), Some(FailureKind::ProofVerification));
    assert_eq!(
        failed_with(&wf.state()).map(|k| k.code()),
        Some("PROOF_VERIFICATION_ERROR")
    );
    assert!(d.evaluator.get_last_result(&wf.identity()).is_sentinel());
    assert!(d.evaluator.events().history().is_empty());
}

#[tokio::test]
async fn invalid_ages_never_leave_idle() {
    let d = Deployment::new();
    let (wf, _) = d.requester();
    for age in [0, -1, 151, 1_000] {
        let err = wf
            .submit(&ApplicantForm::new(age, false, false, false))
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::Validation(_)), "age {age}");
        assert_eq!(wf.state(), WorkflowState::Idle);
    }
    assert!(d.substrate.is_empty());
}

#[tokio::test]
async fn stalled_signer_times_out_then_recovers() {
    let d = Deployment::new();
    let signer = Arc::new(StallingSigner {
        inner: LocalSigner::new(Arc::new(LocalKeyProvider::generate())),
        stall: AtomicBool::new(true),
    });
    let wf = EvaluationWorkflow::new(
        d.keys.clone(),
        signer.clone(),
        d.gateway.clone(),
        WorkflowConfig::default(),
    );

    let limit = Duration::from_millis(20);
    let outcome = tokio::time::timeout(limit, wf.submit(&form())).await;
    assert!(outcome.is_err());
    assert_eq!(wf.state().phase(), Phase::Submitting);

    assert!(wf.record_timeout(limit));
    assert_eq!(failed_with(&wf.state()), Some(FailureKind::Timeout));
    assert!(!wf.record_timeout(limit));
    assert!(d.evaluator.get_last_result(&wf.identity()).is_sentinel());

    signer.stall.store(false, Ordering::SeqCst);
    assert_eq!(wf.submit(&form()).await.unwrap(), Category::Eligible);
}

#[tokio::test]
async fn cancel_while_signing_returns_to_idle() {
    let d = Deployment::new();
    let signer = Arc::new(StallingSigner {
        inner: LocalSigner::new(Arc::new(LocalKeyProvider::generate())),
        stall: AtomicBool::new(true),
    });
    let wf = EvaluationWorkflow::new(
        d.keys.clone(),
        signer,
        d.gateway.clone(),
        WorkflowConfig::default(),
    );

    let outcome = tokio::time::timeout(Duration::from_millis(20), wf.submit(&form())).await;
    assert!(outcome.is_err());
    wf.cancel().unwrap();
    assert_eq!(wf.state(), WorkflowState::Idle);
    assert!(wf.transitions().is_empty());
    assert!(d.evaluator.get_last_result(&wf.identity()).is_sentinel());
}

#[tokio::test]
async fn cancel_is_refused_once_confirming() {
    let d = Deployment::new();
    let (wf, _) = d.requester();
    wf.submit(&form()).await.unwrap();
    assert!(matches!(wf.cancel(), Err(WorkflowError::State(_))));
    assert!(matches!(wf.state(), WorkflowState::Complete(Category::Eligible)));
}

#[tokio::test]
async fn cancel_is_refused_while_the_gateway_holds_the_submission() {
    let d = Deployment::new();
    let gateway = Arc::new(HeldGateway {
        inner: d.gateway.clone(),
        entered: Notify::new(),
        release: Notify::new(),
    });
    let wf = EvaluationWorkflow::new(
        d.keys.clone(),
        Arc::new(LocalSigner::new(Arc::new(LocalKeyProvider::generate()))),
        gateway.clone(),
        WorkflowConfig::default(),
    );

    let cancel_mid_submit = async {
        gateway.entered.notified().await;
        let refused = wf.cancel();
        let phase = wf.state().phase();
        gateway.release.notify_one();
        (refused, phase)
    };
    let submitted = form();
    let (outcome, (refused, phase)) = tokio::join!(wf.submit(&submitted), cancel_mid_submit);

    assert!(matches!(refused, Err(WorkflowError::State(_))), "{refused:?}");
    assert_eq!(phase, Phase::Submitting);
    assert_eq!(outcome.unwrap(), Category::Eligible);
    assert_eq!(d.gateway.pending_len(), 0);
    assert!(!d.evaluator.get_last_result(&wf.identity()).is_sentinel());
    assert!(matches!(wf.state(), WorkflowState::Complete(Category::Eligible)));
}
