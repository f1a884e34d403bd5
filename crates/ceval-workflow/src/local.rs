//! # In-Process Boundary Implementations
//!
//! [`LocalKeyService`], [`LocalSigner`] and [`LocalGateway`] run the whole
//! pipeline inside one process: the key service is a [`CiphertextCodec`],
//! the signer wraps a [`KeyProvider`], and the gateway queues signed
//! submissions and runs them on a shared [`RiskEvaluator`] when
//! confirmation is awaited.
//!
//! Each has a switch that simulates the failure its remote counterpart
//! can produce (key service offline, user declining, network down).

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use ceval_core::{CanonicalBytes, EvaluatorId, Identity};
use ceval_crypto::{Ed25519Signature, KeyProvider};
use ceval_evaluator::{EvaluatorError, LastResult, RiskEvaluator};
use ceval_fhe::{
    AuthorizationError, CiphertextCodec, CodecError, DecryptionAuthorization, EncryptedValue,
    Plaintext, ValidityProof,
};

use crate::boundary::{
    EvaluatorGateway, GatewayError, KeyService, Signer, SignerError, SigningPurpose,
};
use crate::submission::{SignedSubmission, TxId};

// ── Key service ──────────────────────────────────────────────────────

/// Key service backed by a local codec.
#[derive(Debug, Clone)]
pub struct LocalKeyService {
    codec: CiphertextCodec,
}

impl LocalKeyService {
    /// Wrap `codec`.
    pub fn new(codec: CiphertextCodec) -> Self {
        Self { codec }
    }

    /// Underlying codec.
    pub fn codec(&self) -> &CiphertextCodec {
        &self.codec
    }
}

impl KeyService for LocalKeyService {
    async fn ready(&self) -> Result<(), CodecError> {
        tokio::task::yield_now().await;
        if self.codec.substrate().key_service_available() {
            Ok(())
        } else {
            Err(AuthorizationError::KeyServiceUnavailable.into())
        }
    }

    async fn encrypt(
        &self,
        plaintext: Plaintext,
        evaluator: &EvaluatorId,
        owner: &Identity,
    ) -> Result<(EncryptedValue, ValidityProof), CodecError> {
        self.codec.encrypt(plaintext, evaluator, owner)
    }

    async fn decrypt(
        &self,
        value: &EncryptedValue,
        auth: &DecryptionAuthorization,
    ) -> Result<Plaintext, CodecError> {
        tokio::task::yield_now().await;
        self.codec.decrypt(value, auth)
    }
}

// ── Signer ───────────────────────────────────────────────────────────

/// Signer over a key provider, with per-purpose refusal switches.
pub struct LocalSigner {
    key: Arc<dyn KeyProvider>,
    reject_submission: AtomicBool,
    reject_authorization: AtomicBool,
}

impl std::fmt::Debug for LocalSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalSigner")
            .field("provider", &self.key.provider_name())
            .field("identity", &self.key.identity())
            .finish()
    }
}

impl LocalSigner {
    /// Signer that approves everything.
    pub fn new(key: Arc<dyn KeyProvider>) -> Self {
        Self {
            key,
            reject_submission: AtomicBool::new(false),
            reject_authorization: AtomicBool::new(false),
        }
    }

    /// Make the user decline (or stop declining) requests for `purpose`.
    pub fn set_rejecting(&self, purpose: SigningPurpose, reject: bool) {
        let flag = match purpose {
            SigningPurpose::Submission => &self.reject_submission,
            SigningPurpose::DecryptionAuthorization => &self.reject_authorization,
        };
        flag.store(reject, Ordering::SeqCst);
    }

    fn rejects(&self, purpose: SigningPurpose) -> bool {
        match purpose {
            SigningPurpose::Submission => self.reject_submission.load(Ordering::SeqCst),
            SigningPurpose::DecryptionAuthorization => {
                self.reject_authorization.load(Ordering::SeqCst)
            }
        }
    }
}

impl Signer for LocalSigner {
    fn identity(&self) -> Identity {
        self.key.identity()
    }

    async fn sign(
        &self,
        purpose: SigningPurpose,
        payload: &CanonicalBytes,
    ) -> Result<Ed25519Signature, SignerError> {
        tokio::task::yield_now().await;
        if self.rejects(purpose) {
            return Err(SignerError::Rejected { purpose });
        }
        self.key
            .sign(payload)
            .map_err(|e| SignerError::Unavailable(e.to_string()))
    }
}

// ── Gateway ──────────────────────────────────────────────────────────

/// Gateway in front of an in-process evaluator.
///
/// `submit` verifies the signature and queues the request. The request
/// runs on the evaluator when `await_confirmation` is called for it, so a
/// submission that is accepted but never confirmed leaves no trace in the
/// result store.
#[derive(Debug)]
pub struct LocalGateway {
    evaluator: Arc<RiskEvaluator>,
    pending: Mutex<HashMap<TxId, SignedSubmission>>,
    online: AtomicBool,
}

impl LocalGateway {
    /// Gateway for `evaluator`.
    pub fn new(evaluator: Arc<RiskEvaluator>) -> Self {
        Self {
            evaluator,
            pending: Mutex::new(HashMap::new()),
            online: AtomicBool::new(true),
        }
    }

    /// The evaluator behind this gateway.
    pub fn evaluator(&self) -> &Arc<RiskEvaluator> {
        &self.evaluator
    }

    /// Simulate the network going down or coming back.
    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }

    /// Accepted submissions not yet confirmed.
    pub fn pending_len(&self) -> usize {
        self.pending.lock().len()
    }

    fn ensure_online(&self) -> Result<(), GatewayError> {
        if self.online.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(GatewayError::Unreachable("local gateway offline".to_string()))
        }
    }
}

impl EvaluatorGateway for LocalGateway {
    fn evaluator_id(&self) -> EvaluatorId {
        *self.evaluator.id()
    }

    async fn submit(&self, submission: SignedSubmission) -> Result<TxId, GatewayError> {
        tokio::task::yield_now().await;
        self.ensure_online()?;
        let served = *self.evaluator.id();
        if submission.body().evaluator != served {
            return Err(GatewayError::WrongEvaluator {
                addressed: submission.body().evaluator,
                served,
            });
        }
        let tx = submission.verify()?;

        let mut pending = self.pending.lock();
        if pending.contains_key(&tx) {
            return Err(GatewayError::DuplicateTransaction(tx));
        }
        pending.insert(tx, submission);
        tracing::debug!(%tx, "submission accepted");
        Ok(tx)
    }

    async fn await_confirmation(&self, tx: &TxId) -> Result<EncryptedValue, GatewayError> {
        tokio::task::yield_now().await;
        self.ensure_online()?;
        let submission = self
            .pending
            .lock()
            .remove(tx)
            .ok_or(GatewayError::UnknownTransaction(*tx))?;
        let body = submission.body();
        self.evaluator
            .evaluate(&body.caller, &body.request)
            .map_err(|e| match e {
                EvaluatorError::ProofVerification { input, reason } => {
                    GatewayError::ProofVerification(format!("{input}: {reason}"))
                }
                EvaluatorError::Substrate(err) => GatewayError::Reverted(err.to_string()),
            })
    }

    async fn last_result(&self, identity: &Identity) -> Result<LastResult, GatewayError> {
        tokio::task::yield_now().await;
        self.ensure_online()?;
        Ok(self.evaluator.get_last_result(identity))
    }
}
