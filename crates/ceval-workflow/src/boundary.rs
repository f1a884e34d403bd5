//! # Network Boundary
//!
//! The workflow talks to three collaborators, each behind a trait so the
//! in-process implementations in [`crate::local`] can be swapped for
//! remote ones:
//!
//! - [`KeyService`]: encryption and authorized decryption.
//! - [`Signer`]: the requester's wallet. It may refuse.
//! - [`EvaluatorGateway`]: submits signed requests to the evaluator and
//!   reads the result store.
//!
//! Every call is `async` because every one of them suspends the caller
//! while an external party responds. The traits are used generically,
//! never as trait objects.

use thiserror::Error;

use ceval_core::{CanonicalBytes, EvaluatorId, Identity};
use ceval_crypto::Ed25519Signature;
use ceval_evaluator::LastResult;
use ceval_fhe::{
    CodecError, DecryptionAuthorization, EncryptedValue, Plaintext, ValidityProof,
};
use ceval_state::FailureKind;

use crate::submission::{SignedSubmission, TxId};

// ── Errors ───────────────────────────────────────────────────────────

/// What the signer is being asked to sign.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SigningPurpose {
    /// The evaluation submission.
    Submission,
    /// A decryption authorization for the caller's own result.
    DecryptionAuthorization,
}

impl std::fmt::Display for SigningPurpose {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Submission => "submission",
            Self::DecryptionAuthorization => "decryption authorization",
        })
    }
}

/// Signer failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SignerError {
    /// The user declined.
    #[error("signer rejected the {purpose} request")]
    Rejected {
        /// What was declined.
        purpose: SigningPurpose,
    },

    /// The signer could not be reached or failed internally.
    #[error("signer unavailable: {0}")]
    Unavailable(String),
}

impl SignerError {
    /// Failure kind for `Failed(reason)`.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::Rejected { .. } => FailureKind::UserRejected,
            Self::Unavailable(_) => FailureKind::TransientNetwork,
        }
    }
}

/// Evaluator gateway failures.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// Submission signature did not verify against its caller.
    #[error("submission signature rejected: {0}")]
    BadSignature(String),

    /// Submission addressed to another evaluator.
    #[error("submission addressed to evaluator {addressed}, gateway serves {served}")]
    WrongEvaluator {
        /// Evaluator named in the submission.
        addressed: EvaluatorId,
        /// Evaluator behind this gateway.
        served: EvaluatorId,
    },

    /// An input proof failed; the evaluator wrote nothing.
    #[error("evaluator rejected inputs: {0}")]
    ProofVerification(String),

    /// The evaluator reverted for another reason.
    #[error("evaluation reverted: {0}")]
    Reverted(String),

    /// No such pending transaction.
    #[error("unknown transaction {0}")]
    UnknownTransaction(TxId),

    /// The same submission was already accepted.
    #[error("duplicate transaction {0}")]
    DuplicateTransaction(TxId),

    /// Network unreachable or timed out.
    #[error("evaluator unreachable: {0}")]
    Unreachable(String),
}

impl GatewayError {
    /// Failure kind for `Failed(reason)`.
    pub fn failure_kind(&self) -> FailureKind {
        match self {
            Self::BadSignature(_) | Self::WrongEvaluator { .. } => FailureKind::Authorization,
            Self::ProofVerification(_) | Self::Reverted(_) => FailureKind::ProofVerification,
            Self::UnknownTransaction(_)
            | Self::DuplicateTransaction(_)
            | Self::Unreachable(_) => FailureKind::TransientNetwork,
        }
    }
}

/// Failure kind for a codec error.
pub fn codec_failure_kind(err: &CodecError) -> FailureKind {
    match err {
        CodecError::Encoding { .. } => FailureKind::Encoding,
        CodecError::ProofVerification(_) => FailureKind::ProofVerification,
        CodecError::Authorization(_) | CodecError::Substrate(_) => FailureKind::Authorization,
    }
}

// ── Traits ───────────────────────────────────────────────────────────

/// Encryption and authorized decryption.
#[allow(async_fn_in_trait)]
pub trait KeyService: Send + Sync {
    /// Resolve once the service can take requests.
    async fn ready(&self) -> Result<(), CodecError>;

    /// Encrypt for `evaluator` on behalf of `owner`.
    async fn encrypt(
        &self,
        plaintext: Plaintext,
        evaluator: &EvaluatorId,
        owner: &Identity,
    ) -> Result<(EncryptedValue, ValidityProof), CodecError>;

    /// Decrypt under `auth`.
    async fn decrypt(
        &self,
        value: &EncryptedValue,
        auth: &DecryptionAuthorization,
    ) -> Result<Plaintext, CodecError>;
}

/// The requester's signing wallet.
#[allow(async_fn_in_trait)]
pub trait Signer: Send + Sync {
    /// Identity of the signing key.
    fn identity(&self) -> Identity;

    /// Ask the user to sign `payload` for `purpose`.
    async fn sign(
        &self,
        purpose: SigningPurpose,
        payload: &CanonicalBytes,
    ) -> Result<Ed25519Signature, SignerError>;
}

/// Access to the remote evaluator.
#[allow(async_fn_in_trait)]
pub trait EvaluatorGateway: Send + Sync {
    /// Identity of the evaluator behind this gateway.
    fn evaluator_id(&self) -> EvaluatorId;

    /// Hand a signed submission to the network. `Ok` means accepted into
    /// the evaluator's execution environment, not yet evaluated.
    async fn submit(&self, submission: SignedSubmission) -> Result<TxId, GatewayError>;

    /// Wait for the evaluator to resolve `tx` and return the result handle.
    async fn await_confirmation(&self, tx: &TxId) -> Result<EncryptedValue, GatewayError>;

    /// `getLastResult(identity)`.
    async fn last_result(&self, identity: &Identity) -> Result<LastResult, GatewayError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use ceval_core::ContentDigest;
    use ceval_fhe::AuthorizationError;

    #[test]
    fn signer_rejection_is_user_rejected() {
        let e = SignerError::Rejected {
            purpose: SigningPurpose::Submission,
        };
        assert_eq!(e.failure_kind(), FailureKind::UserRejected);
        assert_eq!(e.to_string(), "signer rejected the submission request");
        assert_eq!(
            SignerError::Unavailable("x".into()).failure_kind(),
            FailureKind::TransientNetwork
        );
    }

    #[test]
    fn gateway_kinds() {
        assert_eq!(
            GatewayError::ProofVerification("x".into()).failure_kind(),
            FailureKind::ProofVerification
        );
        assert_eq!(
            GatewayError::Unreachable("x".into()).failure_kind(),
            FailureKind::TransientNetwork
        );
        assert_eq!(
            GatewayError::BadSignature("x".into()).failure_kind(),
            FailureKind::Authorization
        );
        assert_eq!(
            GatewayError::UnknownTransaction(TxId(ContentDigest([0; 32]))).failure_kind(),
            FailureKind::TransientNetwork
        );
    }

    #[test]
    fn codec_kinds() {
        assert_eq!(
            codec_failure_kind(&CodecError::Encoding {
                value: 300,
                fhe_type: ceval_fhe::FheType::Uint8,
                max: 255
            }),
            FailureKind::Encoding
        );
        assert_eq!(
            codec_failure_kind(&CodecError::Authorization(AuthorizationError::WrongHandle)),
            FailureKind::Authorization
        );
        assert_eq!(
            codec_failure_kind(&CodecError::Authorization(
                AuthorizationError::KeyServiceUnavailable
            )),
            FailureKind::Authorization
        );
    }
}
