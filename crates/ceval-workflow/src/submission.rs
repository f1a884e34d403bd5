//! # Signed Submission
//!
//! The evaluation request as it crosses the network boundary. The caller
//! signs `CanonicalBytes` of
//! `{"purpose": "ceval.submit.v1", "submission": {caller, evaluator, attempt, request}}`,
//! and the gateway refuses anything whose signature does not verify
//! against the `caller` named inside. That signature is what makes
//! `caller` the "calling identity" the input proofs are checked against.

use serde::Serialize;

use ceval_core::{
    sha256_digest, AttemptId, CanonicalBytes, CanonicalizationError, ContentDigest, EvaluatorId,
    Identity,
};
use ceval_crypto::{verify_identity, Ed25519Signature};
use ceval_evaluator::EvaluationRequest;

use crate::boundary::GatewayError;

const PURPOSE: &str = "ceval.submit.v1";

/// Transaction id: SHA-256 of the signed submission bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TxId(pub ContentDigest);

impl std::fmt::Display for TxId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "tx:{}", self.0.to_hex())
    }
}

/// Unsigned submission.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionBody {
    /// Who is asking.
    pub caller: Identity,
    /// Evaluator addressed.
    pub evaluator: EvaluatorId,
    /// Workflow attempt, so two submissions of equal inputs differ.
    pub attempt: AttemptId,
    /// The proven inputs.
    pub request: EvaluationRequest,
}

#[derive(Serialize)]
struct SignedPayload<'a> {
    purpose: &'static str,
    submission: &'a SubmissionBody,
}

impl SubmissionBody {
    /// Bytes the caller signs.
    pub fn signing_bytes(&self) -> Result<CanonicalBytes, CanonicalizationError> {
        CanonicalBytes::new(&SignedPayload {
            purpose: PURPOSE,
            submission: self,
        })
    }
}

/// A submission with the caller's signature.
#[derive(Debug, Clone)]
pub struct SignedSubmission {
    body: SubmissionBody,
    signature: Ed25519Signature,
}

impl SignedSubmission {
    /// Pair a body with its signature.
    pub fn new(body: SubmissionBody, signature: Ed25519Signature) -> Self {
        Self { body, signature }
    }

    /// The body.
    pub fn body(&self) -> &SubmissionBody {
        &self.body
    }

    /// The caller's signature.
    pub fn signature(&self) -> &Ed25519Signature {
        &self.signature
    }

    /// Check the signature against `body.caller` and derive the tx id.
    pub fn verify(&self) -> Result<TxId, GatewayError> {
        let bytes = self
            .body
            .signing_bytes()
            .map_err(|e| GatewayError::BadSignature(e.to_string()))?;
        verify_identity(&bytes, &self.signature, &self.body.caller)
            .map_err(|e| GatewayError::BadSignature(e.to_string()))?;
        Ok(TxId(sha256_digest(&bytes)))
    }
}
