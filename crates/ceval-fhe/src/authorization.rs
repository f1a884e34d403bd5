//! # Decryption Authorization
//!
//! A requester grants themselves decrypt rights over one handle, for one
//! evaluator, for a bounded time, by signing an [`AuthorizationStatement`].
//!
//! ## Security Invariant
//!
//! - The signed bytes are `CanonicalBytes` of
//!   `{"purpose": "ceval.decrypt.v1", "statement": {...}}`, so a signature
//!   made for any other purpose in the workspace cannot be replayed here.
//! - The signature must verify against the `requester` named inside the
//!   statement. Any other key's signature fails with
//!   [`AuthorizationError::BadSignature`].
//! - Validity is `1..=MAX_VALIDITY_SECS` seconds from `issued_at`.
//! - There is no revocation; expiry is the only way a grant ends.

use serde::{Deserialize, Serialize};

use ceval_core::{CanonicalBytes, EvaluatorId, Identity, Timestamp};
use ceval_crypto::{verify_identity, Ed25519Signature, KeyProvider};

use crate::error::AuthorizationError;
use crate::types::CiphertextHandle;

/// Longest allowed validity window (365 days).
pub const MAX_VALIDITY_SECS: u64 = 365 * 24 * 60 * 60;

/// Validity window used when none is configured (one day).
pub const DEFAULT_VALIDITY_SECS: u64 = 24 * 60 * 60;

const PURPOSE: &str = "ceval.decrypt.v1";

/// The unsigned body of an authorization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorizationStatement {
    /// Who may decrypt.
    pub requester: Identity,
    /// Evaluator that produced the handle.
    pub evaluator: EvaluatorId,
    /// The one handle this grant covers.
    pub handle: CiphertextHandle,
    /// Start of validity.
    pub issued_at: Timestamp,
    /// Length of validity in seconds.
    pub valid_for_secs: u64,
}

#[derive(Serialize)]
struct SignedPayload<'a> {
    purpose: &'static str,
    statement: &'a AuthorizationStatement,
}

impl AuthorizationStatement {
    /// Build a statement.
    pub fn new(
        requester: Identity,
        evaluator: EvaluatorId,
        handle: CiphertextHandle,
        issued_at: Timestamp,
        valid_for_secs: u64,
    ) -> Self {
        Self {
            requester,
            evaluator,
            handle,
            issued_at,
            valid_for_secs,
        }
    }

    /// Bytes the requester signs.
    pub fn signing_bytes(&self) -> Result<CanonicalBytes, AuthorizationError> {
        Ok(CanonicalBytes::new(&SignedPayload {
            purpose: PURPOSE,
            statement: self,
        })?)
    }

    /// End of the validity window.
    pub fn expires_at(&self) -> Timestamp {
        self.issued_at.plus_secs(self.valid_for_secs)
    }
}

/// A signed, time-bounded decrypt grant for one (requester, evaluator,
/// handle) triple.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecryptionAuthorization {
    statement: AuthorizationStatement,
    signature: Ed25519Signature,
}

impl DecryptionAuthorization {
    /// Pair a statement with a signature produced elsewhere.
    pub fn from_parts(statement: AuthorizationStatement, signature: Ed25519Signature) -> Self {
        Self {
            statement,
            signature,
        }
    }

    /// Sign a fresh statement with the requester's own key.
    pub fn issue<K: KeyProvider + ?Sized>(
        key: &K,
        evaluator: EvaluatorId,
        handle: CiphertextHandle,
        issued_at: Timestamp,
        valid_for_secs: u64,
    ) -> Result<Self, AuthorizationError> {
        let statement =
            AuthorizationStatement::new(key.identity(), evaluator, handle, issued_at, valid_for_secs);
        let signature = key
            .sign(&statement.signing_bytes()?)
            .map_err(|e| AuthorizationError::SigningFailed(e.to_string()))?;
        Ok(Self::from_parts(statement, signature))
    }

    /// The signed statement.
    pub fn statement(&self) -> &AuthorizationStatement {
        &self.statement
    }

    /// Requester named in the statement.
    pub fn requester(&self) -> &Identity {
        &self.statement.requester
    }

    /// Evaluator named in the statement.
    pub fn evaluator(&self) -> &EvaluatorId {
        &self.statement.evaluator
    }

    /// Handle named in the statement.
    pub fn handle(&self) -> &CiphertextHandle {
        &self.statement.handle
    }

    /// Check the window and the signature as of `now`.
    pub fn verify(&self, now: Timestamp) -> Result<(), AuthorizationError> {
        let s = &self.statement;
        if s.valid_for_secs == 0 || s.valid_for_secs > MAX_VALIDITY_SECS {
            return Err(AuthorizationError::InvalidWindow {
                secs: s.valid_for_secs,
                max: MAX_VALIDITY_SECS,
            });
        }
        if now < s.issued_at {
            return Err(AuthorizationError::NotYetValid {
                issued_at: s.issued_at,
            });
        }
        let expired_at = s.expires_at();
        if now >= expired_at {
            return Err(AuthorizationError::Expired { expired_at });
        }
        verify_identity(&s.signing_bytes()?, &self.signature, &s.requester)
            .map_err(|_| AuthorizationError::BadSignature)
    }
}
