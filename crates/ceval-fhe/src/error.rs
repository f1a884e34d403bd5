//! Error types for the codec, the substrate, and authorization checks.

use thiserror::Error;

use ceval_core::{CanonicalizationError, CryptoError, Timestamp};

use crate::types::{CiphertextHandle, FheType};

/// Failure inside the ciphertext substrate.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SubstrateError {
    /// No ciphertext is stored under this handle.
    #[error("unknown ciphertext handle {0:?}")]
    UnknownHandle(CiphertextHandle),

    /// Operator applied to the wrong ciphertext type.
    #[error("{op} expects {expected}, got {found}")]
    TypeMismatch {
        /// Operator name.
        op: &'static str,
        /// Required type.
        expected: FheType,
        /// Supplied type.
        found: FheType,
    },

    /// Stored ciphertext failed its integrity check.
    #[error("ciphertext integrity: {0}")]
    Integrity(#[from] CryptoError),
}

/// Why a decryption authorization was refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthorizationError {
    /// Signature does not verify against the named requester.
    #[error("signature does not match requester")]
    BadSignature,

    /// Validity window has passed.
    #[error("authorization expired at {expired_at}")]
    Expired {
        /// End of the validity window.
        expired_at: Timestamp,
    },

    /// Issued in the future relative to the verifier's clock.
    #[error("authorization not valid until {issued_at}")]
    NotYetValid {
        /// Declared issue time.
        issued_at: Timestamp,
    },

    /// Validity window is zero or longer than allowed.
    #[error("validity window of {secs}s is outside 1..={max}s")]
    InvalidWindow {
        /// Requested window.
        secs: u64,
        /// Maximum window.
        max: u64,
    },

    /// Authorization is for a different handle.
    #[error("authorization is scoped to another handle")]
    WrongHandle,

    /// Requester or evaluator is not on the handle's access list.
    #[error("{principal} is not permitted on handle {handle:?}")]
    NotPermitted {
        /// Who was missing.
        principal: String,
        /// Handle checked.
        handle: CiphertextHandle,
    },

    /// Requester's key provider could not sign.
    #[error("signing failed: {0}")]
    SigningFailed(String),

    /// Key service could not be reached.
    #[error("key service unavailable")]
    KeyServiceUnavailable,

    /// Statement could not be canonicalized.
    #[error("statement canonicalization failed: {0}")]
    Canonicalization(String),
}

/// Error returned by the ciphertext codec.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CodecError {
    /// Plaintext outside the representable range of its type.
    #[error("value {value} does not fit {fhe_type} (max {max})")]
    Encoding {
        /// Offending value.
        value: u64,
        /// Target type.
        fhe_type: FheType,
        /// Largest representable value.
        max: u64,
    },

    /// Input proof missing, malformed, or bound to another statement.
    #[error("proof verification failed: {0}")]
    ProofVerification(String),

    /// Decryption refused.
    #[error("authorization failed: {0}")]
    Authorization(#[from] AuthorizationError),

    /// Substrate failure.
    #[error("substrate error: {0}")]
    Substrate(#[from] SubstrateError),
}

impl From<CanonicalizationError> for AuthorizationError {
    fn from(e: CanonicalizationError) -> Self {
        Self::Canonicalization(e.to_string())
    }
}
