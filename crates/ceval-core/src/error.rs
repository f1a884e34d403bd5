//! # Error Types — Structured Error Hierarchy
//!
//! All errors use `thiserror` for derive-based `Display` and `Error`.
//!
//! ## Design
//!
//! - Cryptographic errors fail loudly with full context.
//! - Validation errors name the offending field and the accepted range.
//! - Nothing here ever carries a decrypted value. Out-of-range inputs are
//!   reported with the submitted value because that value is still local
//!   to the requester when validation runs.

use thiserror::Error;

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    #[error("float values are not permitted in canonical representations; use an integer: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

/// Local validation of plaintext inputs and encoded identifiers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Age outside the accepted input band.
    #[error("age {value} is outside the accepted range {min}..={max}")]
    AgeOutOfRange {
        /// Submitted value.
        value: i64,
        /// Inclusive lower bound.
        min: i64,
        /// Inclusive upper bound.
        max: i64,
    },

    /// Age text is not a whole number.
    #[error("age {value:?} is not a whole number")]
    AgeNotWholeNumber {
        /// Submitted text.
        value: String,
    },

    /// A tri-state risk flag has not been answered.
    #[error("risk flag {field} is unset")]
    RiskFlagUnset {
        /// Field name.
        field: &'static str,
    },

    /// Category tag outside {1, 2, 3}.
    #[error("unknown category tag {0}")]
    UnknownCategory(u64),

    /// Malformed hex input.
    #[error("invalid hex: {reason}")]
    InvalidHex {
        /// What went wrong.
        reason: String,
    },

    /// Malformed or out-of-range timestamp.
    #[error("invalid timestamp {value:?}: {reason}")]
    InvalidTimestamp {
        /// The offending input.
        value: String,
        /// What went wrong.
        reason: String,
    },
}

/// Error in cryptographic operations.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// Signature verification failed.
    #[error("signature verification failed: {0}")]
    VerificationFailed(String),

    /// Key generation or parsing failed.
    #[error("key error: {0}")]
    KeyError(String),

    /// Sealed ciphertext failed its integrity check.
    #[error("integrity check failed: {0}")]
    IntegrityFailed(String),

    /// The cipher refused to seal the input.
    #[error("sealing failed: {0}")]
    SealFailed(String),
}
