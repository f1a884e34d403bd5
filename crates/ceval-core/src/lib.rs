#![deny(missing_docs)]

//! # ceval-core — Foundational Types for Confidential Eligibility Evaluation
//!
//! This crate defines the types every other crate in the workspace depends
//! on. It has no internal crate dependencies, only `serde`, `serde_json`,
//! `serde_jcs`, `thiserror`, `chrono`, `uuid`, and `sha2`.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for identities.** A requester [`Identity`] and an
//!    [`EvaluatorId`] are distinct types. You cannot pass one where the
//!    other is expected, which rules out scoping a decryption grant to the
//!    wrong party by argument transposition.
//!
//! 2. **[`CanonicalBytes`] is the sole signing and hashing input.** Every
//!    signed authorization, signed submission, and proof binding flows
//!    through `CanonicalBytes::new()`.
//!
//! 3. **Plaintext never leaves this layer unvalidated.** [`ApplicantForm`]
//!    is the only way to obtain [`ValidatedInputs`], and the tri-state risk
//!    flags refuse to validate while any flag is unset.
//!
//! 4. **One sentinel.** The "no record" value is the zero handle paired
//!    with [`Timestamp::zero()`]. Nothing else is treated as absent.

pub mod canonical;
pub mod digest;
pub mod domain;
pub mod error;
pub mod hex;
pub mod identity;
pub mod temporal;

// Re-export primary types at crate root for ergonomic imports.
pub use canonical::CanonicalBytes;
pub use digest::{sha256_bytes, sha256_digest, ContentDigest, Sha256Accumulator};
pub use domain::{
    ApplicantForm, Category, RiskFlag, ValidatedInputs, AGE_INPUT_MAX, AGE_INPUT_MIN,
};
pub use error::{CanonicalizationError, CryptoError, ValidationError};
pub use identity::{AttemptId, EvaluatorId, Identity};
pub use temporal::Timestamp;
