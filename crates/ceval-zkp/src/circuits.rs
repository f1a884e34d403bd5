//! # Input Validity Circuit
//!
//! The statement an input proof attests to: "this ciphertext, of this
//! type, was formed by `owner` for consumption by `evaluator`."
//!
//! The handle and a digest of the sealed ciphertext body are both bound,
//! so neither a different handle nor a re-sealed body under the same
//! handle satisfies the statement.

use serde::{Deserialize, Serialize};

use ceval_core::{hex, EvaluatorId, Identity};

/// Public statement for an encrypted input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputProofCircuit {
    /// Ciphertext handle, hex.
    pub handle: String,
    /// SHA-256 of the sealed ciphertext body, hex.
    pub ciphertext_digest: String,
    /// Declared value type (`uint8` or `bool`).
    pub fhe_type: String,
    /// Identity that encrypted the value.
    pub owner: Identity,
    /// Evaluator the value is meant for.
    pub evaluator: EvaluatorId,
}

impl InputProofCircuit {
    /// Build the statement from raw parts.
    pub fn new(
        handle: [u8; 32],
        ciphertext_digest: [u8; 32],
        fhe_type: &str,
        owner: Identity,
        evaluator: EvaluatorId,
    ) -> Self {
        Self {
            handle: hex::encode(&handle),
            ciphertext_digest: hex::encode(&ciphertext_digest),
            fhe_type: fhe_type.to_string(),
            owner,
            evaluator,
        }
    }
}
