//! # Proof System Trait (Sealed)
//!
//! Every encrypted input that reaches the evaluator travels with a proof
//! over an [`InputProofCircuit`](crate::InputProofCircuit) statement. A
//! backend turns a statement into a proof and checks one against it.
//!
//! The trait is sealed: only backends in this crate implement it, so the
//! evaluator is never handed an outside verifier that accepts anything.

use serde::{de::DeserializeOwned, Serialize};
use thiserror::Error;

/// Proving failed before a proof existed.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProofError {
    /// The statement could not be reduced to canonical bytes.
    #[error("cannot encode input statement: {0}")]
    StatementEncoding(String),
}

/// Verification could not reach a yes/no answer.
///
/// A well-formed proof for the wrong statement is not an error; `verify`
/// returns `Ok(false)` for it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerifyError {
    /// The proof bytes have the wrong shape.
    #[error("malformed input proof: {0}")]
    Malformed(String),

    /// The statement could not be reduced to canonical bytes.
    #[error("cannot encode input statement: {0}")]
    StatementEncoding(String),
}

mod private {
    pub trait Sealed {}
}

/// A backend that binds input ciphertexts to their owner and evaluator.
pub trait ProofSystem: private::Sealed + Send + Sync {
    /// Proof carried next to the ciphertext.
    type Proof: Serialize + DeserializeOwned + Clone + std::fmt::Debug;
    /// Key used by the client when proving.
    type ProvingKey;
    /// Key used by the evaluator when verifying.
    type VerifyingKey: Clone;
    /// Public statement.
    type Statement: Clone;

    /// Prove `statement`.
    fn prove(
        &self,
        pk: &Self::ProvingKey,
        statement: &Self::Statement,
    ) -> Result<Self::Proof, ProofError>;

    /// Whether `proof` attests to `statement`.
    fn verify(
        &self,
        vk: &Self::VerifyingKey,
        proof: &Self::Proof,
        statement: &Self::Statement,
    ) -> Result<bool, VerifyError>;
}

impl private::Sealed for crate::attested::AttestedProofSystem {}
