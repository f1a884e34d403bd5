//! # ceval-zkp — Input Validity Proofs
//!
//! Each encrypted input carries a proof bound to (ciphertext, owner,
//! evaluator). The evaluator checks all four before it touches state.
//!
//! [`AttestedProofSystem`] is the only backend: the input verifier signs
//! the statement with its Ed25519 key. The [`ProofSystem`] trait is sealed
//! so a succinct backend can replace it without changing callers.

pub mod attested;
pub mod circuits;
pub mod traits;

pub use attested::{AttestationKey, AttestationVerifier, AttestedProofSystem, InputAttestation};
pub use circuits::InputProofCircuit;
pub use traits::{ProofError, ProofSystem, VerifyError};
