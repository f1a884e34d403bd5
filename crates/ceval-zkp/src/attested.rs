//! # Attested Input Proofs
//!
//! The input verifier that formed a ciphertext signs the statement
//! describing it:
//!
//! ```text
//! signature = Ed25519_sign(attestation_key,
//!     JCS({"purpose": "ceval.input-proof.v1", "statement": circuit}))
//! ```
//!
//! The evaluator checks the signature against the verifier's public key.
//!
//! ## Security Invariant
//!
//! Only the holder of the [`AttestationKey`] can produce a proof, and a
//! proof for one (handle, ciphertext digest, type, owner, evaluator)
//! statement does not verify against any other. Knowing a handle and its
//! digest is not enough to re-prove it under a different owner.
//!
//! Not zero-knowledge: the statement is public and the proof says only
//! that the verifier saw it.

use serde::{Deserialize, Serialize};

use ceval_core::{CanonicalBytes, CanonicalizationError, Identity};
use ceval_crypto::{verify, Ed25519KeyPair, Ed25519Signature};

use crate::circuits::InputProofCircuit;
use crate::traits::{ProofError, ProofSystem, VerifyError};

const PROOF_PURPOSE: &str = "ceval.input-proof.v1";

/// Verifier signature over an input statement.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InputAttestation {
    /// Ed25519 signature, hex on the wire.
    pub signature: Ed25519Signature,
}

/// Signing half of the input verifier's key.
#[derive(Debug)]
pub struct AttestationKey(Ed25519KeyPair);

impl AttestationKey {
    /// Fresh random key.
    pub fn generate() -> Self {
        Self(Ed25519KeyPair::generate())
    }

    /// Key from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self(Ed25519KeyPair::from_seed(seed))
    }

    /// Matching verifying key.
    pub fn verifier(&self) -> AttestationVerifier {
        AttestationVerifier {
            public_key: self.0.public_key_bytes(),
        }
    }
}

/// Public half of the input verifier's key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttestationVerifier {
    public_key: [u8; 32],
}

impl AttestationVerifier {
    /// The verifier's public key as an identity, for logs.
    pub fn identity(&self) -> Identity {
        Identity::from_bytes(self.public_key)
    }
}

/// Proof backend that signs input statements.
#[derive(Debug, Clone, Copy, Default)]
pub struct AttestedProofSystem;

#[derive(Serialize)]
struct SignedStatement<'a> {
    purpose: &'static str,
    statement: &'a InputProofCircuit,
}

fn signing_bytes(statement: &InputProofCircuit) -> Result<CanonicalBytes, CanonicalizationError> {
    CanonicalBytes::new(&SignedStatement {
        purpose: PROOF_PURPOSE,
        statement,
    })
}

impl ProofSystem for AttestedProofSystem {
    type Proof = InputAttestation;
    type ProvingKey = AttestationKey;
    type VerifyingKey = AttestationVerifier;
    type Statement = InputProofCircuit;

    fn prove(
        &self,
        pk: &Self::ProvingKey,
        statement: &Self::Statement,
    ) -> Result<Self::Proof, ProofError> {
        let bytes =
            signing_bytes(statement).map_err(|e| ProofError::StatementEncoding(e.to_string()))?;
        Ok(InputAttestation {
            signature: pk.0.sign(&bytes),
        })
    }

    fn verify(
        &self,
        vk: &Self::VerifyingKey,
        proof: &Self::Proof,
        statement: &Self::Statement,
    ) -> Result<bool, VerifyError> {
        let bytes =
            signing_bytes(statement).map_err(|e| VerifyError::StatementEncoding(e.to_string()))?;
        Ok(verify(&bytes, &proof.signature, &vk.public_key).is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ceval_core::EvaluatorId;

    fn circuit(owner: u8, evaluator: u8) -> InputProofCircuit {
        InputProofCircuit::new(
            [9u8; 32],
            [3u8; 32],
            "uint8",
            Identity::from_bytes([owner; 32]),
            EvaluatorId::from_bytes([evaluator; 32]),
        )
    }

    #[test]
    fn prove_then_verify() {
        let key = AttestationKey::generate();
        let c = circuit(1, 2);
        let proof = AttestedProofSystem.prove(&key, &c).unwrap();
        assert!(AttestedProofSystem.verify(&key.verifier(), &proof, &c).unwrap());
    }

    #[test]
    fn different_owner_does_not_verify() {
        let key = AttestationKey::generate();
        let proof = AttestedProofSystem.prove(&key, &circuit(1, 2)).unwrap();
        assert!(!AttestedProofSystem
            .verify(&key.verifier(), &proof, &circuit(7, 2))
            .unwrap());
    }

    #[test]
    fn different_evaluator_does_not_verify() {
        let key = AttestationKey::generate();
        let proof = AttestedProofSystem.prove(&key, &circuit(1, 2)).unwrap();
        assert!(!AttestedProofSystem
            .verify(&key.verifier(), &proof, &circuit(1, 8))
            .unwrap());
    }

    #[test]
    fn different_ciphertext_does_not_verify() {
        let key = AttestationKey::generate();
        let proof = AttestedProofSystem.prove(&key, &circuit(1, 2)).unwrap();
        let mut other = circuit(1, 2);
        other.ciphertext_digest = "00".repeat(32);
        assert!(!AttestedProofSystem
            .verify(&key.verifier(), &proof, &other)
            .unwrap());
    }

    #[test]
    fn proof_from_another_key_does_not_verify() {
        let real = AttestationKey::generate();
        let forger = AttestationKey::from_seed(&[0x66; 32]);
        let c = circuit(1, 2);
        let forged = AttestedProofSystem.prove(&forger, &c).unwrap();
        assert!(!AttestedProofSystem.verify(&real.verifier(), &forged, &c).unwrap());
    }

    #[test]
    fn proof_serializes_as_hex_signature() {
        let key = AttestationKey::from_seed(&[1; 32]);
        let proof = AttestedProofSystem.prove(&key, &circuit(1, 2)).unwrap();
        let json = serde_json::to_value(&proof).unwrap();
        assert_eq!(json["signature"].as_str().unwrap().len(), 128);
        let back: InputAttestation = serde_json::from_value(json).unwrap();
        assert_eq!(back, proof);
    }
}
