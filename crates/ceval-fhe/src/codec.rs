//! # Ciphertext Codec
//!
//! Plaintext scalars in, `(EncryptedValue, ValidityProof)` out; and an
//! opaque handle back to plaintext given a valid authorization.
//!
//! ## Encrypt
//!
//! Values are range-checked against their type before anything is
//! stored. A `uint8` above 255 fails with [`CodecError::Encoding`] and
//! leaves the substrate untouched. The new handle is granted to its owner
//! and the input verifier signs a proof over (handle, ciphertext digest,
//! type, owner, evaluator).
//!
//! ## Input Proofs
//!
//! [`verify_input_proof`] accepts a value only if the claimed owner is on
//! the handle's access list and the verifier's signature covers exactly
//! this statement. Someone who learns another requester's handles can
//! neither sign a new proof nor pass the access check.
//!
//! ## Decrypt
//!
//! Checks, in order: key service reachable, authorization names this
//! handle, signature and validity window, requester and evaluator both on
//! the handle's access list. Every failure is
//! [`CodecError::Authorization`] and returns no plaintext.

use std::sync::Arc;

use ceval_core::{EvaluatorId, Identity, Timestamp};
use ceval_zkp::{AttestedProofSystem, InputProofCircuit, ProofSystem};

use crate::authorization::DecryptionAuthorization;
use crate::error::{AuthorizationError, CodecError};
use crate::substrate::{FheSubstrate, Principal};
use crate::types::{EncryptedValue, FheType, Plaintext, ValidityProof};

/// Client-side codec bound to a substrate.
#[derive(Debug, Clone)]
pub struct CiphertextCodec {
    substrate: Arc<FheSubstrate>,
    proofs: AttestedProofSystem,
}

impl CiphertextCodec {
    /// Codec over `substrate`.
    pub fn new(substrate: Arc<FheSubstrate>) -> Self {
        Self {
            substrate,
            proofs: AttestedProofSystem,
        }
    }

    /// Underlying substrate.
    pub fn substrate(&self) -> &Arc<FheSubstrate> {
        &self.substrate
    }

    /// Encrypt `plaintext` for `evaluator` on behalf of `owner`.
    pub fn encrypt(
        &self,
        plaintext: Plaintext,
        evaluator: &EvaluatorId,
        owner: &Identity,
    ) -> Result<(EncryptedValue, ValidityProof), CodecError> {
        let (fhe_type, byte) = encode(plaintext)?;
        let value = self.substrate.store(fhe_type, byte)?;
        self.substrate
            .allow(value.handle(), Principal::Requester(*owner));

        let proof = input_circuit(&self.substrate, &value, owner, evaluator).and_then(|c| {
            self.proofs
                .prove(self.substrate.attestation_key(), &c)
                .map_err(|e| CodecError::ProofVerification(e.to_string()))
        });
        let proof = match proof {
            Ok(p) => p,
            Err(e) => {
                self.substrate.release(&value.handle());
                return Err(e);
            }
        };

        tracing::debug!(
            handle = %value.handle().short(),
            fhe_type = %fhe_type,
            owner = %owner.short(),
            "encrypted input"
        );
        Ok((value, ValidityProof(proof)))
    }

    /// Decrypt `value` under `auth` as of the current time.
    pub fn decrypt(
        &self,
        value: &EncryptedValue,
        auth: &DecryptionAuthorization,
    ) -> Result<Plaintext, CodecError> {
        self.decrypt_at(value, auth, Timestamp::now())
    }

    /// Decrypt `value` under `auth` as of `now`.
    pub fn decrypt_at(
        &self,
        value: &EncryptedValue,
        auth: &DecryptionAuthorization,
        now: Timestamp,
    ) -> Result<Plaintext, CodecError> {
        if !self.substrate.key_service_available() {
            return Err(AuthorizationError::KeyServiceUnavailable.into());
        }
        let handle = value.handle();
        if auth.handle() != &handle {
            return Err(AuthorizationError::WrongHandle.into());
        }
        auth.verify(now)?;

        for principal in [
            Principal::Requester(*auth.requester()),
            Principal::Evaluator(*auth.evaluator()),
        ] {
            if !self.substrate.is_allowed(&handle, &principal) {
                return Err(AuthorizationError::NotPermitted {
                    principal: principal.to_string(),
                    handle,
                }
                .into());
            }
        }

        let stored = self
            .substrate
            .stored_type(&handle)
            .ok_or(crate::error::SubstrateError::UnknownHandle(handle))?;
        let byte = self.substrate.load(value, "decrypt", stored)?;
        tracing::debug!(
            handle = %handle.short(),
            requester = %auth.requester().short(),
            "decrypted result"
        );
        Ok(match stored {
            FheType::Uint8 => Plaintext::Uint(u64::from(byte)),
            FheType::Bool => Plaintext::Bool(byte != 0),
        })
    }
}

/// Verify that `proof` binds `value` to `owner` and `evaluator`.
///
/// Fails with [`CodecError::ProofVerification`] if the handle is unknown,
/// the declared type differs from the stored type, `owner` is not on the
/// handle's access list, or the verifier's signature does not cover the
/// statement.
pub fn verify_input_proof(
    substrate: &FheSubstrate,
    value: &EncryptedValue,
    proof: &ValidityProof,
    owner: &Identity,
    evaluator: &EvaluatorId,
) -> Result<(), CodecError> {
    let stored = substrate.stored_type(&value.handle()).ok_or_else(|| {
        CodecError::ProofVerification(format!("unknown handle {:?}", value.handle()))
    })?;
    if stored != value.fhe_type() {
        return Err(CodecError::ProofVerification(format!(
            "declared type {} but ciphertext is {}",
            value.fhe_type(),
            stored
        )));
    }
    if !substrate.is_allowed(&value.handle(), &Principal::Requester(*owner)) {
        return Err(CodecError::ProofVerification(format!(
            "{:?} does not belong to requester {}",
            value.handle(),
            owner.short()
        )));
    }
    let circuit = input_circuit(substrate, value, owner, evaluator)?;
    match AttestedProofSystem.verify(&substrate.attestation_verifier(), &proof.0, &circuit) {
        Ok(true) => Ok(()),
        Ok(false) => Err(CodecError::ProofVerification(format!(
            "proof for {:?} does not bind this owner and evaluator",
            value.handle()
        ))),
        Err(e) => Err(CodecError::ProofVerification(e.to_string())),
    }
}

fn encode(plaintext: Plaintext) -> Result<(FheType, u8), CodecError> {
    match plaintext {
        Plaintext::Uint(v) => u8::try_from(v)
            .map(|b| (FheType::Uint8, b))
            .map_err(|_| CodecError::Encoding {
                value: v,
                fhe_type: FheType::Uint8,
                max: u64::from(u8::MAX),
            }),
        Plaintext::Bool(b) => Ok((FheType::Bool, u8::from(b))),
    }
}

fn input_circuit(
    substrate: &FheSubstrate,
    value: &EncryptedValue,
    owner: &Identity,
    evaluator: &EvaluatorId,
) -> Result<InputProofCircuit, CodecError> {
    let digest = substrate.ciphertext_digest(&value.handle()).ok_or_else(|| {
        CodecError::ProofVerification(format!("unknown handle {:?}", value.handle()))
    })?;
    Ok(InputProofCircuit::new(
        *value.handle().as_bytes(),
        digest,
        value.fhe_type().as_str(),
        *owner,
        *evaluator,
    ))
}
