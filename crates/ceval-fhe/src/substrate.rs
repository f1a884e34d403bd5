//! # Ciphertext Substrate
//!
//! The computation substrate: holds every ciphertext under an opaque
//! handle, sealed with the network key, plus a per-handle access list.
//! Homomorphic operators ([`crate::ops`]) and the codec run against it.
//!
//! ## Security Invariant
//!
//! - Plaintext exists only transiently inside this module and
//!   [`crate::ops`]. Nothing public returns it; decryption goes through
//!   [`crate::codec::CiphertextCodec::decrypt()`] and its authorization
//!   checks.
//! - Stored bodies are sealed with AES-256-GCM; a tampered body fails the
//!   tag check.
//! - Handles are random 32-byte values and never zero.
//! - A released handle is gone from both the store and the access list.
//!
//! Locks are `parking_lot` and never held across `.await`.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use rand::RngCore;

use ceval_core::{sha256_bytes, EvaluatorId, Identity};
use ceval_crypto::{open, seal, SealedBox, SealingKey};
use ceval_zkp::{AttestationKey, AttestationVerifier};

use crate::error::SubstrateError;
use crate::types::{CiphertextHandle, EncryptedValue, FheType};

/// A party that may appear on a handle's access list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Principal {
    /// A requester identity.
    Requester(Identity),
    /// An evaluator.
    Evaluator(EvaluatorId),
}

impl std::fmt::Display for Principal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Requester(id) => write!(f, "requester {}", id.short()),
            Self::Evaluator(id) => write!(f, "evaluator {}", id.short()),
        }
    }
}

#[derive(Debug, Clone)]
struct StoredCiphertext {
    fhe_type: FheType,
    sealed: SealedBox,
}

/// Shared ciphertext store with access control.
#[derive(Debug)]
pub struct FheSubstrate {
    network_key: SealingKey,
    input_attestation: AttestationKey,
    ciphertexts: RwLock<HashMap<CiphertextHandle, StoredCiphertext>>,
    acl: RwLock<HashMap<CiphertextHandle, HashSet<Principal>>>,
    key_service_online: AtomicBool,
}

impl FheSubstrate {
    /// Substrate with a fresh random network key.
    pub fn new() -> Self {
        Self::with_key(SealingKey::generate())
    }

    /// Substrate with a given network key.
    pub fn with_key(network_key: SealingKey) -> Self {
        Self {
            network_key,
            input_attestation: AttestationKey::generate(),
            ciphertexts: RwLock::new(HashMap::new()),
            acl: RwLock::new(HashMap::new()),
            key_service_online: AtomicBool::new(true),
        }
    }

    // ── Storage ─────────────────────────────────────────────────────────

    /// Seal `plaintext` and return a fresh value referencing it.
    pub(crate) fn store(
        &self,
        fhe_type: FheType,
        plaintext: u8,
    ) -> Result<EncryptedValue, SubstrateError> {
        let sealed = seal(&self.network_key, &[plaintext])?;
        let handle = loop {
            let mut bytes = [0u8; 32];
            rand::rngs::OsRng.fill_bytes(&mut bytes);
            let candidate = CiphertextHandle::from_bytes(bytes);
            if !candidate.is_zero() {
                break candidate;
            }
        };
        self.ciphertexts
            .write()
            .insert(handle, StoredCiphertext { fhe_type, sealed });
        Ok(EncryptedValue::new(handle, fhe_type))
    }

    /// Drop the ciphertext behind `handle` and its access list. Unknown
    /// handles are ignored.
    pub fn release(&self, handle: &CiphertextHandle) {
        let removed = self.ciphertexts.write().remove(handle).is_some();
        self.acl.write().remove(handle);
        if removed {
            tracing::trace!(handle = %handle.short(), "ciphertext released");
        }
    }

    /// Open the ciphertext behind `value`, checking its declared type
    /// against what is stored and against `expected`.
    pub(crate) fn load(
        &self,
        value: &EncryptedValue,
        op: &'static str,
        expected: FheType,
    ) -> Result<u8, SubstrateError> {
        let stored = self
            .ciphertexts
            .read()
            .get(&value.handle())
            .cloned()
            .ok_or(SubstrateError::UnknownHandle(value.handle()))?;
        for found in [value.fhe_type(), stored.fhe_type] {
            if found != expected {
                return Err(SubstrateError::TypeMismatch {
                    op,
                    expected,
                    found,
                });
            }
        }
        let body = open(&self.network_key, &stored.sealed)?;
        Ok(body.first().copied().unwrap_or_default())
    }

    /// Type recorded for `handle`, if stored.
    pub fn stored_type(&self, handle: &CiphertextHandle) -> Option<FheType> {
        self.ciphertexts.read().get(handle).map(|c| c.fhe_type)
    }

    /// SHA-256 of the sealed body behind `handle`, if stored.
    pub fn ciphertext_digest(&self, handle: &CiphertextHandle) -> Option<[u8; 32]> {
        self.ciphertexts.read().get(handle).map(|c| {
            let mut material = c.sealed.nonce().to_vec();
            material.extend_from_slice(c.sealed.body());
            sha256_bytes(&material)
        })
    }

    /// Number of stored ciphertexts.
    pub fn len(&self) -> usize {
        self.ciphertexts.read().len()
    }

    /// Whether nothing is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // ── Input attestation ──────────────────────────────────────────────

    /// Key the input verifier signs proofs with.
    pub(crate) fn attestation_key(&self) -> &AttestationKey {
        &self.input_attestation
    }

    /// Public key input proofs are checked against.
    pub fn attestation_verifier(&self) -> AttestationVerifier {
        self.input_attestation.verifier()
    }

    // ── Access control ──────────────────────────────────────────────────

    /// Add `principal` to the access list of `handle`.
    pub fn allow(&self, handle: CiphertextHandle, principal: Principal) {
        tracing::debug!(handle = %handle.short(), %principal, "acl grant");
        self.acl.write().entry(handle).or_default().insert(principal);
    }

    /// Whether `principal` is on the access list of `handle`.
    pub fn is_allowed(&self, handle: &CiphertextHandle, principal: &Principal) -> bool {
        self.acl
            .read()
            .get(handle)
            .is_some_and(|set| set.contains(principal))
    }

    // ── Key service ─────────────────────────────────────────────────────

    /// Mark the decryption key service reachable or not.
    pub fn set_key_service_available(&self, online: bool) {
        self.key_service_online.store(online, Ordering::SeqCst);
    }

    /// Whether the decryption key service is reachable.
    pub fn key_service_available(&self) -> bool {
        self.key_service_online.load(Ordering::SeqCst)
    }
}

impl Default for FheSubstrate {
    fn default() -> Self {
        Self::new()
    }
}
