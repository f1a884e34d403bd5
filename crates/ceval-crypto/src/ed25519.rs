//! # Ed25519 Signing and Verification
//!
//! Requesters sign evaluation submissions and decryption authorizations;
//! evaluators have an Ed25519 key that names them. Public keys double as
//! [`Identity`] and [`EvaluatorId`].
//!
//! ## Security Invariant
//!
//! - Signing input MUST be `&CanonicalBytes`. Raw bytes cannot be signed.
//! - Private keys are never serialized or logged. [`Ed25519KeyPair`] has no
//!   `Serialize` impl and its `Debug` output is redacted.
//! - Seeds parsed from hex are zeroized after the key is built.

use ed25519_dalek::{Signer, Verifier};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use zeroize::Zeroize;

use ceval_core::{hex, CanonicalBytes, CryptoError, EvaluatorId, Identity};

/// An Ed25519 signature (64 bytes), serialized as hex.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Ed25519Signature(pub [u8; 64]);

/// An Ed25519 key pair.
pub struct Ed25519KeyPair {
    signing_key: ed25519_dalek::SigningKey,
}

// ── Ed25519Signature ────────────────────────────────────────────────────

impl Ed25519Signature {
    /// Raw signature bytes.
    pub fn as_bytes(&self) -> &[u8; 64] {
        &self.0
    }

    /// Lowercase hex.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Parse from 128 hex characters.
    pub fn from_hex(s: &str) -> Result<Self, CryptoError> {
        hex::decode_fixed::<64>(s.trim())
            .map(Self)
            .map_err(|e| CryptoError::VerificationFailed(format!("malformed signature: {e}")))
    }
}

impl Serialize for Ed25519Signature {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for Ed25519Signature {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for Ed25519Signature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519Signature({}...)", hex::prefix(&self.0))
    }
}

// ── Ed25519KeyPair ──────────────────────────────────────────────────────

impl Ed25519KeyPair {
    /// Generate a new key pair from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut csprng = rand::rngs::OsRng;
        Self {
            signing_key: ed25519_dalek::SigningKey::generate(&mut csprng),
        }
    }

    /// Build from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self {
            signing_key: ed25519_dalek::SigningKey::from_bytes(seed),
        }
    }

    /// Build from a 64-character hex seed.
    pub fn from_seed_hex(seed_hex: &str) -> Result<Self, CryptoError> {
        let mut seed = hex::decode_fixed::<32>(seed_hex.trim())
            .map_err(|e| CryptoError::KeyError(format!("seed: {e}")))?;
        let kp = Self::from_seed(&seed);
        seed.zeroize();
        Ok(kp)
    }

    /// The 32-byte seed as hex. Used only by `ceval keygen`.
    pub fn seed_hex(&self) -> String {
        let mut seed = self.signing_key.to_bytes();
        let out = hex::encode(&seed);
        seed.zeroize();
        out
    }

    /// Raw public key bytes.
    pub fn public_key_bytes(&self) -> [u8; 32] {
        self.signing_key.verifying_key().to_bytes()
    }

    /// This key as a requester identity.
    pub fn identity(&self) -> Identity {
        Identity::from_bytes(self.public_key_bytes())
    }

    /// This key as an evaluator identity.
    pub fn evaluator_id(&self) -> EvaluatorId {
        EvaluatorId::from_bytes(self.public_key_bytes())
    }

    /// Sign canonical bytes.
    pub fn sign(&self, data: &CanonicalBytes) -> Ed25519Signature {
        Ed25519Signature(self.signing_key.sign(data.as_bytes()).to_bytes())
    }
}

impl std::fmt::Debug for Ed25519KeyPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Ed25519KeyPair(<private>)")
    }
}

// ── Verification ────────────────────────────────────────────────────────

/// Verify a signature over canonical bytes against raw public key bytes.
pub fn verify(
    data: &CanonicalBytes,
    signature: &Ed25519Signature,
    public_key: &[u8; 32],
) -> Result<(), CryptoError> {
    let vk = ed25519_dalek::VerifyingKey::from_bytes(public_key)
        .map_err(|e| CryptoError::KeyError(format!("invalid public key: {e}")))?;
    let sig = ed25519_dalek::Signature::from_bytes(&signature.0);
    vk.verify(data.as_bytes(), &sig)
        .map_err(|e| CryptoError::VerificationFailed(format!("Ed25519 verification failed: {e}")))
}

/// Verify that `identity` signed `data`.
pub fn verify_identity(
    data: &CanonicalBytes,
    signature: &Ed25519Signature,
    identity: &Identity,
) -> Result<(), CryptoError> {
    verify(data, signature, identity.as_bytes())
}
