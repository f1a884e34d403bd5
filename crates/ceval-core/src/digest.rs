//! # Content Digests
//!
//! SHA-256 helpers used for ciphertext fingerprints, proof bindings, and
//! handle derivation.
//!
//! ## Security Invariant
//!
//! [`sha256_digest()`] accepts only `&CanonicalBytes`. Raw-byte hashing is
//! available through [`sha256_bytes()`] and [`Sha256Accumulator`] for the
//! places that hash ciphertext material, which has no JSON form.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::canonical::CanonicalBytes;

/// A 32-byte SHA-256 digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContentDigest(pub [u8; 32]);

impl ContentDigest {
    /// Raw digest bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }
}

impl std::fmt::Display for ContentDigest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sha256:{}", self.to_hex())
    }
}

/// SHA-256 over canonical bytes.
pub fn sha256_digest(data: &CanonicalBytes) -> ContentDigest {
    ContentDigest(sha256_bytes(data.as_bytes()))
}

/// SHA-256 over raw bytes.
pub fn sha256_bytes(data: &[u8]) -> [u8; 32] {
    let hash = Sha256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hash);
    out
}

/// Incremental SHA-256 for hashing composite inputs
/// (`domain tag || canonical bytes || raw bytes`).
#[derive(Default)]
pub struct Sha256Accumulator {
    hasher: Sha256,
}

impl Sha256Accumulator {
    /// Fresh accumulator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed more bytes.
    pub fn update(&mut self, data: &[u8]) -> &mut Self {
        self.hasher.update(data);
        self
    }

    /// Finish and return the raw digest.
    pub fn finalize(self) -> [u8; 32] {
        let hash = self.hasher.finalize();
        let mut out = [0u8; 32];
        out.copy_from_slice(&hash);
        out
    }

    /// Finish and return the lowercase hex digest.
    pub fn finalize_hex(self) -> String {
        ContentDigest(self.finalize()).to_hex()
    }
}
