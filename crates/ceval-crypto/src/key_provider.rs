//! # Key Provider Abstraction
//!
//! Requester signing keys sit behind [`KeyProvider`] so the workflow does
//! not care where the key lives:
//!
//! - [`LocalKeyProvider`]: in-memory key, for tests and one-shot CLI runs.
//! - [`EnvKeyProvider`]: hex seed read once from an environment variable
//!   (`CEVAL_SIGNING_KEY` by default).
//!
//! ## Security Invariants
//!
//! - Signing input is `&CanonicalBytes`.
//! - Providers are `Send + Sync`.
//! - The seed string read from the environment is zeroized after parsing.

use zeroize::Zeroize;

use ceval_core::{CanonicalBytes, CryptoError, Identity};

use crate::ed25519::{Ed25519KeyPair, Ed25519Signature};

/// Default environment variable holding the requester seed.
pub const SIGNING_KEY_ENV: &str = "CEVAL_SIGNING_KEY";

/// Ed25519 signing backend.
pub trait KeyProvider: Send + Sync {
    /// Sign canonical bytes with the managed key.
    fn sign(&self, data: &CanonicalBytes) -> Result<Ed25519Signature, CryptoError>;

    /// Identity derived from the managed public key.
    fn identity(&self) -> Identity;

    /// Name for diagnostics.
    fn provider_name(&self) -> &str;
}

// ─── LocalKeyProvider ────────────────────────────────────────────────────

/// In-memory key provider.
#[derive(Debug)]
pub struct LocalKeyProvider {
    key: Ed25519KeyPair,
}

impl LocalKeyProvider {
    /// Wrap an existing key pair.
    pub fn new(key: Ed25519KeyPair) -> Self {
        Self { key }
    }

    /// Fresh random key.
    pub fn generate() -> Self {
        Self::new(Ed25519KeyPair::generate())
    }

    /// Key from a 32-byte seed.
    pub fn from_seed(seed: &[u8; 32]) -> Self {
        Self::new(Ed25519KeyPair::from_seed(seed))
    }
}

impl KeyProvider for LocalKeyProvider {
    fn sign(&self, data: &CanonicalBytes) -> Result<Ed25519Signature, CryptoError> {
        Ok(self.key.sign(data))
    }

    fn identity(&self) -> Identity {
        self.key.identity()
    }

    fn provider_name(&self) -> &str {
        "LocalKeyProvider"
    }
}

// ─── EnvKeyProvider ──────────────────────────────────────────────────────

/// Loads the signing seed from an environment variable.
///
/// ```bash
/// export CEVAL_SIGNING_KEY="$(ceval keygen --seed-only)"
/// ```
#[derive(Debug)]
pub struct EnvKeyProvider {
    key: Ed25519KeyPair,
    var_name: String,
}

impl EnvKeyProvider {
    /// Read and parse the named variable.
    pub fn from_env(var_name: &str) -> Result<Self, CryptoError> {
        let mut raw = std::env::var(var_name)
            .map_err(|_| CryptoError::KeyError(format!("environment variable {var_name} not set")))?;
        let parsed = Ed25519KeyPair::from_seed_hex(&raw);
        raw.zeroize();
        let key = parsed.map_err(|e| CryptoError::KeyError(format!("{var_name}: {e}")))?;
        Ok(Self {
            key,
            var_name: var_name.to_string(),
        })
    }

    /// Variable this provider was loaded from.
    pub fn var_name(&self) -> &str {
        &self.var_name
    }
}

impl KeyProvider for EnvKeyProvider {
    fn sign(&self, data: &CanonicalBytes) -> Result<Ed25519Signature, CryptoError> {
        Ok(self.key.sign(data))
    }

    fn identity(&self) -> Identity {
        self.key.identity()
    }

    fn provider_name(&self) -> &str {
        "EnvKeyProvider"
    }
}
