//! # ceval-crypto — Cryptographic Primitives
//!
//! - **Ed25519** signing and verification. Requesters sign submissions and
//!   decryption authorizations; public keys are identities.
//! - **Key providers** for requester keys (in-memory or environment).
//! - **Sealing** of ciphertext bodies at rest inside the substrate
//!   (AES-256-GCM).
//!
//! ## Crate Policy
//!
//! - Depends only on `ceval-core` internally.
//! - No mocking of cryptographic operations in tests. All tests use real
//!   `CanonicalBytes`, real SHA-256, real Ed25519.

pub mod ed25519;
pub mod key_provider;
pub mod seal;

pub use ed25519::{verify, verify_identity, Ed25519KeyPair, Ed25519Signature};
pub use key_provider::{EnvKeyProvider, KeyProvider, LocalKeyProvider, SIGNING_KEY_ENV};
pub use seal::{open, seal, SealedBox, SealingKey, NONCE_LEN};
