//! # Sealed Ciphertext Storage
//!
//! Ciphertext bodies held by the substrate are sealed under the network
//! key with AES-256-GCM. The 16-byte GCM tag is appended to the body.
//!
//! ## Security Invariant
//!
//! - `open()` returns nothing unless the GCM tag verifies. A body that was
//!   flipped, truncated, or extended is rejected.
//! - [`SealingKey`] zeroizes on drop and has a redacted `Debug`.
//! - Nonces are 12 random bytes per seal; callers never pick them.

use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Key, Nonce,
};
use rand::RngCore;
use zeroize::{Zeroize, ZeroizeOnDrop};

use ceval_core::CryptoError;

/// AES-GCM nonce length.
pub const NONCE_LEN: usize = 12;

/// 32-byte symmetric key.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct SealingKey([u8; 32]);

impl SealingKey {
    /// Fresh random key.
    pub fn generate() -> Self {
        let mut key = [0u8; 32];
        rand::rngs::OsRng.fill_bytes(&mut key);
        Self(key)
    }

    /// Wrap existing key bytes.
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.0))
    }
}

impl std::fmt::Debug for SealingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SealingKey(<redacted>)")
    }
}

/// A sealed body (ciphertext followed by the GCM tag) with its nonce.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SealedBox {
    nonce: [u8; NONCE_LEN],
    body: Vec<u8>,
}

impl SealedBox {
    /// Ciphertext and tag (no plaintext).
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Per-seal nonce.
    pub fn nonce(&self) -> &[u8; NONCE_LEN] {
        &self.nonce
    }
}

/// Seal `plaintext` under `key` with a fresh random nonce.
pub fn seal(key: &SealingKey, plaintext: &[u8]) -> Result<SealedBox, CryptoError> {
    let mut nonce = [0u8; NONCE_LEN];
    rand::rngs::OsRng.fill_bytes(&mut nonce);
    let body = key
        .cipher()
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|_| CryptoError::SealFailed("AES-256-GCM encryption failed".to_string()))?;
    Ok(SealedBox { nonce, body })
}

/// Verify the tag and recover the plaintext.
pub fn open(key: &SealingKey, sealed: &SealedBox) -> Result<Vec<u8>, CryptoError> {
    key.cipher()
        .decrypt(Nonce::from_slice(&sealed.nonce), sealed.body.as_ref())
        .map_err(|_| CryptoError::IntegrityFailed("sealed ciphertext tag mismatch".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn seal_then_open() {
        let key = SealingKey::generate();
        let sealed = seal(&key, b"\x2a").unwrap();
        assert_eq!(sealed.body().len(), 1 + 16);
        assert_eq!(open(&key, &sealed).unwrap(), b"\x2a".to_vec());
    }

    #[test]
    fn multi_block_payload() {
        let key = SealingKey::generate();
        let msg: Vec<u8> = (0..100u8).collect();
        let sealed = seal(&key, &msg).unwrap();
        assert_ne!(&sealed.body()[..msg.len()], msg.as_slice());
        assert_eq!(open(&key, &sealed).unwrap(), msg);
    }

    #[test]
    fn same_plaintext_seals_differently() {
        let key = SealingKey::generate();
        let a = seal(&key, b"same").unwrap();
        let b = seal(&key, b"same").unwrap();
        assert_ne!(a.nonce(), b.nonce());
        assert_ne!(a, b);
    }

    #[test]
    fn wrong_key_rejected() {
        let sealed = seal(&SealingKey::generate(), b"secret").unwrap();
        assert!(matches!(
            open(&SealingKey::generate(), &sealed),
            Err(CryptoError::IntegrityFailed(_))
        ));
    }

    #[test]
    fn tampered_body_rejected() {
        let key = SealingKey::generate();
        let mut sealed = seal(&key, b"secret").unwrap();
        sealed.body[0] ^= 1;
        assert!(open(&key, &sealed).is_err());
    }

    #[test]
    fn extended_body_rejected() {
        let key = SealingKey::generate();
        let original = seal(&key, b"\x01").unwrap();

        let mut appended = original.clone();
        appended.body.extend_from_slice(&[0x80, 0, 0, 0]);
        appended.body.extend_from_slice(b"attacker-appended");
        assert!(matches!(
            open(&key, &appended),
            Err(CryptoError::IntegrityFailed(_))
        ));

        let mut truncated = original;
        truncated.body.pop();
        assert!(open(&key, &truncated).is_err());
    }

    #[test]
    fn swapped_nonce_rejected() {
        let key = SealingKey::generate();
        let a = seal(&key, b"\x01").unwrap();
        let b = seal(&key, b"\x01").unwrap();
        let mixed = SealedBox {
            nonce: *b.nonce(),
            body: a.body().to_vec(),
        };
        assert!(open(&key, &mixed).is_err());
    }

    #[test]
    fn debug_is_redacted() {
        assert_eq!(format!("{:?}", SealingKey::from_bytes([7; 32])), "SealingKey(<redacted>)");
    }
}
