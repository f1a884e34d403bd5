//! # Encrypted Value Types
//!
//! An [`EncryptedValue`] is a handle into the substrate plus a type tag.
//! Only the codec and the operator set construct one; there is no public
//! constructor besides [`EncryptedValue::sentinel()`].
//!
//! `EncryptedValue` has no `PartialEq` or `Ord`. Comparing
//! ciphertexts is the substrate's job (`ge`, `le`), and two encryptions of
//! the same plaintext are different values. Compare [`CiphertextHandle`]s
//! when identity of the reference is what matters.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use ceval_core::{hex, ValidationError};
use ceval_zkp::InputAttestation;

/// Plaintext type carried by a ciphertext.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FheType {
    /// Unsigned 8-bit integer.
    Uint8,
    /// Boolean.
    Bool,
}

impl FheType {
    /// Stable tag used in proof statements.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Uint8 => "uint8",
            Self::Bool => "bool",
        }
    }
}

impl std::fmt::Display for FheType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Opaque 32-byte reference to a ciphertext held by the substrate.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct CiphertextHandle([u8; 32]);

impl CiphertextHandle {
    /// The all-zero handle. Never issued for a real ciphertext.
    pub const ZERO: Self = Self([0u8; 32]);

    pub(crate) fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Raw handle bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Whether this is the zero handle.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Full hex.
    pub fn to_hex(&self) -> String {
        hex::encode(&self.0)
    }

    /// Parse from 64 hex characters.
    pub fn from_hex(s: &str) -> Result<Self, ValidationError> {
        hex::decode_fixed::<32>(s).map(Self)
    }

    /// Eight-character prefix for logs.
    pub fn short(&self) -> String {
        hex::prefix(&self.0)
    }
}

impl Serialize for CiphertextHandle {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for CiphertextHandle {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_hex(&s).map_err(serde::de::Error::custom)
    }
}

impl std::fmt::Debug for CiphertextHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "CiphertextHandle({}...)", self.short())
    }
}

impl std::fmt::Display for CiphertextHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

/// An opaque ciphertext reference with its declared type.
#[derive(Debug, Clone, Serialize)]
pub struct EncryptedValue {
    handle: CiphertextHandle,
    fhe_type: FheType,
}

impl EncryptedValue {
    pub(crate) fn new(handle: CiphertextHandle, fhe_type: FheType) -> Self {
        Self { handle, fhe_type }
    }

    /// The "no record" value: zero handle, `uint8` tag.
    pub fn sentinel() -> Self {
        Self::new(CiphertextHandle::ZERO, FheType::Uint8)
    }

    /// Ciphertext handle.
    pub fn handle(&self) -> CiphertextHandle {
        self.handle
    }

    /// Declared type.
    pub fn fhe_type(&self) -> FheType {
        self.fhe_type
    }
}

/// Proof that accompanies an encrypted input across the network boundary.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidityProof(pub InputAttestation);

/// A plaintext scalar before encoding or after decryption.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Plaintext {
    /// Unsigned integer; must fit `uint8` to encode.
    Uint(u64),
    /// Boolean.
    Bool(bool),
}

impl Plaintext {
    /// Type this plaintext encodes to.
    pub fn fhe_type(&self) -> FheType {
        match self {
            Self::Uint(_) => FheType::Uint8,
            Self::Bool(_) => FheType::Bool,
        }
    }
}
