//! # Domain Identity Newtypes
//!
//! [`Identity`] is a requester (the owner of inputs and of a result
//! record). [`EvaluatorId`] is the party that runs the eligibility
//! predicate. Both wrap an Ed25519 public key, but they are distinct types.
//!
//! ## Security Invariant
//!
//! A decryption authorization binds a requester, an evaluator, and a
//! handle. Keeping the two key-backed identities as separate types means a
//! grant cannot be scoped to the wrong party by swapping arguments.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

use crate::error::ValidationError;
use crate::hex;

macro_rules! key_backed_id {
    ($name:ident, $label:literal) => {
        impl $name {
            /// Wrap raw public key bytes.
            pub fn from_bytes(bytes: [u8; 32]) -> Self {
                Self(bytes)
            }

            /// Raw public key bytes.
            pub fn as_bytes(&self) -> &[u8; 32] {
                &self.0
            }

            /// Full lowercase hex.
            pub fn to_hex(&self) -> String {
                hex::encode(&self.0)
            }

            /// Parse from 64 hex characters.
            pub fn from_hex(s: &str) -> Result<Self, ValidationError> {
                hex::decode_fixed::<32>(s).map(Self)
            }

            /// Eight-character prefix for log fields.
            pub fn short(&self) -> String {
                hex::prefix(&self.0)
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(&self.to_hex())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let s = String::deserialize(deserializer)?;
                Self::from_hex(&s).map_err(serde::de::Error::custom)
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}({}...)", stringify!($name), self.short())
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}:{}", $label, self.to_hex())
            }
        }
    };
}

/// A requester: owner of submitted inputs and of one result record.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Identity([u8; 32]);

/// The evaluator that runs the predicate and consumes input proofs.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EvaluatorId([u8; 32]);

key_backed_id!(Identity, "identity");
key_backed_id!(EvaluatorId, "evaluator");

/// One submission or replay attempt of the evaluation workflow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttemptId(pub Uuid);

impl AttemptId {
    /// Generate a new random attempt identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for AttemptId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AttemptId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "attempt:{}", self.0)
    }
}
