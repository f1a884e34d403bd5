//! # ceval-fhe — Ciphertext Codec and Operator Substrate
//!
//! Everything that touches ciphertext lives here:
//!
//! - [`types`]: [`EncryptedValue`], [`CiphertextHandle`], [`FheType`],
//!   [`ValidityProof`], [`Plaintext`].
//! - [`substrate`]: the shared ciphertext store with per-handle access
//!   lists.
//! - [`ops`]: the [`HomomorphicOps`] operator set (`ge`, `le`, `and`, `or`,
//!   `not`, `select`, trivial encryption of constants, `release`).
//! - [`codec`]: [`CiphertextCodec::encrypt()`] and
//!   [`CiphertextCodec::decrypt()`], and input proof verification.
//! - [`authorization`]: signed, time-bounded [`DecryptionAuthorization`].
//!
//! ## Substrate Model
//!
//! The substrate is an in-process stand-in for an FHE coprocessor. It is
//! honest about the interface: callers hold only handles, every operator
//! returns a fresh handle, and plaintext is reachable only through an
//! authorized decrypt. It does not provide cryptographic hiding against
//! whoever runs the substrate process itself.

pub mod authorization;
pub mod codec;
pub mod error;
pub mod ops;
pub mod substrate;
pub mod types;

pub use authorization::{
    AuthorizationStatement, DecryptionAuthorization, DEFAULT_VALIDITY_SECS, MAX_VALIDITY_SECS,
};
pub use codec::{verify_input_proof, CiphertextCodec};
pub use error::{AuthorizationError, CodecError, SubstrateError};
pub use ops::HomomorphicOps;
pub use substrate::{FheSubstrate, Principal};
pub use types::{CiphertextHandle, EncryptedValue, FheType, Plaintext, ValidityProof};
