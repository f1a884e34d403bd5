//! # Homomorphic Operators
//!
//! Every operator takes encrypted operands and returns a fresh encrypted
//! result. The caller learns nothing about operand or result plaintext:
//! there is no operator that returns a Rust `bool` or integer.
//!
//! `select(cond, a, b)` is the multiplexer. It yields an encryption of
//! `a` where `cond` is true and of `b` otherwise, and the returned handle
//! is new in both cases, so the caller cannot tell which branch held by
//! comparing handles.
//!
//! Intermediates are owned by whoever computed them and should be
//! [`release`](HomomorphicOps::release)d once the final value exists.

use crate::error::SubstrateError;
use crate::substrate::FheSubstrate;
use crate::types::{EncryptedValue, FheType};

/// Operator set over encrypted values.
pub trait HomomorphicOps {
    /// Encrypt a public `uint8` constant.
    fn trivial_encrypt_u8(&self, value: u8) -> Result<EncryptedValue, SubstrateError>;

    /// Encrypt a public boolean constant.
    fn trivial_encrypt_bool(&self, value: bool) -> Result<EncryptedValue, SubstrateError>;

    /// `a >= k`, encrypted.
    fn ge(&self, a: &EncryptedValue, k: u8) -> Result<EncryptedValue, SubstrateError>;

    /// `a <= k`, encrypted.
    fn le(&self, a: &EncryptedValue, k: u8) -> Result<EncryptedValue, SubstrateError>;

    /// `a AND b`, encrypted.
    fn and(&self, a: &EncryptedValue, b: &EncryptedValue)
        -> Result<EncryptedValue, SubstrateError>;

    /// `a OR b`, encrypted.
    fn or(&self, a: &EncryptedValue, b: &EncryptedValue)
        -> Result<EncryptedValue, SubstrateError>;

    /// `NOT a`, encrypted.
    fn not(&self, a: &EncryptedValue) -> Result<EncryptedValue, SubstrateError>;

    /// `cond ? a : b`, encrypted. `a` and `b` must share a type.
    fn select(
        &self,
        cond: &EncryptedValue,
        a: &EncryptedValue,
        b: &EncryptedValue,
    ) -> Result<EncryptedValue, SubstrateError>;

    /// Discard a value that is no longer needed.
    fn release(&self, value: &EncryptedValue);
}

fn as_bit(v: bool) -> u8 {
    u8::from(v)
}

impl HomomorphicOps for FheSubstrate {
    fn trivial_encrypt_u8(&self, value: u8) -> Result<EncryptedValue, SubstrateError> {
        self.store(FheType::Uint8, value)
    }

    fn trivial_encrypt_bool(&self, value: bool) -> Result<EncryptedValue, SubstrateError> {
        self.store(FheType::Bool, as_bit(value))
    }

    fn ge(&self, a: &EncryptedValue, k: u8) -> Result<EncryptedValue, SubstrateError> {
        let x = self.load(a, "ge", FheType::Uint8)?;
        self.store(FheType::Bool, as_bit(x >= k))
    }

    fn le(&self, a: &EncryptedValue, k: u8) -> Result<EncryptedValue, SubstrateError> {
        let x = self.load(a, "le", FheType::Uint8)?;
        self.store(FheType::Bool, as_bit(x <= k))
    }

    fn and(
        &self,
        a: &EncryptedValue,
        b: &EncryptedValue,
    ) -> Result<EncryptedValue, SubstrateError> {
        let x = self.load(a, "and", FheType::Bool)?;
        let y = self.load(b, "and", FheType::Bool)?;
        self.store(FheType::Bool, x & y & 1)
    }

    fn or(
        &self,
        a: &EncryptedValue,
        b: &EncryptedValue,
    ) -> Result<EncryptedValue, SubstrateError> {
        let x = self.load(a, "or", FheType::Bool)?;
        let y = self.load(b, "or", FheType::Bool)?;
        self.store(FheType::Bool, (x | y) & 1)
    }

    fn not(&self, a: &EncryptedValue) -> Result<EncryptedValue, SubstrateError> {
        let x = self.load(a, "not", FheType::Bool)?;
        self.store(FheType::Bool, (x ^ 1) & 1)
    }

    fn select(
        &self,
        cond: &EncryptedValue,
        a: &EncryptedValue,
        b: &EncryptedValue,
    ) -> Result<EncryptedValue, SubstrateError> {
        let c = self.load(cond, "select", FheType::Bool)?;
        let ty = a.fhe_type();
        let x = self.load(a, "select", ty)?;
        let y = self.load(b, "select", ty)?;
        // Branch-free mux over the opened bytes.
        let mask = 0u8.wrapping_sub(c & 1);
        self.store(ty, (x & mask) | (y & !mask))
    }

    fn release(&self, value: &EncryptedValue) {
        FheSubstrate::release(self, &value.handle());
    }
}
