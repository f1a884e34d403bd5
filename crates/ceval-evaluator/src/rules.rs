//! # Eligibility Predicate
//!
//! ```text
//! in_range = (age >= 18) AND (age <= 64)
//! any_risk = has_history OR has_chronic OR lifestyle_risk
//! eligible = in_range AND NOT any_risk
//! moderate = in_range AND any_risk
//! category = select(eligible, 1, select(moderate, 2, 3))
//! ```
//!
//! Every step is a [`HomomorphicOps`] call. The function never holds a
//! plaintext derived from an input, so there is nothing to branch on.
//!
//! The age band and category tags are compile-time constants. Moving the
//! band means rebuilding the evaluator.

use ceval_core::Category;
use ceval_fhe::{EncryptedValue, HomomorphicOps, SubstrateError};

/// Lowest in-band age.
pub const AGE_BAND_MIN: u8 = 18;

/// Highest in-band age.
pub const AGE_BAND_MAX: u8 = 64;

/// The four encrypted operands.
#[derive(Debug, Clone, Copy)]
pub struct Operands<'a> {
    /// `uint8` age.
    pub age: &'a EncryptedValue,
    /// `bool` prior history.
    pub has_history: &'a EncryptedValue,
    /// `bool` chronic condition.
    pub has_chronic: &'a EncryptedValue,
    /// `bool` lifestyle risk.
    pub lifestyle_risk: &'a EncryptedValue,
}

/// Intermediates produced while classifying. Released on drop so an early
/// `?` does not leave them in the substrate.
struct Scratch<'o, O: HomomorphicOps + ?Sized> {
    ops: &'o O,
    held: Vec<EncryptedValue>,
}

impl<'o, O: HomomorphicOps + ?Sized> Scratch<'o, O> {
    fn new(ops: &'o O) -> Self {
        Self { ops, held: Vec::with_capacity(12) }
    }

    fn keep(
        &mut self,
        value: Result<EncryptedValue, SubstrateError>,
    ) -> Result<EncryptedValue, SubstrateError> {
        let value = value?;
        self.held.push(value.clone());
        Ok(value)
    }
}

impl<O: HomomorphicOps + ?Sized> Drop for Scratch<'_, O> {
    fn drop(&mut self) {
        for value in self.held.drain(..) {
            self.ops.release(&value);
        }
    }
}

/// Compute the encrypted category tag.
///
/// Only the returned value stays in the substrate; every intermediate is
/// released before this returns, on success or failure.
pub fn classify<O: HomomorphicOps + ?Sized>(
    ops: &O,
    input: Operands<'_>,
) -> Result<EncryptedValue, SubstrateError> {
    let mut tmp = Scratch::new(ops);

    let at_least_min = tmp.keep(ops.ge(input.age, AGE_BAND_MIN))?;
    let at_most_max = tmp.keep(ops.le(input.age, AGE_BAND_MAX))?;
    let in_range = tmp.keep(ops.and(&at_least_min, &at_most_max))?;

    let history_or_chronic = tmp.keep(ops.or(input.has_history, input.has_chronic))?;
    let any_risk = tmp.keep(ops.or(&history_or_chronic, input.lifestyle_risk))?;

    let no_risk = tmp.keep(ops.not(&any_risk))?;
    let eligible = tmp.keep(ops.and(&in_range, &no_risk))?;
    let moderate = tmp.keep(ops.and(&in_range, &any_risk))?;

    let eligible_tag = tmp.keep(ops.trivial_encrypt_u8(Category::Eligible.value()))?;
    let moderate_tag = tmp.keep(ops.trivial_encrypt_u8(Category::Moderate.value()))?;
    let not_eligible_tag = tmp.keep(ops.trivial_encrypt_u8(Category::NotEligible.value()))?;

    let inner = tmp.keep(ops.select(&moderate, &moderate_tag, &not_eligible_tag))?;
    ops.select(&eligible, &eligible_tag, &inner)
}
