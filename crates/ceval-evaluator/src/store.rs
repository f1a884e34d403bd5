//! # Result Store
//!
//! One slot per identity. A new evaluation overwrites the slot; there is
//! no history and no delete. An identity that has never evaluated reads
//! back as the zero sentinel `(zero handle, zero timestamp)`.

use std::collections::HashMap;

use parking_lot::RwLock;
use serde::Serialize;

use ceval_core::{Identity, Timestamp};
use ceval_fhe::EncryptedValue;

/// The single stored result for one identity.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationRecord {
    /// Identity the record belongs to.
    pub owner: Identity,
    /// Encrypted category tag.
    pub result: EncryptedValue,
    /// When the evaluation ran.
    pub evaluated_at: Timestamp,
}

/// What `get_last_result` returns: handle and timestamp, or the sentinel.
#[derive(Debug, Clone, Serialize)]
pub struct LastResult {
    /// Encrypted category, or the zero-handle sentinel.
    pub result: EncryptedValue,
    /// Evaluation time, or the zero timestamp.
    pub evaluated_at: Timestamp,
}

impl LastResult {
    /// The "no record" pair.
    pub fn sentinel() -> Self {
        Self {
            result: EncryptedValue::sentinel(),
            evaluated_at: Timestamp::zero(),
        }
    }

    /// True only for zero handle AND zero timestamp.
    pub fn is_sentinel(&self) -> bool {
        self.result.handle().is_zero() && self.evaluated_at.is_zero()
    }
}

/// Identity-keyed, overwrite-on-write result slots.
#[derive(Debug, Default)]
pub struct ResultStore {
    records: RwLock<HashMap<Identity, EvaluationRecord>>,
}

impl ResultStore {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace `owner`'s slot, returning the record it displaced.
    pub(crate) fn record(
        &self,
        owner: Identity,
        result: EncryptedValue,
        evaluated_at: Timestamp,
    ) -> Option<EvaluationRecord> {
        self.records.write().insert(
            owner,
            EvaluationRecord {
                owner,
                result,
                evaluated_at,
            },
        )
    }

    /// `owner`'s slot, or the sentinel.
    pub fn last_result(&self, owner: &Identity) -> LastResult {
        self.records
            .read()
            .get(owner)
            .map(|r| LastResult {
                result: r.result.clone(),
                evaluated_at: r.evaluated_at,
            })
            .unwrap_or_else(LastResult::sentinel)
    }

    /// Full record, if any.
    pub fn get(&self, owner: &Identity) -> Option<EvaluationRecord> {
        self.records.read().get(owner).cloned()
    }

    /// Number of identities with a record.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Whether no identity has a record.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
