//! # Temporal Types — UTC-Only Timestamps
//!
//! Defines [`Timestamp`], a UTC timestamp truncated to seconds. Evaluation
//! records, event payloads, and authorization validity windows all use it.
//!
//! ## Zero Sentinel
//!
//! [`Timestamp::zero()`] is the Unix epoch. Paired with the zero ciphertext
//! handle it is the canonical "no record" answer from the result store. A
//! real evaluation can never carry it, since evaluation time comes from
//! [`Timestamp::now()`].

use chrono::{DateTime, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// A UTC-only timestamp, truncated to seconds precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    /// Current UTC time, truncated to seconds.
    pub fn now() -> Self {
        Self(truncate_to_seconds(Utc::now()))
    }

    /// The Unix epoch, used as the "no record" timestamp.
    pub fn zero() -> Self {
        Self(DateTime::<Utc>::UNIX_EPOCH)
    }

    /// Whether this is the zero sentinel.
    pub fn is_zero(&self) -> bool {
        self.0 == DateTime::<Utc>::UNIX_EPOCH
    }

    /// From a `DateTime<Utc>`, truncating sub-seconds.
    pub fn from_utc(dt: DateTime<Utc>) -> Self {
        Self(truncate_to_seconds(dt))
    }

    /// From Unix epoch seconds.
    pub fn from_epoch_secs(secs: i64) -> Result<Self, ValidationError> {
        DateTime::from_timestamp(secs, 0)
            .map(Self)
            .ok_or_else(|| ValidationError::InvalidTimestamp {
                value: secs.to_string(),
                reason: "out of range for a UTC datetime".to_string(),
            })
    }

    /// Parse an RFC 3339 string. Only the `Z` suffix is accepted.
    pub fn parse(s: &str) -> Result<Self, ValidationError> {
        if !s.ends_with('Z') {
            return Err(ValidationError::InvalidTimestamp {
                value: s.to_string(),
                reason: "must use Z suffix (UTC only)".to_string(),
            });
        }
        let dt = DateTime::parse_from_rfc3339(s).map_err(|e| ValidationError::InvalidTimestamp {
            value: s.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self(truncate_to_seconds(dt.with_timezone(&Utc))))
    }

    /// Access the inner `DateTime<Utc>`.
    pub fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Unix epoch seconds.
    pub fn epoch_secs(&self) -> i64 {
        self.0.timestamp()
    }

    /// This timestamp shifted forward by `secs` seconds, saturating at
    /// the representable maximum.
    pub fn plus_secs(&self, secs: u64) -> Self {
        let delta = chrono::TimeDelta::try_seconds(i64::try_from(secs).unwrap_or(i64::MAX))
            .unwrap_or(chrono::TimeDelta::MAX);
        Self(self.0.checked_add_signed(delta).unwrap_or(DateTime::<Utc>::MAX_UTC))
    }

    /// ISO 8601 with `Z` suffix, e.g. `2026-01-15T12:00:00Z`.
    pub fn to_iso8601(&self) -> String {
        self.0.format("%Y-%m-%dT%H:%M:%SZ").to_string()
    }
}

impl std::fmt::Display for Timestamp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_iso8601())
    }
}

fn truncate_to_seconds(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.with_nanosecond(0).unwrap_or(dt)
}
