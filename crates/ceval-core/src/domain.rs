//! # Eligibility Domain — Categories, Risk Flags, Applicant Form
//!
//! Plaintext-side types. [`ApplicantForm`] is what the requester fills
//! in; [`ApplicantForm::validate()`] is the only way to obtain
//! [`ValidatedInputs`], which is what gets encrypted.
//!
//! ## Input Constraints
//!
//! - Age is a whole number in `AGE_INPUT_MIN..=AGE_INPUT_MAX` (1..=150).
//!   Ages outside the 18..=64 band are valid inputs; the evaluator simply
//!   classifies them Not Eligible.
//! - Each risk flag is tri-state. Validation fails while any is unset.
//!
//! A failed validation is a local error and never reaches the network.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Smallest accepted age input.
pub const AGE_INPUT_MIN: i64 = 1;

/// Largest accepted age input.
pub const AGE_INPUT_MAX: i64 = 150;

/// Risk tier produced by the evaluator.
///
/// | Tag | Variant | Label |
/// |-----|---------|-------|
/// | 1 | `Eligible` | Eligible |
/// | 2 | `Moderate` | Moderate |
/// | 3 | `NotEligible` | Not Eligible |
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    /// In the age band with no risk flags.
    Eligible,
    /// In the age band with at least one risk flag.
    Moderate,
    /// Outside the age band.
    NotEligible,
}

impl Category {
    /// All categories in tag order.
    pub fn all() -> &'static [Category] {
        &[Self::Eligible, Self::Moderate, Self::NotEligible]
    }

    /// Numeric tag carried inside the encrypted result.
    pub fn value(&self) -> u8 {
        match self {
            Self::Eligible => 1,
            Self::Moderate => 2,
            Self::NotEligible => 3,
        }
    }

    /// Parse a decrypted tag.
    pub fn from_value(v: u64) -> Result<Self, ValidationError> {
        match v {
            1 => Ok(Self::Eligible),
            2 => Ok(Self::Moderate),
            3 => Ok(Self::NotEligible),
            other => Err(ValidationError::UnknownCategory(other)),
        }
    }

    /// Human-readable label for presentation.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Eligible => "Eligible",
            Self::Moderate => "Moderate",
            Self::NotEligible => "Not Eligible",
        }
    }
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// A yes/no question the applicant may not have answered yet.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFlag {
    /// Not answered.
    #[default]
    Unset,
    /// Answered no.
    No,
    /// Answered yes.
    Yes,
}

impl RiskFlag {
    /// `Some(answer)` once answered.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Unset => None,
            Self::No => Some(false),
            Self::Yes => Some(true),
        }
    }
}

impl From<bool> for RiskFlag {
    fn from(b: bool) -> Self {
        if b {
            Self::Yes
        } else {
            Self::No
        }
    }
}

/// The applicant's plaintext answers, possibly incomplete.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantForm {
    /// Age in whole years, if entered.
    pub age: Option<i64>,
    /// Prior claims or medical history.
    pub has_history: RiskFlag,
    /// Chronic condition.
    pub has_chronic: RiskFlag,
    /// Lifestyle risk (smoking and the like).
    pub lifestyle_risk: RiskFlag,
}

/// Inputs that passed local validation and may be encrypted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ValidatedInputs {
    /// Age, within `AGE_INPUT_MIN..=AGE_INPUT_MAX`.
    pub age: u8,
    /// Prior claims or medical history.
    pub has_history: bool,
    /// Chronic condition.
    pub has_chronic: bool,
    /// Lifestyle risk.
    pub lifestyle_risk: bool,
}

impl ApplicantForm {
    /// Build a fully answered form.
    pub fn new(age: i64, has_history: bool, has_chronic: bool, lifestyle_risk: bool) -> Self {
        Self {
            age: Some(age),
            has_history: has_history.into(),
            has_chronic: has_chronic.into(),
            lifestyle_risk: lifestyle_risk.into(),
        }
    }

    /// Parse free-text age input as a whole number.
    pub fn parse_age(text: &str) -> Result<i64, ValidationError> {
        text.trim()
            .parse::<i64>()
            .map_err(|_| ValidationError::AgeNotWholeNumber {
                value: text.to_string(),
            })
    }

    /// Check every constraint and produce encryptable inputs.
    pub fn validate(&self) -> Result<ValidatedInputs, ValidationError> {
        let age = self.age.ok_or_else(|| ValidationError::AgeNotWholeNumber {
            value: String::new(),
        })?;
        if !(AGE_INPUT_MIN..=AGE_INPUT_MAX).contains(&age) {
            return Err(ValidationError::AgeOutOfRange {
                value: age,
                min: AGE_INPUT_MIN,
                max: AGE_INPUT_MAX,
            });
        }
        let age = u8::try_from(age).map_err(|_| ValidationError::AgeOutOfRange {
            value: age,
            min: AGE_INPUT_MIN,
            max: AGE_INPUT_MAX,
        })?;
        let flag = |flag: RiskFlag, field: &'static str| {
            flag.as_bool().ok_or(ValidationError::RiskFlagUnset { field })
        };
        Ok(ValidatedInputs {
            age,
            has_history: flag(self.has_history, "has_history")?,
            has_chronic: flag(self.has_chronic, "has_chronic")?,
            lifestyle_risk: flag(self.lifestyle_risk, "lifestyle_risk")?,
        })
    }
}
