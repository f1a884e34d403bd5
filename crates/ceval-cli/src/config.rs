//! # CLI Configuration
//!
//! Optional YAML file passed with `--config`:
//!
//! ```yaml
//! evaluator_seed_hex: "<64 hex chars>"   # omit for a random evaluator
//! authorization_validity_secs: 86400     # 1..=31536000
//! timeout_ms: 30000                      # omit for no wall-clock limit
//! ```
//!
//! Command-line flags override file values. The requester key is never
//! read from this file; it comes from `CEVAL_SIGNING_KEY` or is generated.

use std::path::Path;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use ceval_core::EvaluatorId;
use ceval_crypto::Ed25519KeyPair;
use ceval_fhe::{DEFAULT_VALIDITY_SECS, MAX_VALIDITY_SECS};

/// Parsed configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CliConfig {
    /// Seed the evaluator identity is derived from.
    #[serde(default)]
    pub evaluator_seed_hex: Option<String>,

    /// Validity of each decryption authorization.
    #[serde(default = "default_validity")]
    pub authorization_validity_secs: u64,

    /// Wall-clock limit per attempt.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
}

fn default_validity() -> u64 {
    DEFAULT_VALIDITY_SECS
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            evaluator_seed_hex: None,
            authorization_validity_secs: DEFAULT_VALIDITY_SECS,
            timeout_ms: None,
        }
    }
}

impl CliConfig {
    /// Load from `path`, or defaults when `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            None => Self::default(),
            Some(p) => {
                let text = std::fs::read_to_string(p)
                    .with_context(|| format!("failed to read config {}", p.display()))?;
                serde_yaml::from_str(&text)
                    .with_context(|| format!("failed to parse config {}", p.display()))?
            }
        };
        config.validate()?;
        Ok(config)
    }

    /// Range checks.
    pub fn validate(&self) -> Result<()> {
        if self.authorization_validity_secs == 0
            || self.authorization_validity_secs > MAX_VALIDITY_SECS
        {
            bail!(
                "authorization_validity_secs must be in 1..={MAX_VALIDITY_SECS}, got {}",
                self.authorization_validity_secs
            );
        }
        if self.timeout_ms == Some(0) {
            bail!("timeout_ms must be positive");
        }
        if self.evaluator_seed_hex.is_some() {
            self.evaluator_id()?;
        }
        Ok(())
    }

    /// Evaluator identity from the configured seed, if any.
    pub fn evaluator_id(&self) -> Result<Option<EvaluatorId>> {
        self.evaluator_seed_hex
            .as_deref()
            .map(|hex| {
                Ed25519KeyPair::from_seed_hex(hex)
                    .map(|kp| kp.evaluator_id())
                    .context("invalid evaluator_seed_hex")
            })
            .transpose()
    }

    /// Wall-clock limit, if configured.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}
