//! # Failure Taxonomy
//!
//! Every terminal `Failed` state carries a [`FailureReason`]: a closed
//! [`FailureKind`] plus free-text detail. The kind's stable code leads the
//! rendered reason so a caller-facing layer can pick copy and retry
//! affordances without parsing the detail.

use serde::{Deserialize, Serialize};

/// Closed set of failure kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    /// Plaintext outside its representable range. Never reaches the network.
    Encoding,
    /// An input proof did not verify; the evaluator wrote nothing.
    ProofVerification,
    /// Decrypt without a valid, correctly scoped authorization, or the key
    /// service was unreachable.
    Authorization,
    /// The signer declined. Not retried.
    UserRejected,
    /// Timeout or unreachable dependency.
    TransientNetwork,
    /// Wall-clock limit imposed by the caller-facing layer.
    Timeout,
}

impl FailureKind {
    /// Stable code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Encoding => "ENCODING_ERROR",
            Self::ProofVerification => "PROOF_VERIFICATION_ERROR",
            Self::Authorization => "AUTHORIZATION_ERROR",
            Self::UserRejected => "USER_REJECTED",
            Self::TransientNetwork => "TRANSIENT_NETWORK_ERROR",
            Self::Timeout => "TIMEOUT",
        }
    }

    /// Whether resubmitting the same inputs can succeed without the user
    /// changing anything.
    pub fn is_resubmittable(&self) -> bool {
        matches!(self, Self::TransientNetwork | Self::Timeout)
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.code())
    }
}

/// Payload of `WorkflowState::Failed`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureReason {
    /// Kind.
    pub kind: FailureKind,
    /// Human-readable detail.
    pub detail: String,
}

impl FailureReason {
    /// Reason of `kind` with `detail`.
    pub fn new(kind: FailureKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }
}

impl std::fmt::Display for FailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.kind.code(), self.detail)
    }
}
