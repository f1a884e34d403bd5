//! # ceval-workflow — Evaluation Workflow Orchestrator
//!
//! Sequences encryption, signed submission, confirmation, and authorized
//! decryption for one requester, tracking each attempt in a
//! [`ceval_state::WorkflowMachine`].
//!
//! - [`boundary`]: the `KeyService`, `Signer` and `EvaluatorGateway`
//!   traits and their errors, with the mapping onto failure kinds.
//! - [`submission`]: the signed evaluation request and its tx id.
//! - [`local`]: in-process implementations of all three boundaries.
//! - [`orchestrator`]: [`EvaluationWorkflow`].

pub mod boundary;
pub mod local;
pub mod orchestrator;
pub mod submission;

pub use boundary::{
    codec_failure_kind, EvaluatorGateway, GatewayError, KeyService, Signer, SignerError,
    SigningPurpose,
};
pub use local::{LocalGateway, LocalKeyService, LocalSigner};
pub use orchestrator::{EvaluationWorkflow, WorkflowConfig, WorkflowError};
pub use submission::{SignedSubmission, SubmissionBody, TxId};
