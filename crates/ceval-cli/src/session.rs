//! # Local Session
//!
//! Wires one in-process evaluator, substrate, key service and gateway,
//! and hands out a workflow per requester key. Also the caller-facing
//! wall-clock limit: a timed-out attempt is recorded as `Failed(TIMEOUT)`.

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use ceval_core::{ApplicantForm, Category, EvaluatorId};
use ceval_crypto::{EnvKeyProvider, Ed25519KeyPair, KeyProvider, LocalKeyProvider, SIGNING_KEY_ENV};
use ceval_evaluator::RiskEvaluator;
use ceval_fhe::{CiphertextCodec, FheSubstrate};
use ceval_state::{FailureKind, FailureReason};
use ceval_workflow::{
    EvaluationWorkflow, LocalGateway, LocalKeyService, LocalSigner, WorkflowConfig, WorkflowError,
};

use crate::config::CliConfig;

/// Workflow over the in-process boundaries.
pub type LocalWorkflow = EvaluationWorkflow<LocalKeyService, LocalSigner, LocalGateway>;

/// In-process evaluator deployment.
#[derive(Debug)]
pub struct LocalSession {
    keys: Arc<LocalKeyService>,
    gateway: Arc<LocalGateway>,
    workflow_config: WorkflowConfig,
    timeout: Option<Duration>,
}

impl LocalSession {
    /// Build from configuration.
    pub fn new(config: &CliConfig) -> Result<Self> {
        let evaluator_id = match config.evaluator_id()? {
            Some(id) => id,
            None => Ed25519KeyPair::generate().evaluator_id(),
        };
        Ok(Self::with_evaluator(
            evaluator_id,
            WorkflowConfig {
                authorization_validity_secs: config.authorization_validity_secs,
            },
            config.timeout(),
        ))
    }

    /// Build around a given evaluator identity.
    pub fn with_evaluator(
        evaluator_id: EvaluatorId,
        workflow_config: WorkflowConfig,
        timeout: Option<Duration>,
    ) -> Self {
        let substrate = Arc::new(FheSubstrate::new());
        let evaluator = Arc::new(RiskEvaluator::new(evaluator_id, substrate.clone()));
        tracing::debug!(evaluator = %evaluator_id, "local evaluator started");
        Self {
            keys: Arc::new(LocalKeyService::new(CiphertextCodec::new(substrate))),
            gateway: Arc::new(LocalGateway::new(evaluator)),
            workflow_config,
            timeout,
        }
    }

    /// The gateway.
    pub fn gateway(&self) -> &Arc<LocalGateway> {
        &self.gateway
    }

    /// Override the wall-clock limit.
    pub fn set_timeout(&mut self, timeout: Option<Duration>) {
        self.timeout = timeout;
    }

    /// Workflow for `key`.
    pub fn workflow(&self, key: Arc<dyn KeyProvider>) -> LocalWorkflow {
        EvaluationWorkflow::new(
            self.keys.clone(),
            Arc::new(LocalSigner::new(key)),
            self.gateway.clone(),
            self.workflow_config,
        )
    }

    /// Submit under the configured wall-clock limit.
    pub async fn submit(
        &self,
        workflow: &LocalWorkflow,
        form: &ApplicantForm,
    ) -> Result<Category, WorkflowError> {
        let Some(limit) = self.timeout else {
            return workflow.submit(form).await;
        };
        match tokio::time::timeout(limit, workflow.submit(form)).await {
            Ok(outcome) => outcome,
            Err(_) => {
                workflow.record_timeout(limit);
                tracing::warn!(limit_ms = limit.as_millis() as u64, "attempt timed out");
                Err(WorkflowError::Failed(
                    workflow
                        .state()
                        .failure()
                        .cloned()
                        .unwrap_or_else(|| {
                            FailureReason::new(
                                FailureKind::Timeout,
                                format!("no resolution within {}ms", limit.as_millis()),
                            )
                        }),
                ))
            }
        }
    }
}

/// Requester key: `CEVAL_SIGNING_KEY` when set, otherwise a fresh key.
pub fn requester_key() -> Result<Arc<dyn KeyProvider>> {
    if std::env::var_os(SIGNING_KEY_ENV).is_some() {
        let provider = EnvKeyProvider::from_env(SIGNING_KEY_ENV)
            .with_context(|| format!("failed to load {SIGNING_KEY_ENV}"))?;
        tracing::debug!(identity = %provider.identity().short(), "requester key from environment");
        Ok(Arc::new(provider))
    } else {
        let provider = LocalKeyProvider::generate();
        tracing::debug!(identity = %provider.identity().short(), "generated ephemeral requester key");
        Ok(Arc::new(provider))
    }
}
