//! Shared fixtures: one in-process deployment (substrate, evaluator,
//! key service, gateway) and helpers for requesters on it.

#![allow(dead_code)]

use std::sync::Arc;

use ceval_core::{Category, EvaluatorId, Identity, Timestamp};
use ceval_crypto::{KeyProvider, LocalKeyProvider};
use ceval_evaluator::{EvaluationRequest, ProvenInput, RiskEvaluator};
use ceval_fhe::{
    CiphertextCodec, DecryptionAuthorization, EncryptedValue, FheSubstrate, Plaintext,
    DEFAULT_VALIDITY_SECS,
};
use ceval_workflow::{
    EvaluationWorkflow, LocalGateway, LocalKeyService, LocalSigner, WorkflowConfig,
};

pub type LocalWorkflow = EvaluationWorkflow<LocalKeyService, LocalSigner, LocalGateway>;

pub struct Deployment {
    pub substrate: Arc<FheSubstrate>,
    pub codec: CiphertextCodec,
    pub evaluator: Arc<RiskEvaluator>,
    pub keys: Arc<LocalKeyService>,
    pub gateway: Arc<LocalGateway>,
}

impl Deployment {
    pub fn new() -> Self {
        let substrate = Arc::new(FheSubstrate::new());
        let evaluator = Arc::new(RiskEvaluator::new(
            EvaluatorId::from_bytes([0xE7; 32]),
            substrate.clone(),
        ));
        let codec = CiphertextCodec::new(substrate.clone());
        Self {
            keys: Arc::new(LocalKeyService::new(codec.clone())),
            gateway: Arc::new(LocalGateway::new(evaluator.clone())),
            substrate,
            codec,
            evaluator,
        }
    }

    pub fn evaluator_id(&self) -> EvaluatorId {
        *self.evaluator.id()
    }

    /// A workflow for a fresh requester, plus its signer for toggling.
    pub fn requester(&self) -> (LocalWorkflow, Arc<LocalSigner>) {
        let signer = Arc::new(LocalSigner::new(Arc::new(LocalKeyProvider::generate())));
        let wf = EvaluationWorkflow::new(
            self.keys.clone(),
            signer.clone(),
            self.gateway.clone(),
            WorkflowConfig::default(),
        );
        (wf, signer)
    }

    /// Encrypt four plaintexts for `owner` directly through the codec.
    pub fn request(&self, owner: &Identity, age: u64, flags: [bool; 3]) -> EvaluationRequest {
        let ev = self.evaluator_id();
        let enc = |p: Plaintext| {
            let (value, proof) = self.codec.encrypt(p, &ev, owner).unwrap();
            ProvenInput { value, proof }
        };
        EvaluationRequest {
            age: enc(Plaintext::Uint(age)),
            has_history: enc(Plaintext::Bool(flags[0])),
            has_chronic: enc(Plaintext::Bool(flags[1])),
            lifestyle_risk: enc(Plaintext::Bool(flags[2])),
        }
    }

    /// Decrypt `value` under an authorization signed by `key`.
    pub fn decrypt_as(
        &self,
        key: &dyn KeyProvider,
        value: &EncryptedValue,
    ) -> Result<Category, ceval_fhe::CodecError> {
        let auth = DecryptionAuthorization::issue(
            key,
            self.evaluator_id(),
            value.handle(),
            Timestamp::now(),
            DEFAULT_VALIDITY_SECS,
        )?;
        match self.codec.decrypt(value, &auth)? {
            Plaintext::Uint(v) => Ok(Category::from_value(v).unwrap()),
            Plaintext::Bool(b) => panic!("result decrypted to bool {b}"),
        }
    }

    /// Evaluate directly on the evaluator and decrypt as `key`.
    pub fn classify(&self, key: &LocalKeyProvider, age: u64, flags: [bool; 3]) -> Category {
        let me = key.identity();
        let result = self
            .evaluator
            .evaluate(&me, &self.request(&me, age, flags))
            .unwrap();
        self.decrypt_as(key, &result).unwrap()
    }
}

pub fn reference(age: u64, flags: [bool; 3]) -> Category {
    let in_band = (18..=64).contains(&age);
    match (in_band, flags.iter().any(|f| *f)) {
        (true, false) => Category::Eligible,
        (true, true) => Category::Moderate,
        (false, _) => Category::NotEligible,
    }
}

pub fn triples() -> Vec<[bool; 3]> {
    (0u8..8)
        .map(|b| [b & 4 != 0, b & 2 != 0, b & 1 != 0])
        .collect()
}
