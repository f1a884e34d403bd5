//! # Risk Evaluator
//!
//! The trust boundary that runs the eligibility predicate over ciphertext.
//!
//! ## Evaluate
//!
//! 1. Check every input's declared type (age `uint8`, flags `bool`) and
//!    verify every validity proof against `(caller, self)`.
//! 2. Only then compute the encrypted category.
//! 3. Grant the result handle to this evaluator and to the caller.
//! 4. Overwrite the caller's record, emit the public event.
//! 5. Release the consumed inputs and the result the new record displaced.
//!
//! A failure in step 1 aborts before anything is written: no record
//! changes, no event is emitted, and the inputs are left as they were.
//! An input only verifies if the caller is on its access list and the
//! substrate's input verifier signed its proof.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;

use ceval_core::{EvaluatorId, Identity, Timestamp};
use ceval_fhe::{
    verify_input_proof, CodecError, EncryptedValue, FheSubstrate, FheType, Principal,
    SubstrateError, ValidityProof,
};

use crate::events::{EvaluationEvent, EventLog};
use crate::rules::{classify, Operands};
use crate::store::{LastResult, ResultStore};

/// An encrypted input and its proof.
#[derive(Debug, Clone, Serialize)]
pub struct ProvenInput {
    /// Ciphertext reference.
    pub value: EncryptedValue,
    /// Validity proof for `value`.
    pub proof: ValidityProof,
}

/// The four proven inputs of one evaluation.
#[derive(Debug, Clone, Serialize)]
pub struct EvaluationRequest {
    /// Age.
    pub age: ProvenInput,
    /// Prior history.
    pub has_history: ProvenInput,
    /// Chronic condition.
    pub has_chronic: ProvenInput,
    /// Lifestyle risk.
    pub lifestyle_risk: ProvenInput,
}

impl EvaluationRequest {
    fn inputs(&self) -> [(&'static str, &ProvenInput, FheType); 4] {
        [
            ("age", &self.age, FheType::Uint8),
            ("has_history", &self.has_history, FheType::Bool),
            ("has_chronic", &self.has_chronic, FheType::Bool),
            ("lifestyle_risk", &self.lifestyle_risk, FheType::Bool),
        ]
    }
}

/// Errors from [`RiskEvaluator::evaluate`].
#[derive(Error, Debug)]
pub enum EvaluatorError {
    /// An input proof failed; nothing was written.
    #[error("proof verification failed for {input}: {reason}")]
    ProofVerification {
        /// Which input.
        input: &'static str,
        /// Why.
        reason: String,
    },

    /// Substrate failure while computing on verified inputs.
    #[error("substrate error: {0}")]
    Substrate(#[from] SubstrateError),
}

/// The evaluator: predicate, result store, event log.
#[derive(Debug)]
pub struct RiskEvaluator {
    id: EvaluatorId,
    substrate: Arc<FheSubstrate>,
    store: ResultStore,
    events: EventLog,
}

impl RiskEvaluator {
    /// Evaluator `id` computing on `substrate`.
    pub fn new(id: EvaluatorId, substrate: Arc<FheSubstrate>) -> Self {
        Self {
            id,
            substrate,
            store: ResultStore::new(),
            events: EventLog::new(),
        }
    }

    /// This evaluator's identity.
    pub fn id(&self) -> &EvaluatorId {
        &self.id
    }

    /// Public event log.
    pub fn events(&self) -> &EventLog {
        &self.events
    }

    /// Result store (read access).
    pub fn store(&self) -> &ResultStore {
        &self.store
    }

    /// Run the predicate for `caller`.
    pub fn evaluate(
        &self,
        caller: &Identity,
        request: &EvaluationRequest,
    ) -> Result<EncryptedValue, EvaluatorError> {
        metrics::counter!("ceval_evaluations_total").increment(1);
        if let Err(e) = self.verify_all(caller, request) {
            metrics::counter!("ceval_evaluations_rejected_total").increment(1);
            tracing::warn!(caller = %caller.short(), error = %e, "evaluation rejected");
            return Err(e);
        }

        let result = classify(
            self.substrate.as_ref(),
            Operands {
                age: &request.age.value,
                has_history: &request.has_history.value,
                has_chronic: &request.has_chronic.value,
                lifestyle_risk: &request.lifestyle_risk.value,
            },
        )?;

        let handle = result.handle();
        self.substrate.allow(handle, Principal::Evaluator(self.id));
        self.substrate.allow(handle, Principal::Requester(*caller));

        let now = Timestamp::now();
        let displaced = self.store.record(*caller, result.clone(), now);
        self.events.emit(EvaluationEvent {
            caller: *caller,
            result_handle: handle,
            timestamp: now,
        });

        tracing::info!(
            caller = %caller.short(),
            handle = %handle.short(),
            "evaluation recorded"
        );

        for (_, proven, _) in request.inputs() {
            self.substrate.release(&proven.value.handle());
        }
        if let Some(old) = displaced {
            self.substrate.release(&old.result.handle());
        }
        Ok(result)
    }

    /// `identity`'s last result, or the zero sentinel.
    pub fn get_last_result(&self, identity: &Identity) -> LastResult {
        self.store.last_result(identity)
    }

    fn verify_all(
        &self,
        caller: &Identity,
        request: &EvaluationRequest,
    ) -> Result<(), EvaluatorError> {
        for (input, proven, expected) in request.inputs() {
            if proven.value.fhe_type() != expected {
                return Err(EvaluatorError::ProofVerification {
                    input,
                    reason: format!("expected {expected}, got {}", proven.value.fhe_type()),
                });
            }
            verify_input_proof(&self.substrate, &proven.value, &proven.proof, caller, &self.id)
                .map_err(|e| EvaluatorError::ProofVerification {
                    input,
                    reason: match e {
                        CodecError::ProofVerification(r) => r,
                        other => other.to_string(),
                    },
                })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ceval_crypto::{KeyProvider, LocalKeyProvider};
    use ceval_fhe::{CiphertextCodec, Plaintext};

    struct Setup {
        evaluator: RiskEvaluator,
        codec: CiphertextCodec,
        caller: LocalKeyProvider,
    }

    fn setup() -> Setup {
        let substrate = Arc::new(FheSubstrate::new());
        Setup {
            evaluator: RiskEvaluator::new(EvaluatorId::from_bytes([0x42; 32]), substrate.clone()),
            codec: CiphertextCodec::new(substrate),
            caller: LocalKeyProvider::generate(),
        }
    }

    fn request(s: &Setup, owner: &Identity, age: u64, flags: [bool; 3]) -> EvaluationRequest {
        let enc = |p: Plaintext| {
            let (value, proof) = s.codec.encrypt(p, s.evaluator.id(), owner).unwrap();
            ProvenInput { value, proof }
        };
        EvaluationRequest {
            age: enc(Plaintext::Uint(age)),
            has_history: enc(Plaintext::Bool(flags[0])),
            has_chronic: enc(Plaintext::Bool(flags[1])),
            lifestyle_risk: enc(Plaintext::Bool(flags[2])),
        }
    }

    #[test]
    fn successful_evaluation_records_and_emits() {
        let s = setup();
        let me = s.caller.identity();
        let req = request(&s, &me, 30, [false; 3]);
        let result = s.evaluator.evaluate(&me, &req).unwrap();

        let last = s.evaluator.get_last_result(&me);
        assert_eq!(last.result.handle(), result.handle());
        assert!(!last.evaluated_at.is_zero());

        let events = s.evaluator.events().history();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].caller, me);
        assert_eq!(events[0].result_handle, result.handle());
        assert_eq!(events[0].timestamp, last.evaluated_at);
    }

    #[test]
    fn result_is_granted_to_caller_and_evaluator() {
        let s = setup();
        let me = s.caller.identity();
        let result = s.evaluator.evaluate(&me, &request(&s, &me, 30, [false; 3])).unwrap();
        let sub = s.codec.substrate();
        assert!(sub.is_allowed(&result.handle(), &Principal::Requester(me)));
        assert!(sub.is_allowed(&result.handle(), &Principal::Evaluator(*s.evaluator.id())));
        assert!(!sub.is_allowed(
            &result.handle(),
            &Principal::Requester(Identity::from_bytes([9; 32]))
        ));
    }

    #[test]
    fn inputs_from_another_identity_are_rejected_atomically() {
        let s = setup();
        let me = s.caller.identity();
        let victim = Identity::from_bytes([7; 32]);
        let stolen = request(&s, &victim, 30, [false; 3]);

        let err = s.evaluator.evaluate(&me, &stolen).unwrap_err();
        assert!(matches!(err, EvaluatorError::ProofVerification { input: "age", .. }));
        assert!(s.evaluator.get_last_result(&me).is_sentinel());
        assert!(s.evaluator.events().history().is_empty());
    }

    #[test]
    fn one_bad_proof_among_four_leaves_prior_record_untouched() {
        let s = setup();
        let me = s.caller.identity();
        let first = s.evaluator.evaluate(&me, &request(&s, &me, 30, [false; 3])).unwrap();
        let before = s.evaluator.get_last_result(&me);

        let mut req = request(&s, &me, 30, [true, false, false]);
        let foreign = request(&s, &Identity::from_bytes([8; 32]), 30, [false; 3]);
        req.lifestyle_risk = foreign.lifestyle_risk;

        let err = s.evaluator.evaluate(&me, &req).unwrap_err();
        assert!(matches!(
            err,
            EvaluatorError::ProofVerification { input: "lifestyle_risk", .. }
        ));
        let after = s.evaluator.get_last_result(&me);
        assert_eq!(after.result.handle(), first.handle());
        assert_eq!(after.evaluated_at, before.evaluated_at);
        assert_eq!(s.evaluator.events().history().len(), 1);
    }

    #[test]
    fn swapped_input_types_are_rejected() {
        let s = setup();
        let me = s.caller.identity();
        let mut req = request(&s, &me, 30, [false; 3]);
        std::mem::swap(&mut req.age, &mut req.has_history);
        assert!(matches!(
            s.evaluator.evaluate(&me, &req),
            Err(EvaluatorError::ProofVerification { input: "age", .. })
        ));
    }

    #[test]
    fn proof_for_another_evaluator_is_rejected() {
        let s = setup();
        let me = s.caller.identity();
        let elsewhere = EvaluatorId::from_bytes([0x99; 32]);
        let enc = |p: Plaintext| {
            let (value, proof) = s.codec.encrypt(p, &elsewhere, &me).unwrap();
            ProvenInput { value, proof }
        };
        let req = EvaluationRequest {
            age: enc(Plaintext::Uint(30)),
            has_history: enc(Plaintext::Bool(false)),
            has_chronic: enc(Plaintext::Bool(false)),
            lifestyle_risk: enc(Plaintext::Bool(false)),
        };
        assert!(s.evaluator.evaluate(&me, &req).is_err());
    }

    #[test]
    fn handles_taken_from_another_requester_are_rejected() {
        use ceval_zkp::{AttestationKey, AttestedProofSystem, InputProofCircuit, ProofSystem};

        let s = setup();
        let alice = s.caller.identity();
        let mallory = Identity::from_bytes([0x66; 32]);
        let theirs = request(&s, &alice, 30, [false; 3]);
        let sub = s.codec.substrate();

        let own_key = AttestationKey::generate();
        let reprove = |p: &ProvenInput| {
            let h = p.value.handle();
            let circuit = InputProofCircuit::new(
                *h.as_bytes(),
                sub.ciphertext_digest(&h).unwrap(),
                p.value.fhe_type().as_str(),
                mallory,
                *s.evaluator.id(),
            );
            ProvenInput {
                value: p.value.clone(),
                proof: ValidityProof(AttestedProofSystem.prove(&own_key, &circuit).unwrap()),
            }
        };
        let stolen = EvaluationRequest {
            age: reprove(&theirs.age),
            has_history: reprove(&theirs.has_history),
            has_chronic: reprove(&theirs.has_chronic),
            lifestyle_risk: reprove(&theirs.lifestyle_risk),
        };

        let err = s.evaluator.evaluate(&mallory, &stolen).unwrap_err();
        assert!(matches!(err, EvaluatorError::ProofVerification { input: "age", .. }));
        assert!(s.evaluator.get_last_result(&mallory).is_sentinel());
        assert!(s.evaluator.events().history().is_empty());

        // Alice's own submission still goes through afterwards.
        s.evaluator.evaluate(&alice, &theirs).unwrap();
    }

    #[test]
    fn substrate_holds_one_ciphertext_per_identity() {
        let s = setup();
        let me = s.caller.identity();
        let sub = s.codec.substrate();
        for age in [30, 70, 40, 18] {
            s.evaluator.evaluate(&me, &request(&s, &me, age, [false; 3])).unwrap();
            assert_eq!(sub.len(), 1);
        }
        let other = Identity::from_bytes([0x31; 32]);
        s.evaluator.evaluate(&other, &request(&s, &other, 50, [true; 3])).unwrap();
        assert_eq!(sub.len(), 2);
    }

    #[test]
    fn rejected_inputs_are_not_released() {
        let s = setup();
        let me = s.caller.identity();
        let victim = Identity::from_bytes([7; 32]);
        let theirs = request(&s, &victim, 30, [false; 3]);
        let held = s.codec.substrate().len();
        s.evaluator.evaluate(&me, &theirs).unwrap_err();
        assert_eq!(s.codec.substrate().len(), held);
    }

    #[test]
    fn reevaluation_overwrites() {
        let s = setup();
        let me = s.caller.identity();
        s.evaluator.evaluate(&me, &request(&s, &me, 30, [false; 3])).unwrap();
        let second = s.evaluator.evaluate(&me, &request(&s, &me, 70, [false; 3])).unwrap();
        assert_eq!(s.evaluator.store().len(), 1);
        assert_eq!(s.evaluator.get_last_result(&me).result.handle(), second.handle());
        assert_eq!(s.evaluator.events().for_caller(&me).len(), 2);
    }
}
