//! # Public Evaluation Events
//!
//! Each successful evaluation emits `(caller, result_handle, timestamp)`.
//! Anyone may read the log or subscribe. The handle is ciphertext, so the
//! event says that someone evaluated, not what they got.

use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::broadcast;

use ceval_core::{Identity, Timestamp};
use ceval_fhe::CiphertextHandle;

const CHANNEL_CAPACITY: usize = 256;

/// One evaluation, as seen by the public.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EvaluationEvent {
    /// Who evaluated.
    pub caller: Identity,
    /// Opaque result handle.
    pub result_handle: CiphertextHandle,
    /// When.
    pub timestamp: Timestamp,
}

/// Append-only event log with a broadcast feed.
#[derive(Debug)]
pub struct EventLog {
    log: RwLock<Vec<EvaluationEvent>>,
    feed: broadcast::Sender<EvaluationEvent>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl EventLog {
    /// Empty log.
    pub fn new() -> Self {
        let (feed, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            log: RwLock::new(Vec::new()),
            feed,
        }
    }

    /// Append and broadcast. Having no subscribers is fine.
    pub(crate) fn emit(&self, event: EvaluationEvent) {
        self.log.write().push(event.clone());
        let _ = self.feed.send(event);
    }

    /// Live feed of future events.
    pub fn subscribe(&self) -> broadcast::Receiver<EvaluationEvent> {
        self.feed.subscribe()
    }

    /// Every event so far, oldest first.
    pub fn history(&self) -> Vec<EvaluationEvent> {
        self.log.read().clone()
    }

    /// Events for one caller, oldest first.
    pub fn for_caller(&self, caller: &Identity) -> Vec<EvaluationEvent> {
        self.log
            .read()
            .iter()
            .filter(|e| &e.caller == caller)
            .cloned()
            .collect()
    }
}
