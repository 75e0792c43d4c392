//! In-memory world state.
//!
//! `WorldState` is the committed key/value view of the ledger. Chaincode
//! never writes to it directly: writes are captured by the stub during
//! simulation and applied here only when the transaction commits valid.

use std::collections::{BTreeMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::debug;

use auditbridge_contracts::transaction::{StateWrite, TransactionId};

#[derive(Default)]
pub(crate) struct StateInner {
    pub(crate) entries: BTreeMap<String, Vec<u8>>,
    pub(crate) committed: HashSet<TransactionId>,
}

/// Shared, committed key/value state.
///
/// Cloning yields another handle to the same state.
#[derive(Clone, Default)]
pub struct WorldState {
    inner: Arc<Mutex<StateInner>>,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StateInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Committed value for `key`, if any.
    pub fn get(&self, key: &str) -> Option<Vec<u8>> {
        self.lock().entries.get(key).cloned()
    }

    /// Committed value for `key` decoded as UTF-8.
    pub fn get_string(&self, key: &str) -> Option<String> {
        self.get(key)
            .map(|bytes| String::from_utf8_lossy(&bytes).into_owned())
    }

    /// True if a transaction with this identifier has already been applied.
    pub fn has_committed(&self, tx_id: &TransactionId) -> bool {
        self.lock().committed.contains(tx_id)
    }

    /// Apply the write set of a validated transaction.
    ///
    /// Writes overwrite existing values; the last applied transaction wins.
    pub fn apply(&self, tx_id: &TransactionId, writes: &[StateWrite]) {
        let mut inner = self.lock();
        for write in writes {
            inner.entries.insert(write.key.clone(), write.value.clone());
        }
        inner.committed.insert(tx_id.clone());
        debug!(tx_id = %tx_id, keys = writes.len(), "applied write set");
    }

    /// Mark a transaction as seen without applying anything.
    ///
    /// Invalid transactions still consume their identifier.
    pub fn record_invalid(&self, tx_id: &TransactionId) {
        self.lock().committed.insert(tx_id.clone());
    }

    pub fn keys(&self) -> Vec<String> {
        self.lock().entries.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }
}
