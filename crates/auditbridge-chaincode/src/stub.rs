//! The per-invocation stub handed to chaincode.
//!
//! The stub exposes the requested function and its arguments, reads through
//! to committed state, and captures every `put_state` in a write set instead
//! of touching the world state.

use auditbridge_contracts::transaction::{StateWrite, TransactionId};

use crate::state::WorldState;

pub struct ChaincodeStub {
    tx_id: TransactionId,
    function: String,
    params: Vec<String>,
    state: WorldState,
    writes: Vec<StateWrite>,
}

impl ChaincodeStub {
    pub fn new(
        tx_id: TransactionId,
        function: impl Into<String>,
        params: Vec<String>,
        state: WorldState,
    ) -> Self {
        Self {
            tx_id,
            function: function.into(),
            params,
            state,
            writes: Vec::new(),
        }
    }

    pub fn tx_id(&self) -> &TransactionId {
        &self.tx_id
    }

    /// The requested function name and its positional arguments.
    pub fn function_and_parameters(&self) -> (&str, &[String]) {
        (&self.function, &self.params)
    }

    /// Stage a write of `value` under `key`.
    ///
    /// A later write to the same key within one invocation replaces the
    /// earlier one.
    pub fn put_state(&mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        let key = key.into();
        let value = value.into();
        match self.writes.iter_mut().find(|w| w.key == key) {
            Some(existing) => existing.value = value,
            None => self.writes.push(StateWrite { key, value }),
        }
    }

    /// Read `key`, seeing this invocation's own staged writes first.
    pub fn get_state(&self, key: &str) -> Option<Vec<u8>> {
        self.writes
            .iter()
            .find(|w| w.key == key)
            .map(|w| w.value.clone())
            .or_else(|| self.state.get(key))
    }

    pub fn write_set(&self) -> &[StateWrite] {
        &self.writes
    }

    pub fn into_write_set(self) -> Vec<StateWrite> {
        self.writes
    }
}
