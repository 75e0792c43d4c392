//! # auditbridge-chaincode
//!
//! The ledger-side entry point of the audit bridge.
//!
//! ## Overview
//!
//! The ledger runtime hands each invocation a `ChaincodeStub` carrying the
//! function name and arguments. `AuditChaincode` resolves the name against a
//! closed operation table and, for `storeAuditEvent`, stages one write:
//! key `"{contractId}-AuditEvent"`, value the serialized event text. Staged
//! writes reach `WorldState` only when the transaction commits valid.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use auditbridge_chaincode::{AuditChaincode, Chaincode, ChaincodeStub, WorldState};
//!
//! let state = WorldState::new();
//! let mut stub = ChaincodeStub::new(tx_id, "storeAuditEvent", args, state.clone());
//! let response = AuditChaincode::new().invoke(&mut stub);
//! state.apply(stub.tx_id(), stub.write_set());
//! ```

pub mod audit;
pub mod response;
pub mod state;
pub mod stub;

pub use audit::{ledger_key, AuditChaincode, AuditOperation, Chaincode, INIT_LEDGER};
pub use response::Response;
pub use state::WorldState;
pub use stub::ChaincodeStub;

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use auditbridge_contracts::{
        error::BridgeError,
        transaction::{StateWrite, TransactionId},
    };

    use super::{ledger_key, AuditChaincode, AuditOperation, Chaincode, ChaincodeStub, WorldState};

    // ── Helpers ───────────────────────────────────────────────────────────────

    fn stub(state: &WorldState, function: &str, args: &[&str]) -> ChaincodeStub {
        ChaincodeStub::new(
            TransactionId("tx-test".to_string()),
            function,
            args.iter().map(|a| a.to_string()).collect(),
            state.clone(),
        )
    }

    const EVENT_TEXT: &str = r#"{"contractId":"C1","status":"executed"}"#;

    // ── Tests ─────────────────────────────────────────────────────────────────

    /// `init` always succeeds and writes nothing.
    #[test]
    fn test_init_is_noop_success() {
        let state = WorldState::new();
        let mut s = stub(&state, "", &[]);

        let response = AuditChaincode::new().init(&mut s);

        assert!(response.is_success());
        assert!(s.write_set().is_empty());
    }

    /// `storeAuditEvent` stages exactly one write under the contract key and
    /// confirms it in the payload.
    #[test]
    fn test_store_audit_event() {
        let state = WorldState::new();
        let mut s = stub(&state, "storeAuditEvent", &["C1", EVENT_TEXT]);

        let response = AuditChaincode::new().invoke(&mut s);

        assert!(response.is_success(), "unexpected response: {:?}", response);
        assert_eq!(response.payload, b"Saved audit event for C1".to_vec());
        assert_eq!(
            s.write_set(),
            &[StateWrite {
                key: "C1-AuditEvent".to_string(),
                value: EVENT_TEXT.as_bytes().to_vec(),
            }]
        );
        // Nothing reaches world state until the transaction is applied.
        assert!(state.is_empty());
    }

    /// One argument instead of two is an arity error with no write.
    #[test]
    fn test_store_audit_event_arity() {
        let state = WorldState::new();
        let mut s = stub(&state, "storeAuditEvent", &["C1"]);

        let response = AuditChaincode::new().invoke(&mut s);

        assert!(!response.is_success());
        assert!(
            response.message.contains("expecting 2"),
            "unexpected message: {}",
            response.message
        );
        assert!(s.write_set().is_empty());
    }

    /// A name outside the operation table is rejected with no write.
    #[test]
    fn test_unknown_function() {
        let state = WorldState::new();
        let mut s = stub(&state, "deleteAuditEvent", &["C1"]);

        let response = AuditChaincode::new().invoke(&mut s);

        assert_eq!(response.status, super::response::ERROR);
        assert!(response.message.contains("unknown function deleteAuditEvent"));
        assert!(s.write_set().is_empty());
    }

    /// `initLedger` is a known operation and ignores its arguments.
    #[test]
    fn test_init_ledger_operation() {
        let state = WorldState::new();
        let mut s = stub(&state, "initLedger", &["anything", "at", "all"]);

        let response = AuditChaincode::new().invoke(&mut s);

        assert!(response.is_success());
        assert!(response.payload.is_empty());
        assert!(s.write_set().is_empty());
    }

    #[test]
    fn test_operation_table() {
        assert_eq!(
            AuditOperation::from_name("storeAuditEvent").unwrap(),
            AuditOperation::StoreAuditEvent
        );
        assert_eq!(AuditOperation::StoreAuditEvent.arity(), Some(2));
        assert!(matches!(
            AuditOperation::from_name("StoreAuditEvent"),
            Err(BridgeError::UnknownFunction { .. })
        ));
    }

    /// Applying two transactions for the same contract keeps the later value.
    #[test]
    fn test_last_write_wins() {
        let state = WorldState::new();
        let chaincode = AuditChaincode::new();

        let mut first = ChaincodeStub::new(
            TransactionId("tx-1".to_string()),
            "storeAuditEvent",
            vec!["C1".to_string(), "first".to_string()],
            state.clone(),
        );
        chaincode.invoke(&mut first);
        let mut second = ChaincodeStub::new(
            TransactionId("tx-2".to_string()),
            "storeAuditEvent",
            vec!["C1".to_string(), "second".to_string()],
            state.clone(),
        );
        chaincode.invoke(&mut second);

        state.apply(first.tx_id(), first.write_set());
        state.apply(second.tx_id(), second.write_set());

        assert_eq!(state.get_string(&ledger_key("C1")).as_deref(), Some("second"));
        assert_eq!(state.len(), 1);
        assert!(state.has_committed(&TransactionId("tx-1".to_string())));
    }

    /// A stub reads its own staged writes before committed state.
    #[test]
    fn test_stub_reads_own_writes() {
        let state = WorldState::new();
        state.apply(
            &TransactionId("tx-0".to_string()),
            &[StateWrite {
                key: "k".to_string(),
                value: b"committed".to_vec(),
            }],
        );

        let mut s = stub(&state, "storeAuditEvent", &[]);
        assert_eq!(s.get_state("k"), Some(b"committed".to_vec()));
        s.put_state("k", "staged");
        s.put_state("k", "restaged");
        assert_eq!(s.get_state("k"), Some(b"restaged".to_vec()));
        assert_eq!(s.write_set().len(), 1);
        assert_eq!(state.get_string("k").as_deref(), Some("committed"));
    }
}
