//! The audit chaincode: the ledger-side entry point that stores audit events.
//!
//! Dispatch goes through `AuditOperation`, a closed set of named operations
//! each with a fixed arity. Names outside the set fail with
//! `UnknownFunction`; wrong argument counts fail with `Arity`. Both come back
//! to the caller as an error envelope and leave the write set empty.

use tracing::{error, info};

use auditbridge_contracts::{
    error::{BridgeError, BridgeResult},
    transaction::STORE_AUDIT_EVENT,
};

use crate::response::Response;
use crate::stub::ChaincodeStub;

/// Function name of the ledger initialisation operation.
pub const INIT_LEDGER: &str = "initLedger";

/// Ledger key under which the latest audit event for `contract_id` lives.
pub fn ledger_key(contract_id: &str) -> String {
    format!("{}-AuditEvent", contract_id)
}

/// A program the ledger runtime can initialise and invoke.
pub trait Chaincode: Send + Sync {
    /// Called once when the chaincode is instantiated.
    fn init(&self, stub: &mut ChaincodeStub) -> Response;

    /// Called for every transaction proposal addressed to this chaincode.
    fn invoke(&self, stub: &mut ChaincodeStub) -> Response;
}

/// Every operation the audit chaincode supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuditOperation {
    /// No-op initialisation hook.
    InitLedger,
    /// `storeAuditEvent(contractId, eventText)`.
    StoreAuditEvent,
}

impl AuditOperation {
    pub const ALL: [AuditOperation; 2] = [AuditOperation::InitLedger, AuditOperation::StoreAuditEvent];

    /// Resolve a requested function name.
    pub fn from_name(name: &str) -> BridgeResult<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.name() == name)
            .ok_or_else(|| BridgeError::UnknownFunction {
                function: name.to_string(),
            })
    }

    pub fn name(self) -> &'static str {
        match self {
            AuditOperation::InitLedger => INIT_LEDGER,
            AuditOperation::StoreAuditEvent => STORE_AUDIT_EVENT,
        }
    }

    /// Exact number of arguments the operation takes, or `None` if it
    /// ignores its arguments.
    pub fn arity(self) -> Option<usize> {
        match self {
            AuditOperation::InitLedger => None,
            AuditOperation::StoreAuditEvent => Some(2),
        }
    }

    fn check_arity(self, params: &[String]) -> BridgeResult<()> {
        match self.arity() {
            Some(expected) if params.len() != expected => Err(BridgeError::Arity {
                function: self.name().to_string(),
                expected,
                actual: params.len(),
            }),
            _ => Ok(()),
        }
    }
}

/// Chaincode that records contract audit events under contract-keyed state.
#[derive(Debug, Default)]
pub struct AuditChaincode;

impl AuditChaincode {
    pub fn new() -> Self {
        Self
    }

    fn dispatch(&self, stub: &mut ChaincodeStub, function: &str, params: &[String]) -> BridgeResult<Vec<u8>> {
        let operation = AuditOperation::from_name(function)?;
        operation.check_arity(params)?;

        match operation {
            AuditOperation::InitLedger => Ok(Self::init_ledger()),
            AuditOperation::StoreAuditEvent => Ok(Self::store_audit_event(stub, &params[0], &params[1])),
        }
    }

    fn init_ledger() -> Vec<u8> {
        info!("ledger initialized");
        Vec::new()
    }

    /// Stage `event_text` under `"{contract_id}-AuditEvent"`.
    ///
    /// Overwrites any earlier event for the same contract.
    fn store_audit_event(stub: &mut ChaincodeStub, contract_id: &str, event_text: &str) -> Vec<u8> {
        stub.put_state(ledger_key(contract_id), event_text.as_bytes());
        info!(tx_id = %stub.tx_id(), contract_id = %contract_id, "stored audit event");
        format!("Saved audit event for {}", contract_id).into_bytes()
    }
}

impl Chaincode for AuditChaincode {
    fn init(&self, stub: &mut ChaincodeStub) -> Response {
        info!(tx_id = %stub.tx_id(), "instantiated audit chaincode");
        Response::success(Vec::new())
    }

    fn invoke(&self, stub: &mut ChaincodeStub) -> Response {
        let (function, params) = stub.function_and_parameters();
        let (function, params) = (function.to_string(), params.to_vec());
        info!(tx_id = %stub.tx_id(), function = %function, args = params.len(), "invoke");

        match self.dispatch(stub, &function, &params) {
            Ok(payload) => Response::success(payload),
            Err(e) => {
                error!(tx_id = %stub.tx_id(), function = %function, error = %e, "invocation failed");
                Response::error(e.to_string())
            }
        }
    }
}
