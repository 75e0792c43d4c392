//! Error types for the audit bridge submission pipeline.
//!
//! All fallible operations in the bridge return `BridgeResult<T>`. Variants
//! carry the transaction and contract context needed to log a terminal
//! outcome without looking anything else up.

use thiserror::Error;

/// The unified error type for the audit bridge.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The ledger connection could not be established.
    ///
    /// Raised at startup only (identity missing or not enrolled, no peers,
    /// event hub unreachable). The process cannot continue.
    #[error("connection error: {reason}")]
    Connection { reason: String },

    /// An inbound payload is not a structured record carrying `contractId`.
    #[error("failed to decode event: {reason}")]
    Decode { reason: String },

    /// No peer endorsed the proposal with status 200.
    ///
    /// `status` and `message` come from the first response in the set.
    #[error("proposal {tx_id} rejected: status {status}, message \"{message}\"")]
    ProposalRejected {
        tx_id: String,
        status: i32,
        message: String,
    },

    /// A peer or the orderer could not be reached, or a send exceeded its deadline.
    #[error("network error: {reason}")]
    Network { reason: String },

    /// The chaincode was asked to run a function it does not define.
    #[error("received unknown function {function} invocation")]
    UnknownFunction { function: String },

    /// A chaincode function was called with the wrong number of arguments.
    #[error("incorrect number of arguments to {function}: expecting {expected}, got {actual}")]
    Arity {
        function: String,
        expected: usize,
        actual: usize,
    },

    /// A commit listener could not be registered.
    #[error("commit listener error: {reason}")]
    CommitListener { reason: String },

    /// A required configuration value is missing or invalid.
    #[error("configuration error: {reason}")]
    Config { reason: String },
}

impl BridgeError {
    /// Return true if a fresh attempt (with a new transaction id) may succeed.
    ///
    /// Decode failures are deterministic and never retried; connection and
    /// configuration failures are fatal at startup.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BridgeError::ProposalRejected { .. } | BridgeError::Network { .. }
        )
    }
}

/// Convenience alias used throughout the audit bridge crates.
pub type BridgeResult<T> = Result<T, BridgeError>;
