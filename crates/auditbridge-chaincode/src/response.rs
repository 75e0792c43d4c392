//! The envelope every chaincode entry point returns to the ledger runtime.

use serde::{Deserialize, Serialize};

/// Status of a successful invocation.
pub const OK: i32 = 200;

/// Status of a failed invocation.
pub const ERROR: i32 = 500;

/// Result of `init` or `invoke`, as the ledger runtime expects it.
///
/// Errors never escape the chaincode as panics; they are folded into an
/// envelope with status `ERROR` and the error text as `message`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Response {
    pub status: i32,
    pub message: String,
    pub payload: Vec<u8>,
}

impl Response {
    pub fn success(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            status: OK,
            message: String::new(),
            payload: payload.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            status: ERROR,
            message: message.into(),
            payload: Vec::new(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == OK
    }
}
