//! Inbound event types.
//!
//! `RawEvent` is what an event source delivers: opaque bytes tagged with the
//! topic and offset they were read from. `AuditEvent` is the decoded,
//! immutable record the submitter turns into a ledger transaction.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{BridgeError, BridgeResult};

/// Field every audit event must carry to identify the target contract.
pub const CONTRACT_ID_FIELD: &str = "contractId";

/// One payload as delivered by an event source.
///
/// Delivery is at-least-once, so the same payload may arrive more than once
/// under different offsets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawEvent {
    /// The topic the payload was consumed from.
    pub topic: String,
    /// Position of the payload within its topic, assigned by the source.
    pub offset: u64,
    /// UTF-8 text encoding a JSON object.
    pub payload: Vec<u8>,
    /// Wall-clock time the source handed the payload over (UTC).
    pub received_at: DateTime<Utc>,
}

impl RawEvent {
    /// Wrap `payload` as received now from `topic` at `offset`.
    pub fn new(topic: impl Into<String>, offset: u64, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            offset,
            payload: payload.into(),
            received_at: Utc::now(),
        }
    }
}

/// A decoded audit event emitted by the contract execution engine.
///
/// The full record is retained so the ledger copy is self-describing; the
/// `contract_id` is lifted out because it keys the ledger entry.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEvent {
    contract_id: String,
    record: Map<String, Value>,
}

impl AuditEvent {
    /// Decode a UTF-8 JSON payload.
    ///
    /// Fails with `BridgeError::Decode` if the bytes are not a JSON object or
    /// the object has no string `contractId`.
    pub fn from_slice(payload: &[u8]) -> BridgeResult<Self> {
        let value: Value = serde_json::from_slice(payload).map_err(|e| BridgeError::Decode {
            reason: format!("payload is not valid JSON: {}", e),
        })?;
        Self::from_value(value)
    }

    /// Build an event from an already-parsed JSON value.
    pub fn from_value(value: Value) -> BridgeResult<Self> {
        let record = match value {
            Value::Object(map) => map,
            other => {
                return Err(BridgeError::Decode {
                    reason: format!("expected a JSON object, found {}", json_kind(&other)),
                })
            }
        };

        let contract_id = match record.get(CONTRACT_ID_FIELD) {
            Some(Value::String(id)) if !id.is_empty() => id.clone(),
            Some(Value::String(_)) => {
                return Err(BridgeError::Decode {
                    reason: format!("'{}' must not be empty", CONTRACT_ID_FIELD),
                })
            }
            Some(other) => {
                return Err(BridgeError::Decode {
                    reason: format!(
                        "'{}' must be a string, found {}",
                        CONTRACT_ID_FIELD,
                        json_kind(other)
                    ),
                })
            }
            None => {
                return Err(BridgeError::Decode {
                    reason: format!("missing required field '{}'", CONTRACT_ID_FIELD),
                })
            }
        };

        Ok(Self { contract_id, record })
    }

    /// The identifier of the contract instance this event belongs to.
    pub fn contract_id(&self) -> &str {
        &self.contract_id
    }

    /// The full decoded record, `contractId` included.
    pub fn record(&self) -> &Map<String, Value> {
        &self.record
    }

    /// Re-serialize the full record as compact JSON.
    ///
    /// Object keys are emitted in sorted order, so two decodings of the same
    /// logical event always serialize to the same text.
    pub fn to_canonical_json(&self) -> String {
        Value::Object(self.record.clone()).to_string()
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
