//! Schema-checked event decoder.
//!
//! `SchemaDecoder` implements `EventDecoder` from auditbridge-core. Decoding
//! runs in three phases:
//!
//! 1. **Parse**: the payload must be JSON.
//! 2. **Structural**: if a JSON Schema is configured, the document is
//!    validated against it with the `jsonschema` crate. All violations are
//!    collected into one `Decode` error.
//! 3. **Record**: the document must be an object carrying a non-empty string
//!    `contractId`. Named checks registered with `register_check` run last.
//!
//! With no schema configured only phase 3 applies.

use std::path::Path;

use jsonschema::Validator;
use serde_json::{Map, Value};
use tracing::{debug, warn};

use auditbridge_contracts::{
    error::{BridgeError, BridgeResult},
    event::AuditEvent,
};
use auditbridge_core::traits::EventDecoder;

/// A caller-supplied record check.
///
/// Returns `Some(message)` when the record must be rejected.
pub type EventCheckFn = Box<dyn Fn(&Map<String, Value>) -> Option<String> + Send + Sync>;

pub struct SchemaDecoder {
    validator: Option<Validator>,
    checks: Vec<(String, EventCheckFn)>,
}

impl SchemaDecoder {
    /// A decoder that only requires the `contractId` field.
    pub fn new() -> Self {
        Self {
            validator: None,
            checks: Vec::new(),
        }
    }

    /// A decoder that additionally validates every payload against `schema`.
    ///
    /// Returns `BridgeError::Config` if `schema` is not a valid JSON Schema
    /// document.
    pub fn with_schema(schema: &Value) -> BridgeResult<Self> {
        let validator = jsonschema::validator_for(schema).map_err(|e| BridgeError::Config {
            reason: format!("invalid event JSON Schema: {}", e),
        })?;
        Ok(Self {
            validator: Some(validator),
            checks: Vec::new(),
        })
    }

    /// Load a JSON Schema document from `path` and build a decoder from it.
    pub fn from_schema_file(path: &Path) -> BridgeResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(|e| BridgeError::Config {
            reason: format!("failed to read event schema '{}': {}", path.display(), e),
        })?;
        let schema: Value = serde_json::from_str(&contents).map_err(|e| BridgeError::Config {
            reason: format!("failed to parse event schema '{}': {}", path.display(), e),
        })?;
        Self::with_schema(&schema)
    }

    /// Register a named check run against every decoded record.
    ///
    /// Checks run in registration order; the first failure rejects the event.
    pub fn register_check(&mut self, name: impl Into<String>, check: EventCheckFn) {
        self.checks.push((name.into(), check));
    }

    pub fn has_schema(&self) -> bool {
        self.validator.is_some()
    }
}

impl Default for SchemaDecoder {
    fn default() -> Self {
        Self::new()
    }
}

impl EventDecoder for SchemaDecoder {
    fn decode(&self, payload: &[u8]) -> BridgeResult<AuditEvent> {
        // ── Phase 1: parse ───────────────────────────────────────────────────
        let value: Value = serde_json::from_slice(payload).map_err(|e| BridgeError::Decode {
            reason: format!("event payload is not valid JSON: {}", e),
        })?;

        // ── Phase 2: structural validation ───────────────────────────────────
        if let Some(validator) = &self.validator {
            let violations: Vec<String> = validator
                .iter_errors(&value)
                .map(|error| format!("schema violation at '{}': {}", error.instance_path, error))
                .collect();
            if !violations.is_empty() {
                warn!(violations = violations.len(), "event failed schema validation");
                return Err(BridgeError::Decode {
                    reason: violations.join("; "),
                });
            }
        }

        // ── Phase 3: record checks ───────────────────────────────────────────
        let event = AuditEvent::from_value(value)?;
        for (name, check) in &self.checks {
            if let Some(message) = check(event.record()) {
                warn!(check = %name, contract_id = %event.contract_id(), %message, "event check failed");
                return Err(BridgeError::Decode {
                    reason: format!("check '{}' rejected event: {}", name, message),
                });
            }
        }

        debug!(contract_id = %event.contract_id(), "decoded audit event");
        Ok(event)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
