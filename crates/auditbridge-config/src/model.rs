//! Configuration schema.
//!
//! Every section and field has a default, so an empty document is a complete
//! configuration for a single-peer network on localhost.
//!
//! Example:
//! ```toml
//! [network]
//! channel = "mychannel"
//! chaincode_id = "clause"
//! peers = ["grpc://localhost:7051"]
//!
//! [source]
//! topic = "clause-events"
//!
//! [submit]
//! commit_timeout_secs = 30
//! max_attempts = 3
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Where the ledger network lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkSection {
    pub channel: String,
    /// Chaincode that stores audit events.
    pub chaincode_id: String,
    /// Endorsing peers. Proposals go to all of them.
    pub peers: Vec<String>,
    pub orderer: String,
    /// Source of commit notifications.
    pub event_hub: String,
}

impl Default for NetworkSection {
    fn default() -> Self {
        Self {
            channel: "mychannel".to_string(),
            chaincode_id: "clause".to_string(),
            peers: vec!["grpc://localhost:7051".to_string()],
            orderer: "grpc://localhost:7050".to_string(),
            event_hub: "grpc://localhost:7053".to_string(),
        }
    }
}

/// Which enrolled user the bridge signs as.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdentitySection {
    pub user: String,
    /// Directory holding one credential file per user.
    pub key_store: PathBuf,
}

impl Default for IdentitySection {
    fn default() -> Self {
        Self {
            user: "user1".to_string(),
            key_store: PathBuf::from("hfc-key-store"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceSection {
    pub topic: String,
    pub group_id: String,
}

impl Default for SourceSection {
    fn default() -> Self {
        Self {
            topic: "clause-events".to_string(),
            group_id: "clause-hlf".to_string(),
        }
    }
}

/// Submission deadlines and retry behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmitSection {
    pub commit_timeout_secs: u64,
    pub send_timeout_secs: u64,
    /// Attempts per event, the first included. 1 means fail fast.
    pub max_attempts: u32,
    pub retry_backoff_ms: u64,
    /// Optional JSON Schema every event must satisfy.
    pub event_schema: Option<PathBuf>,
}

impl Default for SubmitSection {
    fn default() -> Self {
        Self {
            commit_timeout_secs: 30,
            send_timeout_secs: 10,
            max_attempts: 1,
            retry_backoff_ms: 500,
            event_schema: None,
        }
    }
}

/// The top-level structure deserialized from a bridge TOML file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    pub network: NetworkSection,
    pub identity: IdentitySection,
    pub source: SourceSection,
    pub submit: SubmitSection,
}
