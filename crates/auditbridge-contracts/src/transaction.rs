//! Transaction proposal, endorsement, and envelope types.
//!
//! A submission moves through these types in order:
//! `TransactionProposal` → `ProposalResponseSet` → `TransactionEnvelope`.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::AuditEvent;

/// Chaincode function that persists one audit event.
pub const STORE_AUDIT_EVENT: &str = "storeAuditEvent";

/// Status code a peer returns when it endorses a proposal.
pub const SUCCESS_STATUS: i32 = 200;

/// Unique identifier for one submission attempt.
///
/// Generated fresh from the signing identity for every proposal, retries
/// included. Commit notifications are correlated by this value alone.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TransactionId(pub String);

impl TransactionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A request asking peers to simulate one chaincode invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionProposal {
    pub tx_id: TransactionId,
    /// Logical channel the chaincode is deployed on (e.g. "mychannel").
    pub channel: String,
    /// Deployed chaincode name (e.g. "clause").
    pub chaincode_id: String,
    /// Function to invoke inside the chaincode.
    pub function: String,
    /// Positional string arguments, in order.
    pub args: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl TransactionProposal {
    /// Build the `storeAuditEvent` proposal for `event`.
    ///
    /// Arguments are `[contractId, canonical JSON of the full event]`.
    pub fn store_audit_event(
        tx_id: TransactionId,
        channel: impl Into<String>,
        chaincode_id: impl Into<String>,
        event: &AuditEvent,
    ) -> Self {
        Self {
            tx_id,
            channel: channel.into(),
            chaincode_id: chaincode_id.into(),
            function: STORE_AUDIT_EVENT.to_string(),
            args: vec![event.contract_id().to_string(), event.to_canonical_json()],
            created_at: Utc::now(),
        }
    }
}

/// One key written by a simulated chaincode invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateWrite {
    pub key: String,
    pub value: Vec<u8>,
}

/// A single peer's answer to a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalResponse {
    /// Address of the answering peer.
    pub peer: String,
    pub status: i32,
    pub message: String,
    pub payload: Vec<u8>,
    /// Keys the simulation would write if the transaction commits.
    pub write_set: Vec<StateWrite>,
}

impl ProposalResponse {
    pub fn is_success(&self) -> bool {
        self.status == SUCCESS_STATUS
    }
}

/// All responses collected for one proposal.
///
/// The set is good only if at least one response carries status 200. An
/// empty set is always bad.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProposalResponseSet {
    pub responses: Vec<ProposalResponse>,
}

impl ProposalResponseSet {
    pub fn new(responses: Vec<ProposalResponse>) -> Self {
        Self { responses }
    }

    pub fn is_good(&self) -> bool {
        self.responses.iter().any(ProposalResponse::is_success)
    }

    /// The first response, whose status and message describe a rejection.
    pub fn first(&self) -> Option<&ProposalResponse> {
        self.responses.first()
    }

    /// The first endorsing (status 200) response.
    pub fn first_success(&self) -> Option<&ProposalResponse> {
        self.responses.iter().find(|r| r.is_success())
    }

    pub fn len(&self) -> usize {
        self.responses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.responses.is_empty()
    }
}

/// The assembled transaction handed to the ordering service.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionEnvelope {
    pub proposal: TransactionProposal,
    pub endorsements: Vec<ProposalResponse>,
}

impl TransactionEnvelope {
    /// Combine a proposal with the responses collected for it.
    pub fn assemble(proposal: TransactionProposal, responses: ProposalResponseSet) -> Self {
        Self {
            proposal,
            endorsements: responses.responses,
        }
    }

    pub fn tx_id(&self) -> &TransactionId {
        &self.proposal.tx_id
    }
}
