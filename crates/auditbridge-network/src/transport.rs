//! Transport seams between the connection and the ledger network.
//!
//! `ChannelConnection` talks to peers, the orderer, and the event hub only
//! through these traits. `LocalNetwork` provides in-process implementations.

use async_trait::async_trait;
use tokio::sync::broadcast;

use auditbridge_contracts::{
    error::BridgeResult,
    identity::SigningIdentity,
    transaction::{ProposalResponse, TransactionEnvelope, TransactionId, TransactionProposal},
};

/// One message on the event hub stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubMessage {
    /// A transaction was validated into a block with `code`.
    TxStatus { tx_id: TransactionId, code: String },
    /// The hub is going away; no further messages will follow.
    Disconnected { reason: String },
}

/// Subscription to the event hub.
pub type HubStream = broadcast::Receiver<HubMessage>;

/// A peer that simulates proposals and returns an endorsement.
#[async_trait]
pub trait Endorser: Send + Sync {
    fn address(&self) -> &str;

    /// Simulate `proposal` on behalf of `creator`.
    ///
    /// Returns `BridgeError::Network` only when the peer cannot be reached;
    /// chaincode failures come back as a non-200 response.
    async fn process_proposal(
        &self,
        proposal: &TransactionProposal,
        creator: &SigningIdentity,
    ) -> BridgeResult<ProposalResponse>;
}

/// The ordering service.
#[async_trait]
pub trait Orderer: Send + Sync {
    fn address(&self) -> &str;

    /// Accept an endorsed transaction for ordering.
    async fn broadcast(&self, envelope: TransactionEnvelope) -> BridgeResult<()>;
}

/// Source of commit notifications.
pub trait EventHub: Send + Sync {
    fn address(&self) -> &str;

    /// Open a stream of hub messages.
    ///
    /// Returns `BridgeError::Connection` if the hub cannot be reached.
    fn connect(&self) -> BridgeResult<HubStream>;
}
