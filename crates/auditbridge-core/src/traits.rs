//! Trait seams for the audit bridge.
//!
//! - `LedgerConnection`: authenticated channel to peers, orderer, and event hub
//! - `EventSource`: at-least-once supplier of raw event payloads
//! - `EventDecoder`: turns a raw payload into an `AuditEvent`
//!
//! The submitter and the bridge only ever see these traits, so every
//! collaborator can be replaced by a test double.

use async_trait::async_trait;
use tokio::sync::oneshot;

use auditbridge_contracts::{
    commit::CommitNotification,
    error::BridgeResult,
    event::{AuditEvent, RawEvent},
    transaction::{ProposalResponseSet, TransactionEnvelope, TransactionId, TransactionProposal},
};

/// Receiving half of a one-shot commit listener.
pub type CommitWaiter = oneshot::Receiver<CommitNotification>;

/// The authenticated, long-lived channel to the ledger network.
///
/// Implementations are shared read-only across concurrent submissions once
/// connected. Only the commit-listener table changes after `connect`.
#[async_trait]
pub trait LedgerConnection: Send + Sync {
    /// Derive a fresh transaction identifier from the signing identity.
    ///
    /// Must not block, and must never return the same value twice.
    fn new_transaction_id(&self) -> TransactionId;

    /// Send `proposal` to every configured peer and collect their answers.
    ///
    /// Fails with `BridgeError::Network` if no peer could be reached.
    async fn send_proposal(&self, proposal: &TransactionProposal) -> BridgeResult<ProposalResponseSet>;

    /// Hand the assembled transaction to the ordering service.
    ///
    /// Success means the orderer accepted it, not that it committed. Commit
    /// is observed only through `on_commit`.
    async fn send_transaction(&self, envelope: &TransactionEnvelope) -> BridgeResult<()>;

    /// Register a one-shot listener for `tx_id`.
    ///
    /// At most one listener may be active per identifier; a second
    /// registration fails with `BridgeError::CommitListener`.
    fn on_commit(&self, tx_id: &TransactionId) -> BridgeResult<CommitWaiter>;

    /// Drop the listener for `tx_id`, if any. Idempotent.
    fn off_commit(&self, tx_id: &TransactionId);
}

/// A named, at-least-once stream of raw event payloads.
#[async_trait]
pub trait EventSource: Send {
    /// Topic this source consumes.
    fn topic(&self) -> &str;

    /// Consumer group this source consumes under.
    fn group_id(&self) -> &str;

    /// Wait for the next payload. `None` means the source is exhausted.
    async fn next_event(&mut self) -> Option<RawEvent>;
}

/// Decodes raw payloads into audit events.
pub trait EventDecoder: Send + Sync {
    /// Fails with `BridgeError::Decode` for anything that is not a structured
    /// record carrying `contractId`.
    fn decode(&self, payload: &[u8]) -> BridgeResult<AuditEvent>;
}
