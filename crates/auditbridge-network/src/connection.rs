//! `ChannelConnection`: the `LedgerConnection` over a set of peers, one
//! orderer, and one event hub, all under a single logical channel.
//!
//! Connecting spawns an event pump that reads the hub stream and resolves
//! listeners in the shared `CommitRegistry`. If the hub stream fails, every
//! pending and future listener resolves with `ChannelError`.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use auditbridge_contracts::{
    commit::CommitNotification,
    error::{BridgeError, BridgeResult},
    identity::SigningIdentity,
    transaction::{ProposalResponseSet, TransactionEnvelope, TransactionId, TransactionProposal},
};
use auditbridge_core::{registry::CommitRegistry, traits::{CommitWaiter, LedgerConnection}};

use crate::identity::new_transaction_id;
use crate::transport::{Endorser, EventHub, HubMessage, HubStream, Orderer};

/// An authenticated connection to one ledger channel.
pub struct ChannelConnection {
    channel: String,
    identity: SigningIdentity,
    peers: Vec<Arc<dyn Endorser>>,
    orderer: Arc<dyn Orderer>,
    hub_address: String,
    registry: Arc<CommitRegistry>,
    pump: JoinHandle<()>,
}

impl ChannelConnection {
    /// Establish the connection.
    ///
    /// # Errors
    ///
    /// `BridgeError::Connection` if the identity is not enrolled, no peers
    /// are configured, or the event hub refuses the subscription. These are
    /// startup failures; nothing is retried.
    pub async fn connect(
        channel: impl Into<String>,
        identity: SigningIdentity,
        peers: Vec<Arc<dyn Endorser>>,
        orderer: Arc<dyn Orderer>,
        event_hub: &dyn EventHub,
    ) -> BridgeResult<Self> {
        let channel = channel.into();

        if !identity.is_enrolled() {
            return Err(BridgeError::Connection {
                reason: format!("identity {} is not enrolled", identity.name),
            });
        }
        if peers.is_empty() {
            return Err(BridgeError::Connection {
                reason: format!("no peers configured for channel {}", channel),
            });
        }

        let stream = event_hub.connect()?;
        let hub_address = event_hub.address().to_string();
        let registry = Arc::new(CommitRegistry::new());
        let pump = tokio::spawn(pump_commit_events(
            stream,
            Arc::clone(&registry),
            hub_address.clone(),
        ));

        info!(
            channel = %channel,
            user = %identity.name,
            peers = peers.len(),
            orderer = %orderer.address(),
            event_hub = %hub_address,
            "connected to ledger network"
        );

        Ok(Self {
            channel,
            identity,
            peers,
            orderer,
            hub_address,
            registry,
            pump,
        })
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn event_hub_address(&self) -> &str {
        &self.hub_address
    }

    pub fn registry(&self) -> &CommitRegistry {
        &self.registry
    }
}

impl Drop for ChannelConnection {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

#[async_trait]
impl LedgerConnection for ChannelConnection {
    fn new_transaction_id(&self) -> TransactionId {
        new_transaction_id(&self.identity)
    }

    async fn send_proposal(&self, proposal: &TransactionProposal) -> BridgeResult<ProposalResponseSet> {
        debug!(tx_id = %proposal.tx_id, peers = self.peers.len(), "sending transaction proposal");

        let calls = self
            .peers
            .iter()
            .map(|peer| peer.process_proposal(proposal, &self.identity));
        let results = join_all(calls).await;

        let mut responses = Vec::with_capacity(results.len());
        let mut failures = Vec::new();
        for (peer, result) in self.peers.iter().zip(results) {
            match result {
                Ok(response) => responses.push(response),
                Err(e) => {
                    warn!(tx_id = %proposal.tx_id, peer = %peer.address(), error = %e, "peer unreachable");
                    failures.push(format!("{}: {}", peer.address(), e));
                }
            }
        }

        if responses.is_empty() {
            return Err(BridgeError::Network {
                reason: format!("no peer reachable ({})", failures.join("; ")),
            });
        }
        Ok(ProposalResponseSet::new(responses))
    }

    async fn send_transaction(&self, envelope: &TransactionEnvelope) -> BridgeResult<()> {
        debug!(tx_id = %envelope.tx_id(), orderer = %self.orderer.address(), "sending transaction to orderer");
        self.orderer.broadcast(envelope.clone()).await
    }

    fn on_commit(&self, tx_id: &TransactionId) -> BridgeResult<CommitWaiter> {
        self.registry.register(tx_id)
    }

    fn off_commit(&self, tx_id: &TransactionId) {
        self.registry.unregister(tx_id);
    }
}

/// Forward hub messages into the registry until the stream ends.
async fn pump_commit_events(mut stream: HubStream, registry: Arc<CommitRegistry>, hub_address: String) {
    loop {
        match stream.recv().await {
            Ok(HubMessage::TxStatus { tx_id, code }) => {
                debug!(tx_id = %tx_id, code = %code, "commit event received");
                registry.notify(
                    &tx_id,
                    CommitNotification::Status {
                        code,
                        peer: hub_address.clone(),
                    },
                );
            }
            Ok(HubMessage::Disconnected { reason }) => {
                let reason = format!("event hub disconnected: {}", reason);
                let failed = registry.fail_all(&reason);
                warn!(event_hub = %hub_address, failed, "event hub disconnected");
                return;
            }
            Err(RecvError::Lagged(missed)) => {
                // Listeners whose notification was dropped will time out.
                warn!(event_hub = %hub_address, missed, "event hub stream lagged; commit notifications lost");
            }
            Err(RecvError::Closed) => {
                let failed = registry.fail_all("event hub connection closed");
                warn!(event_hub = %hub_address, failed, "event hub stream closed");
                return;
            }
        }
    }
}
