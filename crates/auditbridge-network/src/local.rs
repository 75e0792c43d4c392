//! An in-process ledger network: endorsing peers, an ordering service with
//! a single committer, and an event hub.
//!
//! Peers simulate proposals against the shared `WorldState` through the
//! chaincode and return the captured write set. The committer validates each
//! ordered transaction, applies valid write sets, appends a block, and
//! announces the validation code on the event hub.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use auditbridge_chaincode::{Chaincode, ChaincodeStub, WorldState};
use auditbridge_contracts::{
    commit::VALID_CODE,
    error::{BridgeError, BridgeResult},
    identity::SigningIdentity,
    transaction::{ProposalResponse, TransactionEnvelope, TransactionId, TransactionProposal},
};

use crate::connection::ChannelConnection;
use crate::ledger::BlockLedger;
use crate::transport::{Endorser, EventHub, HubMessage, HubStream, Orderer};

/// No endorsement succeeded, or endorsers disagree on the write set.
pub const ENDORSEMENT_POLICY_FAILURE: &str = "ENDORSEMENT_POLICY_FAILURE";

/// The transaction identifier was already used by a committed transaction.
pub const DUPLICATE_TXID: &str = "DUPLICATE_TXID";

const HUB_CAPACITY: usize = 1024;

/// Addresses and behaviour of a local network.
#[derive(Debug, Clone)]
pub struct LocalNetworkConfig {
    pub channel: String,
    pub chaincode_id: String,
    pub peers: Vec<String>,
    pub orderer: String,
    pub event_hub: String,
    /// Delay between ordering a transaction and committing it.
    pub commit_delay: Duration,
}

impl Default for LocalNetworkConfig {
    fn default() -> Self {
        Self {
            channel: "mychannel".to_string(),
            chaincode_id: "clause".to_string(),
            peers: vec!["grpc://localhost:7051".to_string()],
            orderer: "grpc://localhost:7050".to_string(),
            event_hub: "grpc://localhost:7053".to_string(),
            commit_delay: Duration::ZERO,
        }
    }
}

// ── Peer ──────────────────────────────────────────────────────────────────────

/// An endorsing peer with one installed chaincode.
pub struct LocalPeer {
    address: String,
    chaincode_id: String,
    chaincode: Arc<dyn Chaincode>,
    state: WorldState,
    reachable: AtomicBool,
}

impl LocalPeer {
    /// Take the peer offline or bring it back.
    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }
}

#[async_trait]
impl Endorser for LocalPeer {
    fn address(&self) -> &str {
        &self.address
    }

    async fn process_proposal(
        &self,
        proposal: &TransactionProposal,
        creator: &SigningIdentity,
    ) -> BridgeResult<ProposalResponse> {
        if !self.reachable.load(Ordering::SeqCst) {
            return Err(BridgeError::Network {
                reason: format!("peer {} is unreachable", self.address),
            });
        }
        debug!(
            peer = %self.address,
            tx_id = %proposal.tx_id,
            creator = %creator.msp_id,
            function = %proposal.function,
            "simulating proposal"
        );

        if proposal.chaincode_id != self.chaincode_id {
            return Ok(ProposalResponse {
                peer: self.address.clone(),
                status: auditbridge_chaincode::response::ERROR,
                message: format!("chaincode {} is not installed on this peer", proposal.chaincode_id),
                payload: Vec::new(),
                write_set: Vec::new(),
            });
        }

        let mut stub = ChaincodeStub::new(
            proposal.tx_id.clone(),
            proposal.function.clone(),
            proposal.args.clone(),
            self.state.clone(),
        );
        let response = self.chaincode.invoke(&mut stub);
        let write_set = if response.is_success() {
            stub.into_write_set()
        } else {
            Vec::new()
        };

        Ok(ProposalResponse {
            peer: self.address.clone(),
            status: response.status,
            message: response.message,
            payload: response.payload,
            write_set,
        })
    }
}

// ── Orderer ───────────────────────────────────────────────────────────────────

/// Ordering service front end; hands transactions to the committer.
pub struct LocalOrderer {
    address: String,
    queue: mpsc::UnboundedSender<TransactionEnvelope>,
    available: AtomicBool,
}

impl LocalOrderer {
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }
}

#[async_trait]
impl Orderer for LocalOrderer {
    fn address(&self) -> &str {
        &self.address
    }

    async fn broadcast(&self, envelope: TransactionEnvelope) -> BridgeResult<()> {
        if !self.available.load(Ordering::SeqCst) {
            return Err(BridgeError::Network {
                reason: format!("orderer {} is unavailable", self.address),
            });
        }
        self.queue.send(envelope).map_err(|_| BridgeError::Network {
            reason: format!("orderer {} stopped accepting transactions", self.address),
        })
    }
}

// ── Event hub ─────────────────────────────────────────────────────────────────

/// Broadcasts validation codes to every connected subscriber.
pub struct LocalEventHub {
    address: String,
    sender: broadcast::Sender<HubMessage>,
    online: AtomicBool,
}

impl LocalEventHub {
    /// Tell every subscriber the hub is going away.
    pub fn disconnect(&self, reason: &str) {
        self.online.store(false, Ordering::SeqCst);
        // No subscribers is not an error here.
        let _ = self.sender.send(HubMessage::Disconnected {
            reason: reason.to_string(),
        });
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

impl EventHub for LocalEventHub {
    fn address(&self) -> &str {
        &self.address
    }

    fn connect(&self) -> BridgeResult<HubStream> {
        if !self.online.load(Ordering::SeqCst) {
            return Err(BridgeError::Connection {
                reason: format!("event hub {} is not accepting connections", self.address),
            });
        }
        Ok(self.sender.subscribe())
    }
}

// ── Network ───────────────────────────────────────────────────────────────────

/// A running local network. Dropping it stops the committer.
pub struct LocalNetwork {
    config: LocalNetworkConfig,
    state: WorldState,
    ledger: BlockLedger,
    peers: Vec<Arc<LocalPeer>>,
    orderer: Arc<LocalOrderer>,
    hub: Arc<LocalEventHub>,
    committer: JoinHandle<()>,
}

impl LocalNetwork {
    /// Instantiate `chaincode` on every configured peer and start the
    /// committer. Must be called from within a Tokio runtime.
    pub fn start(config: LocalNetworkConfig, chaincode: Arc<dyn Chaincode>) -> Self {
        let state = WorldState::new();
        let ledger = BlockLedger::new();

        let mut init_stub = ChaincodeStub::new(
            TransactionId("instantiate".to_string()),
            "",
            Vec::new(),
            state.clone(),
        );
        let init = chaincode.init(&mut init_stub);
        info!(chaincode_id = %config.chaincode_id, status = init.status, "instantiated chaincode");

        let peers = config
            .peers
            .iter()
            .map(|address| {
                Arc::new(LocalPeer {
                    address: address.clone(),
                    chaincode_id: config.chaincode_id.clone(),
                    chaincode: Arc::clone(&chaincode),
                    state: state.clone(),
                    reachable: AtomicBool::new(true),
                })
            })
            .collect();

        let (hub_sender, _) = broadcast::channel(HUB_CAPACITY);
        let hub = Arc::new(LocalEventHub {
            address: config.event_hub.clone(),
            sender: hub_sender.clone(),
            online: AtomicBool::new(true),
        });

        let (queue, ordered) = mpsc::unbounded_channel();
        let orderer = Arc::new(LocalOrderer {
            address: config.orderer.clone(),
            queue,
            available: AtomicBool::new(true),
        });

        let committer = tokio::spawn(run_committer(
            ordered,
            state.clone(),
            ledger.clone(),
            hub_sender,
            config.commit_delay,
        ));

        info!(
            channel = %config.channel,
            peers = config.peers.len(),
            orderer = %config.orderer,
            event_hub = %config.event_hub,
            "local ledger network started"
        );

        Self {
            config,
            state,
            ledger,
            peers,
            orderer,
            hub,
            committer,
        }
    }

    /// Connect to this network's channel as `identity`.
    pub async fn connect(&self, identity: SigningIdentity) -> BridgeResult<ChannelConnection> {
        ChannelConnection::connect(
            self.config.channel.clone(),
            identity,
            self.endorsers(),
            self.orderer(),
            self.hub.as_ref(),
        )
        .await
    }

    pub fn endorsers(&self) -> Vec<Arc<dyn Endorser>> {
        self.peers
            .iter()
            .map(|peer| Arc::clone(peer) as Arc<dyn Endorser>)
            .collect()
    }

    pub fn orderer(&self) -> Arc<dyn Orderer> {
        Arc::clone(&self.orderer) as Arc<dyn Orderer>
    }

    pub fn local_orderer(&self) -> &LocalOrderer {
        &self.orderer
    }

    pub fn peer(&self, index: usize) -> Option<&LocalPeer> {
        self.peers.get(index).map(|p| p.as_ref())
    }

    pub fn event_hub(&self) -> &LocalEventHub {
        &self.hub
    }

    pub fn state(&self) -> &WorldState {
        &self.state
    }

    pub fn ledger(&self) -> &BlockLedger {
        &self.ledger
    }

    pub fn config(&self) -> &LocalNetworkConfig {
        &self.config
    }
}

impl Drop for LocalNetwork {
    fn drop(&mut self) {
        self.committer.abort();
    }
}

/// Assign a validation code to an ordered transaction.
pub fn validate(state: &WorldState, envelope: &TransactionEnvelope) -> &'static str {
    if state.has_committed(envelope.tx_id()) {
        return DUPLICATE_TXID;
    }

    let endorsements: Vec<&ProposalResponse> =
        envelope.endorsements.iter().filter(|r| r.is_success()).collect();
    if endorsements.is_empty() {
        return ENDORSEMENT_POLICY_FAILURE;
    }
    if endorsements.windows(2).any(|pair| pair[0].write_set != pair[1].write_set) {
        return ENDORSEMENT_POLICY_FAILURE;
    }

    VALID_CODE
}

async fn run_committer(
    mut ordered: mpsc::UnboundedReceiver<TransactionEnvelope>,
    state: WorldState,
    ledger: BlockLedger,
    hub: broadcast::Sender<HubMessage>,
    commit_delay: Duration,
) {
    while let Some(envelope) = ordered.recv().await {
        if !commit_delay.is_zero() {
            tokio::time::sleep(commit_delay).await;
        }

        let code = validate(&state, &envelope);
        let tx_id = envelope.tx_id().clone();

        if code == VALID_CODE {
            let writes = envelope
                .endorsements
                .iter()
                .find(|r| r.is_success())
                .map(|r| r.write_set.as_slice())
                .unwrap_or_default();
            state.apply(&tx_id, writes);
        } else if code != DUPLICATE_TXID {
            state.record_invalid(&tx_id);
        }

        let block = ledger.append(&envelope, code);
        if code == VALID_CODE {
            info!(block = block.number, tx_id = %tx_id, "committed transaction");
        } else {
            warn!(block = block.number, tx_id = %tx_id, code, "transaction failed validation");
        }

        // A hub with no subscribers drops the message.
        let _ = hub.send(HubMessage::TxStatus {
            tx_id,
            code: code.to_string(),
        });
    }
}
