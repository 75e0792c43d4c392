//! Test doubles for the core trait seams.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use auditbridge_contracts::{
    commit::CommitNotification,
    error::{BridgeError, BridgeResult},
    event::{AuditEvent, RawEvent},
    transaction::{
        ProposalResponse, ProposalResponseSet, TransactionEnvelope, TransactionId,
        TransactionProposal,
    },
};

use crate::registry::CommitRegistry;
use crate::traits::{CommitWaiter, EventDecoder, EventSource, LedgerConnection};

/// Decodes payloads with no schema beyond the `contractId` requirement.
pub struct JsonDecoder;

impl EventDecoder for JsonDecoder {
    fn decode(&self, payload: &[u8]) -> BridgeResult<AuditEvent> {
        AuditEvent::from_slice(payload)
    }
}

/// How the mock peers answer a proposal.
#[derive(Debug, Clone)]
pub enum PeerBehaviour {
    Endorse,
    Reject { status: i32, message: String },
    Silent,
    Unreachable,
    Hang,
}

/// A ledger connection that records every call and resolves commits either
/// automatically (on orderer hand-off) or when the test says so.
pub struct MockConnection {
    registry: CommitRegistry,
    peers: Mutex<PeerBehaviour>,
    auto_commit_code: Option<String>,
    orderer_fails: AtomicBool,
    next_id: AtomicU64,
    proposals: Mutex<Vec<TransactionProposal>>,
    tx_ids: Mutex<Vec<TransactionId>>,
    calls: Mutex<Vec<String>>,
    registrations: AtomicUsize,
    unregistrations: AtomicUsize,
}

impl MockConnection {
    fn build(auto_commit_code: Option<String>) -> Self {
        Self {
            registry: CommitRegistry::new(),
            peers: Mutex::new(PeerBehaviour::Endorse),
            auto_commit_code,
            orderer_fails: AtomicBool::new(false),
            next_id: AtomicU64::new(1),
            proposals: Mutex::new(vec![]),
            tx_ids: Mutex::new(vec![]),
            calls: Mutex::new(vec![]),
            registrations: AtomicUsize::new(0),
            unregistrations: AtomicUsize::new(0),
        }
    }

    /// Every transaction commits with `code` as soon as the orderer gets it.
    pub fn auto_commit(code: &str) -> Self {
        Self::build(Some(code.to_string()))
    }

    /// Commits only happen through `commit()`.
    pub fn manual() -> Self {
        Self::build(None)
    }

    pub fn set_peers(&self, behaviour: PeerBehaviour) {
        *self.peers.lock().unwrap() = behaviour;
    }

    pub fn fail_orderer(&self) {
        self.orderer_fails.store(true, Ordering::SeqCst);
    }

    pub fn commit(&self, tx_id: &TransactionId, code: &str) -> bool {
        self.registry.notify(
            tx_id,
            CommitNotification::Status {
                code: code.to_string(),
                peer: "mock-peer:7053".to_string(),
            },
        )
    }

    pub fn registry(&self) -> &CommitRegistry {
        &self.registry
    }

    pub fn proposals_sent(&self) -> usize {
        self.proposals.lock().unwrap().len()
    }

    pub fn last_proposal(&self) -> Option<TransactionProposal> {
        self.proposals.lock().unwrap().last().cloned()
    }

    pub fn transactions_sent(&self) -> usize {
        self.tx_ids.lock().unwrap().len()
    }

    pub fn transaction_ids(&self) -> Vec<TransactionId> {
        self.tx_ids.lock().unwrap().clone()
    }

    pub fn registrations(&self) -> usize {
        self.registrations.load(Ordering::SeqCst)
    }

    pub fn unregistrations(&self) -> usize {
        self.unregistrations.load(Ordering::SeqCst)
    }

    pub fn call_log(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    /// Poll until at least `n` transactions have reached the orderer.
    pub async fn wait_for_transactions(&self, n: usize) {
        while self.transactions_sent() < n {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    fn log(&self, call: &str) {
        self.calls.lock().unwrap().push(call.to_string());
    }
}

#[async_trait]
impl LedgerConnection for MockConnection {
    fn new_transaction_id(&self) -> TransactionId {
        TransactionId(format!("tx-{}", self.next_id.fetch_add(1, Ordering::SeqCst)))
    }

    async fn send_proposal(&self, proposal: &TransactionProposal) -> BridgeResult<ProposalResponseSet> {
        self.log("send_proposal");
        self.proposals.lock().unwrap().push(proposal.clone());

        let behaviour = self.peers.lock().unwrap().clone();
        match behaviour {
            PeerBehaviour::Endorse => Ok(ProposalResponseSet::new(vec![ProposalResponse {
                peer: "mock-peer:7051".to_string(),
                status: 200,
                message: "OK".to_string(),
                payload: format!("Saved audit event for {}", proposal.args[0]).into_bytes(),
                write_set: vec![],
            }])),
            PeerBehaviour::Reject { status, message } => {
                Ok(ProposalResponseSet::new(vec![ProposalResponse {
                    peer: "mock-peer:7051".to_string(),
                    status,
                    message,
                    payload: vec![],
                    write_set: vec![],
                }]))
            }
            PeerBehaviour::Silent => Ok(ProposalResponseSet::default()),
            PeerBehaviour::Unreachable => Err(BridgeError::Network {
                reason: "no peer reachable".to_string(),
            }),
            PeerBehaviour::Hang => std::future::pending().await,
        }
    }

    async fn send_transaction(&self, envelope: &TransactionEnvelope) -> BridgeResult<()> {
        self.log("send_transaction");
        if self.orderer_fails.load(Ordering::SeqCst) {
            return Err(BridgeError::Network {
                reason: "orderer unavailable".to_string(),
            });
        }
        self.tx_ids.lock().unwrap().push(envelope.tx_id().clone());

        if let Some(code) = &self.auto_commit_code {
            self.commit(envelope.tx_id(), code);
        }
        Ok(())
    }

    fn on_commit(&self, tx_id: &TransactionId) -> BridgeResult<CommitWaiter> {
        self.log("on_commit");
        let waiter = self.registry.register(tx_id)?;
        self.registrations.fetch_add(1, Ordering::SeqCst);
        Ok(waiter)
    }

    fn off_commit(&self, tx_id: &TransactionId) {
        self.log("off_commit");
        self.unregistrations.fetch_add(1, Ordering::SeqCst);
        self.registry.unregister(tx_id);
    }
}

/// A finite in-memory source delivering fixed payloads in order.
pub struct VecSource {
    events: VecDeque<Vec<u8>>,
    offset: u64,
}

impl VecSource {
    pub fn new(payloads: &[&str]) -> Self {
        Self {
            events: payloads.iter().map(|p| p.as_bytes().to_vec()).collect(),
            offset: 0,
        }
    }
}

#[async_trait]
impl EventSource for VecSource {
    fn topic(&self) -> &str {
        "audit-events"
    }

    fn group_id(&self) -> &str {
        "test-group"
    }

    async fn next_event(&mut self) -> Option<RawEvent> {
        let payload = self.events.pop_front()?;
        let offset = self.offset;
        self.offset += 1;
        Some(RawEvent::new("audit-events", offset, payload))
    }
}
