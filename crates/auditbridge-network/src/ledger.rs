//! Hash-chained block log kept by the local committer.
//!
//! Each committed transaction, valid or not, becomes one block. A block
//! commits to its predecessor through `prev_hash`, so rewriting any block
//! breaks every later link, which `verify_chain` detects.
//!
//! Hash input layout (bytes, in order):
//!   1. number as 8-byte little-endian
//!   2. tx_id as UTF-8 bytes
//!   3. validation_code as UTF-8 bytes
//!   4. data_hash as UTF-8 bytes (64 ASCII hex chars)
//!   5. prev_hash as UTF-8 bytes (64 ASCII hex chars)

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use auditbridge_contracts::transaction::TransactionEnvelope;

/// One ordered, validated transaction.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Block {
    /// Height of the block, starting at 0.
    pub number: u64,
    pub tx_id: String,
    /// Validation code assigned by the committer (e.g. "VALID").
    pub validation_code: String,
    /// SHA-256 (hex) of the transaction content.
    pub data_hash: String,
    /// `this_hash` of the previous block, or `GENESIS_HASH` for block 0.
    pub prev_hash: String,
    pub this_hash: String,
    pub committed_at: DateTime<Utc>,
}

impl Block {
    /// The sentinel `prev_hash` of block 0.
    pub const GENESIS_HASH: &'static str =
        "0000000000000000000000000000000000000000000000000000000000000000";
}

/// Hash the content of a transaction envelope.
///
/// Covers the proposal's identity, target, and arguments plus every
/// endorsement's status and write set.
pub fn hash_envelope(envelope: &TransactionEnvelope) -> String {
    let proposal = &envelope.proposal;
    let mut hasher = Sha256::new();
    hasher.update(proposal.tx_id.as_str().as_bytes());
    hasher.update(proposal.channel.as_bytes());
    hasher.update(proposal.chaincode_id.as_bytes());
    hasher.update(proposal.function.as_bytes());
    for arg in &proposal.args {
        hasher.update((arg.len() as u64).to_le_bytes());
        hasher.update(arg.as_bytes());
    }
    for endorsement in &envelope.endorsements {
        hasher.update(endorsement.peer.as_bytes());
        hasher.update(endorsement.status.to_le_bytes());
        for write in &endorsement.write_set {
            hasher.update(write.key.as_bytes());
            hasher.update(&write.value);
        }
    }
    hex::encode(hasher.finalize())
}

/// Compute the hash of a block from its linked fields.
pub fn hash_block(number: u64, tx_id: &str, validation_code: &str, data_hash: &str, prev_hash: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(number.to_le_bytes());
    hasher.update(tx_id.as_bytes());
    hasher.update(validation_code.as_bytes());
    hasher.update(data_hash.as_bytes());
    hasher.update(prev_hash.as_bytes());
    hex::encode(hasher.finalize())
}

/// Check prev-hash linkage and recompute every block hash.
///
/// An empty chain is valid.
pub fn verify_chain(blocks: &[Block]) -> bool {
    let mut expected_prev = Block::GENESIS_HASH.to_string();

    for (height, block) in blocks.iter().enumerate() {
        if block.number != height as u64 || block.prev_hash != expected_prev {
            return false;
        }
        let recomputed = hash_block(
            block.number,
            &block.tx_id,
            &block.validation_code,
            &block.data_hash,
            &block.prev_hash,
        );
        if block.this_hash != recomputed {
            return false;
        }
        expected_prev = block.this_hash.clone();
    }

    true
}

pub(crate) struct LedgerInner {
    pub(crate) blocks: Vec<Block>,
    pub(crate) last_hash: String,
}

/// Append-only block log shared between the committer and observers.
#[derive(Clone)]
pub struct BlockLedger {
    pub(crate) inner: Arc<Mutex<LedgerInner>>,
}

impl BlockLedger {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(LedgerInner {
                blocks: Vec::new(),
                last_hash: Block::GENESIS_HASH.to_string(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, LedgerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append one block for `envelope` with its validation code.
    pub fn append(&self, envelope: &TransactionEnvelope, validation_code: &str) -> Block {
        let mut inner = self.lock();
        let number = inner.blocks.len() as u64;
        let tx_id = envelope.tx_id().to_string();
        let data_hash = hash_envelope(envelope);
        let prev_hash = inner.last_hash.clone();
        let this_hash = hash_block(number, &tx_id, validation_code, &data_hash, &prev_hash);

        let block = Block {
            number,
            tx_id,
            validation_code: validation_code.to_string(),
            data_hash,
            prev_hash,
            this_hash: this_hash.clone(),
            committed_at: Utc::now(),
        };
        inner.blocks.push(block.clone());
        inner.last_hash = this_hash;
        block
    }

    pub fn height(&self) -> u64 {
        self.lock().blocks.len() as u64
    }

    pub fn blocks(&self) -> Vec<Block> {
        self.lock().blocks.clone()
    }

    pub fn verify_integrity(&self) -> bool {
        verify_chain(&self.lock().blocks)
    }
}

impl Default for BlockLedger {
    fn default() -> Self {
        Self::new()
    }
}
