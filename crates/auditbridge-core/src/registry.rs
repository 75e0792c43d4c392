//! Commit listener registry.
//!
//! Maps transaction identifiers to the one-shot channel of the submission
//! waiting on them. The event hub side calls `notify()` as notifications
//! arrive; the submission side calls `register()` before handing the
//! transaction to the orderer and `unregister()` once it has resolved.
//!
//! Flow:
//! 1. Submitter calls `register()` and keeps the receiver
//! 2. Submitter sends the transaction to the orderer
//! 3. Event pump receives a notification and calls `notify()`
//! 4. Submitter awaits the receiver or times out, then calls `unregister()`

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::oneshot;
use tracing::debug;

use auditbridge_contracts::{
    commit::CommitNotification,
    error::{BridgeError, BridgeResult},
    transaction::TransactionId,
};

use crate::traits::CommitWaiter;

/// Counters describing registry traffic.
#[derive(Debug, Default)]
pub struct RegistryStats {
    /// Listeners registered.
    pub registered: AtomicU64,
    /// Listeners resolved by a notification.
    pub resolved: AtomicU64,
    /// Listeners removed without a notification (timeout or abandoned).
    pub unregistered: AtomicU64,
    /// Notifications for identifiers nobody was waiting on.
    pub ignored: AtomicU64,
}

/// Concurrency-safe table of pending commit listeners.
///
/// Distinct identifiers never contend with each other beyond the shard
/// locks of the underlying map.
#[derive(Debug, Default)]
pub struct CommitRegistry {
    waiters: DashMap<TransactionId, oneshot::Sender<CommitNotification>>,
    /// Set once the notification channel has failed for good.
    closed: Mutex<Option<String>>,
    stats: RegistryStats,
}

impl CommitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the listener for `tx_id` and return its receiver.
    ///
    /// If the notification channel has already failed, the receiver is
    /// resolved with `ChannelError` immediately.
    pub fn register(&self, tx_id: &TransactionId) -> BridgeResult<CommitWaiter> {
        let closed = self.closed.lock().unwrap_or_else(PoisonError::into_inner);
        let (tx, rx) = oneshot::channel();

        if let Some(reason) = closed.as_ref() {
            // Receiver is still held, so this send cannot fail.
            let _ = tx.send(CommitNotification::ChannelError {
                reason: reason.clone(),
            });
            return Ok(rx);
        }

        match self.waiters.entry(tx_id.clone()) {
            Entry::Occupied(_) => Err(BridgeError::CommitListener {
                reason: format!("a listener is already registered for transaction {}", tx_id),
            }),
            Entry::Vacant(slot) => {
                slot.insert(tx);
                self.stats.registered.fetch_add(1, Ordering::Relaxed);
                debug!(tx_id = %tx_id, "registered commit listener");
                Ok(rx)
            }
        }
    }

    /// Remove the listener for `tx_id`.
    ///
    /// Returns true if a listener was still pending. Calling this for an
    /// identifier that was already resolved is a no-op.
    pub fn unregister(&self, tx_id: &TransactionId) -> bool {
        let removed = self.waiters.remove(tx_id).is_some();
        if removed {
            self.stats.unregistered.fetch_add(1, Ordering::Relaxed);
            debug!(tx_id = %tx_id, "unregistered pending commit listener");
        }
        removed
    }

    /// Deliver `notification` to the listener for `tx_id`.
    ///
    /// Returns true if a waiting submission received it. Notifications for
    /// unknown or already-resolved identifiers are ignored.
    pub fn notify(&self, tx_id: &TransactionId, notification: CommitNotification) -> bool {
        let Some((_, sender)) = self.waiters.remove(tx_id) else {
            self.stats.ignored.fetch_add(1, Ordering::Relaxed);
            debug!(tx_id = %tx_id, "commit notification for unknown transaction ignored");
            return false;
        };

        match sender.send(notification) {
            Ok(()) => {
                self.stats.resolved.fetch_add(1, Ordering::Relaxed);
                true
            }
            Err(_) => {
                // The submission gave up between remove() and send().
                self.stats.ignored.fetch_add(1, Ordering::Relaxed);
                debug!(tx_id = %tx_id, "commit listener dropped before notification");
                false
            }
        }
    }

    /// Resolve every pending listener with `ChannelError` and refuse to wait
    /// on anything further.
    ///
    /// Returns the number of listeners that were failed.
    pub fn fail_all(&self, reason: &str) -> usize {
        let mut closed = self.closed.lock().unwrap_or_else(PoisonError::into_inner);
        *closed = Some(reason.to_string());

        let pending: Vec<TransactionId> = self.waiters.iter().map(|e| e.key().clone()).collect();
        let mut failed = 0;
        for tx_id in pending {
            let notification = CommitNotification::ChannelError {
                reason: reason.to_string(),
            };
            if self.notify(&tx_id, notification) {
                failed += 1;
            }
        }
        failed
    }

    /// Number of listeners currently waiting.
    pub fn pending_count(&self) -> usize {
        self.waiters.len()
    }

    pub fn is_registered(&self, tx_id: &TransactionId) -> bool {
        self.waiters.contains_key(tx_id)
    }

    pub fn stats(&self) -> &RegistryStats {
        &self.stats
    }
}
