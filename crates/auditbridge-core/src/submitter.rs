//! The transaction submitter: the propose → validate → submit → await-commit
//! protocol for one audit event.
//!
//!   Decode → TxId → Proposal → Peers → Validate → Listen → Orderer → Commit
//!
//! A commit listener is always registered before the transaction reaches the
//! orderer, and always unregistered exactly once after the submission
//! resolves, whichever branch resolved it.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, info, warn};

use auditbridge_contracts::{
    commit::{CommitNotification, CommitOutcome, SubmissionReceipt, VALID_CODE},
    error::{BridgeError, BridgeResult},
    event::AuditEvent,
    transaction::{TransactionEnvelope, TransactionId, TransactionProposal},
};

use crate::traits::{EventDecoder, LedgerConnection};

/// Parameters fixed for the lifetime of a submitter.
#[derive(Debug, Clone)]
pub struct SubmitterSettings {
    /// Channel the chaincode is deployed on.
    pub channel: String,
    /// Chaincode that receives `storeAuditEvent`.
    pub chaincode_id: String,
    /// How long to wait for a commit notification before resolving `Timeout`.
    pub commit_timeout: Duration,
    /// Deadline for each proposal round-trip and orderer hand-off.
    pub send_timeout: Duration,
}

impl Default for SubmitterSettings {
    fn default() -> Self {
        Self {
            channel: "mychannel".to_string(),
            chaincode_id: "clause".to_string(),
            commit_timeout: Duration::from_secs(30),
            send_timeout: Duration::from_secs(10),
        }
    }
}

/// Drives one submission per call against a shared ledger connection.
///
/// The submitter holds no per-submission state, so one instance serves any
/// number of concurrent `submit` calls.
pub struct TransactionSubmitter {
    connection: Arc<dyn LedgerConnection>,
    decoder: Arc<dyn EventDecoder>,
    settings: SubmitterSettings,
}

impl TransactionSubmitter {
    pub fn new(
        connection: Arc<dyn LedgerConnection>,
        decoder: Arc<dyn EventDecoder>,
        settings: SubmitterSettings,
    ) -> Self {
        Self {
            connection,
            decoder,
            settings,
        }
    }

    pub fn settings(&self) -> &SubmitterSettings {
        &self.settings
    }

    /// Decode `payload` and submit it.
    ///
    /// # Errors
    ///
    /// `Decode` if the payload is not a record with `contractId`, plus every
    /// error `submit_event` can return. `Timeout` and commit-channel failures
    /// are outcomes, not errors.
    pub async fn submit(&self, payload: &[u8]) -> BridgeResult<SubmissionReceipt> {
        let event = self.decode(payload)?;
        self.submit_event(&event).await
    }

    /// Decode one raw payload, logging rejected payloads.
    pub fn decode(&self, payload: &[u8]) -> BridgeResult<AuditEvent> {
        self.decoder.decode(payload).map_err(|e| {
            warn!(error = %e, bytes = payload.len(), "dropping undecodable event");
            e
        })
    }

    /// Run the full protocol for an already-decoded event.
    ///
    /// # Pipeline
    ///
    /// 1. Generate a fresh transaction id
    /// 2. Build the `storeAuditEvent` proposal
    /// 3. Send it to every peer
    /// 4. Require at least one status-200 response, else `ProposalRejected`
    /// 5. Register the commit listener
    /// 6. Send the assembled transaction to the orderer
    /// 7. Await the commit notification, bounded by `commit_timeout`
    /// 8. Unregister the listener
    ///
    /// No step is retried here; see `RetryPolicy`.
    pub async fn submit_event(&self, event: &AuditEvent) -> BridgeResult<SubmissionReceipt> {
        let submitted_at = Utc::now();
        let contract_id = event.contract_id();

        // ── Steps 1 & 2: identify and build ──────────────────────────────────
        let tx_id = self.connection.new_transaction_id();
        debug!(tx_id = %tx_id, contract_id = %contract_id, "assigned transaction id");

        let proposal = TransactionProposal::store_audit_event(
            tx_id.clone(),
            &self.settings.channel,
            &self.settings.chaincode_id,
            event,
        );

        // ── Step 3: endorsement round-trip ───────────────────────────────────
        let responses = self
            .bounded("transaction proposal", self.connection.send_proposal(&proposal))
            .await
            .map_err(|e| {
                warn!(tx_id = %tx_id, contract_id = %contract_id, error = %e, "failed to send proposal");
                e
            })?;

        // ── Step 4: proposal validation ──────────────────────────────────────
        if !responses.is_good() {
            let (status, message) = responses
                .first()
                .map(|r| (r.status, r.message.clone()))
                .unwrap_or_else(|| (0, "no proposal responses received".to_string()));

            warn!(
                tx_id = %tx_id,
                contract_id = %contract_id,
                status,
                message = %message,
                responses = responses.len(),
                "transaction proposal was bad"
            );
            return Err(BridgeError::ProposalRejected {
                tx_id: tx_id.to_string(),
                status,
                message,
            });
        }

        if let Some(endorsement) = responses.first_success() {
            info!(
                tx_id = %tx_id,
                contract_id = %contract_id,
                status = endorsement.status,
                message = %endorsement.message,
                payload = %String::from_utf8_lossy(&endorsement.payload),
                "transaction proposal was good"
            );
        }

        // ── Step 5: listen before ordering ───────────────────────────────────
        //
        // The listener must exist before the orderer sees the transaction,
        // otherwise a fast commit could be announced to nobody.
        let waiter = self.connection.on_commit(&tx_id).map_err(|e| {
            warn!(tx_id = %tx_id, contract_id = %contract_id, error = %e, "failed to register commit listener");
            e
        })?;
        let listener = ListenerGuard {
            connection: self.connection.as_ref(),
            tx_id: &tx_id,
        };

        // ── Step 6: orderer hand-off ─────────────────────────────────────────
        let envelope = TransactionEnvelope::assemble(proposal, responses);
        self.bounded("transaction broadcast", self.connection.send_transaction(&envelope))
            .await
            .map_err(|e| {
                warn!(tx_id = %tx_id, contract_id = %contract_id, error = %e, "failed to send transaction to orderer");
                e
            })?;
        debug!(tx_id = %tx_id, "transaction handed to orderer, awaiting commit");

        // ── Step 7: commit wait ──────────────────────────────────────────────
        let outcome = match tokio::time::timeout(self.settings.commit_timeout, waiter).await {
            Ok(Ok(notification)) => {
                if let CommitNotification::Status { code, peer } = &notification {
                    if code == VALID_CODE {
                        info!(tx_id = %tx_id, contract_id = %contract_id, peer = %peer, "transaction committed");
                    } else {
                        warn!(tx_id = %tx_id, contract_id = %contract_id, code = %code, "transaction was invalid");
                    }
                }
                CommitOutcome::from_notification(notification)
            }
            Ok(Err(_)) => CommitOutcome::Error {
                reason: "commit listener closed before a notification arrived".to_string(),
            },
            Err(_) => {
                warn!(
                    tx_id = %tx_id,
                    contract_id = %contract_id,
                    timeout_secs = self.settings.commit_timeout.as_secs_f64(),
                    "no commit notification within timeout; transaction fate unknown"
                );
                CommitOutcome::Timeout
            }
        };

        if let CommitOutcome::Error { reason } = &outcome {
            warn!(tx_id = %tx_id, contract_id = %contract_id, reason = %reason, "commit notification channel failed");
        }

        // ── Step 8: release the listener ─────────────────────────────────────
        drop(listener);

        Ok(SubmissionReceipt {
            tx_id,
            contract_id: contract_id.to_string(),
            outcome,
            submitted_at,
            resolved_at: Utc::now(),
        })
    }

    /// Apply `send_timeout` to one network step.
    async fn bounded<T>(
        &self,
        step: &str,
        fut: impl Future<Output = BridgeResult<T>>,
    ) -> BridgeResult<T> {
        match tokio::time::timeout(self.settings.send_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(BridgeError::Network {
                reason: format!(
                    "{} did not complete within {}ms",
                    step,
                    self.settings.send_timeout.as_millis()
                ),
            }),
        }
    }
}

/// Unregisters a commit listener when dropped.
///
/// Covers every exit after registration: resolution, orderer failure, and
/// cancellation of the submission future itself.
struct ListenerGuard<'a> {
    connection: &'a dyn LedgerConnection,
    tx_id: &'a TransactionId,
}

impl Drop for ListenerGuard<'_> {
    fn drop(&mut self) {
        self.connection.off_commit(self.tx_id);
    }
}

// ── Tests ────────────────────────────────────────────────────────────────────
