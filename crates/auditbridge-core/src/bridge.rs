//! The bridge: event source consumption fanned out into concurrent
//! submissions.
//!
//! One loop reads the source; every event becomes its own task, so a slow
//! commit for event N never holds back the proposal for event N+1. Outcomes
//! arrive in whatever order the ledger commits them. A failed submission is
//! logged and counted, and the loop moves on.

use std::sync::Arc;

use serde::Serialize;
use tokio::task::{JoinError, JoinSet};
use tracing::{debug, error, info, warn};

use auditbridge_contracts::{
    commit::{CommitOutcome, SubmissionReceipt},
    error::BridgeResult,
};

use crate::retry::RetryPolicy;
use crate::submitter::TransactionSubmitter;
use crate::traits::EventSource;

/// Tally of what happened to every event the bridge received.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BridgeReport {
    pub received: u64,
    pub valid: u64,
    pub invalid: u64,
    pub timeouts: u64,
    pub channel_errors: u64,
    /// Submissions that ended in an error (decode, rejection, network).
    pub failed: u64,
}

impl BridgeReport {
    /// Number of events that reached a terminal state of any kind.
    pub fn resolved(&self) -> u64 {
        self.valid + self.invalid + self.timeouts + self.channel_errors + self.failed
    }

    fn record_outcome(&mut self, outcome: &CommitOutcome) {
        match outcome {
            CommitOutcome::Valid => self.valid += 1,
            CommitOutcome::Invalid { .. } => self.invalid += 1,
            CommitOutcome::Timeout => self.timeouts += 1,
            CommitOutcome::Error { .. } => self.channel_errors += 1,
        }
    }
}

type TaskResult = (u64, BridgeResult<SubmissionReceipt>);

/// Wires an event source to a transaction submitter.
pub struct Bridge {
    submitter: Arc<TransactionSubmitter>,
    retry: RetryPolicy,
}

impl Bridge {
    pub fn new(submitter: Arc<TransactionSubmitter>, retry: RetryPolicy) -> Self {
        Self { submitter, retry }
    }

    /// Consume `source` until it is exhausted, then wait for every
    /// in-flight submission and return the tally.
    pub async fn run<S>(&self, source: &mut S) -> BridgeReport
    where
        S: EventSource + ?Sized,
    {
        info!(
            topic = %source.topic(),
            group_id = %source.group_id(),
            max_attempts = self.retry.max_attempts,
            "bridge subscribed"
        );

        let mut report = BridgeReport::default();
        let mut in_flight: JoinSet<TaskResult> = JoinSet::new();

        while let Some(event) = source.next_event().await {
            report.received += 1;
            debug!(topic = %event.topic, offset = event.offset, "received event");

            let submitter = Arc::clone(&self.submitter);
            let retry = self.retry.clone();
            in_flight.spawn(async move {
                let result = retry.submit(&submitter, &event.payload).await;
                (event.offset, result)
            });

            // Reap whatever finished meanwhile so the set does not grow unbounded.
            while let Some(done) = in_flight.try_join_next() {
                Self::record(&mut report, done);
            }
        }

        info!(
            in_flight = in_flight.len(),
            received = report.received,
            "event source exhausted, draining in-flight submissions"
        );
        while let Some(done) = in_flight.join_next().await {
            Self::record(&mut report, done);
        }

        info!(
            received = report.received,
            valid = report.valid,
            invalid = report.invalid,
            timeouts = report.timeouts,
            channel_errors = report.channel_errors,
            failed = report.failed,
            "bridge drained"
        );
        report
    }

    fn record(report: &mut BridgeReport, done: Result<TaskResult, JoinError>) {
        match done {
            Ok((offset, Ok(receipt))) => {
                debug!(
                    offset,
                    tx_id = %receipt.tx_id,
                    contract_id = %receipt.contract_id,
                    outcome = receipt.outcome.label(),
                    "submission resolved"
                );
                report.record_outcome(&receipt.outcome);
            }
            Ok((offset, Err(e))) => {
                warn!(offset, error = %e, "submission failed; continuing with next event");
                report.failed += 1;
            }
            Err(e) => {
                error!(error = %e, "submission task aborted");
                report.failed += 1;
            }
        }
    }
}
