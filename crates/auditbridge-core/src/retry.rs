//! Optional retry layer on top of the single-attempt submitter.
//!
//! The submitter itself never retries. A `RetryPolicy` re-enters
//! `submit_event` for retryable errors only, so every attempt obtains a new
//! transaction identifier. The default policy is a single attempt.

use std::time::Duration;

use tracing::warn;

use auditbridge_contracts::{commit::SubmissionReceipt, error::BridgeResult};

use crate::submitter::TransactionSubmitter;

/// Upper bound on the wait between two attempts.
pub const MAX_BACKOFF: Duration = Duration::from_secs(300);

/// How many times to attempt one event, and how long to wait in between.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, the first included. Never less than 1.
    pub max_attempts: u32,
    /// Wait before attempt `n + 1` is `backoff * n`, capped at `MAX_BACKOFF`.
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, backoff: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            backoff,
        }
    }

    /// One attempt, no retries.
    pub fn fail_fast() -> Self {
        Self::new(1, Duration::ZERO)
    }

    /// Wait after failed attempt `attempt` before the next one.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        self.backoff
            .checked_mul(attempt)
            .unwrap_or(MAX_BACKOFF)
            .min(MAX_BACKOFF)
    }

    /// Decode `payload` once, then submit it under this policy.
    ///
    /// Decode failures are returned immediately. `ProposalRejected` and
    /// `Network` errors are retried until attempts run out; the last error is
    /// returned. Any resolved outcome, `Timeout` included, ends the loop since
    /// the transaction may still commit.
    pub async fn submit(
        &self,
        submitter: &TransactionSubmitter,
        payload: &[u8],
    ) -> BridgeResult<SubmissionReceipt> {
        let event = submitter.decode(payload)?;

        let mut attempt = 1;
        loop {
            match submitter.submit_event(&event).await {
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let delay = self.delay_after(attempt);
                    warn!(
                        contract_id = %event.contract_id(),
                        attempt,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %e,
                        "submission failed, retrying with a fresh transaction id"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                result => return result,
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::fail_fast()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use auditbridge_contracts::{commit::CommitOutcome, error::BridgeError};

    use crate::mock::{JsonDecoder, MockConnection, PeerBehaviour};
    use crate::submitter::{SubmitterSettings, TransactionSubmitter};

    use super::{RetryPolicy, MAX_BACKOFF};

    fn submitter(connection: &Arc<MockConnection>) -> TransactionSubmitter {
        TransactionSubmitter::new(
            connection.clone(),
            Arc::new(JsonDecoder),
            SubmitterSettings {
                commit_timeout: Duration::from_millis(50),
                send_timeout: Duration::from_millis(200),
                ..SubmitterSettings::default()
            },
        )
    }

    const EVENT: &[u8] = br#"{"contractId":"C1"}"#;

    #[test]
    fn zero_attempts_is_clamped_to_one() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
        assert_eq!(RetryPolicy::default(), RetryPolicy::fail_fast());
    }

    #[test]
    fn backoff_grows_linearly_and_saturates() {
        let policy = RetryPolicy::new(4, Duration::from_millis(100));
        assert_eq!(policy.delay_after(1), Duration::from_millis(100));
        assert_eq!(policy.delay_after(3), Duration::from_millis(300));

        let huge = RetryPolicy::new(4, Duration::MAX);
        assert_eq!(huge.delay_after(2), MAX_BACKOFF);
        assert_eq!(RetryPolicy::new(u32::MAX, Duration::from_secs(1)).delay_after(u32::MAX), MAX_BACKOFF);
    }

    #[tokio::test]
    async fn fail_fast_makes_a_single_attempt() {
        let connection = Arc::new(MockConnection::auto_commit("VALID"));
        connection.set_peers(PeerBehaviour::Unreachable);

        let err = RetryPolicy::fail_fast()
            .submit(&submitter(&connection), EVENT)
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Network { .. }));
        assert_eq!(connection.proposals_sent(), 1);
    }

    #[tokio::test]
    async fn retries_rejections_with_fresh_transaction_ids() {
        let connection = Arc::new(MockConnection::auto_commit("VALID"));
        connection.set_peers(PeerBehaviour::Reject {
            status: 500,
            message: "simulation failed".to_string(),
        });

        let err = RetryPolicy::new(3, Duration::from_millis(1))
            .submit(&submitter(&connection), EVENT)
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::ProposalRejected { .. }));
        assert_eq!(connection.proposals_sent(), 3);
        assert_eq!(connection.last_proposal().unwrap().tx_id.as_str(), "tx-3");
    }

    #[tokio::test]
    async fn decode_errors_are_not_retried() {
        let connection = Arc::new(MockConnection::auto_commit("VALID"));

        let err = RetryPolicy::new(5, Duration::from_millis(1))
            .submit(&submitter(&connection), b"garbage")
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Decode { .. }));
        assert_eq!(connection.proposals_sent(), 0);
    }

    #[tokio::test]
    async fn timeout_is_not_retried() {
        let connection = Arc::new(MockConnection::manual());

        let receipt = RetryPolicy::new(3, Duration::from_millis(1))
            .submit(&submitter(&connection), EVENT)
            .await
            .unwrap();
        assert_eq!(receipt.outcome, CommitOutcome::Timeout);
        assert_eq!(connection.proposals_sent(), 1);
    }
}
