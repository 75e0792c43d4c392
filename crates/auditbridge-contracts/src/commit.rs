//! Commit notification and terminal outcome types.
//!
//! `CommitNotification` is what the event hub delivers for one transaction
//! identifier. `CommitOutcome` is what the submitter resolves to, produced
//! exactly once per identifier either from a notification or from a timeout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::transaction::TransactionId;

/// Validation code the ledger reports for a committed transaction.
pub const VALID_CODE: &str = "VALID";

/// An asynchronous report about one transaction identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitNotification {
    /// The ledger validated the transaction with `code` on `peer`.
    Status { code: String, peer: String },

    /// The notification channel itself failed before a status arrived.
    ///
    /// The transaction's fate is unknown; this is never read as "not committed".
    ChannelError { reason: String },
}

/// The terminal result of one submission attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommitOutcome {
    /// Committed with code `VALID`.
    Valid,
    /// Ordered but rejected at validation with the given code.
    Invalid { code: String },
    /// No notification within the configured wait.
    Timeout,
    /// The notification channel failed while waiting.
    Error { reason: String },
}

impl CommitOutcome {
    /// Map a notification onto the outcome it resolves.
    pub fn from_notification(notification: CommitNotification) -> Self {
        match notification {
            CommitNotification::Status { code, .. } if code == VALID_CODE => CommitOutcome::Valid,
            CommitNotification::Status { code, .. } => CommitOutcome::Invalid { code },
            CommitNotification::ChannelError { reason } => CommitOutcome::Error { reason },
        }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, CommitOutcome::Valid)
    }

    /// Short stable label for logs and reports.
    pub fn label(&self) -> &'static str {
        match self {
            CommitOutcome::Valid => "valid",
            CommitOutcome::Invalid { .. } => "invalid",
            CommitOutcome::Timeout => "timeout",
            CommitOutcome::Error { .. } => "error",
        }
    }
}

/// Everything known about one submission once it reached a terminal outcome.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionReceipt {
    pub tx_id: TransactionId,
    pub contract_id: String,
    pub outcome: CommitOutcome,
    pub submitted_at: DateTime<Utc>,
    pub resolved_at: DateTime<Utc>,
}
