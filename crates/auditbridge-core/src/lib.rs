//! # auditbridge-core
//!
//! The transaction submission pipeline for the audit event ledger bridge.
//!
//! This crate provides:
//! - The trait seams (`LedgerConnection`, `EventSource`, `EventDecoder`)
//! - The `CommitRegistry` that correlates commit notifications with waiting
//!   submissions by transaction identifier
//! - The `TransactionSubmitter` that runs propose → validate → submit →
//!   await-commit for one event
//! - The opt-in `RetryPolicy` layered on top of it
//! - The `Bridge` that fans an event source out into concurrent submissions
//!
//! ## Usage
//!
//! ```rust,ignore
//! use auditbridge_core::{Bridge, RetryPolicy, SubmitterSettings, TransactionSubmitter};
//!
//! let submitter = TransactionSubmitter::new(connection, decoder, SubmitterSettings::default());
//! let report = Bridge::new(Arc::new(submitter), RetryPolicy::fail_fast())
//!     .run(&mut source)
//!     .await;
//! ```

pub mod bridge;
pub mod registry;
pub mod retry;
pub mod submitter;
pub mod traits;

#[cfg(test)]
mod mock;

pub use bridge::{Bridge, BridgeReport};
pub use registry::CommitRegistry;
pub use retry::{RetryPolicy, MAX_BACKOFF};
pub use submitter::{SubmitterSettings, TransactionSubmitter};
