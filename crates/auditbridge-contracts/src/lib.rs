//! # auditbridge-contracts
//!
//! Shared types, envelopes, and error contracts for the audit event ledger
//! bridge.
//!
//! All crates in the workspace import from here. No business logic lives in
//! this crate: only data definitions, small predicates, and error types.

pub mod commit;
pub mod error;
pub mod event;
pub mod identity;
pub mod transaction;
