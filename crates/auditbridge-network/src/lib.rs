//! # auditbridge-network
//!
//! The ledger side of the bridge.
//!
//! - `identity`: load enrolled users from a file key store and derive
//!   transaction identifiers from them
//! - `transport`: the peer, orderer, and event hub seams
//! - `connection`: `ChannelConnection`, the `LedgerConnection` built on
//!   those seams
//! - `ledger`: the hash-chained block log
//! - `local`: an in-process network with endorsing peers, a committer, and
//!   an event hub, for demos and tests

pub mod connection;
pub mod identity;
pub mod ledger;
pub mod local;
pub mod transport;

pub use connection::ChannelConnection;
pub use identity::{derive_transaction_id, new_transaction_id, FileKeyStore};
pub use ledger::{Block, BlockLedger};
pub use local::{
    LocalEventHub, LocalNetwork, LocalNetworkConfig, LocalOrderer, LocalPeer, DUPLICATE_TXID,
    ENDORSEMENT_POLICY_FAILURE,
};
pub use transport::{Endorser, EventHub, HubMessage, HubStream, Orderer};
