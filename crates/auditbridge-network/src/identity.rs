//! Signing identity loading and transaction identifier derivation.
//!
//! The key store is a directory holding one JSON document per user, named
//! after the user (e.g. `hfc-key-store/user1`). Enrollment itself happens
//! elsewhere; loading fails unless the stored user is enrolled.

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::info;

use auditbridge_contracts::{
    error::{BridgeError, BridgeResult},
    identity::SigningIdentity,
    transaction::TransactionId,
};

/// Directory-backed store of enrolled user credentials.
#[derive(Debug, Clone)]
pub struct FileKeyStore {
    root: PathBuf,
}

impl FileKeyStore {
    /// Open the key store at `root`.
    ///
    /// Returns `BridgeError::Connection` if `root` is not a directory.
    pub fn open(root: impl AsRef<Path>) -> BridgeResult<Self> {
        let root = root.as_ref().to_path_buf();
        if !root.is_dir() {
            return Err(BridgeError::Connection {
                reason: format!("key store '{}' is not a directory", root.display()),
            });
        }
        info!(path = %root.display(), "opened key store");
        Ok(Self { root })
    }

    /// Load `user` and require that it is enrolled.
    pub fn load_user(&self, user: &str) -> BridgeResult<SigningIdentity> {
        let path = self.root.join(user);
        let contents = std::fs::read_to_string(&path).map_err(|e| BridgeError::Connection {
            reason: format!("failed to get {} from key store '{}': {}", user, self.root.display(), e),
        })?;
        let identity: SigningIdentity =
            serde_json::from_str(&contents).map_err(|e| BridgeError::Connection {
                reason: format!("stored credential for {} is malformed: {}", user, e),
            })?;

        if !identity.is_enrolled() {
            return Err(BridgeError::Connection {
                reason: format!("{} is not enrolled; register and enroll the user first", user),
            });
        }

        info!(user = %identity.name, msp_id = %identity.msp_id, "loaded enrolled user from key store");
        Ok(identity)
    }

    /// Persist `identity` under its name, replacing any previous entry.
    pub fn save_user(&self, identity: &SigningIdentity) -> BridgeResult<()> {
        let json = serde_json::to_string_pretty(identity).map_err(|e| BridgeError::Config {
            reason: format!("failed to serialize credential for {}: {}", identity.name, e),
        })?;
        std::fs::write(self.root.join(&identity.name), json).map_err(|e| BridgeError::Config {
            reason: format!("failed to write credential for {}: {}", identity.name, e),
        })
    }
}

/// Derive a transaction identifier from `nonce` and the creator identity.
///
/// `tx_id = hex(sha256(nonce ‖ msp_id ‖ certificate))`
pub fn derive_transaction_id(identity: &SigningIdentity, nonce: &[u8]) -> TransactionId {
    let mut hasher = Sha256::new();
    hasher.update(nonce);
    hasher.update(identity.msp_id.as_bytes());
    hasher.update(identity.certificate.as_bytes());
    TransactionId(hex::encode(hasher.finalize()))
}

/// Derive a fresh transaction identifier using a random nonce.
pub fn new_transaction_id(identity: &SigningIdentity) -> TransactionId {
    let nonce = uuid::Uuid::new_v4();
    derive_transaction_id(identity, nonce.as_bytes())
}
