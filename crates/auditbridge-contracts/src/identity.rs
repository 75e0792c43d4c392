//! Signing identity type.
//!
//! Enrollment happens outside the bridge. What arrives here is an already
//! issued credential; the bridge only checks that it is enrolled.

use serde::{Deserialize, Serialize};

/// An enrolled member credential used to sign proposals and derive
/// transaction identifiers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SigningIdentity {
    /// User name within the key store (e.g. "user1").
    pub name: String,
    /// Membership service provider the user belongs to (e.g. "Org1MSP").
    pub msp_id: String,
    /// PEM-encoded enrollment certificate.
    pub certificate: String,
    /// False until the certificate authority has issued the certificate.
    #[serde(default)]
    pub enrolled: bool,
}

impl SigningIdentity {
    pub fn is_enrolled(&self) -> bool {
        self.enrolled && !self.certificate.is_empty()
    }
}
