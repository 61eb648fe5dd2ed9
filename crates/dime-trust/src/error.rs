//! Error types for identities, issuance and key rings.

use dime_core::{CoreError, IntegrityState};
use thiserror::Error;

/// Errors that can occur while issuing identities or managing trust.
#[derive(Debug, Error)]
pub enum TrustError {
    /// Requested, allowed or held capabilities do not line up.
    #[error("capability error: {0}")]
    Capability(String),

    /// The issuing request does not verify against its own key.
    #[error("identity issuing request does not verify: {0}")]
    RequestNotVerified(IntegrityState),

    /// Only keys and identities can be put into a key ring.
    #[error("invalid key ring item: {0}")]
    InvalidKeyRingItem(String),

    /// An imported item failed verification.
    #[error("integrity check failed: {0}")]
    Integrity(IntegrityState),

    /// Issuance parameters are unusable.
    #[error("invalid issuance: {0}")]
    InvalidIssuance(String),

    /// Core error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),
}

/// Result type for trust operations.
pub type Result<T> = std::result::Result<T, TrustError>;
