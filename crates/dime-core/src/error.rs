//! Error types for DiME core.

use thiserror::Error;

use crate::claim::Claim;
use crate::item::ItemType;

/// Errors that can occur while building, encoding, decoding or signing items.
///
/// Verification outcomes are not errors: they are reported through
/// [`IntegrityState`](crate::IntegrityState).
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("unexpected item type: expected {expected}, got {got}")]
    UnexpectedItemType { expected: ItemType, got: String },

    #[error("missing claim: {0}")]
    MissingClaim(Claim),

    #[error("invalid value for claim {claim}: {reason}")]
    InvalidClaim { claim: Claim, reason: String },

    #[error("capability mismatch: {0}")]
    CapabilityMismatch(String),

    #[error("key has no secret material")]
    MissingSecretKey,

    #[error("key has no public material")]
    MissingPublicKey,

    #[error("item is signed and cannot be modified")]
    ItemSigned,

    #[error("item already signed by key {0}")]
    DuplicateSignature(String),

    #[error("legacy items can only carry a single signature")]
    LegacyAlreadySigned,

    #[error("invalid state: {0}")]
    InvalidState(String),

    #[error("unknown cryptographic suite: {0}")]
    UnknownSuite(String),

    #[error("cryptographic suite already registered: {0}")]
    SuiteAlreadyRegistered(String),

    #[error("cryptographic operation failed: {0}")]
    Crypto(String),

    #[error("invalid key usage: {0}")]
    InvalidKeyUsage(String),

    #[error("encoding error: {0}")]
    EncodingError(String),

    #[error("decoding error: {0}")]
    DecodingError(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(e: serde_json::Error) -> Self {
        CoreError::EncodingError(e.to_string())
    }
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
