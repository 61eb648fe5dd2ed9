//! Error types for the DiME facade.

use dime_core::{CoreError, IntegrityState};
use dime_trust::TrustError;
use thiserror::Error;

/// Errors that can occur during DiME operations.
#[derive(Debug, Error)]
pub enum DimeError {
    /// Item building, encoding or crypto error.
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Issuance or key ring error.
    #[error("trust error: {0}")]
    Trust(#[from] TrustError),

    /// An item did not verify.
    #[error("verification failed: {0}")]
    NotVerified(IntegrityState),

    /// Invalid configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for DiME operations.
pub type Result<T> = std::result::Result<T, DimeError>;
