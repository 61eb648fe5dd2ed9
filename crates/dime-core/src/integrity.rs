//! Verification outcomes.

use std::fmt;

/// The result of verifying an item.
///
/// Verification never fails with an error: it reports *why* trust was or was
/// not established, so callers can branch on the reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IntegrityState {
    /// Every requested check passed.
    Complete,
    /// The signature check passed.
    ValidSignature,
    /// The validity window check passed.
    ValidDates,
    /// The item link check passed.
    ValidItemLinks,
    /// The item carries no signature.
    FailedNoSignature,
    /// A matching signature was found but does not verify.
    FailedNotTrusted,
    /// No signature was made by the given key.
    FailedKeyMismatch,
    /// The issuer does not match the signing identity.
    FailedIssuerMismatch,
    /// Issued-at lies in the future (beyond the grace period).
    FailedUsedBeforeIssued,
    /// Expires-at has passed (beyond the grace period).
    FailedUsedAfterExpired,
    /// Issued-at is after expires-at.
    FailedDateMismatch,
    /// Link verification could not be carried out.
    FailedLinkedItemFault,
    /// A linked item differs from its link.
    FailedLinkedItemMismatch,
    /// A supplied item has no link.
    FailedLinkedItemMissing,
    /// A key ring entry cannot be used as a trust anchor.
    FailedInvalidKeyRingItem,
    /// There are no trust anchors to verify against.
    FailedNoKeyRing,
    /// An unexpected error occurred while verifying.
    FailedInternalFault,
}

impl IntegrityState {
    /// True for `Complete` and the partial positives.
    pub fn is_valid(self) -> bool {
        matches!(
            self,
            Self::Complete | Self::ValidSignature | Self::ValidDates | Self::ValidItemLinks
        )
    }

    /// True for any failure.
    pub fn is_failure(self) -> bool {
        !self.is_valid()
    }
}

impl fmt::Display for IntegrityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}
