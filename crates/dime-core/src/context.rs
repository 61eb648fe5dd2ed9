//! Verification context: the clock and the trust anchors a verification
//! runs against.
//!
//! Nothing here is global. Callers build a [`VerifyContext`] and pass it to
//! every verification, which keeps tests reproducible and lets several
//! independent trust setups coexist in one process.

use chrono::{DateTime, Duration, Utc};

use crate::integrity::IntegrityState;
use crate::item::Item;

/// Something that can vouch for an item's signature.
///
/// Implemented by the key ring and by identities acting as trusted roots.
pub trait TrustAnchors {
    /// Verify the item's signature against these anchors.
    fn verify_trust(&self, item: &dyn Item, ctx: &VerifyContext<'_>) -> IntegrityState;
}

/// The time source used for validity window checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Clock {
    /// Fixed "now", if overridden.
    pub now_override: Option<DateTime<Utc>>,
    /// Allowed skew when comparing against issued-at and expires-at.
    pub grace_period: Duration,
}

impl Clock {
    /// The current time, or the override.
    pub fn now(&self) -> DateTime<Utc> {
        self.now_override.unwrap_or_else(Utc::now)
    }

    /// Validity window check.
    ///
    /// - issued-at later than `now + grace` fails (equality is valid);
    /// - issued-at strictly after expires-at fails, without grace;
    /// - expires-at earlier than `now - grace` fails (equality is valid).
    pub fn verify_dates(
        &self,
        issued_at: Option<DateTime<Utc>>,
        expires_at: Option<DateTime<Utc>>,
    ) -> IntegrityState {
        let now = self.now();

        if let Some(iat) = issued_at {
            if iat - now > self.grace_period {
                return IntegrityState::FailedUsedBeforeIssued;
            }
        }

        if let Some(exp) = expires_at {
            if let Some(iat) = issued_at {
                if iat > exp {
                    return IntegrityState::FailedDateMismatch;
                }
            }
            if now - exp > self.grace_period {
                return IntegrityState::FailedUsedAfterExpired;
            }
        }

        IntegrityState::ValidDates
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self {
            now_override: None,
            grace_period: Duration::zero(),
        }
    }
}

/// Everything a verification needs besides the item itself.
#[derive(Clone, Copy, Default)]
pub struct VerifyContext<'a> {
    /// Time source.
    pub clock: Clock,
    /// Anchors consulted when no explicit key is given.
    pub key_ring: Option<&'a dyn TrustAnchors>,
    /// The root identity that terminates trust chains.
    pub trusted_root: Option<&'a dyn TrustAnchors>,
}

impl<'a> VerifyContext<'a> {
    /// A context with the system clock and no trust anchors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the given key ring.
    pub fn with_key_ring(mut self, key_ring: &'a dyn TrustAnchors) -> Self {
        self.key_ring = Some(key_ring);
        self
    }

    /// Use the given trusted root.
    pub fn with_trusted_root(mut self, root: &'a dyn TrustAnchors) -> Self {
        self.trusted_root = Some(root);
        self
    }

    /// Allow the given clock skew.
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.clock.grace_period = grace_period;
        self
    }

    /// Verify as if it were the given time.
    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.clock.now_override = Some(now);
        self
    }
}

impl std::fmt::Debug for VerifyContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VerifyContext")
            .field("clock", &self.clock)
            .field("key_ring", &self.key_ring.is_some())
            .field("trusted_root", &self.trusted_root.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn clock_at(now: DateTime<Utc>, grace_secs: i64) -> Clock {
        Clock {
            now_override: Some(now),
            grace_period: Duration::seconds(grace_secs),
        }
    }

    #[test]
    fn test_no_dates_is_valid() {
        let clock = Clock::default();
        assert_eq!(clock.verify_dates(None, None), IntegrityState::ValidDates);
    }

    #[test]
    fn test_used_before_issued() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let clock = clock_at(now, 0);
        let iat = now + Duration::seconds(1);
        assert_eq!(
            clock.verify_dates(Some(iat), None),
            IntegrityState::FailedUsedBeforeIssued
        );
    }

    #[test]
    fn test_issued_at_grace_boundary_is_valid() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let clock = clock_at(now, 10);

        let at_boundary = now + Duration::seconds(10);
        assert_eq!(
            clock.verify_dates(Some(at_boundary), None),
            IntegrityState::ValidDates
        );

        let past_boundary = now + Duration::seconds(10) + Duration::microseconds(1);
        assert_eq!(
            clock.verify_dates(Some(past_boundary), None),
            IntegrityState::FailedUsedBeforeIssued
        );
    }

    #[test]
    fn test_expires_at_grace_boundary_is_valid() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let clock = clock_at(now, 10);
        let iat = now - Duration::days(1);

        let at_boundary = now - Duration::seconds(10);
        assert_eq!(
            clock.verify_dates(Some(iat), Some(at_boundary)),
            IntegrityState::ValidDates
        );

        let past_boundary = now - Duration::seconds(11);
        assert_eq!(
            clock.verify_dates(Some(iat), Some(past_boundary)),
            IntegrityState::FailedUsedAfterExpired
        );
    }

    #[test]
    fn test_date_mismatch_ignores_grace() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let clock = clock_at(now, 3600);
        let iat = now;
        let exp = now - Duration::seconds(1);
        assert_eq!(
            clock.verify_dates(Some(iat), Some(exp)),
            IntegrityState::FailedDateMismatch
        );
    }

    #[test]
    fn test_equal_issued_and_expires_is_not_a_mismatch() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let clock = clock_at(now, 0);
        assert_eq!(
            clock.verify_dates(Some(now), Some(now)),
            IntegrityState::ValidDates
        );
    }

    #[test]
    fn test_context_builder() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let ctx = VerifyContext::new()
            .with_grace_period(Duration::seconds(5))
            .at(now);
        assert_eq!(ctx.clock.now(), now);
        assert_eq!(ctx.clock.grace_period, Duration::seconds(5));
        assert!(ctx.key_ring.is_none());
        assert!(ctx.trusted_root.is_none());
    }
}
