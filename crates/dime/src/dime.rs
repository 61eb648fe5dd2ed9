//! The DiME facade: configuration, trust state and verification context.
//!
//! A [`Dime`] owns the key ring and the trusted root that would otherwise be
//! process-wide state, and hands out [`VerifyContext`]s borrowing them.

use chrono::{DateTime, Duration, Utc};
use tracing::debug;

use dime_core::{registry, Clock, IntegrityState, Item, Key, KeyCapability, VerifyContext};
use dime_trust::{AnyItem, Envelope, Identity, IdentityIssuingRequest, IssueParams, KeyRing};

use crate::error::{DimeError, Result};

/// Configuration for [`Dime`].
#[derive(Debug, Clone)]
pub struct DimeConfig {
    /// Clock skew tolerated when checking validity windows.
    pub grace_period: Duration,
    /// Verify as if it were this time.
    pub time_override: Option<DateTime<Utc>>,
    /// Suite made the registry default on construction.
    pub default_suite: Option<String>,
}

impl Default for DimeConfig {
    fn default() -> Self {
        Self {
            grace_period: Duration::zero(),
            time_override: None,
            default_suite: None,
        }
    }
}

impl DimeConfig {
    pub fn with_grace_period(mut self, grace_period: Duration) -> Self {
        self.grace_period = grace_period;
        self
    }

    pub fn with_time_override(mut self, now: DateTime<Utc>) -> Self {
        self.time_override = Some(now);
        self
    }

    pub fn with_default_suite(mut self, suite: impl Into<String>) -> Self {
        self.default_suite = Some(suite.into());
        self
    }
}

/// Trust state and entry point for verification.
#[derive(Debug, Clone)]
pub struct Dime {
    config: DimeConfig,
    key_ring: KeyRing,
    trusted_root: Option<Identity>,
}

impl Dime {
    /// Create a new instance, applying the configured default suite.
    pub fn new(config: DimeConfig) -> Result<Self> {
        if config.grace_period < Duration::zero() {
            return Err(DimeError::InvalidConfig(
                "grace period must not be negative".to_string(),
            ));
        }
        if let Some(suite) = &config.default_suite {
            registry().set_default_suite(suite)?;
        }
        Ok(Self {
            config,
            key_ring: KeyRing::new(),
            trusted_root: None,
        })
    }

    pub fn config(&self) -> &DimeConfig {
        &self.config
    }

    pub fn key_ring(&self) -> &KeyRing {
        &self.key_ring
    }

    pub fn key_ring_mut(&mut self) -> &mut KeyRing {
        &mut self.key_ring
    }

    pub fn trusted_root(&self) -> Option<&Identity> {
        self.trusted_root.as_ref()
    }

    /// Make `root` the identity trust chains end at.
    ///
    /// The root must verify against its own key.
    pub fn set_trusted_root(&mut self, root: Identity) -> Result<()> {
        let key = root.public_key()?;
        let state = root.verify(Some(&key), None, &self.context());
        if state != IntegrityState::Complete {
            return Err(DimeError::NotVerified(state));
        }
        debug!(subject = ?root.subject_id(), "trusted root set");
        self.trusted_root = Some(root);
        Ok(())
    }

    pub fn clear_trusted_root(&mut self) {
        self.trusted_root = None;
    }

    /// The clock described by the configuration.
    pub fn clock(&self) -> Clock {
        Clock {
            now_override: self.config.time_override,
            grace_period: self.config.grace_period,
        }
    }

    /// A verification context borrowing this instance's trust state.
    pub fn context(&self) -> VerifyContext<'_> {
        let mut ctx = VerifyContext::new().with_key_ring(&self.key_ring);
        ctx.clock = self.clock();
        if let Some(root) = &self.trusted_root {
            ctx = ctx.with_trusted_root(root);
        }
        ctx
    }

    /// Verify against the key ring (or, for identities, the trust chain).
    pub fn verify(&self, item: &dyn Item) -> IntegrityState {
        item.verify(None, None, &self.context())
    }

    /// Verify against an explicit key.
    pub fn verify_with_key(&self, item: &dyn Item, key: &Key) -> IntegrityState {
        item.verify(Some(key), None, &self.context())
    }

    /// Verify, including the links to `linked`.
    pub fn verify_with_links(
        &self,
        item: &dyn Item,
        key: Option<&Key>,
        linked: &[&dyn Item],
    ) -> IntegrityState {
        item.verify(key, Some(linked), &self.context())
    }

    /// Generate a key with the default suite.
    pub fn generate_key(&self, capability: KeyCapability) -> Result<Key> {
        Ok(Key::generate(&[capability], None)?)
    }

    /// Decode an exported item of any kind except envelopes.
    pub fn import_item(&self, encoded: &str) -> Result<AnyItem> {
        Ok(AnyItem::import(encoded)?)
    }

    /// Decode an exported envelope.
    pub fn import_envelope(&self, encoded: &str) -> Result<Envelope> {
        Ok(Envelope::import(encoded)?)
    }

    /// Issue an identity, anchoring it at the trusted root unless the
    /// parameters name another.
    pub fn issue_identity(
        &self,
        request: &IdentityIssuingRequest,
        params: IssueParams<'_>,
    ) -> Result<Identity> {
        let params = IssueParams {
            trusted_root: params.trusted_root.or(self.trusted_root.as_ref()),
            ..params
        };
        Ok(request.issue(&params, &self.context())?)
    }

    /// Replace the key ring with one decoded from `encoded`.
    pub fn import_key_ring(&mut self, encoded: &str, verify_key: Option<&Key>) -> Result<()> {
        let ring = KeyRing::import(encoded, verify_key, &self.context())?;
        self.key_ring = ring;
        Ok(())
    }

    /// Export the key ring, signed if a key is given.
    pub fn export_key_ring(&self, signing_key: Option<&Key>) -> Result<Option<String>> {
        Ok(self.key_ring.export(signing_key)?)
    }
}
