//! Key rings: named collections of trusted keys and identities.
//!
//! Entries are filed under the key name for keys and the lower-case subject
//! id for identities. Verification walks the entries in name order.

use std::collections::BTreeMap;

use tracing::{debug, warn};

use dime_core::{
    verify_signature, Claim, CoreError, IntegrityState, Item, Key, KeyCapability, TrustAnchors, VerifyContext,
};

use crate::envelope::{AnyItem, Envelope};
use crate::error::{Result, TrustError};
use crate::identity::Identity;

/// One trusted entry.
#[derive(Debug, Clone, PartialEq)]
pub enum TrustAnchor {
    Key(Key),
    Identity(Identity),
}

impl TrustAnchor {
    /// The name the entry is filed under.
    pub fn name(&self) -> dime_core::Result<String> {
        match self {
            Self::Key(key) => key.name(),
            Self::Identity(identity) => identity
                .subject_id()
                .map(|id| id.to_string().to_lowercase())
                .ok_or(CoreError::MissingClaim(Claim::Sub)),
        }
    }

    pub fn as_item(&self) -> &dyn Item {
        match self {
            Self::Key(key) => key,
            Self::Identity(identity) => identity,
        }
    }

    /// The public signing key signatures are checked against.
    pub fn verification_key(&self) -> dime_core::Result<Key> {
        match self {
            Self::Key(key) => {
                if !key.has_capability(KeyCapability::Sign) {
                    return Err(CoreError::CapabilityMismatch(
                        "key ring keys must be signing keys".to_string(),
                    ));
                }
                key.public_copy()
            }
            Self::Identity(identity) => identity.public_key(),
        }
    }

    fn public_key_string(&self) -> Option<&str> {
        match self {
            Self::Key(key) => key.public(),
            Self::Identity(identity) => identity.public_key_string(),
        }
    }
}

impl From<Key> for TrustAnchor {
    fn from(key: Key) -> Self {
        Self::Key(key)
    }
}

impl From<Identity> for TrustAnchor {
    fn from(identity: Identity) -> Self {
        Self::Identity(identity)
    }
}

impl TryFrom<AnyItem> for TrustAnchor {
    type Error = TrustError;

    fn try_from(item: AnyItem) -> Result<Self> {
        match item {
            AnyItem::Key(key) => Ok(Self::Key(key)),
            AnyItem::Identity(identity) => Ok(Self::Identity(identity)),
            other => Err(TrustError::InvalidKeyRingItem(format!(
                "{} items cannot be trust anchors",
                other.item_type()
            ))),
        }
    }
}

/// A set of trust anchors.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct KeyRing {
    anchors: BTreeMap<String, TrustAnchor>,
}

impl KeyRing {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.anchors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.anchors.is_empty()
    }

    /// Entries in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &TrustAnchor)> {
        self.anchors.iter().map(|(name, anchor)| (name.as_str(), anchor))
    }

    pub fn get(&self, name: &str) -> Option<&TrustAnchor> {
        self.anchors.get(name)
    }

    /// Add an entry, replacing any entry with the same name. Returns the
    /// name.
    ///
    /// Keys are stored without their secret half.
    pub fn put(&mut self, anchor: impl Into<TrustAnchor>) -> Result<String> {
        let anchor = match anchor.into() {
            TrustAnchor::Key(key) if key.secret().is_some() => TrustAnchor::Key(key.public_copy()?),
            other => other,
        };
        let name = anchor.name()?;
        debug!(name = %name, "key ring entry added");
        self.anchors.insert(name.clone(), anchor);
        Ok(name)
    }

    /// Add a decoded item. Only keys and identities are accepted.
    pub fn put_item(&mut self, item: AnyItem) -> Result<String> {
        self.put(TrustAnchor::try_from(item)?)
    }

    /// True if an entry with the same name and public key is present.
    pub fn contains(&self, anchor: &TrustAnchor) -> bool {
        let Ok(name) = anchor.name() else {
            return false;
        };
        self.anchors
            .get(&name)
            .is_some_and(|stored| stored.public_key_string() == anchor.public_key_string())
    }

    /// Remove the entry filed under the anchor's name.
    pub fn remove(&mut self, anchor: &TrustAnchor) -> Option<TrustAnchor> {
        let name = anchor.name().ok()?;
        self.anchors.remove(&name)
    }

    pub fn clear(&mut self) {
        self.anchors.clear();
    }

    /// Decode a key ring from an exported envelope.
    ///
    /// With `verify_key` the envelope must verify completely first.
    pub fn import(encoded: &str, verify_key: Option<&Key>, ctx: &VerifyContext<'_>) -> Result<Self> {
        let envelope = Envelope::import(encoded)?;
        if let Some(key) = verify_key {
            let state = envelope.verify(Some(key), None, ctx);
            if state != IntegrityState::Complete {
                warn!("Key ring import rejected: {}", state);
                return Err(TrustError::Integrity(state));
            }
        }

        let mut ring = Self::new();
        for item in envelope.into_items() {
            ring.put_item(item)?;
        }
        debug!(entries = ring.len(), "key ring imported");
        Ok(ring)
    }

    /// Export all entries as an envelope, signed if a key is given. `None`
    /// when the ring is empty.
    pub fn export(&self, signing_key: Option<&Key>) -> Result<Option<String>> {
        if self.is_empty() {
            return Ok(None);
        }

        let mut envelope = Envelope::new();
        for anchor in self.anchors.values() {
            match anchor {
                TrustAnchor::Key(key) => envelope.add_item(key.clone())?,
                TrustAnchor::Identity(identity) => envelope.add_item(identity.clone())?,
            }
        }
        if let Some(key) = signing_key {
            envelope.sign(key)?;
        }
        debug!(entries = self.len(), signed = signing_key.is_some(), "key ring exported");
        Ok(Some(envelope.export()?))
    }
}

impl TrustAnchors for KeyRing {
    fn verify_trust(&self, item: &dyn Item, ctx: &VerifyContext<'_>) -> IntegrityState {
        if self.anchors.is_empty() {
            return IntegrityState::FailedNoKeyRing;
        }

        for (name, anchor) in &self.anchors {
            let dates = anchor.as_item().verify_dates(&ctx.clock);
            if dates.is_failure() {
                debug!(name = %name, state = %dates, "key ring entry outside its validity window");
                return dates;
            }

            let key = match anchor.verification_key() {
                Ok(key) => key,
                Err(e) => {
                    warn!("Unusable key ring entry {}: {}", name, e);
                    return IntegrityState::FailedInvalidKeyRingItem;
                }
            };

            let state = verify_signature(item, &key);
            if state != IntegrityState::FailedKeyMismatch {
                return state;
            }
        }

        IntegrityState::FailedKeyMismatch
    }
}
