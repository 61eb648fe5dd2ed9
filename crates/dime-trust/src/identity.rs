//! Identities and trust chain verification.
//!
//! An identity binds a subject id to a public signing key and a set of
//! capabilities. It is signed by its issuer, and may carry the issuer's own
//! identity as its trust chain. Chains end at the trusted root, which is
//! never embedded.

use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use tracing::{debug, warn};
use uuid::Uuid;

use dime_core::canonical::{decode_base64_text, encode_base64};
use dime_core::{
    finish_verify, verify_item, verify_signature, Claim, CoreError, DecodeItem, IdentityCapability,
    IntegrityState, Item, ItemCore, ItemType, Key, KeyCapability, TrustAnchors, VerifyContext,
};

/// An issued identity.
#[derive(Debug, Clone, PartialEq)]
pub struct Identity {
    core: ItemCore,
    trust_chain: Option<Box<Identity>>,
}

/// Claims of a freshly issued identity.
pub(crate) struct IdentityClaims<'a> {
    pub subject_id: Uuid,
    pub issuer_id: Uuid,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub system_name: &'a str,
    pub capabilities: &'a [IdentityCapability],
    pub public_key: &'a str,
    pub ambit_list: &'a [String],
    pub methods: &'a [String],
    pub principles: Option<Map<String, Value>>,
}

impl Identity {
    pub(crate) fn issued(
        claims: IdentityClaims<'_>,
        trust_chain: Option<Identity>,
    ) -> dime_core::Result<Self> {
        let mut identity = Self {
            core: ItemCore::new(ItemType::Identity),
            trust_chain: trust_chain.map(Box::new),
        };
        identity.put_claim(Claim::Uid, Uuid::new_v4())?;
        identity.put_claim(Claim::Sub, claims.subject_id)?;
        identity.put_claim(Claim::Iss, claims.issuer_id)?;
        identity.put_claim(Claim::Iat, claims.issued_at)?;
        identity.put_claim(Claim::Exp, claims.expires_at)?;
        identity.put_claim(Claim::Sys, claims.system_name)?;
        identity.put_claim(Claim::Cap, claims.capabilities)?;
        identity.put_claim(Claim::Pub, claims.public_key)?;
        if !claims.ambit_list.is_empty() {
            identity.put_claim(Claim::Amb, claims.ambit_list.to_vec())?;
        }
        if !claims.methods.is_empty() {
            identity.put_claim(Claim::Mtd, claims.methods.to_vec())?;
        }
        if let Some(principles) = claims.principles {
            identity.put_claim(Claim::Pri, principles)?;
        }
        Ok(identity)
    }

    pub fn subject_id(&self) -> Option<Uuid> {
        self.claims().get_uuid(Claim::Sub)
    }

    pub fn system_name(&self) -> Option<&str> {
        self.claims().get_str(Claim::Sys)
    }

    pub fn capabilities(&self) -> Vec<IdentityCapability> {
        self.claims().identity_capabilities()
    }

    pub fn has_capability(&self, capability: IdentityCapability) -> bool {
        self.capabilities().contains(&capability)
    }

    pub fn ambit_list(&self) -> Vec<String> {
        self.claims().get_strings(Claim::Amb).unwrap_or_default()
    }

    pub fn methods(&self) -> Vec<String> {
        self.claims().get_strings(Claim::Mtd).unwrap_or_default()
    }

    pub fn principles(&self) -> Option<&Map<String, Value>> {
        self.claims().get(Claim::Pri).and_then(Value::as_object)
    }

    /// The identity's public key string.
    pub fn public_key_string(&self) -> Option<&str> {
        self.claims().get_str(Claim::Pub)
    }

    /// The identity's public signing key.
    pub fn public_key(&self) -> dime_core::Result<Key> {
        let public = self
            .public_key_string()
            .ok_or(CoreError::MissingClaim(Claim::Pub))?;
        Key::from_key_strings(None, Some(public), &[KeyCapability::Sign])
    }

    /// The issuer's identity, if embedded.
    pub fn trust_chain(&self) -> Option<&Identity> {
        self.trust_chain.as_deref()
    }

    /// Issued by itself.
    pub fn is_self_issued(&self) -> bool {
        self.subject_id().is_some()
            && self.subject_id() == self.issuer_id()
            && self.has_capability(IdentityCapability::SelfIssued)
    }

    /// Same subject and same public key.
    pub fn same_subject(&self, other: &Identity) -> bool {
        self.subject_id().is_some()
            && self.subject_id() == other.subject_id()
            && self.public_key_string() == other.public_key_string()
    }

    /// Verify the issuer's signature through the trust chain.
    fn verify_chain(&self, ctx: &VerifyContext<'_>) -> IntegrityState {
        let Some(parent) = self.trust_chain() else {
            return match (ctx.trusted_root, ctx.key_ring) {
                (Some(root), _) => root.verify_trust(self, ctx),
                (None, Some(ring)) => ring.verify_trust(self, ctx),
                (None, None) => IntegrityState::FailedNoKeyRing,
            };
        };

        let parent_state = parent.verify(None, None, ctx);
        if parent_state.is_failure() {
            debug!(subject = ?parent.subject_id(), state = %parent_state, "trust chain parent failed");
            return parent_state;
        }
        if self.issuer_id() != parent.subject_id() {
            return IntegrityState::FailedIssuerMismatch;
        }
        match parent.public_key() {
            Ok(key) => verify_signature(self, &key),
            Err(e) => {
                warn!("Trust chain parent has no usable key: {}", e);
                IntegrityState::FailedInternalFault
            }
        }
    }
}

impl Item for Identity {
    fn core(&self) -> &ItemCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ItemCore {
        &mut self.core
    }

    fn body_components(&self) -> dime_core::Result<Vec<String>> {
        match &self.trust_chain {
            Some(parent) => Ok(vec![encode_base64(parent.export()?)]),
            None => Ok(Vec::new()),
        }
    }

    fn validate_export(&self) -> dime_core::Result<()> {
        if self.trust_chain.is_some() && !self.is_signed() {
            return Err(CoreError::InvalidState(
                "an identity with a trust chain must be signed before export".to_string(),
            ));
        }
        Ok(())
    }

    /// With a key this is the plain item verification. Without one the
    /// signature is checked through the trust chain.
    fn verify(
        &self,
        key: Option<&Key>,
        linked: Option<&[&dyn Item]>,
        ctx: &VerifyContext<'_>,
    ) -> IntegrityState {
        match key {
            Some(_) => verify_item(self, key, linked, ctx),
            None => finish_verify(self, self.verify_chain(ctx), linked, ctx),
        }
    }
}

impl DecodeItem for Identity {
    const ITEM_TYPE: ItemType = ItemType::Identity;
    const MAX_BODY: usize = 1;

    fn from_parts(core: ItemCore, body: &[&str]) -> dime_core::Result<Self> {
        for claim in [Claim::Sub, Claim::Iss, Claim::Pub] {
            if !core.claims().contains(claim) {
                return Err(CoreError::MissingClaim(claim));
            }
        }
        let trust_chain = match body.first() {
            Some(encoded) => Some(Box::new(Identity::import(&decode_base64_text(encoded)?)?)),
            None => None,
        };
        Ok(Self { core, trust_chain })
    }
}

/// An identity used as the trusted root.
impl TrustAnchors for Identity {
    fn verify_trust(&self, item: &dyn Item, ctx: &VerifyContext<'_>) -> IntegrityState {
        let dates = self.verify_dates(&ctx.clock);
        if dates.is_failure() {
            debug!(state = %dates, "trusted root outside its validity window");
            return dates;
        }
        if item.item_type() == ItemType::Identity && item.issuer_id() != self.subject_id() {
            return IntegrityState::FailedIssuerMismatch;
        }
        match self.public_key() {
            Ok(key) => verify_signature(item, &key),
            Err(e) => {
                warn!("Trusted root has no usable key: {}", e);
                IntegrityState::FailedInvalidKeyRingItem
            }
        }
    }
}
