//! The item contract shared by every DiME item kind.
//!
//! An item is a claims store plus kind-specific body components, optionally
//! followed by a signature block:
//!
//! ```text
//! TAG . base64(claims) [. body ...] [. signatures]
//! ```
//!
//! The part before the signature block is the pre-signature encoding. It is
//! what gets signed and hashed into the thumbprint. Once an item is signed
//! (or imported) that encoding is cached and the item is frozen until
//! [`Item::strip`] is called.

use std::fmt;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::canonical::{
    components_end, decode_base64_text, encode_base64, join_components, split_components,
    COMPONENT_DELIMITER,
};
use crate::claim::{Claim, ClaimValue, ClaimsStore};
use crate::context::{Clock, VerifyContext};
use crate::crypto::registry;
use crate::error::{CoreError, Result};
use crate::integrity::IntegrityState;
use crate::key::Key;
use crate::link::ItemLink;
use crate::signature::Signature;

/// The kind of an item, identified on the wire by its tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemType {
    Identity,
    IdentityIssuingRequest,
    Key,
    Data,
    Tag,
    Message,
    Envelope,
}

impl ItemType {
    pub const ALL: [ItemType; 7] = [
        ItemType::Identity,
        ItemType::IdentityIssuingRequest,
        ItemType::Key,
        ItemType::Data,
        ItemType::Tag,
        ItemType::Message,
        ItemType::Envelope,
    ];

    /// The wire tag.
    pub const fn tag(self) -> &'static str {
        match self {
            ItemType::Identity => "ID",
            ItemType::IdentityIssuingRequest => "IIR",
            ItemType::Key => "KEY",
            ItemType::Data => "DAT",
            ItemType::Tag => "TAG",
            ItemType::Message => "MSG",
            ItemType::Envelope => "Di",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.tag() == tag)
    }
}

impl fmt::Display for ItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// State shared by every item kind.
#[derive(Debug, Clone, PartialEq)]
pub struct ItemCore {
    item_type: ItemType,
    claims: ClaimsStore,
    signatures: Vec<Signature>,
    legacy: bool,
    encoded: Option<String>,
}

impl ItemCore {
    /// A fresh, unsigned core.
    pub fn new(item_type: ItemType) -> Self {
        Self {
            item_type,
            claims: ClaimsStore::new(),
            signatures: Vec::new(),
            legacy: false,
            encoded: None,
        }
    }

    /// A core rebuilt from a received encoding.
    pub fn decoded(
        item_type: ItemType,
        claims: ClaimsStore,
        signatures: Vec<Signature>,
        encoded: String,
    ) -> Self {
        let legacy = signatures.iter().any(Signature::is_legacy);
        Self {
            item_type,
            claims,
            signatures,
            legacy,
            encoded: Some(encoded),
        }
    }

    pub fn item_type(&self) -> ItemType {
        self.item_type
    }

    pub fn claims(&self) -> &ClaimsStore {
        &self.claims
    }

    pub fn signatures(&self) -> &[Signature] {
        &self.signatures
    }

    pub fn is_signed(&self) -> bool {
        !self.signatures.is_empty()
    }

    pub fn is_legacy(&self) -> bool {
        self.legacy
    }

    /// The cached pre-signature encoding, if any.
    pub fn cached_encoding(&self) -> Option<&str> {
        self.encoded.as_deref()
    }

    /// Prepare for a mutation: fails once signed, and drops the cached
    /// encoding otherwise.
    pub fn begin_mutation(&mut self) -> Result<()> {
        if self.is_signed() {
            return Err(CoreError::ItemSigned);
        }
        self.encoded = None;
        Ok(())
    }

    /// Mutable claims, only while unsigned.
    pub fn claims_mut(&mut self) -> Result<&mut ClaimsStore> {
        self.begin_mutation()?;
        Ok(&mut self.claims)
    }

    fn strip(&mut self) {
        self.signatures.clear();
        self.encoded = None;
    }
}

/// Upcast to a trait object from provided trait methods.
pub trait AsItem {
    fn as_item(&self) -> &dyn Item;
}

impl<T: Item> AsItem for T {
    fn as_item(&self) -> &dyn Item {
        self
    }
}

/// Behaviour common to every item kind.
///
/// Kinds supply [`core`](Item::core) and, if they carry anything besides
/// claims, [`body_components`](Item::body_components). Everything else is
/// provided.
pub trait Item: AsItem + fmt::Debug + Send + Sync {
    fn core(&self) -> &ItemCore;

    fn core_mut(&mut self) -> &mut ItemCore;

    /// Encoded components following the claims.
    fn body_components(&self) -> Result<Vec<String>> {
        Ok(Vec::new())
    }

    /// Checked before exporting.
    fn validate_export(&self) -> Result<()> {
        Ok(())
    }

    /// Separator between the pre-signature encoding and the signature block.
    fn signature_delimiter(&self) -> char {
        COMPONENT_DELIMITER
    }

    /// The canonical encoding that is signed and thumbprinted.
    fn pre_signature_encoding(&self) -> Result<String> {
        if let Some(encoded) = self.core().cached_encoding() {
            return Ok(encoded.to_string());
        }
        let mut components = vec![
            self.item_type().tag().to_string(),
            encode_base64(self.claims().to_canonical_json()?),
        ];
        components.extend(self.body_components()?);
        Ok(join_components(&components))
    }

    /// The full text encoding.
    fn export(&self) -> Result<String> {
        self.validate_export()?;
        let mut encoded = self.pre_signature_encoding()?;
        if self.is_signed() {
            encoded.push(self.signature_delimiter());
            encoded.push_str(&Signature::encode_all(self.signatures())?);
        }
        Ok(encoded)
    }

    fn item_type(&self) -> ItemType {
        self.core().item_type()
    }

    fn claims(&self) -> &ClaimsStore {
        self.core().claims()
    }

    fn unique_id(&self) -> Option<Uuid> {
        self.claims().get_uuid(Claim::Uid)
    }

    fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.claims().get_time(Claim::Iat)
    }

    fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.claims().get_time(Claim::Exp)
    }

    fn issuer_id(&self) -> Option<Uuid> {
        self.claims().get_uuid(Claim::Iss)
    }

    fn context(&self) -> Option<&str> {
        self.claims().get_str(Claim::Ctx)
    }

    fn is_signed(&self) -> bool {
        self.core().is_signed()
    }

    fn is_legacy(&self) -> bool {
        self.core().is_legacy()
    }

    fn signatures(&self) -> &[Signature] {
        self.core().signatures()
    }

    /// Links carried in the `lnk` claim.
    fn item_links(&self) -> Result<Vec<ItemLink>> {
        self.claims().item_links()
    }

    /// Hex hash of the pre-signature encoding, with the default suite.
    fn thumbprint(&self) -> Result<String> {
        let suite = registry().default_suite_name();
        self.thumbprint_with(&suite)
    }

    /// Hex hash of the pre-signature encoding, with the named suite.
    fn thumbprint_with(&self, suite_name: &str) -> Result<String> {
        let encoded = self.pre_signature_encoding()?;
        let digest = registry().generate_hash(encoded.as_bytes(), Some(suite_name))?;
        Ok(hex::encode(digest))
    }

    /// Set a claim. Fails once signed.
    fn put_claim(&mut self, claim: Claim, value: impl Into<ClaimValue>) -> Result<()>
    where
        Self: Sized,
    {
        self.core_mut().claims_mut()?.put(claim, value)
    }

    /// Remove a claim. Fails once signed.
    fn remove_claim(&mut self, claim: Claim) -> Result<Option<Value>> {
        Ok(self.core_mut().claims_mut()?.remove(claim))
    }

    /// Link another item, replacing any link with the same unique id.
    fn add_item_link(&mut self, item: &dyn Item) -> Result<()> {
        self.core_mut().begin_mutation()?;
        let link = ItemLink::new(item)?;
        let mut links = self.item_links()?;
        links.retain(|l| l.unique_id() != link.unique_id());
        links.push(link);
        self.core_mut().claims_mut()?.put(Claim::Lnk, links.as_slice())
    }

    /// Replace all links. An empty list removes the `lnk` claim.
    fn set_item_links(&mut self, items: &[&dyn Item]) -> Result<()> {
        self.core_mut().begin_mutation()?;
        let links = items
            .iter()
            .map(|item| ItemLink::new(*item))
            .collect::<Result<Vec<_>>>()?;
        let claims = self.core_mut().claims_mut()?;
        if links.is_empty() {
            claims.remove(Claim::Lnk);
            Ok(())
        } else {
            claims.put(Claim::Lnk, links.as_slice())
        }
    }

    /// Sign with a key holding secret `Sign` material.
    ///
    /// Current-format items accept one signature per key; legacy items accept
    /// a single signature in total.
    fn sign(&mut self, key: &Key) -> Result<()> {
        if self.is_legacy() && self.is_signed() {
            return Err(CoreError::LegacyAlreadySigned);
        }
        if key.secret_bytes()?.is_none() {
            return Err(CoreError::MissingSecretKey);
        }

        let encoded = self.pre_signature_encoding()?;
        let signature = if self.is_legacy() {
            Signature::Legacy(registry().generate_signature(encoded.as_bytes(), key)?)
        } else {
            let key_name = key.name()?;
            if Signature::find(self.signatures(), &key_name).is_some() {
                return Err(CoreError::DuplicateSignature(key_name));
            }
            Signature::named(key_name, registry().generate_signature(encoded.as_bytes(), key)?)
        };

        let core = self.core_mut();
        core.encoded = Some(encoded);
        core.signatures.push(signature);
        debug!(item_type = %core.item_type, signatures = core.signatures.len(), "signed item");
        Ok(())
    }

    /// Drop all signatures and the cached encoding, making the item mutable
    /// again.
    fn strip(&mut self) {
        self.core_mut().strip();
    }

    /// Switch to the legacy signature format. Drops any signatures.
    fn convert_to_legacy(&mut self) {
        let core = self.core_mut();
        core.strip();
        core.legacy = true;
    }

    /// Check the signature made by `key`.
    fn verify_signature(&self, key: &Key) -> IntegrityState {
        verify_signature(self.as_item(), key)
    }

    /// Check the validity window.
    fn verify_dates(&self, clock: &Clock) -> IntegrityState {
        clock.verify_dates(self.issued_at(), self.expires_at())
    }

    /// Check that `linked` matches the links this item carries.
    fn verify_links(&self, linked: &[&dyn Item]) -> IntegrityState {
        match self.item_links() {
            Ok(links) => ItemLink::verify_all(linked, &links),
            Err(e) => {
                warn!("Unreadable item links: {}", e);
                IntegrityState::FailedLinkedItemFault
            }
        }
    }

    /// Full verification: signature, then links (if given), then dates.
    ///
    /// Without a key the signature is checked against the context's key
    /// ring.
    fn verify(
        &self,
        key: Option<&Key>,
        linked: Option<&[&dyn Item]>,
        ctx: &VerifyContext<'_>,
    ) -> IntegrityState {
        verify_item(self.as_item(), key, linked, ctx)
    }
}

/// Check the signature on `item` made by `key`.
pub fn verify_signature(item: &dyn Item, key: &Key) -> IntegrityState {
    let signatures = item.signatures();
    if signatures.is_empty() {
        return IntegrityState::FailedNoSignature;
    }

    let signature = if item.is_legacy() {
        signatures.first()
    } else {
        match key.name() {
            Ok(name) => Signature::find(signatures, &name),
            Err(e) => {
                warn!("Could not derive key name: {}", e);
                return IntegrityState::FailedInternalFault;
            }
        }
    };
    let Some(signature) = signature else {
        return IntegrityState::FailedKeyMismatch;
    };

    let outcome = item
        .pre_signature_encoding()
        .and_then(|encoded| registry().verify_signature(encoded.as_bytes(), signature.bytes(), key));
    match outcome {
        Ok(true) => IntegrityState::ValidSignature,
        Ok(false) => IntegrityState::FailedNotTrusted,
        Err(e) => {
            warn!("Signature verification fault: {}", e);
            IntegrityState::FailedInternalFault
        }
    }
}

/// The default verification sequence.
///
/// Exposed so kinds that override [`Item::verify`] can fall back to it.
pub fn verify_item(
    item: &dyn Item,
    key: Option<&Key>,
    linked: Option<&[&dyn Item]>,
    ctx: &VerifyContext<'_>,
) -> IntegrityState {
    let state = match (key, ctx.key_ring) {
        (Some(key), _) => verify_signature(item, key),
        (None, Some(ring)) => ring.verify_trust(item, ctx),
        (None, None) => IntegrityState::FailedNoKeyRing,
    };
    finish_verify(item, state, linked, ctx)
}

/// Continue a verification after the signature step.
pub fn finish_verify(
    item: &dyn Item,
    signature_state: IntegrityState,
    linked: Option<&[&dyn Item]>,
    ctx: &VerifyContext<'_>,
) -> IntegrityState {
    if signature_state.is_failure() {
        debug!(item_type = %item.item_type(), state = %signature_state, "signature check failed");
        return signature_state;
    }

    if let Some(linked) = linked {
        let state = item.verify_links(linked);
        if state.is_failure() {
            return state;
        }
    }

    let state = item.verify_dates(&ctx.clock);
    if state.is_failure() {
        return state;
    }

    IntegrityState::Complete
}

/// Item kinds that decode from the standard component layout.
pub trait DecodeItem: Item + Sized {
    const ITEM_TYPE: ItemType;

    /// Fewest body components after the claims.
    const MIN_BODY: usize = 0;

    /// Most body components after the claims.
    const MAX_BODY: usize = 0;

    /// Build the item from its decoded core and raw body components.
    fn from_parts(core: ItemCore, body: &[&str]) -> Result<Self>;

    /// Decode an exported item.
    fn import(encoded: &str) -> Result<Self> {
        let components = split_components(encoded);
        if components.len() < 2 {
            return Err(CoreError::InvalidFormat(format!(
                "expected at least 2 components, got {}",
                components.len()
            )));
        }
        if components[0] != Self::ITEM_TYPE.tag() {
            return Err(CoreError::UnexpectedItemType {
                expected: Self::ITEM_TYPE,
                got: components[0].to_string(),
            });
        }

        let rest = components.len() - 2;
        let body_len = if rest > Self::MIN_BODY && rest - 1 <= Self::MAX_BODY {
            rest - 1
        } else if rest >= Self::MIN_BODY && rest <= Self::MAX_BODY {
            rest
        } else {
            return Err(CoreError::InvalidFormat(format!(
                "unexpected number of components for {}: {}",
                Self::ITEM_TYPE,
                components.len()
            )));
        };
        let signed = body_len < rest;

        let claims = ClaimsStore::from_json(&decode_base64_text(components[1])?)?;
        let signatures = if signed {
            Signature::decode_all(components[components.len() - 1])?
        } else {
            Vec::new()
        };
        let pre_signature = encoded[..components_end(encoded, 2 + body_len)].to_string();

        let core = ItemCore::decoded(Self::ITEM_TYPE, claims, signatures, pre_signature);
        Self::from_parts(core, &components[2..2 + body_len])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::KeyCapability;
    use chrono::Duration;

    fn sign_key() -> Key {
        Key::generate(&[KeyCapability::Sign], None).unwrap()
    }

    fn item() -> Key {
        Key::generate(&[KeyCapability::Exchange], None).unwrap()
    }

    #[test]
    fn test_item_type_tags() {
        for item_type in ItemType::ALL {
            assert_eq!(ItemType::from_tag(item_type.tag()), Some(item_type));
        }
        assert_eq!(ItemType::from_tag("id"), None);
    }

    #[test]
    fn test_signed_item_is_frozen() {
        let mut item = item();
        item.sign(&sign_key()).unwrap();
        assert!(matches!(
            item.put_claim(Claim::Ctx, "late"),
            Err(CoreError::ItemSigned)
        ));
        assert!(matches!(item.remove_claim(Claim::Iat), Err(CoreError::ItemSigned)));
    }

    #[test]
    fn test_strip_makes_item_mutable() {
        let mut item = item();
        let unsigned_thumbprint = item.thumbprint().unwrap();
        item.sign(&sign_key()).unwrap();
        assert_eq!(item.thumbprint().unwrap(), unsigned_thumbprint);

        item.strip();
        assert!(!item.is_signed());
        item.put_claim(Claim::Ctx, "changed").unwrap();
        assert_ne!(item.thumbprint().unwrap(), unsigned_thumbprint);
    }

    #[test]
    fn test_multiple_signatures() {
        let (a, b) = (sign_key(), sign_key());
        let mut item = item();
        item.sign(&a).unwrap();
        item.sign(&b).unwrap();
        assert_eq!(item.signatures().len(), 2);

        let decoded = Key::import(&item.export().unwrap()).unwrap();
        let ctx = VerifyContext::new();
        assert_eq!(decoded.verify(Some(&a), None, &ctx), IntegrityState::Complete);
        assert_eq!(decoded.verify(Some(&b), None, &ctx), IntegrityState::Complete);
    }

    #[test]
    fn test_duplicate_signature_rejected() {
        let key = sign_key();
        let mut item = item();
        item.sign(&key).unwrap();
        assert!(matches!(item.sign(&key), Err(CoreError::DuplicateSignature(_))));
    }

    #[test]
    fn test_sign_requires_secret_sign_key() {
        let mut item = item();
        let public = sign_key().public_copy().unwrap();
        assert!(matches!(item.sign(&public), Err(CoreError::MissingSecretKey)));

        let exchange = Key::generate(&[KeyCapability::Exchange], None).unwrap();
        assert!(matches!(
            item.sign(&exchange),
            Err(CoreError::CapabilityMismatch(_))
        ));
        assert!(!item.is_signed());
    }

    #[test]
    fn test_legacy_item_single_signature() {
        let key = sign_key();
        let mut item = item();
        item.sign(&key).unwrap();
        item.convert_to_legacy();
        assert!(item.is_legacy());
        assert!(!item.is_signed());

        item.sign(&key).unwrap();
        assert!(matches!(item.sign(&sign_key()), Err(CoreError::LegacyAlreadySigned)));

        let decoded = Key::import(&item.export().unwrap()).unwrap();
        assert!(decoded.is_legacy());
        assert_eq!(
            decoded.verify(Some(&key), None, &VerifyContext::new()),
            IntegrityState::Complete
        );
        assert_eq!(
            decoded.verify(Some(&sign_key()), None, &VerifyContext::new()),
            IntegrityState::FailedNotTrusted
        );
    }

    #[test]
    fn test_verify_outcomes() {
        let key = sign_key();
        let ctx = VerifyContext::new();
        let mut item = item();

        assert_eq!(item.verify(Some(&key), None, &ctx), IntegrityState::FailedNoSignature);
        item.sign(&key).unwrap();
        assert_eq!(item.verify(None, None, &ctx), IntegrityState::FailedNoKeyRing);
        assert_eq!(
            item.verify(Some(&sign_key()), None, &ctx),
            IntegrityState::FailedKeyMismatch
        );
        assert_eq!(item.verify(Some(&key), None, &ctx), IntegrityState::Complete);
    }

    #[test]
    fn test_verify_checks_dates_after_signature() {
        let key = sign_key();
        let mut item = item();
        item.put_claim(Claim::Exp, Utc::now() + Duration::minutes(1)).unwrap();
        item.sign(&key).unwrap();

        let later = VerifyContext::new().at(Utc::now() + Duration::hours(1));
        assert_eq!(
            item.verify(Some(&key), None, &later),
            IntegrityState::FailedUsedAfterExpired
        );

        let with_grace = later.with_grace_period(Duration::hours(2));
        assert_eq!(item.verify(Some(&key), None, &with_grace), IntegrityState::Complete);
    }

    #[test]
    fn test_add_item_link_replaces_same_id() {
        let target = item();
        let mut holder = item();
        holder.add_item_link(&target).unwrap();
        holder.add_item_link(&target).unwrap();
        assert_eq!(holder.item_links().unwrap().len(), 1);

        holder.set_item_links(&[]).unwrap();
        assert!(!holder.claims().contains(Claim::Lnk));
    }

    #[test]
    fn test_import_rejects_component_count() {
        assert!(matches!(Key::import("KEY"), Err(CoreError::InvalidFormat(_))));
        assert!(matches!(Key::import("KEY.a.b.c"), Err(CoreError::InvalidFormat(_))));
    }

    #[test]
    fn test_import_keeps_received_encoding() {
        let key = sign_key();
        let mut item = item();
        item.sign(&key).unwrap();
        let encoded = item.export().unwrap();

        let decoded = Key::import(&encoded).unwrap();
        assert_eq!(decoded.export().unwrap(), encoded);
        assert_eq!(decoded.thumbprint().unwrap(), item.thumbprint().unwrap());
    }
}
