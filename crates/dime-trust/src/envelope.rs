//! Envelopes: several items exported as one, optionally signed.
//!
//! ```text
//! Di[.claims]:item:item[:signatures]
//! ```
//!
//! Items always contain a `.`, a signature block never does, which is how
//! the final section is told apart. Envelopes do not nest.

use chrono::Utc;
use uuid::Uuid;

use dime_core::canonical::{decode_base64_text, encode_base64, COMPONENT_DELIMITER, SECTION_DELIMITER};
use dime_core::{
    Claim, ClaimsStore, CoreError, Data, DecodeItem, Item, ItemCore, ItemType, Key, Message, Signature, Tag,
};

use crate::identity::Identity;
use crate::request::IdentityIssuingRequest;

/// Any item that can travel inside an envelope.
#[derive(Debug, Clone, PartialEq)]
pub enum AnyItem {
    Identity(Identity),
    IdentityIssuingRequest(IdentityIssuingRequest),
    Key(Key),
    Data(Data),
    Tag(Tag),
    Message(Message),
}

impl AnyItem {
    /// Decode an exported item of any kind except envelopes.
    pub fn import(encoded: &str) -> dime_core::Result<Self> {
        let tag = encoded.split(COMPONENT_DELIMITER).next().unwrap_or_default();
        match ItemType::from_tag(tag) {
            Some(ItemType::Identity) => Identity::import(encoded).map(Self::Identity),
            Some(ItemType::IdentityIssuingRequest) => {
                IdentityIssuingRequest::import(encoded).map(Self::IdentityIssuingRequest)
            }
            Some(ItemType::Key) => Key::import(encoded).map(Self::Key),
            Some(ItemType::Data) => Data::import(encoded).map(Self::Data),
            Some(ItemType::Tag) => Tag::import(encoded).map(Self::Tag),
            Some(ItemType::Message) => Message::import(encoded).map(Self::Message),
            Some(ItemType::Envelope) => Err(CoreError::InvalidFormat(
                "envelopes cannot be nested".to_string(),
            )),
            None => Err(CoreError::InvalidFormat(format!("unknown item tag: {}", tag))),
        }
    }

    pub fn as_item(&self) -> &dyn Item {
        match self {
            Self::Identity(item) => item,
            Self::IdentityIssuingRequest(item) => item,
            Self::Key(item) => item,
            Self::Data(item) => item,
            Self::Tag(item) => item,
            Self::Message(item) => item,
        }
    }

    pub fn as_item_mut(&mut self) -> &mut dyn Item {
        match self {
            Self::Identity(item) => item,
            Self::IdentityIssuingRequest(item) => item,
            Self::Key(item) => item,
            Self::Data(item) => item,
            Self::Tag(item) => item,
            Self::Message(item) => item,
        }
    }

    pub fn item_type(&self) -> ItemType {
        self.as_item().item_type()
    }
}

macro_rules! any_item_from {
    ($($variant:ident),*) => {
        $(
            impl From<$variant> for AnyItem {
                fn from(item: $variant) -> Self {
                    Self::$variant(item)
                }
            }
        )*
    };
}

any_item_from!(Identity, IdentityIssuingRequest, Key, Data, Tag, Message);

/// A bundle of items.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    core: ItemCore,
    items: Vec<AnyItem>,
}

impl Envelope {
    /// An anonymous envelope: no claims.
    pub fn new() -> Self {
        Self {
            core: ItemCore::new(ItemType::Envelope),
            items: Vec::new(),
        }
    }

    /// An envelope attributed to `issuer_id`.
    pub fn with_issuer(issuer_id: Uuid, context: Option<&str>) -> dime_core::Result<Self> {
        let mut envelope = Self::new();
        envelope.put_claim(Claim::Uid, Uuid::new_v4())?;
        envelope.put_claim(Claim::Iat, Utc::now())?;
        envelope.put_claim(Claim::Iss, issuer_id)?;
        if let Some(context) = context {
            envelope.put_claim(Claim::Ctx, context)?;
        }
        Ok(envelope)
    }

    pub fn is_anonymous(&self) -> bool {
        self.claims().is_empty()
    }

    pub fn items(&self) -> &[AnyItem] {
        &self.items
    }

    pub fn into_items(self) -> Vec<AnyItem> {
        self.items
    }

    /// Add an item. Fails once signed.
    pub fn add_item(&mut self, item: impl Into<AnyItem>) -> dime_core::Result<()> {
        self.core.begin_mutation()?;
        self.items.push(item.into());
        Ok(())
    }

    /// Decode an exported envelope.
    pub fn import(encoded: &str) -> dime_core::Result<Self> {
        let sections: Vec<&str> = encoded.split(SECTION_DELIMITER).collect();

        let header: Vec<&str> = sections[0].split(COMPONENT_DELIMITER).collect();
        if header[0] != ItemType::Envelope.tag() {
            return Err(CoreError::UnexpectedItemType {
                expected: ItemType::Envelope,
                got: header[0].to_string(),
            });
        }
        let claims = match header.as_slice() {
            [_] => ClaimsStore::new(),
            [_, claims] => ClaimsStore::from_json(&decode_base64_text(claims)?)?,
            _ => {
                return Err(CoreError::InvalidFormat(
                    "envelope header has too many components".to_string(),
                ))
            }
        };

        let last = sections[sections.len() - 1];
        let signed = sections.len() > 2 && !last.contains(COMPONENT_DELIMITER);
        let item_sections = if signed {
            &sections[1..sections.len() - 1]
        } else {
            &sections[1..]
        };
        if item_sections.is_empty() {
            return Err(CoreError::InvalidFormat("envelope holds no items".to_string()));
        }

        let items = item_sections
            .iter()
            .map(|section| AnyItem::import(section))
            .collect::<dime_core::Result<Vec<_>>>()?;

        let (pre_signature, signatures) = if signed {
            let end = encoded.len() - last.len() - 1;
            (encoded[..end].to_string(), Signature::decode_all(last)?)
        } else {
            (encoded.to_string(), Vec::new())
        };

        Ok(Self {
            core: ItemCore::decoded(ItemType::Envelope, claims, signatures, pre_signature),
            items,
        })
    }
}

impl Default for Envelope {
    fn default() -> Self {
        Self::new()
    }
}

impl Item for Envelope {
    fn core(&self) -> &ItemCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ItemCore {
        &mut self.core
    }

    fn signature_delimiter(&self) -> char {
        SECTION_DELIMITER
    }

    fn validate_export(&self) -> dime_core::Result<()> {
        if self.items.is_empty() {
            return Err(CoreError::InvalidState("envelope holds no items".to_string()));
        }
        Ok(())
    }

    fn pre_signature_encoding(&self) -> dime_core::Result<String> {
        if let Some(encoded) = self.core.cached_encoding() {
            return Ok(encoded.to_string());
        }
        if self.items.is_empty() {
            return Err(CoreError::InvalidState("envelope holds no items".to_string()));
        }

        let mut encoded = ItemType::Envelope.tag().to_string();
        if !self.is_anonymous() {
            encoded.push(COMPONENT_DELIMITER);
            encoded.push_str(&encode_base64(self.claims().to_canonical_json()?));
        }
        for item in &self.items {
            encoded.push(SECTION_DELIMITER);
            encoded.push_str(&item.as_item().export()?);
        }
        Ok(encoded)
    }
}
