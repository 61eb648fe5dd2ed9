//! Tag items: an issuer's signed acknowledgement of other items.

use chrono::Utc;
use uuid::Uuid;

use crate::claim::Claim;
use crate::error::Result;
use crate::item::{DecodeItem, Item, ItemCore, ItemType};

#[derive(Debug, Clone, PartialEq)]
pub struct Tag {
    core: ItemCore,
}

impl Tag {
    /// A tag issued by `issuer_id`, linking `items`.
    pub fn new(issuer_id: Uuid, context: Option<&str>, items: &[&dyn Item]) -> Result<Self> {
        let mut tag = Self {
            core: ItemCore::new(ItemType::Tag),
        };
        tag.put_claim(Claim::Uid, Uuid::new_v4())?;
        tag.put_claim(Claim::Iat, Utc::now())?;
        tag.put_claim(Claim::Iss, issuer_id)?;
        if let Some(context) = context {
            tag.put_claim(Claim::Ctx, context)?;
        }
        if !items.is_empty() {
            tag.set_item_links(items)?;
        }
        Ok(tag)
    }
}

impl Item for Tag {
    fn core(&self) -> &ItemCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ItemCore {
        &mut self.core
    }
}

impl DecodeItem for Tag {
    const ITEM_TYPE: ItemType = ItemType::Tag;

    fn from_parts(core: ItemCore, _body: &[&str]) -> Result<Self> {
        Ok(Self { core })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::KeyCapability;
    use crate::context::VerifyContext;
    use crate::data::Data;
    use crate::integrity::IntegrityState;
    use crate::key::Key;

    fn data_item(payload: &'static [u8]) -> Data {
        let mut data = Data::new(Uuid::new_v4(), None, None).unwrap();
        data.set_payload(payload, None).unwrap();
        data
    }

    #[test]
    fn test_tag_links_items() {
        let key = Key::generate(&[KeyCapability::Sign], None).unwrap();
        let a = data_item(b"a");
        let b = data_item(b"b");

        let mut tag = Tag::new(Uuid::new_v4(), Some("ack"), &[&a, &b]).unwrap();
        tag.sign(&key).unwrap();

        let decoded = Tag::import(&tag.export().unwrap()).unwrap();
        assert_eq!(decoded.item_links().unwrap().len(), 2);
        let linked: [&dyn Item; 2] = [&a, &b];
        assert_eq!(
            decoded.verify(Some(&key), Some(&linked[..]), &VerifyContext::new()),
            IntegrityState::Complete
        );
    }

    #[test]
    fn test_tag_detects_changed_item() {
        let key = Key::generate(&[KeyCapability::Sign], None).unwrap();
        let mut a = data_item(b"a");
        let mut tag = Tag::new(Uuid::new_v4(), None, &[&a]).unwrap();
        tag.sign(&key).unwrap();

        a.set_payload(&b"changed"[..], None).unwrap();
        let linked: [&dyn Item; 1] = [&a];
        assert_eq!(
            tag.verify(Some(&key), Some(&linked[..]), &VerifyContext::new()),
            IntegrityState::FailedLinkedItemMismatch
        );
    }

    #[test]
    fn test_tag_reports_unlinked_item() {
        let key = Key::generate(&[KeyCapability::Sign], None).unwrap();
        let a = data_item(b"a");
        let other = data_item(b"other");
        let mut tag = Tag::new(Uuid::new_v4(), None, &[&a]).unwrap();
        tag.sign(&key).unwrap();

        let linked: [&dyn Item; 1] = [&other];
        assert_eq!(
            tag.verify(Some(&key), Some(&linked[..]), &VerifyContext::new()),
            IntegrityState::FailedLinkedItemMissing
        );
    }
}
