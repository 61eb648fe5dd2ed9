//! Links from one item to another.
//!
//! A link pins an item by type, unique id and thumbprint, so a later change
//! to the linked item is detectable.

use std::collections::HashSet;
use std::fmt;

use uuid::Uuid;

use crate::canonical::COMPONENT_DELIMITER;
use crate::claim::Claim;
use crate::crypto::registry;
use crate::error::{CoreError, Result};
use crate::integrity::IntegrityState;
use crate::item::{Item, ItemType};

/// An immutable reference to an item as it was when linked.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemLink {
    item_type: ItemType,
    unique_id: Uuid,
    thumbprint: String,
    suite_name: String,
}

impl ItemLink {
    /// Capture a link to the item as it is now, using the default suite.
    pub fn new(item: &dyn Item) -> Result<Self> {
        let suite_name = registry().default_suite_name();
        Self::with_suite(item, &suite_name)
    }

    /// Capture a link with the thumbprint computed by the named suite.
    pub fn with_suite(item: &dyn Item, suite_name: &str) -> Result<Self> {
        let unique_id = item.unique_id().ok_or(CoreError::MissingClaim(Claim::Uid))?;
        Ok(Self {
            item_type: item.item_type(),
            unique_id,
            thumbprint: item.thumbprint_with(suite_name)?,
            suite_name: suite_name.to_string(),
        })
    }

    pub fn item_type(&self) -> ItemType {
        self.item_type
    }

    pub fn unique_id(&self) -> Uuid {
        self.unique_id
    }

    pub fn thumbprint(&self) -> &str {
        &self.thumbprint
    }

    pub fn suite_name(&self) -> &str {
        &self.suite_name
    }

    /// `TAG.uid.thumbprint.suite`
    pub fn to_encoded(&self) -> String {
        let d = COMPONENT_DELIMITER;
        format!(
            "{}{d}{}{d}{}{d}{}",
            self.item_type.tag(),
            self.unique_id,
            self.thumbprint,
            self.suite_name
        )
    }

    /// Parse an encoded link. The suite component is optional and defaults
    /// to the registry default.
    pub fn from_encoded(encoded: &str) -> Result<Self> {
        let parts: Vec<&str> = encoded.split(COMPONENT_DELIMITER).collect();
        let (tag, uid, thumbprint, suite_name) = match parts.as_slice() {
            [tag, uid, thumbprint] => (*tag, *uid, *thumbprint, registry().default_suite_name()),
            [tag, uid, thumbprint, suite] => (*tag, *uid, *thumbprint, suite.to_string()),
            _ => {
                return Err(CoreError::InvalidFormat(format!(
                    "item link has {} components",
                    parts.len()
                )))
            }
        };

        let item_type = ItemType::from_tag(tag)
            .ok_or_else(|| CoreError::InvalidFormat(format!("unknown item tag in link: {}", tag)))?;
        let unique_id = Uuid::parse_str(uid)
            .map_err(|e| CoreError::InvalidFormat(format!("item link id: {}", e)))?;
        if thumbprint.is_empty() || suite_name.is_empty() {
            return Err(CoreError::InvalidFormat("empty item link component".to_string()));
        }

        Ok(Self {
            item_type,
            unique_id,
            thumbprint: thumbprint.to_string(),
            suite_name,
        })
    }

    /// True if the item still matches this link.
    pub fn verify(&self, item: &dyn Item) -> bool {
        self.item_type == item.item_type()
            && Some(self.unique_id) == item.unique_id()
            && item
                .thumbprint_with(&self.suite_name)
                .map(|t| t == self.thumbprint)
                .unwrap_or(false)
    }

    /// Check that every item has exactly one matching link.
    pub fn verify_all(items: &[&dyn Item], links: &[ItemLink]) -> IntegrityState {
        if items.is_empty() || links.is_empty() {
            return IntegrityState::FailedLinkedItemFault;
        }

        let mut seen = HashSet::with_capacity(links.len());
        if !links.iter().all(|link| seen.insert(link.unique_id)) {
            return IntegrityState::FailedLinkedItemFault;
        }

        for item in items {
            let Some(id) = item.unique_id() else {
                return IntegrityState::FailedLinkedItemFault;
            };
            match links.iter().find(|link| link.unique_id == id) {
                None => return IntegrityState::FailedLinkedItemMissing,
                Some(link) if !link.verify(*item) => {
                    return IntegrityState::FailedLinkedItemMismatch
                }
                Some(_) => {}
            }
        }

        IntegrityState::ValidItemLinks
    }
}

impl fmt::Display for ItemLink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_encoded())
    }
}
