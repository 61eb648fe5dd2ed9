//! Key items.
//!
//! Key material lives in the `key` (secret) and `pub` (public) claims as
//! `Suite.encoded` strings. A string without a suite prefix belongs to the
//! legacy `STN` suite.

use chrono::Utc;
use uuid::Uuid;

use crate::capability::KeyCapability;
use crate::claim::Claim;
use crate::crypto::{registry, CryptoSuite, KeyMaterial, STN_SUITE};
use crate::error::{CoreError, Result};
use crate::item::{DecodeItem, Item, ItemCore, ItemType};

/// Split a key string into suite name and encoded bytes.
pub fn split_key_string(key: &str) -> (&str, &str) {
    key.split_once('.').unwrap_or((STN_SUITE, key))
}

fn decode_key_string(key: &str) -> Result<Vec<u8>> {
    let (suite, encoded) = split_key_string(key);
    registry().decode_key_bytes(encoded, Some(suite))
}

/// A signing, exchange or encryption key.
#[derive(Debug, Clone, PartialEq)]
pub struct Key {
    core: ItemCore,
}

impl Key {
    /// Generate a fresh key for one capability.
    pub fn generate(capabilities: &[KeyCapability], suite: Option<&str>) -> Result<Self> {
        registry().generate_key(capabilities, suite)
    }

    /// Wrap raw material produced by a suite.
    pub fn from_material(
        suite: &dyn CryptoSuite,
        capability: KeyCapability,
        material: &KeyMaterial,
    ) -> Result<Self> {
        let key_string = |bytes: &[u8]| format!("{}.{}", suite.name(), suite.encode_key_bytes(bytes));
        Self::from_key_strings(
            material.secret.as_deref().map(key_string).as_deref(),
            material.public.as_deref().map(key_string).as_deref(),
            &[capability],
        )
    }

    /// Build a key from `Suite.encoded` strings.
    pub fn from_key_strings(
        secret: Option<&str>,
        public: Option<&str>,
        capabilities: &[KeyCapability],
    ) -> Result<Self> {
        if secret.is_none() && public.is_none() {
            return Err(CoreError::MissingPublicKey);
        }

        let mut key = Self {
            core: ItemCore::new(ItemType::Key),
        };
        key.put_claim(Claim::Uid, Uuid::new_v4())?;
        key.put_claim(Claim::Iat, Utc::now())?;
        key.put_claim(Claim::Use, capabilities)?;
        if let Some(secret) = secret {
            decode_key_string(secret)?;
            key.put_claim(Claim::Key, secret)?;
        }
        if let Some(public) = public {
            decode_key_string(public)?;
            key.put_claim(Claim::Pub, public)?;
        }
        Ok(key)
    }

    /// What the key may be used for.
    pub fn capabilities(&self) -> Vec<KeyCapability> {
        self.claims().key_capabilities()
    }

    pub fn has_capability(&self, capability: KeyCapability) -> bool {
        self.capabilities().contains(&capability)
    }

    /// The secret key string.
    pub fn secret(&self) -> Option<&str> {
        self.claims().get_str(Claim::Key)
    }

    /// The public key string.
    pub fn public(&self) -> Option<&str> {
        self.claims().get_str(Claim::Pub)
    }

    /// Name of the suite the key material belongs to.
    pub fn suite_name(&self) -> Result<String> {
        self.secret()
            .or_else(|| self.public())
            .map(|key| split_key_string(key).0.to_string())
            .ok_or(CoreError::MissingPublicKey)
    }

    pub fn secret_bytes(&self) -> Result<Option<Vec<u8>>> {
        self.secret().map(decode_key_string).transpose()
    }

    pub fn public_bytes(&self) -> Result<Option<Vec<u8>>> {
        self.public().map(decode_key_string).transpose()
    }

    /// The key name signatures are filed under.
    pub fn name(&self) -> Result<String> {
        registry().generate_key_name(self)
    }

    /// A copy holding only the public half. Keeps the unique id.
    pub fn public_copy(&self) -> Result<Self> {
        let public = self.public().ok_or(CoreError::MissingPublicKey)?;
        let mut copy = Self {
            core: ItemCore::new(ItemType::Key),
        };
        for claim in [Claim::Uid, Claim::Iat, Claim::Exp, Claim::Iss, Claim::Ctx] {
            if let Some(value) = self.claims().get(claim) {
                copy.put_claim(claim, value.clone())?;
            }
        }
        copy.put_claim(Claim::Use, self.capabilities().as_slice())?;
        copy.put_claim(Claim::Pub, public)?;
        Ok(copy)
    }

    /// True if both keys carry the same public material.
    pub fn same_public(&self, other: &Key) -> bool {
        matches!(
            (self.public_bytes(), other.public_bytes()),
            (Ok(Some(a)), Ok(Some(b))) if a == b
        )
    }
}

impl Item for Key {
    fn core(&self) -> &ItemCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ItemCore {
        &mut self.core
    }
}

impl DecodeItem for Key {
    const ITEM_TYPE: ItemType = ItemType::Key;

    fn from_parts(core: ItemCore, _body: &[&str]) -> Result<Self> {
        let claims = core.claims();
        if !claims.contains(Claim::Key) && !claims.contains(Claim::Pub) {
            return Err(CoreError::MissingClaim(Claim::Pub));
        }
        Ok(Self { core })
    }
}
