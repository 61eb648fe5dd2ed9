//! Message items: a payload addressed to an audience, optionally encrypted.
//!
//! Encryption derives a shared secret from the issuer's exchange key and the
//! audience's exchange key. The issuer's public exchange key travels in the
//! `pub` claim and the audience key's id in `kid`.

use bytes::Bytes;
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::canonical::{decode_base64, encode_base64};
use crate::capability::KeyCapability;
use crate::claim::{expires_after, Claim};
use crate::crypto::registry;
use crate::error::{CoreError, Result};
use crate::item::{DecodeItem, Item, ItemCore, ItemType};
use crate::key::Key;

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    core: ItemCore,
    payload: Bytes,
}

impl Message {
    /// A new, empty message from `issuer_id`, optionally addressed to
    /// `audience_id`.
    pub fn new(
        audience_id: Option<Uuid>,
        issuer_id: Uuid,
        valid_for: Option<Duration>,
        context: Option<&str>,
    ) -> Result<Self> {
        let mut message = Self {
            core: ItemCore::new(ItemType::Message),
            payload: Bytes::new(),
        };
        let now = Utc::now();
        message.put_claim(Claim::Uid, Uuid::new_v4())?;
        message.put_claim(Claim::Iat, now)?;
        message.put_claim(Claim::Iss, issuer_id)?;
        if let Some(audience_id) = audience_id {
            message.put_claim(Claim::Aud, audience_id)?;
        }
        if let Some(valid_for) = valid_for {
            message.put_claim(Claim::Exp, expires_after(now, valid_for)?)?;
        }
        if let Some(context) = context {
            message.put_claim(Claim::Ctx, context)?;
        }
        Ok(message)
    }

    pub fn audience_id(&self) -> Option<Uuid> {
        self.claims().get_uuid(Claim::Aud)
    }

    pub fn key_id(&self) -> Option<Uuid> {
        self.claims().get_uuid(Claim::Kid)
    }

    /// The issuer's public exchange key, if the payload is encrypted.
    pub fn public_key(&self) -> Option<&str> {
        self.claims().get_str(Claim::Pub)
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    /// Set a plaintext payload. Fails once signed.
    pub fn set_payload(&mut self, payload: impl Into<Bytes>) -> Result<()> {
        self.core.begin_mutation()?;
        self.payload = payload.into();
        Ok(())
    }

    /// Encrypt `payload` for the holder of `remote_key`.
    ///
    /// `local_key` is the issuer's exchange key with secret material;
    /// `remote_key` is the audience's exchange key.
    pub fn encrypt_payload(&mut self, payload: &[u8], local_key: &Key, remote_key: &Key) -> Result<()> {
        self.core.begin_mutation()?;
        let remote_public = remote_key.public_copy()?;
        let shared = registry().generate_shared_secret(local_key, &remote_public, &[KeyCapability::Encrypt])?;
        let sealed = registry().encrypt(payload, &shared)?;

        let issuer_public = local_key.public().ok_or(CoreError::MissingPublicKey)?;
        self.put_claim(Claim::Pub, issuer_public)?;
        match remote_key.unique_id() {
            Some(kid) => self.put_claim(Claim::Kid, kid)?,
            None => {
                self.remove_claim(Claim::Kid)?;
            }
        }
        self.payload = Bytes::from(sealed);
        Ok(())
    }

    /// Decrypt the payload with one side's secret exchange key and the other
    /// side's public exchange key. Works for both issuer and audience.
    pub fn decrypt_payload(&self, local_key: &Key, remote_key: &Key) -> Result<Vec<u8>> {
        let issuer_public = self.public_key().ok_or(CoreError::MissingClaim(Claim::Pub))?;
        let issuer_public = Key::from_key_strings(None, Some(issuer_public), &[KeyCapability::Exchange])?;
        let remote_public = remote_key.public_copy()?;

        let caps = [KeyCapability::Encrypt];
        let shared = if local_key.same_public(&issuer_public) {
            registry().generate_shared_secret(local_key, &remote_public, &caps)?
        } else {
            registry().generate_shared_secret(&remote_public, local_key, &caps)?
        };
        registry().decrypt(&self.payload, &shared)
    }
}

impl Item for Message {
    fn core(&self) -> &ItemCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ItemCore {
        &mut self.core
    }

    fn body_components(&self) -> Result<Vec<String>> {
        Ok(vec![encode_base64(&self.payload)])
    }

    fn validate_export(&self) -> Result<()> {
        if self.payload.is_empty() {
            return Err(CoreError::InvalidState("message has no payload".to_string()));
        }
        Ok(())
    }
}

impl DecodeItem for Message {
    const ITEM_TYPE: ItemType = ItemType::Message;
    const MIN_BODY: usize = 1;
    const MAX_BODY: usize = 1;

    fn from_parts(core: ItemCore, body: &[&str]) -> Result<Self> {
        let payload = decode_base64(body[0])?;
        if payload.is_empty() {
            return Err(CoreError::InvalidFormat("message has no payload".to_string()));
        }
        Ok(Self {
            core,
            payload: Bytes::from(payload),
        })
    }
}
