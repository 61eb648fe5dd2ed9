//! Data items: an issuer-attributed payload with a MIME type.

use bytes::Bytes;
use chrono::{Duration, Utc};
use uuid::Uuid;

use crate::canonical::{decode_base64, encode_base64};
use crate::claim::{expires_after, Claim};
use crate::error::{CoreError, Result};
use crate::item::{DecodeItem, Item, ItemCore, ItemType};

#[derive(Debug, Clone, PartialEq)]
pub struct Data {
    core: ItemCore,
    payload: Bytes,
}

impl Data {
    /// A new, empty data item issued by `issuer_id`.
    pub fn new(issuer_id: Uuid, valid_for: Option<Duration>, context: Option<&str>) -> Result<Self> {
        let mut data = Self {
            core: ItemCore::new(ItemType::Data),
            payload: Bytes::new(),
        };
        let now = Utc::now();
        data.put_claim(Claim::Uid, Uuid::new_v4())?;
        data.put_claim(Claim::Iat, now)?;
        data.put_claim(Claim::Iss, issuer_id)?;
        if let Some(valid_for) = valid_for {
            data.put_claim(Claim::Exp, expires_after(now, valid_for)?)?;
        }
        if let Some(context) = context {
            data.put_claim(Claim::Ctx, context)?;
        }
        Ok(data)
    }

    /// Replace the payload. Fails once signed.
    pub fn set_payload(&mut self, payload: impl Into<Bytes>, mime_type: Option<&str>) -> Result<()> {
        self.core.begin_mutation()?;
        self.payload = payload.into();
        match mime_type {
            Some(mime) => self.put_claim(Claim::Mim, mime),
            None => self.remove_claim(Claim::Mim).map(|_| ()),
        }
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn mime_type(&self) -> Option<&str> {
        self.claims().get_str(Claim::Mim)
    }
}

impl Item for Data {
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
            return Err(CoreError::InvalidState("data item has no payload".to_string()));
        }
        Ok(())
    }
}

impl DecodeItem for Data {
    const ITEM_TYPE: ItemType = ItemType::Data;
    const MIN_BODY: usize = 1;
    const MAX_BODY: usize = 1;

    fn from_parts(core: ItemCore, body: &[&str]) -> Result<Self> {
        let payload = decode_base64(body[0])?;
        if payload.is_empty() {
            return Err(CoreError::InvalidFormat("data item has no payload".to_string()));
        }
        Ok(Self {
            core,
            payload: Bytes::from(payload),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capability::KeyCapability;
    use crate::context::VerifyContext;
    use crate::integrity::IntegrityState;
    use crate::key::Key;

    #[test]
    fn test_validity_out_of_range() {
        let result = Data::new(Uuid::new_v4(), Some(Duration::days(100_000_000)), None);
        assert!(matches!(
            result,
            Err(CoreError::InvalidClaim { claim: Claim::Exp, .. })
        ));
    }

    #[test]
    fn test_new_data_claims() {
        let issuer = Uuid::new_v4();
        let data = Data::new(issuer, Some(Duration::hours(1)), Some("ctx")).unwrap();
        assert_eq!(data.issuer_id(), Some(issuer));
        assert_eq!(data.context(), Some("ctx"));
        assert!(data.expires_at().unwrap() > data.issued_at().unwrap());
    }

    #[test]
    fn test_export_requires_payload() {
        let data = Data::new(Uuid::new_v4(), None, None).unwrap();
        assert!(matches!(data.export(), Err(CoreError::InvalidState(_))));
    }

    #[test]
    fn test_signed_roundtrip() {
        let key = Key::generate(&[KeyCapability::Sign], None).unwrap();
        let mut data = Data::new(Uuid::new_v4(), Some(Duration::minutes(5)), None).unwrap();
        data.set_payload(&b"racecar"[..], Some("text/plain")).unwrap();
        data.sign(&key).unwrap();

        let encoded = data.export().unwrap();
        assert_eq!(encoded.split('.').count(), 4);

        let decoded = Data::import(&encoded).unwrap();
        assert_eq!(decoded.payload().as_ref(), b"racecar");
        assert_eq!(decoded.mime_type(), Some("text/plain"));
        assert_eq!(
            decoded.verify(Some(&key), None, &VerifyContext::new()),
            IntegrityState::Complete
        );
    }

    #[test]
    fn test_payload_frozen_after_signing() {
        let key = Key::generate(&[KeyCapability::Sign], None).unwrap();
        let mut data = Data::new(Uuid::new_v4(), None, None).unwrap();
        data.set_payload(&b"one"[..], None).unwrap();
        data.sign(&key).unwrap();
        assert!(matches!(
            data.set_payload(&b"two"[..], None),
            Err(CoreError::ItemSigned)
        ));
    }

    #[test]
    fn test_tampered_payload_fails_verification() {
        let key = Key::generate(&[KeyCapability::Sign], None).unwrap();
        let mut data = Data::new(Uuid::new_v4(), None, None).unwrap();
        data.set_payload(&b"original"[..], None).unwrap();
        data.sign(&key).unwrap();

        let encoded = data.export().unwrap();
        let mut parts: Vec<String> = encoded.split('.').map(String::from).collect();
        parts[2] = encode_base64(b"tampered");
        let decoded = Data::import(&parts.join(".")).unwrap();

        assert_eq!(decoded.verify_signature(&key), IntegrityState::FailedNotTrusted);
    }
}
