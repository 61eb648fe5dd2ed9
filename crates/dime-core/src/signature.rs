//! Item signatures and the signature block.
//!
//! Current items carry any number of named signatures, encoded as
//! `keyName.hex(bytes)` entries joined by `:` with the whole block in
//! Base64. Legacy items carry one unnamed signature, encoded as the bare
//! Base64 of its bytes.

use crate::canonical::{decode_base64, encode_base64, COMPONENT_DELIMITER, SECTION_DELIMITER};
use crate::error::{CoreError, Result};

/// One signature over an item's pre-signature encoding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Signature {
    /// Single unnamed signature of a legacy item.
    Legacy(Vec<u8>),
    /// Signature identified by the signer's key name.
    Named { key_name: String, bytes: Vec<u8> },
}

impl Signature {
    /// A named signature.
    pub fn named(key_name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self::Named {
            key_name: key_name.into(),
            bytes,
        }
    }

    /// The signer's key name, if recorded.
    pub fn key_name(&self) -> Option<&str> {
        match self {
            Self::Legacy(_) => None,
            Self::Named { key_name, .. } => Some(key_name),
        }
    }

    /// The raw signature bytes.
    pub fn bytes(&self) -> &[u8] {
        match self {
            Self::Legacy(bytes) => bytes,
            Self::Named { bytes, .. } => bytes,
        }
    }

    pub fn is_legacy(&self) -> bool {
        matches!(self, Self::Legacy(_))
    }

    /// The first signature made by the named key.
    pub fn find<'a>(signatures: &'a [Signature], key_name: &str) -> Option<&'a Signature> {
        signatures.iter().find(|s| s.key_name() == Some(key_name))
    }

    /// Encode a signature block.
    pub fn encode_all(signatures: &[Signature]) -> Result<String> {
        match signatures {
            [] => Err(CoreError::InvalidState("no signatures to encode".to_string())),
            [Signature::Legacy(bytes)] => Ok(encode_base64(bytes)),
            _ => {
                let mut entries = Vec::with_capacity(signatures.len());
                for signature in signatures {
                    match signature {
                        Signature::Named { key_name, bytes } => {
                            entries.push(format!("{}{}{}", key_name, COMPONENT_DELIMITER, hex::encode(bytes)))
                        }
                        Signature::Legacy(_) => return Err(CoreError::LegacyAlreadySigned),
                    }
                }
                let separator = SECTION_DELIMITER.to_string();
                Ok(encode_base64(entries.join(separator.as_str())))
            }
        }
    }

    /// Decode a signature block.
    ///
    /// A block that does not parse as named entries is taken to be a single
    /// legacy signature.
    pub fn decode_all(encoded: &str) -> Result<Vec<Signature>> {
        let bytes = decode_base64(encoded)?;
        if bytes.is_empty() {
            return Err(CoreError::DecodingError("empty signature block".to_string()));
        }
        match parse_named(&bytes) {
            Some(signatures) => Ok(signatures),
            None => Ok(vec![Signature::Legacy(bytes)]),
        }
    }
}

fn parse_named(bytes: &[u8]) -> Option<Vec<Signature>> {
    let text = std::str::from_utf8(bytes).ok()?;
    text.split(SECTION_DELIMITER)
        .map(|entry| {
            let (key_name, sig_hex) = entry.split_once(COMPONENT_DELIMITER)?;
            if key_name.is_empty() || sig_hex.is_empty() {
                return None;
            }
            let bytes = hex::decode(sig_hex).ok()?;
            Some(Signature::named(key_name, bytes))
        })
        .collect()
}
