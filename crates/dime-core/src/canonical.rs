//! Canonical text encoding for DiME items.
//!
//! An exported item is a sequence of components joined by
//! [`COMPONENT_DELIMITER`]:
//!
//! ```text
//! TAG . base64(canonical claims JSON) [. kind components] [. signature block]
//! ```
//!
//! Claims are serialized with RFC 8785 (JSON Canonicalization Scheme) so that
//! the same claim set always produces the same bytes, and thus the same
//! thumbprint and signature input, on every platform.
//!
//! Binary segments use unpadded standard Base64. Padding is accepted on
//! decode.

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use serde::Serialize;

use crate::error::{CoreError, Result};

/// Separates the components of an item.
pub const COMPONENT_DELIMITER: char = '.';

/// Separates sections: envelope entries and signature block entries.
pub const SECTION_DELIMITER: char = ':';

const BASE64: GeneralPurpose = GeneralPurpose::new(
    &alphabet::STANDARD,
    GeneralPurposeConfig::new()
        .with_encode_padding(false)
        .with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

/// Serialize a value to canonical JSON.
pub fn canonical_json<T: Serialize>(value: &T) -> Result<String> {
    serde_jcs::to_string(value).map_err(|e| CoreError::EncodingError(e.to_string()))
}

/// Encode bytes as unpadded Base64.
pub fn encode_base64(bytes: impl AsRef<[u8]>) -> String {
    BASE64.encode(bytes)
}

/// Decode Base64, with or without padding.
pub fn decode_base64(encoded: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(encoded)
        .map_err(|e| CoreError::DecodingError(format!("base64: {}", e)))
}

/// Decode a Base64 segment that must contain UTF-8 text.
pub fn decode_base64_text(encoded: &str) -> Result<String> {
    let bytes = decode_base64(encoded)?;
    String::from_utf8(bytes).map_err(|e| CoreError::DecodingError(format!("utf-8: {}", e)))
}

/// Split an encoded item into its components.
pub fn split_components(encoded: &str) -> Vec<&str> {
    encoded.split(COMPONENT_DELIMITER).collect()
}

/// Join components with [`COMPONENT_DELIMITER`].
pub fn join_components<S: AsRef<str>>(components: &[S]) -> String {
    let mut joined = String::new();
    for (i, component) in components.iter().enumerate() {
        if i > 0 {
            joined.push(COMPONENT_DELIMITER);
        }
        joined.push_str(component.as_ref());
    }
    joined
}

/// Byte offset of the end of the first `count` components.
///
/// Used to slice the received pre-signature encoding out of an exported item
/// without re-encoding it.
pub fn components_end(encoded: &str, count: usize) -> usize {
    if count == 0 {
        return 0;
    }
    encoded
        .match_indices(COMPONENT_DELIMITER)
        .nth(count - 1)
        .map(|(idx, _)| idx)
        .unwrap_or(encoded.len())
}
