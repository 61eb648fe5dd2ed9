//! The current default suite.

use super::CryptoSuite;
use crate::canonical::{decode_base64, encode_base64};
use crate::error::Result;

/// Name of the default suite.
pub const NACL_SUITE: &str = "NaCl";

/// Ed25519 / X25519 / XChaCha20-Poly1305 with BLAKE3 and Base64 key text.
#[derive(Debug, Clone, Copy, Default)]
pub struct NaclSuite;

impl CryptoSuite for NaclSuite {
    fn name(&self) -> &str {
        NACL_SUITE
    }

    fn hash(&self, data: &[u8]) -> Vec<u8> {
        blake3::hash(data).as_bytes().to_vec()
    }

    fn encode_key_bytes(&self, bytes: &[u8]) -> String {
        encode_base64(bytes)
    }

    fn decode_key_bytes(&self, encoded: &str) -> Result<Vec<u8>> {
        decode_base64(encoded)
    }
}
