//! Legacy suites, kept so older items and keys still decode and verify.
//!
//! Both use Base58 key text. Key strings with no suite prefix belong to
//! [`STN_SUITE`].

use multibase::Base;
use sha2::{Digest, Sha256};

use super::CryptoSuite;
use crate::error::{CoreError, Result};

/// Name of the BLAKE3 legacy suite.
pub const DSC_SUITE: &str = "DSC";

/// Name of the SHA-256 legacy suite.
pub const STN_SUITE: &str = "STN";

fn encode_base58(bytes: &[u8]) -> String {
    Base::Base58Btc.encode(bytes)
}

fn decode_base58(encoded: &str) -> Result<Vec<u8>> {
    Base::Base58Btc
        .decode(encoded)
        .map_err(|e| CoreError::DecodingError(format!("base58: {}", e)))
}

/// Legacy suite hashing with BLAKE3.
#[derive(Debug, Clone, Copy, Default)]
pub struct DscSuite;

impl CryptoSuite for DscSuite {
    fn name(&self) -> &str {
        DSC_SUITE
    }

    fn hash(&self, data: &[u8]) -> Vec<u8> {
        blake3::hash(data).as_bytes().to_vec()
    }

    fn encode_key_bytes(&self, bytes: &[u8]) -> String {
        encode_base58(bytes)
    }

    fn decode_key_bytes(&self, encoded: &str) -> Result<Vec<u8>> {
        decode_base58(encoded)
    }
}

/// Legacy suite hashing with SHA-256.
#[derive(Debug, Clone, Copy, Default)]
pub struct StnSuite;

impl CryptoSuite for StnSuite {
    fn name(&self) -> &str {
        STN_SUITE
    }

    fn hash(&self, data: &[u8]) -> Vec<u8> {
        Sha256::digest(data).to_vec()
    }

    fn encode_key_bytes(&self, bytes: &[u8]) -> String {
        encode_base58(bytes)
    }

    fn decode_key_bytes(&self, encoded: &str) -> Result<Vec<u8>> {
        decode_base58(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stn_hash_is_sha256() {
        let digest = StnSuite.hash(b"abc");
        assert_eq!(
            hex::encode(digest),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_suites_name_keys_differently() {
        let bytes = b"some public key";
        assert_ne!(StnSuite.generate_key_name(bytes), DscSuite.generate_key_name(bytes));
    }

    #[test]
    fn test_base58_text() {
        let text = DscSuite.encode_key_bytes(&[0, 1, 2, 255]);
        assert!(!text.contains('+') && !text.contains('/'));
        assert_eq!(DscSuite.decode_key_bytes(&text).unwrap(), vec![0, 1, 2, 255]);
        assert!(DscSuite.decode_key_bytes("0OIl").is_err());
    }
}
