//! Pluggable cryptographic suites.
//!
//! A suite works on raw key bytes; the [`CryptoRegistry`] resolves suites by
//! name and wraps them in the capability checks that operate on [`Key`]
//! items.
//!
//! [`Key`]: crate::key::Key

mod legacy;
mod nacl;
mod primitives;
mod registry;

pub use legacy::{DscSuite, StnSuite, DSC_SUITE, STN_SUITE};
pub use nacl::{NaclSuite, NACL_SUITE};
pub use registry::{registry, CryptoRegistry};

use crate::capability::KeyCapability;
use crate::error::Result;

/// Number of hash bytes that make up a key name.
pub const KEY_NAME_LEN: usize = 8;

/// Raw key bytes produced by a suite.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct KeyMaterial {
    /// Secret bytes (signing seed, exchange secret or symmetric key).
    pub secret: Option<Vec<u8>>,
    /// Public bytes, absent for symmetric keys.
    pub public: Option<Vec<u8>>,
}

impl std::fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("secret", &self.secret.as_ref().map(|_| "<redacted>"))
            .field("public", &self.public.as_ref().map(hex::encode))
            .finish()
    }
}

/// A named implementation of the cryptographic operations items need.
///
/// The built-in suites share Ed25519, X25519 and XChaCha20-Poly1305 and only
/// differ in their hash and key text encoding, so those are the required
/// methods. A suite built on other primitives overrides the rest.
pub trait CryptoSuite: Send + Sync {
    /// Registry name, also used as the key string prefix.
    fn name(&self) -> &str;

    /// Hash arbitrary data.
    fn hash(&self, data: &[u8]) -> Vec<u8>;

    /// Encode key bytes for use in a key string.
    fn encode_key_bytes(&self, bytes: &[u8]) -> String;

    /// Decode key bytes from a key string.
    fn decode_key_bytes(&self, encoded: &str) -> Result<Vec<u8>>;

    /// Derive the name of a key from its identifying bytes.
    fn generate_key_name(&self, bytes: &[u8]) -> String {
        let digest = self.hash(bytes);
        hex::encode(&digest[..KEY_NAME_LEN.min(digest.len())])
    }

    /// Sign data with a secret signing key.
    fn sign(&self, data: &[u8], secret: &[u8]) -> Result<Vec<u8>> {
        primitives::sign(secret, data)
    }

    /// Verify a signature with a public signing key.
    fn verify(&self, data: &[u8], signature: &[u8], public: &[u8]) -> Result<bool> {
        primitives::verify(public, data, signature)
    }

    /// Generate fresh key material for one capability.
    fn generate_key(&self, capability: KeyCapability) -> Result<KeyMaterial> {
        Ok(match capability {
            KeyCapability::Sign => primitives::generate_signing_key(),
            KeyCapability::Exchange => primitives::generate_exchange_key(),
            KeyCapability::Encrypt => primitives::generate_symmetric_key(),
        })
    }

    /// Derive a symmetric key from one side's secret and the other's public
    /// key. Both sides get the same bytes because the client and server
    /// public keys are hashed in a fixed order.
    fn generate_shared_secret(
        &self,
        local_secret: &[u8],
        remote_public: &[u8],
        client_public: &[u8],
        server_public: &[u8],
    ) -> Result<Vec<u8>> {
        let mut input = primitives::diffie_hellman(local_secret, remote_public)?;
        input.extend_from_slice(client_public);
        input.extend_from_slice(server_public);
        Ok(self.hash(&input))
    }

    /// Encrypt with a symmetric key.
    fn encrypt(&self, plain: &[u8], key: &[u8]) -> Result<Vec<u8>> {
        primitives::encrypt(key, plain)
    }

    /// Decrypt with a symmetric key.
    fn decrypt(&self, data: &[u8], key: &[u8]) -> Result<Vec<u8>> {
        primitives::decrypt(key, data)
    }
}
