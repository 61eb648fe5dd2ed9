//! Raw primitives shared by the built-in suites.
//!
//! Ed25519 for signing, X25519 for key agreement, XChaCha20-Poly1305 for
//! symmetric encryption. Ciphertexts carry their 24-byte nonce as a prefix.

use chacha20poly1305::aead::{Aead, KeyInit};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use ed25519_dalek::{Signature, Signer, SigningKey, Verifier, VerifyingKey};
use rand::RngCore;
use x25519_dalek::{PublicKey as ExchangePublic, StaticSecret};

use super::KeyMaterial;
use crate::error::{CoreError, Result};

const KEY_LEN: usize = 32;
const NONCE_LEN: usize = 24;

fn to_array(bytes: &[u8], what: &str) -> Result<[u8; KEY_LEN]> {
    bytes
        .try_into()
        .map_err(|_| CoreError::Crypto(format!("{} must be {} bytes, got {}", what, KEY_LEN, bytes.len())))
}

pub(crate) fn generate_signing_key() -> KeyMaterial {
    let signing_key = SigningKey::generate(&mut rand::thread_rng());
    KeyMaterial {
        secret: Some(signing_key.to_bytes().to_vec()),
        public: Some(signing_key.verifying_key().to_bytes().to_vec()),
    }
}

pub(crate) fn sign(secret: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    let signing_key = SigningKey::from_bytes(&to_array(secret, "signing key")?);
    Ok(signing_key.sign(data).to_bytes().to_vec())
}

pub(crate) fn verify(public: &[u8], data: &[u8], signature: &[u8]) -> Result<bool> {
    let verifying_key = VerifyingKey::from_bytes(&to_array(public, "verifying key")?)
        .map_err(|e| CoreError::Crypto(format!("invalid verifying key: {}", e)))?;
    let Ok(signature) = Signature::from_slice(signature) else {
        return Ok(false);
    };
    Ok(verifying_key.verify(data, &signature).is_ok())
}

pub(crate) fn generate_exchange_key() -> KeyMaterial {
    let secret = StaticSecret::random_from_rng(rand::thread_rng());
    let public = ExchangePublic::from(&secret);
    KeyMaterial {
        secret: Some(secret.to_bytes().to_vec()),
        public: Some(public.as_bytes().to_vec()),
    }
}

pub(crate) fn diffie_hellman(secret: &[u8], public: &[u8]) -> Result<Vec<u8>> {
    let secret = StaticSecret::from(to_array(secret, "exchange key")?);
    let public = ExchangePublic::from(to_array(public, "exchange public key")?);
    Ok(secret.diffie_hellman(&public).as_bytes().to_vec())
}

pub(crate) fn generate_symmetric_key() -> KeyMaterial {
    let mut key = [0u8; KEY_LEN];
    rand::thread_rng().fill_bytes(&mut key);
    KeyMaterial {
        secret: Some(key.to_vec()),
        public: None,
    }
}

pub(crate) fn encrypt(key: &[u8], plain: &[u8]) -> Result<Vec<u8>> {
    let cipher = XChaCha20Poly1305::new_from_slice(key)
        .map_err(|_| CoreError::Crypto("invalid encryption key length".to_string()))?;

    let mut nonce = [0u8; NONCE_LEN];
    rand::thread_rng().fill_bytes(&mut nonce);

    let sealed = cipher
        .encrypt(XNonce::from_slice(&nonce), plain)
        .map_err(|_| CoreError::Crypto("encryption failed".to_string()))?;

    let mut out = Vec::with_capacity(NONCE_LEN + sealed.len());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&sealed);
    Ok(out)
}

pub(crate) fn decrypt(key: &[u8], data: &[u8]) -> Result<Vec<u8>> {
    if data.len() < NONCE_LEN {
        return Err(CoreError::Crypto("ciphertext too short".to_string()));
    }
    let cipher = XChaCha20Poly1305::new_from_slice(key)
        .map_err(|_| CoreError::Crypto("invalid encryption key length".to_string()))?;

    let (nonce, sealed) = data.split_at(NONCE_LEN);
    cipher
        .decrypt(XNonce::from_slice(nonce), sealed)
        .map_err(|_| CoreError::Crypto("decryption failed".to_string()))
}
