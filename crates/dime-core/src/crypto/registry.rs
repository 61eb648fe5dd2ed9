//! Name-keyed registry of crypto suites.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock};

use tracing::debug;

use super::{CryptoSuite, DscSuite, KeyMaterial, NaclSuite, StnSuite, NACL_SUITE};
use crate::capability::KeyCapability;
use crate::error::{CoreError, Result};
use crate::key::Key;

struct Inner {
    suites: HashMap<String, Arc<dyn CryptoSuite>>,
    default_suite: String,
}

/// Resolves suites by name and applies key capability checks.
///
/// Every operation taking an optional suite name falls back to the default
/// suite; operations on a [`Key`] use the key's own suite.
pub struct CryptoRegistry {
    inner: Mutex<Inner>,
}

impl CryptoRegistry {
    /// An empty registry. The default suite name is [`NACL_SUITE`] but must
    /// still be registered before use.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                suites: HashMap::new(),
                default_suite: NACL_SUITE.to_string(),
            }),
        }
    }

    /// A registry holding the built-in suites, with `NaCl` as default.
    pub fn with_builtin_suites() -> Self {
        let registry = Self::new();
        {
            let mut inner = registry.lock();
            for suite in [
                Arc::new(NaclSuite) as Arc<dyn CryptoSuite>,
                Arc::new(DscSuite),
                Arc::new(StnSuite),
            ] {
                inner.suites.insert(suite.name().to_string(), suite);
            }
        }
        registry
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a suite. Names are unique.
    pub fn register_suite(&self, suite: Arc<dyn CryptoSuite>) -> Result<()> {
        let name = suite.name().to_string();
        let mut inner = self.lock();
        if inner.suites.contains_key(&name) {
            return Err(CoreError::SuiteAlreadyRegistered(name));
        }
        debug!(suite = %name, "registered crypto suite");
        inner.suites.insert(name, suite);
        Ok(())
    }

    /// True if a suite with this name is registered.
    pub fn has_suite(&self, name: &str) -> bool {
        self.lock().suites.contains_key(name)
    }

    /// Names of all registered suites.
    pub fn suite_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().suites.keys().cloned().collect();
        names.sort();
        names
    }

    /// Name of the default suite.
    pub fn default_suite_name(&self) -> String {
        self.lock().default_suite.clone()
    }

    /// Make a registered suite the default.
    pub fn set_default_suite(&self, name: &str) -> Result<()> {
        let mut inner = self.lock();
        if !inner.suites.contains_key(name) {
            return Err(CoreError::UnknownSuite(name.to_string()));
        }
        debug!(suite = %name, "default crypto suite changed");
        inner.default_suite = name.to_string();
        Ok(())
    }

    /// Resolve a suite by name, or the default.
    pub fn suite(&self, name: Option<&str>) -> Result<Arc<dyn CryptoSuite>> {
        let inner = self.lock();
        let name = name.unwrap_or(inner.default_suite.as_str());
        inner
            .suites
            .get(name)
            .cloned()
            .ok_or_else(|| CoreError::UnknownSuite(name.to_string()))
    }

    fn suite_for(&self, key: &Key) -> Result<Arc<dyn CryptoSuite>> {
        self.suite(Some(&key.suite_name()?))
    }

    fn require(key: &Key, capability: KeyCapability) -> Result<()> {
        if key.has_capability(capability) {
            Ok(())
        } else {
            Err(CoreError::CapabilityMismatch(format!(
                "key lacks the {} capability",
                capability
            )))
        }
    }

    /// The name of a key: derived from its public bytes, or its secret bytes
    /// for symmetric keys.
    pub fn generate_key_name(&self, key: &Key) -> Result<String> {
        let suite = self.suite_for(key)?;
        let bytes = match key.public_bytes()? {
            Some(public) => public,
            None => key.secret_bytes()?.ok_or(CoreError::MissingPublicKey)?,
        };
        Ok(suite.generate_key_name(&bytes))
    }

    /// Sign data with a signing key.
    pub fn generate_signature(&self, data: &[u8], key: &Key) -> Result<Vec<u8>> {
        Self::require(key, KeyCapability::Sign)?;
        let secret = key.secret_bytes()?.ok_or(CoreError::MissingSecretKey)?;
        self.suite_for(key)?.sign(data, &secret)
    }

    /// Verify a signature against a signing key's public bytes.
    pub fn verify_signature(&self, data: &[u8], signature: &[u8], key: &Key) -> Result<bool> {
        Self::require(key, KeyCapability::Sign)?;
        let public = key.public_bytes()?.ok_or(CoreError::MissingPublicKey)?;
        self.suite_for(key)?.verify(data, signature, &public)
    }

    /// Generate a key with exactly one capability.
    pub fn generate_key(&self, capabilities: &[KeyCapability], suite: Option<&str>) -> Result<Key> {
        let [capability] = capabilities else {
            return Err(CoreError::InvalidKeyUsage(format!(
                "a key is generated for exactly one capability, got {}",
                capabilities.len()
            )));
        };
        let suite = self.suite(suite)?;
        let material = suite.generate_key(*capability)?;
        Key::from_material(suite.as_ref(), *capability, &material)
    }

    /// Derive a symmetric key from two exchange keys.
    ///
    /// Exactly one of `client` and `server` must carry secret material; the
    /// other side is public only. The result carries `capabilities`, which
    /// must be `[Encrypt]`.
    pub fn generate_shared_secret(
        &self,
        client: &Key,
        server: &Key,
        capabilities: &[KeyCapability],
    ) -> Result<Key> {
        if capabilities != [KeyCapability::Encrypt] {
            return Err(CoreError::CapabilityMismatch(
                "shared secrets can only be used for encryption".to_string(),
            ));
        }
        Self::require(client, KeyCapability::Exchange)?;
        Self::require(server, KeyCapability::Exchange)?;

        let suite_name = client.suite_name()?;
        if suite_name != server.suite_name()? {
            return Err(CoreError::InvalidKeyUsage(
                "exchange keys belong to different suites".to_string(),
            ));
        }
        let suite = self.suite(Some(&suite_name))?;

        let client_public = client.public_bytes()?.ok_or(CoreError::MissingPublicKey)?;
        let server_public = server.public_bytes()?.ok_or(CoreError::MissingPublicKey)?;

        let shared = match (client.secret_bytes()?, server.secret_bytes()?) {
            (Some(secret), None) => {
                suite.generate_shared_secret(&secret, &server_public, &client_public, &server_public)?
            }
            (None, Some(secret)) => {
                suite.generate_shared_secret(&secret, &client_public, &client_public, &server_public)?
            }
            _ => {
                return Err(CoreError::InvalidKeyUsage(
                    "exactly one of client and server must hold a secret key".to_string(),
                ))
            }
        };

        let material = KeyMaterial {
            secret: Some(shared),
            public: None,
        };
        Key::from_material(suite.as_ref(), KeyCapability::Encrypt, &material)
    }

    /// Encrypt with a symmetric key.
    pub fn encrypt(&self, plain: &[u8], key: &Key) -> Result<Vec<u8>> {
        Self::require(key, KeyCapability::Encrypt)?;
        let secret = key.secret_bytes()?.ok_or(CoreError::MissingSecretKey)?;
        self.suite_for(key)?.encrypt(plain, &secret)
    }

    /// Decrypt with a symmetric key.
    pub fn decrypt(&self, data: &[u8], key: &Key) -> Result<Vec<u8>> {
        Self::require(key, KeyCapability::Encrypt)?;
        let secret = key.secret_bytes()?.ok_or(CoreError::MissingSecretKey)?;
        self.suite_for(key)?.decrypt(data, &secret)
    }

    /// Hash data with the named suite.
    pub fn generate_hash(&self, data: &[u8], suite: Option<&str>) -> Result<Vec<u8>> {
        Ok(self.suite(suite)?.hash(data))
    }

    /// Encode key bytes with the named suite's text encoding.
    pub fn encode_key_bytes(&self, bytes: &[u8], suite: Option<&str>) -> Result<String> {
        Ok(self.suite(suite)?.encode_key_bytes(bytes))
    }

    /// Decode key bytes with the named suite's text encoding.
    pub fn decode_key_bytes(&self, encoded: &str, suite: Option<&str>) -> Result<Vec<u8>> {
        self.suite(suite)?.decode_key_bytes(encoded)
    }
}

impl Default for CryptoRegistry {
    fn default() -> Self {
        Self::with_builtin_suites()
    }
}

impl std::fmt::Debug for CryptoRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CryptoRegistry")
            .field("suites", &self.suite_names())
            .field("default_suite", &self.default_suite_name())
            .finish()
    }
}

/// The process-wide registry, pre-populated with the built-in suites.
pub fn registry() -> &'static CryptoRegistry {
    static REGISTRY: OnceLock<CryptoRegistry> = OnceLock::new();
    REGISTRY.get_or_init(CryptoRegistry::with_builtin_suites)
}
