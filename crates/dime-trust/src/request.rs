//! Identity issuing requests and issuance.
//!
//! A request is self-signed by the key it asks an identity for. Issuing
//! checks the request, the requested capabilities and the issuer, then signs
//! a new [`Identity`] with the issuer's key.

use chrono::{Duration, Utc};
use serde_json::{Map, Value};
use tracing::debug;
use uuid::Uuid;

use dime_core::{
    expires_after, Claim, CoreError, DecodeItem, IdentityCapability, IntegrityState, Item, ItemCore, ItemType, Key,
    KeyCapability, VerifyContext,
};

use crate::error::{Result, TrustError};
use crate::identity::{Identity, IdentityClaims};

/// A request for an identity over a public key.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityIssuingRequest {
    core: ItemCore,
}

/// Who issues an identity.
#[derive(Debug, Clone, Copy)]
pub enum Issuer<'a> {
    /// The requester issues its own identity.
    SelfIssued,
    /// An existing identity holding the `Issue` capability.
    Identity(&'a Identity),
}

/// Parameters for [`IdentityIssuingRequest::issue`].
#[derive(Debug, Clone)]
pub struct IssueParams<'a> {
    /// Subject of the new identity.
    pub subject_id: Uuid,
    /// Validity period, must be positive.
    pub valid_for: Duration,
    /// Key that signs the new identity.
    pub issuer_key: &'a Key,
    pub issuer: Issuer<'a>,
    /// Capabilities the issuer is willing to grant. Must not be empty.
    pub allowed_capabilities: &'a [IdentityCapability],
    /// Capabilities the request must ask for.
    pub required_capabilities: &'a [IdentityCapability],
    pub system_name: &'a str,
    /// Not embedded as trust chain when it is the issuer.
    pub trusted_root: Option<&'a Identity>,
    pub ambit_list: &'a [String],
    pub methods: &'a [String],
}

impl<'a> IssueParams<'a> {
    /// Self-issuance defaults: generic capabilities allowed, none required.
    pub fn new(subject_id: Uuid, valid_for: Duration, issuer_key: &'a Key, system_name: &'a str) -> Self {
        Self {
            subject_id,
            valid_for,
            issuer_key,
            issuer: Issuer::SelfIssued,
            allowed_capabilities: &[IdentityCapability::Generic, IdentityCapability::Identify],
            required_capabilities: &[],
            system_name,
            trusted_root: None,
            ambit_list: &[],
            methods: &[],
        }
    }

    pub fn issued_by(mut self, issuer: &'a Identity) -> Self {
        self.issuer = Issuer::Identity(issuer);
        self
    }

    pub fn with_allowed_capabilities(mut self, capabilities: &'a [IdentityCapability]) -> Self {
        self.allowed_capabilities = capabilities;
        self
    }

    pub fn with_required_capabilities(mut self, capabilities: &'a [IdentityCapability]) -> Self {
        self.required_capabilities = capabilities;
        self
    }

    pub fn with_trusted_root(mut self, root: &'a Identity) -> Self {
        self.trusted_root = Some(root);
        self
    }

    pub fn with_ambit_list(mut self, ambit_list: &'a [String]) -> Self {
        self.ambit_list = ambit_list;
        self
    }

    pub fn with_methods(mut self, methods: &'a [String]) -> Self {
        self.methods = methods;
        self
    }
}

impl IdentityIssuingRequest {
    /// Create and self-sign a request for `key`.
    ///
    /// An empty capability list requests `Generic`.
    pub fn generate(
        key: &Key,
        capabilities: &[IdentityCapability],
        principles: Option<Map<String, Value>>,
    ) -> Result<Self> {
        if !key.has_capability(KeyCapability::Sign) {
            return Err(CoreError::CapabilityMismatch(
                "identity keys must be signing keys".to_string(),
            )
            .into());
        }
        let public = key.public().ok_or(CoreError::MissingPublicKey)?;

        let mut request = Self {
            core: ItemCore::new(ItemType::IdentityIssuingRequest),
        };
        request.put_claim(Claim::Uid, Uuid::new_v4())?;
        request.put_claim(Claim::Iat, Utc::now())?;
        request.put_claim(Claim::Pub, public)?;
        if capabilities.is_empty() {
            request.put_claim(Claim::Cap, &[IdentityCapability::Generic][..])?;
        } else {
            request.put_claim(Claim::Cap, capabilities)?;
        }
        if let Some(principles) = principles {
            request.put_claim(Claim::Pri, principles)?;
        }
        request.sign(key)?;
        Ok(request)
    }

    pub fn capabilities(&self) -> Vec<IdentityCapability> {
        self.claims().identity_capabilities()
    }

    pub fn principles(&self) -> Option<&Map<String, Value>> {
        self.claims().get(Claim::Pri).and_then(Value::as_object)
    }

    pub fn public_key_string(&self) -> Option<&str> {
        self.claims().get_str(Claim::Pub)
    }

    /// The key the request was made for.
    pub fn public_key(&self) -> dime_core::Result<Key> {
        let public = self
            .public_key_string()
            .ok_or(CoreError::MissingClaim(Claim::Pub))?;
        Key::from_key_strings(None, Some(public), &[KeyCapability::Sign])
    }

    /// Verify the request against its own key.
    pub fn verify_self(&self, ctx: &VerifyContext<'_>) -> IntegrityState {
        match self.public_key() {
            Ok(key) => self.verify(Some(&key), None, ctx),
            Err(_) => IntegrityState::FailedKeyMismatch,
        }
    }

    /// Issue an identity for this request.
    pub fn issue(&self, params: &IssueParams<'_>, ctx: &VerifyContext<'_>) -> Result<Identity> {
        if params.valid_for <= Duration::zero() {
            return Err(TrustError::InvalidIssuance(
                "validity period must be positive".to_string(),
            ));
        }
        let now = Utc::now();
        let expires_at = expires_after(now, params.valid_for).map_err(|_| {
            TrustError::InvalidIssuance("validity period is out of range".to_string())
        })?;
        if params.allowed_capabilities.is_empty() {
            return Err(TrustError::Capability(
                "allowed capabilities must not be empty".to_string(),
            ));
        }

        let state = self.verify_self(ctx);
        if state != IntegrityState::Complete {
            return Err(TrustError::RequestNotVerified(state));
        }

        let mut capabilities = self.capabilities();
        if let Some(cap) = capabilities
            .iter()
            .find(|cap| !params.allowed_capabilities.contains(cap))
        {
            return Err(TrustError::Capability(format!(
                "requested capability {} is not allowed",
                cap
            )));
        }
        if let Some(cap) = params
            .required_capabilities
            .iter()
            .find(|cap| !capabilities.contains(cap))
        {
            return Err(TrustError::Capability(format!(
                "required capability {} was not requested",
                cap
            )));
        }

        let public = self
            .public_key_string()
            .ok_or(CoreError::MissingClaim(Claim::Pub))?;

        let (issuer_id, trust_chain) = match params.issuer {
            Issuer::SelfIssued => {
                if !params.issuer_key.same_public(&self.public_key()?) {
                    return Err(TrustError::InvalidIssuance(
                        "a self-issued identity must be signed by the requesting key".to_string(),
                    ));
                }
                if !capabilities.contains(&IdentityCapability::SelfIssued) {
                    capabilities.push(IdentityCapability::SelfIssued);
                }
                (params.subject_id, None)
            }
            Issuer::Identity(issuer) => {
                if !issuer.has_capability(IdentityCapability::Issue) {
                    return Err(TrustError::Capability(
                        "issuing identity lacks the issue capability".to_string(),
                    ));
                }
                if !params.issuer_key.same_public(&issuer.public_key()?) {
                    return Err(TrustError::InvalidIssuance(
                        "issuer key does not match the issuing identity".to_string(),
                    ));
                }
                let issuer_id = issuer
                    .subject_id()
                    .ok_or(CoreError::MissingClaim(Claim::Sub))?;
                let is_root = params
                    .trusted_root
                    .is_some_and(|root| root.same_subject(issuer));
                (issuer_id, (!is_root).then(|| issuer.clone()))
            }
        };

        let claims = IdentityClaims {
            subject_id: params.subject_id,
            issuer_id,
            issued_at: now,
            expires_at,
            system_name: params.system_name,
            capabilities: &capabilities,
            public_key: public,
            ambit_list: params.ambit_list,
            methods: params.methods,
            principles: self.principles().cloned(),
        };
        let mut identity = Identity::issued(claims, trust_chain)?;
        identity.sign(params.issuer_key)?;

        debug!(
            subject = %params.subject_id,
            issuer = %issuer_id,
            chained = identity.trust_chain().is_some(),
            "issued identity"
        );
        Ok(identity)
    }
}

impl Item for IdentityIssuingRequest {
    fn core(&self) -> &ItemCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut ItemCore {
        &mut self.core
    }
}

impl DecodeItem for IdentityIssuingRequest {
    const ITEM_TYPE: ItemType = ItemType::IdentityIssuingRequest;

    fn from_parts(core: ItemCore, _body: &[&str]) -> dime_core::Result<Self> {
        if !core.claims().contains(Claim::Pub) {
            return Err(CoreError::MissingClaim(Claim::Pub));
        }
        Ok(Self { core })
    }
}
