//! Test fixtures and helpers.
//!
//! Common setup code for integration tests. Fixtures panic on failure;
//! they are only meant to run inside tests.

use chrono::Duration;
use dime_core::{
    Data, IdentityCapability, Item, Key, KeyCapability, Message, Tag, VerifyContext,
};
use dime_trust::{Identity, IdentityIssuingRequest, IssueParams};
use uuid::Uuid;

/// System name used by fixture identities.
pub const SYSTEM_NAME: &str = "dime-test";

/// Capabilities of fixture identities that may issue.
pub const ISSUER_CAPABILITIES: &[IdentityCapability] =
    &[IdentityCapability::Generic, IdentityCapability::Issue];

/// Capabilities an issuer fixture lets its subjects request.
pub const ALLOWED_CAPABILITIES: &[IdentityCapability] = &[
    IdentityCapability::Generic,
    IdentityCapability::Identify,
    IdentityCapability::Issue,
];

/// A test fixture with a signing key and an issuer id.
#[derive(Debug, Clone)]
pub struct TestFixture {
    pub key: Key,
    pub issuer_id: Uuid,
}

impl TestFixture {
    /// Create a new test fixture with a fresh signing key.
    pub fn new() -> Self {
        Self {
            key: Key::generate(&[KeyCapability::Sign], None).expect("key generation failed"),
            issuer_id: Uuid::new_v4(),
        }
    }

    /// The public half of the fixture key.
    pub fn public_key(&self) -> Key {
        self.key.public_copy().expect("public copy failed")
    }

    /// Create a signed Data item.
    pub fn make_data(&self, payload: &[u8]) -> Data {
        let mut data = self.make_unsigned_data(payload);
        data.sign(&self.key).expect("signing failed");
        data
    }

    /// Create an unsigned Data item.
    pub fn make_unsigned_data(&self, payload: &[u8]) -> Data {
        let mut data = Data::new(self.issuer_id, Some(Duration::hours(1)), None)
            .expect("data creation failed");
        data.set_payload(payload.to_vec(), Some("application/octet-stream"))
            .expect("setting payload failed");
        data
    }

    /// Create a signed Tag linking `items`.
    pub fn make_tag(&self, items: &[&dyn Item]) -> Tag {
        let mut tag = Tag::new(self.issuer_id, Some("test"), items).expect("tag creation failed");
        tag.sign(&self.key).expect("signing failed");
        tag
    }

    /// Create an unencrypted, signed Message addressed to `audience_id`.
    pub fn make_message(&self, audience_id: Uuid, payload: &[u8]) -> Message {
        let mut message = Message::new(
            Some(audience_id),
            self.issuer_id,
            Some(Duration::minutes(5)),
            None,
        )
        .expect("message creation failed");
        message
            .set_payload(payload.to_vec())
            .expect("setting payload failed");
        message.sign(&self.key).expect("signing failed");
        message
    }
}

impl Default for TestFixture {
    fn default() -> Self {
        Self::new()
    }
}

/// Create multiple test fixtures for multi-party tests.
pub fn multi_party_fixtures(count: usize) -> Vec<TestFixture> {
    (0..count).map(|_| TestFixture::new()).collect()
}

/// A three level trust chain: a self-issued root, an intermediate issued by
/// the root and a leaf issued by the intermediate.
///
/// The intermediate is anchored at the root, so it carries no embedded
/// chain. The leaf embeds the intermediate.
#[derive(Debug, Clone)]
pub struct TrustChainFixture {
    pub root_key: Key,
    pub root: Identity,
    pub intermediate_key: Key,
    pub intermediate: Identity,
    pub leaf_key: Key,
    pub leaf: Identity,
}

impl TrustChainFixture {
    pub fn new() -> Self {
        let root_key = sign_key();
        let root = self_issued(&root_key, ISSUER_CAPABILITIES);

        let intermediate_key = sign_key();
        let intermediate = issue(
            &intermediate_key,
            ISSUER_CAPABILITIES,
            &root_key,
            &root,
            &root,
        );

        let leaf_key = sign_key();
        let leaf = issue(
            &leaf_key,
            &[IdentityCapability::Generic, IdentityCapability::Identify],
            &intermediate_key,
            &intermediate,
            &root,
        );

        Self {
            root_key,
            root,
            intermediate_key,
            intermediate,
            leaf_key,
            leaf,
        }
    }

    /// A verification context trusting the root.
    pub fn context(&self) -> VerifyContext<'_> {
        VerifyContext::new().with_trusted_root(&self.root)
    }
}

impl Default for TrustChainFixture {
    fn default() -> Self {
        Self::new()
    }
}

fn sign_key() -> Key {
    Key::generate(&[KeyCapability::Sign], None).expect("key generation failed")
}

/// Self-issue an identity for `key` with the given capabilities.
pub fn self_issued(key: &Key, capabilities: &[IdentityCapability]) -> Identity {
    let request =
        IdentityIssuingRequest::generate(key, capabilities, None).expect("request failed");
    let params = IssueParams::new(Uuid::new_v4(), Duration::days(365), key, SYSTEM_NAME)
        .with_allowed_capabilities(capabilities);
    request
        .issue(&params, &VerifyContext::new())
        .expect("self-issue failed")
}

/// Issue an identity for `subject_key`, signed by `issuer`.
pub fn issue(
    subject_key: &Key,
    capabilities: &[IdentityCapability],
    issuer_key: &Key,
    issuer: &Identity,
    trusted_root: &Identity,
) -> Identity {
    let request =
        IdentityIssuingRequest::generate(subject_key, capabilities, None).expect("request failed");
    let params = IssueParams::new(Uuid::new_v4(), Duration::days(30), issuer_key, SYSTEM_NAME)
        .issued_by(issuer)
        .with_allowed_capabilities(ALLOWED_CAPABILITIES)
        .with_trusted_root(trusted_root);
    request
        .issue(&params, &VerifyContext::new())
        .expect("issue failed")
}

#[cfg(test)]
mod tests {
    use super::*;
    use dime_core::IntegrityState;

    #[test]
    fn test_fixture_data_verifies() {
        let fixture = TestFixture::new();
        let data = fixture.make_data(b"hello");

        assert!(data.is_signed());
        assert_eq!(data.issuer_id(), Some(fixture.issuer_id));
        assert_eq!(
            data.verify(Some(&fixture.public_key()), None, &VerifyContext::new()),
            IntegrityState::Complete
        );
    }

    #[test]
    fn test_fixture_tag_links() {
        let fixture = TestFixture::new();
        let first = fixture.make_data(b"first");
        let second = fixture.make_data(b"second");
        let tag = fixture.make_tag(&[&first, &second]);

        assert_eq!(tag.item_links().unwrap().len(), 2);
    }

    #[test]
    fn test_fixture_message_is_addressed() {
        let fixture = TestFixture::new();
        let audience = Uuid::new_v4();
        let message = fixture.make_message(audience, b"hi");

        assert_eq!(message.audience_id(), Some(audience));
        assert_eq!(message.payload().as_ref(), b"hi");
    }

    #[test]
    fn test_trust_chain_shape() {
        let chain = TrustChainFixture::new();

        assert!(chain.root.is_self_issued());
        assert!(chain.intermediate.trust_chain().is_none());
        assert_eq!(chain.intermediate.issuer_id(), chain.root.subject_id());
        let embedded = chain.leaf.trust_chain().expect("leaf embeds its issuer");
        assert!(embedded.same_subject(&chain.intermediate));
        assert_eq!(
            chain.leaf.verify(None, None, &chain.context()),
            IntegrityState::Complete
        );
    }

    #[test]
    fn test_multi_party() {
        let parties = multi_party_fixtures(3);

        let names: Vec<_> = parties.iter().map(|p| p.key.name().unwrap()).collect();
        assert_ne!(names[0], names[1]);
        assert_ne!(names[1], names[2]);
        assert_ne!(names[0], names[2]);
    }
}
