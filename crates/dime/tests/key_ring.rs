//! Key ring behaviour through the facade.

use dime::trust::TrustError;
use dime::{Dime, DimeConfig, DimeError, IntegrityState, Item, Key, KeyCapability, TrustAnchor};
use dime_testkit::{multi_party_fixtures, TestFixture, TrustChainFixture};

fn dime() -> Dime {
    Dime::new(DimeConfig::default()).unwrap()
}

#[test]
fn test_empty_ring_reports_no_key_ring() {
    let fixture = TestFixture::new();
    let data = fixture.make_data(b"payload");

    assert_eq!(dime().verify(&data), IntegrityState::FailedNoKeyRing);
}

#[test]
fn test_put_verify_remove() {
    let fixture = TestFixture::new();
    let bystander = TestFixture::new();
    let data = fixture.make_data(b"payload");
    let mut dime = dime();
    dime.key_ring_mut().put(bystander.public_key()).unwrap();

    let name = dime.key_ring_mut().put(fixture.public_key()).unwrap();
    assert_eq!(name, fixture.key.name().unwrap());
    assert_eq!(dime.verify(&data), IntegrityState::Complete);

    let anchor = TrustAnchor::Key(fixture.public_key());
    assert!(dime.key_ring().contains(&anchor));
    assert!(dime.key_ring_mut().remove(&anchor).is_some());
    assert!(!dime.key_ring().contains(&anchor));
    assert_eq!(dime.verify(&data), IntegrityState::FailedKeyMismatch);

    dime.key_ring_mut().clear();
    assert_eq!(dime.verify(&data), IntegrityState::FailedNoKeyRing);
}

#[test]
fn test_unknown_signer_is_a_key_mismatch() {
    let parties = multi_party_fixtures(3);
    let mut dime = dime();
    dime.key_ring_mut().put(parties[0].public_key()).unwrap();
    dime.key_ring_mut().put(parties[1].public_key()).unwrap();

    assert_eq!(
        dime.verify(&parties[1].make_data(b"known")),
        IntegrityState::Complete
    );
    assert_eq!(
        dime.verify(&parties[2].make_data(b"unknown")),
        IntegrityState::FailedKeyMismatch
    );
}

#[test]
fn test_non_signing_key_is_rejected_at_verification() {
    let fixture = TestFixture::new();
    let mut dime = dime();
    let exchange = Key::generate(&[KeyCapability::Exchange], None).unwrap();
    dime.key_ring_mut().put(exchange.public_copy().unwrap()).unwrap();

    assert_eq!(
        dime.verify(&fixture.make_data(b"payload")),
        IntegrityState::FailedInvalidKeyRingItem
    );
}

#[test]
fn test_identity_entry_vouches_for_its_key() {
    let chain = TrustChainFixture::new();
    let mut dime = dime();
    let name = dime.key_ring_mut().put(chain.leaf.clone()).unwrap();
    assert_eq!(
        name,
        chain.leaf.subject_id().unwrap().to_string().to_lowercase()
    );

    let mut data = dime::Data::new(chain.leaf.subject_id().unwrap(), None, None).unwrap();
    data.set_payload(&b"from the leaf"[..], None).unwrap();
    data.sign(&chain.leaf_key).unwrap();

    assert_eq!(dime.verify(&data), IntegrityState::Complete);
}

#[test]
fn test_signed_ring_export_import() {
    let owner = TestFixture::new();
    let parties = multi_party_fixtures(2);
    let chain = TrustChainFixture::new();

    let mut source = dime();
    for party in &parties {
        source.key_ring_mut().put(party.public_key()).unwrap();
    }
    source.key_ring_mut().put(chain.root.clone()).unwrap();
    let exported = source
        .export_key_ring(Some(&owner.key))
        .unwrap()
        .expect("ring is not empty");

    let mut target = dime();
    target
        .import_key_ring(&exported, Some(&owner.public_key()))
        .unwrap();
    assert_eq!(target.key_ring().len(), 3);
    assert_eq!(
        target.verify(&parties[0].make_data(b"payload")),
        IntegrityState::Complete
    );

    let stranger = TestFixture::new();
    let err = dime()
        .import_key_ring(&exported, Some(&stranger.public_key()))
        .unwrap_err();
    assert!(matches!(
        err,
        DimeError::Trust(TrustError::Integrity(IntegrityState::FailedKeyMismatch))
    ));
}

#[test]
fn test_empty_ring_exports_nothing() {
    let owner = TestFixture::new();
    assert!(dime().export_key_ring(Some(&owner.key)).unwrap().is_none());
    assert!(dime().export_key_ring(None).unwrap().is_none());
}

#[test]
fn test_unsigned_ring_import() {
    let fixture = TestFixture::new();
    let mut source = dime();
    source.key_ring_mut().put(fixture.public_key()).unwrap();
    let exported = source.export_key_ring(None).unwrap().unwrap();

    let mut target = dime();
    target.import_key_ring(&exported, None).unwrap();
    assert!(target.key_ring().get(&fixture.key.name().unwrap()).is_some());
}
