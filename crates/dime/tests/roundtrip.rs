//! End-to-end tests for item encoding, signing and verification.

use chrono::Duration;
use dime::core::CoreError;
use dime::{
    AnyItem, Data, DecodeItem, Dime, DimeConfig, Envelope, IntegrityState, Item, ItemType, Key,
    KeyCapability, Message, Tag, VerifyContext,
};
use dime_testkit::generators::{data_from_params, DataParams};
use dime_testkit::TestFixture;
use proptest::prelude::*;
use uuid::Uuid;

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn sign_key() -> Key {
    Key::generate(&[KeyCapability::Sign], None).unwrap()
}

#[test]
fn test_signed_data_survives_export() {
    init_tracing();
    let key = sign_key();
    let mut data = Data::new(Uuid::new_v4(), Some(Duration::hours(1)), Some("roundtrip")).unwrap();
    data.set_payload(&b"Racecar is racecar backwards."[..], Some("text/plain"))
        .unwrap();
    data.sign(&key).unwrap();

    let exported = data.export().unwrap();
    let decoded = Data::import(&exported).unwrap();
    let ctx = VerifyContext::new();

    assert_eq!(
        decoded.verify(Some(&key.public_copy().unwrap()), None, &ctx),
        IntegrityState::Complete
    );
    assert_eq!(
        decoded.verify(Some(&sign_key()), None, &ctx),
        IntegrityState::FailedKeyMismatch
    );
    assert_eq!(decoded.payload().as_ref(), b"Racecar is racecar backwards.");
    assert_eq!(decoded.mime_type(), Some("text/plain"));
    assert_eq!(decoded.context(), Some("roundtrip"));
    assert_eq!(decoded.unique_id(), data.unique_id());
}

#[test]
fn test_export_is_idempotent() {
    let fixture = TestFixture::new();
    let data = fixture.make_data(b"payload");

    let first = data.export().unwrap();
    let second = data.export().unwrap();
    assert_eq!(first, second);

    let reimported = Data::import(&first).unwrap().export().unwrap();
    assert_eq!(reimported, first);
}

#[test]
fn test_import_rejects_other_item_types() {
    let fixture = TestFixture::new();
    let exported = fixture.make_data(b"payload").export().unwrap();

    assert!(matches!(
        Key::import(&exported),
        Err(CoreError::UnexpectedItemType { expected: ItemType::Key, .. })
    ));
    assert!(Data::import("DAT").is_err());
    assert!(Data::import("").is_err());
}

#[test]
fn test_signed_item_rejects_mutation() {
    let fixture = TestFixture::new();
    let mut data = fixture.make_data(b"payload");

    assert!(matches!(
        data.put_claim(dime::Claim::Ctx, "changed"),
        Err(CoreError::ItemSigned)
    ));
    assert!(matches!(
        data.set_payload(&b"other"[..], None),
        Err(CoreError::ItemSigned)
    ));

    data.strip();
    assert!(!data.is_signed());
    data.set_payload(&b"other"[..], None).unwrap();
    data.sign(&fixture.key).unwrap();
    assert_eq!(
        data.verify(Some(&fixture.public_key()), None, &VerifyContext::new()),
        IntegrityState::Complete
    );
}

#[test]
fn test_two_signatures() {
    let first = sign_key();
    let second = sign_key();
    let fixture = TestFixture::new();
    let mut data = fixture.make_unsigned_data(b"co-signed");
    data.sign(&first).unwrap();
    data.sign(&second).unwrap();

    assert!(matches!(data.sign(&first), Err(CoreError::DuplicateSignature(_))));

    let decoded = Data::import(&data.export().unwrap()).unwrap();
    assert_eq!(decoded.signatures().len(), 2);
    let ctx = VerifyContext::new();
    assert_eq!(
        decoded.verify(Some(&first.public_copy().unwrap()), None, &ctx),
        IntegrityState::Complete
    );
    assert_eq!(
        decoded.verify(Some(&second.public_copy().unwrap()), None, &ctx),
        IntegrityState::Complete
    );
}

#[test]
fn test_cosign_imported_item() {
    let first = sign_key();
    let second = sign_key();
    let fixture = TestFixture::new();
    let mut data = fixture.make_unsigned_data(b"co-signed later");
    data.sign(&first).unwrap();
    let original = data.export().unwrap();
    let (signed_part, _) = original.rsplit_once('.').unwrap();

    let mut decoded = Data::import(&original).unwrap();
    assert_eq!(decoded.pre_signature_encoding().unwrap(), signed_part);
    decoded.sign(&second).unwrap();
    assert!(matches!(
        decoded.sign(&first),
        Err(CoreError::DuplicateSignature(_))
    ));

    let cosigned = decoded.export().unwrap();
    assert!(cosigned.starts_with(&format!("{}.", signed_part)));
    assert_ne!(cosigned, original);

    let reimported = Data::import(&cosigned).unwrap();
    assert_eq!(reimported.signatures().len(), 2);
    let ctx = VerifyContext::new();
    for key in [&first, &second] {
        assert_eq!(
            reimported.verify(Some(&key.public_copy().unwrap()), None, &ctx),
            IntegrityState::Complete
        );
    }
}

#[test]
fn test_unsigned_item_has_no_signature() {
    let fixture = TestFixture::new();
    let data = fixture.make_unsigned_data(b"unsigned");

    assert_eq!(
        data.verify(Some(&fixture.public_key()), None, &VerifyContext::new()),
        IntegrityState::FailedNoSignature
    );
}

#[test]
fn test_tag_links() {
    let fixture = TestFixture::new();
    let first = fixture.make_data(b"first");
    let second = fixture.make_data(b"second");
    let tag = fixture.make_tag(&[&first, &second]);
    let tag = Tag::import(&tag.export().unwrap()).unwrap();

    let dime = Dime::new(DimeConfig::default()).unwrap();
    let key = fixture.public_key();

    assert_eq!(
        dime.verify_with_links(&tag, Some(&key), &[&first, &second]),
        IntegrityState::Complete
    );
    assert_eq!(
        dime.verify_with_links(&tag, Some(&key), &[&second]),
        IntegrityState::Complete
    );

    let unlinked = fixture.make_data(b"unlinked");
    assert_eq!(
        dime.verify_with_links(&tag, Some(&key), &[&first, &unlinked]),
        IntegrityState::FailedLinkedItemMissing
    );

    let mut changed = first.clone();
    changed.strip();
    changed.set_payload(&b"changed"[..], None).unwrap();
    assert_eq!(
        dime.verify_with_links(&tag, Some(&key), &[&changed, &second]),
        IntegrityState::FailedLinkedItemMismatch
    );

    assert_eq!(
        dime.verify_with_links(&tag, Some(&key), &[]),
        IntegrityState::FailedLinkedItemFault
    );
}

#[test]
fn test_signed_envelope_roundtrip() {
    let fixture = TestFixture::new();
    let data = fixture.make_data(b"enveloped");
    let exchange = Key::generate(&[KeyCapability::Exchange], None).unwrap();

    let mut envelope = Envelope::with_issuer(fixture.issuer_id, Some("bundle")).unwrap();
    envelope.add_item(data.clone()).unwrap();
    envelope.add_item(exchange.public_copy().unwrap()).unwrap();
    envelope.sign(&fixture.key).unwrap();

    let dime = Dime::new(DimeConfig::default()).unwrap();
    let decoded = dime.import_envelope(&envelope.export().unwrap()).unwrap();

    assert!(!decoded.is_anonymous());
    assert_eq!(decoded.context(), Some("bundle"));
    assert_eq!(dime.verify_with_key(&decoded, &fixture.public_key()), IntegrityState::Complete);

    let items = decoded.into_items();
    assert_eq!(items.len(), 2);
    match &items[0] {
        AnyItem::Data(inner) => {
            assert_eq!(inner.export().unwrap(), data.export().unwrap());
            assert_eq!(
                dime.verify_with_key(inner, &fixture.public_key()),
                IntegrityState::Complete
            );
        }
        other => panic!("expected data, got {:?}", other.item_type()),
    }
    assert_eq!(items[1].item_type(), ItemType::Key);
}

#[test]
fn test_import_item_dispatches_on_tag() {
    let fixture = TestFixture::new();
    let dime = Dime::new(DimeConfig::default()).unwrap();

    let data = dime.import_item(&fixture.make_data(b"x").export().unwrap()).unwrap();
    assert_eq!(data.item_type(), ItemType::Data);

    let key = dime.import_item(&fixture.key.export().unwrap()).unwrap();
    assert_eq!(key.item_type(), ItemType::Key);

    let mut envelope = Envelope::new();
    envelope.add_item(fixture.key.clone()).unwrap();
    assert!(dime.import_item(&envelope.export().unwrap()).is_err());
}

#[test]
fn test_encrypted_message_roundtrip() {
    let sender = TestFixture::new();
    let sender_exchange = Key::generate(&[KeyCapability::Exchange], None).unwrap();
    let receiver_exchange = Key::generate(&[KeyCapability::Exchange], None).unwrap();
    let audience = Uuid::new_v4();

    let mut message =
        Message::new(Some(audience), sender.issuer_id, Some(Duration::minutes(5)), None).unwrap();
    message
        .encrypt_payload(
            b"Racecar is racecar backwards.",
            &sender_exchange,
            &receiver_exchange.public_copy().unwrap(),
        )
        .unwrap();
    message.sign(&sender.key).unwrap();

    let decoded = Message::import(&message.export().unwrap()).unwrap();
    assert_eq!(
        decoded.verify(Some(&sender.public_key()), None, &VerifyContext::new()),
        IntegrityState::Complete
    );
    assert_ne!(decoded.payload().as_ref(), b"Racecar is racecar backwards.");

    let plain = decoded
        .decrypt_payload(&receiver_exchange, &sender_exchange.public_copy().unwrap())
        .unwrap();
    assert_eq!(plain, b"Racecar is racecar backwards.");
}

#[test]
fn test_date_boundaries() {
    let fixture = TestFixture::new();
    let data = fixture.make_data(b"dated");
    let key = fixture.public_key();
    let expires_at = data.expires_at().unwrap();
    let issued_at = data.issued_at().unwrap();
    let grace = Duration::seconds(2);

    let at = |now| {
        Dime::new(
            DimeConfig::default()
                .with_grace_period(grace)
                .with_time_override(now),
        )
        .unwrap()
    };

    assert_eq!(
        at(expires_at + grace).verify_with_key(&data, &key),
        IntegrityState::Complete
    );
    assert_eq!(
        at(expires_at + grace + Duration::microseconds(1)).verify_with_key(&data, &key),
        IntegrityState::FailedUsedAfterExpired
    );
    assert_eq!(
        at(issued_at - grace).verify_with_key(&data, &key),
        IntegrityState::Complete
    );
    assert_eq!(
        at(issued_at - grace - Duration::microseconds(1)).verify_with_key(&data, &key),
        IntegrityState::FailedUsedBeforeIssued
    );
}

#[test]
fn test_signature_checked_before_dates() {
    let fixture = TestFixture::new();
    let data = fixture.make_data(b"dated");
    let dime = Dime::new(
        DimeConfig::default().with_time_override(data.expires_at().unwrap() + Duration::days(1)),
    )
    .unwrap();

    assert_eq!(
        dime.verify_with_key(&data, &sign_key()),
        IntegrityState::FailedKeyMismatch
    );
    assert_eq!(
        dime.verify_with_key(&data, &fixture.public_key()),
        IntegrityState::FailedUsedAfterExpired
    );
}

proptest! {
    #[test]
    fn test_any_data_roundtrips_through_dime(params: DataParams) {
        let dime = Dime::new(DimeConfig::default()).unwrap();
        let data = data_from_params(&params);
        let exported = data.export().unwrap();

        match dime.import_item(&exported).unwrap() {
            AnyItem::Data(decoded) => {
                prop_assert_eq!(decoded.export().unwrap(), exported);
                prop_assert_eq!(decoded.thumbprint().unwrap(), data.thumbprint().unwrap());
            }
            other => prop_assert!(false, "unexpected item {:?}", other.item_type()),
        }
    }
}
