//! Proptest generators for property-based testing.

use chrono::Duration;
use proptest::prelude::*;
use uuid::Uuid;

use dime_core::{Data, IdentityCapability, Item, Key, KeyCapability};

/// Generate a random Uuid.
pub fn uuid() -> impl Strategy<Value = Uuid> {
    any::<u128>().prop_map(Uuid::from_u128)
}

/// Generate a KeyCapability.
pub fn key_capability() -> impl Strategy<Value = KeyCapability> {
    prop_oneof![
        Just(KeyCapability::Sign),
        Just(KeyCapability::Exchange),
        Just(KeyCapability::Encrypt),
    ]
}

/// Generate an IdentityCapability that a request may ask for.
pub fn identity_capability() -> impl Strategy<Value = IdentityCapability> {
    prop_oneof![
        Just(IdentityCapability::Generic),
        Just(IdentityCapability::Identify),
        Just(IdentityCapability::Issue),
        Just(IdentityCapability::Prove),
        Just(IdentityCapability::Seal),
        Just(IdentityCapability::Timestamp),
    ]
}

/// Generate a deduplicated list of identity capabilities.
pub fn identity_capabilities() -> impl Strategy<Value = Vec<IdentityCapability>> {
    prop::collection::btree_set(identity_capability(), 1..=4)
        .prop_map(|caps| caps.into_iter().collect())
}

/// Generate payload bytes, at least one byte and at most `max_len`.
pub fn payload(max_len: usize) -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(any::<u8>(), 1..=max_len.max(1))
}

/// Generate a context string. May contain the component delimiter.
pub fn context() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 .:_-]{1,64}".prop_map(String::from)
}

/// Generate a MIME type.
pub fn mime_type() -> impl Strategy<Value = String> {
    "(text|application|image)/[a-z][a-z0-9+.-]{0,15}".prop_map(String::from)
}

/// Parameters for generating a Data item.
#[derive(Debug, Clone)]
pub struct DataParams {
    pub issuer_id: Uuid,
    pub valid_for_secs: Option<i64>,
    pub context: Option<String>,
    pub mime_type: Option<String>,
    pub payload: Vec<u8>,
}

impl Arbitrary for DataParams {
    type Parameters = ();
    type Strategy = BoxedStrategy<Self>;

    fn arbitrary_with(_: Self::Parameters) -> Self::Strategy {
        (
            uuid(),
            proptest::option::of(1i64..=31_536_000i64),
            proptest::option::of(context()),
            proptest::option::of(mime_type()),
            payload(1000),
        )
            .prop_map(|(issuer_id, valid_for_secs, context, mime_type, payload)| DataParams {
                issuer_id,
                valid_for_secs,
                context,
                mime_type,
                payload,
            })
            .boxed()
    }
}

/// Build an unsigned Data item from parameters.
pub fn data_from_params(params: &DataParams) -> Data {
    let mut data = Data::new(
        params.issuer_id,
        params.valid_for_secs.map(Duration::seconds),
        params.context.as_deref(),
    )
    .expect("data creation failed");
    data.set_payload(params.payload.clone(), params.mime_type.as_deref())
        .expect("setting payload failed");
    data
}

/// Build a Data item from parameters and sign it with `key`.
pub fn signed_data_from_params(params: &DataParams, key: &Key) -> Data {
    let mut data = data_from_params(params);
    data.sign(key).expect("signing failed");
    data
}
