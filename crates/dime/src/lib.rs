//! # DiME
//!
//! Data Integrity Message Envelopes: signed, self-describing items with
//! identities, trust chains and key rings.
//!
//! ## Overview
//!
//! - **Items**: keys, data, tags, messages, identities and issuing requests,
//!   each a set of claims plus an optional body, signed by one or more keys
//! - **Verification**: returns an [`IntegrityState`] describing why trust
//!   was or was not established
//! - **Trust**: identities chain back to a trusted root; a key ring vouches
//!   for items signed by known keys
//! - **Crypto suites**: pluggable by name, `NaCl` by default
//!
//! ## Usage
//!
//! ```rust,no_run
//! use dime::{Dime, DimeConfig, Data, Item, Key, KeyCapability};
//!
//! fn example() -> dime::Result<()> {
//!     let mut dime = Dime::new(DimeConfig::default())?;
//!
//!     let key = Key::generate(&[KeyCapability::Sign], None)?;
//!     dime.key_ring_mut().put(key.public_copy()?)?;
//!
//!     let mut data = Data::new(uuid::Uuid::new_v4(), None, Some("example"))?;
//!     data.set_payload(&b"hello"[..], Some("text/plain"))?;
//!     data.sign(&key)?;
//!
//!     let received = dime.import_item(&data.export()?)?;
//!     assert!(dime.verify(received.as_item()).is_valid());
//!     Ok(())
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `dime::core` - Claims, items, crypto suites, signatures, links
//! - `dime::trust` - Identities, issuance, key rings, envelopes

pub mod dime;
pub mod error;

pub use dime_core as core;
pub use dime_trust as trust;

pub use crate::dime::{Dime, DimeConfig};
pub use error::{DimeError, Result};

pub use dime_core::{
    registry, Claim, ClaimsStore, CryptoRegistry, CryptoSuite, Data, DecodeItem, IdentityCapability,
    IntegrityState, Item, ItemLink, ItemType, Key, KeyCapability, Message, Signature, Tag, VerifyContext,
};
pub use dime_trust::{
    AnyItem, Envelope, Identity, IdentityIssuingRequest, IssueParams, Issuer, KeyRing, TrustAnchor,
};
