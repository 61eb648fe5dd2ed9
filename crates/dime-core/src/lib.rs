//! # DiME Core
//!
//! Primitives for DiME items: claims, canonical encoding, crypto suites,
//! signatures and item links.
//!
//! This crate contains no I/O and no global trust state. Trust anchors are
//! passed to verification through a [`VerifyContext`].
//!
//! ## Key Types
//!
//! - [`Item`] - The contract every item kind implements
//! - [`Key`], [`Data`], [`Tag`], [`Message`] - Concrete item kinds
//! - [`ClaimsStore`] - Typed claims with a canonical JSON form
//! - [`CryptoRegistry`] - Named, pluggable crypto suites
//! - [`IntegrityState`] - The outcome of a verification
//!
//! ## Encoding
//!
//! Items export as `TAG.claims[.body][.signatures]`. See [`canonical`] and
//! [`item`].

pub mod canonical;
pub mod capability;
pub mod claim;
pub mod context;
pub mod crypto;
pub mod data;
pub mod error;
pub mod integrity;
pub mod item;
pub mod key;
pub mod link;
pub mod message;
pub mod signature;
pub mod tag;

pub use capability::{IdentityCapability, KeyCapability};
pub use claim::{expires_after, format_timestamp, parse_timestamp, Claim, ClaimValue, ClaimsStore};
pub use context::{Clock, TrustAnchors, VerifyContext};
pub use crypto::{registry, CryptoRegistry, CryptoSuite, KeyMaterial, NACL_SUITE};
pub use data::Data;
pub use error::{CoreError, Result};
pub use integrity::IntegrityState;
pub use item::{finish_verify, verify_item, verify_signature, AsItem, DecodeItem, Item, ItemCore, ItemType};
pub use key::Key;
pub use link::ItemLink;
pub use message::Message;
pub use signature::Signature;
pub use tag::Tag;
