//! # DiME Trust
//!
//! Identities, identity issuance, trust chains, key rings and envelopes.
//!
//! ## Key Types
//!
//! - [`Identity`] - A subject bound to a public key and capabilities
//! - [`IdentityIssuingRequest`] - A self-signed request for an identity
//! - [`KeyRing`] - Trust anchors consulted when no key is given
//! - [`Envelope`] - Several items exported together

pub mod envelope;
pub mod error;
pub mod identity;
pub mod key_ring;
pub mod request;

pub use envelope::{AnyItem, Envelope};
pub use error::{Result, TrustError};
pub use identity::Identity;
pub use key_ring::{KeyRing, TrustAnchor};
pub use request::{IdentityIssuingRequest, IssueParams, Issuer};
