//! # DiME Testkit
//!
//! Testing utilities for DiME.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Generators**: Proptest strategies for property-based testing
//! - **Fixtures**: Helper structs for setting up test scenarios
//!
//! ## Property Testing
//!
//! Use the generators with proptest:
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use dime_testkit::generators::{data_from_params, DataParams};
//!
//! proptest! {
//!     #[test]
//!     fn thumbprint_is_stable(params: DataParams) {
//!         let data = data_from_params(&params);
//!         prop_assert_eq!(data.thumbprint().unwrap(), data.thumbprint().unwrap());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! Quickly set up test scenarios:
//!
//! ```rust
//! use dime_core::{IntegrityState, Item};
//! use dime_testkit::fixtures::TrustChainFixture;
//!
//! let chain = TrustChainFixture::new();
//! let ctx = chain.context();
//! assert_eq!(chain.leaf.verify(None, None, &ctx), IntegrityState::Complete);
//! ```

pub mod fixtures;
pub mod generators;

pub use fixtures::{multi_party_fixtures, TestFixture, TrustChainFixture};
pub use generators::{data_from_params, DataParams};
