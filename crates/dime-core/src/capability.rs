//! Capabilities carried by keys and identities.
//!
//! Capabilities are stored in claims as lower-case strings.

use std::fmt;

/// What a key may be used for.
///
/// A key is generated for exactly one of these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum KeyCapability {
    /// Asymmetric signing key.
    Sign,
    /// Asymmetric key agreement key.
    Exchange,
    /// Symmetric encryption key.
    Encrypt,
}

impl KeyCapability {
    /// The claim representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sign => "sign",
            Self::Exchange => "exchange",
            Self::Encrypt => "encrypt",
        }
    }

    /// Parse from the claim representation.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "sign" => Some(Self::Sign),
            "exchange" => Some(Self::Exchange),
            "encrypt" => Some(Self::Encrypt),
            _ => None,
        }
    }
}

impl fmt::Display for KeyCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What an identity is entitled to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IdentityCapability {
    /// No particular entitlement.
    Generic,
    /// May identify itself.
    Identify,
    /// May issue identities to others.
    Issue,
    /// May prove claims.
    Prove,
    /// May seal items.
    Seal,
    /// May act as a timestamping authority.
    Timestamp,
    /// The identity issued itself.
    SelfIssued,
}

impl IdentityCapability {
    /// The claim representation.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Generic => "generic",
            Self::Identify => "identify",
            Self::Issue => "issue",
            Self::Prove => "prove",
            Self::Seal => "seal",
            Self::Timestamp => "timestamp",
            Self::SelfIssued => "self",
        }
    }

    /// Parse from the claim representation.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "generic" => Some(Self::Generic),
            "identify" => Some(Self::Identify),
            "issue" => Some(Self::Issue),
            "prove" => Some(Self::Prove),
            "seal" => Some(Self::Seal),
            "timestamp" => Some(Self::Timestamp),
            "self" => Some(Self::SelfIssued),
            _ => None,
        }
    }
}

impl fmt::Display for IdentityCapability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
