//! Claims: the typed attributes carried by every item.
//!
//! Claims are keyed by the closed [`Claim`] enumeration and stored as JSON
//! values under their lower-case names. Values are validated against the
//! claim's type both when put and when decoded, so typed reads never see a
//! malformed value.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use serde_json::{Map, Value};
use uuid::Uuid;

use crate::canonical::canonical_json;
use crate::capability::{IdentityCapability, KeyCapability};
use crate::error::{CoreError, Result};
use crate::link::ItemLink;

/// A named claim.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Claim {
    /// Ambit list.
    Amb,
    /// Audience id.
    Aud,
    /// Identity capability list.
    Cap,
    /// Common name.
    Cmn,
    /// Context.
    Ctx,
    /// Expires at.
    Exp,
    /// Issued at.
    Iat,
    /// Issuer id.
    Iss,
    /// Issuer URL.
    Isu,
    /// Secret key material.
    Key,
    /// Key id.
    Kid,
    /// Item links.
    Lnk,
    /// MIME type.
    Mim,
    /// Methods.
    Mtd,
    /// Principles.
    Pri,
    /// Public key material.
    Pub,
    /// Subject id.
    Sub,
    /// System name.
    Sys,
    /// Unique id.
    Uid,
    /// Key use.
    Use,
}

/// How a claim's value is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClaimKind {
    Uuid,
    Timestamp,
    Text,
    StringList,
    KeyCapabilities,
    IdentityCapabilities,
    Links,
    Object,
}

impl Claim {
    /// All claims, in name order.
    pub const ALL: [Claim; 20] = [
        Claim::Amb,
        Claim::Aud,
        Claim::Cap,
        Claim::Cmn,
        Claim::Ctx,
        Claim::Exp,
        Claim::Iat,
        Claim::Iss,
        Claim::Isu,
        Claim::Key,
        Claim::Kid,
        Claim::Lnk,
        Claim::Mim,
        Claim::Mtd,
        Claim::Pri,
        Claim::Pub,
        Claim::Sub,
        Claim::Sys,
        Claim::Uid,
        Claim::Use,
    ];

    /// The stored (lower-case) name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Claim::Amb => "amb",
            Claim::Aud => "aud",
            Claim::Cap => "cap",
            Claim::Cmn => "cmn",
            Claim::Ctx => "ctx",
            Claim::Exp => "exp",
            Claim::Iat => "iat",
            Claim::Iss => "iss",
            Claim::Isu => "isu",
            Claim::Key => "key",
            Claim::Kid => "kid",
            Claim::Lnk => "lnk",
            Claim::Mim => "mim",
            Claim::Mtd => "mtd",
            Claim::Pri => "pri",
            Claim::Pub => "pub",
            Claim::Sub => "sub",
            Claim::Sys => "sys",
            Claim::Uid => "uid",
            Claim::Use => "use",
        }
    }

    /// Look up a claim by its stored name.
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.as_str() == name)
    }

    fn kind(self) -> ClaimKind {
        match self {
            Claim::Aud | Claim::Iss | Claim::Kid | Claim::Sub | Claim::Uid => ClaimKind::Uuid,
            Claim::Exp | Claim::Iat => ClaimKind::Timestamp,
            Claim::Cmn | Claim::Ctx | Claim::Isu | Claim::Key | Claim::Mim | Claim::Pub | Claim::Sys => {
                ClaimKind::Text
            }
            Claim::Amb | Claim::Mtd => ClaimKind::StringList,
            Claim::Use => ClaimKind::KeyCapabilities,
            Claim::Cap => ClaimKind::IdentityCapabilities,
            Claim::Lnk => ClaimKind::Links,
            Claim::Pri => ClaimKind::Object,
        }
    }

    /// Check that a value has the shape this claim requires.
    fn validate(self, value: &Value) -> Result<()> {
        let invalid = |reason: &str| CoreError::InvalidClaim {
            claim: self,
            reason: reason.to_string(),
        };

        match self.kind() {
            ClaimKind::Uuid => {
                let s = value.as_str().ok_or_else(|| invalid("expected a string"))?;
                Uuid::parse_str(s).map_err(|e| invalid(&e.to_string()))?;
            }
            ClaimKind::Timestamp => {
                let s = value.as_str().ok_or_else(|| invalid("expected a string"))?;
                parse_timestamp(s).ok_or_else(|| invalid("expected an RFC 3339 timestamp"))?;
            }
            ClaimKind::Text => {
                value.as_str().ok_or_else(|| invalid("expected a string"))?;
            }
            ClaimKind::StringList => {
                string_list(value).ok_or_else(|| invalid("expected a list of strings"))?;
            }
            ClaimKind::KeyCapabilities => {
                let names = string_list(value).ok_or_else(|| invalid("expected a list of strings"))?;
                for name in names {
                    KeyCapability::from_name(name)
                        .ok_or_else(|| invalid(&format!("unknown key capability {}", name)))?;
                }
            }
            ClaimKind::IdentityCapabilities => {
                let names = string_list(value).ok_or_else(|| invalid("expected a list of strings"))?;
                for name in names {
                    IdentityCapability::from_name(name)
                        .ok_or_else(|| invalid(&format!("unknown capability {}", name)))?;
                }
            }
            ClaimKind::Links => {
                let links = string_list(value).ok_or_else(|| invalid("expected a list of strings"))?;
                for link in links {
                    ItemLink::from_encoded(link).map_err(|e| invalid(&e.to_string()))?;
                }
            }
            ClaimKind::Object => {
                value.as_object().ok_or_else(|| invalid("expected an object"))?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for Claim {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Format a timestamp the way claims store it.
///
/// RFC 3339, UTC, microsecond precision, `Z` suffix.
pub fn format_timestamp(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Micros, true)
}

/// Parse a stored timestamp.
pub fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// The expiry `valid_for` after `issued_at`.
///
/// Fails when the result falls outside the representable date range.
pub fn expires_after(issued_at: DateTime<Utc>, valid_for: Duration) -> Result<DateTime<Utc>> {
    issued_at
        .checked_add_signed(valid_for)
        .ok_or_else(|| CoreError::InvalidClaim {
            claim: Claim::Exp,
            reason: format!("validity period of {} is out of range", valid_for),
        })
}

fn string_list(value: &Value) -> Option<Vec<&str>> {
    value.as_array()?.iter().map(Value::as_str).collect()
}

/// A value that can be put into a claim.
#[derive(Debug, Clone, PartialEq)]
pub struct ClaimValue(pub(crate) Value);

impl ClaimValue {
    /// The underlying JSON value.
    pub fn into_inner(self) -> Value {
        self.0
    }
}

impl From<&str> for ClaimValue {
    fn from(s: &str) -> Self {
        Self(Value::String(s.to_string()))
    }
}

impl From<String> for ClaimValue {
    fn from(s: String) -> Self {
        Self(Value::String(s))
    }
}

impl From<Uuid> for ClaimValue {
    fn from(id: Uuid) -> Self {
        Self(Value::String(id.to_string()))
    }
}

impl From<DateTime<Utc>> for ClaimValue {
    fn from(time: DateTime<Utc>) -> Self {
        Self(Value::String(format_timestamp(&time)))
    }
}

impl From<Vec<String>> for ClaimValue {
    fn from(list: Vec<String>) -> Self {
        Self(Value::Array(list.into_iter().map(Value::String).collect()))
    }
}

impl From<&[KeyCapability]> for ClaimValue {
    fn from(caps: &[KeyCapability]) -> Self {
        Self(Value::Array(
            caps.iter().map(|c| Value::String(c.as_str().to_string())).collect(),
        ))
    }
}

impl From<&[IdentityCapability]> for ClaimValue {
    fn from(caps: &[IdentityCapability]) -> Self {
        Self(Value::Array(
            caps.iter().map(|c| Value::String(c.as_str().to_string())).collect(),
        ))
    }
}

impl From<&[ItemLink]> for ClaimValue {
    fn from(links: &[ItemLink]) -> Self {
        Self(Value::Array(
            links.iter().map(|l| Value::String(l.to_encoded())).collect(),
        ))
    }
}

impl From<Value> for ClaimValue {
    fn from(value: Value) -> Self {
        Self(value)
    }
}

impl From<Map<String, Value>> for ClaimValue {
    fn from(map: Map<String, Value>) -> Self {
        Self(Value::Object(map))
    }
}

/// The claims of one item.
///
/// Mutation goes through the owning item, which refuses it once signed.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClaimsStore {
    entries: BTreeMap<Claim, Value>,
}

impl ClaimsStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of claims.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no claims are set.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True if the claim is set.
    pub fn contains(&self, claim: Claim) -> bool {
        self.entries.contains_key(&claim)
    }

    /// The raw value of a claim.
    pub fn get(&self, claim: Claim) -> Option<&Value> {
        self.entries.get(&claim)
    }

    /// Set a claim, replacing any previous value.
    pub fn put(&mut self, claim: Claim, value: impl Into<ClaimValue>) -> Result<()> {
        let value = value.into().0;
        claim.validate(&value)?;
        self.entries.insert(claim, value);
        Ok(())
    }

    /// Remove a claim, returning its previous value.
    pub fn remove(&mut self, claim: Claim) -> Option<Value> {
        self.entries.remove(&claim)
    }

    /// Read a text claim.
    pub fn get_str(&self, claim: Claim) -> Option<&str> {
        self.get(claim).and_then(Value::as_str)
    }

    /// Read a UUID claim.
    pub fn get_uuid(&self, claim: Claim) -> Option<Uuid> {
        self.get_str(claim).and_then(|s| Uuid::parse_str(s).ok())
    }

    /// Read a timestamp claim.
    pub fn get_time(&self, claim: Claim) -> Option<DateTime<Utc>> {
        self.get_str(claim).and_then(parse_timestamp)
    }

    /// Read a list-of-strings claim.
    pub fn get_strings(&self, claim: Claim) -> Option<Vec<String>> {
        self.get(claim)
            .and_then(string_list)
            .map(|list| list.into_iter().map(String::from).collect())
    }

    /// Read the key capabilities (`use`).
    pub fn key_capabilities(&self) -> Vec<KeyCapability> {
        self.get_strings(Claim::Use)
            .unwrap_or_default()
            .iter()
            .filter_map(|name| KeyCapability::from_name(name))
            .collect()
    }

    /// Read the identity capabilities (`cap`).
    pub fn identity_capabilities(&self) -> Vec<IdentityCapability> {
        self.get_strings(Claim::Cap)
            .unwrap_or_default()
            .iter()
            .filter_map(|name| IdentityCapability::from_name(name))
            .collect()
    }

    /// Read the item links (`lnk`).
    pub fn item_links(&self) -> Result<Vec<ItemLink>> {
        self.get_strings(Claim::Lnk)
            .unwrap_or_default()
            .iter()
            .map(|encoded| ItemLink::from_encoded(encoded))
            .collect()
    }

    /// Serialize to canonical JSON.
    pub fn to_canonical_json(&self) -> Result<String> {
        let map: Map<String, Value> = self
            .entries
            .iter()
            .map(|(claim, value)| (claim.as_str().to_string(), value.clone()))
            .collect();
        canonical_json(&Value::Object(map))
    }

    /// Parse from JSON, validating every claim.
    pub fn from_json(json: &str) -> Result<Self> {
        let map: Map<String, Value> = serde_json::from_str(json)
            .map_err(|e| CoreError::DecodingError(format!("claims: {}", e)))?;

        let mut entries = BTreeMap::new();
        for (name, value) in map {
            let claim = Claim::from_name(&name)
                .ok_or_else(|| CoreError::InvalidFormat(format!("unknown claim: {}", name)))?;
            claim.validate(&value)?;
            entries.insert(claim, value);
        }
        Ok(Self { entries })
    }
}
