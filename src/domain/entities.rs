//! Domain Entities - Core business objects
//!
//! These entities represent the core concepts of the range cache:
//! persisted address ranges, the network identities that own them,
//! and the transient WHOIS records used to create both.

use crate::domain::value_objects::{range_length, AddressBlock};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;
use std::time::Duration;

/// A cached, inclusive block of IPv4 addresses attributed to an owner.
///
/// Ranges are created once when a WHOIS answer is accepted and are never
/// updated afterwards; they are removed in bulk once they expire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressRange {
    /// Storage identifier
    pub id: i64,
    /// First address of the range (inclusive)
    pub range_from: u32,
    /// Last address of the range (inclusive)
    pub range_to: u32,
    /// Owning network identity, if one has been attached
    pub owner_id: Option<i64>,
    /// When the range was resolved
    pub created_at: DateTime<Utc>,
}

impl AddressRange {
    /// Number of addresses in the range (0 for placeholder rows).
    pub fn length(&self) -> u32 {
        range_length(self.range_from, self.range_to)
    }

    /// Check whether the range covers the address.
    pub fn contains(&self, ip: u32) -> bool {
        self.range_from <= ip && ip <= self.range_to
    }

    /// Range start in dotted form.
    pub fn start_address(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.range_from)
    }

    /// Range end in dotted form.
    pub fn end_address(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.range_to)
    }

    /// Whether the range is still within its time-to-live.
    pub fn is_fresh(&self, ttl: Duration, now: DateTime<Utc>) -> bool {
        self.created_at >= expiry_cutoff(ttl, now)
    }
}

impl std::fmt::Display for AddressRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.start_address(), self.end_address())
    }
}

/// Oldest creation time a range may have and still be considered fresh.
pub fn expiry_cutoff(ttl: Duration, now: DateTime<Utc>) -> DateTime<Utc> {
    chrono::Duration::from_std(ttl)
        .ok()
        .and_then(|ttl| now.checked_sub_signed(ttl))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}

/// The ISP or organization an address range is attributed to.
///
/// Identities with a name are shared between ranges of the same
/// `(name, country)` pair. Unnamed identities are never shared.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkIdentity {
    /// Storage identifier
    pub id: i64,
    /// Organization name
    pub name: Option<String>,
    /// Lowercase ISO 3166-1 alpha-2 country code
    pub country: Option<String>,
}

impl std::fmt::Display for NetworkIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}, {}",
            self.name.as_deref().unwrap_or("None"),
            self.country.as_deref().unwrap_or("None")
        )
    }
}

/// The narrowest cached range covering an address, with its owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RangeMatch {
    pub range: AddressRange,
    pub owner: Option<NetworkIdentity>,
}

impl RangeMatch {
    pub fn length(&self) -> u32 {
        self.range.length()
    }
}

/// Outcome of resolving an address to its owner.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct Resolution {
    /// Owner of the address, if anything is known
    pub owner: Option<NetworkIdentity>,
    /// Whether the owner identity was created by this resolution
    pub created: bool,
}

impl Resolution {
    pub fn new(owner: Option<NetworkIdentity>, created: bool) -> Self {
        Self { owner, created }
    }

    /// A resolution that reports an already known owner (or nothing).
    pub fn existing(owner: Option<NetworkIdentity>) -> Self {
        Self::new(owner, false)
    }
}

/// A single network entry of a WHOIS provider record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WhoisNet {
    /// One CIDR, or several separated by commas
    pub cidr: Option<String>,
    /// Free-form network description, possibly multi-line
    pub description: Option<String>,
    /// Country code in any case
    pub country: Option<String>,
}

/// Raw record returned by a WHOIS provider.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WhoisRecord {
    pub nets: Vec<WhoisNet>,
}

impl WhoisRecord {
    pub fn with_net(net: WhoisNet) -> Self {
        Self { nets: vec![net] }
    }
}

/// Canonical result of a WHOIS lookup, ready to be persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WhoisResult {
    pub description: Option<String>,
    pub country: Option<String>,
    pub block: AddressBlock,
}
