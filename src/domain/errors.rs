//! Domain Errors
//!
//! Error taxonomy shared by the ports, the WHOIS parser and the resolver.

use std::net::Ipv4Addr;
use thiserror::Error;

/// Failures while obtaining or interpreting a WHOIS answer.
///
/// None of these ever reach the caller of `match_or_create`; they only
/// decide whether a fresh range can be recorded.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WhoisError {
    /// The provider record carried no network entries
    #[error("whois data contains no nets")]
    EmptyResult,

    /// The first network entry has no CIDR at all
    #[error("whois net has no cidr")]
    MissingCidr,

    /// A CIDR could not be parsed as a strict IPv4 network
    #[error("malformed cidr {0:?}")]
    MalformedCidr(String),

    /// None of the listed CIDRs covers the queried address
    #[error("cidr list {cidr:?} does not contain {address}")]
    NoContainingCidr { cidr: String, address: Ipv4Addr },

    /// The resolved range ends before it starts
    #[error("invalid ip range {first}-{last}")]
    InvalidRange { first: Ipv4Addr, last: Ipv4Addr },

    /// The resolved range does not cover the queried address
    #[error("address {address} is outside of {first}-{last}")]
    AddressOutOfRange {
        address: Ipv4Addr,
        first: Ipv4Addr,
        last: Ipv4Addr,
    },

    /// Network failure, timeout or undecodable provider response
    #[error("whois unavailable: {0}")]
    Unavailable(String),
}

/// Failures of the persistence backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The database rejected a statement
    #[error("database error: {0}")]
    Backend(String),

    /// A blocking storage task could not complete
    #[error("storage task failed: {0}")]
    Task(String),

    /// A stored value does not fit the domain model
    #[error("corrupt row: {0}")]
    Corrupt(String),
}

/// Errors surfaced by the resolver's public API.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// No cached range covers the address
    #[error("no address range covers {0}")]
    NotFound(Ipv4Addr),

    #[error(transparent)]
    Store(#[from] StoreError),
}
