//! WHOIS Client Port
//!
//! Defines the interface for querying the owning network of an address.

use crate::domain::entities::WhoisRecord;
use crate::domain::errors::WhoisError;
use async_trait::async_trait;
use std::net::Ipv4Addr;

/// Client for an external WHOIS provider.
///
/// This is an outbound port. Implementations perform the network query
/// and return the provider's answer as a typed record; any transport or
/// decoding problem is reported as [`WhoisError::Unavailable`].
#[async_trait]
pub trait WhoisClient: Send + Sync {
    /// Look up the networks registered for an address.
    async fn lookup(&self, address: Ipv4Addr) -> Result<WhoisRecord, WhoisError>;
}
