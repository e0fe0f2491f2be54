//! Reserved Address Classifier Port
//!
//! Defines the interface for recognizing well-known special purpose blocks.

use std::net::Ipv4Addr;

/// Classifier for addresses that no WHOIS provider can attribute.
///
/// Loopback, private-use, documentation, multicast and similar blocks
/// are answered locally instead of being sent to a provider.
pub trait ReservedClassifier: Send + Sync {
    /// Return the name of the reserved block containing the address,
    /// or None if the address is globally routable.
    fn classify(&self, address: Ipv4Addr) -> Option<String>;
}
