//! IANA Reserved Classifier
//!
//! Implements ReservedClassifier with the IANA IPv4 special-purpose
//! address registry.

use crate::domain::ports::ReservedClassifier;
use ipnet::Ipv4Net;
use std::net::Ipv4Addr;

/// Special-purpose blocks, checked in order.
const RESERVED_BLOCKS: &[(&str, &str)] = &[
    ("0.0.0.0/8", "This Network"),
    ("127.0.0.0/8", "Loopback"),
    ("169.254.0.0/16", "Link Local"),
    ("192.0.0.0/24", "IETF Protocol Assignments"),
    ("192.0.2.0/24", "TEST-NET-1"),
    ("192.88.99.0/24", "6to4 Relay Anycast"),
    ("198.18.0.0/15", "Network Interconnect Device Benchmark Testing"),
    ("198.51.100.0/24", "TEST-NET-2"),
    ("203.0.113.0/24", "TEST-NET-3"),
    ("224.0.0.0/4", "Multicast"),
    ("255.255.255.255/32", "Limited Broadcast"),
    ("240.0.0.0/4", "Reserved"),
    ("10.0.0.0/8", "Private-Use Networks"),
    ("172.16.0.0/12", "Private-Use Networks"),
    ("192.168.0.0/16", "Private-Use Networks"),
    ("100.64.0.0/10", "Shared Address Space"),
];

/// Classifier backed by a static table of special-purpose networks.
pub struct IanaReservedClassifier {
    blocks: Vec<(Ipv4Net, &'static str)>,
}

impl IanaReservedClassifier {
    /// Build the classifier from the built-in registry table.
    pub fn new() -> Self {
        let blocks = RESERVED_BLOCKS
            .iter()
            .filter_map(|(cidr, name)| cidr.parse::<Ipv4Net>().ok().map(|net| (net, *name)))
            .collect();
        Self { blocks }
    }
}

impl Default for IanaReservedClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl ReservedClassifier for IanaReservedClassifier {
    fn classify(&self, address: Ipv4Addr) -> Option<String> {
        self.blocks
            .iter()
            .find(|(net, _)| net.contains(&address))
            .map(|(_, name)| name.to_string())
    }
}
