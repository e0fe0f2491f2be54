//! Value Objects - Immutable domain primitives
//!
//! Value objects are identified by their value rather than identity.
//! They are immutable and can be freely shared.

use ipnet::Ipv4Net;
use serde::{Deserialize, Serialize};
use std::net::Ipv4Addr;

/// Number of addresses spanned by an inclusive range, as stored.
///
/// Ranges whose upper bound is 0 or 1 are legacy placeholder rows and
/// always report a length of 0.
pub fn range_length(range_from: u32, range_to: u32) -> u32 {
    if range_to > 1 {
        range_to.saturating_sub(range_from)
    } else {
        0
    }
}

/// An inclusive block of IPv4 addresses resolved from a WHOIS answer.
///
/// Blocks are produced from a CIDR (or a single address) and are the unit
/// persisted as an address range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AddressBlock {
    /// First address of the block
    pub first: Ipv4Addr,
    /// Last address of the block
    pub last: Ipv4Addr,
}

impl AddressBlock {
    pub fn new(first: Ipv4Addr, last: Ipv4Addr) -> Self {
        Self { first, last }
    }

    /// A block holding exactly one address.
    pub fn single(address: Ipv4Addr) -> Self {
        Self::new(address, address)
    }

    /// Block covered by a CIDR network, network and broadcast included.
    pub fn from_net(net: &Ipv4Net) -> Self {
        Self::new(net.network(), net.broadcast())
    }

    /// Check whether the address lies within the block bounds.
    pub fn contains(&self, address: Ipv4Addr) -> bool {
        self.first <= address && address <= self.last
    }

    /// Lower bound as an integer.
    pub fn range_from(&self) -> u32 {
        u32::from(self.first)
    }

    /// Upper bound as an integer.
    pub fn range_to(&self) -> u32 {
        u32::from(self.last)
    }
}

impl std::fmt::Display for AddressBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.first, self.last)
    }
}

/// Country code (ISO 3166-1 alpha-2) in the canonical lowercase form.
pub struct CountryCode;

impl CountryCode {
    /// Normalize a provider supplied country code.
    ///
    /// Returns `None` for missing, blank or non alpha-2 values.
    ///
    /// # Examples
    /// ```
    /// use isp_resolver::domain::value_objects::CountryCode;
    ///
    /// assert_eq!(CountryCode::normalize(Some("UN")), Some("un".to_string()));
    /// assert_eq!(CountryCode::normalize(Some("")), None);
    /// ```
    pub fn normalize(raw: Option<&str>) -> Option<String> {
        let code = raw?.trim();
        if code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic()) {
            Some(code.to_ascii_lowercase())
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ===== range_length Tests =====

    #[test]
    fn test_range_length_regular() {
        let from = u32::from(Ipv4Addr::new(1, 2, 3, 0));
        let to = u32::from(Ipv4Addr::new(1, 2, 3, 255));
        assert_eq!(range_length(from, to), 255);
    }

    #[test]
    fn test_range_length_single_address() {
        let ip = u32::from(Ipv4Addr::new(127, 0, 0, 1));
        assert_eq!(range_length(ip, ip), 0);
    }

    #[test]
    fn test_range_length_placeholder_rows() {
        assert_eq!(range_length(0, 0), 0);
        assert_eq!(range_length(0, 1), 0);
        assert_eq!(range_length(5, 1), 0);
    }

    #[test]
    fn test_range_length_full_space() {
        assert_eq!(range_length(0, u32::MAX), u32::MAX);
    }

    // ===== AddressBlock Tests =====

    #[test]
    fn test_block_from_net() {
        let net: Ipv4Net = "1.2.3.0/24".parse().unwrap();
        let block = AddressBlock::from_net(&net);

        assert_eq!(block.first, Ipv4Addr::new(1, 2, 3, 0));
        assert_eq!(block.last, Ipv4Addr::new(1, 2, 3, 255));
        assert_eq!(block.range_to() - block.range_from(), 255);
    }

    #[test]
    fn test_block_from_host_net() {
        let net: Ipv4Net = "1.2.3.4/32".parse().unwrap();
        let block = AddressBlock::from_net(&net);

        assert_eq!(block, AddressBlock::single(Ipv4Addr::new(1, 2, 3, 4)));
    }

    #[test]
    fn test_block_contains() {
        let block = AddressBlock::new(Ipv4Addr::new(10, 0, 0, 0), Ipv4Addr::new(10, 0, 0, 9));

        assert!(block.contains(Ipv4Addr::new(10, 0, 0, 0)));
        assert!(block.contains(Ipv4Addr::new(10, 0, 0, 9)));
        assert!(!block.contains(Ipv4Addr::new(10, 0, 0, 10)));
        assert!(!block.contains(Ipv4Addr::new(9, 255, 255, 255)));
    }

    #[test]
    fn test_block_display() {
        let block = AddressBlock::new(Ipv4Addr::new(1, 2, 3, 0), Ipv4Addr::new(1, 2, 3, 255));
        assert_eq!(block.to_string(), "1.2.3.0-1.2.3.255");
    }

    // ===== CountryCode Tests =====

    #[test]
    fn test_country_normalize_lowercases() {
        let tests = vec![("UN", "un"), ("eu", "eu"), ("Br", "br"), (" US ", "us")];

        for (input, expected) in tests {
            assert_eq!(
                CountryCode::normalize(Some(input)),
                Some(expected.to_string()),
                "Failed for input: {}",
                input
            );
        }
    }

    #[test]
    fn test_country_normalize_rejects_invalid() {
        let invalid_inputs = vec!["", "  ", "USA", "U", "1A", "ü"];

        for input in invalid_inputs {
            assert_eq!(
                CountryCode::normalize(Some(input)),
                None,
                "Expected None for input: {:?}",
                input
            );
        }
    }

    #[test]
    fn test_country_normalize_none() {
        assert_eq!(CountryCode::normalize(None), None);
    }
}
