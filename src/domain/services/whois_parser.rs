//! WHOIS Response Parser
//!
//! Pure domain logic turning a provider record into a validated
//! [`WhoisResult`]. This service has NO external dependencies besides
//! CIDR arithmetic.

use crate::domain::entities::{WhoisRecord, WhoisResult};
use crate::domain::errors::WhoisError;
use crate::domain::value_objects::{AddressBlock, CountryCode};
use ipnet::Ipv4Net;
use std::net::Ipv4Addr;

/// Longest organization name kept from a network description.
pub const MAX_DESCRIPTION_LEN: usize = 255;

/// Parser for WHOIS provider answers.
///
/// Only the first network entry of a record is considered. Its CIDR must
/// cover the queried address, otherwise the answer is rejected so that no
/// misleading range gets cached.
pub struct WhoisResponseParser;

impl WhoisResponseParser {
    /// Build the result for an address inside a well-known reserved block.
    ///
    /// The cached range is the single address itself.
    pub fn reserved(address: Ipv4Addr, block_name: &str) -> WhoisResult {
        WhoisResult {
            description: Some(block_name.to_string()),
            country: None,
            block: AddressBlock::single(address),
        }
    }

    /// Parse and validate a provider record for an address.
    ///
    /// # Errors
    /// * [`WhoisError::EmptyResult`] - the record has no network entries
    /// * [`WhoisError::MissingCidr`] / [`WhoisError::MalformedCidr`] - unusable CIDR
    /// * [`WhoisError::NoContainingCidr`] - no listed CIDR covers the address
    /// * [`WhoisError::InvalidRange`] / [`WhoisError::AddressOutOfRange`] - bad bounds
    pub fn parse(address: Ipv4Addr, record: &WhoisRecord) -> Result<WhoisResult, WhoisError> {
        let net = record.nets.first().ok_or(WhoisError::EmptyResult)?;
        let cidr = net.cidr.as_deref().ok_or(WhoisError::MissingCidr)?;

        // some registries return several comma separated networks
        let block = if cidr.contains(',') {
            Self::pick_cidr(address, cidr)?
        } else {
            Self::parse_cidr(cidr)?
        };

        if block.first > block.last {
            return Err(WhoisError::InvalidRange {
                first: block.first,
                last: block.last,
            });
        }
        if !block.contains(address) {
            return Err(WhoisError::AddressOutOfRange {
                address,
                first: block.first,
                last: block.last,
            });
        }

        Ok(WhoisResult {
            description: net.description.as_deref().and_then(Self::format_description),
            country: CountryCode::normalize(net.country.as_deref()),
            block,
        })
    }

    /// Reduce a free-form description to a single organization name.
    ///
    /// Providers often append abuse contacts or disclaimers on the
    /// following lines; only the first non-blank line is kept, trimmed and capped at
    /// [`MAX_DESCRIPTION_LEN`] characters.
    pub fn format_description(raw: &str) -> Option<String> {
        let first_line = raw
            .split(is_line_break)
            .map(str::trim)
            .find(|line| !line.is_empty())?;
        Some(first_line.chars().take(MAX_DESCRIPTION_LEN).collect())
    }

    /// Select the first CIDR from a comma separated list that covers the address.
    fn pick_cidr(address: Ipv4Addr, cidr_list: &str) -> Result<AddressBlock, WhoisError> {
        for item in cidr_list.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            let block = Self::parse_cidr(item)?;
            if block.contains(address) {
                return Ok(block);
            }
        }
        Err(WhoisError::NoContainingCidr {
            cidr: cidr_list.to_string(),
            address,
        })
    }

    /// Parse a strict IPv4 network. A bare address is read as a /32.
    fn parse_cidr(raw: &str) -> Result<AddressBlock, WhoisError> {
        let raw = raw.trim();
        let net = match raw.parse::<Ipv4Net>() {
            Ok(net) => net,
            Err(_) => raw
                .parse::<Ipv4Addr>()
                .map(Ipv4Net::from)
                .map_err(|_| WhoisError::MalformedCidr(raw.to_string()))?,
        };
        // host bits set, e.g. 1.2.3.4/0
        if net.trunc() != net {
            return Err(WhoisError::MalformedCidr(raw.to_string()));
        }
        Ok(AddressBlock::from_net(&net))
    }
}

fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\u{0b}' | '\u{0c}' | '\u{1c}' | '\u{1d}' | '\u{1e}' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}
