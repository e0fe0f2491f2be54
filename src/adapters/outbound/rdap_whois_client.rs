//! RDAP WHOIS Client
//!
//! Implements WhoisClient over RDAP (RFC 9083) using reqwest.
//! Network objects are mapped onto the provider-neutral WhoisRecord.
//!
//! See: https://rdap.org

use crate::domain::entities::{WhoisNet, WhoisRecord};
use crate::domain::errors::WhoisError;
use crate::domain::ports::WhoisClient;
use async_trait::async_trait;
use ipnet::Ipv4Subnets;
use serde::Deserialize;
use std::net::Ipv4Addr;
use std::time::Duration;

/// RDAP `ip network` object. Only the fields we map are decoded.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RdapNetwork {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    country: Option<String>,
    #[serde(default)]
    start_address: Option<String>,
    #[serde(default)]
    end_address: Option<String>,
    #[serde(default)]
    remarks: Vec<RdapRemark>,
    #[serde(default, rename = "cidr0_cidrs")]
    cidrs: Vec<RdapCidr>,
}

#[derive(Debug, Default, Deserialize)]
struct RdapRemark {
    #[serde(default)]
    description: Vec<String>,
}

/// Entry of the `cidr0` extension.
#[derive(Debug, Deserialize)]
struct RdapCidr {
    #[serde(default)]
    v4prefix: Option<String>,
    #[serde(default)]
    length: Option<u8>,
}

impl RdapNetwork {
    fn cidr(&self) -> Option<String> {
        let listed: Vec<String> = self
            .cidrs
            .iter()
            .filter_map(|c| match (&c.v4prefix, c.length) {
                (Some(prefix), Some(length)) => Some(format!("{}/{}", prefix, length)),
                (Some(prefix), None) => Some(prefix.clone()),
                _ => None,
            })
            .collect();
        if !listed.is_empty() {
            return Some(listed.join(", "));
        }

        // no cidr0 extension: cover startAddress..endAddress
        let start: Ipv4Addr = self.start_address.as_deref()?.trim().parse().ok()?;
        let end: Ipv4Addr = self.end_address.as_deref()?.trim().parse().ok()?;
        let covered: Vec<String> = Ipv4Subnets::new(start, end, 0)
            .map(|net| net.to_string())
            .collect();
        if covered.is_empty() {
            None
        } else {
            Some(covered.join(", "))
        }
    }

    fn description(&self) -> Option<String> {
        self.remarks
            .iter()
            .find(|r| !r.description.is_empty())
            .map(|r| r.description.join("\n"))
            .or_else(|| self.name.clone())
    }

    fn into_record(self) -> WhoisRecord {
        let net = WhoisNet {
            cidr: self.cidr(),
            description: self.description(),
            country: self.country,
        };
        WhoisRecord::with_net(net)
    }
}

/// Configuration for the RDAP client.
#[derive(Debug, Clone)]
pub struct RdapConfig {
    /// Base URL of the RDAP service (e.g., "https://rdap.org")
    pub base_url: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for RdapConfig {
    fn default() -> Self {
        Self {
            base_url: "https://rdap.org".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// WHOIS client backed by an RDAP server.
pub struct RdapWhoisClient {
    config: RdapConfig,
    client: reqwest::Client,
}

impl RdapWhoisClient {
    /// Create a new RDAP client with the given configuration.
    pub fn new(config: RdapConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    fn lookup_url(&self, address: Ipv4Addr) -> String {
        format!("{}/ip/{}", self.config.base_url.trim_end_matches('/'), address)
    }
}

#[async_trait]
impl WhoisClient for RdapWhoisClient {
    async fn lookup(&self, address: Ipv4Addr) -> Result<WhoisRecord, WhoisError> {
        let url = self.lookup_url(address);
        let response = self
            .client
            .get(&url)
            .header(reqwest::header::ACCEPT, "application/rdap+json")
            .send()
            .await
            .map_err(|e| WhoisError::Unavailable(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(WhoisError::Unavailable(format!(
                "rdap lookup failed: {} - {}",
                status, body
            )));
        }

        let network: RdapNetwork = response
            .json()
            .await
            .map_err(|e| WhoisError::Unavailable(format!("invalid rdap response: {}", e)))?;
        tracing::debug!("rdap lookup for {} returned {:?}", address, network);

        Ok(network.into_record())
    }
}
