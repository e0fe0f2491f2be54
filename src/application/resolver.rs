//! Resolver - Main application use case
//!
//! Maps IPv4 addresses to the organization that owns them. Cached ranges
//! are consulted first; a WHOIS lookup is only made when nothing precise
//! enough is cached, and its answer is persisted for later calls.

use crate::domain::entities::{NetworkIdentity, Resolution, WhoisResult};
use crate::domain::errors::{ResolveError, StoreError, WhoisError};
use crate::domain::ports::{RangeStore, RangeTransaction, ReservedClassifier, WhoisClient};
use crate::domain::services::WhoisResponseParser;
use chrono::Utc;
use std::net::Ipv4Addr;
use std::sync::Arc;
use std::time::Duration;

/// Widest range (256 * 256 * 64 addresses) trusted without a fresh lookup.
pub const DEFAULT_ACCEPTED_RANGE_LENGTH: u32 = 4_194_304;

/// Thresholds applied by the resolver.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Cached ranges longer than this trigger a new WHOIS lookup
    pub accepted_range_length: u32,
    /// Upper bound for a single WHOIS lookup
    pub whois_timeout: Duration,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            accepted_range_length: DEFAULT_ACCEPTED_RANGE_LENGTH,
            whois_timeout: Duration::from_secs(10),
        }
    }
}

/// Resolver - main application use case.
///
/// 1. Looks up the narrowest cached range for an address
/// 2. Falls back to WHOIS when the cached range is missing or too broad
/// 3. Stores the new range and attributes it to a (possibly shared) identity
pub struct Resolver {
    store: Arc<dyn RangeStore>,
    whois: Arc<dyn WhoisClient>,
    classifier: Arc<dyn ReservedClassifier>,
    config: ResolverConfig,
}

impl Resolver {
    /// Create a new resolver.
    pub fn new(
        store: Arc<dyn RangeStore>,
        whois: Arc<dyn WhoisClient>,
        classifier: Arc<dyn ReservedClassifier>,
        config: ResolverConfig,
    ) -> Self {
        Self {
            store,
            whois,
            classifier,
            config,
        }
    }

    /// Find the owner of the narrowest cached range containing the address.
    ///
    /// # Returns
    /// The owner (None for an ownerless range) and the range length
    ///
    /// # Errors
    /// [`ResolveError::NotFound`] if no cached range covers the address
    pub async fn match_address(
        &self,
        address: Ipv4Addr,
    ) -> Result<(Option<NetworkIdentity>, u32), ResolveError> {
        match self.store.find_best_match(u32::from(address)).await? {
            Some(found) => {
                let length = found.length();
                Ok((found.owner, length))
            }
            None => Err(ResolveError::NotFound(address)),
        }
    }

    /// Resolve the owner of an address, querying WHOIS when needed.
    ///
    /// WHOIS failures are never returned: the resolver falls back to the
    /// broad cached owner, if there was one. `created` is true only when a
    /// new identity was stored by this call.
    ///
    /// # Errors
    /// Storage failures are propagated as [`StoreError`].
    pub async fn match_or_create(&self, address: Ipv4Addr) -> Result<Resolution, StoreError> {
        let fallback = match self.match_address(address).await {
            Ok((owner, length)) if length <= self.config.accepted_range_length => {
                return Ok(Resolution::existing(owner));
            }
            Ok((owner, length)) => {
                tracing::info!("existing range for {} is too broad: {}", address, length);
                owner
            }
            Err(ResolveError::NotFound(_)) => None,
            Err(ResolveError::Store(e)) => return Err(e),
        };

        let whois = match self.lookup(address).await {
            Ok(whois) => whois,
            Err(e) => {
                tracing::warn!("unable to query whois for {}: {}", address, e);
                return Ok(Resolution::existing(fallback));
            }
        };

        self.persist(whois).await
    }

    /// Query WHOIS (or the reserved registry) and validate the answer.
    async fn lookup(&self, address: Ipv4Addr) -> Result<WhoisResult, WhoisError> {
        if let Some(block_name) = self.classifier.classify(address) {
            tracing::debug!("{} belongs to reserved block {}", address, block_name);
            return Ok(WhoisResponseParser::reserved(address, &block_name));
        }

        let timeout = self.config.whois_timeout;
        let record = tokio::time::timeout(timeout, self.whois.lookup(address))
            .await
            .map_err(|_| WhoisError::Unavailable(format!("lookup timed out after {:?}", timeout)))??;
        tracing::info!("received whois for {}: {:?}", address, record);

        WhoisResponseParser::parse(address, &record)
    }

    /// Store the looked up range and its owner in one transaction.
    async fn persist(&self, whois: WhoisResult) -> Result<Resolution, StoreError> {
        let WhoisResult {
            description,
            country,
            block,
        } = whois;
        let created_at = Utc::now();

        self.store
            .transaction(Box::new(move |tx: &mut dyn RangeTransaction| {
                let (range, inserted) =
                    tx.create_range_if_absent(block.range_from(), block.range_to(), created_at)?;

                // another resolution got here first
                if !inserted {
                    let owner = match range.owner_id {
                        Some(id) => tx.get_identity(id)?,
                        None => None,
                    };
                    tracing::info!(
                        "range {} already belongs to {}",
                        range,
                        owner.as_ref().map(|o| o.to_string()).unwrap_or_else(|| "nobody".to_string())
                    );
                    return Ok(Resolution::existing(owner));
                }

                let (owner, created) = match description.as_deref() {
                    Some(name) => match tx.find_identity(name, country.as_deref())? {
                        Some(existing) => (existing, false),
                        None => (tx.create_identity(Some(name), country.as_deref())?, true),
                    },
                    // anonymous identities are never shared
                    None => (tx.create_identity(None, country.as_deref())?, true),
                };
                tx.attach_owner(range.id, owner.id)?;
                tracing::debug!("range {} attributed to {}", range, owner);

                Ok(Resolution::new(Some(owner), created))
            }))
            .await
    }
}
