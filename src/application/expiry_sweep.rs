//! Expiry Sweep
//!
//! Periodically prunes cached ranges older than the configured TTL so that
//! addresses get re-resolved with fresh WHOIS data.

use crate::domain::errors::StoreError;
use crate::domain::ports::RangeStore;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Default age (180 days) after which a cached range is deleted.
pub const DEFAULT_RANGE_TTL: Duration = Duration::from_secs(180 * 24 * 60 * 60);

/// Deletes expired ranges from a range store.
#[derive(Clone)]
pub struct ExpirySweep {
    store: Arc<dyn RangeStore>,
    ttl: Duration,
}

impl ExpirySweep {
    pub fn new(store: Arc<dyn RangeStore>, ttl: Duration) -> Self {
        Self { store, ttl }
    }

    /// Delete every range created before `now - ttl`.
    ///
    /// Returns the number of pruned ranges. Identities are kept.
    pub async fn run_once(&self, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let pruned = self.store.delete_expired(self.ttl, now).await?;
        if pruned > 0 {
            tracing::info!("pruned {} expired ranges", pruned);
        } else {
            tracing::info!("no expired ranges to prune");
        }
        Ok(pruned)
    }

    /// Start the background sweep task.
    ///
    /// The first sweep runs immediately, then once per `interval`.
    pub fn spawn(&self, interval: Duration) -> JoinHandle<()> {
        let sweep = self.clone();

        tokio::spawn(async move {
            loop {
                if let Err(e) = sweep.run_once(Utc::now()).await {
                    tracing::error!("expiry sweep failed: {}", e);
                }
                tokio::time::sleep(interval).await;
            }
        })
    }
}
