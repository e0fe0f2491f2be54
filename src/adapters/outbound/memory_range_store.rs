//! In-Memory Range Store
//!
//! Implements RangeStore on mutex-guarded vectors. A transaction holds the
//! lock for its whole unit of work and undoes its own writes on failure.

use crate::domain::entities::{
    expiry_cutoff, AddressRange, NetworkIdentity, RangeMatch, Resolution,
};
use crate::domain::errors::StoreError;
use crate::domain::ports::{RangeStore, RangeTransaction, UnitOfWork};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default)]
struct MemoryState {
    ranges: Vec<AddressRange>,
    identities: Vec<NetworkIdentity>,
    last_range_id: i64,
    last_identity_id: i64,
}

impl MemoryState {
    fn identity(&self, id: i64) -> Option<NetworkIdentity> {
        self.identities.iter().find(|i| i.id == id).cloned()
    }
}

/// Unit of work applied in place, with enough bookkeeping to undo it.
///
/// Transactions only append rows and set owners, so a rollback truncates
/// the appended rows and restores the replaced owners.
struct MemoryUnit<'a> {
    state: &'a mut MemoryState,
    ranges_len: usize,
    identities_len: usize,
    last_range_id: i64,
    last_identity_id: i64,
    replaced_owners: Vec<(i64, Option<i64>)>,
}

impl<'a> MemoryUnit<'a> {
    fn begin(state: &'a mut MemoryState) -> Self {
        Self {
            ranges_len: state.ranges.len(),
            identities_len: state.identities.len(),
            last_range_id: state.last_range_id,
            last_identity_id: state.last_identity_id,
            replaced_owners: Vec::new(),
            state,
        }
    }

    fn rollback(self) {
        let state = self.state;
        state.ranges.truncate(self.ranges_len);
        state.identities.truncate(self.identities_len);
        state.last_range_id = self.last_range_id;
        state.last_identity_id = self.last_identity_id;
        for (range_id, owner_id) in self.replaced_owners.into_iter().rev() {
            if let Some(range) = state.ranges.iter_mut().find(|r| r.id == range_id) {
                range.owner_id = owner_id;
            }
        }
    }
}

impl RangeTransaction for MemoryUnit<'_> {
    fn create_range_if_absent(
        &mut self,
        range_from: u32,
        range_to: u32,
        created_at: DateTime<Utc>,
    ) -> Result<(AddressRange, bool), StoreError> {
        let state = &mut *self.state;
        if let Some(existing) = state
            .ranges
            .iter()
            .find(|r| r.range_from == range_from && r.range_to == range_to)
        {
            return Ok((existing.clone(), false));
        }

        state.last_range_id += 1;
        let range = AddressRange {
            id: state.last_range_id,
            range_from,
            range_to,
            owner_id: None,
            created_at,
        };
        state.ranges.push(range.clone());
        Ok((range, true))
    }

    fn get_identity(&mut self, id: i64) -> Result<Option<NetworkIdentity>, StoreError> {
        Ok(self.state.identity(id))
    }

    fn find_identity(
        &mut self,
        name: &str,
        country: Option<&str>,
    ) -> Result<Option<NetworkIdentity>, StoreError> {
        Ok(self
            .state
            .identities
            .iter()
            .find(|i| i.name.as_deref() == Some(name) && i.country.as_deref() == country)
            .cloned())
    }

    fn create_identity(
        &mut self,
        name: Option<&str>,
        country: Option<&str>,
    ) -> Result<NetworkIdentity, StoreError> {
        let state = &mut *self.state;
        state.last_identity_id += 1;
        let identity = NetworkIdentity {
            id: state.last_identity_id,
            name: name.map(str::to_string),
            country: country.map(str::to_string),
        };
        state.identities.push(identity.clone());
        Ok(identity)
    }

    fn attach_owner(&mut self, range_id: i64, owner_id: i64) -> Result<(), StoreError> {
        if self.state.identity(owner_id).is_none() {
            return Err(StoreError::Backend(format!("no identity with id {}", owner_id)));
        }
        let range = self
            .state
            .ranges
            .iter_mut()
            .find(|r| r.id == range_id)
            .ok_or_else(|| StoreError::Backend(format!("no range with id {}", range_id)))?;
        self.replaced_owners.push((range_id, range.owner_id));
        range.owner_id = Some(owner_id);
        Ok(())
    }
}

/// Memory-backed range store.
///
/// Nothing survives the process. Used in tests and by callers that only
/// want to deduplicate WHOIS queries for the lifetime of the process.
#[derive(Clone, Default)]
pub struct MemoryRangeStore {
    state: Arc<Mutex<MemoryState>>,
}

impl MemoryRangeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RangeStore for MemoryRangeStore {
    async fn find_best_match(&self, ip: u32) -> Result<Option<RangeMatch>, StoreError> {
        let state = self.state.lock();
        let best = state
            .ranges
            .iter()
            .filter(|r| r.contains(ip))
            .min_by_key(|r| (r.length(), r.range_from, r.id));

        Ok(best.map(|range| RangeMatch {
            range: range.clone(),
            owner: range.owner_id.and_then(|id| state.identity(id)),
        }))
    }

    async fn transaction(&self, work: UnitOfWork) -> Result<Resolution, StoreError> {
        let mut state = self.state.lock();
        let mut unit = MemoryUnit::begin(&mut state);
        let result = work(&mut unit);
        if result.is_err() {
            unit.rollback();
        }
        result
    }

    async fn delete_expired(&self, ttl: Duration, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let cutoff = expiry_cutoff(ttl, now);
        let mut state = self.state.lock();
        let before = state.ranges.len();
        state.ranges.retain(|r| r.created_at >= cutoff);
        Ok(before - state.ranges.len())
    }

    async fn count_ranges(&self) -> Result<usize, StoreError> {
        Ok(self.state.lock().ranges.len())
    }

    async fn count_identities(&self) -> Result<usize, StoreError> {
        Ok(self.state.lock().identities.len())
    }
}
