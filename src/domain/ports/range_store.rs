//! Range Store Port
//!
//! Defines the interface for persisting address ranges and the network
//! identities that own them. Implementations may use SQLite or memory.

use crate::domain::entities::{AddressRange, NetworkIdentity, RangeMatch, Resolution};
use crate::domain::errors::StoreError;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;

/// Operations available inside a single storage transaction.
///
/// Everything done through one transaction is committed together when the
/// unit of work returns `Ok`, and discarded when it returns `Err`.
pub trait RangeTransaction {
    /// Insert a range unless the exact `(range_from, range_to)` pair exists.
    ///
    /// Returns the stored row and whether it was inserted by this call.
    /// An existing row is returned untouched.
    fn create_range_if_absent(
        &mut self,
        range_from: u32,
        range_to: u32,
        created_at: DateTime<Utc>,
    ) -> Result<(AddressRange, bool), StoreError>;

    /// Fetch an identity by id.
    fn get_identity(&mut self, id: i64) -> Result<Option<NetworkIdentity>, StoreError>;

    /// Find a named identity with exactly the given country.
    ///
    /// A `None` country only matches identities stored without a country.
    fn find_identity(
        &mut self,
        name: &str,
        country: Option<&str>,
    ) -> Result<Option<NetworkIdentity>, StoreError>;

    /// Create a new identity.
    fn create_identity(
        &mut self,
        name: Option<&str>,
        country: Option<&str>,
    ) -> Result<NetworkIdentity, StoreError>;

    /// Attribute a range to an identity.
    fn attach_owner(&mut self, range_id: i64, owner_id: i64) -> Result<(), StoreError>;
}

/// A unit of work executed atomically by [`RangeStore::transaction`].
pub type UnitOfWork =
    Box<dyn FnOnce(&mut dyn RangeTransaction) -> Result<Resolution, StoreError> + Send>;

/// Store for cached address ranges and network identities.
///
/// This is an outbound port. The resolver reads through
/// [`find_best_match`](RangeStore::find_best_match) and writes exclusively
/// through [`transaction`](RangeStore::transaction).
#[async_trait]
pub trait RangeStore: Send + Sync {
    /// Find the narrowest range containing the address.
    ///
    /// Ranges are ordered by length, then by lowest `range_from`, then by
    /// insertion order. Returns None if no range contains the address.
    async fn find_best_match(&self, ip: u32) -> Result<Option<RangeMatch>, StoreError>;

    /// Run a unit of work inside one transaction.
    async fn transaction(&self, work: UnitOfWork) -> Result<Resolution, StoreError>;

    /// Delete every range created before `now - ttl`.
    ///
    /// Returns the number of deleted ranges.
    async fn delete_expired(&self, ttl: Duration, now: DateTime<Utc>) -> Result<usize, StoreError>;

    /// Number of stored ranges.
    async fn count_ranges(&self) -> Result<usize, StoreError>;

    /// Number of stored identities.
    async fn count_identities(&self) -> Result<usize, StoreError>;
}
