//! SQLite Range Store
//!
//! Implements RangeStore using SQLite for storage.
//! Blocking database work runs on the Tokio blocking pool.

use crate::domain::entities::{
    expiry_cutoff, AddressRange, NetworkIdentity, RangeMatch, Resolution,
};
use crate::domain::errors::StoreError;
use crate::domain::ports::{RangeStore, RangeTransaction, UnitOfWork};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::sync::Arc;
use std::time::Duration;

/// SQL schema for the range cache.
pub const RANGES_SCHEMA: &str = r#"
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS network_identities (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT,
    country TEXT
);

CREATE INDEX IF NOT EXISTS idx_network_identities_name ON network_identities(name, country);

CREATE TABLE IF NOT EXISTS address_ranges (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    range_from INTEGER NOT NULL,
    range_to INTEGER NOT NULL,
    owner_id INTEGER REFERENCES network_identities(id) ON DELETE CASCADE,
    created_at INTEGER NOT NULL,
    UNIQUE (range_from, range_to)
);

CREATE INDEX IF NOT EXISTS idx_address_ranges_length
    ON address_ranges((CASE WHEN range_to > 1 THEN range_to - range_from ELSE 0 END));
CREATE INDEX IF NOT EXISTS idx_address_ranges_created_at ON address_ranges(created_at);
"#;

const RANGE_COLUMNS: &str = "r.id, r.range_from, r.range_to, r.owner_id, r.created_at";

/// How long a writer waits for a concurrent transaction to finish.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

impl From<rusqlite::Error> for StoreError {
    fn from(e: rusqlite::Error) -> Self {
        StoreError::Backend(e.to_string())
    }
}

/// Raw column values of an address range row.
struct RangeRow {
    id: i64,
    range_from: i64,
    range_to: i64,
    owner_id: Option<i64>,
    created_at: i64,
}

impl RangeRow {
    fn read(row: &Row, offset: usize) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(offset)?,
            range_from: row.get(offset + 1)?,
            range_to: row.get(offset + 2)?,
            owner_id: row.get(offset + 3)?,
            created_at: row.get(offset + 4)?,
        })
    }

    fn into_range(self) -> Result<AddressRange, StoreError> {
        let bound = |v: i64| {
            u32::try_from(v).map_err(|_| {
                StoreError::Corrupt(format!("range {} has bound {} outside of IPv4 space", self.id, v))
            })
        };
        let created_at = DateTime::from_timestamp_millis(self.created_at).ok_or_else(|| {
            StoreError::Corrupt(format!("range {} has invalid timestamp {}", self.id, self.created_at))
        })?;

        Ok(AddressRange {
            id: self.id,
            range_from: bound(self.range_from)?,
            range_to: bound(self.range_to)?,
            owner_id: self.owner_id,
            created_at,
        })
    }
}

/// Convert a SQLite row to a NetworkIdentity entity.
fn row_to_identity(row: &Row, offset: usize) -> rusqlite::Result<NetworkIdentity> {
    Ok(NetworkIdentity {
        id: row.get(offset)?,
        name: row.get(offset + 1)?,
        country: row.get(offset + 2)?,
    })
}

/// Range store operations bound to an open SQLite transaction.
struct SqliteUnit<'a> {
    conn: &'a Connection,
}

impl SqliteUnit<'_> {
    fn get_range(&self, range_from: u32, range_to: u32) -> Result<AddressRange, StoreError> {
        let sql = format!(
            "SELECT {} FROM address_ranges r WHERE r.range_from = ?1 AND r.range_to = ?2",
            RANGE_COLUMNS
        );
        let row = self.conn.query_row(
            &sql,
            params![i64::from(range_from), i64::from(range_to)],
            |row| RangeRow::read(row, 0),
        )?;
        row.into_range()
    }
}

impl RangeTransaction for SqliteUnit<'_> {
    fn create_range_if_absent(
        &mut self,
        range_from: u32,
        range_to: u32,
        created_at: DateTime<Utc>,
    ) -> Result<(AddressRange, bool), StoreError> {
        let inserted = self.conn.execute(
            "INSERT OR IGNORE INTO address_ranges (range_from, range_to, created_at)
             VALUES (?1, ?2, ?3)",
            params![
                i64::from(range_from),
                i64::from(range_to),
                created_at.timestamp_millis()
            ],
        )?;
        let range = self.get_range(range_from, range_to)?;
        Ok((range, inserted > 0))
    }

    fn get_identity(&mut self, id: i64) -> Result<Option<NetworkIdentity>, StoreError> {
        let identity = self
            .conn
            .query_row(
                "SELECT id, name, country FROM network_identities WHERE id = ?1",
                [id],
                |row| row_to_identity(row, 0),
            )
            .optional()?;
        Ok(identity)
    }

    fn find_identity(
        &mut self,
        name: &str,
        country: Option<&str>,
    ) -> Result<Option<NetworkIdentity>, StoreError> {
        // `IS` matches NULL against NULL only
        let identity = self
            .conn
            .query_row(
                "SELECT id, name, country FROM network_identities
                 WHERE name = ?1 AND country IS ?2
                 ORDER BY id
                 LIMIT 1",
                params![name, country],
                |row| row_to_identity(row, 0),
            )
            .optional()?;
        Ok(identity)
    }

    fn create_identity(
        &mut self,
        name: Option<&str>,
        country: Option<&str>,
    ) -> Result<NetworkIdentity, StoreError> {
        self.conn.execute(
            "INSERT INTO network_identities (name, country) VALUES (?1, ?2)",
            params![name, country],
        )?;
        Ok(NetworkIdentity {
            id: self.conn.last_insert_rowid(),
            name: name.map(str::to_string),
            country: country.map(str::to_string),
        })
    }

    fn attach_owner(&mut self, range_id: i64, owner_id: i64) -> Result<(), StoreError> {
        let updated = self.conn.execute(
            "UPDATE address_ranges SET owner_id = ?1 WHERE id = ?2",
            params![owner_id, range_id],
        )?;
        if updated == 0 {
            return Err(StoreError::Backend(format!("no range with id {}", range_id)));
        }
        Ok(())
    }
}

/// SQLite-backed range store.
///
/// A single connection is shared behind a mutex; concurrent processes
/// using the same database file are serialized by SQLite itself through
/// immediate write transactions.
#[derive(Clone)]
pub struct SqliteRangeStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteRangeStore {
    /// Open (or create) the database file and apply the schema.
    pub fn open(db_path: &str) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open(db_path)?)
    }

    /// Open a private in-memory database.
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.busy_timeout(BUSY_TIMEOUT)?;
        conn.execute_batch(RANGES_SCHEMA)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Run a closure against the connection on the blocking pool.
    async fn run_blocking<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StoreError> + Send + 'static,
        T: Send + 'static,
    {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = conn.lock();
            f(&mut guard)
        })
        .await
        .map_err(|e| StoreError::Task(e.to_string()))?
    }

    fn count(conn: &Connection, table: &str) -> Result<usize, StoreError> {
        let sql = format!("SELECT COUNT(*) FROM {}", table);
        let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }
}

#[async_trait]
impl RangeStore for SqliteRangeStore {
    async fn find_best_match(&self, ip: u32) -> Result<Option<RangeMatch>, StoreError> {
        self.run_blocking(move |conn| {
            let sql = format!(
                "SELECT {}, i.id, i.name, i.country
                 FROM address_ranges r
                 LEFT JOIN network_identities i ON i.id = r.owner_id
                 WHERE r.range_from <= ?1 AND r.range_to >= ?1
                 ORDER BY CASE WHEN r.range_to > 1 THEN r.range_to - r.range_from ELSE 0 END,
                          r.range_from,
                          r.id
                 LIMIT 1",
                RANGE_COLUMNS
            );
            let found = conn
                .query_row(&sql, [i64::from(ip)], |row| {
                    let range = RangeRow::read(row, 0)?;
                    let owner = match row.get::<_, Option<i64>>(5)? {
                        Some(_) => Some(row_to_identity(row, 5)?),
                        None => None,
                    };
                    Ok((range, owner))
                })
                .optional()?;

            match found {
                Some((range, owner)) => Ok(Some(RangeMatch {
                    range: range.into_range()?,
                    owner,
                })),
                None => Ok(None),
            }
        })
        .await
    }

    async fn transaction(&self, work: UnitOfWork) -> Result<Resolution, StoreError> {
        self.run_blocking(move |conn| {
            let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
            // dropping `tx` on error rolls everything back
            let resolution = {
                let mut unit = SqliteUnit { conn: &tx };
                work(&mut unit)?
            };
            tx.commit()?;
            Ok(resolution)
        })
        .await
    }

    async fn delete_expired(&self, ttl: Duration, now: DateTime<Utc>) -> Result<usize, StoreError> {
        let cutoff = expiry_cutoff(ttl, now).timestamp_millis();
        self.run_blocking(move |conn| {
            let deleted = conn.execute("DELETE FROM address_ranges WHERE created_at < ?1", [cutoff])?;
            Ok(deleted)
        })
        .await
    }

    async fn count_ranges(&self) -> Result<usize, StoreError> {
        self.run_blocking(|conn| Self::count(conn, "address_ranges")).await
    }

    async fn count_identities(&self) -> Result<usize, StoreError> {
        self.run_blocking(|conn| Self::count(conn, "network_identities")).await
    }
}
