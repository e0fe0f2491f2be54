mod iana_reserved_classifier;
mod memory_range_store;
mod rdap_whois_client;
mod sqlite_range_store;

pub use iana_reserved_classifier::IanaReservedClassifier;
pub use memory_range_store::MemoryRangeStore;
pub use rdap_whois_client::{RdapConfig, RdapWhoisClient};
pub use sqlite_range_store::{SqliteRangeStore, RANGES_SCHEMA};
