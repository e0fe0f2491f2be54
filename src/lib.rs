//! isp-resolver Library
//!
//! Resolves IPv4 addresses to the organization (ISP) that owns them and
//! caches the answers as address ranges. This module exposes the
//! components for use in integration tests and as a library.

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;

// Re-export commonly used types
pub use application::{ExpirySweep, Resolver, ResolverConfig};
pub use config::load_config;
pub use domain::entities::{AddressRange, NetworkIdentity, Resolution, WhoisRecord};
pub use domain::errors::{ResolveError, StoreError, WhoisError};
pub use domain::ports::{RangeStore, ReservedClassifier, WhoisClient};
pub use domain::services::WhoisResponseParser;
