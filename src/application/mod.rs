//! Application layer
//!
//! Use cases orchestrating the domain ports.

mod expiry_sweep;
mod resolver;

pub use expiry_sweep::{ExpirySweep, DEFAULT_RANGE_TTL};
pub use resolver::{Resolver, ResolverConfig, DEFAULT_ACCEPTED_RANGE_LENGTH};
