//! Adapters layer
//!
//! Concrete implementations of the domain ports.

pub mod outbound;
