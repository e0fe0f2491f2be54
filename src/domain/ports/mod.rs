mod range_store;
mod reserved_classifier;
mod whois_client;

pub use range_store::{RangeStore, RangeTransaction, UnitOfWork};
pub use reserved_classifier::ReservedClassifier;
pub use whois_client::WhoisClient;
