//! In-memory adapter for testing and single-server deployments.

mod usage_ledger;

pub use usage_ledger::InMemoryUsageLedger;
