//! Redis adapter for multi-server deployments.

mod usage_ledger;

pub use usage_ledger::RedisUsageLedger;
