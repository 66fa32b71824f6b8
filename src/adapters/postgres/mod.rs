//! PostgreSQL adapter backed by sqlx.

mod usage_ledger;

pub use usage_ledger::PostgresUsageLedger;
