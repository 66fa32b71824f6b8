//! Usage ledger backend selection

use serde::Deserialize;

/// Usage ledger configuration
#[derive(Debug, Clone, Deserialize, Default)]
pub struct LedgerConfig {
    /// Which store backs the usage ledger
    #[serde(default)]
    pub backend: LedgerBackend,
}

/// Available ledger backends
///
/// `Memory` suits single-process deployments and tests; `Postgres` adds
/// durable history; `Redis` coordinates counters across replicas.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LedgerBackend {
    #[default]
    Memory,
    Postgres,
    Redis,
}
