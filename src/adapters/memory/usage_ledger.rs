//! In-memory usage ledger implementation.
//!
//! This adapter provides an in-memory implementation of the `UsageLedger`
//! port. Useful for:
//! - Development and testing environments
//! - Single-server deployments without persistence requirements
//!
//! For production deployments use the PostgreSQL- or Redis-backed
//! implementation instead.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;

use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::quota::{ResourceKind, UsagePeriod};
use crate::ports::{ConsumeOutcome, LedgerError, UsageLedger};

type PeriodKey = (UserId, Timestamp);

/// In-memory implementation of the UsageLedger port.
///
/// Thread-safe via an internal `Mutex`; every operation holds the lock
/// for its whole critical section, which makes `try_consume` and row
/// creation atomic. Does not persist data across restarts.
#[derive(Default)]
pub struct InMemoryUsageLedger {
    periods: Mutex<HashMap<PeriodKey, UsagePeriod>>,
}

impl InMemoryUsageLedger {
    /// Creates a new empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of stored period rows.
    ///
    /// Useful for asserting idempotent row creation in tests.
    pub fn len(&self) -> usize {
        self.periods.lock().unwrap().len()
    }

    /// Returns true if no rows exist.
    pub fn is_empty(&self) -> bool {
        self.periods.lock().unwrap().is_empty()
    }

    fn key(user_id: &UserId, now: Timestamp) -> PeriodKey {
        (user_id.clone(), now.start_of_month())
    }
}

#[async_trait]
impl UsageLedger for InMemoryUsageLedger {
    async fn get_or_create_period(
        &self,
        user_id: &UserId,
        now: Timestamp,
    ) -> Result<UsagePeriod, LedgerError> {
        let mut periods = self.periods.lock().unwrap();
        let period = periods
            .entry(Self::key(user_id, now))
            .or_insert_with(|| UsagePeriod::fresh(user_id.clone(), now));
        Ok(period.clone())
    }

    async fn find_period(
        &self,
        user_id: &UserId,
        now: Timestamp,
    ) -> Result<Option<UsagePeriod>, LedgerError> {
        let periods = self.periods.lock().unwrap();
        Ok(periods.get(&Self::key(user_id, now)).cloned())
    }

    async fn increment_counter(
        &self,
        user_id: &UserId,
        kind: ResourceKind,
        amount: u64,
        now: Timestamp,
    ) -> Result<UsagePeriod, LedgerError> {
        if amount == 0 {
            return Err(LedgerError::InvalidArgument(
                "increment amount must be positive".into(),
            ));
        }

        let mut periods = self.periods.lock().unwrap();
        let period = periods
            .entry(Self::key(user_id, now))
            .or_insert_with(|| UsagePeriod::fresh(user_id.clone(), now));
        *period.counter_mut(kind) += amount;
        Ok(period.clone())
    }

    async fn try_consume(
        &self,
        user_id: &UserId,
        kind: ResourceKind,
        limit: u64,
        now: Timestamp,
    ) -> Result<ConsumeOutcome, LedgerError> {
        let mut periods = self.periods.lock().unwrap();
        let period = periods
            .entry(Self::key(user_id, now))
            .or_insert_with(|| UsagePeriod::fresh(user_id.clone(), now));

        let current = period.counter(kind);
        if current >= limit {
            return Ok(ConsumeOutcome::LimitReached { used: current });
        }

        *period.counter_mut(kind) = current + 1;
        Ok(ConsumeOutcome::Consumed { used: current + 1 })
    }
}
