//! UsageLedger port - durable per-user-per-month counters.
//!
//! Implementations must provide atomic read-modify-write semantics: the
//! `try_consume` operation is a single storage-level unit of work, so two
//! concurrent callers can never both take the last remaining slot. Row
//! creation is upsert-safe under the unique `(user_id, period_start)` key.

use async_trait::async_trait;

use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::quota::{ResourceKind, UsagePeriod};

/// Outcome of an atomic increment-if-below-limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeOutcome {
    /// The counter was incremented; `used` is the post-increment value.
    Consumed { used: u64 },
    /// The counter was already at or above the limit; nothing changed.
    LimitReached { used: u64 },
}

impl ConsumeOutcome {
    /// Returns true if a unit was consumed.
    pub fn is_consumed(&self) -> bool {
        matches!(self, ConsumeOutcome::Consumed { .. })
    }
}

/// Port for the durable usage ledger.
///
/// Every operation takes an injected `now`; implementations never read
/// the system clock. All failures surface as `LedgerError` within the
/// backing store's bounded timeout - operations do not hang.
#[async_trait]
pub trait UsageLedger: Send + Sync {
    /// Returns the current-month row for the user, creating it with zero
    /// counters if absent.
    ///
    /// Idempotent under concurrency: racing first accesses in a new month
    /// produce exactly one row.
    async fn get_or_create_period(
        &self,
        user_id: &UserId,
        now: Timestamp,
    ) -> Result<UsagePeriod, LedgerError>;

    /// Read-only lookup of the current-month row. No side effects.
    async fn find_period(
        &self,
        user_id: &UserId,
        now: Timestamp,
    ) -> Result<Option<UsagePeriod>, LedgerError>;

    /// Atomically adds `amount` to the named counter in the current-month
    /// row, creating the row first if absent. Returns the post-increment
    /// row.
    ///
    /// `amount` must be positive; zero fails with `InvalidArgument`
    /// (negative amounts are unrepresentable).
    async fn increment_counter(
        &self,
        user_id: &UserId,
        kind: ResourceKind,
        amount: u64,
        now: Timestamp,
    ) -> Result<UsagePeriod, LedgerError>;

    /// Atomically increments the counter by one if and only if the result
    /// would not exceed `limit`.
    ///
    /// This is the gate's unit of work: a compare-and-swap against the
    /// store, never a read followed by a separate write.
    async fn try_consume(
        &self,
        user_id: &UserId,
        kind: ResourceKind,
        limit: u64,
        now: Timestamp,
    ) -> Result<ConsumeOutcome, LedgerError>;

    /// Monthly-rollover compatibility shim.
    ///
    /// Under the immutable-history design each month naturally starts a
    /// fresh row and old rows become inert, so this defaults to a no-op
    /// returning 0. Implementations may override it if a storage-reclaim
    /// policy requires zeroing rows whose period fully predates `before`.
    async fn reset_stale_periods(&self, _before: Timestamp) -> Result<u64, LedgerError> {
        Ok(0)
    }
}

/// Errors from the usage ledger.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The backing store could not complete the operation in time.
    /// Propagated to the caller unchanged; retries are the caller's
    /// policy decision.
    #[error("storage unavailable: {0}")]
    StorageUnavailable(String),

    /// Caller bug: non-positive amount or malformed input. Never retried.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}
