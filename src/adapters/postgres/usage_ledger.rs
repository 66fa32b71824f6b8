//! PostgreSQL implementation of the UsageLedger port.
//!
//! Uses sqlx with connection pooling. The atomicity requirements map
//! directly onto single SQL statements:
//! - row creation: `INSERT ... ON CONFLICT DO NOTHING` against the
//!   `(user_id, period_start)` primary key
//! - conditional consume: `UPDATE ... SET col = col + 1 WHERE col < $limit
//!   RETURNING col` - one round trip, no read-then-write window

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::quota::{ResourceKind, UsagePeriod};
use crate::ports::{ConsumeOutcome, LedgerError, UsageLedger};

/// PostgreSQL implementation of the UsageLedger port.
pub struct PostgresUsageLedger {
    pool: PgPool,
}

impl PostgresUsageLedger {
    /// Creates a ledger over the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Upsert the current-month row if absent. Safe under concurrency:
    /// the second writer's insert is a no-op and it observes the first
    /// writer's row.
    async fn ensure_row(&self, user_id: &UserId, now: Timestamp) -> Result<(), LedgerError> {
        sqlx::query(
            r#"
            INSERT INTO usage_periods (user_id, period_start, last_reset)
            VALUES ($1, $2, $3)
            ON CONFLICT (user_id, period_start) DO NOTHING
            "#,
        )
        .bind(user_id.as_str())
        .bind(now.start_of_month().as_datetime())
        .bind(now.as_datetime())
        .execute(&self.pool)
        .await
        .map_err(storage_err)?;

        Ok(())
    }

    async fn fetch_row(
        &self,
        user_id: &UserId,
        now: Timestamp,
    ) -> Result<Option<UsagePeriod>, LedgerError> {
        let row: Option<UsagePeriodRow> = sqlx::query_as(
            r#"
            SELECT user_id, period_start, ai_requests, storage_bytes,
                   active_courses, active_projects, last_reset
            FROM usage_periods
            WHERE user_id = $1 AND period_start = $2
            "#,
        )
        .bind(user_id.as_str())
        .bind(now.start_of_month().as_datetime())
        .fetch_optional(&self.pool)
        .await
        .map_err(storage_err)?;

        row.map(UsagePeriod::try_from).transpose()
    }
}

/// Database row representation of a usage period.
#[derive(Debug, sqlx::FromRow)]
struct UsagePeriodRow {
    user_id: String,
    period_start: DateTime<Utc>,
    ai_requests: i64,
    storage_bytes: i64,
    active_courses: i64,
    active_projects: i64,
    last_reset: DateTime<Utc>,
}

impl TryFrom<UsagePeriodRow> for UsagePeriod {
    type Error = LedgerError;

    fn try_from(row: UsagePeriodRow) -> Result<Self, Self::Error> {
        Ok(UsagePeriod {
            user_id: UserId::new(row.user_id)
                .map_err(|e| LedgerError::StorageUnavailable(format!("corrupt row: {}", e)))?,
            period_start: Timestamp::from_datetime(row.period_start),
            ai_requests: row.ai_requests as u64,
            storage_bytes: row.storage_bytes as u64,
            active_courses: row.active_courses as u64,
            active_projects: row.active_projects as u64,
            last_reset: Timestamp::from_datetime(row.last_reset),
        })
    }
}

fn storage_err(e: sqlx::Error) -> LedgerError {
    LedgerError::StorageUnavailable(e.to_string())
}

#[async_trait]
impl UsageLedger for PostgresUsageLedger {
    async fn get_or_create_period(
        &self,
        user_id: &UserId,
        now: Timestamp,
    ) -> Result<UsagePeriod, LedgerError> {
        self.ensure_row(user_id, now).await?;
        self.fetch_row(user_id, now).await?.ok_or_else(|| {
            LedgerError::StorageUnavailable("row vanished after upsert".to_string())
        })
    }

    async fn find_period(
        &self,
        user_id: &UserId,
        now: Timestamp,
    ) -> Result<Option<UsagePeriod>, LedgerError> {
        self.fetch_row(user_id, now).await
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

        self.ensure_row(user_id, now).await?;

        // kind.column() comes from a closed enum; splicing it is safe.
        let query = format!(
            r#"
            UPDATE usage_periods
            SET {col} = {col} + $3
            WHERE user_id = $1 AND period_start = $2
            RETURNING user_id, period_start, ai_requests, storage_bytes,
                      active_courses, active_projects, last_reset
            "#,
            col = kind.column()
        );

        let row: UsagePeriodRow = sqlx::query_as(&query)
            .bind(user_id.as_str())
            .bind(now.start_of_month().as_datetime())
            .bind(amount as i64)
            .fetch_one(&self.pool)
            .await
            .map_err(storage_err)?;

        UsagePeriod::try_from(row)
    }

    async fn try_consume(
        &self,
        user_id: &UserId,
        kind: ResourceKind,
        limit: u64,
        now: Timestamp,
    ) -> Result<ConsumeOutcome, LedgerError> {
        self.ensure_row(user_id, now).await?;

        // Single conditional update: the WHERE clause makes overshoot
        // impossible regardless of concurrent callers.
        let query = format!(
            r#"
            UPDATE usage_periods
            SET {col} = {col} + 1
            WHERE user_id = $1 AND period_start = $2 AND {col} < $3
            RETURNING {col}
            "#,
            col = kind.column()
        );

        let updated: Option<(i64,)> = sqlx::query_as(&query)
            .bind(user_id.as_str())
            .bind(now.start_of_month().as_datetime())
            .bind(limit as i64)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage_err)?;

        match updated {
            Some((used,)) => Ok(ConsumeOutcome::Consumed { used: used as u64 }),
            None => {
                let used = self
                    .fetch_row(user_id, now)
                    .await?
                    .map(|p| p.counter(kind))
                    .unwrap_or(0);
                Ok(ConsumeOutcome::LimitReached { used })
            }
        }
    }
}
