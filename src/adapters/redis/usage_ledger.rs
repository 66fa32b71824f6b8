//! Redis-backed usage ledger for multi-server deployments.
//!
//! One hash per `(user, month)` under `usage:{user_id}:{YYYYMM}`. The
//! conditional consume runs as a Lua script so the compare and the
//! increment execute as one atomic server-side operation; plain
//! `HINCRBY`/`HSETNX` cover the unconditional paths.

use async_trait::async_trait;
use redis::aio::MultiplexedConnection;
use redis::{AsyncCommands, Script};

use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::quota::{ResourceKind, UsagePeriod};
use crate::ports::{ConsumeOutcome, LedgerError, UsageLedger};

/// Increment-if-below-limit, atomic on the Redis server.
///
/// KEYS[1] = period hash, ARGV[1] = counter field, ARGV[2] = limit,
/// ARGV[3] = last_reset (unix secs, set only on first touch).
/// Returns {1, used} on consume, {0, used} at the limit.
const TRY_CONSUME_SCRIPT: &str = r#"
redis.call('HSETNX', KEYS[1], 'last_reset', ARGV[3])
local current = tonumber(redis.call('HGET', KEYS[1], ARGV[1]) or '0')
if current >= tonumber(ARGV[2]) then
    return {0, current}
end
return {1, redis.call('HINCRBY', KEYS[1], ARGV[1], 1)}
"#;

/// Redis implementation of the UsageLedger port.
#[derive(Clone)]
pub struct RedisUsageLedger {
    conn: MultiplexedConnection,
}

impl RedisUsageLedger {
    /// Creates a ledger over the given multiplexed connection.
    pub fn new(conn: MultiplexedConnection) -> Self {
        Self { conn }
    }

    fn period_key(user_id: &UserId, now: Timestamp) -> String {
        let month = now.start_of_month();
        format!(
            "usage:{}:{}",
            user_id,
            month.as_datetime().format("%Y%m")
        )
    }

    async fn read_period(
        &self,
        user_id: &UserId,
        now: Timestamp,
    ) -> Result<Option<UsagePeriod>, LedgerError> {
        let key = Self::period_key(user_id, now);
        let mut conn = self.conn.clone();

        let fields: std::collections::HashMap<String, String> =
            conn.hgetall(&key).await.map_err(storage_err)?;

        if fields.is_empty() {
            return Ok(None);
        }

        let counter = |name: &str| -> u64 {
            fields
                .get(name)
                .and_then(|v| v.parse::<u64>().ok())
                .unwrap_or(0)
        };

        let last_reset = fields
            .get("last_reset")
            .and_then(|v| v.parse::<u64>().ok())
            .map(Timestamp::from_unix_secs)
            .unwrap_or_else(|| now.start_of_month());

        Ok(Some(UsagePeriod {
            user_id: user_id.clone(),
            period_start: now.start_of_month(),
            ai_requests: counter(ResourceKind::AiRequests.as_str()),
            storage_bytes: counter(ResourceKind::StorageBytes.as_str()),
            active_courses: counter(ResourceKind::ActiveCourses.as_str()),
            active_projects: counter(ResourceKind::ActiveProjects.as_str()),
            last_reset,
        }))
    }
}

fn storage_err(e: redis::RedisError) -> LedgerError {
    LedgerError::StorageUnavailable(e.to_string())
}

#[async_trait]
impl UsageLedger for RedisUsageLedger {
    async fn get_or_create_period(
        &self,
        user_id: &UserId,
        now: Timestamp,
    ) -> Result<UsagePeriod, LedgerError> {
        let key = Self::period_key(user_id, now);
        let mut conn = self.conn.clone();

        // HSETNX claims the row; racing creators all converge on one hash.
        conn.hset_nx::<_, _, _, ()>(&key, "last_reset", now.as_unix_secs())
            .await
            .map_err(storage_err)?;

        self.read_period(user_id, now).await?.ok_or_else(|| {
            LedgerError::StorageUnavailable("hash vanished after HSETNX".to_string())
        })
    }

    async fn find_period(
        &self,
        user_id: &UserId,
        now: Timestamp,
    ) -> Result<Option<UsagePeriod>, LedgerError> {
        self.read_period(user_id, now).await
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

        let key = Self::period_key(user_id, now);
        let mut conn = self.conn.clone();

        conn.hset_nx::<_, _, _, ()>(&key, "last_reset", now.as_unix_secs())
            .await
            .map_err(storage_err)?;
        conn.hincr::<_, _, _, i64>(&key, kind.as_str(), amount as i64)
            .await
            .map_err(storage_err)?;

        self.read_period(user_id, now).await?.ok_or_else(|| {
            LedgerError::StorageUnavailable("hash vanished after HINCRBY".to_string())
        })
    }

    async fn try_consume(
        &self,
        user_id: &UserId,
        kind: ResourceKind,
        limit: u64,
        now: Timestamp,
    ) -> Result<ConsumeOutcome, LedgerError> {
        let key = Self::period_key(user_id, now);
        let mut conn = self.conn.clone();

        let (consumed, used): (i64, i64) = Script::new(TRY_CONSUME_SCRIPT)
            .key(&key)
            .arg(kind.as_str())
            .arg(limit)
            .arg(now.as_unix_secs())
            .invoke_async(&mut conn)
            .await
            .map_err(storage_err)?;

        if consumed == 1 {
            Ok(ConsumeOutcome::Consumed { used: used as u64 })
        } else {
            Ok(ConsumeOutcome::LimitReached { used: used as u64 })
        }
    }
}

impl std::fmt::Debug for RedisUsageLedger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisUsageLedger").finish_non_exhaustive()
    }
}
