//! Integration tests for quota enforcement.
//!
//! These tests exercise the enforcer against the in-memory ledger under
//! realistic conditions: concurrent callers racing for the last slots,
//! month boundaries, and a failing storage backend.

use std::sync::Arc;

use async_trait::async_trait;
use proptest::prelude::*;

use azora_quota::adapters::memory::InMemoryUsageLedger;
use azora_quota::application::QuotaEnforcer;
use azora_quota::domain::foundation::{Timestamp, UserId};
use azora_quota::domain::quota::{MembershipTier, ResourceKind, UsagePeriod};
use azora_quota::ports::{ConsumeOutcome, LedgerError, UsageLedger};

// =============================================================================
// Test Infrastructure
// =============================================================================

/// Ledger whose storage is always unreachable.
struct UnavailableLedger;

#[async_trait]
impl UsageLedger for UnavailableLedger {
    async fn get_or_create_period(
        &self,
        _user_id: &UserId,
        _now: Timestamp,
    ) -> Result<UsagePeriod, LedgerError> {
        Err(LedgerError::StorageUnavailable("connection refused".into()))
    }

    async fn find_period(
        &self,
        _user_id: &UserId,
        _now: Timestamp,
    ) -> Result<Option<UsagePeriod>, LedgerError> {
        Err(LedgerError::StorageUnavailable("connection refused".into()))
    }

    async fn increment_counter(
        &self,
        _user_id: &UserId,
        _kind: ResourceKind,
        _amount: u64,
        _now: Timestamp,
    ) -> Result<UsagePeriod, LedgerError> {
        Err(LedgerError::StorageUnavailable("connection refused".into()))
    }

    async fn try_consume(
        &self,
        _user_id: &UserId,
        _kind: ResourceKind,
        _limit: u64,
        _now: Timestamp,
    ) -> Result<ConsumeOutcome, LedgerError> {
        Err(LedgerError::StorageUnavailable("connection refused".into()))
    }
}

fn enforcer() -> (Arc<QuotaEnforcer>, Arc<InMemoryUsageLedger>) {
    let ledger = Arc::new(InMemoryUsageLedger::new());
    (Arc::new(QuotaEnforcer::new(ledger.clone())), ledger)
}

fn user(name: &str) -> UserId {
    UserId::new(name).unwrap()
}

// =============================================================================
// Concurrency
// =============================================================================

/// 150 concurrent callers against a limit of 100 must produce exactly
/// 100 allows and a counter that never overshoots.
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_callers_never_overshoot_the_limit() {
    let (enforcer, ledger) = enforcer();
    let caller = user("user-1");
    let now = Timestamp::now();

    let tasks: Vec<_> = (0..150)
        .map(|_| {
            let enforcer = enforcer.clone();
            let caller = caller.clone();
            tokio::spawn(async move {
                enforcer
                    .check_and_consume(
                        &caller,
                        MembershipTier::Free,
                        ResourceKind::AiRequests,
                        now,
                    )
                    .await
                    .unwrap()
            })
        })
        .collect();

    let mut allowed = 0;
    for task in tasks {
        if task.await.unwrap().allowed {
            allowed += 1;
        }
    }

    assert_eq!(allowed, 100);

    let period = ledger.find_period(&caller, now).await.unwrap().unwrap();
    assert_eq!(period.ai_requests, 100);
}

/// Racing creators for the same (user, month) converge on a single row.
#[tokio::test(flavor = "multi_thread")]
async fn concurrent_first_calls_create_one_period_row() {
    let (enforcer, ledger) = enforcer();
    let caller = user("user-1");
    let now = Timestamp::now();

    let tasks: Vec<_> = (0..20)
        .map(|_| {
            let enforcer = enforcer.clone();
            let caller = caller.clone();
            tokio::spawn(async move {
                enforcer
                    .check_and_consume(
                        &caller,
                        MembershipTier::Free,
                        ResourceKind::AiRequests,
                        now,
                    )
                    .await
                    .unwrap()
            })
        })
        .collect();

    for task in tasks {
        assert!(task.await.unwrap().allowed);
    }

    assert_eq!(ledger.len(), 1);
    let period = ledger.find_period(&caller, now).await.unwrap().unwrap();
    assert_eq!(period.ai_requests, 20);
}

// =============================================================================
// Isolation
// =============================================================================

#[tokio::test]
async fn users_do_not_share_quota() {
    let (enforcer, _ledger) = enforcer();
    let now = Timestamp::now();

    // Exhaust user-1's free course slots.
    for _ in 0..3 {
        let decision = enforcer
            .check_and_consume(
                &user("user-1"),
                MembershipTier::Free,
                ResourceKind::ActiveCourses,
                now,
            )
            .await
            .unwrap();
        assert!(decision.allowed);
    }

    let denied = enforcer
        .check_and_consume(
            &user("user-1"),
            MembershipTier::Free,
            ResourceKind::ActiveCourses,
            now,
        )
        .await
        .unwrap();
    assert!(!denied.allowed);

    // user-2 is unaffected.
    let decision = enforcer
        .check_and_consume(
            &user("user-2"),
            MembershipTier::Free,
            ResourceKind::ActiveCourses,
            now,
        )
        .await
        .unwrap();
    assert!(decision.allowed);
}

#[tokio::test]
async fn resources_do_not_share_quota() {
    let (enforcer, _ledger) = enforcer();
    let caller = user("user-1");
    let now = Timestamp::now();

    for _ in 0..3 {
        enforcer
            .check_and_consume(
                &caller,
                MembershipTier::Free,
                ResourceKind::ActiveProjects,
                now,
            )
            .await
            .unwrap();
    }

    // Projects exhausted; AI requests still flow.
    let decision = enforcer
        .check_and_consume(&caller, MembershipTier::Free, ResourceKind::AiRequests, now)
        .await
        .unwrap();
    assert!(decision.allowed);
}

// =============================================================================
// Storage Failures
// =============================================================================

#[tokio::test]
async fn storage_failure_propagates_instead_of_minting_quota() {
    let enforcer = QuotaEnforcer::new(Arc::new(UnavailableLedger));

    let result = enforcer
        .check_and_consume(
            &user("user-1"),
            MembershipTier::Free,
            ResourceKind::AiRequests,
            Timestamp::now(),
        )
        .await;

    assert!(matches!(result, Err(LedgerError::StorageUnavailable(_))));
}

#[tokio::test]
async fn storage_failure_propagates_for_unlimited_tiers_too() {
    let enforcer = QuotaEnforcer::new(Arc::new(UnavailableLedger));

    let result = enforcer
        .check_and_consume(
            &user("user-1"),
            MembershipTier::Enterprise,
            ResourceKind::AiRequests,
            Timestamp::now(),
        )
        .await;

    assert!(matches!(result, Err(LedgerError::StorageUnavailable(_))));
}

// =============================================================================
// Properties
// =============================================================================

proptest! {
    /// For any number of sequential calls N against the free AI request
    /// limit L, exactly min(N, L) are allowed and the counter equals the
    /// number of allows.
    #[test]
    fn allowed_count_is_min_of_calls_and_limit(n in 0usize..250) {
        let rt = tokio::runtime::Builder::new_current_thread()
            .build()
            .unwrap();

        rt.block_on(async {
            let (enforcer, ledger) = enforcer();
            let caller = user("user-1");
            let now = Timestamp::now();
            let limit = 100usize;

            let mut allowed = 0usize;
            for _ in 0..n {
                let decision = enforcer
                    .check_and_consume(
                        &caller,
                        MembershipTier::Free,
                        ResourceKind::AiRequests,
                        now,
                    )
                    .await
                    .unwrap();
                if decision.allowed {
                    allowed += 1;
                }
            }

            prop_assert_eq!(allowed, n.min(limit));

            let used = ledger
                .find_period(&caller, now)
                .await
                .unwrap()
                .map(|p| p.ai_requests)
                .unwrap_or(0);
            prop_assert_eq!(used as usize, allowed);

            Ok(())
        })?;
    }
}
