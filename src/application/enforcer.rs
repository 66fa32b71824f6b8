//! QuotaEnforcer - the decision point invoked on every quota-gated action.

use std::sync::Arc;

use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::quota::{Decision, MembershipTier, ResourceKind, ResourceLimit, TierCatalog};
use crate::ports::{ConsumeOutcome, LedgerError, UsageLedger};

/// Gates actions against the caller's tier limits, consuming quota on
/// allow and suggesting an upgrade on deny.
///
/// The enforcer does not own tier assignment; the caller supplies the
/// user's current tier. Ledger errors propagate unchanged - the HTTP
/// layer decides fail-open versus fail-closed.
pub struct QuotaEnforcer {
    ledger: Arc<dyn UsageLedger>,
}

impl QuotaEnforcer {
    pub fn new(ledger: Arc<dyn UsageLedger>) -> Self {
        Self { ledger }
    }

    /// Checks the user's quota for `kind` and consumes one unit on allow.
    ///
    /// Exactly one ledger increment happens per allowed call and none per
    /// denied call. The call that brings usage to exactly the limit is
    /// the last permitted one (closed-open interval `[0, limit)`).
    pub async fn check_and_consume(
        &self,
        user_id: &UserId,
        tier: MembershipTier,
        kind: ResourceKind,
        now: Timestamp,
    ) -> Result<Decision, LedgerError> {
        let limits = TierCatalog::limits_for(tier);
        let resets_at = now.next_month_start();

        match limits.limit_for(kind) {
            ResourceLimit::Unlimited => {
                // Bookkeeping only; unlimited resources are still counted
                // for analytics.
                self.ledger
                    .increment_counter(user_id, kind, 1, now)
                    .await?;
                Ok(Decision::allowed_unlimited(tier, kind, resets_at))
            }
            ResourceLimit::Limited(limit) => {
                match self.ledger.try_consume(user_id, kind, limit, now).await? {
                    ConsumeOutcome::Consumed { used } => {
                        tracing::debug!(
                            user = %user_id,
                            resource = %kind,
                            used,
                            limit,
                            "quota consumed"
                        );
                        Ok(Decision::allowed(tier, kind, limit, limit - used, resets_at))
                    }
                    ConsumeOutcome::LimitReached { used } => {
                        tracing::debug!(
                            user = %user_id,
                            resource = %kind,
                            used,
                            limit,
                            "quota denied"
                        );
                        Ok(Decision::denied(
                            tier,
                            kind,
                            limit,
                            TierCatalog::next_tier_up(tier),
                            resets_at,
                        ))
                    }
                }
            }
        }
    }

    /// Read-only variant: would a call for `kind` be allowed right now?
    ///
    /// Consumes nothing; used for "can I still do X" displays.
    pub async fn can_perform(
        &self,
        user_id: &UserId,
        tier: MembershipTier,
        kind: ResourceKind,
        now: Timestamp,
    ) -> Result<bool, LedgerError> {
        let limit = match TierCatalog::limits_for(tier).limit_for(kind) {
            ResourceLimit::Unlimited => return Ok(true),
            ResourceLimit::Limited(limit) => limit,
        };

        let used = self
            .ledger
            .find_period(user_id, now)
            .await?
            .map(|p| p.counter(kind))
            .unwrap_or(0);

        Ok(used < limit)
    }
}
