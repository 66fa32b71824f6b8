//! UsageReportHandler - read model for quota displays.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::quota::{
    usage_percentages, MembershipTier, ResourceKind, TierCatalog, UsagePeriod,
};
use crate::ports::{LedgerError, UsageLedger};

/// Current-month usage for a user, with per-counter percentages against
/// the tier's limits.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageReport {
    pub user_id: UserId,
    pub tier: MembershipTier,
    /// Raw counters; absent if the user has no usage this month.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<UsagePeriod>,
    /// Percentage of each limit consumed; unlimited resources report 0.
    pub percentages: BTreeMap<ResourceKind, u8>,
    /// When the current period rolls over.
    pub resets_at: Timestamp,
}

/// Produces informational usage reports. Pure reads, never consumes quota.
///
/// Gating decisions must go through `QuotaEnforcer`; this read model may
/// lag behind concurrent consumption and is only for display.
pub struct UsageReportHandler {
    ledger: Arc<dyn UsageLedger>,
}

impl UsageReportHandler {
    pub fn new(ledger: Arc<dyn UsageLedger>) -> Self {
        Self { ledger }
    }

    pub async fn handle(
        &self,
        user_id: &UserId,
        tier: MembershipTier,
        now: Timestamp,
    ) -> Result<UsageReport, LedgerError> {
        let period = self.ledger.find_period(user_id, now).await?;
        let limits = TierCatalog::limits_for(tier);

        Ok(UsageReport {
            user_id: user_id.clone(),
            tier,
            percentages: usage_percentages(period.as_ref(), limits),
            period,
            resets_at: now.next_month_start(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryUsageLedger;
    use chrono::{DateTime, Utc};

    fn now() -> Timestamp {
        let dt = DateTime::parse_from_rfc3339("2025-06-15T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        Timestamp::from_datetime(dt)
    }

    fn user() -> UserId {
        UserId::new("user-1").unwrap()
    }

    #[tokio::test]
    async fn reports_zero_for_fresh_user_without_creating_a_row() {
        let ledger = Arc::new(InMemoryUsageLedger::new());
        let handler = UsageReportHandler::new(ledger.clone());

        let report = handler
            .handle(&user(), MembershipTier::Free, now())
            .await
            .unwrap();

        assert!(report.period.is_none());
        assert_eq!(report.percentages[&ResourceKind::AiRequests], 0);
        assert!(ledger.find_period(&user(), now()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn reports_percentages_against_tier_limits() {
        let ledger = Arc::new(InMemoryUsageLedger::new());
        ledger
            .increment_counter(&user(), ResourceKind::AiRequests, 25, now())
            .await
            .unwrap();

        let handler = UsageReportHandler::new(ledger);
        let report = handler
            .handle(&user(), MembershipTier::Free, now())
            .await
            .unwrap();

        assert_eq!(report.percentages[&ResourceKind::AiRequests], 25);
        assert_eq!(report.period.unwrap().ai_requests, 25);
    }

    #[tokio::test]
    async fn unlimited_resources_report_zero_percent() {
        let ledger = Arc::new(InMemoryUsageLedger::new());
        ledger
            .increment_counter(&user(), ResourceKind::AiRequests, 999_999, now())
            .await
            .unwrap();

        let handler = UsageReportHandler::new(ledger);
        let report = handler
            .handle(&user(), MembershipTier::Enterprise, now())
            .await
            .unwrap();

        assert_eq!(report.percentages[&ResourceKind::AiRequests], 0);
    }

    #[tokio::test]
    async fn report_serializes_camel_case() {
        let ledger = Arc::new(InMemoryUsageLedger::new());
        let handler = UsageReportHandler::new(ledger);

        let report = handler
            .handle(&user(), MembershipTier::Free, now())
            .await
            .unwrap();
        let json = serde_json::to_string(&report).unwrap();

        assert!(json.contains("\"userId\""));
        assert!(json.contains("\"resetsAt\""));
        assert!(!json.contains("\"period\""));
    }
}
