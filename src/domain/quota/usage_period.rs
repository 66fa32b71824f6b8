//! Per-user, per-calendar-month consumption record.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::foundation::{Timestamp, UserId};

use super::{ResourceKind, ResourceLimit, TierLimits};

/// Consumption counters for one user within one calendar month.
///
/// Keyed by `(user_id, period_start)`; created lazily on first access in
/// a new month and never deleted. Counters only grow within a period.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsagePeriod {
    /// The user this period belongs to.
    pub user_id: UserId,
    /// First instant of the calendar month (UTC). Natural key with user_id.
    pub period_start: Timestamp,
    /// AI/LLM calls made this month.
    pub ai_requests: u64,
    /// Stored bytes counted this month.
    pub storage_bytes: u64,
    /// Active course enrollments.
    pub active_courses: u64,
    /// Active projects.
    pub active_projects: u64,
    /// When this row was created; stale rows predate the month boundary.
    pub last_reset: Timestamp,
}

impl UsagePeriod {
    /// Creates a fresh period for the month containing `now`, all counters
    /// at zero.
    pub fn fresh(user_id: UserId, now: Timestamp) -> Self {
        Self {
            user_id,
            period_start: now.start_of_month(),
            ai_requests: 0,
            storage_bytes: 0,
            active_courses: 0,
            active_projects: 0,
            last_reset: now,
        }
    }

    /// Returns the counter value for a resource kind.
    pub fn counter(&self, kind: ResourceKind) -> u64 {
        match kind {
            ResourceKind::AiRequests => self.ai_requests,
            ResourceKind::StorageBytes => self.storage_bytes,
            ResourceKind::ActiveCourses => self.active_courses,
            ResourceKind::ActiveProjects => self.active_projects,
        }
    }

    /// Returns a mutable reference to the counter for a resource kind.
    pub fn counter_mut(&mut self, kind: ResourceKind) -> &mut u64 {
        match kind {
            ResourceKind::AiRequests => &mut self.ai_requests,
            ResourceKind::StorageBytes => &mut self.storage_bytes,
            ResourceKind::ActiveCourses => &mut self.active_courses,
            ResourceKind::ActiveProjects => &mut self.active_projects,
        }
    }

    /// First instant of the following month, when this period becomes
    /// inert history.
    pub fn resets_at(&self) -> Timestamp {
        self.period_start.next_month_start()
    }
}

/// Computes per-counter usage percentages against a tier's limits.
///
/// `100 * current / limit` clamped to 100. Unlimited resources report 0
/// so displays never show a misleading "full" gauge. A missing period
/// (no usage yet this month) reports 0 everywhere.
pub fn usage_percentages(
    period: Option<&UsagePeriod>,
    limits: &TierLimits,
) -> BTreeMap<ResourceKind, u8> {
    ResourceKind::ALL
        .iter()
        .map(|&kind| {
            let percent = match (period, limits.limit_for(kind)) {
                (_, ResourceLimit::Unlimited) => 0,
                (None, _) => 0,
                (Some(p), ResourceLimit::Limited(0)) => {
                    if p.counter(kind) > 0 {
                        100
                    } else {
                        0
                    }
                }
                (Some(p), ResourceLimit::Limited(limit)) => {
                    (p.counter(kind).saturating_mul(100) / limit).min(100) as u8
                }
            };
            (kind, percent)
        })
        .collect()
}
