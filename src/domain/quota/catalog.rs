//! Static tier catalog: limits and feature flags per membership tier.
//!
//! The catalog is compiled in and read-only at runtime; changing it
//! requires a deployment.

use once_cell::sync::Lazy;
use serde::Serialize;

use super::{MembershipTier, ResourceKind, ResourceLimit};

/// The `"all"` feature sentinel: every feature is enabled.
pub const ALL_FEATURES: &str = "all";

const GIB: u64 = 1024 * 1024 * 1024;

/// Feature flags enabled for a tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct FeatureSet(&'static [&'static str]);

impl FeatureSet {
    /// Returns true if the set names the feature or carries the `"all"`
    /// sentinel.
    pub fn contains(&self, feature: &str) -> bool {
        self.0.iter().any(|f| *f == ALL_FEATURES || *f == feature)
    }

    /// Returns the raw feature names, including a possible sentinel.
    pub fn names(&self) -> &'static [&'static str] {
        self.0
    }
}

/// Resource limits and feature set for one membership tier.
///
/// Invariant: across `MembershipTier::ORDERED`, every limit is
/// non-decreasing (unlimited counts as greater than any finite limit).
#[derive(Debug, Clone, Serialize)]
pub struct TierLimits {
    /// The tier these limits apply to.
    pub tier: MembershipTier,
    /// AI/LLM calls per calendar month.
    pub ai_requests: ResourceLimit,
    /// Stored bytes.
    pub storage_bytes: ResourceLimit,
    /// Concurrently active course enrollments.
    pub active_courses: ResourceLimit,
    /// Concurrently active projects.
    pub active_projects: ResourceLimit,
    /// Enabled feature flags.
    pub features: FeatureSet,
    /// Monthly price in cents, informational only to this service.
    pub price_monthly_cents: u32,
}

impl TierLimits {
    /// Returns the limit for a resource kind.
    pub fn limit_for(&self, kind: ResourceKind) -> ResourceLimit {
        match kind {
            ResourceKind::AiRequests => self.ai_requests,
            ResourceKind::StorageBytes => self.storage_bytes,
            ResourceKind::ActiveCourses => self.active_courses,
            ResourceKind::ActiveProjects => self.active_projects,
        }
    }
}

static CATALOG: Lazy<[TierLimits; 4]> = Lazy::new(|| {
    use ResourceLimit::{Limited, Unlimited};
    [
        TierLimits {
            tier: MembershipTier::Free,
            ai_requests: Limited(100),
            storage_bytes: Limited(GIB),
            active_courses: Limited(3),
            active_projects: Limited(3),
            features: FeatureSet(&["courses", "projects", "community"]),
            price_monthly_cents: 0,
        },
        TierLimits {
            tier: MembershipTier::Student,
            ai_requests: Limited(1_000),
            storage_bytes: Limited(10 * GIB),
            active_courses: Limited(10),
            active_projects: Limited(10),
            features: FeatureSet(&[
                "courses",
                "projects",
                "community",
                "ai_tutor",
                "certificates",
            ]),
            price_monthly_cents: 4_900,
        },
        TierLimits {
            tier: MembershipTier::Professional,
            ai_requests: Limited(10_000),
            storage_bytes: Limited(100 * GIB),
            active_courses: Limited(50),
            active_projects: Limited(50),
            features: FeatureSet(&[
                "courses",
                "projects",
                "community",
                "ai_tutor",
                "certificates",
                "api_access",
                "analytics",
                "priority_support",
            ]),
            price_monthly_cents: 19_900,
        },
        TierLimits {
            tier: MembershipTier::Enterprise,
            ai_requests: Unlimited,
            storage_bytes: Unlimited,
            active_courses: Unlimited,
            active_projects: Unlimited,
            features: FeatureSet(&[ALL_FEATURES]),
            price_monthly_cents: 99_900,
        },
    ]
});

/// Pure lookup from tier to limits and features. No I/O, no mutable state.
pub struct TierCatalog;

impl TierCatalog {
    /// Get the limits for a tier. Total over the closed enumeration.
    pub fn limits_for(tier: MembershipTier) -> &'static TierLimits {
        &CATALOG[tier.rank() as usize]
    }

    /// Check whether a tier has a feature enabled.
    pub fn has_feature(tier: MembershipTier, feature: &str) -> bool {
        Self::limits_for(tier).features.contains(feature)
    }

    /// Returns the next more-generous tier, or None at the top.
    ///
    /// Used to populate upgrade suggestions on denial.
    pub fn next_tier_up(tier: MembershipTier) -> Option<MembershipTier> {
        MembershipTier::ORDERED
            .get(tier.rank() as usize + 1)
            .copied()
    }

    /// All tiers' limits, in ascending order of generosity.
    pub fn all() -> &'static [TierLimits] {
        &*CATALOG
    }
}
