//! The allow/deny result of a quota check.
//!
//! Denial is data, not an error: every gated call is expected to produce
//! one of these, and callers must handle both branches explicitly.

use serde::Serialize;

use crate::domain::foundation::Timestamp;

use super::{MembershipTier, ResourceKind};

/// Outcome of a quota check, including remaining quota and an optional
/// upgrade suggestion.
///
/// `remaining` and `limit` use the wire sentinel `-1` for unlimited.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Decision {
    /// Whether the action may proceed.
    pub allowed: bool,
    /// Units left in the current period after this call; -1 = unlimited.
    pub remaining: i64,
    /// The tier's limit for the gated resource; -1 = unlimited.
    pub limit: i64,
    /// The resource that was gated.
    pub resource: ResourceKind,
    /// The tier the decision was made against.
    pub tier: MembershipTier,
    /// Next more-generous tier, populated on denial.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_tier: Option<MembershipTier>,
    /// When the current usage period rolls over.
    pub resets_at: Timestamp,
}

impl Decision {
    /// An allowed decision against a finite limit.
    pub fn allowed(
        tier: MembershipTier,
        resource: ResourceKind,
        limit: u64,
        remaining: u64,
        resets_at: Timestamp,
    ) -> Self {
        Self {
            allowed: true,
            remaining: remaining as i64,
            limit: limit as i64,
            resource,
            tier,
            suggested_tier: None,
            resets_at,
        }
    }

    /// An allowed decision against an unlimited resource.
    pub fn allowed_unlimited(
        tier: MembershipTier,
        resource: ResourceKind,
        resets_at: Timestamp,
    ) -> Self {
        Self {
            allowed: true,
            remaining: -1,
            limit: -1,
            resource,
            tier,
            suggested_tier: None,
            resets_at,
        }
    }

    /// A denied decision. Denied actions never consume quota.
    pub fn denied(
        tier: MembershipTier,
        resource: ResourceKind,
        limit: u64,
        suggested_tier: Option<MembershipTier>,
        resets_at: Timestamp,
    ) -> Self {
        Self {
            allowed: false,
            remaining: 0,
            limit: limit as i64,
            resource,
            tier,
            suggested_tier,
            resets_at,
        }
    }

    /// Returns true if the gated resource is unlimited for this tier.
    pub fn is_unlimited(&self) -> bool {
        self.limit == -1
    }
}
