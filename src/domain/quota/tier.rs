//! Membership tier definitions.
//!
//! Represents the subscription tier levels available on the Azora platform.
//! Tier assignment lives in the external user-account store; this service
//! only reads the tier value it is handed.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// Membership subscription tier.
///
/// Determines resource limits and feature access. Tiers form a strict
/// total order by generosity: each higher tier's limits are greater or
/// unlimited for every resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MembershipTier {
    /// Free tier - evaluation use.
    Free,

    /// Student tier - discounted individual plan.
    Student,

    /// Professional tier - full individual plan.
    Professional,

    /// Enterprise tier - unlimited resources, every feature enabled.
    Enterprise,
}

impl MembershipTier {
    /// All tiers in ascending order of generosity.
    pub const ORDERED: [MembershipTier; 4] = [
        MembershipTier::Free,
        MembershipTier::Student,
        MembershipTier::Professional,
        MembershipTier::Enterprise,
    ];

    /// Returns true if this tier is a paid tier.
    pub fn is_paid(&self) -> bool {
        !matches!(self, MembershipTier::Free)
    }

    /// Returns the display name for this tier.
    pub fn display_name(&self) -> &'static str {
        match self {
            MembershipTier::Free => "Free",
            MembershipTier::Student => "Student",
            MembershipTier::Professional => "Professional",
            MembershipTier::Enterprise => "Enterprise",
        }
    }

    /// Returns the numeric rank of this tier for comparison.
    ///
    /// Higher rank = more generous limits.
    pub fn rank(&self) -> u8 {
        match self {
            MembershipTier::Free => 0,
            MembershipTier::Student => 1,
            MembershipTier::Professional => 2,
            MembershipTier::Enterprise => 3,
        }
    }
}

impl std::fmt::Display for MembershipTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display_name())
    }
}

impl FromStr for MembershipTier {
    type Err = ValidationError;

    /// Parses a tier name at the boundary. Unknown names are rejected
    /// here so interior code is total over the enum.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "free" => Ok(MembershipTier::Free),
            "student" => Ok(MembershipTier::Student),
            "professional" => Ok(MembershipTier::Professional),
            "enterprise" => Ok(MembershipTier::Enterprise),
            other => Err(ValidationError::invalid_format(
                "tier",
                format!("unknown tier '{}'", other),
            )),
        }
    }
}
