//! Quota-gated resource kinds and their limits.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::str::FromStr;

use crate::domain::foundation::ValidationError;

/// A resource kind whose consumption is counted per user per month.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// AI/LLM calls.
    AiRequests,
    /// Stored bytes across the user's workspaces.
    StorageBytes,
    /// Courses the user is actively enrolled in.
    ActiveCourses,
    /// Projects the user currently has open.
    ActiveProjects,
}

impl ResourceKind {
    /// All resource kinds, in a fixed reporting order.
    pub const ALL: [ResourceKind; 4] = [
        ResourceKind::AiRequests,
        ResourceKind::StorageBytes,
        ResourceKind::ActiveCourses,
        ResourceKind::ActiveProjects,
    ];

    /// Returns the snake_case name of this resource kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::AiRequests => "ai_requests",
            ResourceKind::StorageBytes => "storage_bytes",
            ResourceKind::ActiveCourses => "active_courses",
            ResourceKind::ActiveProjects => "active_projects",
        }
    }

    /// Returns the ledger column name for this counter.
    ///
    /// The enum is closed, so these identifiers are safe to splice into SQL.
    pub fn column(&self) -> &'static str {
        self.as_str()
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ResourceKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ai_requests" => Ok(ResourceKind::AiRequests),
            "storage_bytes" => Ok(ResourceKind::StorageBytes),
            "active_courses" => Ok(ResourceKind::ActiveCourses),
            "active_projects" => Ok(ResourceKind::ActiveProjects),
            other => Err(ValidationError::invalid_format(
                "resource",
                format!("unknown counter '{}'", other),
            )),
        }
    }
}

/// A per-resource limit for one tier.
///
/// Internally a tagged variant; on the wire it uses the platform's `-1`
/// sentinel for unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceLimit {
    /// At most this many units per calendar month.
    Limited(u64),
    /// No limit; consumption is still recorded for analytics.
    Unlimited,
}

impl ResourceLimit {
    /// Returns true if this limit is the unlimited sentinel.
    pub fn is_unlimited(&self) -> bool {
        matches!(self, ResourceLimit::Unlimited)
    }

    /// Returns the wire representation: the limit value, or `-1` for
    /// unlimited.
    pub fn as_sentinel(&self) -> i64 {
        match self {
            ResourceLimit::Limited(n) => *n as i64,
            ResourceLimit::Unlimited => -1,
        }
    }

    /// Builds a limit from the wire representation (negative = unlimited).
    pub fn from_sentinel(value: i64) -> Self {
        if value < 0 {
            ResourceLimit::Unlimited
        } else {
            ResourceLimit::Limited(value as u64)
        }
    }
}

impl Serialize for ResourceLimit {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.as_sentinel())
    }
}

impl<'de> Deserialize<'de> for ResourceLimit {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = i64::deserialize(deserializer)?;
        if value < -1 {
            return Err(D::Error::custom(format!(
                "resource limit must be -1 or non-negative, got {}",
                value
            )));
        }
        Ok(ResourceLimit::from_sentinel(value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_kind_roundtrips_through_str() {
        for kind in ResourceKind::ALL {
            assert_eq!(kind.as_str().parse::<ResourceKind>().unwrap(), kind);
        }
    }

    #[test]
    fn resource_kind_rejects_unknown_names() {
        assert!("tokens".parse::<ResourceKind>().is_err());
    }

    #[test]
    fn resource_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ResourceKind::AiRequests).unwrap();
        assert_eq!(json, "\"ai_requests\"");
    }

    #[test]
    fn unlimited_sentinel_is_minus_one() {
        assert_eq!(ResourceLimit::Unlimited.as_sentinel(), -1);
        assert_eq!(ResourceLimit::Limited(100).as_sentinel(), 100);
    }

    #[test]
    fn from_sentinel_maps_negative_to_unlimited() {
        assert_eq!(ResourceLimit::from_sentinel(-1), ResourceLimit::Unlimited);
        assert_eq!(ResourceLimit::from_sentinel(0), ResourceLimit::Limited(0));
        assert_eq!(
            ResourceLimit::from_sentinel(250),
            ResourceLimit::Limited(250)
        );
    }

    #[test]
    fn limit_serializes_as_sentinel_integer() {
        assert_eq!(
            serde_json::to_string(&ResourceLimit::Unlimited).unwrap(),
            "-1"
        );
        assert_eq!(
            serde_json::to_string(&ResourceLimit::Limited(42)).unwrap(),
            "42"
        );
    }

    #[test]
    fn limit_deserializes_from_sentinel_integer() {
        let unlimited: ResourceLimit = serde_json::from_str("-1").unwrap();
        assert!(unlimited.is_unlimited());
        let limited: ResourceLimit = serde_json::from_str("100").unwrap();
        assert_eq!(limited, ResourceLimit::Limited(100));
    }

    #[test]
    fn limit_rejects_values_below_minus_one() {
        let result: Result<ResourceLimit, _> = serde_json::from_str("-5");
        assert!(result.is_err());
    }
}
