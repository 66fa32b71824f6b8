//! Quota domain - membership tiers, resource limits, and usage periods.

mod catalog;
mod decision;
mod resource;
mod tier;
mod usage_period;

pub use catalog::{FeatureSet, TierCatalog, TierLimits, ALL_FEATURES};
pub use decision::Decision;
pub use resource::{ResourceKind, ResourceLimit};
pub use tier::MembershipTier;
pub use usage_period::{usage_percentages, UsagePeriod};
