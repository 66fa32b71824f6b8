//! Application layer - request-time quota services built on the ports.

mod enforcer;
mod usage_report;

pub use enforcer::QuotaEnforcer;
pub use usage_report::{UsageReport, UsageReportHandler};
