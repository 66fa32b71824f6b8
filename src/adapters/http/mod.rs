//! HTTP adapter - axum surface over the quota core.

mod quota_gate;
mod routes;

pub use quota_gate::{headers, QuotaGate, QuotaRejection};
pub use routes::{router, AppState};
