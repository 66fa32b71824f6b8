//! Quota gate for axum handlers.
//!
//! Wraps `QuotaEnforcer` for use inside HTTP handlers, translating a
//! denied `Decision` into a 429 response with the platform's JSON body
//! `{ error, message, currentTier, suggestedTier, resetDate }` and
//! quota headers on every response:
//! - `X-AI-Requests-Limit`: the tier's limit for the gated resource
//! - `X-AI-Requests-Remaining`: units left in the current period
//!
//! This layer owns the fail-open/fail-closed policy: ledger failures map
//! to 503 (fail-closed), so an unreachable store never mints free quota.

use std::sync::Arc;

use axum::{
    http::{HeaderName, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::application::QuotaEnforcer;
use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::quota::{Decision, MembershipTier, ResourceKind};
use crate::ports::LedgerError;

/// Quota header names.
pub mod headers {
    use super::HeaderName;

    /// The tier's limit for the gated resource (-1 = unlimited).
    pub static X_AI_REQUESTS_LIMIT: HeaderName =
        HeaderName::from_static("x-ai-requests-limit");
    /// Units remaining in the current period (-1 = unlimited).
    pub static X_AI_REQUESTS_REMAINING: HeaderName =
        HeaderName::from_static("x-ai-requests-remaining");
}

/// Gate handlers call before performing a quota-limited action.
#[derive(Clone)]
pub struct QuotaGate {
    enforcer: Arc<QuotaEnforcer>,
}

impl QuotaGate {
    pub fn new(enforcer: Arc<QuotaEnforcer>) -> Self {
        Self { enforcer }
    }

    /// Checks and consumes one unit, or rejects with a ready-made HTTP
    /// response.
    pub async fn consume(
        &self,
        user_id: &UserId,
        tier: MembershipTier,
        kind: ResourceKind,
        now: Timestamp,
    ) -> Result<Decision, QuotaRejection> {
        let decision = self
            .enforcer
            .check_and_consume(user_id, tier, kind, now)
            .await
            .map_err(QuotaRejection::Ledger)?;

        if decision.allowed {
            Ok(decision)
        } else {
            Err(QuotaRejection::Denied(decision))
        }
    }
}

/// Rejection produced by the gate.
#[derive(Debug)]
pub enum QuotaRejection {
    /// The quota is exhausted; carries the denial decision.
    Denied(Decision),
    /// The ledger failed; maps to 503/400 per the error kind.
    Ledger(LedgerError),
}

/// Denial body, camelCase per the platform contract.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct DenialBody {
    error: &'static str,
    message: String,
    current_tier: MembershipTier,
    #[serde(skip_serializing_if = "Option::is_none")]
    suggested_tier: Option<MembershipTier>,
    reset_date: Timestamp,
}

impl IntoResponse for QuotaRejection {
    fn into_response(self) -> Response {
        match self {
            QuotaRejection::Denied(decision) => denial_response(&decision),
            QuotaRejection::Ledger(err) => ledger_error_response(&err),
        }
    }
}

/// Builds the 429 response for a denied decision.
pub fn denial_response(decision: &Decision) -> Response {
    let message = match decision.suggested_tier {
        Some(tier) => format!(
            "Monthly {} limit reached for the {} tier. Upgrade to {} to continue.",
            decision.resource, decision.tier, tier
        ),
        None => format!(
            "Monthly {} limit reached for the {} tier.",
            decision.resource, decision.tier
        ),
    };

    let mut response = (
        StatusCode::TOO_MANY_REQUESTS,
        Json(DenialBody {
            error: "QUOTA_EXCEEDED",
            message,
            current_tier: decision.tier,
            suggested_tier: decision.suggested_tier,
            reset_date: decision.resets_at,
        }),
    )
        .into_response();

    add_quota_headers(&mut response, decision);
    response
}

/// Maps ledger failures to HTTP. `StorageUnavailable` is 503: this
/// deployment fails closed rather than minting quota it cannot record.
pub fn ledger_error_response(err: &LedgerError) -> Response {
    let (status, code) = match err {
        LedgerError::StorageUnavailable(_) => {
            tracing::warn!(error = %err, "usage ledger unavailable");
            (StatusCode::SERVICE_UNAVAILABLE, "STORAGE_UNAVAILABLE")
        }
        LedgerError::InvalidArgument(_) => (StatusCode::BAD_REQUEST, "INVALID_ARGUMENT"),
    };

    (
        status,
        Json(serde_json::json!({
            "error": code,
            "message": err.to_string(),
        })),
    )
        .into_response()
}

/// Adds the quota headers from a decision to a response. Called for
/// allowed and denied responses alike so clients can always display
/// remaining quota.
pub fn add_quota_headers(response: &mut Response, decision: &Decision) {
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&decision.limit.to_string()) {
        headers.insert(headers::X_AI_REQUESTS_LIMIT.clone(), value);
    }
    if let Ok(value) = HeaderValue::from_str(&decision.remaining.to_string()) {
        headers.insert(headers::X_AI_REQUESTS_REMAINING.clone(), value);
    }
}
