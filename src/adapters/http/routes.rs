//! HTTP routes for the quota service.
//!
//! Collaborating platform services call `POST /users/{id}/consume` to
//! gate an action; the tier endpoints back the billing/admin surface's
//! tier-comparison UI. Authentication is terminated upstream - these
//! routes trust the caller-supplied user id and tier, matching the
//! service's boundary (tier assignment is external).

use std::str::FromStr;
use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;

use crate::application::{QuotaEnforcer, UsageReportHandler};
use crate::domain::foundation::{Timestamp, UserId};
use crate::domain::quota::{MembershipTier, ResourceKind, TierCatalog};
use crate::ports::UsageLedger;

use super::quota_gate::{add_quota_headers, QuotaGate};

/// Shared state for the HTTP surface.
#[derive(Clone)]
pub struct AppState {
    pub gate: QuotaGate,
    pub reports: Arc<UsageReportHandler>,
    pub ledger: Arc<dyn UsageLedger>,
}

impl AppState {
    pub fn new(ledger: Arc<dyn UsageLedger>) -> Self {
        let enforcer = Arc::new(QuotaEnforcer::new(ledger.clone()));
        Self {
            gate: QuotaGate::new(enforcer),
            reports: Arc::new(UsageReportHandler::new(ledger.clone())),
            ledger,
        }
    }
}

/// Builds the service router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/v1/tiers", get(list_tiers))
        .route("/api/v1/tiers/:tier", get(get_tier))
        .route("/api/v1/users/:user_id/usage", get(get_usage))
        .route("/api/v1/users/:user_id/consume", post(consume))
        .route("/api/v1/admin/reset-stale", post(reset_stale))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
struct TierQuery {
    tier: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ConsumeRequest {
    tier: String,
    resource: String,
}

fn bad_request(message: String) -> Response {
    (
        StatusCode::BAD_REQUEST,
        Json(serde_json::json!({
            "error": "INVALID_ARGUMENT",
            "message": message,
        })),
    )
        .into_response()
}

fn parse_user(user_id: String) -> Result<UserId, Response> {
    UserId::new(user_id).map_err(|e| bad_request(e.to_string()))
}

fn parse_tier(tier: &str) -> Result<MembershipTier, Response> {
    MembershipTier::from_str(tier).map_err(|e| bad_request(e.to_string()))
}

fn parse_resource(resource: &str) -> Result<ResourceKind, Response> {
    ResourceKind::from_str(resource).map_err(|e| bad_request(e.to_string()))
}

/// GET /api/v1/tiers - the full catalog, ascending by generosity.
async fn list_tiers() -> Response {
    Json(TierCatalog::all()).into_response()
}

/// GET /api/v1/tiers/{tier} - limits and features for one tier.
async fn get_tier(Path(tier): Path<String>) -> Response {
    match parse_tier(&tier) {
        Ok(tier) => Json(TierCatalog::limits_for(tier)).into_response(),
        Err(response) => response,
    }
}

/// GET /api/v1/users/{user_id}/usage?tier=free - informational report.
async fn get_usage(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Query(query): Query<TierQuery>,
) -> Response {
    let user_id = match parse_user(user_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let tier = match parse_tier(&query.tier) {
        Ok(tier) => tier,
        Err(response) => return response,
    };

    match state.reports.handle(&user_id, tier, Timestamp::now()).await {
        Ok(report) => Json(report).into_response(),
        Err(err) => super::quota_gate::ledger_error_response(&err),
    }
}

/// POST /api/v1/users/{user_id}/consume - the quota gate.
///
/// Allowed calls return the decision with quota headers; exhausted
/// quota returns 429 with an upgrade suggestion.
async fn consume(
    State(state): State<AppState>,
    Path(user_id): Path<String>,
    Json(request): Json<ConsumeRequest>,
) -> Response {
    let user_id = match parse_user(user_id) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let tier = match parse_tier(&request.tier) {
        Ok(tier) => tier,
        Err(response) => return response,
    };
    let kind = match parse_resource(&request.resource) {
        Ok(kind) => kind,
        Err(response) => return response,
    };

    match state
        .gate
        .consume(&user_id, tier, kind, Timestamp::now())
        .await
    {
        Ok(decision) => {
            let mut response = Json(&decision).into_response();
            add_quota_headers(&mut response, &decision);
            response
        }
        Err(rejection) => rejection.into_response(),
    }
}

/// POST /api/v1/admin/reset-stale - the monthly cron contract.
///
/// A shim under the immutable-history design: each month starts a fresh
/// row, so there is nothing to zero and the count is 0 unless the
/// configured ledger opts into a reclaim policy.
async fn reset_stale(State(state): State<AppState>) -> Response {
    match state.ledger.reset_stale_periods(Timestamp::now()).await {
        Ok(count) => Json(serde_json::json!({ "resetPeriods": count })).into_response(),
        Err(err) => super::quota_gate::ledger_error_response(&err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::InMemoryUsageLedger;
    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    fn app() -> Router {
        let ledger: Arc<dyn UsageLedger> = Arc::new(InMemoryUsageLedger::new());
        router(AppState::new(ledger))
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn list_tiers_returns_all_four() {
        let response = app()
            .oneshot(Request::get("/api/v1/tiers").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json.as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn get_tier_serializes_unlimited_as_sentinel() {
        let response = app()
            .oneshot(
                Request::get("/api/v1/tiers/enterprise")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["ai_requests"], -1);
    }

    #[tokio::test]
    async fn get_tier_rejects_unknown_tier() {
        let response = app()
            .oneshot(
                Request::get("/api/v1/tiers/platinum")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn consume_returns_decision_with_headers() {
        let response = app()
            .oneshot(
                Request::post("/api/v1/users/user-1/consume")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"tier":"free","resource":"ai_requests"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get("x-ai-requests-limit").unwrap(),
            "100"
        );
        assert_eq!(
            response.headers().get("x-ai-requests-remaining").unwrap(),
            "99"
        );

        let json = body_json(response).await;
        assert_eq!(json["allowed"], true);
    }

    #[tokio::test]
    async fn consume_returns_429_when_exhausted() {
        let ledger: Arc<dyn UsageLedger> = Arc::new(InMemoryUsageLedger::new());
        let user = UserId::new("user-1").unwrap();
        ledger
            .increment_counter(&user, ResourceKind::ActiveCourses, 3, Timestamp::now())
            .await
            .unwrap();

        let response = router(AppState::new(ledger))
            .oneshot(
                Request::post("/api/v1/users/user-1/consume")
                    .header("content-type", "application/json")
                    .body(Body::from(
                        r#"{"tier":"free","resource":"active_courses"}"#,
                    ))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let json = body_json(response).await;
        assert_eq!(json["error"], "QUOTA_EXCEEDED");
        assert_eq!(json["currentTier"], "free");
        assert_eq!(json["suggestedTier"], "student");
        assert!(json["resetDate"].is_string());
    }

    #[tokio::test]
    async fn consume_rejects_unknown_resource() {
        let response = app()
            .oneshot(
                Request::post("/api/v1/users/user-1/consume")
                    .header("content-type", "application/json")
                    .body(Body::from(r#"{"tier":"free","resource":"tokens"}"#))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn usage_report_requires_tier_param() {
        let response = app()
            .oneshot(
                Request::get("/api/v1/users/user-1/usage")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn usage_report_returns_percentages() {
        let response = app()
            .oneshot(
                Request::get("/api/v1/users/user-1/usage?tier=free")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["percentages"]["ai_requests"], 0);
    }

    #[tokio::test]
    async fn reset_stale_is_a_noop_shim() {
        let response = app()
            .oneshot(
                Request::post("/api/v1/admin/reset-stale")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let json = body_json(response).await;
        assert_eq!(json["resetPeriods"], 0);
    }
}
