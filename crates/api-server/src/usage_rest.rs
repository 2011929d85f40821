//! Usage ledger endpoints — monthly stats, budget alerts and recording.

use crate::rest::{bad_request, ApiResult, AppState, ErrorResponse};
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::Json;
use campaign_billing::{MonthSnapshot, UnitType, UsageStats};
use campaign_core::types::Alert;
use serde::Deserialize;
use tracing::debug;
use utoipa::ToSchema;

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecordUsageRequest {
    pub unit_type: UnitType,
    /// Number of calls to record. Defaults to 1.
    #[schema(minimum = 1)]
    pub count: Option<u64>,
}

/// GET /usage/stats — Current month's usage against the free-tier credit.
#[utoipa::path(
    get,
    path = "/usage/stats",
    tag = "Usage",
    responses((status = 200, description = "Ledger stats", body = UsageStats))
)]
pub async fn handle_stats(State(state): State<AppState>) -> Json<UsageStats> {
    Json(state.ledger.stats().await)
}

/// GET /usage/alerts — Budget and projection alerts for the current month.
#[utoipa::path(
    get,
    path = "/usage/alerts",
    tag = "Usage",
    responses((status = 200, description = "Active alerts, possibly empty", body = Vec<Alert>))
)]
pub async fn handle_alerts(State(state): State<AppState>) -> Json<Vec<Alert>> {
    let stats = state.ledger.stats().await;
    Json(state.alerts.evaluate(&stats))
}

/// GET /usage/history — Archived monthly snapshots, oldest first.
#[utoipa::path(
    get,
    path = "/usage/history",
    tag = "Usage",
    responses((status = 200, description = "Archived months", body = Vec<MonthSnapshot>))
)]
pub async fn handle_history(State(state): State<AppState>) -> Json<Vec<MonthSnapshot>> {
    Json(state.ledger.history().await)
}

/// POST /usage/record — Count billable calls against the current month.
#[utoipa::path(
    post,
    path = "/usage/record",
    tag = "Usage",
    request_body = RecordUsageRequest,
    responses(
        (status = 200, description = "Stats after the increment", body = UsageStats),
        (status = 400, description = "Unknown unit type or zero count", body = ErrorResponse),
    )
)]
pub async fn handle_record(
    State(state): State<AppState>,
    body: Result<Json<RecordUsageRequest>, JsonRejection>,
) -> ApiResult<UsageStats> {
    let Json(request) = body.map_err(|e| bad_request("invalid_usage_request", e.body_text()))?;

    let count = request.count.unwrap_or(1);
    if count == 0 {
        return Err(bad_request(
            "invalid_usage_request",
            "count must be at least 1",
        ));
    }

    debug!(unit = %request.unit_type, count, "Recording usage");
    Ok(Json(state.ledger.record_usage(request.unit_type, count).await))
}
