//! Engagement insight endpoints.

use crate::rest::{bad_request, reject, ApiResult, AppState, ErrorResponse};
use axum::extract::{Query, State};
use axum::Json;
use campaign_analytics::{
    FatigueBin, RankedMetric, RecommendationReport, ReengagementResult,
    SendTimeHeatmap,
};
use serde::Deserialize;
use utoipa::IntoParams;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ReengagementQuery {
    /// Lookback window in days. Defaults to 30.
    #[param(value_type = Option<i64>, minimum = 1)]
    pub days: Option<String>,
}

/// GET /insights/send-time-heatmap — Engagement binned by weekday and hour.
#[utoipa::path(
    get,
    path = "/insights/send-time-heatmap",
    tag = "Insights",
    responses(
        (status = 200, description = "Buckets keyed by \"<weekday>-<hour>\", Sunday = 0", body = HashMap<String, campaign_analytics::HeatBucket>),
        (status = 500, description = "Snapshot query failed", body = ErrorResponse),
    )
)]
pub async fn handle_send_time_heatmap(
    State(state): State<AppState>,
) -> ApiResult<SendTimeHeatmap> {
    state.insights.send_time_heatmap().await.map(Json).map_err(reject)
}

/// GET /insights/subject-performance — Subject lines ranked by click rate.
#[utoipa::path(
    get,
    path = "/insights/subject-performance",
    tag = "Insights",
    responses(
        (status = 200, description = "Ranked subjects", body = Vec<RankedMetric>),
        (status = 500, description = "Snapshot query failed", body = ErrorResponse),
    )
)]
pub async fn handle_subject_performance(
    State(state): State<AppState>,
) -> ApiResult<Vec<RankedMetric>> {
    state.insights.subject_performance().await.map(Json).map_err(reject)
}

/// GET /insights/domain-performance — Recipient domains ranked by click rate.
#[utoipa::path(
    get,
    path = "/insights/domain-performance",
    tag = "Insights",
    responses(
        (status = 200, description = "Ranked domains", body = Vec<RankedMetric>),
        (status = 500, description = "Snapshot query failed", body = ErrorResponse),
    )
)]
pub async fn handle_domain_performance(
    State(state): State<AppState>,
) -> ApiResult<Vec<RankedMetric>> {
    state.insights.domain_performance().await.map(Json).map_err(reject)
}

/// GET /insights/frequency-fatigue — Engagement by send ordinal.
#[utoipa::path(
    get,
    path = "/insights/frequency-fatigue",
    tag = "Insights",
    responses(
        (status = 200, description = "Fatigue bins ascending by send number", body = Vec<FatigueBin>),
        (status = 500, description = "Snapshot query failed", body = ErrorResponse),
    )
)]
pub async fn handle_frequency_fatigue(
    State(state): State<AppState>,
) -> ApiResult<Vec<FatigueBin>> {
    state.insights.frequency_fatigue().await.map(Json).map_err(reject)
}

/// GET /insights/reengagement — Reachable contacts with no recent opens.
#[utoipa::path(
    get,
    path = "/insights/reengagement",
    tag = "Insights",
    params(ReengagementQuery),
    responses(
        (status = 200, description = "Candidate count and sample", body = ReengagementResult),
        (status = 400, description = "Invalid window", body = ErrorResponse),
        (status = 500, description = "Snapshot query failed", body = ErrorResponse),
    )
)]
pub async fn handle_reengagement(
    State(state): State<AppState>,
    Query(query): Query<ReengagementQuery>,
) -> ApiResult<ReengagementResult> {
    // Parsed by hand so a malformed value is a 400 with our error body.
    let days = match query.days.as_deref().map(str::trim) {
        None => None,
        Some(raw) => match raw.parse::<i64>() {
            Ok(days) => Some(days),
            Err(_) => {
                return Err(bad_request(
                    "invalid_parameter",
                    format!("days must be a positive integer, got {raw:?}"),
                ))
            }
        },
    };

    state.insights.reengagement(days).await.map(Json).map_err(reject)
}

/// GET /insights/recommendations — Plain-language guidance.
#[utoipa::path(
    get,
    path = "/insights/recommendations",
    tag = "Insights",
    responses(
        (status = 200, description = "Recommendations and leading subjects", body = RecommendationReport),
        (status = 500, description = "Snapshot query failed", body = ErrorResponse),
    )
)]
pub async fn handle_recommendations(
    State(state): State<AppState>,
) -> ApiResult<RecommendationReport> {
    state.insights.recommendations().await.map(Json).map_err(reject)
}
