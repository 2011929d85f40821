//! Shared REST state, error bodies and operational endpoints.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use campaign_analytics::InsightsService;
use campaign_billing::{AlertEvaluator, UsageLedger};
use campaign_core::CampaignError;
use serde::Serialize;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{error, warn};
use utoipa::ToSchema;

/// Shared application state for REST handlers.
#[derive(Clone)]
pub struct AppState {
    pub insights: Arc<InsightsService>,
    pub ledger: Arc<UsageLedger>,
    pub alerts: AlertEvaluator,
    pub node_id: String,
    pub start_time: Instant,
    pub ready: Arc<AtomicBool>,
}

impl AppState {
    pub fn new(
        insights: Arc<InsightsService>,
        ledger: Arc<UsageLedger>,
        alerts: AlertEvaluator,
        node_id: impl Into<String>,
    ) -> Self {
        Self {
            insights,
            ledger,
            alerts,
            node_id: node_id.into(),
            start_time: Instant::now(),
            ready: Arc::new(AtomicBool::new(true)),
        }
    }
}

pub type ApiError = (StatusCode, Json<ErrorResponse>);
pub type ApiResult<T> = Result<Json<T>, ApiError>;

/// 400 with the caller-facing reason.
pub fn bad_request(error: &str, message: impl Into<String>) -> ApiError {
    let message = message.into();
    warn!(error, message = %message, "Request validation failed");
    metrics::counter!("api.validation_errors").increment(1);
    (
        StatusCode::BAD_REQUEST,
        Json(ErrorResponse {
            error: error.to_string(),
            message,
        }),
    )
}

/// Map a domain error onto a status code. Server-side failures never echo
/// their cause to the client.
pub fn reject(err: CampaignError) -> ApiError {
    match err {
        CampaignError::InvalidParameter(msg) => bad_request("invalid_parameter", msg),
        CampaignError::QueryFailure(msg) => {
            error!(error = %msg, "Insight query failed");
            metrics::counter!("api.errors").increment(1);
            internal("query_failed")
        }
        other => {
            error!(error = %other, "Request failed");
            metrics::counter!("api.errors").increment(1);
            internal("internal_error")
        }
    }
}

fn internal(error: &str) -> ApiError {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: error.to_string(),
            message: "Internal processing error".to_string(),
        }),
    )
}

/// GET /health — Health check endpoint.
#[utoipa::path(
    get,
    path = "/health",
    tag = "Operations",
    responses((status = 200, description = "Service is healthy", body = HealthResponse))
)]
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        node_id: state.node_id.clone(),
        uptime_secs: state.start_time.elapsed().as_secs(),
    })
}

/// GET /ready — Readiness probe.
#[utoipa::path(
    get,
    path = "/ready",
    tag = "Operations",
    responses(
        (status = 200, description = "Ready to accept traffic"),
        (status = 503, description = "Still starting up"),
    )
)]
pub async fn readiness(State(state): State<AppState>) -> StatusCode {
    if state.ready.load(Ordering::Acquire) {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

/// GET /live — Liveness probe.
#[utoipa::path(
    get,
    path = "/live",
    tag = "Operations",
    responses((status = 200, description = "Process is alive"))
)]
pub async fn liveness() -> StatusCode {
    StatusCode::OK
}

#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
    pub node_id: String,
    pub uptime_secs: u64,
}
