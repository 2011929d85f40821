//! OpenAPI document served at `/api-docs/openapi.json`.

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Campaign Insights API",
        version = "0.1.0",
        description = "Engagement analytics over campaign send/open/click events, and usage governance for billable places-API calls.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Insights", description = "Send-time heatmap, rankings, fatigue, reengagement and recommendations"),
        (name = "Usage", description = "Monthly usage ledger, budget alerts and history"),
        (name = "Operations", description = "Health, readiness, and liveness probes"),
    ),
    paths(
        // Insights
        crate::insights_rest::handle_send_time_heatmap,
        crate::insights_rest::handle_subject_performance,
        crate::insights_rest::handle_domain_performance,
        crate::insights_rest::handle_frequency_fatigue,
        crate::insights_rest::handle_reengagement,
        crate::insights_rest::handle_recommendations,
        // Usage
        crate::usage_rest::handle_stats,
        crate::usage_rest::handle_alerts,
        crate::usage_rest::handle_history,
        crate::usage_rest::handle_record,
        // Operations
        crate::rest::health_check,
        crate::rest::readiness,
        crate::rest::liveness,
    ),
    components(schemas(
        // Insight types
        campaign_analytics::HeatBucket,
        campaign_analytics::RankedMetric,
        campaign_analytics::FatigueBin,
        campaign_analytics::ReengagementCandidate,
        campaign_analytics::ReengagementResult,
        campaign_analytics::RecommendationReport,
        // Usage types
        campaign_billing::UnitType,
        campaign_billing::UsageStats,
        campaign_billing::MonthSnapshot,
        campaign_core::types::Alert,
        campaign_core::types::AlertSeverity,
        crate::usage_rest::RecordUsageRequest,
        // REST error/health types
        crate::rest::ErrorResponse,
        crate::rest::HealthResponse,
    ))
)]
pub struct ApiDoc;
