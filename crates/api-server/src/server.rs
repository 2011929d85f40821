//! API server — HTTP REST plus a Prometheus metrics listener.

use crate::insights_rest;
use crate::rest::{self, AppState};
use crate::swagger::ApiDoc;
use crate::usage_rest;
use axum::routing::{get, post};
use axum::Router;
use campaign_core::config::AppConfig;
use std::net::SocketAddr;
use tower_http::compression::CompressionLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Build the full REST router over `state`.
pub fn router(state: AppState) -> Router {
    Router::new()
        // Engagement insights
        .route(
            "/insights/send-time-heatmap",
            get(insights_rest::handle_send_time_heatmap),
        )
        .route(
            "/insights/subject-performance",
            get(insights_rest::handle_subject_performance),
        )
        .route(
            "/insights/domain-performance",
            get(insights_rest::handle_domain_performance),
        )
        .route(
            "/insights/frequency-fatigue",
            get(insights_rest::handle_frequency_fatigue),
        )
        .route("/insights/reengagement", get(insights_rest::handle_reengagement))
        .route(
            "/insights/recommendations",
            get(insights_rest::handle_recommendations),
        )
        // Usage governance
        .route("/usage/stats", get(usage_rest::handle_stats))
        .route("/usage/alerts", get(usage_rest::handle_alerts))
        .route("/usage/history", get(usage_rest::handle_history))
        .route("/usage/record", post(usage_rest::handle_record))
        // Operational endpoints
        .route("/health", get(rest::health_check))
        .route("/ready", get(rest::readiness))
        .route("/live", get(rest::liveness))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        // Middleware
        .layer(CompressionLayer::new())
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub struct ApiServer {
    config: AppConfig,
    state: AppState,
}

impl ApiServer {
    pub fn new(config: AppConfig, state: AppState) -> Self {
        Self { config, state }
    }

    /// Start the HTTP REST server.
    pub async fn start_http(&self) -> anyhow::Result<()> {
        let app = router(self.state.clone());

        let addr = SocketAddr::new(self.config.api.host.parse()?, self.config.api.http_port);

        info!(addr = %addr, node_id = %self.config.node_id, "Starting HTTP server");

        let listener = tokio::net::TcpListener::bind(addr).await?;
        axum::serve(listener, app).await?;

        Ok(())
    }

    /// Start the metrics exporter on its own port. No-op when disabled.
    pub async fn start_metrics(&self) -> anyhow::Result<()> {
        if !self.config.metrics.enabled {
            info!("Metrics exporter disabled");
            return Ok(());
        }

        metrics_exporter_prometheus::PrometheusBuilder::new()
            .with_http_listener(SocketAddr::new(
                self.config.api.host.parse()?,
                self.config.metrics.port,
            ))
            .install()?;

        info!(port = self.config.metrics.port, "Metrics exporter started");
        Ok(())
    }
}
