//! Campaign Insights — engagement analytics and usage governance service.
//!
//! Main entry point that wires the stores, the usage ledger and the REST
//! server together.

use campaign_analytics::{InMemoryEngagementStore, InsightsService};
use campaign_api::{ApiServer, AppState};
use campaign_billing::{
    AlertEvaluator, AlertThresholds, FileLedgerStore, InMemoryLedgerStore, LedgerStore,
    UsageLedger,
};
use campaign_cache::RedisLedgerStore;
use campaign_core::config::{AppConfig, LedgerBackend};
use clap::Parser;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::{error, info, warn};

#[derive(Parser, Debug)]
#[command(name = "campaign-insights")]
#[command(about = "Engagement analytics and usage governance for CRM email campaigns")]
#[command(version)]
struct Cli {
    /// Optional configuration file (TOML/YAML/JSON), overlaid by the environment
    #[arg(long, env = "CAMPAIGN_INSIGHTS_CONFIG")]
    config: Option<String>,

    /// Node identifier (overrides config)
    #[arg(long, env = "CAMPAIGN_INSIGHTS__NODE_ID")]
    node_id: Option<String>,

    /// HTTP port (overrides config)
    #[arg(long, env = "CAMPAIGN_INSIGHTS__API__HTTP_PORT")]
    http_port: Option<u16>,

    /// Usage ledger backend: memory, file or redis (overrides config)
    #[arg(long, env = "CAMPAIGN_INSIGHTS__USAGE__STORE")]
    ledger: Option<LedgerBackend>,

    /// Path of the JSON ledger file when using the file backend
    #[arg(long, env = "CAMPAIGN_INSIGHTS__USAGE__FILE_PATH")]
    ledger_path: Option<String>,

    /// Seed the in-memory engagement store with demo campaigns
    #[arg(long, default_value_t = false)]
    seed_demo: bool,
}

async fn ledger_store(config: &AppConfig) -> Arc<dyn LedgerStore> {
    match config.usage.store {
        LedgerBackend::Memory => Arc::new(InMemoryLedgerStore::new()),
        LedgerBackend::File => Arc::new(FileLedgerStore::new(&config.usage.file_path)),
        LedgerBackend::Redis => match RedisLedgerStore::new(&config.redis).await {
            Ok(store) => Arc::new(store),
            Err(e) => {
                error!(error = %e, "Failed to connect to Redis, usage ledger will not persist");
                Arc::new(InMemoryLedgerStore::new())
            }
        },
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campaign_insights=info,tower_http=info".into()),
        )
        .json()
        .init();

    let cli = Cli::parse();

    info!("Campaign Insights starting up");

    // Load configuration
    let mut config = AppConfig::load_from(cli.config.as_deref()).unwrap_or_else(|e| {
        warn!(error = %e, "Failed to load config, using defaults");
        AppConfig::default()
    });

    // Apply CLI overrides
    if let Some(node_id) = cli.node_id {
        config.node_id = node_id;
    }
    if let Some(port) = cli.http_port {
        config.api.http_port = port;
    }
    if let Some(backend) = cli.ledger {
        config.usage.store = backend;
    }
    if let Some(path) = cli.ledger_path {
        config.usage.file_path = path;
    }

    let offset = config.deployment_offset();
    info!(
        node_id = %config.node_id,
        http_port = config.api.http_port,
        ledger = ?config.usage.store,
        utc_offset = %offset,
        "Configuration loaded"
    );

    // Engagement snapshots
    let engagement = Arc::new(InMemoryEngagementStore::new());
    let insights = Arc::new(InsightsService::from_store(
        engagement.clone(),
        &config.insights,
        offset,
    ));

    // Usage governance
    let ledger = Arc::new(UsageLedger::new(
        ledger_store(&config).await,
        &config.usage,
        offset,
    ));
    let alerts = AlertEvaluator::new(AlertThresholds::from(&config.usage));

    let state = AppState::new(insights, ledger.clone(), alerts, config.node_id.clone());
    state.ready.store(false, Ordering::Release);

    // Serve probes while the rest of startup runs; /ready answers 503 until then.
    let api_server = Arc::new(ApiServer::new(config.clone(), state.clone()));
    let http = {
        let api_server = api_server.clone();
        tokio::spawn(async move { api_server.start_http().await })
    };

    if cli.seed_demo {
        engagement.seed_demo_data(chrono::Utc::now());
    }

    // Load (and roll over, if needed) the persisted ledger before taking traffic.
    let usage = ledger.stats().await;
    info!(
        month = %usage.current_month,
        cost = usage.cost,
        "Usage ledger loaded"
    );

    // Start metrics exporter
    if let Err(e) = api_server.start_metrics().await {
        error!(error = %e, "Failed to start metrics exporter");
    }

    state.ready.store(true, Ordering::Release);
    info!("Campaign Insights is ready to serve traffic");

    // HTTP server runs until shutdown
    http.await??;

    Ok(())
}
