use chrono::{FixedOffset, Offset, Utc};
use serde::Deserialize;
use std::str::FromStr;

/// Root application configuration. Loaded from environment variables
/// with the prefix `CAMPAIGN_INSIGHTS__` and an optional TOML config file.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_node_id")]
    pub node_id: String,
    /// Offset of the deployment time zone from UTC, in minutes. Heatmap
    /// bucketing and ledger month boundaries both use it.
    #[serde(default)]
    pub utc_offset_minutes: i32,
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
    #[serde(default)]
    pub redis: RedisConfig,
    #[serde(default)]
    pub insights: InsightsConfig,
    #[serde(default)]
    pub usage: UsageConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_http_port")]
    pub http_port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetricsConfig {
    #[serde(default = "default_metrics_enabled")]
    pub enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RedisConfig {
    #[serde(default = "default_redis_urls")]
    pub urls: Vec<String>,
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
    #[serde(default = "default_ledger_key")]
    pub ledger_key: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InsightsConfig {
    /// Upper bound on any collaborator snapshot fetch.
    #[serde(default = "default_store_timeout_ms")]
    pub store_timeout_ms: u64,
    /// Maximum rows returned by the subject and domain rankings.
    #[serde(default = "default_ranking_limit")]
    pub ranking_limit: usize,
    #[serde(default = "default_fatigue_max_bins")]
    pub fatigue_max_bins: usize,
    #[serde(default = "default_reengagement_sample_limit")]
    pub reengagement_sample_limit: usize,
    #[serde(default = "default_reengagement_days")]
    pub default_reengagement_days: i64,
    /// Number of ranked subjects echoed next to the recommendations.
    #[serde(default = "default_top_subjects")]
    pub top_subjects: usize,
}

/// Durable backend for the usage ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LedgerBackend {
    Memory,
    File,
    Redis,
}

impl FromStr for LedgerBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "file" => Ok(Self::File),
            "redis" => Ok(Self::Redis),
            other => Err(format!("unknown ledger backend '{other}'")),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct UsageConfig {
    #[serde(default = "default_ledger_backend")]
    pub store: LedgerBackend,
    #[serde(default = "default_ledger_path")]
    pub file_path: String,
    /// Upper bound on a single ledger store read or write.
    #[serde(default = "default_ledger_io_timeout_ms")]
    pub io_timeout_ms: u64,
    /// Free-tier credit per calendar month, in USD.
    #[serde(default = "default_monthly_budget")]
    pub monthly_budget: f64,
    #[serde(default = "default_warning_percent")]
    pub warning_percent: f64,
    #[serde(default = "default_danger_percent")]
    pub danger_percent: f64,
    /// Projected spend above this share of the budget raises a warning.
    #[serde(default = "default_projection_warning_percent")]
    pub projection_warning_percent: f64,
    #[serde(default)]
    pub pricing: PricingConfig,
}

/// Price in USD per single billable call.
#[derive(Debug, Clone, Deserialize)]
pub struct PricingConfig {
    #[serde(default = "default_text_search_price")]
    pub text_searches: f64,
    #[serde(default = "default_place_details_price")]
    pub place_details: f64,
    #[serde(default = "default_nearby_search_price")]
    pub nearby_searches: f64,
    #[serde(default = "default_place_photo_price")]
    pub place_photos: f64,
}

// Default functions
fn default_node_id() -> String {
    "node-01".to_string()
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_http_port() -> u16 {
    8080
}
fn default_metrics_enabled() -> bool {
    true
}
fn default_metrics_port() -> u16 {
    9091
}
fn default_redis_urls() -> Vec<String> {
    vec!["redis://localhost:6379".to_string()]
}
fn default_connect_timeout_ms() -> u64 {
    5000
}
fn default_ledger_key() -> String {
    "usage:ledger".to_string()
}
fn default_store_timeout_ms() -> u64 {
    5000
}
fn default_ranking_limit() -> usize {
    20
}
fn default_fatigue_max_bins() -> usize {
    20
}
fn default_reengagement_sample_limit() -> usize {
    50
}
fn default_reengagement_days() -> i64 {
    30
}
fn default_top_subjects() -> usize {
    5
}
fn default_ledger_backend() -> LedgerBackend {
    LedgerBackend::File
}
fn default_ledger_path() -> String {
    "data/usage-ledger.json".to_string()
}
fn default_ledger_io_timeout_ms() -> u64 {
    2000
}
fn default_monthly_budget() -> f64 {
    200.0
}
fn default_warning_percent() -> f64 {
    70.0
}
fn default_danger_percent() -> f64 {
    90.0
}
fn default_projection_warning_percent() -> f64 {
    80.0
}
fn default_text_search_price() -> f64 {
    0.005
}
fn default_place_details_price() -> f64 {
    0.017
}
fn default_nearby_search_price() -> f64 {
    0.032
}
fn default_place_photo_price() -> f64 {
    0.007
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            http_port: default_http_port(),
        }
    }
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: default_metrics_enabled(),
            port: default_metrics_port(),
        }
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            urls: default_redis_urls(),
            connect_timeout_ms: default_connect_timeout_ms(),
            ledger_key: default_ledger_key(),
        }
    }
}

impl Default for InsightsConfig {
    fn default() -> Self {
        Self {
            store_timeout_ms: default_store_timeout_ms(),
            ranking_limit: default_ranking_limit(),
            fatigue_max_bins: default_fatigue_max_bins(),
            reengagement_sample_limit: default_reengagement_sample_limit(),
            default_reengagement_days: default_reengagement_days(),
            top_subjects: default_top_subjects(),
        }
    }
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            text_searches: default_text_search_price(),
            place_details: default_place_details_price(),
            nearby_searches: default_nearby_search_price(),
            place_photos: default_place_photo_price(),
        }
    }
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            store: default_ledger_backend(),
            file_path: default_ledger_path(),
            io_timeout_ms: default_ledger_io_timeout_ms(),
            monthly_budget: default_monthly_budget(),
            warning_percent: default_warning_percent(),
            danger_percent: default_danger_percent(),
            projection_warning_percent: default_projection_warning_percent(),
            pricing: PricingConfig::default(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            node_id: default_node_id(),
            utc_offset_minutes: 0,
            api: ApiConfig::default(),
            metrics: MetricsConfig::default(),
            redis: RedisConfig::default(),
            insights: InsightsConfig::default(),
            usage: UsageConfig::default(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables only.
    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from(None)
    }

    /// Load configuration from an optional TOML file overlaid with
    /// environment variables.
    pub fn load_from(path: Option<&str>) -> Result<Self, config::ConfigError> {
        let mut builder = config::Config::builder();
        if let Some(path) = path {
            builder = builder.add_source(config::File::with_name(path).required(false));
        }
        let builder = builder.add_source(
            config::Environment::with_prefix("CAMPAIGN_INSIGHTS")
                .separator("__")
                .try_parsing(true)
                .list_separator(",")
                .with_list_parse_key("redis.urls"),
        );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// The fixed deployment offset. Out-of-range values fall back to UTC.
    pub fn deployment_offset(&self) -> FixedOffset {
        offset_from_minutes(self.utc_offset_minutes)
    }
}

/// Build a `FixedOffset` from minutes east of UTC, clamping invalid input to UTC.
pub fn offset_from_minutes(minutes: i32) -> FixedOffset {
    minutes
        .checked_mul(60)
        .and_then(FixedOffset::east_opt)
        .unwrap_or_else(|| Utc.fix())
}
