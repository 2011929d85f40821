//! Insights service — fetches bounded snapshots from the collaborator stores
//! and runs the pure analytics over them.

use crate::fatigue::{FatigueBin, FatigueBinner};
use crate::heatmap::{HeatmapAggregator, SendTimeHeatmap};
use crate::ranking::{PerformanceRanker, RankedMetric};
use crate::reengagement::{ReengagementResult, ReengagementSelector};
use crate::recommendations::{RecommendationReport, RecommendationSynthesizer};
use campaign_core::config::InsightsConfig;
use campaign_core::store::{CampaignStore, ContactFilter, ContactStore, EventFilter, EventStore};
use campaign_core::{CampaignError, CampaignResult};
use chrono::{DateTime, FixedOffset, Utc};
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error};

pub struct InsightsService {
    events: Arc<dyn EventStore>,
    contacts: Arc<dyn ContactStore>,
    campaigns: Arc<dyn CampaignStore>,
    heatmap: HeatmapAggregator,
    ranker: PerformanceRanker,
    fatigue: FatigueBinner,
    reengagement: ReengagementSelector,
    store_timeout: Duration,
    default_reengagement_days: i64,
    top_subjects: usize,
}

impl InsightsService {
    pub fn new(
        events: Arc<dyn EventStore>,
        contacts: Arc<dyn ContactStore>,
        campaigns: Arc<dyn CampaignStore>,
        config: &InsightsConfig,
        offset: FixedOffset,
    ) -> Self {
        Self {
            events,
            contacts,
            campaigns,
            heatmap: HeatmapAggregator::new(offset),
            ranker: PerformanceRanker::new(config.ranking_limit),
            fatigue: FatigueBinner::new(config.fatigue_max_bins),
            reengagement: ReengagementSelector::new(config.reengagement_sample_limit),
            store_timeout: Duration::from_millis(config.store_timeout_ms),
            default_reengagement_days: config.default_reengagement_days,
            top_subjects: config.top_subjects,
        }
    }

    /// Build the service over one store that serves all three snapshots.
    pub fn from_store<S>(store: Arc<S>, config: &InsightsConfig, offset: FixedOffset) -> Self
    where
        S: EventStore + ContactStore + CampaignStore + 'static,
    {
        Self::new(store.clone(), store.clone(), store, config, offset)
    }

    pub fn default_reengagement_days(&self) -> i64 {
        self.default_reengagement_days
    }

    pub async fn send_time_heatmap(&self) -> CampaignResult<SendTimeHeatmap> {
        let started = Instant::now();
        let events = self.all_events().await?;
        let heatmap = self.heatmap.aggregate(&events);
        record("send_time_heatmap", started);
        Ok(heatmap)
    }

    pub async fn subject_performance(&self) -> CampaignResult<Vec<RankedMetric>> {
        let started = Instant::now();
        let filter = EventFilter::default();
        let (campaigns, events) = tokio::try_join!(
            self.fetch("campaigns", self.campaigns.list_campaigns()),
            self.fetch("events", self.events.list_events(&filter)),
        )?;
        let ranked = self.ranker.rank_subjects(&campaigns, &events);
        record("subject_performance", started);
        Ok(ranked)
    }

    pub async fn domain_performance(&self) -> CampaignResult<Vec<RankedMetric>> {
        let started = Instant::now();
        let event_filter = EventFilter::default();
        let contact_filter = ContactFilter {
            require_email: true,
        };
        let (contacts, events) = tokio::try_join!(
            self.fetch("contacts", self.contacts.list_eligible(&contact_filter)),
            self.fetch("events", self.events.list_events(&event_filter)),
        )?;
        let ranked = self.ranker.rank_domains(&contacts, &events);
        record("domain_performance", started);
        Ok(ranked)
    }

    pub async fn frequency_fatigue(&self) -> CampaignResult<Vec<FatigueBin>> {
        let started = Instant::now();
        let events = self.all_events().await?;
        let bins = self.fatigue.bin(&events);
        record("frequency_fatigue", started);
        Ok(bins)
    }

    /// Reengagement candidates for a window of `days` (the configured
    /// default when absent), evaluated against the current time.
    pub async fn reengagement(&self, days: Option<i64>) -> CampaignResult<ReengagementResult> {
        self.reengagement_at(days.unwrap_or(self.default_reengagement_days), Utc::now())
            .await
    }

    pub async fn reengagement_at(
        &self,
        days: i64,
        now: DateTime<Utc>,
    ) -> CampaignResult<ReengagementResult> {
        // Validate before touching any store.
        ReengagementSelector::validate_window(days)?;

        let started = Instant::now();
        let event_filter = EventFilter::default();
        let contact_filter = ContactFilter {
            require_email: true,
        };
        let (contacts, events) = tokio::try_join!(
            self.fetch("contacts", self.contacts.list_eligible(&contact_filter)),
            self.fetch("events", self.events.list_events(&event_filter)),
        )?;
        let result = self.reengagement.select(&contacts, &events, days, now)?;
        record("reengagement", started);
        Ok(result)
    }

    /// Recommendations plus the leading subjects they were drawn from.
    pub async fn recommendations(&self) -> CampaignResult<RecommendationReport> {
        let started = Instant::now();
        let filter = EventFilter::default();
        let (campaigns, events) = tokio::try_join!(
            self.fetch("campaigns", self.campaigns.list_campaigns()),
            self.fetch("events", self.events.list_events(&filter)),
        )?;

        let heatmap = self.heatmap.aggregate(&events);
        let subjects = self.ranker.rank_subjects(&campaigns, &events);
        let fatigue = self.fatigue.bin(&events);
        let recommendations = RecommendationSynthesizer::synthesize(&heatmap, &subjects, &fatigue);

        let top_subjects = subjects.into_iter().take(self.top_subjects).collect();
        record("recommendations", started);
        Ok(RecommendationReport {
            recommendations,
            top_subjects,
        })
    }

    async fn all_events(&self) -> CampaignResult<Vec<campaign_core::types::EngagementEvent>> {
        let filter = EventFilter::default();
        self.fetch("events", self.events.list_events(&filter)).await
    }

    /// Await one snapshot under the store timeout. Failures are logged with
    /// their cause and surfaced with a generic message.
    async fn fetch<T>(
        &self,
        source: &'static str,
        query: impl Future<Output = anyhow::Result<T>>,
    ) -> CampaignResult<T> {
        match tokio::time::timeout(self.store_timeout, query).await {
            Ok(Ok(rows)) => Ok(rows),
            Ok(Err(e)) => {
                error!(source, error = %e, "Snapshot query failed");
                metrics::counter!("insights.query_failures", "source" => source).increment(1);
                Err(CampaignError::QueryFailure(format!("{source} query failed")))
            }
            Err(_) => {
                error!(source, timeout_ms = self.store_timeout.as_millis() as u64, "Snapshot query timed out");
                metrics::counter!("insights.query_failures", "source" => source).increment(1);
                Err(CampaignError::QueryFailure(format!("{source} query timed out")))
            }
        }
    }
}

fn record(insight: &'static str, started: Instant) {
    let elapsed = started.elapsed();
    metrics::counter!("insights.requests", "insight" => insight).increment(1);
    metrics::histogram!("insights.compute_seconds", "insight" => insight)
        .record(elapsed.as_secs_f64());
    debug!(insight, elapsed_us = elapsed.as_micros() as u64, "Insight computed");
}
