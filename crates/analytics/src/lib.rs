//! Campaign engagement analytics: send-time heatmap, subject and domain
//! rankings, frequency fatigue, reengagement candidates and the
//! recommendations folded from them.

pub mod fatigue;
pub mod heatmap;
pub mod memory;
pub mod ranking;
pub mod recommendations;
pub mod reengagement;
pub mod service;

pub use fatigue::{FatigueBin, FatigueBinner};
pub use heatmap::{HeatBucket, HeatmapAggregator, SendTimeHeatmap, SlotKey};
pub use memory::InMemoryEngagementStore;
pub use ranking::{PerformanceRanker, RankedMetric, NO_SUBJECT};
pub use recommendations::{RecommendationReport, RecommendationSynthesizer};
pub use reengagement::{ReengagementCandidate, ReengagementResult, ReengagementSelector};
pub use service::InsightsService;
