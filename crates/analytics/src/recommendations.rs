//! Plain-language guidance folded from the heatmap, subject ranking and
//! fatigue curve. No I/O.

use crate::fatigue::FatigueBin;
use crate::heatmap::SendTimeHeatmap;
use crate::ranking::RankedMetric;
use serde::Serialize;
use utoipa::ToSchema;

const WEEKDAYS: [&str; 7] = [
    "Sunday",
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
];

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationReport {
    pub recommendations: Vec<String>,
    pub top_subjects: Vec<RankedMetric>,
}

pub struct RecommendationSynthesizer;

impl RecommendationSynthesizer {
    /// Ordered recommendations: best send slot, best subject, then a
    /// frequency warning when the second send opens worse than the first.
    pub fn synthesize(
        heatmap: &SendTimeHeatmap,
        subjects: &[RankedMetric],
        fatigue: &[FatigueBin],
    ) -> Vec<String> {
        let mut out = Vec::new();

        if let Some((slot, bucket)) = heatmap.best_slot() {
            let day = WEEKDAYS
                .get(slot.weekday as usize)
                .copied()
                .unwrap_or("an unknown day");
            out.push(format!(
                "Schedule sends on {day} around {:02}:00; that slot has the highest click-through rate ({:.1}% over {} sends).",
                slot.hour,
                bucket.click_rate() * 100.0,
                bucket.sent
            ));
        }

        if let Some(top) = subjects.iter().find(|s| s.sent > 0) {
            out.push(format!(
                "Model new subject lines on \"{}\", which leads with a {:.1}% click-through rate.",
                top.key,
                top.click_rate * 100.0
            ));
        }

        let first = fatigue.iter().find(|b| b.send_number == 1);
        let second = fatigue.iter().find(|b| b.send_number == 2);
        if let (Some(first), Some(second)) = (first, second) {
            if second.open_rate < first.open_rate {
                out.push(format!(
                    "Open rate drops from {:.1}% on the first send to {:.1}% on the second; reduce send frequency for new contacts.",
                    first.open_rate * 100.0,
                    second.open_rate * 100.0
                ));
            }
        }

        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heatmap::HeatmapAggregator;
    use campaign_core::types::{DeliveryStatus, EngagementEvent};
    use chrono::{FixedOffset, TimeZone, Utc};
    use uuid::Uuid;

    fn metric(key: &str, sent: u64, clicks: u64) -> RankedMetric {
        RankedMetric {
            key: key.to_string(),
            sent,
            opens: clicks,
            clicks,
            open_rate: if sent == 0 { 0.0 } else { clicks as f64 / sent as f64 },
            click_rate: if sent == 0 { 0.0 } else { clicks as f64 / sent as f64 },
        }
    }

    fn bin(n: usize, open_rate: f64) -> FatigueBin {
        FatigueBin {
            send_number: n,
            sent: 10,
            open_rate,
            click_rate: 0.0,
        }
    }

    fn clicked_tuesday_event() -> EngagementEvent {
        let t = Utc.with_ymd_and_hms(2026, 3, 3, 14, 0, 0).unwrap();
        EngagementEvent {
            id: Uuid::from_u128(1),
            campaign_id: Uuid::from_u128(1),
            contact_id: Uuid::from_u128(1),
            sent_at: Some(t),
            opened_at: Some(t),
            clicked_at: Some(t),
            status: DeliveryStatus::Clicked,
        }
    }

    #[test]
    fn test_empty_inputs_yield_nothing() {
        let out = RecommendationSynthesizer::synthesize(&SendTimeHeatmap::default(), &[], &[]);
        assert!(out.is_empty());
    }

    #[test]
    fn test_all_three_recommendations() {
        let heatmap = HeatmapAggregator::new(FixedOffset::east_opt(0).unwrap())
            .aggregate(&[clicked_tuesday_event()]);
        let subjects = vec![metric("Last chance", 40, 8), metric("Hello", 40, 2)];
        let fatigue = vec![bin(1, 0.4), bin(2, 0.25)];

        let out = RecommendationSynthesizer::synthesize(&heatmap, &subjects, &fatigue);
        assert_eq!(out.len(), 3);
        assert!(out[0].contains("Tuesday around 14:00"));
        assert!(out[1].contains("\"Last chance\""));
        assert!(out[2].contains("reduce send frequency"));
    }

    #[test]
    fn test_skips_subjects_without_sends() {
        let subjects = vec![metric("Draft", 0, 0)];
        let fatigue = vec![bin(1, 0.3), bin(2, 0.3)];
        let out =
            RecommendationSynthesizer::synthesize(&SendTimeHeatmap::default(), &subjects, &fatigue);
        assert!(out.is_empty());
    }
}
