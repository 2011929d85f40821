//! Send-time heatmap — bins engagement events by (weekday, hour) of their
//! canonical timestamp in the deployment time zone.

use campaign_core::types::EngagementEvent;
use chrono::{Datelike, FixedOffset, Timelike};
use serde::ser::{Serialize, Serializer};
use std::collections::BTreeMap;
use tracing::debug;
use utoipa::ToSchema;

/// Heatmap cell key. `weekday` counts from Sunday = 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotKey {
    pub weekday: u8,
    pub hour: u8,
}

impl SlotKey {
    pub fn new(weekday: u8, hour: u8) -> Self {
        Self { weekday, hour }
    }
}

impl std::fmt::Display for SlotKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}-{}", self.weekday, self.hour)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, ToSchema)]
pub struct HeatBucket {
    pub sent: u64,
    pub opens: u64,
    pub clicks: u64,
}

impl HeatBucket {
    pub fn click_rate(&self) -> f64 {
        if self.sent == 0 {
            0.0
        } else {
            self.clicks as f64 / self.sent as f64
        }
    }
}

/// Buckets keyed by slot. Only slots that received at least one event exist.
/// Serializes as `{"<weekday>-<hour>": {sent, opens, clicks}}`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SendTimeHeatmap {
    buckets: BTreeMap<SlotKey, HeatBucket>,
    /// Slots in the order their first event arrived.
    first_seen: Vec<SlotKey>,
}

impl SendTimeHeatmap {
    pub fn get(&self, weekday: u8, hour: u8) -> Option<&HeatBucket> {
        self.buckets.get(&SlotKey::new(weekday, hour))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SlotKey, &HeatBucket)> {
        self.buckets.iter()
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }

    pub fn total_sent(&self) -> u64 {
        self.buckets.values().map(|b| b.sent).sum()
    }

    /// Slot with the highest clicks/sent. Ties go to the slot whose first
    /// event came earliest in the aggregated stream.
    pub fn best_slot(&self) -> Option<(SlotKey, HeatBucket)> {
        let mut best: Option<(SlotKey, HeatBucket)> = None;
        for key in &self.first_seen {
            let Some(bucket) = self.buckets.get(key) else {
                continue;
            };
            match best {
                Some((_, b)) if bucket.click_rate() <= b.click_rate() => {}
                _ => best = Some((*key, *bucket)),
            }
        }
        best
    }
}

impl Serialize for SendTimeHeatmap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_map(self.buckets.iter().map(|(k, v)| (k.to_string(), v)))
    }
}

#[derive(Debug, Clone)]
pub struct HeatmapAggregator {
    offset: FixedOffset,
}

impl HeatmapAggregator {
    pub fn new(offset: FixedOffset) -> Self {
        Self { offset }
    }

    /// Single pass over `events`. Events without any timestamp are dropped;
    /// opens and clicks without a send are still counted.
    pub fn aggregate(&self, events: &[EngagementEvent]) -> SendTimeHeatmap {
        let mut heatmap = SendTimeHeatmap::default();
        let mut dropped = 0usize;
        let mut orphans = 0usize;

        for event in events {
            let Some(ts) = event.canonical_timestamp() else {
                dropped += 1;
                continue;
            };
            if event.is_orphan() {
                orphans += 1;
            }

            let local = ts.with_timezone(&self.offset);
            let key = SlotKey::new(
                local.weekday().num_days_from_sunday() as u8,
                local.hour() as u8,
            );
            let bucket = heatmap.buckets.entry(key).or_insert_with(|| {
                heatmap.first_seen.push(key);
                HeatBucket::default()
            });
            bucket.sent += 1;
            if event.is_opened() {
                bucket.opens += 1;
            }
            if event.is_clicked() {
                bucket.clicks += 1;
            }
        }

        debug!(
            events = events.len(),
            buckets = heatmap.len(),
            dropped,
            orphans,
            "Send-time heatmap aggregated"
        );
        heatmap
    }
}
