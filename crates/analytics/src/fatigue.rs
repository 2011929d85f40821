//! Frequency fatigue — engagement by the ordinal of a send within each
//! contact's own send history.

use campaign_core::types::EngagementEvent;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::HashMap;
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct FatigueBin {
    /// 1-based ordinal of the send within a contact's history.
    pub send_number: usize,
    pub sent: u64,
    pub open_rate: f64,
    pub click_rate: f64,
}

#[derive(Debug, Default, Clone, Copy)]
struct BinTally {
    total: u64,
    opens: u64,
    clicks: u64,
}

#[derive(Debug, Clone)]
pub struct FatigueBinner {
    max_bins: usize,
}

impl FatigueBinner {
    pub fn new(max_bins: usize) -> Self {
        Self { max_bins }
    }

    /// Bins ascending by send number, at most `max_bins` of them.
    ///
    /// A contact's events are ordered by `sent_at` (missing sorts as the Unix
    /// epoch) and then by event id, so equal timestamps still get distinct,
    /// reproducible ordinals.
    pub fn bin(&self, events: &[EngagementEvent]) -> Vec<FatigueBin> {
        let mut by_contact: HashMap<Uuid, Vec<&EngagementEvent>> = HashMap::new();
        for event in events {
            by_contact.entry(event.contact_id).or_default().push(event);
        }

        let mut bins: Vec<BinTally> = Vec::new();
        for history in by_contact.values_mut() {
            history.sort_by_key(|e| (send_time(e), e.id));
            for (i, event) in history.iter().take(self.max_bins).enumerate() {
                if bins.len() <= i {
                    bins.push(BinTally::default());
                }
                let bin = &mut bins[i];
                bin.total += 1;
                if event.is_opened() {
                    bin.opens += 1;
                }
                if event.is_clicked() {
                    bin.clicks += 1;
                }
            }
        }

        bins.into_iter()
            .enumerate()
            .map(|(i, t)| FatigueBin {
                send_number: i + 1,
                sent: t.total,
                open_rate: t.opens as f64 / t.total as f64,
                click_rate: t.clicks as f64 / t.total as f64,
            })
            .collect()
    }
}

fn send_time(event: &EngagementEvent) -> DateTime<Utc> {
    // `DateTime::<Utc>::default()` is the Unix epoch.
    event.sent_at.unwrap_or_default()
}
