//! Subject and recipient-domain performance rankings.
//!
//! Both rankings group events by a string key, compute open and click rates
//! per group, and sort by click rate. Sorting is stable, so groups with equal
//! rates keep the order in which they were first seen.

use campaign_core::types::{CampaignSummary, Contact, EngagementEvent};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;
use tracing::debug;
use utoipa::ToSchema;
use uuid::Uuid;

/// Group key for campaigns with a missing or blank subject line.
pub const NO_SUBJECT: &str = "(no subject)";

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RankedMetric {
    pub key: String,
    pub sent: u64,
    pub opens: u64,
    pub clicks: u64,
    pub open_rate: f64,
    pub click_rate: f64,
}

#[derive(Debug, Default, Clone, Copy)]
struct Tally {
    sent: u64,
    opens: u64,
    clicks: u64,
}

/// Insertion-ordered groups.
#[derive(Default)]
struct Groups {
    order: Vec<(String, Tally)>,
    index: HashMap<String, usize>,
}

impl Groups {
    fn slot(&mut self, key: &str) -> usize {
        if let Some(&i) = self.index.get(key) {
            return i;
        }
        let i = self.order.len();
        self.order.push((key.to_string(), Tally::default()));
        self.index.insert(key.to_string(), i);
        i
    }

    fn tally_mut(&mut self, slot: usize) -> &mut Tally {
        &mut self.order[slot].1
    }
}

fn ratio(part: u64, whole: u64) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64
    }
}

#[derive(Debug, Clone)]
pub struct PerformanceRanker {
    limit: usize,
}

impl PerformanceRanker {
    pub fn new(limit: usize) -> Self {
        Self { limit }
    }

    /// Rank campaign subjects by click rate. `sent` counts only events whose
    /// status is in the counted-as-sent set. Events of unknown campaigns are
    /// skipped.
    pub fn rank_subjects(
        &self,
        campaigns: &[CampaignSummary],
        events: &[EngagementEvent],
    ) -> Vec<RankedMetric> {
        let mut groups = Groups::default();
        let mut campaign_slot: HashMap<Uuid, usize> = HashMap::with_capacity(campaigns.len());

        for campaign in campaigns {
            let subject = campaign
                .subject
                .as_deref()
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .unwrap_or(NO_SUBJECT);
            let slot = groups.slot(subject);
            campaign_slot.insert(campaign.id, slot);
        }

        let mut skipped = 0usize;
        for event in events {
            let Some(&slot) = campaign_slot.get(&event.campaign_id) else {
                skipped += 1;
                continue;
            };
            let tally = groups.tally_mut(slot);
            if event.status.counts_as_sent() {
                tally.sent += 1;
            }
            if event.is_opened() {
                tally.opens += 1;
            }
            if event.is_clicked() {
                tally.clicks += 1;
            }
        }

        debug!(subjects = groups.order.len(), skipped, "Subject ranking computed");
        self.finish(groups)
    }

    /// Rank recipient email domains by click rate over all of each domain's
    /// events. Contacts without a parsable email are skipped.
    pub fn rank_domains(
        &self,
        contacts: &[Contact],
        events: &[EngagementEvent],
    ) -> Vec<RankedMetric> {
        let domains: HashMap<Uuid, String> = contacts
            .iter()
            .filter_map(|c| c.email_domain().map(|d| (c.id, d)))
            .collect();

        let mut groups = Groups::default();
        let mut skipped = 0usize;
        for event in events {
            let Some(domain) = domains.get(&event.contact_id) else {
                skipped += 1;
                continue;
            };
            let slot = groups.slot(domain);
            let tally = groups.tally_mut(slot);
            tally.sent += 1;
            if event.is_opened() {
                tally.opens += 1;
            }
            if event.is_clicked() {
                tally.clicks += 1;
            }
        }

        debug!(domains = groups.order.len(), skipped, "Domain ranking computed");
        self.finish(groups)
    }

    fn finish(&self, groups: Groups) -> Vec<RankedMetric> {
        let mut ranked: Vec<RankedMetric> = groups
            .order
            .into_iter()
            .map(|(key, t)| RankedMetric {
                key,
                sent: t.sent,
                opens: t.opens,
                clicks: t.clicks,
                open_rate: ratio(t.opens, t.sent),
                click_rate: ratio(t.clicks, t.sent),
            })
            .collect();

        // `sort_by` is stable: ties keep first-seen order.
        ranked.sort_by(|a, b| {
            b.click_rate
                .partial_cmp(&a.click_rate)
                .unwrap_or(Ordering::Equal)
        });
        ranked.truncate(self.limit);
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use campaign_core::types::DeliveryStatus;
    use chrono::{TimeZone, Utc};

    fn campaign(n: u128, subject: Option<&str>) -> CampaignSummary {
        CampaignSummary {
            id: Uuid::from_u128(n),
            subject: subject.map(str::to_string),
        }
    }

    fn contact(n: u128, email: Option<&str>) -> Contact {
        Contact {
            id: Uuid::from_u128(n),
            email: email.map(str::to_string),
            company: None,
            opt_out: false,
            email_valid: None,
        }
    }

    fn send(
        n: u128,
        campaign: u128,
        contact: u128,
        status: DeliveryStatus,
        opened: bool,
        clicked: bool,
    ) -> EngagementEvent {
        let t = Utc.with_ymd_and_hms(2026, 2, 10, 10, 0, 0).unwrap();
        EngagementEvent {
            id: Uuid::from_u128(n),
            campaign_id: Uuid::from_u128(campaign),
            contact_id: Uuid::from_u128(contact),
            sent_at: Some(t),
            opened_at: opened.then_some(t),
            clicked_at: clicked.then_some(t),
            status,
        }
    }

    /// `sends` events for one campaign, the first `clicks` of them clicked.
    fn batch(start: u128, campaign: u128, sends: u128, clicks: u128) -> Vec<EngagementEvent> {
        (0..sends)
            .map(|i| {
                send(
                    start + i,
                    campaign,
                    start + i,
                    DeliveryStatus::Delivered,
                    i < clicks,
                    i < clicks,
                )
            })
            .collect()
    }

    #[test]
    fn test_subject_ties_keep_campaign_order() {
        let campaigns = vec![campaign(1, Some("Spring sale")), campaign(2, Some("New arrivals"))];
        let mut events = batch(1_000, 2, 10, 1);
        events.extend(batch(2_000, 1, 20, 2));

        let ranked = PerformanceRanker::new(20).rank_subjects(&campaigns, &events);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].key, "Spring sale");
        assert_eq!(ranked[1].key, "New arrivals");
        assert!((ranked[0].click_rate - 0.1).abs() < 1e-12);
        assert!((ranked[1].click_rate - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_subject_ranking_orders_and_groups() {
        let campaigns = vec![
            campaign(1, Some("Weekly digest")),
            campaign(2, None),
            campaign(3, Some("  ")),
            campaign(4, Some("Flash deal")),
            campaign(5, Some("Weekly digest")),
        ];
        let mut events = batch(100, 1, 10, 1);
        events.extend(batch(200, 5, 10, 1));
        events.extend(batch(300, 2, 4, 0));
        events.extend(batch(400, 3, 4, 0));
        events.extend(batch(500, 4, 10, 5));
        events.push(send(600, 4, 600, DeliveryStatus::Bounced, false, false));
        events.push(send(601, 99, 601, DeliveryStatus::Delivered, true, true));

        let ranked = PerformanceRanker::new(20).rank_subjects(&campaigns, &events);
        let keys: Vec<&str> = ranked.iter().map(|r| r.key.as_str()).collect();
        assert_eq!(keys, vec!["Flash deal", "Weekly digest", NO_SUBJECT]);

        assert_eq!(ranked[0].sent, 10);
        assert_eq!(ranked[1].sent, 20);
        assert_eq!(ranked[1].clicks, 2);
        assert_eq!(ranked[2].sent, 8);
        assert_eq!(ranked[2].click_rate, 0.0);
    }

    #[test]
    fn test_subject_without_sends_has_zero_rates() {
        let campaigns = vec![campaign(1, Some("Draft"))];
        let events = vec![send(1, 1, 1, DeliveryStatus::Pending, false, false)];
        let ranked = PerformanceRanker::new(20).rank_subjects(&campaigns, &events);
        assert_eq!(ranked[0].sent, 0);
        assert_eq!(ranked[0].open_rate, 0.0);
        assert_eq!(ranked[0].click_rate, 0.0);
    }

    #[test]
    fn test_domain_ranking() {
        let contacts = vec![
            contact(1, Some("a@Acme.io")),
            contact(2, Some("b@acme.io")),
            contact(3, Some("c@globex.com")),
            contact(4, Some("broken-address")),
            contact(5, None),
        ];
        let events = vec![
            send(1, 1, 1, DeliveryStatus::Delivered, true, false),
            send(2, 1, 2, DeliveryStatus::Delivered, false, false),
            send(3, 1, 3, DeliveryStatus::Delivered, true, true),
            send(4, 1, 4, DeliveryStatus::Delivered, true, true),
            send(5, 1, 5, DeliveryStatus::Delivered, true, true),
        ];

        let ranked = PerformanceRanker::new(20).rank_domains(&contacts, &events);
        assert_eq!(ranked.len(), 2);
        assert_eq!(ranked[0].key, "globex.com");
        assert_eq!(ranked[0].click_rate, 1.0);
        assert_eq!(ranked[1].key, "acme.io");
        assert_eq!(ranked[1].sent, 2);
        assert_eq!(ranked[1].open_rate, 0.5);
    }

    #[test]
    fn test_truncates_and_is_deterministic() {
        let campaigns: Vec<CampaignSummary> = (0..30)
            .map(|i| campaign(i, Some(&format!("Subject {i}"))))
            .collect();
        let events: Vec<EngagementEvent> = (0..30u128)
            .flat_map(|i| batch(10_000 + i * 100, i, 10, i % 4))
            .collect();

        let ranker = PerformanceRanker::new(20);
        let first = ranker.rank_subjects(&campaigns, &events);
        assert_eq!(first.len(), 20);
        for _ in 0..5 {
            assert_eq!(ranker.rank_subjects(&campaigns, &events), first);
        }
        assert!(first
            .windows(2)
            .all(|w| w[0].click_rate >= w[1].click_rate));
    }
}
