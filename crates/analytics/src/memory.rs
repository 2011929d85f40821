//! In-memory engagement store backed by ordered vectors.
//!
//! Production: the campaign, contact and event snapshots come from the CRM's
//! relational store. This provides the same trait surface for development
//! and testing, keeping insertion order as the listing order.

use async_trait::async_trait;
use campaign_core::store::{
    CampaignStore, ContactFilter, ContactStore, EventFilter, EventStore,
};
use campaign_core::types::{CampaignSummary, Contact, DeliveryStatus, EngagementEvent};
use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use tracing::info;
use uuid::Uuid;

#[derive(Default)]
pub struct InMemoryEngagementStore {
    campaigns: RwLock<Vec<CampaignSummary>>,
    contacts: RwLock<Vec<Contact>>,
    events: RwLock<Vec<EngagementEvent>>,
}

impl InMemoryEngagementStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_campaign(&self, campaign: CampaignSummary) {
        self.campaigns.write().push(campaign);
    }

    pub fn add_contact(&self, contact: Contact) {
        self.contacts.write().push(contact);
    }

    pub fn record_event(&self, event: EngagementEvent) {
        self.events.write().push(event);
    }

    pub fn event_count(&self) -> usize {
        self.events.read().len()
    }

    /// Seed a deterministic demo dataset: four campaigns sent to sixty
    /// contacts over the eight weeks before `now`.
    pub fn seed_demo_data(&self, now: DateTime<Utc>) {
        let subjects = [
            Some("Your spring lookbook is here"),
            Some("Last chance: 20% off ends tonight"),
            None,
            Some("Quick question about your listing"),
        ];
        let campaign_ids: Vec<Uuid> = subjects
            .iter()
            .enumerate()
            .map(|(i, subject)| {
                let id = Uuid::from_u128(0xC0FFEE_0000 + i as u128);
                self.add_campaign(CampaignSummary {
                    id,
                    subject: subject.map(str::to_string),
                });
                id
            })
            .collect();

        let domains = ["gmail.com", "outlook.com", "acme.io", "globex.com", "initech.dev"];
        let contact_count = 60u128;
        for n in 0..contact_count {
            let domain = domains[n as usize % domains.len()];
            self.add_contact(Contact {
                id: Uuid::from_u128(0xC0DE_0000 + n),
                email: (n % 17 != 0).then(|| format!("contact{n}@{domain}")),
                company: Some(format!("Business {}", n / 3)),
                opt_out: n % 11 == 0,
                email_valid: match n % 7 {
                    0 => None,
                    3 => Some(false),
                    _ => Some(true),
                },
            });
        }

        let start = now - Duration::weeks(8);
        let mut seq = 0u128;
        for (c, campaign_id) in campaign_ids.iter().enumerate() {
            for n in 0..contact_count {
                // Each campaign reaches a different slice of the list.
                if (n + c as u128) % 4 == 0 {
                    continue;
                }
                seq += 1;
                let day = (c as i64 * 12) + (n as i64 % 9);
                let hour = 7 + ((n as i64 + c as i64 * 3) % 12);
                let sent_at = start + Duration::days(day) + Duration::hours(hour);

                let engagement = (n * 7 + c as u128 * 13) % 10;
                let opened = (engagement < 4 && c < 3) || engagement < 2;
                let clicked = opened && engagement % 2 == 0;
                let status = if n % 23 == 0 {
                    DeliveryStatus::Bounced
                } else if clicked {
                    DeliveryStatus::Clicked
                } else if opened {
                    DeliveryStatus::Opened
                } else {
                    DeliveryStatus::Delivered
                };
                let bounced = status == DeliveryStatus::Bounced;

                self.record_event(EngagementEvent {
                    id: Uuid::from_u128(0xE0E0_0000 + seq),
                    campaign_id: *campaign_id,
                    contact_id: Uuid::from_u128(0xC0DE_0000 + n),
                    sent_at: Some(sent_at),
                    opened_at: (opened && !bounced).then(|| sent_at + Duration::minutes(42)),
                    clicked_at: (clicked && !bounced).then(|| sent_at + Duration::minutes(47)),
                    status,
                });
            }
        }

        info!(
            campaigns = campaign_ids.len(),
            contacts = contact_count,
            events = seq,
            "Seeded demo engagement data"
        );
    }
}

#[async_trait]
impl EventStore for InMemoryEngagementStore {
    async fn list_events(&self, filter: &EventFilter) -> anyhow::Result<Vec<EngagementEvent>> {
        Ok(self
            .events
            .read()
            .iter()
            .filter(|e| filter.matches(e))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ContactStore for InMemoryEngagementStore {
    async fn list_eligible(&self, filter: &ContactFilter) -> anyhow::Result<Vec<Contact>> {
        Ok(self
            .contacts
            .read()
            .iter()
            .filter(|c| filter.matches(c))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl CampaignStore for InMemoryEngagementStore {
    async fn list_campaigns(&self) -> anyhow::Result<Vec<CampaignSummary>> {
        Ok(self.campaigns.read().clone())
    }
}
