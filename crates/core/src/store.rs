//! Contracts for the collaborator stores the analytics read from.
//!
//! The relational data layer lives outside this workspace; these traits are
//! the only surface the insights engine depends on.

use crate::types::{CampaignSummary, Contact, EngagementEvent};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Optional narrowing of an event snapshot.
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub campaign_id: Option<Uuid>,
    /// Only events whose canonical timestamp is at or after this instant.
    pub since: Option<DateTime<Utc>>,
}

impl EventFilter {
    pub fn matches(&self, event: &EngagementEvent) -> bool {
        if let Some(campaign_id) = self.campaign_id {
            if event.campaign_id != campaign_id {
                return false;
            }
        }
        match self.since {
            Some(since) => event.canonical_timestamp().is_some_and(|ts| ts >= since),
            None => true,
        }
    }
}

/// Optional narrowing of a contact snapshot.
#[derive(Debug, Clone, Default)]
pub struct ContactFilter {
    /// Skip contacts with no email address at all.
    pub require_email: bool,
}

impl ContactFilter {
    pub fn matches(&self, contact: &Contact) -> bool {
        !self.require_email || contact.email.is_some()
    }
}

/// Source of engagement events.
#[async_trait]
pub trait EventStore: Send + Sync {
    async fn list_events(&self, filter: &EventFilter) -> anyhow::Result<Vec<EngagementEvent>>;
}

/// Source of contact projections.
#[async_trait]
pub trait ContactStore: Send + Sync {
    async fn list_eligible(&self, filter: &ContactFilter) -> anyhow::Result<Vec<Contact>>;
}

/// Source of campaign projections, in the store's listing order.
#[async_trait]
pub trait CampaignStore: Send + Sync {
    async fn list_campaigns(&self) -> anyhow::Result<Vec<CampaignSummary>>;
}
