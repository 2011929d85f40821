//! Reengagement candidates — reachable contacts who have not opened anything
//! within a recent window.

use campaign_core::types::{Contact, EngagementEvent};
use campaign_core::{CampaignError, CampaignResult};
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::collections::HashSet;
use utoipa::ToSchema;
use uuid::Uuid;

/// Longest accepted lookback window. Keeps `now - days` far inside the
/// range `chrono` can represent.
pub const MAX_WINDOW_DAYS: i64 = 3650;

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReengagementCandidate {
    pub id: Uuid,
    pub email: String,
    pub company: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ReengagementResult {
    pub days: i64,
    pub total: usize,
    pub sample: Vec<ReengagementCandidate>,
}

#[derive(Debug, Clone)]
pub struct ReengagementSelector {
    sample_limit: usize,
}

impl ReengagementSelector {
    pub fn new(sample_limit: usize) -> Self {
        Self { sample_limit }
    }

    /// Reject non-positive or absurdly long windows.
    pub fn validate_window(window_days: i64) -> CampaignResult<()> {
        if window_days <= 0 {
            return Err(CampaignError::InvalidParameter(format!(
                "days must be a positive integer, got {window_days}"
            )));
        }
        if window_days > MAX_WINDOW_DAYS {
            return Err(CampaignError::InvalidParameter(format!(
                "days must be at most {MAX_WINDOW_DAYS}, got {window_days}"
            )));
        }
        Ok(())
    }

    /// Contacts with an email, not known-invalid, not opted out, and with no
    /// open inside `[now - window_days, now]`. The sample keeps input order.
    pub fn select(
        &self,
        contacts: &[Contact],
        events: &[EngagementEvent],
        window_days: i64,
        now: DateTime<Utc>,
    ) -> CampaignResult<ReengagementResult> {
        Self::validate_window(window_days)?;
        let cutoff = now - Duration::days(window_days);

        let recent_openers: HashSet<Uuid> = events
            .iter()
            .filter(|e| e.opened_at.is_some_and(|t| t >= cutoff && t <= now))
            .map(|e| e.contact_id)
            .collect();

        let mut total = 0usize;
        let mut sample = Vec::new();
        for contact in contacts {
            let Some(email) = reachable_email(contact) else {
                continue;
            };
            if recent_openers.contains(&contact.id) {
                continue;
            }
            total += 1;
            if sample.len() < self.sample_limit {
                sample.push(ReengagementCandidate {
                    id: contact.id,
                    email: email.to_string(),
                    company: contact.company.clone(),
                });
            }
        }

        Ok(ReengagementResult {
            days: window_days,
            total,
            sample,
        })
    }
}

fn reachable_email(contact: &Contact) -> Option<&str> {
    if contact.opt_out || contact.email_valid == Some(false) {
        return None;
    }
    contact
        .email
        .as_deref()
        .map(str::trim)
        .filter(|e| !e.is_empty())
}
