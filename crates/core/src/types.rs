use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

/// Delivery status of one campaign send, as recorded by the dispatch subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Pending,
    Sent,
    Delivered,
    Opened,
    Clicked,
    Bounced,
    Failed,
    Unsubscribed,
}

impl DeliveryStatus {
    /// Statuses that count towards a campaign's sent total.
    pub fn counts_as_sent(self) -> bool {
        matches!(
            self,
            Self::Sent | Self::Delivered | Self::Opened | Self::Clicked
        )
    }
}

/// One send of one campaign to one contact, with its engagement timestamps.
///
/// `sent_at` is set once; `opened_at` and `clicked_at` at most once each.
/// Analytics never mutates these records.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EngagementEvent {
    pub id: Uuid,
    pub campaign_id: Uuid,
    pub contact_id: Uuid,
    #[serde(default)]
    pub sent_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub opened_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub clicked_at: Option<DateTime<Utc>>,
    pub status: DeliveryStatus,
}

impl EngagementEvent {
    /// The single timestamp that places this event in time:
    /// `sent_at`, else `opened_at`, else `clicked_at`.
    pub fn canonical_timestamp(&self) -> Option<DateTime<Utc>> {
        self.sent_at.or(self.opened_at).or(self.clicked_at)
    }

    pub fn is_opened(&self) -> bool {
        self.opened_at.is_some()
    }

    pub fn is_clicked(&self) -> bool {
        self.clicked_at.is_some()
    }

    /// An open or click recorded without a matching send.
    pub fn is_orphan(&self) -> bool {
        self.sent_at.is_none() && (self.opened_at.is_some() || self.clicked_at.is_some())
    }
}

/// Read-only projection of a CRM contact.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct Contact {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub opt_out: bool,
    /// `None` when no validation verdict exists yet.
    #[serde(default)]
    pub email_valid: Option<bool>,
}

impl Contact {
    /// Lower-cased domain part of the email address, if it parses.
    pub fn email_domain(&self) -> Option<String> {
        let email = self.email.as_deref()?.trim();
        let (local, domain) = email.rsplit_once('@')?;
        if local.is_empty() || domain.is_empty() || domain.contains(char::is_whitespace) {
            return None;
        }
        Some(domain.to_ascii_lowercase())
    }
}

/// Campaign projection used by the subject ranking.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CampaignSummary {
    pub id: Uuid,
    #[serde(default)]
    pub subject: Option<String>,
}

/// Severity of a usage alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AlertSeverity {
    Warning,
    Danger,
}

/// A derived, never-persisted budget alert.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Alert {
    pub severity: AlertSeverity,
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn event(
        sent: Option<DateTime<Utc>>,
        opened: Option<DateTime<Utc>>,
        clicked: Option<DateTime<Utc>>,
    ) -> EngagementEvent {
        EngagementEvent {
            id: Uuid::from_u128(1),
            campaign_id: Uuid::from_u128(10),
            contact_id: Uuid::from_u128(100),
            sent_at: sent,
            opened_at: opened,
            clicked_at: clicked,
            status: DeliveryStatus::Sent,
        }
    }

    #[test]
    fn test_canonical_timestamp_precedence() {
        let t1 = Utc.with_ymd_and_hms(2026, 3, 2, 9, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2026, 3, 2, 10, 0, 0).unwrap();
        let t3 = Utc.with_ymd_and_hms(2026, 3, 2, 11, 0, 0).unwrap();

        assert_eq!(event(Some(t1), Some(t2), Some(t3)).canonical_timestamp(), Some(t1));
        assert_eq!(event(None, Some(t2), Some(t3)).canonical_timestamp(), Some(t2));
        assert_eq!(event(None, None, Some(t3)).canonical_timestamp(), Some(t3));
        assert_eq!(event(None, None, None).canonical_timestamp(), None);
        assert!(event(None, Some(t2), None).is_orphan());
        assert!(!event(Some(t1), Some(t2), None).is_orphan());
    }

    #[test]
    fn test_email_domain() {
        let mut contact = Contact {
            id: Uuid::from_u128(1),
            email: Some("Jane.Doe@Example.COM".into()),
            company: None,
            opt_out: false,
            email_valid: None,
        };
        assert_eq!(contact.email_domain().as_deref(), Some("example.com"));

        contact.email = Some("no-at-sign".into());
        assert_eq!(contact.email_domain(), None);
        contact.email = Some("@example.com".into());
        assert_eq!(contact.email_domain(), None);
        contact.email = Some("jane@".into());
        assert_eq!(contact.email_domain(), None);
        contact.email = None;
        assert_eq!(contact.email_domain(), None);
    }

    #[test]
    fn test_counted_statuses() {
        assert!(DeliveryStatus::Delivered.counts_as_sent());
        assert!(DeliveryStatus::Clicked.counts_as_sent());
        assert!(!DeliveryStatus::Bounced.counts_as_sent());
        assert!(!DeliveryStatus::Pending.counts_as_sent());
    }

    #[test]
    fn test_event_wire_format() {
        let json = serde_json::json!({
            "id": Uuid::from_u128(1),
            "campaignId": Uuid::from_u128(2),
            "contactId": Uuid::from_u128(3),
            "sentAt": "2026-03-02T09:00:00Z",
            "status": "delivered"
        });
        let event: EngagementEvent = serde_json::from_value(json).unwrap();
        assert!(event.sent_at.is_some());
        assert!(event.opened_at.is_none());
        assert_eq!(event.status, DeliveryStatus::Delivered);
    }
}
