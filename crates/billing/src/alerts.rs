//! Budget alerts derived from the ledger's monthly stats.

use crate::ledger::UsageStats;
use campaign_core::config::UsageConfig;
use campaign_core::types::{Alert, AlertSeverity};

/// Alert trigger points, all in percent of the monthly credit.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertThresholds {
    pub budget: f64,
    pub warning_percent: f64,
    pub danger_percent: f64,
    pub projection_warning_percent: f64,
}

impl Default for AlertThresholds {
    fn default() -> Self {
        Self::from(&UsageConfig::default())
    }
}

impl From<&UsageConfig> for AlertThresholds {
    fn from(config: &UsageConfig) -> Self {
        Self {
            budget: config.monthly_budget,
            warning_percent: config.warning_percent,
            danger_percent: config.danger_percent,
            projection_warning_percent: config.projection_warning_percent,
        }
    }
}

/// Maps ledger stats to zero or more alerts. Usage and projection alerts are
/// evaluated independently and may both fire; nothing is deduplicated.
#[derive(Debug, Clone, Default)]
pub struct AlertEvaluator {
    thresholds: AlertThresholds,
}

impl AlertEvaluator {
    pub fn new(thresholds: AlertThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &AlertThresholds {
        &self.thresholds
    }

    pub fn evaluate(&self, stats: &UsageStats) -> Vec<Alert> {
        let t = &self.thresholds;
        let mut alerts = Vec::new();

        if stats.percentage_used >= t.danger_percent {
            alerts.push(Alert {
                severity: AlertSeverity::Danger,
                message: format!(
                    "API usage is at {:.1}% of the ${:.2} monthly credit; only ${:.2} remains.",
                    stats.percentage_used, t.budget, stats.remaining_credit
                ),
            });
        } else if stats.percentage_used >= t.warning_percent {
            alerts.push(Alert {
                severity: AlertSeverity::Warning,
                message: format!(
                    "API usage has passed {:.0}% of the monthly credit ({:.1}% used, ${:.2} remaining).",
                    t.warning_percent, stats.percentage_used, stats.remaining_credit
                ),
            });
        }

        let projection_trigger = t.budget * t.projection_warning_percent / 100.0;
        if stats.projected_monthly_cost > t.budget {
            alerts.push(Alert {
                severity: AlertSeverity::Danger,
                message: format!(
                    "Projected spend of ${:.2} will exceed the ${:.2} credit by ${:.2} this month.",
                    stats.projected_monthly_cost,
                    t.budget,
                    stats.projected_monthly_cost - t.budget
                ),
            });
        } else if stats.projected_monthly_cost > projection_trigger {
            alerts.push(Alert {
                severity: AlertSeverity::Warning,
                message: format!(
                    "Projected spend of ${:.2} is above {:.0}% of the ${:.2} credit.",
                    stats.projected_monthly_cost, t.projection_warning_percent, t.budget
                ),
            });
        }

        alerts
    }
}
