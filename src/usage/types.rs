//! Usage windows as reported by the usage endpoint.

use crate::error::PollError;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

/// One rate-limit accounting period.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageWindow {
    /// Percentage used, clamped to 0-100.
    pub utilization: f64,
    /// When the window resets, if the API reported it.
    pub resets_at: Option<DateTime<Utc>>,
}

impl UsageWindow {
    pub fn new(utilization: f64, resets_at: Option<DateTime<Utc>>) -> Self {
        let utilization = if utilization.is_finite() {
            utilization.clamp(0.0, 100.0)
        } else {
            0.0
        };
        Self {
            utilization,
            resets_at,
        }
    }

    /// Time left until reset, `None` if unknown or already passed.
    pub fn time_until_reset(&self, now: DateTime<Utc>) -> Option<std::time::Duration> {
        self.resets_at
            .and_then(|reset| (reset - now).to_std().ok())
            .filter(|remaining| !remaining.is_zero())
    }
}

/// Usage for the most recent poll. Never merged with earlier polls.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageSnapshot {
    pub five_hour: Option<UsageWindow>,
    pub seven_day: Option<UsageWindow>,
    /// Seven-day Opus sub-limit.
    pub seven_day_opus: Option<UsageWindow>,
    pub plan: String,
    pub fetched_at: DateTime<Utc>,
}

#[derive(Debug, Deserialize)]
struct RawWindow {
    #[serde(default)]
    utilization: Option<f64>,
    #[serde(default)]
    resets_at: Option<String>,
}

impl RawWindow {
    fn into_window(self) -> UsageWindow {
        let resets_at = self
            .resets_at
            .as_deref()
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|dt| dt.with_timezone(&Utc));
        UsageWindow::new(self.utilization.unwrap_or(0.0), resets_at)
    }
}

#[derive(Debug, Deserialize)]
struct RawUsage {
    #[serde(default)]
    five_hour: Option<RawWindow>,
    #[serde(default)]
    seven_day: Option<RawWindow>,
    #[serde(default)]
    seven_day_opus: Option<RawWindow>,
}

impl UsageSnapshot {
    /// Builds a snapshot from the endpoint's JSON body.
    pub fn from_json(
        value: Value,
        plan: &str,
        fetched_at: DateTime<Utc>,
    ) -> Result<Self, PollError> {
        if !value.is_object() {
            return Err(PollError::unknown("Unexpected usage response"));
        }
        let raw: RawUsage = serde_json::from_value(value)
            .map_err(|e| PollError::unknown(format!("Bad usage response: {}", e)))?;

        Ok(Self {
            five_hour: raw.five_hour.map(RawWindow::into_window),
            seven_day: raw.seven_day.map(RawWindow::into_window),
            seven_day_opus: raw.seven_day_opus.map(RawWindow::into_window),
            plan: plan.to_string(),
            fetched_at,
        })
    }

    pub fn five_hour_percent(&self) -> f64 {
        self.five_hour.as_ref().map_or(0.0, |w| w.utilization)
    }

    pub fn seven_day_percent(&self) -> f64 {
        self.seven_day.as_ref().map_or(0.0, |w| w.utilization)
    }

    /// The higher of the five-hour and seven-day utilization; drives the severity indicator.
    pub fn worst_percent(&self) -> f64 {
        self.five_hour_percent().max(self.seven_day_percent())
    }

    /// The Opus sub-limit, only when it has seen any use.
    pub fn opus_in_use(&self) -> Option<&UsageWindow> {
        self.seven_day_opus
            .as_ref()
            .filter(|window| window.utilization > 0.0)
    }
}
