//! Text rendering shared by the terminal monitor, `status` and `watch`.

use crate::error::PollError;
use crate::usage::{UsageSnapshot, UsageWindow};
use chrono::{DateTime, Local, Utc};
use std::time::Duration;

pub const BAR_WIDTH: usize = 22;
pub const RED_THRESHOLD: f64 = 80.0;
pub const YELLOW_THRESHOLD: f64 = 50.0;

/// Title shown whenever the last poll failed.
pub const ERROR_TITLE: &str = "CC ⚠️";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Green,
    Yellow,
    Red,
}

impl Severity {
    pub fn from_percent(percent: f64) -> Self {
        if percent >= RED_THRESHOLD {
            Self::Red
        } else if percent >= YELLOW_THRESHOLD {
            Self::Yellow
        } else {
            Self::Green
        }
    }

    pub fn dot(self) -> &'static str {
        match self {
            Self::Green => "🟢",
            Self::Yellow => "🟡",
            Self::Red => "🔴",
        }
    }
}

/// Fixed-width progress bar.
pub fn bar(percent: f64) -> String {
    let filled = filled_cells(percent);
    format!("{}{}", "█".repeat(filled), "░".repeat(BAR_WIDTH - filled))
}

fn filled_cells(percent: f64) -> usize {
    let ratio = if percent.is_finite() {
        percent.clamp(0.0, 100.0) / 100.0
    } else {
        0.0
    };
    // BAR_WIDTH is tiny, so the cast cannot truncate.
    ((ratio * BAR_WIDTH as f64).round() as usize).min(BAR_WIDTH)
}

/// Compact title: worst-case dot plus both percentages, e.g. `🔴 87│42%`.
pub fn title(snapshot: &UsageSnapshot) -> String {
    let dot = Severity::from_percent(snapshot.worst_percent()).dot();
    format!(
        "{} {:.0}│{:.0}%",
        dot,
        snapshot.five_hour_percent(),
        snapshot.seven_day_percent()
    )
}

pub fn title_for(result: &Result<UsageSnapshot, PollError>) -> String {
    match result {
        Ok(snapshot) => title(snapshot),
        Err(_) => ERROR_TITLE.to_string(),
    }
}

/// Countdown text such as `2h 14m`, `45m` or `3d 4h`.
///
/// Minutes are not zero-padded.
pub fn format_countdown(remaining: Duration) -> String {
    let total_minutes = remaining.as_secs() / 60;
    let days = total_minutes / (24 * 60);
    let hours = (total_minutes % (24 * 60)) / 60;
    let minutes = total_minutes % 60;

    if days > 0 {
        format!("{}d {}h", days, hours)
    } else if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    }
}

/// Time until the window resets, `reset!` once passed, `None` if unknown.
pub fn time_until(window: &UsageWindow, now: DateTime<Utc>) -> Option<String> {
    let reset = window.resets_at?;
    match window.time_until_reset(now) {
        Some(remaining) => Some(format_countdown(remaining)),
        None if reset <= now => Some("reset!".to_string()),
        None => None,
    }
}

/// Reset time on the local clock, e.g. `03:15 PM`.
pub fn local_time(window: &UsageWindow) -> Option<String> {
    window
        .resets_at
        .map(|reset| reset.with_timezone(&Local).format("%I:%M %p").to_string())
}

/// One usage window prepared for display.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowView {
    pub heading: &'static str,
    pub percent: f64,
    pub bar: String,
    pub detail: Option<String>,
}

impl WindowView {
    pub fn severity(&self) -> Severity {
        Severity::from_percent(self.percent)
    }

    /// `██████░░░  87.0%`
    pub fn bar_line(&self) -> String {
        format!("{}  {:.1}%", self.bar, self.percent)
    }
}

fn reset_detail(window: &UsageWindow, now: DateTime<Utc>) -> Option<String> {
    let remaining = time_until(window, now)?;
    Some(match local_time(window) {
        Some(clock) => format!("Resets in {}  ({})", remaining, clock),
        None => format!("Resets in {}", remaining),
    })
}

/// Windows to show for `snapshot`. Opus appears only once it has seen use.
pub fn window_views(snapshot: &UsageSnapshot, now: DateTime<Utc>) -> Vec<WindowView> {
    let mut views = Vec::with_capacity(3);

    views.push(match &snapshot.five_hour {
        Some(window) => WindowView {
            heading: "5-Hour Session",
            percent: window.utilization,
            bar: bar(window.utilization),
            detail: Some(
                reset_detail(window, now).unwrap_or_else(|| "Window inactive".to_string()),
            ),
        },
        None => WindowView {
            heading: "5-Hour Session",
            percent: 0.0,
            bar: bar(0.0),
            detail: Some("No active window".to_string()),
        },
    });

    let seven_day = snapshot.seven_day.as_ref();
    let seven_day_percent = seven_day.map_or(0.0, |w| w.utilization);
    views.push(WindowView {
        heading: "7-Day Window",
        percent: seven_day_percent,
        bar: bar(seven_day_percent),
        detail: seven_day.and_then(|w| reset_detail(w, now)),
    });

    if let Some(opus) = snapshot.opus_in_use() {
        views.push(WindowView {
            heading: "7-Day Opus",
            percent: opus.utilization,
            bar: bar(opus.utilization),
            detail: reset_detail(opus, now),
        });
    }
    views
}

/// Plan and profile footer, e.g. `Plan: MAX  •  Work`.
pub fn plan_line(plan: &str, profile_label: &str) -> String {
    format!("Plan: {}  •  {}", plan.to_uppercase(), profile_label)
}

/// Renders one poll as a status-bar plugin document: a title line, `---`,
/// then the dropdown lines.
pub fn status_document(
    result: &Result<UsageSnapshot, PollError>,
    profile_label: &str,
    refresh_seconds: u64,
    now: DateTime<Utc>,
) -> String {
    let mut lines = vec![title_for(result), "---".to_string()];
    let clock = now.with_timezone(&Local).format("%I:%M:%S %p");

    match result {
        Ok(snapshot) => {
            for view in window_views(snapshot, now) {
                lines.push(view.heading.to_string());
                lines.push(format!("{} {}", view.severity().dot(), view.bar_line()));
                if let Some(detail) = view.detail {
                    lines.push(format!("⏱ {}", detail));
                }
                lines.push("---".to_string());
            }
            lines.push(plan_line(&snapshot.plan, profile_label));
            lines.push(format!(
                "Last refresh: {}  (every {}s)",
                clock, refresh_seconds
            ));
        }
        Err(error) => {
            lines.push(format!("⚠️ {}", error));
            if let Some(hint) = error.hint() {
                lines.push(hint.to_string());
            }
            lines.push("---".to_string());
            lines.push(format!("{}  •  {}", clock, profile_label));
        }
    }
    lines.join("\n")
}

#[cfg(test)]
#[path = "tests/display_tests.rs"]
mod tests;
