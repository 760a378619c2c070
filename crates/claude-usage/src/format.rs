//! Status line and tooltip rendering for usage data.
//!
//! # Display Formats
//!
//! - **Status**: `◔ Claude: 8% / 77%`
//! - **Loading**: `↻ Claude: 8% / 77%`, or `↻ Claude` with nothing to show yet
//! - **Message**: `◔ Claude: Auth failed`
//!
//! The tooltip lists both windows with their reset countdown:
//!
//! ```text
//! 5-hour: 8% (resets: 2026-01-22 10:00:00 - 1h 59m)
//! 7-day: 77% (resets: 2026-01-25 01:00:00 - 65h 0m)
//! Click to refresh
//! ```

use chrono::{DateTime, Local, Utc};

use crate::types::UsageData;

/// Icon prefixed to every settled status line.
pub const ICON: &str = "◔";

/// Icon shown while a fetch is in flight.
pub const LOADING_ICON: &str = "↻";

/// Trailing call-to-action line of the tooltip.
pub const CALL_TO_ACTION: &str = "Click to refresh";

/// Round to the nearest integer, with exact halves going up (`2.5 -> 3`,
/// `-2.5 -> -2`).
pub fn round_half_up(value: f64) -> i64 {
    let floor = value.floor();
    if value - floor >= 0.5 {
        floor as i64 + 1
    } else {
        floor as i64
    }
}

/// Render `Claude: {5h}% / {7d}%` without the icon.
pub fn format_summary(usage: &UsageData) -> String {
    format!(
        "Claude: {}% / {}%",
        round_half_up(usage.five_hour.utilization),
        round_half_up(usage.seven_day.utilization)
    )
}

/// Render the settled status line.
pub fn format_status_text(usage: &UsageData) -> String {
    format!("{} {}", ICON, format_summary(usage))
}

/// Render the in-flight indicator, reusing the last known percentages.
pub fn format_loading_text(last_known: Option<&UsageData>) -> String {
    match last_known {
        Some(usage) => format!("{} {}", LOADING_ICON, format_summary(usage)),
        None => format!("{} Claude", LOADING_ICON),
    }
}

/// Render a message (error, missing credentials) in place of percentages.
pub fn format_message_text(message: &str) -> String {
    let message = if message.is_empty() { "N/A" } else { message };
    format!("{} Claude: {}", ICON, message)
}

/// Tooltip paired with [`format_message_text`].
pub fn format_message_tooltip(message: &str) -> String {
    if message.is_empty() {
        CALL_TO_ACTION.to_string()
    } else {
        message.to_string()
    }
}

/// Render a reset time as `{local timestamp} - {H}h {M}m`.
///
/// Hours are omitted when zero. Minutes are floored, so 59 seconds left
/// renders as `0m`. A reset at or before `now` renders as `now`; an unknown
/// reset renders as `unknown`.
pub fn format_reset_time(resets_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> String {
    let Some(reset) = resets_at else {
        return "unknown".to_string();
    };

    let diff = reset - now;
    if diff <= chrono::TimeDelta::zero() {
        return "now".to_string();
    }

    let total_minutes = diff.num_minutes();
    let hours = total_minutes / 60;
    let minutes = total_minutes % 60;

    let local_time = reset.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S");
    let remaining = if hours > 0 {
        format!("{}h {}m", hours, minutes)
    } else {
        format!("{}m", minutes)
    };

    format!("{} - {}", local_time, remaining)
}

/// Render the multi-line tooltip relative to the current time.
pub fn format_tooltip(usage: &UsageData) -> String {
    format_tooltip_at(usage, Utc::now())
}

/// Render the multi-line tooltip relative to `now`.
pub fn format_tooltip_at(usage: &UsageData, now: DateTime<Utc>) -> String {
    format!(
        "5-hour: {}% (resets: {})\n7-day: {}% (resets: {})\n{}",
        round_half_up(usage.five_hour.utilization),
        format_reset_time(usage.five_hour.resets_at, now),
        round_half_up(usage.seven_day.utilization),
        format_reset_time(usage.seven_day.resets_at, now),
        CALL_TO_ACTION
    )
}
