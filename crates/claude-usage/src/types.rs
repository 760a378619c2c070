//! Type definitions for claude.ai usage API responses.
//!
//! This module defines the structures that map to the JSON response
//! from the organization usage endpoint, and the validation applied
//! before a body is accepted.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::ApiError;

/// Usage data returned by the organization usage endpoint.
///
/// Contains utilization data for the two rolling quota windows.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UsageData {
    /// 5-hour rolling window usage.
    pub five_hour: UsagePeriod,

    /// 7-day rolling window usage.
    pub seven_day: UsagePeriod,
}

/// Usage data for a specific time period.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UsagePeriod {
    /// Percentage of quota used (0.0 - 100.0+).
    ///
    /// Values over 100.0 indicate quota exceeded.
    pub utilization: f64,

    /// When this period's quota resets.
    ///
    /// `None` when the API omitted the field or sent something that is not
    /// an RFC 3339 timestamp.
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub resets_at: Option<DateTime<Utc>>,
}

impl UsagePeriod {
    /// Calculate time remaining until this period resets, relative to `now`.
    ///
    /// Returns `None` if reset time is not available.
    /// Returns a negative duration if the reset time has passed.
    pub fn time_until_reset(&self, now: DateTime<Utc>) -> Option<chrono::TimeDelta> {
        self.resets_at.map(|reset| reset - now)
    }
}

/// Accepts any JSON value for `resets_at`; only RFC 3339 strings survive.
fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(value
        .as_ref()
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc)))
}

/// Validate and convert a decoded JSON body into [`UsageData`].
///
/// Both `five_hour.utilization` and `seven_day.utilization` must be present
/// and must be JSON numbers. Numeric-looking strings are rejected; nothing
/// is coerced.
///
/// # Errors
///
/// Returns [`ApiError::InvalidFormat`] for any other shape.
pub fn parse_usage_response(value: &Value) -> Result<UsageData, ApiError> {
    let has_numeric_utilization = |window: &str| {
        value
            .get(window)
            .and_then(|period| period.get("utilization"))
            .is_some_and(Value::is_number)
    };

    if !has_numeric_utilization("five_hour") || !has_numeric_utilization("seven_day") {
        return Err(ApiError::InvalidFormat);
    }

    UsageData::deserialize(value).map_err(|_| ApiError::InvalidFormat)
}

/// Decode a raw response body and validate it with [`parse_usage_response`].
pub fn parse_usage_body(body: &str) -> Result<UsageData, ApiError> {
    let value: Value = serde_json::from_str(body).map_err(|_| ApiError::InvalidFormat)?;
    parse_usage_response(&value)
}
