//! TOML configuration schema types for claude-usage-bar.
//!
//! All structs derive `Deserialize` and `Serialize` with sensible defaults via
//! `#[serde(default)]`. Fields are annotated with hot-reload behavior in doc comments.
//!
//! Duration fields use human-readable strings (e.g. `"5m"`, `"90s"`) parsed
//! by the `humantime` crate.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::error::ConfigError;

/// Refresh interval used when the configured one is missing or unusable.
pub const DEFAULT_REFRESH_INTERVAL: Duration = Duration::from_secs(5 * 60);

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root configuration encompassing all sections.
///
/// Corresponds to the full TOML file structure:
/// ```toml
/// [usage]
/// [display]
/// [daemon]
/// ```
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Polling and API settings.
    pub usage: UsageConfig,
    /// Output rendering settings.
    pub display: DisplayConfig,
    /// Daemon process settings.
    pub daemon: DaemonSection,
}

// ---------------------------------------------------------------------------
// Usage
// ---------------------------------------------------------------------------

/// Polling configuration from the `[usage]` section.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct UsageConfig {
    /// Period of the background refresh timer, also the maximum cache age.
    /// Hot-reloadable: Yes (SIGHUP restarts the timer).
    pub refresh_interval: String,
    /// Skip timer-driven refreshes while the host reports it is unfocused.
    /// Hot-reloadable: Yes.
    pub refresh_only_when_focused: bool,
    /// API host. Hot-reloadable: No (restart required).
    pub api_base_url: String,
}

impl Default for UsageConfig {
    fn default() -> Self {
        Self {
            refresh_interval: "5m".to_string(),
            refresh_only_when_focused: true,
            api_base_url: claude_usage::DEFAULT_BASE_URL.to_string(),
        }
    }
}

impl UsageConfig {
    /// Parse `refresh_interval` with `humantime`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidDuration`] for unparseable or zero values.
    pub fn try_refresh_interval(&self) -> Result<Duration, ConfigError> {
        let invalid = |message: String| ConfigError::InvalidDuration {
            key: "usage.refresh_interval",
            value: self.refresh_interval.clone(),
            message,
        };
        let interval = humantime::parse_duration(&self.refresh_interval)
            .map_err(|e| invalid(e.to_string()))?;
        if interval.is_zero() {
            return Err(invalid("must be greater than zero".to_string()));
        }
        Ok(interval)
    }

    /// Parsed refresh interval, falling back to [`DEFAULT_REFRESH_INTERVAL`].
    pub fn refresh_interval(&self) -> Duration {
        self.try_refresh_interval().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "using default refresh interval");
            DEFAULT_REFRESH_INTERVAL
        })
    }
}

// ---------------------------------------------------------------------------
// Display
// ---------------------------------------------------------------------------

/// Output configuration from the `[display]` section.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DisplayConfig {
    /// How each status update is written to stdout.
    /// Hot-reloadable: No (restart required).
    pub format: OutputFormat,
}

/// Status line encoding (kebab-case in TOML).
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum OutputFormat {
    /// One plain text line per update (tmux, i3blocks).
    #[default]
    Plain,
    /// One JSON object per update with `text`, `tooltip`, `class` (waybar).
    Waybar,
}

// ---------------------------------------------------------------------------
// Daemon
// ---------------------------------------------------------------------------

/// Daemon process configuration from the TOML `[daemon]` section.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DaemonSection {
    /// Logging verbosity. Overridden by `CUB_LOG`.
    /// Hot-reloadable: No (restart required).
    pub log_level: LogLevel,
}

/// Log verbosity levels (kebab-case in TOML).
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LogLevel {
    /// Only errors.
    Error,
    /// Errors and warnings.
    Warn,
    /// Informational messages (default).
    #[default]
    Info,
    /// Debug-level detail.
    Debug,
    /// Full trace output.
    Trace,
}

impl LogLevel {
    /// Filter directive understood by `tracing_subscriber::EnvFilter`.
    pub fn as_directive(self) -> &'static str {
        match self {
            LogLevel::Error => "error",
            LogLevel::Warn => "warn",
            LogLevel::Info => "info",
            LogLevel::Debug => "debug",
            LogLevel::Trace => "trace",
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
