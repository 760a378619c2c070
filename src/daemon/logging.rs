//! Logging initialization for `cub`.
//!
//! Configures the `tracing` subscriber with level filtering via the `CUB_LOG`
//! environment variable. Falls back to the configured `daemon.log_level`
//! when the variable is unset or invalid.
//!
//! # Usage
//!
//! ```bash
//! # Configured level (info by default)
//! cub daemon
//!
//! # Debug level
//! CUB_LOG=debug cub daemon
//!
//! # Module-specific filtering
//! CUB_LOG=claude_usage=debug,warn cub daemon
//! ```

use tracing_subscriber::{fmt, EnvFilter};

use crate::config::schema::LogLevel;

/// Environment variable holding filter directives.
pub const LOG_ENV_VAR: &str = "CUB_LOG";

/// Build the filter: `CUB_LOG` if it parses, otherwise `default_level`.
pub fn build_filter(default_level: LogLevel) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(default_level.as_directive()))
}

/// Initialize the tracing subscriber.
///
/// Output goes to stderr; stdout is reserved for status lines. Calling
/// this more than once is a no-op.
pub fn init(default_level: LogLevel) {
    let _ = fmt()
        .with_env_filter(build_filter(default_level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}
