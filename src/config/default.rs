//! Default configuration template and file creation utilities.
//!
//! Provides a well-commented TOML template that matches `Config::default()`
//! and functions to write it to the XDG config path.

use std::fs;
use std::path::{Path, PathBuf};

use crate::config::error::ConfigError;
use crate::config::xdg;

// ---------------------------------------------------------------------------
// Default TOML template
// ---------------------------------------------------------------------------

/// A well-commented TOML template with all default values.
///
/// Every value here must match `Config::default()` from `schema.rs`.
/// Sections: `[usage]`, `[display]`, `[daemon]`.
pub const DEFAULT_CONFIG_TEMPLATE: &str = r#"# claude-usage-bar Configuration
#
# This file was auto-generated with default values.
# All values shown below are the built-in defaults.
#
# Location: $XDG_CONFIG_HOME/claude-usage-bar/config.toml

# ==============================================================================
# Usage polling
# ==============================================================================

[usage]

# Interval between background usage refreshes. Also the maximum age of the
# on-disk cache: `cub status` reuses a cached result younger than this.
# Examples: "5m", "2m", "90s"
# Hot-reloadable: Yes (send SIGHUP to the daemon)
refresh_interval = "5m"

# Skip timer-driven refreshes while the host window is unfocused.
# Hosts report focus changes by sending SIGUSR2 to the daemon.
# Hot-reloadable: Yes
refresh_only_when_focused = true

# Base URL of the usage API.
# Hot-reloadable: No (restart required)
api_base_url = "https://claude.ai"

# ==============================================================================
# Display
# ==============================================================================

[display]

# How each status update is written to stdout.
# Options: "plain", "waybar"
#   plain  - One text line per update (tmux status-right, i3blocks)
#   waybar - One JSON object per update with text, tooltip, and class
format = "plain"

# ==============================================================================
# Daemon
# ==============================================================================

[daemon]

# Logging verbosity level. Logs go to stderr. CUB_LOG overrides this value.
# Options: "error", "warn", "info", "debug", "trace"
log_level = "info"
"#;

// ---------------------------------------------------------------------------
// File creation functions
// ---------------------------------------------------------------------------

/// Creates (or force-overwrites) the default config file at the XDG path.
///
/// - If the file exists and `force` is `false`, returns `ConfigError::AlreadyExists`.
/// - If the file exists and `force` is `true`, backs it up to `.toml.backup` first.
/// - Returns the path where the config was written.
pub fn create_default_config(force: bool) -> Result<PathBuf, ConfigError> {
    let path = xdg::config_path();
    create_default_config_at(&path, force)?;
    Ok(path)
}

/// Same as [`create_default_config`] for an explicit path.
pub fn create_default_config_at(path: &Path, force: bool) -> Result<(), ConfigError> {
    if path.exists() {
        if !force {
            return Err(ConfigError::AlreadyExists {
                path: path.to_path_buf(),
            });
        }
        let backup_path = path.with_extension("toml.backup");
        fs::rename(path, &backup_path).map_err(|e| ConfigError::WriteError {
            path: backup_path.clone(),
            source: e,
        })?;
        tracing::info!("Backed up existing config to {}", backup_path.display());
    }

    write_default_config(path)
}

/// Writes the default template to `path`, creating parent dirs and setting 0600 permissions.
fn write_default_config(path: &Path) -> Result<(), ConfigError> {
    let write_error = |source| ConfigError::WriteError {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        xdg::ensure_dir(parent).map_err(write_error)?;
    }

    fs::write(path, DEFAULT_CONFIG_TEMPLATE).map_err(write_error)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600)).map_err(write_error)?;
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
