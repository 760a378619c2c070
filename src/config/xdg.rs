//! Platform-aware path resolution for claude-usage-bar.
//!
//! On **Linux**, follows the XDG Base Directory Specification:
//! - Config: `$XDG_CONFIG_HOME/claude-usage-bar` or `~/.config/claude-usage-bar`
//!
//! On **macOS**, uses Apple conventions with XDG env var overrides:
//! - Config: `$XDG_CONFIG_HOME/claude-usage-bar` or `~/Library/Application Support/claude-usage-bar`
//!
//! The usage cache lives in the shared temp directory instead; see
//! [`crate::cache::CacheStore::default_location`].

use std::fs;
use std::path::{Path, PathBuf};

const APP_NAME: &str = "claude-usage-bar";

/// Returns the configuration directory for claude-usage-bar.
///
/// Resolution order:
/// 1. `$XDG_CONFIG_HOME/claude-usage-bar` (if env var set, any platform)
/// 2. Platform default:
///    - Linux: `~/.config/claude-usage-bar`
///    - macOS: `~/Library/Application Support/claude-usage-bar`
pub fn config_dir() -> PathBuf {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        return PathBuf::from(xdg).join(APP_NAME);
    }
    platform_config_dir().join(APP_NAME)
}

/// Platform-native config base directory (without XDG override).
fn platform_config_dir() -> PathBuf {
    #[cfg(target_os = "macos")]
    {
        // ~/Library/Application Support
        dirs::config_dir().expect("could not determine config directory")
    }
    #[cfg(not(target_os = "macos"))]
    {
        // ~/.config (XDG default on Linux)
        dirs::home_dir()
            .expect("could not determine home directory")
            .join(".config")
    }
}

/// Returns the path to the main configuration file.
///
/// Resolves to `config_dir()/config.toml`.
pub fn config_path() -> PathBuf {
    config_dir().join("config.toml")
}

/// Returns the path to the stored credentials.
///
/// Resolves to `config_dir()/credentials.json`.
pub fn credentials_path() -> PathBuf {
    config_dir().join("credentials.json")
}

/// Creates a directory and all parent directories with mode 0700.
///
/// Equivalent to `mkdir -p` with restricted permissions. An existing
/// directory is left untouched.
pub fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if path.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o700))?;
    }
    Ok(())
}
