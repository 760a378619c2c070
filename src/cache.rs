//! Single-file cache of the last usage fetch.
//!
//! The cache holds one [`CacheEntry`] at a fixed path in the shared temp
//! directory and is overwritten wholesale on every fetch attempt. It is
//! best-effort: a missing or corrupt file reads as a miss, and write or
//! delete failures are logged and swallowed. There is no locking; exactly
//! one long-lived process is expected to own the file, and a one-shot
//! `cub status` racing it simply loses or wins the last write.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use claude_usage::UsageData;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// File name of the cache inside the temp directory.
pub const CACHE_FILE_NAME: &str = "claude-usage-bar-cache.json";

/// Last fetch result plus bookkeeping for error suppression.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CacheEntry {
    /// Last known good usage. On failure this is the previous success, not
    /// whatever the failed call produced.
    pub usage: Option<UsageData>,
    /// Unix epoch milliseconds of the write.
    pub timestamp: i64,
    /// Message of the most recent failure, if the last attempt failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Consecutive failures; reset to 0 by any success.
    #[serde(default, rename = "errorCount")]
    pub error_count: u32,
}

impl CacheEntry {
    /// Entry recorded after a successful fetch.
    pub fn success(usage: UsageData) -> Self {
        Self {
            usage: Some(usage),
            timestamp: now_millis(),
            error: None,
            error_count: 0,
        }
    }

    /// Entry recorded after a failed fetch.
    pub fn failure(last_good: Option<UsageData>, error: String, error_count: u32) -> Self {
        Self {
            usage: last_good,
            timestamp: now_millis(),
            error: Some(error),
            error_count,
        }
    }
}

/// Current wall-clock time as Unix epoch milliseconds.
pub fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Returns `true` if `entry` is strictly younger than `max_age`.
pub fn is_fresh(entry: &CacheEntry, max_age: Duration) -> bool {
    is_fresh_at(entry, max_age, now_millis())
}

/// [`is_fresh`] against an explicit clock reading.
///
/// An entry exactly `max_age` old is stale.
pub fn is_fresh_at(entry: &CacheEntry, max_age: Duration, now_ms: i64) -> bool {
    let max_age_ms = i64::try_from(max_age.as_millis()).unwrap_or(i64::MAX);
    now_ms.saturating_sub(entry.timestamp) < max_age_ms
}

/// Handle to the cache file.
#[derive(Debug, Clone)]
pub struct CacheStore {
    path: PathBuf,
}

impl CacheStore {
    /// Cache at an explicit path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Cache at `$TMPDIR/claude-usage-bar-cache.json`.
    pub fn default_location() -> Self {
        Self::new(std::env::temp_dir().join(CACHE_FILE_NAME))
    }

    /// Path of the cache file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the cached entry; `None` on a missing or unreadable file.
    pub fn read(&self) -> Option<CacheEntry> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => return None,
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "cache read failed");
                return None;
            }
        };

        match serde_json::from_str(&content) {
            Ok(entry) => Some(entry),
            Err(e) => {
                debug!(path = %self.path.display(), error = %e, "ignoring corrupt cache");
                None
            }
        }
    }

    /// Overwrite the cache with `entry`. Failures are swallowed.
    pub fn write(&self, entry: &CacheEntry) {
        let result = serde_json::to_string(entry)
            .map_err(std::io::Error::from)
            .and_then(|json| fs::write(&self.path, json));

        if let Err(e) = result {
            debug!(path = %self.path.display(), error = %e, "cache write failed");
        }
    }

    /// Delete the cache file if present. Failures are swallowed.
    pub fn clear(&self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!(path = %self.path.display(), "cache cleared"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => debug!(path = %self.path.display(), error = %e, "cache clear failed"),
        }
    }
}
