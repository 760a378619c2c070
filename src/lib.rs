//! claude-usage-bar library
//!
//! Shows claude.ai plan usage (5-hour and 7-day utilization) in a status
//! bar. The [`daemon::Refresher`] fetches usage through
//! [`claude_usage::UsageClient`], keeps the last result in a temp-dir
//! [`cache`], and hides transient failures behind the last good value until
//! they persist for [`daemon::ERROR_THRESHOLD`] attempts in a row.
//!
//! # Platform Support
//!
//! Unix-like systems only (Linux, macOS). The daemon is controlled with
//! Unix signals (SIGUSR1, SIGUSR2, SIGHUP, SIGTERM).

pub mod cache;
pub mod config;
pub mod credentials;
pub mod daemon;
pub mod display;

pub use cache::{CacheEntry, CacheStore};
pub use credentials::{Credentials, FileSecretStore, MemorySecretStore, SecretStore};
pub use daemon::{RefreshOutcome, Refresher, UsageSource, ERROR_THRESHOLD};
pub use display::{ClickAction, LineSink, StatusSink, StatusView};
