//! # claude-usage
//!
//! A library for fetching and rendering claude.ai plan usage quotas.
//!
//! This crate provides a small async client for the organization usage
//! endpoint and the formatting used by status-line frontends.
//!
//! ## Features
//!
//! - Session-cookie authenticated fetch with typed errors
//! - Strict validation of the response body (numeric utilization only)
//! - Status text, tooltip, and reset countdown rendering
//!
//! ## Example
//!
//! ```rust,no_run
//! use claude_usage::{format_status_text, UsageClient};
//!
//! # async fn run() -> Result<(), claude_usage::ApiError> {
//! let client = UsageClient::new();
//! let usage = client.fetch_usage("sk-ant-...", "org-uuid").await?;
//! println!("{}", format_status_text(&usage));
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod error;
pub mod format;
pub mod types;

pub use client::{UsageClient, DEFAULT_BASE_URL, USER_AGENT};
pub use error::ApiError;
pub use format::{
    format_loading_text, format_message_text, format_message_tooltip, format_reset_time,
    format_status_text, format_summary, format_tooltip, format_tooltip_at, round_half_up,
};
pub use types::{parse_usage_body, parse_usage_response, UsageData, UsagePeriod};
