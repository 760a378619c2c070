//! HTTP client for the claude.ai usage API.
//!
//! This module provides [`UsageClient`], which performs the single
//! authenticated GET against the organization usage endpoint. It handles
//! the cookie header, status mapping, and body validation. Retries are the
//! caller's business.

use tracing::debug;

use crate::error::ApiError;
use crate::types::{parse_usage_body, UsageData};

/// Default API host.
pub const DEFAULT_BASE_URL: &str = "https://claude.ai";

/// Fixed `User-Agent` sent with every request.
pub const USER_AGENT: &str = "Claude-Usage-Status-Bar";

/// Async client for the organization usage endpoint.
#[derive(Debug, Clone)]
pub struct UsageClient {
    http: reqwest::Client,
    base_url: String,
}

impl UsageClient {
    /// Creates a client pointed at [`DEFAULT_BASE_URL`].
    pub fn new() -> Self {
        Self::with_base_url(DEFAULT_BASE_URL)
    }

    /// Creates a client pointed at a custom host (proxies, tests).
    ///
    /// A trailing slash on `base_url` is ignored.
    pub fn with_base_url(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    /// Returns the host this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Builds the usage endpoint URL for an organization.
    pub fn usage_url(&self, org_id: &str) -> String {
        format!("{}/api/organizations/{}/usage", self.base_url, org_id)
    }

    /// Fetch usage data for `org_id`, authenticating with `session_key`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError`] if:
    /// - The request fails before a response arrives
    /// - Server returns 401 or 403 (rejected session)
    /// - Server returns any other non-success status
    /// - The body is not JSON or lacks numeric utilization values
    ///
    /// # Security
    ///
    /// The session key is used only for this request and is never logged.
    pub async fn fetch_usage(&self, session_key: &str, org_id: &str) -> Result<UsageData, ApiError> {
        let url = self.usage_url(org_id);
        debug!(url = %url, "requesting usage");

        let response = self
            .http
            .get(&url)
            .header(reqwest::header::COOKIE, format!("sessionKey={}", session_key))
            .header(reqwest::header::USER_AGENT, USER_AGENT)
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        let body = map_response(response).await?;
        parse_usage_body(&body)
    }
}

impl Default for UsageClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Map HTTP response to its body, handling error status codes.
async fn map_response(response: reqwest::Response) -> Result<String, ApiError> {
    let status = response.status();

    if status.is_success() {
        return response
            .text()
            .await
            .map_err(|e| ApiError::Network(e.to_string()));
    }

    match status.as_u16() {
        401 | 403 => Err(ApiError::Unauthorized),
        code => Err(ApiError::Http(code)),
    }
}
