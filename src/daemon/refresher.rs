//! Refresh orchestration for the status item.
//!
//! [`Refresher`] ties together the usage source, the on-disk cache, the
//! secret store and the display sink. Every timer tick, signal or one-shot
//! command ends up in [`Refresher::refresh`], which decides whether to serve
//! the cache, fetch, or show a message.
//!
//! # Error suppression
//!
//! Transient failures do not replace the usage display right away. The
//! cache records how many fetches in a row have failed; while that count is
//! below [`ERROR_THRESHOLD`] and a last-known-good usage exists, the usage
//! stays on screen. The third consecutive failure surfaces the error.
//!
//! # Re-entrancy
//!
//! Only one refresh runs at a time. A refresh requested while another is in
//! flight returns [`RefreshOutcome::Skipped`] without touching the network,
//! the cache, or the display.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use claude_usage::{ApiError, UsageClient, UsageData};
use tracing::{debug, info, warn};

use crate::cache::{self, CacheEntry, CacheStore};
use crate::credentials::{load_credentials, MissingCredentials, SecretStore};
use crate::display::{ClickAction, StatusSink, StatusView};

/// Consecutive failures before the error replaces the usage display.
pub const ERROR_THRESHOLD: u32 = 3;

/// Anything that can fetch usage for a credential pair.
#[async_trait]
pub trait UsageSource {
    /// Fetch the current usage for `org_id`.
    async fn fetch_usage(&self, session_key: &str, org_id: &str) -> Result<UsageData, ApiError>;
}

#[async_trait]
impl UsageSource for UsageClient {
    async fn fetch_usage(&self, session_key: &str, org_id: &str) -> Result<UsageData, ApiError> {
        UsageClient::fetch_usage(self, session_key, org_id).await
    }
}

/// What a call to [`Refresher::refresh`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Another refresh was already in flight; nothing happened.
    Skipped,
    /// Credentials are incomplete; the setup prompt is shown.
    MissingCredentials(MissingCredentials),
    /// A fresh cache entry was displayed without a network call.
    ServedFromCache,
    /// A fetch succeeded.
    Fetched,
    /// A fetch failed.
    Failed {
        /// Consecutive failures including this one.
        error_count: u32,
        /// Whether the error was hidden behind the last-known-good usage.
        suppressed: bool,
    },
}

/// Holds the in-flight flag for the duration of one refresh.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn claim(flag: &'a AtomicBool) -> Option<Self> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self(flag))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Drives fetches, caching and display for one status item.
pub struct Refresher<C, S, K> {
    source: C,
    sink: S,
    secrets: K,
    cache: CacheStore,
    /// Cache entries younger than this are served without fetching.
    max_age: Duration,
    /// Last usage obtained from a successful fetch or restored at startup.
    last_successful: Mutex<Option<UsageData>>,
    /// Click target of the status item.
    action: Mutex<ClickAction>,
    in_flight: AtomicBool,
}

impl<C, S, K> Refresher<C, S, K>
where
    C: UsageSource,
    S: StatusSink,
    K: SecretStore,
{
    /// Creates a refresher with nothing displayed yet.
    pub fn new(source: C, sink: S, secrets: K, cache: CacheStore, max_age: Duration) -> Self {
        Self {
            source,
            sink,
            secrets,
            cache,
            max_age,
            last_successful: Mutex::new(None),
            action: Mutex::new(ClickAction::Refresh),
            in_flight: AtomicBool::new(false),
        }
    }

    /// Seed the last-known-good usage from the cache and display it.
    ///
    /// The entry's age is ignored. Returns `true` if the cache held a usage.
    pub fn restore_from_cache(&self) -> bool {
        let Some(usage) = self.cache.read().and_then(|entry| entry.usage) else {
            return false;
        };
        debug!("restored last usage from cache");
        self.display_usage(&usage);
        *self.lock_last_successful() = Some(usage);
        true
    }

    /// Refresh the display, fetching unless a fresh cache entry exists.
    ///
    /// `force` bypasses the cache freshness check.
    pub async fn refresh(&self, force: bool) -> RefreshOutcome {
        let Some(_in_flight) = InFlight::claim(&self.in_flight) else {
            debug!("refresh already in flight, skipping");
            return RefreshOutcome::Skipped;
        };

        let credentials = match load_credentials(&self.secrets) {
            Ok(credentials) => credentials,
            Err(missing) => {
                info!(missing = missing.label(), "credentials incomplete");
                self.set_action(ClickAction::SetupCredentials);
                self.display_message(&missing.to_string());
                return RefreshOutcome::MissingCredentials(missing);
            }
        };
        self.set_action(ClickAction::Refresh);

        let cached = self.cache.read();
        if !force {
            if let Some(entry) = cached.as_ref().filter(|e| cache::is_fresh(e, self.max_age)) {
                debug!(error_count = entry.error_count, "serving usage from cache");
                match (&entry.error, &entry.usage) {
                    (Some(error), _) if entry.error_count >= ERROR_THRESHOLD => {
                        self.display_message(error)
                    }
                    (_, Some(usage)) => self.display_usage(usage),
                    // Nothing good to fall back on.
                    (Some(error), None) => self.display_message(error),
                    (None, None) => {}
                }
                return RefreshOutcome::ServedFromCache;
            }
        }

        let last_known = self.last_successful_usage();
        self.sink
            .show(&StatusView::loading(last_known.as_ref(), self.action()));

        match self
            .source
            .fetch_usage(&credentials.session_key, &credentials.org_id)
            .await
        {
            Ok(usage) => {
                debug!(
                    five_hour = usage.five_hour.utilization,
                    seven_day = usage.seven_day.utilization,
                    "usage fetched"
                );
                *self.lock_last_successful() = Some(usage.clone());
                self.cache.write(&CacheEntry::success(usage.clone()));
                self.display_usage(&usage);
                RefreshOutcome::Fetched
            }
            Err(e) => {
                let message = e.to_string();
                let error_count = cached
                    .map_or(0, |entry| entry.error_count)
                    .saturating_add(1);
                warn!(error = %message, error_count, "usage fetch failed");

                let last_known = self.last_successful_usage();
                self.cache.write(&CacheEntry::failure(
                    last_known.clone(),
                    message.clone(),
                    error_count,
                ));

                let suppressed = match last_known {
                    Some(usage) if error_count < ERROR_THRESHOLD => {
                        self.display_usage(&usage);
                        true
                    }
                    _ => {
                        self.display_message(&message);
                        false
                    }
                };
                RefreshOutcome::Failed {
                    error_count,
                    suppressed,
                }
            }
        }
    }

    /// User-driven refresh: drop the cache and fetch.
    pub async fn force_refresh(&self) -> RefreshOutcome {
        self.cache.clear();
        self.refresh(true).await
    }

    /// Replace the display with `message`.
    pub fn show_message(&self, message: &str) {
        self.display_message(message);
    }

    /// The usage shown when fetches fail, if any.
    pub fn last_successful_usage(&self) -> Option<UsageData> {
        self.lock_last_successful().clone()
    }

    /// Current click target.
    pub fn action(&self) -> ClickAction {
        *self.action.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// The usage source.
    pub fn source(&self) -> &C {
        &self.source
    }

    /// The display sink.
    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// The cache backing this refresher.
    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    /// Maximum age of a cache entry served without fetching.
    pub fn max_age(&self) -> Duration {
        self.max_age
    }

    /// Change the maximum cache age, e.g. after a config reload.
    pub fn set_max_age(&mut self, max_age: Duration) {
        self.max_age = max_age;
    }

    fn set_action(&self, action: ClickAction) {
        *self.action.lock().unwrap_or_else(|e| e.into_inner()) = action;
    }

    fn lock_last_successful(&self) -> std::sync::MutexGuard<'_, Option<UsageData>> {
        self.last_successful
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    fn display_usage(&self, usage: &UsageData) {
        self.sink.show(&StatusView::usage(usage, self.action()));
    }

    fn display_message(&self, message: &str) {
        self.sink.show(&StatusView::message(message, self.action()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::{MemorySecretStore, SECRET_KEY_ORG_ID, SECRET_KEY_SESSION};
    use crate::display::{LatestView, ViewKind};
    use claude_usage::UsagePeriod;
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;
    use tempfile::TempDir;

    const MAX_AGE: Duration = Duration::from_secs(300);

    fn usage(five_hour: f64, seven_day: f64) -> UsageData {
        UsageData {
            five_hour: UsagePeriod {
                utilization: five_hour,
                resets_at: None,
            },
            seven_day: UsagePeriod {
                utilization: seven_day,
                resets_at: None,
            },
        }
    }

    /// Replays queued results and counts calls.
    #[derive(Default)]
    struct ScriptedSource {
        results: Mutex<VecDeque<Result<UsageData, ApiError>>>,
        calls: AtomicUsize,
    }

    impl ScriptedSource {
        fn new(results: Vec<Result<UsageData, ApiError>>) -> Self {
            Self {
                results: Mutex::new(results.into()),
                calls: AtomicUsize::new(0),
            }
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl UsageSource for ScriptedSource {
        async fn fetch_usage(&self, _: &str, _: &str) -> Result<UsageData, ApiError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.results
                .lock()
                .expect("results lock")
                .pop_front()
                .unwrap_or(Err(ApiError::Network("no scripted result".to_string())))
        }
    }

    #[derive(Default)]
    struct RecordingSink {
        views: Mutex<Vec<StatusView>>,
    }

    impl RecordingSink {
        fn views(&self) -> Vec<StatusView> {
            self.views.lock().expect("views lock").clone()
        }

        fn last(&self) -> StatusView {
            self.views().pop().expect("at least one view")
        }
    }

    impl StatusSink for RecordingSink {
        fn show(&self, view: &StatusView) {
            self.views.lock().expect("views lock").push(view.clone());
        }
    }

    type TestRefresher = Refresher<ScriptedSource, RecordingSink, MemorySecretStore>;

    fn refresher(dir: &TempDir, results: Vec<Result<UsageData, ApiError>>) -> TestRefresher {
        Refresher::new(
            ScriptedSource::new(results),
            RecordingSink::default(),
            MemorySecretStore::with_credentials("sk-ant-test", "org-123"),
            CacheStore::new(dir.path().join("cache.json")),
            MAX_AGE,
        )
    }

    #[tokio::test]
    async fn test_success_displays_usage_and_writes_cache() {
        let dir = TempDir::new().expect("temp dir");
        let r = refresher(&dir, vec![Ok(usage(10.0, 50.0))]);

        assert_eq!(r.refresh(true).await, RefreshOutcome::Fetched);

        let views = r.sink().views();
        assert_eq!(views.len(), 2);
        assert_eq!(views[0].kind, ViewKind::Loading);
        assert!(views[1].text.ends_with("Claude: 10% / 50%"));

        let entry = r.cache().read().expect("cache written");
        assert_eq!(entry.usage, Some(usage(10.0, 50.0)));
        assert_eq!(entry.error_count, 0);
        assert_eq!(r.last_successful_usage(), Some(usage(10.0, 50.0)));
    }

    #[tokio::test]
    async fn test_failure_without_prior_usage_shows_error() {
        let dir = TempDir::new().expect("temp dir");
        let r = refresher(&dir, vec![Err(ApiError::Http(500))]);

        let outcome = r.refresh(true).await;
        assert_eq!(
            outcome,
            RefreshOutcome::Failed {
                error_count: 1,
                suppressed: false
            }
        );
        assert!(r.sink().last().text.ends_with("Claude: HTTP 500"));

        let entry = r.cache().read().expect("cache written");
        assert_eq!(entry.error.as_deref(), Some("HTTP 500"));
        assert!(entry.usage.is_none());
    }

    #[tokio::test]
    async fn test_failures_are_suppressed_until_threshold() {
        let dir = TempDir::new().expect("temp dir");
        let r = refresher(
            &dir,
            vec![
                Ok(usage(10.0, 50.0)),
                Err(ApiError::Unauthorized),
                Err(ApiError::Unauthorized),
                Err(ApiError::Unauthorized),
            ],
        );
        r.refresh(true).await;

        for expected in 1..ERROR_THRESHOLD {
            assert_eq!(
                r.refresh(true).await,
                RefreshOutcome::Failed {
                    error_count: expected,
                    suppressed: true
                }
            );
            assert!(r.sink().last().text.ends_with("Claude: 10% / 50%"));
        }

        assert_eq!(
            r.refresh(true).await,
            RefreshOutcome::Failed {
                error_count: ERROR_THRESHOLD,
                suppressed: false
            }
        );
        assert!(r.sink().last().text.ends_with("Claude: Auth failed"));

        let entry = r.cache().read().expect("cache written");
        assert_eq!(entry.error_count, ERROR_THRESHOLD);
        assert_eq!(entry.usage, Some(usage(10.0, 50.0)));
    }

    #[tokio::test]
    async fn test_error_count_saturates_at_max() {
        let dir = TempDir::new().expect("temp dir");
        let r = refresher(&dir, vec![Err(ApiError::Http(500))]);
        r.cache().write(&CacheEntry::failure(
            None,
            "HTTP 500".to_string(),
            u32::MAX,
        ));

        assert_eq!(
            r.refresh(true).await,
            RefreshOutcome::Failed {
                error_count: u32::MAX,
                suppressed: false
            }
        );
        assert!(r.sink().last().text.ends_with("Claude: HTTP 500"));
        assert_eq!(r.cache().read().map(|e| e.error_count), Some(u32::MAX));
    }

    #[tokio::test]
    async fn test_missing_credentials_routes_to_setup() {
        let dir = TempDir::new().expect("temp dir");
        let r = Refresher::new(
            ScriptedSource::default(),
            RecordingSink::default(),
            MemorySecretStore::new(),
            CacheStore::new(dir.path().join("cache.json")),
            MAX_AGE,
        );

        assert_eq!(
            r.refresh(true).await,
            RefreshOutcome::MissingCredentials(MissingCredentials::Both)
        );
        let view = r.sink().last();
        assert!(view.text.ends_with("Claude: Missing credentials"));
        assert_eq!(view.action, ClickAction::SetupCredentials);
        assert_eq!(r.action(), ClickAction::SetupCredentials);
        assert_eq!(r.source.calls(), 0);
    }

    #[tokio::test]
    async fn test_partial_credentials_name_missing_part() {
        let dir = TempDir::new().expect("temp dir");
        let secrets = MemorySecretStore::new();
        secrets
            .store(SECRET_KEY_SESSION, "sk-ant-test")
            .expect("store session key");
        let r = Refresher::new(
            ScriptedSource::default(),
            RecordingSink::default(),
            secrets,
            CacheStore::new(dir.path().join("cache.json")),
            MAX_AGE,
        );
        r.refresh(false).await;
        assert!(r.sink().last().text.ends_with("Claude: Missing org ID"));

        r.secrets.delete(SECRET_KEY_SESSION).expect("delete");
        r.secrets.store(SECRET_KEY_ORG_ID, "org-123").expect("store");
        r.refresh(false).await;
        assert!(r.sink().last().text.ends_with("Claude: Missing session key"));
    }

    #[tokio::test]
    async fn test_credentials_restored_switch_action_back() {
        let dir = TempDir::new().expect("temp dir");
        let r = Refresher::new(
            ScriptedSource::new(vec![Ok(usage(1.0, 2.0))]),
            RecordingSink::default(),
            MemorySecretStore::new(),
            CacheStore::new(dir.path().join("cache.json")),
            MAX_AGE,
        );
        r.refresh(true).await;
        assert_eq!(r.action(), ClickAction::SetupCredentials);

        r.secrets.store(SECRET_KEY_SESSION, "sk").expect("store");
        r.secrets.store(SECRET_KEY_ORG_ID, "org").expect("store");
        assert_eq!(r.refresh(true).await, RefreshOutcome::Fetched);
        assert_eq!(r.sink().last().action, ClickAction::Refresh);
    }

    #[tokio::test]
    async fn test_fresh_cache_skips_fetch() {
        let dir = TempDir::new().expect("temp dir");
        let r = refresher(&dir, vec![]);
        r.cache().write(&CacheEntry::success(usage(20.0, 30.0)));

        assert_eq!(r.refresh(false).await, RefreshOutcome::ServedFromCache);
        assert_eq!(r.source.calls(), 0);
        assert!(r.sink().last().text.ends_with("Claude: 20% / 30%"));
        assert!(r.last_successful_usage().is_none());
    }

    #[tokio::test]
    async fn test_fresh_cache_with_persistent_error_shows_error() {
        let dir = TempDir::new().expect("temp dir");
        let r = refresher(&dir, vec![]);
        r.cache().write(&CacheEntry::failure(
            Some(usage(20.0, 30.0)),
            "HTTP 502".to_string(),
            ERROR_THRESHOLD,
        ));

        assert_eq!(r.refresh(false).await, RefreshOutcome::ServedFromCache);
        assert!(r.sink().last().text.ends_with("Claude: HTTP 502"));
    }

    #[tokio::test]
    async fn test_fresh_cache_with_transient_error_shows_usage() {
        let dir = TempDir::new().expect("temp dir");
        let r = refresher(&dir, vec![]);
        r.cache().write(&CacheEntry::failure(
            Some(usage(20.0, 30.0)),
            "HTTP 502".to_string(),
            1,
        ));

        r.refresh(false).await;
        assert!(r.sink().last().text.ends_with("Claude: 20% / 30%"));
    }

    #[tokio::test]
    async fn test_one_shot_fresh_error_without_usage_shows_error() {
        let dir = TempDir::new().expect("temp dir");
        let cache = || CacheStore::new(dir.path().join("cache.json"));
        let one_shot = |results| {
            let r = Refresher::new(
                ScriptedSource::new(results),
                LatestView::new(),
                MemorySecretStore::with_credentials("sk-ant-test", "org-123"),
                cache(),
                MAX_AGE,
            );
            r.restore_from_cache();
            r
        };

        let first = one_shot(vec![Err(ApiError::Http(500))]);
        first.refresh(false).await;
        let shown = first.sink().get().expect("first run shows a view");
        assert!(shown.text.ends_with("Claude: HTTP 500"));

        // Second run within the cache window: one failure, no usage ever.
        let second = one_shot(vec![]);
        assert_eq!(second.refresh(false).await, RefreshOutcome::ServedFromCache);
        assert_eq!(second.source.calls(), 0);
        let shown = second.sink().get().expect("cached error is shown");
        assert!(shown.text.ends_with("Claude: HTTP 500"));
        assert_eq!(shown.kind, ViewKind::Message);
    }

    #[tokio::test]
    async fn test_stale_cache_fetches() {
        let dir = TempDir::new().expect("temp dir");
        let r = refresher(&dir, vec![Ok(usage(40.0, 60.0))]);
        let mut stale = CacheEntry::success(usage(20.0, 30.0));
        stale.timestamp -= 10 * 60 * 1000;
        r.cache().write(&stale);

        assert_eq!(r.refresh(false).await, RefreshOutcome::Fetched);
        assert_eq!(r.source.calls(), 1);
    }

    #[tokio::test]
    async fn test_force_refresh_clears_cache_and_fetches() {
        let dir = TempDir::new().expect("temp dir");
        let r = refresher(&dir, vec![Err(ApiError::Http(503))]);
        r.cache().write(&CacheEntry::failure(
            None,
            "HTTP 503".to_string(),
            ERROR_THRESHOLD - 1,
        ));

        // Cleared cache resets the failure streak.
        assert_eq!(
            r.force_refresh().await,
            RefreshOutcome::Failed {
                error_count: 1,
                suppressed: false
            }
        );
        assert_eq!(r.source.calls(), 1);
    }

    #[tokio::test]
    async fn test_loading_view_uses_last_known_usage() {
        let dir = TempDir::new().expect("temp dir");
        let r = refresher(&dir, vec![Ok(usage(10.0, 50.0)), Ok(usage(11.0, 51.0))]);
        r.refresh(true).await;
        r.refresh(true).await;

        let views = r.sink().views();
        assert_eq!(views[2].kind, ViewKind::Loading);
        assert!(views[2].text.ends_with("Claude: 10% / 50%"));
    }

    #[test]
    fn test_restore_from_cache_seeds_last_known() {
        let dir = TempDir::new().expect("temp dir");
        let r = refresher(&dir, vec![]);
        assert!(!r.restore_from_cache());
        assert!(r.sink().views().is_empty());

        let mut old = CacheEntry::failure(Some(usage(5.0, 6.0)), "HTTP 500".to_string(), 2);
        old.timestamp = 0;
        r.cache().write(&old);

        assert!(r.restore_from_cache());
        assert_eq!(r.last_successful_usage(), Some(usage(5.0, 6.0)));
        assert!(r.sink().last().text.ends_with("Claude: 5% / 6%"));
    }

    #[test]
    fn test_show_message() {
        let dir = TempDir::new().expect("temp dir");
        let r = refresher(&dir, vec![]);
        r.show_message("No credentials");
        let view = r.sink().last();
        assert!(view.text.ends_with("Claude: No credentials"));
        assert_eq!(view.tooltip, "No credentials");
    }

    #[test]
    fn test_in_flight_guard_releases_on_drop() {
        let flag = AtomicBool::new(false);
        let guard = InFlight::claim(&flag).expect("first claim succeeds");
        assert!(InFlight::claim(&flag).is_none());
        drop(guard);
        assert!(InFlight::claim(&flag).is_some());
    }
}
