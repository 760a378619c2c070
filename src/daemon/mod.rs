//! Long-running refresh loop for `cub daemon`.
//!
//! The daemon restores the last usage from the cache, forces one fetch,
//! then refreshes on a timer until SIGINT or SIGTERM. Status updates go to
//! stdout, one line each; logs go to stderr.
//!
//! # Signals
//!
//! | Signal  | Effect                                              |
//! |---------|-----------------------------------------------------|
//! | SIGUSR1 | Clear the cache and refresh now (a click)           |
//! | SIGUSR2 | Toggle the host focus flag                          |
//! | SIGHUP  | Reload the config file; restart the timer if needed |
//! | SIGINT  | Stop                                                |
//! | SIGTERM | Stop                                                |
//!
//! SIGINT and SIGTERM also abandon a fetch that is still in flight.

pub mod logging;
pub mod refresher;

pub use refresher::{RefreshOutcome, Refresher, UsageSource, ERROR_THRESHOLD};

use std::error::Error;
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use claude_usage::UsageClient;
use tokio::signal::unix::{signal, Signal, SignalKind};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::cache::CacheStore;
use crate::config::loader::ConfigLoader;
use crate::config::schema::{Config, UsageConfig};
use crate::credentials::FileSecretStore;
use crate::display::LineSink;

/// Result type alias for daemon operations.
pub type DaemonResult<T> = Result<T, Box<dyn Error>>;

/// Whether the host window currently has focus.
///
/// Starts focused. Cloned handles share the same flag.
#[derive(Debug, Clone)]
pub struct FocusState(Arc<AtomicBool>);

impl Default for FocusState {
    fn default() -> Self {
        Self(Arc::new(AtomicBool::new(true)))
    }
}

impl FocusState {
    /// New flag, initially focused.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current focus.
    pub fn is_focused(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Set focus explicitly.
    pub fn set(&self, focused: bool) {
        self.0.store(focused, Ordering::SeqCst);
    }

    /// Flip focus and return the new value.
    pub fn toggle(&self) -> bool {
        !self.0.fetch_xor(true, Ordering::SeqCst)
    }
}

/// Timer settings derived from `[usage]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    /// Timer period and cache max age.
    pub interval: Duration,
    /// Skip ticks while unfocused.
    pub only_when_focused: bool,
}

impl Schedule {
    /// Schedule for a usage section.
    pub fn from_config(usage: &UsageConfig) -> Self {
        Self {
            interval: usage.refresh_interval(),
            only_when_focused: usage.refresh_only_when_focused,
        }
    }

    /// Whether a timer tick should refresh given the host focus.
    pub fn should_refresh(&self, focus: &FocusState) -> bool {
        !self.only_when_focused || focus.is_focused()
    }

    /// Adopt `usage`, returning `true` if the timer must be restarted.
    pub fn apply(&mut self, usage: &UsageConfig) -> bool {
        let next = Self::from_config(usage);
        let restart = next.interval != self.interval;
        *self = next;
        restart
    }
}

/// Timer whose first tick fires one full period from now.
fn ticker(period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

/// Unix signal streams the loop listens on.
struct Signals {
    refresh: Signal,
    focus: Signal,
    reload: Signal,
    interrupt: Signal,
    terminate: Signal,
}

impl Signals {
    fn register() -> std::io::Result<Self> {
        Ok(Self {
            refresh: signal(SignalKind::user_defined1())?,
            focus: signal(SignalKind::user_defined2())?,
            reload: signal(SignalKind::hangup())?,
            interrupt: signal(SignalKind::interrupt())?,
            terminate: signal(SignalKind::terminate())?,
        })
    }

    /// Resolves with the signal name on SIGINT or SIGTERM.
    async fn shutdown(&mut self) -> &'static str {
        tokio::select! {
            _ = self.interrupt.recv() => "SIGINT",
            _ = self.terminate.recv() => "SIGTERM",
        }
    }
}

/// Drive `work` to completion unless `shutdown` resolves first.
///
/// Returns `None` when shutdown won; `work` is dropped mid-flight.
async fn unless_shutdown<W, S>(work: W, shutdown: S) -> Option<W::Output>
where
    W: Future,
    S: Future<Output = &'static str>,
{
    tokio::select! {
        output = work => Some(output),
        name = shutdown => {
            info!(signal = name, "received shutdown signal during refresh");
            None
        }
    }
}

/// Run the daemon until SIGINT or SIGTERM.
///
/// `config_path` is re-read on SIGHUP; `None` reloads from the default
/// XDG location.
///
/// # Errors
///
/// Returns an error if the runtime cannot be built or signal handlers
/// cannot be registered. Fetch failures never stop the daemon.
pub fn run_daemon(config: Config, config_path: Option<PathBuf>) -> DaemonResult<()> {
    logging::init(config.daemon.log_level);

    // The loop is sequential; a single thread is enough.
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| {
            Box::new(std::io::Error::other(format!(
                "Failed to create Tokio runtime: {}",
                e
            ))) as Box<dyn Error>
        })?;

    runtime.block_on(run_loop(config, config_path))?;

    info!("daemon stopped");
    Ok(())
}

async fn run_loop(config: Config, config_path: Option<PathBuf>) -> DaemonResult<()> {
    let mut schedule = Schedule::from_config(&config.usage);
    let focus = FocusState::new();
    let mut signals = Signals::register()?;

    info!(
        interval = %humantime::format_duration(schedule.interval),
        api = %config.usage.api_base_url,
        "claude usage daemon starting"
    );

    let mut refresher = Refresher::new(
        UsageClient::with_base_url(&config.usage.api_base_url),
        LineSink::stdout(config.display.format),
        FileSecretStore::new(),
        CacheStore::default_location(),
        schedule.interval,
    );

    refresher.restore_from_cache();
    if unless_shutdown(refresher.refresh(true), signals.shutdown())
        .await
        .is_none()
    {
        return Ok(());
    }

    let mut timer = ticker(schedule.interval);

    loop {
        tokio::select! {
            _ = timer.tick() => {
                if schedule.should_refresh(&focus) {
                    if unless_shutdown(refresher.refresh(false), signals.shutdown())
                        .await
                        .is_none()
                    {
                        break;
                    }
                } else {
                    debug!("host unfocused, skipping timed refresh");
                }
            }
            _ = signals.refresh.recv() => {
                info!("received SIGUSR1, refreshing");
                if unless_shutdown(refresher.force_refresh(), signals.shutdown())
                    .await
                    .is_none()
                {
                    break;
                }
            }
            _ = signals.focus.recv() => {
                let focused = focus.toggle();
                debug!(focused, "received SIGUSR2, focus toggled");
            }
            _ = signals.reload.recv() => {
                info!("received SIGHUP, reloading configuration");
                let reloaded = match &config_path {
                    Some(path) => ConfigLoader::load_or_default(path),
                    None => ConfigLoader::load_default(),
                };
                match reloaded {
                    Ok(new_config) => {
                        if schedule.apply(&new_config.usage) {
                            info!(
                                interval = %humantime::format_duration(schedule.interval),
                                "refresh interval changed, restarting timer"
                            );
                            refresher.set_max_age(schedule.interval);
                            timer = ticker(schedule.interval);
                        }
                    }
                    Err(e) => warn!(error = %e, "config reload failed, keeping current settings"),
                }
            }
            _ = signals.interrupt.recv() => {
                info!("received SIGINT, shutting down");
                break;
            }
            _ = signals.terminate.recv() => {
                info!("received SIGTERM, shutting down");
                break;
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usage_config(interval: &str, only_when_focused: bool) -> UsageConfig {
        UsageConfig {
            refresh_interval: interval.to_string(),
            refresh_only_when_focused: only_when_focused,
            ..UsageConfig::default()
        }
    }

    #[test]
    fn test_focus_starts_focused_and_toggles() {
        let focus = FocusState::new();
        assert!(focus.is_focused());
        assert!(!focus.toggle());
        assert!(!focus.is_focused());
        assert!(focus.toggle());

        let shared = focus.clone();
        shared.set(false);
        assert!(!focus.is_focused());
    }

    #[test]
    fn test_schedule_respects_focus() {
        let focus = FocusState::new();
        let focused_only = Schedule::from_config(&usage_config("5m", true));
        let always = Schedule::from_config(&usage_config("5m", false));

        assert!(focused_only.should_refresh(&focus));
        focus.set(false);
        assert!(!focused_only.should_refresh(&focus));
        assert!(always.should_refresh(&focus));
    }

    #[test]
    fn test_schedule_apply_restarts_only_on_interval_change() {
        let mut schedule = Schedule::from_config(&usage_config("5m", true));
        assert_eq!(schedule.interval, Duration::from_secs(300));

        assert!(!schedule.apply(&usage_config("5m", false)));
        assert!(!schedule.only_when_focused);

        assert!(schedule.apply(&usage_config("90s", false)));
        assert_eq!(schedule.interval, Duration::from_secs(90));
    }

    #[test]
    fn test_invalid_interval_falls_back_to_default() {
        let schedule = Schedule::from_config(&usage_config("soon", true));
        assert_eq!(
            schedule.interval,
            crate::config::schema::DEFAULT_REFRESH_INTERVAL
        );
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_pending_work() {
        let outcome = unless_shutdown(std::future::pending::<()>(), async { "SIGTERM" }).await;
        assert!(outcome.is_none());
    }

    #[tokio::test]
    async fn test_work_completes_without_shutdown() {
        let outcome = unless_shutdown(async { 7 }, std::future::pending::<&'static str>()).await;
        assert_eq!(outcome, Some(7));
    }

    #[tokio::test(start_paused = true)]
    async fn test_ticker_skips_immediate_tick() {
        let start = Instant::now();
        let mut timer = ticker(Duration::from_secs(60));
        timer.tick().await;
        assert!(start.elapsed() >= Duration::from_secs(60));
    }
}
