//! One-shot status commands.
//!
//! `cub status` is meant to be re-run by the host (tmux `status-right`,
//! i3blocks `interval`) and is cache-aware. `cub refresh` drops the cache
//! first. Both print exactly one status record.

use std::process::ExitCode;

use claude_usage::UsageClient;
use claude_usage_bar::cache::CacheStore;
use claude_usage_bar::config::schema::Config;
use claude_usage_bar::credentials::FileSecretStore;
use claude_usage_bar::daemon::Refresher;
use claude_usage_bar::display::{LatestView, LineSink, StatusSink, StatusView};
use tracing::debug;

/// Refresher whose output is held back until the command finishes.
pub(crate) type OneShotRefresher = Refresher<UsageClient, LatestView, FileSecretStore>;

/// Build a refresher seeded from the cache, without printing anything.
pub(crate) fn one_shot_refresher(config: &Config) -> OneShotRefresher {
    let refresher = Refresher::new(
        UsageClient::with_base_url(&config.usage.api_base_url),
        LatestView::new(),
        FileSecretStore::new(),
        CacheStore::default_location(),
        config.usage.refresh_interval(),
    );
    refresher.restore_from_cache();
    refresher
}

/// Run `future` to completion on a fresh current-thread runtime.
pub(crate) fn block_on<F: std::future::Future>(future: F) -> Result<F::Output, ExitCode> {
    match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => Ok(rt.block_on(future)),
        Err(e) => {
            eprintln!("Error: failed to create tokio runtime: {}", e);
            Err(ExitCode::FAILURE)
        }
    }
}

/// Print the last view the refresher produced.
pub(crate) fn print_view(config: &Config, view: Option<StatusView>) {
    if let Some(view) = view {
        LineSink::stdout(config.display.format).show(&view);
    }
}

/// `cub status` / `cub refresh`.
pub(crate) fn run_status_command(config: &Config, force: bool) -> ExitCode {
    let refresher = one_shot_refresher(config);

    let outcome = match block_on(async {
        if force {
            refresher.force_refresh().await
        } else {
            refresher.refresh(false).await
        }
    }) {
        Ok(outcome) => outcome,
        Err(code) => return code,
    };
    debug!(?outcome, "status refresh finished");

    print_view(config, refresher.sink().get());
    ExitCode::SUCCESS
}
