//! Status output for the host status bar.
//!
//! The refresher renders every update into a [`StatusView`] and hands it to
//! a [`StatusSink`]. The shipped sink writes one record per update to a
//! line-oriented writer (stdout in the binary), either as plain text or as
//! a waybar-compatible JSON object.

use std::io::Write;
use std::sync::Mutex;

use claude_usage::{
    format_loading_text, format_message_text, format_message_tooltip, format_status_text,
    format_tooltip, round_half_up, UsageData,
};
use serde::Serialize;

use crate::config::schema::OutputFormat;

/// What a click on the status item should trigger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClickAction {
    /// Clear the cache and force a refresh.
    Refresh,
    /// Run the credential setup flow.
    SetupCredentials,
}

/// Which kind of content a view carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ViewKind {
    /// Usage percentages.
    Usage,
    /// Fetch in flight.
    Loading,
    /// Error or informational message.
    Message,
}

/// One rendered status update.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusView {
    /// Short status-line text.
    pub text: String,
    /// Multi-line detail. Omitted from JSON when empty.
    #[serde(skip_serializing_if = "String::is_empty")]
    pub tooltip: String,
    /// Click target.
    pub action: ClickAction,
    /// Content kind, exported as the waybar `class`.
    #[serde(rename = "class")]
    pub kind: ViewKind,
    /// 5-hour utilization, rounded, when the view shows usage.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub percentage: Option<i64>,
}

impl StatusView {
    /// View showing usage percentages.
    pub fn usage(usage: &UsageData, action: ClickAction) -> Self {
        Self {
            text: format_status_text(usage),
            tooltip: format_tooltip(usage),
            action,
            kind: ViewKind::Usage,
            percentage: Some(round_half_up(usage.five_hour.utilization)),
        }
    }

    /// View shown while a fetch is in flight.
    ///
    /// Carries the last known usage tooltip, if any.
    pub fn loading(last_known: Option<&UsageData>, action: ClickAction) -> Self {
        Self {
            text: format_loading_text(last_known),
            tooltip: last_known.map(format_tooltip).unwrap_or_default(),
            action,
            kind: ViewKind::Loading,
            percentage: last_known.map(|u| round_half_up(u.five_hour.utilization)),
        }
    }

    /// View showing a message instead of usage.
    pub fn message(message: &str, action: ClickAction) -> Self {
        Self {
            text: format_message_text(message),
            tooltip: format_message_tooltip(message),
            action,
            kind: ViewKind::Message,
            percentage: None,
        }
    }
}

/// Receiver of status updates.
pub trait StatusSink {
    /// Display `view`, replacing whatever was shown before.
    fn show(&self, view: &StatusView);
}

/// Writes one line per update to `W`.
#[derive(Debug)]
pub struct LineSink<W: Write> {
    writer: Mutex<W>,
    format: OutputFormat,
}

impl LineSink<std::io::Stdout> {
    /// Sink writing to the process stdout.
    pub fn stdout(format: OutputFormat) -> Self {
        Self::new(std::io::stdout(), format)
    }
}

impl<W: Write> LineSink<W> {
    /// Sink writing to an arbitrary writer.
    pub fn new(writer: W, format: OutputFormat) -> Self {
        Self {
            writer: Mutex::new(writer),
            format,
        }
    }

    /// Consume the sink and return the writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner().unwrap_or_else(|e| e.into_inner())
    }

    fn render(&self, view: &StatusView) -> String {
        match self.format {
            OutputFormat::Plain => view.text.clone(),
            OutputFormat::Waybar => {
                serde_json::to_string(view).unwrap_or_else(|_| view.text.clone())
            }
        }
    }
}

impl<W: Write> StatusSink for LineSink<W> {
    fn show(&self, view: &StatusView) {
        let line = self.render(view);
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        // Status bars read line by line; flush so each update lands immediately.
        if let Err(e) = writeln!(writer, "{}", line).and_then(|_| writer.flush()) {
            tracing::warn!(error = %e, "failed to write status line");
        }
    }
}

/// Keeps only the most recent view.
///
/// One-shot commands render through this and print the final view once,
/// so the loading indicator never reaches stdout.
#[derive(Debug, Default)]
pub struct LatestView {
    view: Mutex<Option<StatusView>>,
}

impl LatestView {
    /// Empty holder.
    pub fn new() -> Self {
        Self::default()
    }

    /// The last view shown, if any.
    pub fn get(&self) -> Option<StatusView> {
        self.view.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

impl StatusSink for LatestView {
    fn show(&self, view: &StatusView) {
        *self.view.lock().unwrap_or_else(|e| e.into_inner()) = Some(view.clone());
    }
}
