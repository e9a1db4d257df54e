//! Run log.
//!
//! Every entry is printed to stderr and sent on a broadcast channel. A
//! pipeline run opens a [`RunCapture`]: entries logged inside its scope are
//! tagged with the run id, and the warnings and errors among them (absent
//! survey columns, duplicate reference tools, empty or failed tables) are
//! handed back with the run summary.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::broadcast::{self, error::TryRecvError};

const CHANNEL_CAPACITY: usize = 1024;

tokio::task_local! {
    static CURRENT_RUN: u64;
}

static NEXT_RUN: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    /// Whether entries of this level belong in a run's issue list.
    pub fn is_issue(self) -> bool {
        matches!(self, LogLevel::Warning | LogLevel::Error)
    }
}

/// A single log line
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Nesting depth of the step
    #[serde(default)]
    pub indent: u8,
    /// Run that logged the entry, if it was logged inside one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run: Option<u64>,
}

impl LogEntry {
    fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            indent: 0,
            run: None,
        }
    }

    pub fn info(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Info, message)
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Success, message)
    }

    pub fn warning(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Warning, message)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::new(LogLevel::Error, message)
    }

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }
}

/// Global log broadcaster
pub static LOG_BROADCASTER: Lazy<LogBroadcaster> = Lazy::new(LogBroadcaster::new);

/// Prints entries and forwards them to subscribers
pub struct LogBroadcaster {
    sender: broadcast::Sender<LogEntry>,
}

impl LogBroadcaster {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    /// Tag `entry` with the current run, print it and broadcast it.
    pub fn log(&self, mut entry: LogEntry) {
        if entry.run.is_none() {
            entry.run = CURRENT_RUN.try_with(|id| *id).ok();
        }

        let marker = match entry.level {
            LogLevel::Info => "   ",
            LogLevel::Success => "   ✓",
            LogLevel::Warning => "   ⚠️",
            LogLevel::Error => "   ❌",
        };
        eprintln!("{}{} {}", "   ".repeat(entry.indent as usize), marker, entry.message);

        // No receivers is fine
        let _ = self.sender.send(entry);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<LogEntry> {
        self.sender.subscribe()
    }
}

impl Default for LogBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Per-run capture
// =============================================================================

/// Collects the warnings and errors of one run.
///
/// Subscribes on creation; only entries logged inside [`RunCapture::scope`]
/// are kept, so concurrent runs do not see each other's issues.
pub struct RunCapture {
    id: u64,
    receiver: broadcast::Receiver<LogEntry>,
}

impl RunCapture {
    /// Capture from the global broadcaster.
    pub fn start() -> Self {
        Self::on(&LOG_BROADCASTER)
    }

    pub fn on(broadcaster: &LogBroadcaster) -> Self {
        Self {
            id: NEXT_RUN.fetch_add(1, Ordering::Relaxed),
            receiver: broadcaster.subscribe(),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    /// Drive `work` with every entry it logs attributed to this run.
    pub async fn scope<F: Future>(&self, work: F) -> F::Output {
        CURRENT_RUN.scope(self.id, work).await
    }

    /// Warnings and errors of this run, in logging order.
    pub fn finish(mut self) -> Vec<LogEntry> {
        let mut issues = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(entry) => {
                    if entry.run == Some(self.id) && entry.level.is_issue() {
                        issues.push(entry);
                    }
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    let mut notice =
                        LogEntry::warning(format!("{} log entries were not captured", skipped));
                    notice.run = Some(self.id);
                    issues.push(notice);
                }
                Err(_) => break,
            }
        }
        issues
    }
}

pub fn log_info(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::info(msg));
}

pub fn log_success(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::success(msg));
}

pub fn log_warning(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::warning(msg));
}

pub fn log_error(msg: impl Into<String>) {
    LOG_BROADCASTER.log(LogEntry::error(msg));
}

pub fn log_info_indent(msg: impl Into<String>, indent: u8) {
    LOG_BROADCASTER.log(LogEntry::info(msg).with_indent(indent));
}
