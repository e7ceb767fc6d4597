//! One-way page→native signaling over console-log sentinels.
//!
//! Page code cannot be given a protocol channel without enabling browser
//! instrumentation that anti-bot heuristics look for, so the bootstrap
//! script signals by logging lines with reserved prefixes and the native
//! side pattern-matches console output. Strictly fire-and-forget,
//! page-to-native only.
//!
//! Wire format:
//! - `__LAUNCHTUBE_CMD_CLOSE__` — the page asks the host to shut the
//!   browser session down.
//! - `__LAUNCHTUBE_LOG__:<level>:<message>` — page log relay; `<message>`
//!   may itself contain colons.

use tokio::sync::mpsc;

pub const CMD_CLOSE: &str = "__LAUNCHTUBE_CMD_CLOSE__";
pub const LOG_PREFIX: &str = "__LAUNCHTUBE_LOG__:";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn parse(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "debug" => LogLevel::Debug,
            "warn" | "warning" => LogLevel::Warn,
            "error" => LogLevel::Error,
            _ => LogLevel::Info,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PageMessage {
    CloseRequested,
    Log { level: LogLevel, message: String },
}

pub type PageSender = mpsc::Sender<PageMessage>;
pub type PageReceiver = mpsc::Receiver<PageMessage>;

pub fn channel(capacity: usize) -> (PageSender, PageReceiver) {
    mpsc::channel(capacity)
}

/// Parse one console line. Lines without a sentinel prefix are ordinary
/// page output and yield `None`.
pub fn parse(line: &str) -> Option<PageMessage> {
    let line = line.trim();
    if line == CMD_CLOSE {
        return Some(PageMessage::CloseRequested);
    }
    let rest = line.strip_prefix(LOG_PREFIX)?;
    let (level, message) = match rest.split_once(':') {
        Some((level, message)) => (LogLevel::parse(level), message.to_string()),
        None => (LogLevel::Info, rest.to_string()),
    };
    Some(PageMessage::Log { level, message })
}

/// Forward a parsed page log line into the native log.
pub fn relay_log(level: LogLevel, message: &str) {
    match level {
        LogLevel::Debug => tracing::debug!(target: "page", "{}", message),
        LogLevel::Info => tracing::info!(target: "page", "{}", message),
        LogLevel::Warn => tracing::warn!(target: "page", "{}", message),
        LogLevel::Error => tracing::error!(target: "page", "{}", message),
    }
}
