//! Run log shared by loaders, transforms and the CLI.
//!
//! Entries print to stderr as they happen and are also broadcast. A
//! [`LogCapture`] opened before a long operation collects what was logged
//! while it ran; profile builds use one to report skipped key points and
//! rows back to the caller.

use once_cell::sync::Lazy;
use tokio::sync::broadcast::{self, error::TryRecvError};

/// Entries a capture can fall behind by before older ones are dropped.
const CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    fn prefix(&self) -> &'static str {
        match self {
            Self::Info => "   ",
            Self::Success => "   ✓",
            Self::Warning => "   ⚠️",
            Self::Error => "   ❌",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
    /// Nesting depth, three spaces each
    pub indent: u8,
}

impl LogEntry {
    pub fn new(level: LogLevel, message: impl Into<String>) -> Self {
        Self {
            level,
            message: message.into(),
            indent: 0,
        }
    }

    pub fn with_indent(mut self, indent: u8) -> Self {
        self.indent = indent;
        self
    }
}

/// Process-wide run log
pub static RUN_LOG: Lazy<RunLog> = Lazy::new(RunLog::new);

pub struct RunLog {
    sender: broadcast::Sender<LogEntry>,
}

impl RunLog {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn log(&self, entry: LogEntry) {
        let indent = "   ".repeat(entry.indent as usize);
        eprintln!("{}{} {}", indent, entry.level.prefix(), entry.message);

        // No open capture is fine
        let _ = self.sender.send(entry);
    }

    /// Start collecting the entries logged from now on.
    pub fn capture(&self) -> LogCapture {
        LogCapture {
            receiver: self.sender.subscribe(),
            missed: 0,
        }
    }
}

impl Default for RunLog {
    fn default() -> Self {
        Self::new()
    }
}

/// Entries logged since [`RunLog::capture`].
///
/// The log is process-wide, so a capture also sees entries from work running
/// concurrently with the operation it wraps.
pub struct LogCapture {
    receiver: broadcast::Receiver<LogEntry>,
    missed: u64,
}

impl LogCapture {
    /// Take every entry received so far.
    pub fn drain(&mut self) -> Vec<LogEntry> {
        let mut entries = Vec::new();
        loop {
            match self.receiver.try_recv() {
                Ok(entry) => entries.push(entry),
                Err(TryRecvError::Lagged(n)) => self.missed += n,
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }
        entries
    }

    /// Messages of the warnings received so far.
    pub fn warnings(&mut self) -> Vec<String> {
        self.drain()
            .into_iter()
            .filter(|e| e.level == LogLevel::Warning)
            .map(|e| e.message)
            .collect()
    }

    /// Entries dropped because the capture fell behind.
    pub fn missed(&self) -> u64 {
        self.missed
    }
}

pub fn log_info(msg: impl Into<String>) {
    RUN_LOG.log(LogEntry::new(LogLevel::Info, msg));
}

pub fn log_success(msg: impl Into<String>) {
    RUN_LOG.log(LogEntry::new(LogLevel::Success, msg));
}

pub fn log_warning(msg: impl Into<String>) {
    RUN_LOG.log(LogEntry::new(LogLevel::Warning, msg));
}

pub fn log_error(msg: impl Into<String>) {
    RUN_LOG.log(LogEntry::new(LogLevel::Error, msg));
}

pub fn log_info_indent(msg: impl Into<String>, indent: u8) {
    RUN_LOG.log(LogEntry::new(LogLevel::Info, msg).with_indent(indent));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_collects_entries_after_start() {
        let log = RunLog::new();
        log.log(LogEntry::new(LogLevel::Info, "before"));

        let mut capture = log.capture();
        log.log(LogEntry::new(LogLevel::Warning, "Skipping key point 99"));
        log.log(LogEntry::new(LogLevel::Info, "done").with_indent(1));

        let entries = capture.drain();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].message, "Skipping key point 99");
        assert_eq!(entries[1].indent, 1);
        assert!(capture.drain().is_empty());
    }

    #[test]
    fn test_warnings_only() {
        let log = RunLog::new();
        let mut capture = log.capture();
        log.log(LogEntry::new(LogLevel::Success, "Wrote dist/a.json"));
        log.log(LogEntry::new(LogLevel::Warning, "Skipping tolls row 3"));

        assert_eq!(capture.warnings(), vec!["Skipping tolls row 3".to_string()]);
    }

    #[test]
    fn test_lagging_capture_counts_missed_entries() {
        let log = RunLog::new();
        let mut capture = log.capture();
        for i in 0..CHANNEL_CAPACITY + 5 {
            log.log(LogEntry::new(LogLevel::Info, format!("entry {}", i)));
        }

        let entries = capture.drain();
        assert_eq!(capture.missed(), 5);
        assert_eq!(entries.len(), CHANNEL_CAPACITY);
        assert_eq!(entries[0].message, "entry 5");
    }
}
