//! Log channel between the engine and whoever renders progress.

use tokio::sync::mpsc;

/// A notification emitted while items are moved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogEvent {
    /// Informational line.
    Log(String),
    /// Copy job counters.
    Progress { processed: u64, expected: u64 },
    /// Something was skipped or partially failed; the move continues.
    Warning(String),
    /// The move failed.
    FatalError(String),
    /// Every selected item was moved.
    Complete(String),
}

impl LogEvent {
    /// Get the progress as a percentage (0.0 to 100.0), if this is a progress event.
    pub fn percentage(&self) -> Option<f64> {
        match self {
            Self::Progress { processed, expected } if *expected > 0 => {
                Some((*processed as f64 / *expected as f64) * 100.0)
            }
            Self::Progress { .. } => Some(0.0),
            _ => None,
        }
    }
}

impl std::fmt::Display for LogEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Log(msg) => f.write_str(msg),
            Self::Progress { processed, expected } => {
                write!(f, "{processed} of {expected} objects processed")
            }
            Self::Warning(msg) => write!(f, "Warning: {msg}"),
            Self::FatalError(msg) => write!(f, "Error: {msg}"),
            Self::Complete(msg) => f.write_str(msg),
        }
    }
}

/// A log event tagged with the selected item it belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    /// Name of the selected item, if the event is item-specific.
    pub item: Option<String>,
    pub event: LogEvent,
}

impl std::fmt::Display for LogRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.item {
            Some(item) => write!(f, "[{item}] {}", self.event),
            None => write!(f, "{}", self.event),
        }
    }
}

/// Sending half of the log channel.
///
/// Cloning is cheap. Sending never blocks, and events sent after the
/// receiver was dropped are discarded without affecting the move.
#[derive(Debug, Clone, Default)]
pub struct MoveLog {
    tx: Option<mpsc::UnboundedSender<LogRecord>>,
    item: Option<String>,
}

/// Create a log channel.
pub fn log_channel() -> (MoveLog, mpsc::UnboundedReceiver<LogRecord>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (MoveLog::new(tx), rx)
}

impl MoveLog {
    pub fn new(tx: mpsc::UnboundedSender<LogRecord>) -> Self {
        Self {
            tx: Some(tx),
            item: None,
        }
    }

    /// A log that drops everything.
    pub fn disabled() -> Self {
        Self::default()
    }

    /// A copy of this log that tags events with `item`.
    pub fn for_item(&self, item: impl Into<String>) -> Self {
        Self {
            tx: self.tx.clone(),
            item: Some(item.into()),
        }
    }

    pub fn emit(&self, event: LogEvent) {
        if let Some(tx) = &self.tx {
            let _ = tx.send(LogRecord {
                item: self.item.clone(),
                event,
            });
        }
    }

    pub fn write(&self, msg: impl Into<String>) {
        self.emit(LogEvent::Log(msg.into()));
    }

    pub fn warn(&self, msg: impl Into<String>) {
        self.emit(LogEvent::Warning(msg.into()));
    }

    pub fn progress(&self, processed: u64, expected: u64) {
        self.emit(LogEvent::Progress {
            processed,
            expected,
        });
    }

    pub fn fatal(&self, msg: impl Into<String>) {
        self.emit(LogEvent::FatalError(msg.into()));
    }

    pub fn complete(&self, msg: impl Into<String>) {
        self.emit(LogEvent::Complete(msg.into()));
    }
}
