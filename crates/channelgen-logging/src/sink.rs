//! Log sink management

use channelgen_core::LogLevel;
use once_cell::sync::OnceCell;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};

/// One forwarded log event
#[derive(Debug, Clone, PartialEq)]
pub struct LogRecord {
    pub level: LogLevel,
    /// Module path the event came from
    pub target: String,
    pub message: String,
    /// Structured fields other than `message`, in recording order
    pub fields: Vec<(String, String)>,
}

impl LogRecord {
    /// Value of a structured field, if recorded
    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Function receiving forwarded log records
pub type LogSink = Arc<dyn Fn(&LogRecord) + Send + Sync>;

static SINK_MANAGER: OnceCell<LogSinkManager> = OnceCell::new();

/// Holds the registered sink and the level it receives
pub struct LogSinkManager {
    sink: RwLock<Option<LogSink>>,
    level: AtomicU8,
}

impl LogSinkManager {
    pub fn new() -> Self {
        Self {
            sink: RwLock::new(None),
            level: AtomicU8::new(LogLevel::Info as u8),
        }
    }

    /// Get the global sink manager instance
    pub fn global() -> &'static LogSinkManager {
        SINK_MANAGER.get_or_init(LogSinkManager::new)
    }

    /// Register or clear the sink
    pub fn set_sink(&self, sink: Option<LogSink>) {
        *self.sink.write() = sink;
    }

    pub fn has_sink(&self) -> bool {
        self.sink.read().is_some()
    }

    pub fn set_level(&self, level: LogLevel) {
        self.level.store(level as u8, Ordering::SeqCst);
    }

    pub fn level(&self) -> LogLevel {
        LogLevel::from_u8(self.level.load(Ordering::SeqCst))
    }

    /// Check if a log level is enabled
    pub fn is_enabled(&self, level: LogLevel) -> bool {
        level != LogLevel::Off && level >= self.level()
    }

    /// Hand a record to the sink if one is set and the level is enabled
    pub fn emit(&self, record: &LogRecord) {
        if !self.is_enabled(record.level) {
            return;
        }

        // Clone out of the lock so a sink that logs cannot deadlock
        let sink = self.sink.read().clone();
        if let Some(sink) = sink {
            sink(record);
        }
    }
}

impl Default for LogSinkManager {
    fn default() -> Self {
        Self::new()
    }
}

/// In-memory sink collecting records, for tests and diagnostics capture
#[derive(Clone, Default)]
pub struct RecordBuffer {
    records: Arc<Mutex<Vec<LogRecord>>>,
}

impl RecordBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink that appends to this buffer
    pub fn sink(&self) -> LogSink {
        let records = self.records.clone();
        Arc::new(move |record: &LogRecord| records.lock().push(record.clone()))
    }

    /// Copy of everything recorded so far
    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().clone()
    }

    /// Remove and return everything recorded so far
    pub fn take(&self) -> Vec<LogRecord> {
        std::mem::take(&mut *self.records.lock())
    }
}
