//! Operation-log records and where they go.
//!
//! Interceptors never call a global logger. They build a [`LogRecord`] and
//! hand it to the [`LogSink`] they were constructed with. [`TracingSink`]
//! forwards to `tracing`; [`MemorySink`] keeps records for inspection.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Target used by [`TracingSink`] events, for `RUST_LOG=oplog=info` filtering.
pub const LOG_TARGET: &str = "oplog";

/// Severity of a [`LogRecord`].
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Level {
    Info,
    Error,
}

/// One line of an operation log.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum LogEntry {
    Module(String),
    OperationType(String),
    Description(String),
    /// Owning-type-qualified handler identity.
    Method(String),
    /// First-value-wins request parameters, as JSON.
    Params(String),
    /// The handler's return value, as JSON.
    Result(String),
    /// Stands in for failure details that are not logged.
    Elided,
    /// Runtime type name of a handler failure.
    Exception(String),
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Module(v)        => write!(f, "module: {v}"),
            Self::OperationType(v) => write!(f, "operation type: {v}"),
            Self::Description(v)   => write!(f, "description: {v}"),
            Self::Method(v)        => write!(f, "method: {v}"),
            Self::Params(v)        => write!(f, "params: {v}"),
            Self::Result(v)        => write!(f, "result: {v}"),
            Self::Elided           => f.write_str("details elided"),
            Self::Exception(v)     => write!(f, "exception: {v}"),
        }
    }
}

/// The ordered lines one interceptor emits for one invocation.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct LogRecord {
    pub level: Level,
    pub entries: Vec<LogEntry>,
}

impl LogRecord {
    pub fn lines(&self) -> impl Iterator<Item = String> + '_ {
        self.entries.iter().map(ToString::to_string)
    }
}

/// Destination for operation-log records.
///
/// Implementations must write a record's entries contiguously and in order.
/// Records from concurrent requests may interleave with each other.
pub trait LogSink: Send + Sync {
    fn emit(&self, record: &LogRecord);
}

impl<S: LogSink + ?Sized> LogSink for Arc<S> {
    fn emit(&self, record: &LogRecord) {
        (**self).emit(record);
    }
}

/// Writes each entry as one `tracing` event under [`LOG_TARGET`].
#[derive(Debug, Default)]
pub struct TracingSink {
    // Held while one record is written so its events are not split.
    write: Mutex<()>,
}

impl TracingSink {
    pub fn new() -> Self { Self::default() }
}

impl LogSink for TracingSink {
    fn emit(&self, record: &LogRecord) {
        let _guard = self.write.lock().unwrap_or_else(PoisonError::into_inner);
        for line in record.lines() {
            match record.level {
                Level::Info => tracing::info!(target: LOG_TARGET, "{line}"),
                Level::Error => tracing::error!(target: LOG_TARGET, "{line}"),
            }
        }
    }
}

/// Keeps every record in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    records: Mutex<Vec<LogRecord>>,
}

impl MemorySink {
    pub fn new() -> Self { Self::default() }

    pub fn records(&self) -> Vec<LogRecord> {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    /// Every line emitted so far, records flattened in emission order.
    pub fn lines(&self) -> Vec<String> {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .flat_map(|r| r.lines())
            .collect()
    }

    pub fn clear(&self) {
        self.records.lock().unwrap_or_else(PoisonError::into_inner).clear();
    }
}

impl LogSink for MemorySink {
    fn emit(&self, record: &LogRecord) {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(record.clone());
    }
}
