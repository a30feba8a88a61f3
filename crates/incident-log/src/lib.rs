//! Incident Log
//!
//! Durable, append-only record of every person seen while a fall clip is
//! being recorded. One log per run, header written once at creation.

mod entry;
mod log;
mod sink;

pub use entry::{IncidentLogEntry, LOG_HEADER};
pub use log::{IncidentLog, RunStamp};
pub use sink::{FileLogSink, LogSink, MemoryLogSink};

use thiserror::Error;

/// Incident log errors
#[derive(Debug, Error)]
pub enum LogError {
    #[error("Failed to create log {path}: {source}")]
    Create {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to append to log: {0}")]
    Append(#[from] std::io::Error),

    #[error("Log sink unavailable: {0}")]
    Sink(String),
}
