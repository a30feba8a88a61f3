//! Per-run incident log

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};
use tracing::{info, warn};

use crate::entry::{IncidentLogEntry, LOG_HEADER};
use crate::sink::{FileLogSink, LogSink};
use crate::LogError;

/// Timestamp naming every artifact of one run (`YYYYmmdd_HHMMSS`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunStamp(String);

impl RunStamp {
    pub fn now() -> Self {
        Self::from_datetime(Local::now())
    }

    pub fn from_datetime(at: DateTime<Local>) -> Self {
        Self(at.format("%Y%m%d_%H%M%S").to_string())
    }

    /// Use a fixed label, mainly for reproducible output names
    pub fn fixed(label: impl Into<String>) -> Self {
        Self(label.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `detection_log_<stamp>.txt`
    pub fn log_file_name(&self) -> String {
        format!("detection_log_{}.txt", self.0)
    }

    /// `fall_detection_<stamp>_incident_<n>.mp4`
    pub fn clip_file_name(&self, incident_id: u32) -> String {
        format!("fall_detection_{}_incident_{}.mp4", self.0, incident_id)
    }
}

impl fmt::Display for RunStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Append-only log owned by one run
pub struct IncidentLog {
    sink: Box<dyn LogSink>,
    path: Option<PathBuf>,
    lines_written: u64,
    closed: bool,
}

impl IncidentLog {
    /// Wrap a sink and emit the header row
    pub fn create(sink: Box<dyn LogSink>) -> Result<Self, LogError> {
        let mut log = Self {
            sink,
            path: None,
            lines_written: 0,
            closed: false,
        };
        log.sink.append_line(LOG_HEADER)?;
        Ok(log)
    }

    /// Create `detection_log_<stamp>.txt` inside `dir`
    pub fn create_in_dir(dir: &Path, stamp: &RunStamp) -> Result<Self, LogError> {
        let path = dir.join(stamp.log_file_name());
        let mut log = Self::create(Box::new(FileLogSink::create(&path)?))?;
        info!(path = %path.display(), "Created incident log");
        log.path = Some(path);
        Ok(log)
    }

    /// Backing file, if file-based
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn append(&mut self, entry: &IncidentLogEntry) -> Result<(), LogError> {
        if self.closed {
            return Err(LogError::Sink("log already closed".to_string()));
        }
        self.sink.append_line(&entry.to_string())?;
        self.lines_written += 1;
        Ok(())
    }

    /// Entries appended (header excluded)
    pub fn lines_written(&self) -> u64 {
        self.lines_written
    }

    /// Flush and refuse further appends. Idempotent.
    pub fn close(&mut self) -> Result<(), LogError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.sink.flush()
    }
}

impl Drop for IncidentLog {
    fn drop(&mut self) {
        if let Err(e) = self.close() {
            warn!(error = %e, "Incident log flush on drop failed");
        }
    }
}
