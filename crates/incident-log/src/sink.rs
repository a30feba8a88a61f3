//! Log sinks

use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::LogError;

/// Append-only line sink
pub trait LogSink: Send {
    /// Append one line; the sink adds the terminator
    fn append_line(&mut self, line: &str) -> Result<(), LogError>;

    /// Push buffered lines to durable storage
    fn flush(&mut self) -> Result<(), LogError>;
}

/// Text file sink, flushed after every line
pub struct FileLogSink {
    path: PathBuf,
    writer: BufWriter<File>,
}

impl FileLogSink {
    /// Create (or truncate) the log file
    pub fn create(path: impl AsRef<Path>) -> Result<Self, LogError> {
        let path = path.as_ref().to_path_buf();
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(&path)
            .map_err(|source| LogError::Create {
                path: path.display().to_string(),
                source,
            })?;
        debug!(path = %path.display(), "Created log file");
        Ok(Self {
            path,
            writer: BufWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LogSink for FileLogSink {
    fn append_line(&mut self, line: &str) -> Result<(), LogError> {
        self.writer.write_all(line.as_bytes())?;
        self.writer.write_all(b"\n")?;
        self.writer.flush()?;
        Ok(())
    }

    fn flush(&mut self) -> Result<(), LogError> {
        self.writer.flush()?;
        self.writer.get_ref().sync_data()?;
        Ok(())
    }
}

/// In-memory sink sharing its lines through a handle
#[derive(Debug, Clone, Default)]
pub struct MemoryLogSink {
    lines: Arc<Mutex<Vec<String>>>,
}

impl MemoryLogSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Copy of every line appended so far
    pub fn lines(&self) -> Vec<String> {
        self.lines.lock().map(|l| l.clone()).unwrap_or_default()
    }
}

impl LogSink for MemoryLogSink {
    fn append_line(&mut self, line: &str) -> Result<(), LogError> {
        self.lines
            .lock()
            .map_err(|e| LogError::Sink(format!("Lock error: {}", e)))?
            .push(line.to_string());
        Ok(())
    }

    fn flush(&mut self) -> Result<(), LogError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_sink_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("log.txt");

        let mut sink = FileLogSink::create(&path).unwrap();
        sink.append_line("a,b").unwrap();
        sink.append_line("c,d").unwrap();
        sink.flush().unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a,b\nc,d\n");
    }

    #[test]
    fn test_file_sink_create_fails_in_missing_dir() {
        let dir = tempfile::tempdir().unwrap();
        let err = FileLogSink::create(dir.path().join("missing/log.txt")).err().unwrap();
        assert!(matches!(err, LogError::Create { .. }));
    }

    #[test]
    fn test_memory_sink_shares_lines() {
        let sink = MemoryLogSink::new();
        let mut writer = sink.clone();
        writer.append_line("x").unwrap();
        assert_eq!(sink.lines(), vec!["x".to_string()]);
    }
}
