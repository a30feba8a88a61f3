//! In-memory frame sources and clip writers.
//!
//! Used by tests and by embedders that already hold decoded frames.

use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use crate::{ClipSpec, ClipWriter, ClipWriterFactory, FrameSource, SourceInfo, VideoError, VideoFrame};

/// Frame source over a pre-decoded list of frames
#[derive(Debug)]
pub struct MemorySource {
    info: SourceInfo,
    frames: VecDeque<VideoFrame>,
}

impl MemorySource {
    pub fn new(info: SourceInfo, frames: impl IntoIterator<Item = VideoFrame>) -> Self {
        Self {
            info,
            frames: frames.into_iter().collect(),
        }
    }

    /// `count` solid frames numbered from 1
    pub fn solid(width: u32, height: u32, fps: f64, count: u64) -> Self {
        let frames = (1..=count).map(|seq| VideoFrame::filled(width, height, [(seq % 251) as u8, 0, 0], seq));
        Self::new(SourceInfo { width, height, fps }, frames)
    }
}

impl FrameSource for MemorySource {
    fn info(&self) -> SourceInfo {
        self.info
    }

    fn next_frame(&mut self) -> Result<Option<VideoFrame>, VideoError> {
        Ok(self.frames.pop_front())
    }
}

/// A clip captured by [`MemoryClipWriterFactory`]
#[derive(Debug, Clone)]
pub struct RecordedClip {
    pub path: PathBuf,
    pub fps: u32,
    pub width: u32,
    pub height: u32,
    pub frames: Vec<VideoFrame>,
    pub closed: bool,
}

impl RecordedClip {
    /// Sequence numbers of the written frames, in write order
    pub fn sequences(&self) -> Vec<u64> {
        self.frames.iter().map(|f| f.sequence).collect()
    }
}

/// Shared view of every clip a factory produced
pub type ClipStore = Arc<Mutex<Vec<RecordedClip>>>;

#[derive(Debug, Clone, Copy, Default)]
enum Failure {
    #[default]
    None,
    Open,
    WriteAfter(u64),
}

/// Factory recording clips in memory, with optional failure injection
#[derive(Debug, Clone, Default)]
pub struct MemoryClipWriterFactory {
    store: ClipStore,
    failure: Failure,
}

impl MemoryClipWriterFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `open` fails
    pub fn failing_open() -> Self {
        Self {
            failure: Failure::Open,
            ..Self::default()
        }
    }

    /// Each clip accepts `frames` writes, then every write fails
    pub fn failing_after(frames: u64) -> Self {
        Self {
            failure: Failure::WriteAfter(frames),
            ..Self::default()
        }
    }

    /// Handle to the recorded clips
    pub fn store(&self) -> ClipStore {
        Arc::clone(&self.store)
    }

    /// Copy of the recorded clips
    pub fn clips(&self) -> Vec<RecordedClip> {
        self.store.lock().map(|c| c.clone()).unwrap_or_default()
    }
}

impl ClipWriterFactory for MemoryClipWriterFactory {
    fn open(&self, spec: &ClipSpec) -> Result<Box<dyn ClipWriter>, VideoError> {
        if let Failure::Open = self.failure {
            return Err(VideoError::Open {
                path: spec.path.to_string_lossy().to_string(),
                reason: "injected open failure".to_string(),
            });
        }

        let index = {
            let mut clips = self
                .store
                .lock()
                .map_err(|e| VideoError::Decode(format!("clip store poisoned: {e}")))?;
            clips.push(RecordedClip {
                path: spec.path.clone(),
                fps: spec.fps,
                width: spec.width,
                height: spec.height,
                frames: Vec::new(),
                closed: false,
            });
            clips.len() - 1
        };

        Ok(Box::new(MemoryClipWriter {
            store: Arc::clone(&self.store),
            index,
            fail_after: match self.failure {
                Failure::WriteAfter(n) => Some(n),
                _ => None,
            },
            written: 0,
            closed: false,
        }))
    }
}

struct MemoryClipWriter {
    store: ClipStore,
    index: usize,
    fail_after: Option<u64>,
    written: u64,
    closed: bool,
}

impl MemoryClipWriter {
    fn with_clip<R>(&self, f: impl FnOnce(&mut RecordedClip) -> R) -> Result<R, VideoError> {
        let mut clips = self
            .store
            .lock()
            .map_err(|e| VideoError::Decode(format!("clip store poisoned: {e}")))?;
        clips
            .get_mut(self.index)
            .map(f)
            .ok_or(VideoError::Closed)
    }
}

impl ClipWriter for MemoryClipWriter {
    fn write(&mut self, frame: &VideoFrame) -> Result<(), VideoError> {
        if self.closed {
            return Err(VideoError::Closed);
        }
        if self.fail_after.is_some_and(|limit| self.written >= limit) {
            return Err(VideoError::Io(std::io::Error::new(
                std::io::ErrorKind::BrokenPipe,
                "injected write failure",
            )));
        }

        let frame = frame.clone();
        self.with_clip(|clip| clip.frames.push(frame))?;
        self.written += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), VideoError> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.with_clip(|clip| clip.closed = true)
    }

    fn frames_written(&self) -> u64 {
        self.written
    }
}

impl Drop for MemoryClipWriter {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> ClipSpec {
        ClipSpec {
            path: PathBuf::from("clip.mp4"),
            fps: 15,
            width: 2,
            height: 2,
        }
    }

    #[test]
    fn test_memory_source_order() {
        let mut source = MemorySource::solid(2, 2, 30.0, 3);
        let seqs: Vec<u64> = std::iter::from_fn(|| source.next_frame().unwrap())
            .map(|f| f.sequence)
            .collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }

    #[test]
    fn test_drop_finalizes_clip() {
        let factory = MemoryClipWriterFactory::new();
        {
            let mut writer = factory.open(&spec()).unwrap();
            writer.write(&VideoFrame::filled(2, 2, [1, 1, 1], 1)).unwrap();
        }

        let clips = factory.clips();
        assert_eq!(clips.len(), 1);
        assert!(clips[0].closed);
        assert_eq!(clips[0].sequences(), vec![1]);
    }

    #[test]
    fn test_injected_write_failure() {
        let factory = MemoryClipWriterFactory::failing_after(1);
        let mut writer = factory.open(&spec()).unwrap();
        let frame = VideoFrame::filled(2, 2, [0, 0, 0], 1);

        assert!(writer.write(&frame).is_ok());
        assert!(writer.write(&frame).is_err());
        assert_eq!(writer.frames_written(), 1);
    }

    #[test]
    fn test_injected_open_failure() {
        let factory = MemoryClipWriterFactory::failing_open();
        assert!(factory.open(&spec()).is_err());
        assert!(factory.clips().is_empty());
    }
}
