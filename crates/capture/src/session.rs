//! Open recording session

use std::path::PathBuf;

use tracing::debug;
use video_io::{ClipSpec, ClipWriter, ClipWriterFactory, VideoError, VideoFrame};

/// One incident being written to its clip.
///
/// Owns the clip writer; dropping a session finalizes the clip through the
/// writer's own drop.
pub struct RecordingSession {
    /// 1-based incident number within the run
    pub incident_id: u32,
    /// Full clip path
    pub output_path: PathBuf,
    /// Clip file name as written to the incident log
    pub clip_filename: String,
    /// Frames left before the clip closes if no fall is seen
    pub post_event_frames_remaining: u32,
    writer: Box<dyn ClipWriter>,
}

impl RecordingSession {
    /// Open the clip for a new incident
    pub fn open(
        factory: &dyn ClipWriterFactory,
        spec: &ClipSpec,
        incident_id: u32,
        clip_filename: String,
        grace_frames: u32,
    ) -> Result<Self, VideoError> {
        let writer = factory.open(spec)?;
        Ok(Self {
            incident_id,
            output_path: spec.path.clone(),
            clip_filename,
            post_event_frames_remaining: grace_frames,
            writer,
        })
    }

    pub fn write(&mut self, frame: &VideoFrame) -> Result<(), VideoError> {
        self.writer.write(frame)
    }

    pub fn frames_written(&self) -> u64 {
        self.writer.frames_written()
    }

    /// Fall seen: restart the grace period
    pub fn extend(&mut self, grace_frames: u32) {
        self.post_event_frames_remaining = grace_frames;
    }

    /// Quiet frame: count the grace period down, returning what is left
    pub fn tick(&mut self) -> u32 {
        self.post_event_frames_remaining = self.post_event_frames_remaining.saturating_sub(1);
        self.post_event_frames_remaining
    }

    pub fn is_expired(&self) -> bool {
        self.post_event_frames_remaining == 0
    }

    /// Finalize the clip, returning the number of frames it holds
    pub fn close(mut self) -> Result<u64, VideoError> {
        self.writer.close()?;
        debug!(incident = self.incident_id, frames = self.frames_written(), "Session closed");
        Ok(self.frames_written())
    }
}

impl std::fmt::Debug for RecordingSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecordingSession")
            .field("incident_id", &self.incident_id)
            .field("output_path", &self.output_path)
            .field("frames_written", &self.frames_written())
            .field("post_event_frames_remaining", &self.post_event_frames_remaining)
            .finish()
    }
}
