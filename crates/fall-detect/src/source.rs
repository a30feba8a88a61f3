//! Pose source seam
//!
//! The pose/tracking model runs outside this crate. Its output reaches the
//! pipeline either through a custom [`PoseSource`] or as recorded tracks
//! replayed by [`TrackReplaySource`].

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use video_io::VideoFrame;

use crate::detection::{PersonDetection, RawDetection};
use crate::DetectError;

/// Produces the tracked people visible in a frame.
///
/// Returns an empty list, not an error, when nobody is present. Track ids are
/// stable for one person across consecutive frames and unique within a frame.
pub trait PoseSource {
    fn detect(&mut self, frame: &VideoFrame) -> Result<Vec<PersonDetection>, DetectError>;
}

/// One line of a pose track file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackedFrame {
    /// Decode-order frame number the detections belong to
    pub frame: u64,
    #[serde(default)]
    pub detections: Vec<RawDetection>,
}

/// Replays recorded pose tracks keyed by frame sequence number.
///
/// The file holds one JSON [`TrackedFrame`] per line, with coordinates in the
/// pipeline's working resolution. Frames without a line have no people.
#[derive(Debug, Default)]
pub struct TrackReplaySource {
    frames: HashMap<u64, Vec<PersonDetection>>,
    rejected: usize,
}

impl TrackReplaySource {
    /// Load tracks from a JSON-lines file
    pub fn open(path: impl AsRef<Path>) -> Result<Self, DetectError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| DetectError::TrackRead {
            path: path.display().to_string(),
            source,
        })?;
        let source = Self::from_reader(file)?;
        info!(
            path = %path.display(),
            frames = source.frames.len(),
            rejected = source.rejected,
            "Loaded pose tracks"
        );
        Ok(source)
    }

    /// Load tracks from any reader of JSON lines
    pub fn from_reader(reader: impl Read) -> Result<Self, DetectError> {
        let mut source = Self::default();
        for (idx, line) in BufReader::new(reader).lines().enumerate() {
            let line_no = idx + 1;
            let line = line.map_err(|e| DetectError::TrackFormat {
                line: line_no,
                reason: e.to_string(),
            })?;
            if line.trim().is_empty() {
                continue;
            }

            let tracked: TrackedFrame = serde_json::from_str(&line).map_err(|e| DetectError::TrackFormat {
                line: line_no,
                reason: e.to_string(),
            })?;
            source.insert(tracked);
        }
        Ok(source)
    }

    /// Build from already-parsed frames
    pub fn from_frames(frames: impl IntoIterator<Item = TrackedFrame>) -> Self {
        let mut source = Self::default();
        for tracked in frames {
            source.insert(tracked);
        }
        source
    }

    fn insert(&mut self, tracked: TrackedFrame) {
        let mut people = Vec::with_capacity(tracked.detections.len());
        for raw in tracked.detections {
            match PersonDetection::try_from(raw) {
                Ok(person) => people.push(person),
                Err(e) => {
                    warn!(frame = tracked.frame, error = %e, "Rejected detection");
                    self.rejected += 1;
                }
            }
        }
        self.frames.entry(tracked.frame).or_default().extend(people);
    }

    /// Detections dropped during validation
    pub fn rejected(&self) -> usize {
        self.rejected
    }

    /// Frames with at least one recorded line
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }
}

impl PoseSource for TrackReplaySource {
    fn detect(&mut self, frame: &VideoFrame) -> Result<Vec<PersonDetection>, DetectError> {
        let people = self.frames.remove(&frame.sequence).unwrap_or_default();
        debug!(frame = frame.sequence, people = people.len(), "Replayed detections");
        Ok(people)
    }
}
