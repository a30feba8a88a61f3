//! Run results

use capture::{CaptureStats, FrameRecord};
use fall_detect::FallStatus;
use serde::{Deserialize, Serialize};

/// One scored person in one sampled frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionRecord {
    pub frame_number: u64,
    /// Seconds on the effective time base
    pub time: f64,
    pub track_id: i64,
    /// `"fall"` or `"normal"`
    pub status: FallStatus,
    pub confidence: f32,
    pub fall_score: f32,
    /// `(x1, y1, x2, y2)` in working-resolution pixels
    pub bounding_box: (i32, i32, i32, i32),
}

/// Result handed back to whoever submitted the video
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessingReport {
    /// Every decoded frame, sampled or not
    pub total_frames: u64,
    /// Effective fps
    pub fps: u32,
    pub detections: Vec<DetectionRecord>,
}

impl ProcessingReport {
    pub fn new(fps: u32) -> Self {
        Self {
            total_frames: 0,
            fps,
            detections: Vec::new(),
        }
    }

    /// Append every detection of a sampled frame
    pub fn record(&mut self, frame: &FrameRecord) {
        self.detections.extend(frame.detections.iter().map(|scored| DetectionRecord {
            frame_number: frame.frame_number,
            time: frame.time_seconds,
            track_id: scored.detection.track_id,
            status: scored.status,
            confidence: scored.detection.confidence,
            fall_score: scored.assessment.fall_score,
            bounding_box: scored.detection.bbox.as_tuple(),
        }));
    }

    pub fn fall_count(&self) -> usize {
        self.detections.iter().filter(|d| d.status == FallStatus::Fall).count()
    }

    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

/// Counters summarising one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RunStats {
    pub decoded_frames: u64,
    pub sampled_frames: u64,
    pub incidents_opened: u32,
    pub clips_finalized: u32,
    pub clips_aborted: u32,
    pub log_lines: u64,
    /// The run stopped on cancellation rather than end of stream
    pub cancelled: bool,
}

impl RunStats {
    pub(crate) fn absorb(&mut self, capture: CaptureStats) {
        self.incidents_opened = capture.incidents_opened;
        self.clips_finalized = capture.clips_finalized;
        self.clips_aborted = capture.clips_aborted;
        self.log_lines = capture.log_lines;
    }
}
