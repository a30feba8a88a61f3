//! Incident log records

use std::fmt;

use fall_detect::{BoundingBox, FallStatus, ScoredDetection};
use serde::{Deserialize, Serialize};

/// Column header, written once per log
pub const LOG_HEADER: &str = "Time,TrackID,Status,Confidence,FallScore,BoundingBox,VideoFile";

/// One person in one recorded frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentLogEntry {
    /// Seconds since stream start on the effective time base
    pub time: f64,
    pub track_id: i64,
    pub status: FallStatus,
    pub confidence: f32,
    pub fall_score: f32,
    pub bbox: BoundingBox,
    /// File name of the clip this frame belongs to
    pub clip_filename: String,
}

impl IncidentLogEntry {
    pub fn from_scored(time: f64, scored: &ScoredDetection, clip_filename: &str) -> Self {
        Self {
            time,
            track_id: scored.detection.track_id,
            status: scored.status,
            confidence: scored.detection.confidence,
            fall_score: scored.assessment.fall_score,
            bbox: scored.detection.bbox,
            clip_filename: clip_filename.to_string(),
        }
    }
}

impl fmt::Display for IncidentLogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (x1, y1, x2, y2) = self.bbox.as_tuple();
        write!(
            f,
            "{:.2},{},{},{:.2},{:.2},({}, {}, {}, {}),{}",
            self.time,
            self.track_id,
            self.status,
            self.confidence,
            self.fall_score,
            x1,
            y1,
            x2,
            y2,
            self.clip_filename
        )
    }
}
