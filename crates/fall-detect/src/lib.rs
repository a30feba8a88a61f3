//! Fall Detection
//!
//! Per-person analysis of pose tracks:
//! - COCO-17 keypoint layout and validated [`PersonDetection`] records
//! - [`PoseSource`] seam for the external pose/tracking model
//! - Pluggable [`FallScorer`] strategies and the [`FallClassifier`] built from config
//! - [`Annotator`] drawing detection overlays onto frame copies

pub mod annotate;
pub mod classify;
pub mod config;
pub mod detection;
pub mod keypoint;
pub mod scorer;
pub mod source;

pub use annotate::Annotator;
pub use classify::{FallClassifier, FallStatus, ScoredDetection};
pub use config::{ScoringConfig, ScoringPolicy};
pub use detection::{BoundingBox, PersonDetection, RawDetection};
pub use keypoint::{Keypoint, KeypointIndex};
pub use scorer::{AngleReference, FallAssessment, FallScorer, PostureRuleScorer, TorsoSpreadScorer};
pub use source::{PoseSource, TrackReplaySource, TrackedFrame};

use thiserror::Error;

/// Fall detection error types
#[derive(Error, Debug)]
pub enum DetectError {
    #[error("Failed to read pose tracks from {path}: {source}")]
    TrackRead {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed pose track record on line {line}: {reason}")]
    TrackFormat { line: usize, reason: String },

    #[error("Invalid detection: {0}")]
    InvalidDetection(String),

    #[error("Pose inference failed: {0}")]
    Inference(String),
}
