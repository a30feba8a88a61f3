//! Fall Watch Pipeline
//!
//! Drives one video through the whole chain:
//! decode → sample every Nth frame → resize → pose source → fall scoring →
//! capture context, while collecting a [`ProcessingReport`] of every scored
//! detection.
//!
//! The driver is synchronous. Callers running it from async code should move
//! it onto a blocking thread and cancel it through the shared
//! [`CancellationToken`](tokio_util::sync::CancellationToken).

pub mod config;
pub mod driver;
pub mod report;

pub use config::PipelineConfig;
pub use driver::{FramePipeline, PipelineOutcome, RunTargets};
pub use report::{DetectionRecord, ProcessingReport, RunStats};

use capture::CaptureError;
use fall_detect::DetectError;
use incident_log::LogError;
use thiserror::Error;
use video_io::VideoError;

/// Pipeline error types
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Cannot open source {path}: {source}")]
    SourceOpen {
        path: String,
        #[source]
        source: VideoError,
    },

    #[error("Unusable frame rate: source reports {source_fps} fps")]
    InvalidFrameRate { source_fps: f64 },

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Failed to load configuration: {0}")]
    ConfigLoad(#[from] ::config::ConfigError),

    #[error("Failed to create output directory {path}: {source}")]
    OutputDir {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Video error: {0}")]
    Video(#[from] VideoError),

    #[error("Pose source error: {0}")]
    Detect(#[from] DetectError),

    #[error("Incident log error: {0}")]
    Log(#[from] LogError),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),
}
