//! Fall Clip Capture
//!
//! Turns the per-frame fall flag into bounded video clips:
//! - [`CaptureMachine`]: Idle/Recording lifecycle, at most one open clip
//! - [`RecordingSession`]: the open clip and its grace-period countdown
//! - [`PipelineContext`]: ring buffer, machine and incident log of one run

pub mod config;
pub mod context;
pub mod machine;
pub mod session;

pub use config::{CaptureConfig, LogPolicy};
pub use context::{CaptureStats, FrameRecord, PipelineContext};
pub use machine::{CaptureMachine, ClipSettings, MachineStats, Transition};
pub use session::RecordingSession;

use incident_log::LogError;
use thiserror::Error;

/// Capture error types
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Pre-event buffer must hold at least one frame")]
    ZeroCapacity,

    #[error("Incident log failure: {0}")]
    Log(#[from] LogError),
}
