//! Video I/O for Fall Watch
//!
//! Provides the frame type shared by every stage of the pipeline and the two
//! codec seams the pipeline consumes:
//! - [`FrameSource`]: sequential decoded frames plus stream metadata
//! - [`ClipWriterFactory`] / [`ClipWriter`]: open, write and finalize a clip
//!
//! The production implementations shell out to `ffprobe`/`ffmpeg` and move raw
//! RGB24 frames over pipes. In-memory doubles live in [`memory`].

pub mod frame;
pub mod memory;
pub mod probe;
pub mod source;
pub mod writer;

pub use frame::VideoFrame;
pub use source::{FfmpegSource, FrameSource, SourceInfo};
pub use writer::{ClipCodec, ClipSpec, ClipWriter, ClipWriterFactory, FfmpegClipWriter, FfmpegClipWriterFactory};

use thiserror::Error;

/// Video I/O error types
#[derive(Error, Debug)]
pub enum VideoError {
    #[error("video file not found: {0}")]
    NotFound(String),

    #[error("cannot open source {path}: {reason}")]
    Open { path: String, reason: String },

    #[error("ffmpeg/ffprobe binary not available: {0}")]
    BinaryMissing(std::io::Error),

    #[error("failed to parse probe output: {0}")]
    Probe(String),

    #[error("frame size mismatch: expected {expected_width}x{expected_height}, got {width}x{height}")]
    FrameSize {
        expected_width: u32,
        expected_height: u32,
        width: u32,
        height: u32,
    },

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("clip encoder exited with {exit_code:?}: {stderr}")]
    Encode {
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("clip writer already closed")]
    Closed,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
