//! Pipeline configuration
//!
//! Layered the usual way: built-in defaults, then an optional TOML file, then
//! `FALL_WATCH__*` environment variables (`__` separates nesting levels, e.g.
//! `FALL_WATCH__CAPTURE__BUFFER_SECONDS=5`).

use std::path::{Path, PathBuf};

use ::config::{Config, Environment, File};
use capture::CaptureConfig;
use fall_detect::ScoringConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::PipelineError;

/// Environment variable prefix
pub const ENV_PREFIX: &str = "FALL_WATCH";

/// Complete pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory receiving clips and the incident log
    pub output_dir: PathBuf,

    /// Working resolution every sampled frame is resized to
    pub frame_width: u32,
    pub frame_height: u32,

    /// Process every Nth decoded frame
    pub frame_stride: u64,

    /// Effective fps = floor(source fps / divisor)
    pub fps_divisor: u32,

    pub scoring: ScoringConfig,
    pub capture: CaptureConfig,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("results"),
            frame_width: 1020,
            frame_height: 600,
            frame_stride: 3,
            fps_divisor: 2,
            scoring: ScoringConfig::default(),
            capture: CaptureConfig::default(),
        }
    }
}

impl PipelineConfig {
    /// Load defaults, then `path` (if any), then the environment
    pub fn load(path: Option<&Path>) -> Result<Self, PipelineError> {
        let mut builder = Config::builder();
        if let Some(path) = path {
            debug!(path = %path.display(), "Loading configuration file");
            builder = builder.add_source(File::from(path).required(true));
        }
        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the driver cannot run with
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.frame_width == 0 || self.frame_height == 0 {
            return Err(PipelineError::InvalidConfig(format!(
                "working resolution {}x{} has a zero dimension",
                self.frame_width, self.frame_height
            )));
        }
        if self.frame_stride == 0 {
            return Err(PipelineError::InvalidConfig("frame_stride must be at least 1".to_string()));
        }
        if self.fps_divisor == 0 {
            return Err(PipelineError::InvalidConfig("fps_divisor must be at least 1".to_string()));
        }
        if self.capture.buffer_seconds == 0 {
            return Err(PipelineError::InvalidConfig(
                "capture.buffer_seconds must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Internal time base for a source running at `source_fps`
    pub fn effective_fps(&self, source_fps: f64) -> Result<u32, PipelineError> {
        let fps = if source_fps.is_finite() && source_fps > 0.0 {
            (source_fps / self.fps_divisor.max(1) as f64).floor()
        } else {
            0.0
        };
        if fps < 1.0 || fps > u32::MAX as f64 {
            return Err(PipelineError::InvalidFrameRate { source_fps });
        }
        Ok(fps as u32)
    }
}
