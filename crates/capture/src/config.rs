//! Capture configuration

use serde::{Deserialize, Serialize};
use video_io::ClipCodec;

/// Which recording frames produce incident log lines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogPolicy {
    /// Only the frame that opened the clip
    TriggerOnly,
    /// The trigger frame and every later frame with an active fall
    #[default]
    FallFrames,
    /// Every frame written after the trigger
    AllFrames,
}

/// Capture configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptureConfig {
    /// Seconds of pre-event context; also the grace period length
    pub buffer_seconds: u32,

    /// Log line selection while recording
    pub log_policy: LogPolicy,

    /// Draw overlays on frames written after the trigger
    pub annotate_clips: bool,

    /// Clip encoder
    pub codec: ClipCodec,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            buffer_seconds: 3,
            log_policy: LogPolicy::FallFrames,
            annotate_clips: true,
            codec: ClipCodec::Mpeg4,
        }
    }
}

impl CaptureConfig {
    /// Buffer capacity (and grace period) in frames at `fps`
    pub fn capacity_frames(&self, fps: u32) -> usize {
        ring_buffer::capacity_for(self.buffer_seconds, fps)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capacity_is_seconds_times_fps() {
        assert_eq!(CaptureConfig::default().capacity_frames(15), 45);
        assert_eq!(CaptureConfig::default().capacity_frames(0), 0);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config: CaptureConfig = serde_json::from_str(r#"{"log_policy": "all_frames"}"#).unwrap();
        assert_eq!(config.log_policy, LogPolicy::AllFrames);
        assert_eq!(config.buffer_seconds, 3);
        assert!(config.annotate_clips);
    }
}
