//! ffprobe stream metadata

use std::path::Path;
use std::process::Command;

use serde::Deserialize;
use tracing::debug;

use crate::VideoError;

/// Top-level ffprobe JSON output (`-print_format json -show_streams`).
#[derive(Debug, Deserialize)]
pub struct FfprobeOutput {
    #[serde(default)]
    pub streams: Vec<FfprobeStream>,
}

/// A single stream from ffprobe output.
#[derive(Debug, Deserialize)]
pub struct FfprobeStream {
    pub index: i32,
    pub codec_type: Option<String>,
    pub width: Option<u32>,
    pub height: Option<u32>,
    /// e.g. "30/1" or "30000/1001"
    pub r_frame_rate: Option<String>,
    pub avg_frame_rate: Option<String>,
    pub nb_frames: Option<String>,
}

/// Video stream properties needed to decode and time a stream
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StreamInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

/// Parse an ffprobe rational such as `"30000/1001"` or a plain number.
///
/// Returns `None` for zero denominators and non-positive rates.
pub fn parse_frame_rate(raw: &str) -> Option<f64> {
    let rate = match raw.split_once('/') {
        Some((num, den)) => {
            let num: f64 = num.trim().parse().ok()?;
            let den: f64 = den.trim().parse().ok()?;
            if den == 0.0 {
                return None;
            }
            num / den
        }
        None => raw.trim().parse().ok()?,
    };
    (rate.is_finite() && rate > 0.0).then_some(rate)
}

impl FfprobeOutput {
    /// Parse raw ffprobe JSON
    pub fn parse(json: &str) -> Result<Self, VideoError> {
        serde_json::from_str(json).map_err(|e| VideoError::Probe(e.to_string()))
    }

    /// First video stream with usable dimensions and frame rate
    pub fn video_stream(&self) -> Option<StreamInfo> {
        self.streams
            .iter()
            .filter(|s| s.codec_type.as_deref() == Some("video"))
            .find_map(|s| {
                let fps = s
                    .avg_frame_rate
                    .as_deref()
                    .and_then(parse_frame_rate)
                    .or_else(|| s.r_frame_rate.as_deref().and_then(parse_frame_rate))?;
                Some(StreamInfo {
                    width: s.width.filter(|w| *w > 0)?,
                    height: s.height.filter(|h| *h > 0)?,
                    fps,
                })
            })
    }
}

/// Run `ffprobe` on a video file and return its primary video stream.
pub fn probe_video(path: &Path) -> Result<StreamInfo, VideoError> {
    let display = path.to_string_lossy().to_string();
    if !path.exists() {
        return Err(VideoError::NotFound(display));
    }

    let output = Command::new("ffprobe")
        .args(["-v", "quiet", "-print_format", "json", "-show_streams"])
        .arg(path)
        .output()
        .map_err(VideoError::BinaryMissing)?;

    if !output.status.success() {
        return Err(VideoError::Open {
            path: display,
            reason: format!("ffprobe exited with {:?}", output.status.code()),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let info = FfprobeOutput::parse(&stdout)?
        .video_stream()
        .ok_or_else(|| VideoError::Open {
            path: display.clone(),
            reason: "no decodable video stream".to_string(),
        })?;

    debug!(path = %path.display(), width = info.width, height = info.height, fps = info.fps, "probed video");
    Ok(info)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("30/1"), Some(30.0));
        assert_eq!(parse_frame_rate("25"), Some(25.0));
        let ntsc = parse_frame_rate("30000/1001").unwrap();
        assert!((ntsc - 29.97).abs() < 0.01);
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("abc"), None);
    }

    #[test]
    fn test_video_stream_selection() {
        let json = r#"{
            "streams": [
                {"index": 0, "codec_type": "audio", "r_frame_rate": "0/0"},
                {"index": 1, "codec_type": "video", "width": 1920, "height": 1080,
                 "r_frame_rate": "30/1", "avg_frame_rate": "0/0"}
            ]
        }"#;

        let info = FfprobeOutput::parse(json).unwrap().video_stream().unwrap();
        assert_eq!(info, StreamInfo { width: 1920, height: 1080, fps: 30.0 });
    }

    #[test]
    fn test_no_video_stream() {
        let json = r#"{"streams": [{"index": 0, "codec_type": "audio"}]}"#;
        assert!(FfprobeOutput::parse(json).unwrap().video_stream().is_none());
    }

    proptest! {
        #[test]
        fn prop_integer_rationals_parse_exactly(num in 1u32..240_000, den in 1u32..10_000) {
            let rate = parse_frame_rate(&format!("{num}/{den}")).unwrap();
            prop_assert!((rate - num as f64 / den as f64).abs() < 1e-9);
        }

        #[test]
        fn prop_rates_are_positive_and_finite(raw in "\\PC{0,12}") {
            if let Some(rate) = parse_frame_rate(&raw) {
                prop_assert!(rate.is_finite() && rate > 0.0);
            }
        }
    }

    #[test]
    fn test_missing_file() {
        let err = probe_video(Path::new("/nonexistent/clip.mp4")).unwrap_err();
        assert!(matches!(err, VideoError::NotFound(_)));
    }
}
