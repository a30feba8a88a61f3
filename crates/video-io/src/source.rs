//! Sequential frame sources

use std::io::{BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

use tracing::{debug, info, warn};

use crate::probe::probe_video;
use crate::{VideoError, VideoFrame};

/// Stream properties known once a source is open
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceInfo {
    /// Native frame width
    pub width: u32,
    /// Native frame height
    pub height: u32,
    /// Native frame rate
    pub fps: f64,
}

/// Decoded frames in presentation order.
///
/// Frames carry a 1-based `sequence` counting every decoded frame, including
/// ones a consumer later skips.
pub trait FrameSource {
    /// Stream properties
    fn info(&self) -> SourceInfo;

    /// Next decoded frame, `None` at end of stream
    fn next_frame(&mut self) -> Result<Option<VideoFrame>, VideoError>;
}

/// Decoder piping raw RGB24 frames out of an `ffmpeg` child process
pub struct FfmpegSource {
    path: PathBuf,
    info: SourceInfo,
    child: Child,
    stdout: BufReader<ChildStdout>,
    decoded: u64,
    finished: bool,
}

impl FfmpegSource {
    /// Probe and open a video file for decoding
    pub fn open(path: impl AsRef<Path>) -> Result<Self, VideoError> {
        let path = path.as_ref().to_path_buf();
        let stream = probe_video(&path)?;

        let mut child = Command::new("ffmpeg")
            .args(["-v", "error", "-nostdin", "-i"])
            .arg(&path)
            .args(["-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(VideoError::BinaryMissing)?;

        let stdout = child.stdout.take().ok_or_else(|| VideoError::Open {
            path: path.to_string_lossy().to_string(),
            reason: "decoder stdout unavailable".to_string(),
        })?;

        info!(
            path = %path.display(),
            width = stream.width,
            height = stream.height,
            fps = stream.fps,
            "Opened video source"
        );

        Ok(Self {
            path,
            info: SourceInfo {
                width: stream.width,
                height: stream.height,
                fps: stream.fps,
            },
            child,
            stdout: BufReader::new(stdout),
            decoded: 0,
            finished: false,
        })
    }

    /// Frames decoded so far
    pub fn decoded(&self) -> u64 {
        self.decoded
    }

    /// Fill `buf` completely; `Ok(false)` on a clean EOF before any byte.
    fn read_frame_bytes(&mut self, buf: &mut [u8]) -> Result<bool, VideoError> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.stdout.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(VideoError::Decode(e.to_string())),
            }
        }

        if filled == 0 {
            return Ok(false);
        }
        if filled < buf.len() {
            warn!(
                path = %self.path.display(),
                bytes = filled,
                expected = buf.len(),
                "Truncated trailing frame dropped"
            );
            return Ok(false);
        }
        Ok(true)
    }
}

impl FrameSource for FfmpegSource {
    fn info(&self) -> SourceInfo {
        self.info
    }

    fn next_frame(&mut self) -> Result<Option<VideoFrame>, VideoError> {
        if self.finished {
            return Ok(None);
        }

        let mut data = vec![0u8; VideoFrame::byte_len(self.info.width, self.info.height)];
        if !self.read_frame_bytes(&mut data)? {
            self.finished = true;
            debug!(path = %self.path.display(), frames = self.decoded, "End of stream");
            return Ok(None);
        }

        self.decoded += 1;
        Ok(Some(VideoFrame::new(data, self.info.width, self.info.height, self.decoded)))
    }
}

impl Drop for FfmpegSource {
    fn drop(&mut self) {
        if !self.finished {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }
}
