//! Clip encoding

use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::{Child, ChildStderr, ChildStdin, Command, Stdio};
use std::thread::{self, JoinHandle};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::{VideoError, VideoFrame};

/// Parameters of a clip to open
#[derive(Debug, Clone, PartialEq)]
pub struct ClipSpec {
    /// Output file path
    pub path: PathBuf,
    /// Playback frame rate
    pub fps: u32,
    /// Frame width (every written frame must match)
    pub width: u32,
    /// Frame height (every written frame must match)
    pub height: u32,
}

/// An open clip.
///
/// `close` finalizes the container and is idempotent. Implementations also
/// finalize on drop so that no exit path leaves a clip unflushed.
pub trait ClipWriter: Send {
    /// Append one frame
    fn write(&mut self, frame: &VideoFrame) -> Result<(), VideoError>;

    /// Flush and finalize
    fn close(&mut self) -> Result<(), VideoError>;

    /// Frames accepted so far
    fn frames_written(&self) -> u64;
}

/// Opens clips
pub trait ClipWriterFactory: Send {
    fn open(&self, spec: &ClipSpec) -> Result<Box<dyn ClipWriter>, VideoError>;
}

/// Encoder used for clips
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipCodec {
    /// MPEG-4 Part 2 (`mp4v`)
    #[default]
    Mpeg4,
    /// H.264 via libx264
    H264,
}

impl ClipCodec {
    fn ffmpeg_name(self) -> &'static str {
        match self {
            ClipCodec::Mpeg4 => "mpeg4",
            ClipCodec::H264 => "libx264",
        }
    }
}

/// Encoder diagnostics kept for error reports; the rest is discarded
const MAX_STDERR_BYTES: u64 = 64 * 1024;

/// Read the encoder's stderr to EOF so a chatty encoder never blocks on a full pipe
fn drain_stderr(pipe: ChildStderr) -> io::Result<JoinHandle<Vec<u8>>> {
    thread::Builder::new()
        .name("clip-encoder-stderr".to_string())
        .spawn(move || {
            let mut pipe = pipe;
            let mut kept = Vec::new();
            let _ = (&mut pipe).take(MAX_STDERR_BYTES).read_to_end(&mut kept);
            let _ = io::copy(&mut pipe, &mut io::sink());
            kept
        })
}

/// Clip writer feeding raw RGB24 frames into an `ffmpeg` encoder process
pub struct FfmpegClipWriter {
    spec: ClipSpec,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    stderr: Option<JoinHandle<Vec<u8>>>,
    frames_written: u64,
}

impl FfmpegClipWriter {
    /// Spawn the encoder for `spec`
    pub fn open(spec: &ClipSpec, codec: ClipCodec) -> Result<Self, VideoError> {
        let size = format!("{}x{}", spec.width, spec.height);
        let rate = spec.fps.max(1).to_string();

        let mut child = Command::new("ffmpeg")
            .args(["-y", "-v", "error", "-f", "rawvideo", "-pix_fmt", "rgb24"])
            .args(["-s", size.as_str(), "-r", rate.as_str(), "-i", "-"])
            .args(["-c:v", codec.ffmpeg_name(), "-pix_fmt", "yuv420p"])
            .arg(&spec.path)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(VideoError::BinaryMissing)?;

        let stdin = child.stdin.take();
        let stderr = match child.stderr.take().map(drain_stderr).transpose() {
            Ok(handle) => handle,
            Err(e) => {
                let _ = child.kill();
                let _ = child.wait();
                return Err(e.into());
            }
        };
        info!(path = %spec.path.display(), size = %size, fps = spec.fps, "Opened clip");

        Ok(Self {
            spec: spec.clone(),
            child: Some(child),
            stdin,
            stderr,
            frames_written: 0,
        })
    }
}

impl ClipWriter for FfmpegClipWriter {
    fn write(&mut self, frame: &VideoFrame) -> Result<(), VideoError> {
        if frame.width != self.spec.width || frame.height != self.spec.height || !frame.is_well_formed() {
            return Err(VideoError::FrameSize {
                expected_width: self.spec.width,
                expected_height: self.spec.height,
                width: frame.width,
                height: frame.height,
            });
        }

        let stdin = self.stdin.as_mut().ok_or(VideoError::Closed)?;
        stdin.write_all(&frame.data)?;
        self.frames_written += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<(), VideoError> {
        // Dropping stdin signals EOF to the encoder
        drop(self.stdin.take());

        let Some(mut child) = self.child.take() else {
            return Ok(());
        };

        let status = child.wait()?;
        let stderr = self
            .stderr
            .take()
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();
        if !status.success() {
            return Err(VideoError::Encode {
                exit_code: status.code(),
                stderr: String::from_utf8_lossy(&stderr).trim().to_string(),
            });
        }

        debug!(path = %self.spec.path.display(), frames = self.frames_written, "Finalized clip");
        Ok(())
    }

    fn frames_written(&self) -> u64 {
        self.frames_written
    }
}

impl Drop for FfmpegClipWriter {
    fn drop(&mut self) {
        if self.child.is_some() {
            if let Err(e) = self.close() {
                warn!(path = %self.spec.path.display(), error = %e, "Clip finalize on drop failed");
            }
        }
    }
}

/// Factory for [`FfmpegClipWriter`]
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegClipWriterFactory {
    pub codec: ClipCodec,
}

impl FfmpegClipWriterFactory {
    pub fn new(codec: ClipCodec) -> Self {
        Self { codec }
    }
}

impl ClipWriterFactory for FfmpegClipWriterFactory {
    fn open(&self, spec: &ClipSpec) -> Result<Box<dyn ClipWriter>, VideoError> {
        Ok(Box::new(FfmpegClipWriter::open(spec, self.codec)?))
    }
}
