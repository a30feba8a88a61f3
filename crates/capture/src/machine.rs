//! Capture state machine
//!
//! Idle until a frame carries a fall. The trigger opens a clip, backfills it
//! with the pre-event ring (which already ends with the trigger frame) and
//! arms a grace period of one ring capacity. Every later frame is written;
//! a fall restarts the grace period, a quiet frame counts it down, and the
//! clip closes when it reaches zero.

use std::path::PathBuf;

use incident_log::RunStamp;
use ring_buffer::FrameRing;
use tracing::{error, info, warn};
use video_io::{ClipSpec, ClipWriterFactory, VideoError, VideoFrame};

use crate::session::RecordingSession;
use crate::CaptureError;

/// Where and how clips are written
#[derive(Debug, Clone)]
pub struct ClipSettings {
    /// Directory receiving the clips
    pub output_dir: PathBuf,
    /// Run timestamp used in clip names
    pub stamp: RunStamp,
    /// Clip frame rate (effective fps)
    pub fps: u32,
    pub width: u32,
    pub height: u32,
}

/// Outcome of feeding one frame to the machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// No session open and no fall
    Idle,
    /// A new clip was opened and backfilled
    Started {
        incident_id: u32,
        clip_filename: String,
        backfilled: usize,
    },
    /// Fall while recording; grace period restarted
    Extended { incident_id: u32, clip_filename: String },
    /// Quiet frame while recording
    Grace {
        incident_id: u32,
        clip_filename: String,
        remaining: u32,
    },
    /// The grace period ran out (or the run ended) and the clip was finalized
    Finished {
        incident_id: u32,
        clip_filename: String,
        frames_written: u64,
    },
    /// The clip could not be opened, written or finalized
    Aborted { incident_id: u32, reason: String },
}

impl Transition {
    /// Clip the current frame went into, if any
    pub fn clip_filename(&self) -> Option<&str> {
        match self {
            Transition::Started { clip_filename, .. }
            | Transition::Extended { clip_filename, .. }
            | Transition::Grace { clip_filename, .. }
            | Transition::Finished { clip_filename, .. } => Some(clip_filename),
            Transition::Idle | Transition::Aborted { .. } => None,
        }
    }
}

/// Per-run clip counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MachineStats {
    pub incidents_opened: u32,
    pub clips_finalized: u32,
    pub clips_aborted: u32,
}

/// Idle/Recording lifecycle with at most one open clip
pub struct CaptureMachine {
    factory: Box<dyn ClipWriterFactory>,
    settings: ClipSettings,
    grace_frames: u32,
    session: Option<RecordingSession>,
    last_incident: u32,
    stats: MachineStats,
}

impl CaptureMachine {
    /// `grace_frames` is the ring capacity and must be non-zero
    pub fn new(
        factory: Box<dyn ClipWriterFactory>,
        settings: ClipSettings,
        grace_frames: u32,
    ) -> Result<Self, CaptureError> {
        if grace_frames == 0 {
            return Err(CaptureError::ZeroCapacity);
        }
        Ok(Self {
            factory,
            settings,
            grace_frames,
            session: None,
            last_incident: 0,
            stats: MachineStats::default(),
        })
    }

    pub fn grace_frames(&self) -> u32 {
        self.grace_frames
    }

    pub fn is_recording(&self) -> bool {
        self.session.is_some()
    }

    /// The open session, if recording
    pub fn session(&self) -> Option<&RecordingSession> {
        self.session.as_ref()
    }

    pub fn stats(&self) -> MachineStats {
        self.stats
    }

    /// Advance by one sampled frame.
    ///
    /// `ring` must already contain the current frame. `current` is what gets
    /// written when a session is already open (possibly annotated).
    pub fn step(&mut self, fall: bool, ring: &FrameRing<VideoFrame>, current: &VideoFrame) -> Transition {
        let Some(mut session) = self.session.take() else {
            return if fall { self.start(ring) } else { Transition::Idle };
        };

        if fall {
            session.extend(self.grace_frames);
        } else {
            session.tick();
        }

        if let Err(e) = session.write(current) {
            return self.abort(session, e);
        }

        if session.is_expired() {
            return self.close(session);
        }

        let transition = if fall {
            Transition::Extended {
                incident_id: session.incident_id,
                clip_filename: session.clip_filename.clone(),
            }
        } else {
            Transition::Grace {
                incident_id: session.incident_id,
                clip_filename: session.clip_filename.clone(),
                remaining: session.post_event_frames_remaining,
            }
        };
        self.session = Some(session);
        transition
    }

    /// Close any open session (end of stream or cancellation)
    pub fn finish(&mut self) -> Option<Transition> {
        let session = self.session.take()?;
        info!(incident = session.incident_id, "Finalizing clip at end of run");
        Some(self.close(session))
    }

    fn start(&mut self, ring: &FrameRing<VideoFrame>) -> Transition {
        self.last_incident += 1;
        self.stats.incidents_opened += 1;
        metrics::counter!("fall_watch_incidents_total").increment(1);

        let incident_id = self.last_incident;
        let clip_filename = self.settings.stamp.clip_file_name(incident_id);
        let spec = ClipSpec {
            path: self.settings.output_dir.join(&clip_filename),
            fps: self.settings.fps,
            width: self.settings.width,
            height: self.settings.height,
        };

        let mut session = match RecordingSession::open(
            self.factory.as_ref(),
            &spec,
            incident_id,
            clip_filename,
            self.grace_frames,
        ) {
            Ok(session) => session,
            Err(e) => {
                error!(incident = incident_id, path = %spec.path.display(), error = %e, "Failed to open clip");
                self.record_failure();
                return Transition::Aborted {
                    incident_id,
                    reason: e.to_string(),
                };
            }
        };

        let backfill = ring.snapshot();
        for frame in &backfill {
            if let Err(e) = session.write(frame) {
                return self.abort(session, e);
            }
        }

        info!(
            incident = incident_id,
            path = %session.output_path.display(),
            backfilled = backfill.len(),
            "Fall detected, recording started"
        );

        let transition = Transition::Started {
            incident_id,
            clip_filename: session.clip_filename.clone(),
            backfilled: backfill.len(),
        };
        self.session = Some(session);
        transition
    }

    fn close(&mut self, session: RecordingSession) -> Transition {
        let incident_id = session.incident_id;
        let clip_filename = session.clip_filename.clone();
        let path = session.output_path.clone();

        match session.close() {
            Ok(frames_written) => {
                self.stats.clips_finalized += 1;
                info!(incident = incident_id, path = %path.display(), frames = frames_written, "Clip saved");
                Transition::Finished {
                    incident_id,
                    clip_filename,
                    frames_written,
                }
            }
            Err(e) => {
                error!(incident = incident_id, path = %path.display(), error = %e, "Failed to finalize clip");
                self.record_failure();
                Transition::Aborted {
                    incident_id,
                    reason: e.to_string(),
                }
            }
        }
    }

    fn abort(&mut self, session: RecordingSession, cause: VideoError) -> Transition {
        let incident_id = session.incident_id;
        error!(
            incident = incident_id,
            path = %session.output_path.display(),
            frames = session.frames_written(),
            error = %cause,
            "Clip write failed, aborting recording"
        );
        if let Err(e) = session.close() {
            warn!(incident = incident_id, error = %e, "Close after failed write also failed");
        }
        self.record_failure();
        Transition::Aborted {
            incident_id,
            reason: cause.to_string(),
        }
    }

    fn record_failure(&mut self) {
        self.stats.clips_aborted += 1;
        metrics::counter!("fall_watch_clip_failures_total").increment(1);
    }
}

impl Drop for CaptureMachine {
    fn drop(&mut self) {
        if self.session.is_some() {
            let _ = self.finish();
        }
    }
}

impl std::fmt::Debug for CaptureMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureMachine")
            .field("settings", &self.settings)
            .field("grace_frames", &self.grace_frames)
            .field("session", &self.session)
            .field("stats", &self.stats)
            .finish()
    }
}
