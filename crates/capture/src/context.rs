//! Per-run capture context

use fall_detect::{Annotator, ScoredDetection};
use incident_log::{IncidentLog, IncidentLogEntry};
use ring_buffer::FrameRing;
use tracing::debug;
use video_io::VideoFrame;

use crate::config::LogPolicy;
use crate::machine::{CaptureMachine, MachineStats, Transition};
use crate::CaptureError;

/// Everything known about one sampled frame
#[derive(Debug, Clone)]
pub struct FrameRecord {
    /// Decode-order frame number
    pub frame_number: u64,
    /// `frame_number / effective_fps`
    pub time_seconds: f64,
    pub detections: Vec<ScoredDetection>,
}

impl FrameRecord {
    pub fn new(frame_number: u64, effective_fps: u32, detections: Vec<ScoredDetection>) -> Self {
        let time_seconds = if effective_fps == 0 {
            0.0
        } else {
            frame_number as f64 / effective_fps as f64
        };
        Self {
            frame_number,
            time_seconds,
            detections,
        }
    }

    /// Any person in the frame classified as falling
    pub fn any_fall(&self) -> bool {
        self.detections.iter().any(ScoredDetection::is_fall)
    }
}

/// Capture counters for one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CaptureStats {
    pub incidents_opened: u32,
    pub clips_finalized: u32,
    pub clips_aborted: u32,
    pub log_lines: u64,
}

/// Ring buffer, capture machine and incident log of one run
pub struct PipelineContext {
    ring: FrameRing<VideoFrame>,
    machine: CaptureMachine,
    log: IncidentLog,
    log_policy: LogPolicy,
    annotator: Option<Annotator>,
}

impl PipelineContext {
    /// The ring holds one grace period worth of frames
    pub fn new(machine: CaptureMachine, log: IncidentLog, log_policy: LogPolicy, annotator: Option<Annotator>) -> Self {
        Self {
            ring: FrameRing::new(machine.grace_frames() as usize),
            machine,
            log,
            log_policy,
            annotator,
        }
    }

    /// Feed one sampled frame.
    ///
    /// The raw frame enters the ring before the machine steps, so a clip
    /// opened on this frame ends with it. An incident log failure is
    /// returned; clip failures are absorbed by the machine.
    pub fn process(&mut self, frame: VideoFrame, record: &FrameRecord) -> Result<Transition, CaptureError> {
        let fall = record.any_fall();

        self.ring.push(frame);
        metrics::gauge!("fall_watch_ring_fill_ratio").set(self.ring.fill_ratio());

        let Some(raw) = self.ring.latest() else {
            return Ok(Transition::Idle);
        };
        let annotated = match &self.annotator {
            Some(annotator) if self.machine.is_recording() => Some(annotator.annotate(raw, &record.detections)),
            _ => None,
        };
        let transition = self.machine.step(fall, &self.ring, annotated.as_ref().unwrap_or(raw));

        if self.should_log(&transition, fall) {
            if let Some(clip) = transition.clip_filename() {
                for person in &record.detections {
                    self.log
                        .append(&IncidentLogEntry::from_scored(record.time_seconds, person, clip))?;
                }
                debug!(frame = record.frame_number, people = record.detections.len(), clip, "Logged frame");
            }
        }

        Ok(transition)
    }

    fn should_log(&self, transition: &Transition, fall: bool) -> bool {
        match transition {
            Transition::Started { .. } => true,
            Transition::Idle | Transition::Aborted { .. } => false,
            Transition::Extended { .. } | Transition::Grace { .. } | Transition::Finished { .. } => {
                match self.log_policy {
                    LogPolicy::TriggerOnly => false,
                    LogPolicy::FallFrames => fall,
                    LogPolicy::AllFrames => true,
                }
            }
        }
    }

    /// Finalize any open clip, then flush and close the log.
    ///
    /// The clip is closed even when the log close fails.
    pub fn finish(&mut self) -> Result<Option<Transition>, CaptureError> {
        let transition = self.machine.finish();
        self.log.close()?;
        Ok(transition)
    }

    pub fn is_recording(&self) -> bool {
        self.machine.is_recording()
    }

    pub fn ring(&self) -> &FrameRing<VideoFrame> {
        &self.ring
    }

    pub fn stats(&self) -> CaptureStats {
        let MachineStats {
            incidents_opened,
            clips_finalized,
            clips_aborted,
        } = self.machine.stats();
        CaptureStats {
            incidents_opened,
            clips_finalized,
            clips_aborted,
            log_lines: self.log.lines_written(),
        }
    }
}
