//! End-to-end runs over in-memory video, replayed pose tracks and memory sinks

use std::path::PathBuf;

use capture::{CaptureConfig, LogPolicy};
use fall_detect::{DetectError, PersonDetection, PoseSource, RawDetection, TrackReplaySource, TrackedFrame};
use incident_log::{IncidentLog, MemoryLogSink, RunStamp};
use pipeline::{FramePipeline, PipelineConfig, PipelineError, RunTargets};
use tokio_util::sync::CancellationToken;
use video_io::memory::{MemoryClipWriterFactory, MemorySource};
use video_io::{FrameSource, SourceInfo, VideoError, VideoFrame};

const STAMP: &str = "20260101_120000";

fn config() -> PipelineConfig {
    PipelineConfig {
        frame_width: 32,
        frame_height: 24,
        capture: CaptureConfig {
            buffer_seconds: 2,
            log_policy: LogPolicy::FallFrames,
            annotate_clips: false,
            ..Default::default()
        },
        ..Default::default()
    }
}

fn keypoints(points: &[(usize, f32, f32)]) -> Option<Vec<[f32; 3]>> {
    let mut kps = vec![[0.0, 0.0, 0.0]; 17];
    for &(idx, x, y) in points {
        kps[idx] = [x, y, 0.9];
    }
    Some(kps)
}

fn standing(track_id: i64) -> RawDetection {
    RawDetection {
        track_id: Some(track_id),
        bbox: [90.0, 50.0, 150.0, 310.0],
        confidence: 0.9,
        keypoints: keypoints(&[
            (0, 120.0, 60.0),
            (5, 100.0, 100.0),
            (6, 140.0, 100.0),
            (11, 105.0, 200.0),
            (12, 135.0, 200.0),
            (15, 105.0, 300.0),
            (16, 135.0, 300.0),
        ]),
    }
}

fn lying(track_id: i64) -> RawDetection {
    RawDetection {
        track_id: Some(track_id),
        bbox: [50.0, 290.0, 310.0, 350.0],
        confidence: 0.8,
        keypoints: keypoints(&[
            (0, 60.0, 320.0),
            (5, 100.0, 300.0),
            (6, 100.0, 340.0),
            (11, 200.0, 305.0),
            (12, 200.0, 335.0),
            (15, 300.0, 305.0),
            (16, 300.0, 335.0),
        ]),
    }
}

/// One person on every sampled frame of `total` decoded frames, lying on `falls`
fn tracks(total: u64, falls: &[u64]) -> TrackReplaySource {
    TrackReplaySource::from_frames((1..=total).filter(|n| n % 3 == 0).map(|frame| TrackedFrame {
        frame,
        detections: vec![if falls.contains(&frame) { lying(1) } else { standing(1) }],
    }))
}

fn targets() -> (RunTargets, MemoryClipWriterFactory, MemoryLogSink) {
    let factory = MemoryClipWriterFactory::new();
    let sink = MemoryLogSink::new();
    let targets = RunTargets {
        stamp: RunStamp::fixed(STAMP),
        clip_dir: PathBuf::from("results"),
        clips: Box::new(factory.clone()),
        log: IncidentLog::create(Box::new(sink.clone())).unwrap(),
    };
    (targets, factory, sink)
}

#[test]
fn single_fall_produces_one_clip_and_report() {
    // 900 decoded frames at 30 fps: 300 sampled, effective 15 fps, 30-frame buffer
    let pipeline = FramePipeline::new(config()).unwrap();
    let mut source = MemorySource::solid(64, 48, 30.0, 900);
    let mut poses = tracks(900, &[450]);
    let (targets, factory, sink) = targets();

    let outcome = pipeline
        .run(&mut source, &mut poses, targets, &CancellationToken::new())
        .unwrap();

    let clips = factory.clips();
    assert_eq!(clips.len(), 1);
    let expected: Vec<u64> = (121..=180).map(|n| n * 3).collect();
    assert_eq!(clips[0].sequences(), expected);
    assert_eq!((clips[0].width, clips[0].height, clips[0].fps), (32, 24, 15));
    assert!(clips[0].closed);
    assert_eq!(
        clips[0].path,
        PathBuf::from("results/fall_detection_20260101_120000_incident_1.mp4")
    );
    assert!(clips[0].frames.iter().all(|f| f.width == 32 && f.height == 24));

    let lines = sink.lines();
    assert_eq!(lines.len(), 2);
    assert!(lines[1].starts_with("30.00,1,Fall,0.80,"));
    assert!(lines[1].ends_with("(50, 290, 310, 350),fall_detection_20260101_120000_incident_1.mp4"));

    assert_eq!(outcome.report.total_frames, 900);
    assert_eq!(outcome.report.fps, 15);
    assert_eq!(outcome.report.detections.len(), 300);
    assert_eq!(outcome.report.fall_count(), 1);
    assert_eq!(outcome.stats.sampled_frames, 300);
    assert_eq!(outcome.stats.clips_finalized, 1);
    assert_eq!(outcome.stats.log_lines, 1);
    assert!(!outcome.stats.cancelled);
}

#[test]
fn quiet_video_writes_only_the_log_header() {
    let pipeline = FramePipeline::new(config()).unwrap();
    let mut source = MemorySource::solid(64, 48, 30.0, 90);
    let mut poses = tracks(90, &[]);
    let (targets, factory, sink) = targets();

    let outcome = pipeline
        .run(&mut source, &mut poses, targets, &CancellationToken::new())
        .unwrap();

    assert!(factory.clips().is_empty());
    assert_eq!(sink.lines().len(), 1);
    assert_eq!(outcome.report.detections.len(), 30);
}

/// Cancels the token once `after` frames have been handed out
struct CancelAfter {
    inner: MemorySource,
    token: CancellationToken,
    after: u64,
    served: u64,
}

impl FrameSource for CancelAfter {
    fn info(&self) -> SourceInfo {
        self.inner.info()
    }

    fn next_frame(&mut self) -> Result<Option<VideoFrame>, VideoError> {
        self.served += 1;
        if self.served >= self.after {
            self.token.cancel();
        }
        self.inner.next_frame()
    }
}

#[test]
fn cancellation_while_recording_finalizes_clip() {
    let pipeline = FramePipeline::new(config()).unwrap();
    let token = CancellationToken::new();
    let mut source = CancelAfter {
        inner: MemorySource::solid(64, 48, 30.0, 900),
        token: token.clone(),
        after: 480,
        served: 0,
    };
    let mut poses = tracks(900, &[450]);
    let (targets, factory, _) = targets();

    let outcome = pipeline.run(&mut source, &mut poses, targets, &token).unwrap();

    assert!(outcome.stats.cancelled);
    assert_eq!(outcome.report.total_frames, 480);
    let clips = factory.clips();
    assert_eq!(clips.len(), 1);
    assert!(clips[0].closed);
    assert_eq!(clips[0].sequences().last(), Some(&480));
}

#[test]
fn cancelled_before_start_processes_nothing() {
    let pipeline = FramePipeline::new(config()).unwrap();
    let token = CancellationToken::new();
    token.cancel();
    let mut source = MemorySource::solid(64, 48, 30.0, 30);
    let mut poses = tracks(30, &[3]);
    let (targets, factory, _) = targets();

    let outcome = pipeline.run(&mut source, &mut poses, targets, &token).unwrap();
    assert!(outcome.stats.cancelled);
    assert_eq!(outcome.report.total_frames, 0);
    assert!(factory.clips().is_empty());
}

/// Pose model that fails on one frame
struct FailingPoses {
    inner: TrackReplaySource,
    fail_on: u64,
}

impl PoseSource for FailingPoses {
    fn detect(&mut self, frame: &VideoFrame) -> Result<Vec<PersonDetection>, DetectError> {
        if frame.sequence == self.fail_on {
            return Err(DetectError::Inference("model crashed".to_string()));
        }
        self.inner.detect(frame)
    }
}

#[test]
fn pose_failure_still_closes_open_clip() {
    let pipeline = FramePipeline::new(config()).unwrap();
    let mut source = MemorySource::solid(64, 48, 30.0, 900);
    let mut poses = FailingPoses {
        inner: tracks(900, &[450]),
        fail_on: 471,
    };
    let (targets, factory, _) = targets();

    let err = pipeline
        .run(&mut source, &mut poses, targets, &CancellationToken::new())
        .unwrap_err();

    assert!(matches!(err, PipelineError::Detect(_)));
    let clips = factory.clips();
    assert_eq!(clips.len(), 1);
    assert!(clips[0].closed);
    assert_eq!(clips[0].sequences().last(), Some(&468));
}

#[test]
fn slow_source_is_rejected() {
    let pipeline = FramePipeline::new(config()).unwrap();
    let mut source = MemorySource::solid(8, 8, 1.0, 10);
    let mut poses = tracks(10, &[]);
    let (targets, factory, _) = targets();

    let err = pipeline
        .run(&mut source, &mut poses, targets, &CancellationToken::new())
        .unwrap_err();
    assert!(matches!(err, PipelineError::InvalidFrameRate { .. }));
    assert!(factory.clips().is_empty());
}

#[test]
fn unreadable_video_fails_before_creating_outputs() {
    let dir = tempfile::tempdir().unwrap();
    let out = dir.path().join("out");
    let pipeline = FramePipeline::new(PipelineConfig {
        output_dir: out.clone(),
        ..config()
    })
    .unwrap();
    let mut poses = tracks(0, &[]);

    let err = pipeline
        .run_file(&dir.path().join("missing.mp4"), &mut poses, &CancellationToken::new())
        .unwrap_err();

    assert!(matches!(err, PipelineError::SourceOpen { .. }));
    assert!(!out.exists());
}

#[test]
fn all_frames_policy_logs_every_recorded_frame() {
    let mut cfg = config();
    cfg.capture.log_policy = LogPolicy::AllFrames;
    let pipeline = FramePipeline::new(cfg).unwrap();
    let mut source = MemorySource::solid(64, 48, 30.0, 900);
    let mut poses = tracks(900, &[450]);
    let (targets, _, _) = targets();

    let outcome = pipeline
        .run(&mut source, &mut poses, targets, &CancellationToken::new())
        .unwrap();

    // trigger frame plus the 30-frame grace period, one person each
    assert_eq!(outcome.stats.log_lines, 31);
}
