//! Frame pipeline driver

use std::fs;
use std::path::{Path, PathBuf};

use capture::{CaptureMachine, ClipSettings, FrameRecord, PipelineContext};
use fall_detect::{Annotator, FallClassifier, PoseSource};
use incident_log::{IncidentLog, RunStamp};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};
use video_io::{ClipWriterFactory, FfmpegClipWriterFactory, FfmpegSource, FrameSource};

use crate::config::PipelineConfig;
use crate::report::{ProcessingReport, RunStats};
use crate::PipelineError;

/// Where one run writes its artifacts
pub struct RunTargets {
    /// Run timestamp shared by the log and every clip name
    pub stamp: RunStamp,
    /// Directory clips are written to
    pub clip_dir: PathBuf,
    pub clips: Box<dyn ClipWriterFactory>,
    pub log: IncidentLog,
}

impl RunTargets {
    /// ffmpeg clips and a file log under `config.output_dir`, created if missing
    pub fn on_disk(config: &PipelineConfig, stamp: RunStamp) -> Result<Self, PipelineError> {
        let dir = &config.output_dir;
        fs::create_dir_all(dir).map_err(|source| PipelineError::OutputDir {
            path: dir.display().to_string(),
            source,
        })?;

        let log = IncidentLog::create_in_dir(dir, &stamp)?;
        Ok(Self {
            stamp,
            clip_dir: dir.clone(),
            clips: Box::new(FfmpegClipWriterFactory::new(config.capture.codec)),
            log,
        })
    }
}

/// Report and counters of a completed run
#[derive(Debug, Clone)]
pub struct PipelineOutcome {
    pub report: ProcessingReport,
    pub stats: RunStats,
}

/// Sequential per-video driver
#[derive(Debug)]
pub struct FramePipeline {
    config: PipelineConfig,
    classifier: FallClassifier,
}

impl FramePipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        config.validate()?;
        let classifier = config.scoring.classifier();
        info!(
            scorer = classifier.scorer_name(),
            stride = config.frame_stride,
            width = config.frame_width,
            height = config.frame_height,
            "Pipeline configured"
        );
        Ok(Self { config, classifier })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Open `video` with ffmpeg and run it, writing artifacts to disk.
    ///
    /// Fails with [`PipelineError::SourceOpen`] before any output is created
    /// when the video cannot be opened.
    pub fn run_file(
        &self,
        video: &Path,
        poses: &mut dyn PoseSource,
        cancel: &CancellationToken,
    ) -> Result<PipelineOutcome, PipelineError> {
        let mut source = FfmpegSource::open(video).map_err(|source| PipelineError::SourceOpen {
            path: video.display().to_string(),
            source,
        })?;
        self.config.effective_fps(source.info().fps)?;

        let targets = RunTargets::on_disk(&self.config, RunStamp::now())?;
        self.run(&mut source, poses, targets, cancel)
    }

    /// Run an already open source to end of stream or cancellation.
    ///
    /// Any open clip is finalized and the log closed on every exit path,
    /// including errors from the source or the pose model.
    pub fn run(
        &self,
        source: &mut dyn FrameSource,
        poses: &mut dyn PoseSource,
        targets: RunTargets,
        cancel: &CancellationToken,
    ) -> Result<PipelineOutcome, PipelineError> {
        let info = source.info();
        let fps = self.config.effective_fps(info.fps)?;
        let capacity = u32::try_from(self.config.capture.capacity_frames(fps))
            .map_err(|_| PipelineError::InvalidConfig("pre-event buffer too large".to_string()))?;

        let settings = ClipSettings {
            output_dir: targets.clip_dir,
            stamp: targets.stamp,
            fps,
            width: self.config.frame_width,
            height: self.config.frame_height,
        };
        let machine = CaptureMachine::new(targets.clips, settings, capacity)?;
        let annotator = self.config.capture.annotate_clips.then(Annotator::default);
        let mut ctx = PipelineContext::new(machine, targets.log, self.config.capture.log_policy, annotator);

        info!(
            source_width = info.width,
            source_height = info.height,
            source_fps = info.fps,
            effective_fps = fps,
            buffer_frames = capacity,
            "Processing started"
        );

        let mut report = ProcessingReport::new(fps);
        let mut stats = RunStats::default();
        let driven = self.drive(source, poses, &mut ctx, cancel, &mut report, &mut stats);

        let finished = ctx.finish();
        stats.absorb(ctx.stats());
        stats.decoded_frames = report.total_frames;

        if let Err(e) = &driven {
            error!(error = %e, frames = report.total_frames, "Processing aborted");
        }
        driven?;
        finished?;

        info!(
            decoded = stats.decoded_frames,
            sampled = stats.sampled_frames,
            incidents = stats.incidents_opened,
            clips = stats.clips_finalized,
            aborted = stats.clips_aborted,
            log_lines = stats.log_lines,
            cancelled = stats.cancelled,
            "Processing finished"
        );
        Ok(PipelineOutcome { report, stats })
    }

    fn drive(
        &self,
        source: &mut dyn FrameSource,
        poses: &mut dyn PoseSource,
        ctx: &mut PipelineContext,
        cancel: &CancellationToken,
        report: &mut ProcessingReport,
        stats: &mut RunStats,
    ) -> Result<(), PipelineError> {
        loop {
            if cancel.is_cancelled() {
                info!(frames = report.total_frames, "Cancellation requested, stopping");
                stats.cancelled = true;
                return Ok(());
            }

            let Some(frame) = source.next_frame()? else {
                debug!(frames = report.total_frames, "End of stream");
                return Ok(());
            };
            report.total_frames += 1;
            if frame.sequence % self.config.frame_stride != 0 {
                continue;
            }

            let frame = frame.resize(self.config.frame_width, self.config.frame_height);
            let people = poses.detect(&frame)?;
            let record = FrameRecord::new(frame.sequence, report.fps, self.classifier.classify_all(people));

            report.record(&record);
            stats.sampled_frames += 1;
            metrics::counter!("fall_watch_frames_processed_total").increment(1);

            ctx.process(frame, &record)?;
        }
    }
}
