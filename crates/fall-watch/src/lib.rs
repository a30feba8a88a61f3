//! Fall Watch batch runner
//!
//! Processes one video against its recorded pose tracks, writes fall clips and
//! the incident log, and emits the processing report as JSON.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use fall_detect::TrackReplaySource;
use pipeline::{FramePipeline, PipelineConfig};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Detect falls in a video and capture a clip around each incident
#[derive(Parser, Debug)]
#[command(name = "fall-watch", version, about)]
pub struct Cli {
    /// Video file to process
    pub video: PathBuf,

    /// Pose tracks for the video, one JSON object per sampled frame
    #[arg(short, long)]
    pub tracks: PathBuf,

    /// TOML configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Override the output directory
    #[arg(short, long)]
    pub output_dir: Option<PathBuf>,

    /// Write the report here instead of stdout
    #[arg(long)]
    pub report: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    pub json_logs: bool,
}

/// Install the global subscriber (`RUST_LOG` overrides the `info` default)
pub fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer().with_target(true)).init();
    }
}

/// Resolve configuration from the file, environment and CLI overrides
pub fn resolve_config(cli: &Cli) -> anyhow::Result<PipelineConfig> {
    let mut config = PipelineConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if let Some(dir) = &cli.output_dir {
        config.output_dir = dir.clone();
    }
    Ok(config)
}

/// Run the pipeline on a blocking thread; ctrl-c cancels it between frames
pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = resolve_config(&cli)?;
    let pipeline = FramePipeline::new(config)?;
    let mut poses = TrackReplaySource::open(&cli.tracks)
        .with_context(|| format!("loading pose tracks from {}", cli.tracks.display()))?;

    let cancel = CancellationToken::new();
    let watcher = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, finishing current clip");
                cancel.cancel();
            }
        })
    };

    let video = cli.video.clone();
    let token = cancel.clone();
    let outcome = tokio::task::spawn_blocking(move || pipeline.run_file(&video, &mut poses, &token))
        .await
        .context("pipeline thread panicked")?
        .with_context(|| format!("processing {}", cli.video.display()))?;
    watcher.abort();

    info!(
        frames = outcome.report.total_frames,
        detections = outcome.report.detections.len(),
        falls = outcome.report.fall_count(),
        clips = outcome.stats.clips_finalized,
        cancelled = outcome.stats.cancelled,
        "Run complete"
    );

    let json = outcome.report.to_json_pretty()?;
    match &cli.report {
        Some(path) => {
            tokio::fs::write(path, json)
                .await
                .with_context(|| format!("writing report to {}", path.display()))?;
            info!(path = %path.display(), "Report written");
        }
        None => println!("{json}"),
    }
    Ok(())
}
