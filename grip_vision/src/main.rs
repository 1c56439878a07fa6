// Offline replay runner for the `grip_vision` library.
//
// Feeds a recorded JSON-lines file of detector output through the same pipeline the
// live camera loop uses, logging every phase change and trigger. By default playback
// is a dry run that only logs what it would have started.

use anyhow::{Context, Result};
use clap::Parser;
use grip_vision::config::PipelineConfig;
use grip_vision::core_modules::dispatcher::{ActionDispatcher, PlaybackError, PlaybackTarget};
use grip_vision::pipeline::GripPipeline;
use grip_vision::replay::{ReplayReader, run_replay};
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "grip_vision", about = "Replay recorded hand landmarks through the grip pipeline")]
struct Args {
    /// JSON-lines recording, one `{"t": secs, "hands": [...]}` object per line.
    recording: PathBuf,

    /// Pipeline config as JSON. `GV_*` environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the debounce threshold in seconds.
    #[arg(long)]
    holding_secs: Option<f64>,
}

/// Logs triggers instead of calling a playback service.
struct DryRunPlayback;

impl PlaybackTarget for DryRunPlayback {
    fn has_active_target(&self) -> bool {
        true
    }

    fn start_playback(&mut self, track: &str) -> Result<(), PlaybackError> {
        info!(track, "dry run: would start playback");
        Ok(())
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("grip_vision=info")))
        .init();

    let args = Args::parse();

    let mut config = PipelineConfig::load(args.config.as_deref()).context("loading pipeline config")?;
    if let Some(secs) = args.holding_secs {
        config.holding_duration_secs = secs;
        config.validate().context("--holding-secs")?;
    }

    let reader = ReplayReader::open(&args.recording)?;
    let dispatcher = ActionDispatcher::new(config.track_identifier.clone());
    let mut pipeline = GripPipeline::new(config);

    let summary = run_replay(reader, &mut pipeline, &dispatcher, &mut DryRunPlayback)
        .with_context(|| format!("replaying {}", args.recording.display()))?;

    info!(
        frames = summary.frames,
        skipped = summary.skipped,
        holding_frames = summary.holding_frames,
        activations = summary.activations,
        "replay finished"
    );
    Ok(())
}
