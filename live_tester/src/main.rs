use anyhow::{Context, Result, bail};
use clap::Parser;
use grip_vision::config::PipelineConfig;
use grip_vision::core_modules::dispatcher::{ActionDispatcher, PlaybackError, PlaybackTarget};
use grip_vision::core_modules::dispatch_worker::DispatchWorker;
use grip_vision::core_modules::geometry::geometry::Region;
use grip_vision::detection::{DetectorError, HandDetector};
use grip_vision::pipeline::{DisplayMode, GripPipeline, Report};
use opencv::{
    core::{self, Mat},
    highgui,
    prelude::*,
    videoio::{self, VideoCapture},
};
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

mod detector;
mod overlay;
mod spotify;

use detector::MediaPipeDetector;
use spotify::SpotifyPlayback;

const STATUS_WINDOW: &str = "Status";
const FEED_WINDOW: &str = "Camera Feed";
const FACE_CAM_WINDOW: &str = "Face Cam";

#[derive(Parser, Debug)]
#[command(name = "live_tester", about = "Live camera test bench for grip_vision")]
struct Args {
    /// Camera index passed to OpenCV.
    #[arg(short = 'd', long, default_value_t = 0)]
    camera: i32,

    /// Pipeline config as JSON. `GV_*` environment variables override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Python interpreter with mediapipe installed.
    #[arg(long, default_value = "python3")]
    python: PathBuf,

    /// The MediaPipe helper script.
    #[arg(long, default_value = "live_tester/scripts/hand_detect.py")]
    detector_script: PathBuf,

    /// Only accept hands near the middle of the frame.
    #[arg(long)]
    center_region: bool,

    /// Never call Spotify, only log triggers.
    #[arg(long)]
    no_playback: bool,
}

/// Stands in when Spotify is disabled or not configured.
struct NoPlayback;

impl PlaybackTarget for NoPlayback {
    fn has_active_target(&self) -> bool {
        false
    }

    fn start_playback(&mut self, _track: &str) -> Result<(), PlaybackError> {
        Err(PlaybackError::NoActiveTarget)
    }
}

/// Releases the camera on every exit path.
struct Camera(VideoCapture);

impl Drop for Camera {
    fn drop(&mut self) {
        if let Err(e) = self.0.release() {
            warn!(error = %e, "could not release camera");
        }
    }
}

/// Tracks which optional windows are open and closes everything on drop.
#[derive(Default)]
struct Windows {
    feed_open: bool,
    face_cam_open: bool,
}

impl Windows {
    fn show(&mut self, mode: DisplayMode, frame: &Mat) -> opencv::Result<()> {
        match mode {
            DisplayMode::CameraFeed => {
                if self.face_cam_open {
                    highgui::destroy_window(FACE_CAM_WINDOW)?;
                    self.face_cam_open = false;
                }
                highgui::imshow(FEED_WINDOW, frame)?;
                self.feed_open = true;
            }
            DisplayMode::FaceCam => {
                if self.feed_open {
                    highgui::destroy_window(FEED_WINDOW)?;
                    self.feed_open = false;
                }
                if !self.face_cam_open {
                    let (w, h) = grip_vision::display::FACE_CAM_SIZE;
                    highgui::named_window(FACE_CAM_WINDOW, highgui::WINDOW_NORMAL)?;
                    highgui::resize_window(FACE_CAM_WINDOW, w, h)?;
                    highgui::move_window(FACE_CAM_WINDOW, 100, 100)?;
                    // Not every backend supports it.
                    let _ = highgui::set_window_property(FACE_CAM_WINDOW, highgui::WND_PROP_TOPMOST, 1.0);
                    self.face_cam_open = true;
                    info!("face cam shown");
                }
                highgui::imshow(FACE_CAM_WINDOW, &overlay::face_cam(frame)?)?;
            }
        }
        Ok(())
    }
}

impl Drop for Windows {
    fn drop(&mut self) {
        let _ = highgui::destroy_all_windows();
    }
}

/// `q` or Esc. Some backends set modifier bits above the low byte.
fn is_quit_key(key: i32) -> bool {
    let key = key & 0xFF;
    key == 'q' as i32 || key == 27
}

fn playback_target(args: &Args, config: &PipelineConfig) -> Box<dyn PlaybackTarget + Send> {
    if args.no_playback {
        info!("playback disabled, triggers are only logged");
        return Box::new(NoPlayback);
    }
    match SpotifyPlayback::from_env(config.playback_timeout()) {
        Ok(spotify) => Box::new(spotify),
        Err(e) => {
            warn!(error = %e, "Spotify unavailable, playback disabled");
            Box::new(NoPlayback)
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("grip_vision=info,live_tester=info")),
        )
        .init();

    let args = Args::parse();

    // --- 1. Configuration ---
    let mut config = PipelineConfig::load(args.config.as_deref()).context("loading pipeline config")?;
    if args.center_region {
        config.center_region = Some(Region::original_center());
    }

    // --- 2. Async runtime for the playback worker and Ctrl-C ---
    let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
    let _enter = runtime.enter();

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = Arc::clone(&stop);
        runtime.spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                stop.store(true, Ordering::SeqCst);
            }
        });
    }

    let dispatcher = ActionDispatcher::new(config.track_identifier.clone());
    let mut worker = DispatchWorker::spawn(playback_target(&args, &config), dispatcher, config.playback_timeout());

    // --- 3. Camera and detector ---
    let mut capture = VideoCapture::new(args.camera, videoio::CAP_ANY).context("opening camera")?;
    if !capture.is_opened()? {
        bail!("could not open camera {}", args.camera);
    }
    capture.set(videoio::CAP_PROP_FRAME_WIDTH, 1280.0)?;
    capture.set(videoio::CAP_PROP_FRAME_HEIGHT, 720.0)?;
    let mut camera = Camera(capture);

    let mut detector = MediaPipeDetector::spawn(&args.python, &args.detector_script, &config)?;
    let mut pipeline = GripPipeline::new(config);
    let mut windows = Windows::default();
    info!(camera = args.camera, "running, press q or Esc to quit");

    // --- 4. Main loop ---
    let start = Instant::now();
    let mut raw = Mat::default();
    while !stop.load(Ordering::SeqCst) {
        match camera.0.read(&mut raw) {
            Ok(true) if !raw.empty() => {}
            Ok(true) => {
                warn!("empty frame, skipping");
                continue;
            }
            Ok(false) => {
                info!("camera stream ended");
                break;
            }
            Err(e) => {
                warn!(error = %e, "failed to grab frame, skipping");
                continue;
            }
        }

        // Mirror view, like looking into a mirror.
        let mut frame = Mat::default();
        if let Err(e) = core::flip(&raw, &mut frame, 1) {
            warn!(error = %e, "could not flip frame, skipping");
            continue;
        }

        let hands = match detector.detect(&frame) {
            Ok(hands) => hands,
            Err(DetectorError::Closed) => bail!("hand detector exited"),
            Err(e) => {
                warn!(error = %e, "detection failed, skipping frame");
                continue;
            }
        };

        let analysis = pipeline.process_frame(hands, start.elapsed());
        if let Report::Transition(data) = analysis.report {
            info!(from = data.previous.as_str(), to = data.phase.as_str(), "phase changed");
            if let Some(event) = data.trigger {
                if let Err(e) = worker.submit(event) {
                    warn!(error = %e, "could not hand trigger to playback worker");
                }
            }
        }
        while let Some(report) = worker.try_next_report() {
            info!(activation = report.event.activation, outcome = ?report.outcome, "playback request finished");
        }

        // --- 5. Rendering ---
        overlay::draw_hands(&mut frame, pipeline.carried_hands())?;
        overlay::draw_status_line(&mut frame, &analysis)?;
        highgui::imshow(STATUS_WINDOW, &overlay::status_window(analysis.status)?)?;
        windows.show(analysis.mode, &frame)?;

        if is_quit_key(highgui::wait_key(1)?) {
            info!("quit requested");
            break;
        }
    }

    drop(windows);
    drop(camera);
    drop(detector);
    runtime.block_on(worker.shutdown());
    info!(frames = pipeline.frames_processed(), activations = pipeline.activations(), "stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quit_keys_match_with_modifier_bits_set() {
        assert!(is_quit_key('q' as i32));
        assert!(is_quit_key(27));
        assert!(is_quit_key(0x10_0000 | 'q' as i32));
        assert!(is_quit_key(0x2_0000 | 27));
        assert!(!is_quit_key(-1));
        assert!(!is_quit_key('Q' as i32));
        assert!(!is_quit_key(0x10_0000 | 'w' as i32));
    }
}
