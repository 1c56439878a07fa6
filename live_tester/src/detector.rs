// MediaPipe hand landmarks, driven as a Python subprocess.
//
// Protocol, one exchange per frame:
//   -> width, height, channels (u32 little endian) followed by the raw BGR bytes
//   <- one JSON line, see `grip_vision::detection`
// The helper prints `READY` once its model is loaded.

use anyhow::{Context, Result, bail};
use grip_vision::config::PipelineConfig;
use grip_vision::detection::{DetectorError, HandDetector, parse_detection_line};
use grip_vision::pipeline::HandObservation;
use opencv::core::Mat;
use opencv::prelude::*;
use std::io::{BufRead, BufReader, Write};
use std::path::Path;
use std::process::{Child, ChildStdin, ChildStdout, Command, Stdio};
use tracing::{debug, info, warn};

pub struct MediaPipeDetector {
    process: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    line: String,
}

impl MediaPipeDetector {
    pub fn spawn(python: &Path, script: &Path, config: &PipelineConfig) -> Result<Self> {
        if !script.exists() {
            bail!("hand detection script not found at {}", script.display());
        }

        info!(script = %script.display(), "starting MediaPipe hand detector");
        let mut process = Command::new(python)
            .arg(script)
            .arg("--max-hands")
            .arg(config.max_num_hands.to_string())
            .arg("--min-detection-confidence")
            .arg(config.min_detection_confidence.to_string())
            .arg("--min-tracking-confidence")
            .arg(config.min_tracking_confidence.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .spawn()
            .with_context(|| format!("failed to start {}", python.display()))?;

        let stdin = process.stdin.take().context("detector stdin unavailable")?;
        let stdout = process.stdout.take().context("detector stdout unavailable")?;
        let mut stdout = BufReader::new(stdout);

        let mut ready = String::new();
        stdout.read_line(&mut ready).context("waiting for detector handshake")?;
        if ready.trim() != "READY" {
            let _ = process.kill();
            bail!("hand detector did not signal ready, got {:?}", ready.trim());
        }
        info!("hand detector ready");

        Ok(Self {
            process,
            stdin,
            stdout,
            line: String::new(),
        })
    }
}

impl HandDetector for MediaPipeDetector {
    type Frame = Mat;

    fn detect(&mut self, frame: &Mat) -> Result<Vec<HandObservation>, DetectorError> {
        if frame.empty() {
            return Ok(Vec::new());
        }

        let data = frame.data_bytes().map_err(|e| DetectorError::Frame(e.to_string()))?;
        for value in [frame.cols(), frame.rows(), frame.channels()] {
            let value = u32::try_from(value).map_err(|_| DetectorError::Frame(format!("bad dimension {value}")))?;
            self.stdin.write_all(&value.to_le_bytes())?;
        }
        self.stdin.write_all(data)?;
        self.stdin.flush()?;

        self.line.clear();
        if self.stdout.read_line(&mut self.line)? == 0 {
            return Err(DetectorError::Closed);
        }
        let hands = parse_detection_line(&self.line)?;
        debug!(hands = hands.len(), "detector answered");
        Ok(hands)
    }
}

impl Drop for MediaPipeDetector {
    fn drop(&mut self) {
        if let Err(e) = self.process.kill() {
            warn!(error = %e, "could not stop hand detector");
        }
        let _ = self.process.wait();
    }
}
