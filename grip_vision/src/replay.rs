// THEORY:
// A replay file is a recording of detector output, one JSON object per line:
//
//   {"t": 0.133, "hands": [ <same hand objects the live detector emits> ]}
//
// `t` is seconds on the recording's own clock. Feeding a recording through the
// pipeline reproduces exactly what the live loop would have decided, which makes
// threshold tuning possible without a camera. Blank lines and lines starting with
// `#` are ignored. A malformed line is reported and skipped, like a dropped camera
// frame in the live loop.

use crate::core_modules::dispatcher::{ActionDispatcher, DispatchOutcome, PlaybackTarget};
use crate::core_modules::landmark::HandObservation;
use crate::detection::{DetectorError, HandJson};
use crate::pipeline::{GripPipeline, Report};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("could not open replay {path}: {source}")]
    Open {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not read line {line}: {source}")]
    Read {
        line: usize,
        #[source]
        source: std::io::Error,
    },
    #[error("line {line} is not a replay frame: {source}")]
    Parse {
        line: usize,
        #[source]
        source: serde_json::Error,
    },
    #[error("line {line} has an invalid timestamp {t}")]
    Timestamp { line: usize, t: f64 },
    #[error("line {line}: {source}")]
    Hand {
        line: usize,
        #[source]
        source: DetectorError,
    },
}

impl ReplayError {
    /// I/O failures end the replay, everything else only loses one frame.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ReplayError::Open { .. } | ReplayError::Read { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplayFrame {
    pub t: f64,
    #[serde(default)]
    pub hands: Vec<HandJson>,
}

/// Iterates over the frames of a recording as `(timestamp, hands)`.
pub struct ReplayReader<R> {
    reader: R,
    line: usize,
    buf: String,
}

impl ReplayReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, ReplayError> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| ReplayError::Open {
            path: path.display().to_string(),
            source,
        })?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> ReplayReader<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            line: 0,
            buf: String::new(),
        }
    }

    fn parse(&self, text: &str) -> Result<(Duration, Vec<HandObservation>), ReplayError> {
        let line = self.line;
        let frame: ReplayFrame = serde_json::from_str(text).map_err(|source| ReplayError::Parse { line, source })?;
        let t = Duration::try_from_secs_f64(frame.t).map_err(|_| ReplayError::Timestamp { line, t: frame.t })?;
        let hands = frame
            .hands
            .into_iter()
            .map(HandObservation::try_from)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|source| ReplayError::Hand { line, source })?;
        Ok((t, hands))
    }
}

impl<R: BufRead> Iterator for ReplayReader<R> {
    type Item = Result<(Duration, Vec<HandObservation>), ReplayError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            self.buf.clear();
            self.line += 1;
            match self.reader.read_line(&mut self.buf) {
                Ok(0) => return None,
                Ok(_) => {}
                Err(source) => return Some(Err(ReplayError::Read { line: self.line, source })),
            }
            let text = self.buf.trim();
            if text.is_empty() || text.starts_with('#') {
                continue;
            }
            return Some(self.parse(text));
        }
    }
}

/// Totals for one replay run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplaySummary {
    pub frames: u64,
    pub skipped: u64,
    pub holding_frames: u64,
    pub activations: u64,
    pub playback_started: u64,
}

/// Feeds a whole recording through the pipeline, dispatching every trigger
/// synchronously. Stops on the first fatal error.
pub fn run_replay<R, P>(
    reader: ReplayReader<R>,
    pipeline: &mut GripPipeline,
    dispatcher: &ActionDispatcher,
    target: &mut P,
) -> Result<ReplaySummary, ReplayError>
where
    R: BufRead,
    P: PlaybackTarget + ?Sized,
{
    let mut summary = ReplaySummary::default();

    for item in reader {
        let (t, hands) = match item {
            Ok(frame) => frame,
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                warn!(error = %e, "skipping replay frame");
                summary.skipped += 1;
                continue;
            }
        };

        let analysis = pipeline.process_frame(hands, t);
        summary.frames += 1;
        if analysis.classification.holding {
            summary.holding_frames += 1;
        }

        if let Report::Transition(data) = analysis.report {
            info!(
                t = ?t,
                from = data.previous.as_str(),
                to = data.phase.as_str(),
                "phase changed"
            );
            if let Some(event) = data.trigger {
                summary.activations += 1;
                if dispatcher.dispatch(target, &event) == DispatchOutcome::Started {
                    summary.playback_started += 1;
                }
            }
        }
    }

    Ok(summary)
}
