// THEORY:
// `PipelineConfig` gathers every tunable of the engine in one place. The defaults are
// the empirically tuned values; deployments can override them from a JSON file and
// then from `GV_*` environment variables (the environment wins), mirroring how the
// rest of the tooling reads its knobs from the environment.

use crate::core_modules::geometry::geometry::Region;
use crate::core_modules::two_hand::ReferencePoint;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Juna by Clairo.
pub const DEFAULT_TRACK_URI: &str = "spotify:track:2mWfVxEo4xZYDaz0v7hYrN";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not read config file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("could not parse config file {path}: {source}")]
    Parse {
        path: String,
        #[source]
        source: serde_json::Error,
    },
    #[error("environment variable {name} has invalid value {value:?}")]
    InvalidEnv { name: &'static str, value: String },
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Configuration for the GripPipeline, allowing for tunable behavior.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Hands scored below this are treated as absent.
    pub min_detection_confidence: f32,
    /// Only consumed by the detector.
    pub min_tracking_confidence: f32,
    /// Passed to the detector; fusion also keeps at most this many hands.
    pub max_num_hands: usize,
    /// Maximum distance between the two hands' reference points (normalized units).
    pub proximity_threshold: f32,
    pub reference_point: ReferencePoint,
    /// A finger is curled when its tip-to-wrist / PIP-to-wrist ratio is below this.
    pub curl_threshold: f32,
    /// How many of the four non-thumb fingers must be curled for a one-hand grip.
    pub min_curled_fingers: usize,
    /// Optional window both classifiers require the hands to be in.
    pub center_region: Option<Region>,
    /// How long holding must be sustained before it is accepted, in seconds.
    pub holding_duration_secs: f64,
    /// How long to stay Active before switching the display to the face cam, in seconds.
    pub face_cam_delay_secs: f64,
    /// How many missed frames a lost hand stays on the debug overlay.
    pub carry_forward_frames: u32,
    /// Track started on every activation.
    pub track_identifier: String,
    /// Upper bound on a single playback request, in seconds.
    pub playback_timeout_secs: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            min_detection_confidence: 0.5,
            min_tracking_confidence: 0.3,
            max_num_hands: 2,
            proximity_threshold: 0.20,
            reference_point: ReferencePoint::Wrist,
            curl_threshold: 0.9,
            min_curled_fingers: 3,
            center_region: None,
            holding_duration_secs: 0.5,
            face_cam_delay_secs: 1.0,
            carry_forward_frames: 5,
            track_identifier: DEFAULT_TRACK_URI.to_string(),
            playback_timeout_secs: 5.0,
        }
    }
}

fn parse_env<T: std::str::FromStr>(name: &'static str, lookup: &impl Fn(&str) -> Option<String>) -> Result<Option<T>, ConfigError> {
    match lookup(name) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidEnv { name, value }),
    }
}

/// Negative and NaN map to zero, anything too large to represent saturates.
fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value.max(0.0)).unwrap_or(Duration::MAX)
}

impl PipelineConfig {
    pub fn holding_duration_threshold(&self) -> Duration {
        secs(self.holding_duration_secs)
    }

    pub fn face_cam_delay(&self) -> Duration {
        secs(self.face_cam_delay_secs)
    }

    pub fn playback_timeout(&self) -> Duration {
        secs(self.playback_timeout_secs)
    }

    /// Reads a JSON config file. Missing fields keep their defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let display = path.display().to_string();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io { path: display.clone(), source })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse { path: display, source })
    }

    /// Loads the file if given, applies `GV_*` overrides and validates.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(p) => Self::from_json_file(p)?,
            None => Self::default(),
        };
        config.apply_env_with(|name| std::env::var(name).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Applies overrides from a variable lookup. Split out from `load` so tests do not
    /// have to touch the process environment.
    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(v) = parse_env("GV_MIN_CONFIDENCE", &lookup)? {
            self.min_detection_confidence = v;
        }
        if let Some(v) = parse_env("GV_MAX_HANDS", &lookup)? {
            self.max_num_hands = v;
        }
        if let Some(v) = parse_env("GV_PROXIMITY_THRESHOLD", &lookup)? {
            self.proximity_threshold = v;
        }
        if let Some(v) = parse_env("GV_CURL_THRESHOLD", &lookup)? {
            self.curl_threshold = v;
        }
        if let Some(v) = parse_env("GV_MIN_CURLED_FINGERS", &lookup)? {
            self.min_curled_fingers = v;
        }
        if let Some(v) = parse_env("GV_HOLDING_SECS", &lookup)? {
            self.holding_duration_secs = v;
        }
        if let Some(v) = parse_env("GV_FACE_CAM_DELAY_SECS", &lookup)? {
            self.face_cam_delay_secs = v;
        }
        if let Some(track) = lookup("GV_TRACK_URI") {
            if !track.trim().is_empty() {
                self.track_identifier = track.trim().to_string();
            }
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if !(0.0..=1.0).contains(&self.min_detection_confidence) {
            return invalid(format!("min_detection_confidence {} is outside 0..=1", self.min_detection_confidence));
        }
        if self.max_num_hands == 0 {
            return invalid("max_num_hands must be at least 1".into());
        }
        if !(self.proximity_threshold > 0.0) {
            return invalid(format!("proximity_threshold {} must be positive", self.proximity_threshold));
        }
        if !(self.curl_threshold > 0.0) {
            return invalid(format!("curl_threshold {} must be positive", self.curl_threshold));
        }
        if !(1..=4).contains(&self.min_curled_fingers) {
            return invalid(format!("min_curled_fingers {} is outside 1..=4", self.min_curled_fingers));
        }
        if !(self.holding_duration_secs >= 0.0) || !self.holding_duration_secs.is_finite() {
            return invalid(format!("holding_duration_secs {} must be a non-negative number", self.holding_duration_secs));
        }
        if !(self.face_cam_delay_secs >= 0.0) || !self.face_cam_delay_secs.is_finite() {
            return invalid(format!("face_cam_delay_secs {} must be a non-negative number", self.face_cam_delay_secs));
        }
        if !(self.playback_timeout_secs > 0.0) || !self.playback_timeout_secs.is_finite() {
            return invalid(format!("playback_timeout_secs {} must be positive", self.playback_timeout_secs));
        }
        if let Some(region) = &self.center_region {
            if !region.is_well_formed() {
                return invalid(format!("center_region {region:?} is inverted"));
            }
        }
        if self.track_identifier.trim().is_empty() {
            return invalid("track_identifier must not be empty".into());
        }
        Ok(())
    }
}
