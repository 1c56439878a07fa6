// THEORY:
// The `detection` module is the seam between the engine and whatever produces hand
// landmarks. The engine never runs a neural network itself: a `HandDetector` is
// handed a frame and returns the hands it found, already converted into the core
// `HandObservation` type.
//
// The wire format below is shared by the live MediaPipe helper and by recorded
// replay files, so a replay is byte-for-byte what the detector said at the time:
//
//   {"hands":[{"handedness":"Left","score":0.93,"landmarks":[{"x":..,"y":..,"z":..}, ...]}],"error":null}
//
// An empty `hands` list is a valid answer ("no hands this frame"). Anything that
// cannot be turned into exactly 21 landmarks per hand is a protocol error, and the
// caller skips that frame without touching the core state.

use crate::core_modules::landmark::{HandObservation, Handedness, LANDMARK_COUNT, Landmark};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DetectorError {
    #[error("hand has {found} landmarks, expected {expected}")]
    WrongLandmarkCount { expected: usize, found: usize },
    #[error("unknown handedness label {0:?}")]
    UnknownHandedness(String),
    #[error("detector reported an error: {0}")]
    Detector(String),
    #[error("frame could not be sent to the detector: {0}")]
    Frame(String),
    #[error("detector process is not running")]
    Closed,
    #[error("malformed detector output: {0}")]
    Json(#[from] serde_json::Error),
    #[error("detector i/o failed: {0}")]
    Io(#[source] std::io::Error),
}

/// A pipe that is gone means the detector process is gone, which no later frame
/// can recover from.
impl From<std::io::Error> for DetectorError {
    fn from(e: std::io::Error) -> Self {
        use std::io::ErrorKind;
        match e.kind() {
            ErrorKind::BrokenPipe | ErrorKind::UnexpectedEof | ErrorKind::ConnectionReset => DetectorError::Closed,
            _ => DetectorError::Io(e),
        }
    }
}

/// Produces the hands visible in one frame.
pub trait HandDetector {
    type Frame: ?Sized;

    fn detect(&mut self, frame: &Self::Frame) -> Result<Vec<HandObservation>, DetectorError>;
}

/// One hand as it appears on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HandJson {
    pub handedness: String,
    pub score: f32,
    pub landmarks: Vec<Landmark>,
}

/// One detector answer.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    #[serde(default)]
    pub hands: Vec<HandJson>,
    #[serde(default)]
    pub error: Option<String>,
}

impl TryFrom<HandJson> for HandObservation {
    type Error = DetectorError;

    fn try_from(hand: HandJson) -> Result<Self, Self::Error> {
        let handedness =
            Handedness::from_label(&hand.handedness).ok_or_else(|| DetectorError::UnknownHandedness(hand.handedness.clone()))?;
        let found = hand.landmarks.len();
        let landmarks: [Landmark; LANDMARK_COUNT] = hand.landmarks.try_into().map_err(|_| DetectorError::WrongLandmarkCount {
            expected: LANDMARK_COUNT,
            found,
        })?;
        Ok(HandObservation::new(landmarks, handedness, hand.score))
    }
}

impl From<&HandObservation> for HandJson {
    fn from(hand: &HandObservation) -> Self {
        Self {
            handedness: hand.handedness.as_str().to_string(),
            score: hand.score,
            landmarks: hand.landmarks.to_vec(),
        }
    }
}

impl DetectionResult {
    /// Converts every hand, failing the whole frame on the first bad one.
    pub fn into_observations(self) -> Result<Vec<HandObservation>, DetectorError> {
        if let Some(message) = self.error {
            return Err(DetectorError::Detector(message));
        }
        self.hands.into_iter().map(HandObservation::try_from).collect()
    }
}

/// Parses one line of detector output.
pub fn parse_detection_line(line: &str) -> Result<Vec<HandObservation>, DetectorError> {
    let result: DetectionResult = serde_json::from_str(line.trim())?;
    result.into_observations()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::landmark::test_support::fist;

    fn line_for(hands: &[HandObservation]) -> String {
        let result = DetectionResult {
            hands: hands.iter().map(HandJson::from).collect(),
            error: None,
        };
        serde_json::to_string(&result).unwrap()
    }

    #[test]
    fn empty_hands_is_a_valid_frame() {
        assert!(parse_detection_line(r#"{"hands":[],"error":null}"#).unwrap().is_empty());
        assert!(parse_detection_line("{}").unwrap().is_empty());
    }

    #[test]
    fn detector_output_becomes_observations() {
        let original = fist(Handedness::Left, (0.4, 0.6));
        let parsed = parse_detection_line(&line_for(&[original.clone()])).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].handedness, Handedness::Left);
        assert_eq!(parsed[0].landmarks, original.landmarks);
    }

    #[test]
    fn short_landmark_list_is_rejected() {
        let line = r#"{"hands":[{"handedness":"Right","score":0.9,"landmarks":[{"x":0.1,"y":0.2}]}]}"#;
        let err = parse_detection_line(line).unwrap_err();
        assert!(matches!(err, DetectorError::WrongLandmarkCount { expected: 21, found: 1 }));
    }

    #[test]
    fn unknown_label_is_rejected() {
        let mut hand = HandJson::from(&fist(Handedness::Right, (0.5, 0.5)));
        hand.handedness = "Both".into();
        let err = HandObservation::try_from(hand).unwrap_err();
        assert!(matches!(err, DetectorError::UnknownHandedness(label) if label == "Both"));
    }

    #[test]
    fn reported_error_fails_the_frame() {
        let err = parse_detection_line(r#"{"hands":[],"error":"bad frame size"}"#).unwrap_err();
        assert!(matches!(err, DetectorError::Detector(msg) if msg == "bad frame size"));
    }

    #[test]
    fn lost_pipe_means_the_detector_is_closed() {
        use std::io::{Error, ErrorKind};
        assert!(matches!(DetectorError::from(Error::from(ErrorKind::BrokenPipe)), DetectorError::Closed));
        assert!(matches!(DetectorError::from(Error::from(ErrorKind::UnexpectedEof)), DetectorError::Closed));
        assert!(matches!(DetectorError::from(Error::from(ErrorKind::Interrupted)), DetectorError::Io(_)));
    }

    #[test]
    fn garbage_is_a_json_error() {
        assert!(matches!(parse_detection_line("READY?"), Err(DetectorError::Json(_))));
    }
}
