// THEORY:
// The `landmark` module holds the most fundamental data of the engine: a single
// hand as the landmark detector reports it for one frame. Like the other data
// containers in `core_modules`, a `HandObservation` is "dumb". It knows how to hand
// out its named joints, but it never compares itself to other hands and has no
// memory of previous frames. All measurements live in `geometry`, all decisions in
// the classifiers.
//
// Layout follows the 21-point hand model used by MediaPipe: the wrist, four thumb
// joints, then MCP/PIP/DIP/TIP for the index, middle, ring and pinky fingers.
// Coordinates are normalized to the frame (0..1 per axis, origin top-left); `z` is
// depth relative to the wrist and is ignored by the 2D measurements.

use serde::{Deserialize, Serialize};

/// Number of landmarks reported per hand.
pub const LANDMARK_COUNT: usize = 21;

/// Landmark indices in detector order.
pub mod index {
    pub const WRIST: usize = 0;
    pub const THUMB_CMC: usize = 1;
    pub const THUMB_MCP: usize = 2;
    pub const THUMB_IP: usize = 3;
    pub const THUMB_TIP: usize = 4;
    pub const INDEX_MCP: usize = 5;
    pub const INDEX_PIP: usize = 6;
    pub const INDEX_DIP: usize = 7;
    pub const INDEX_TIP: usize = 8;
    pub const MIDDLE_MCP: usize = 9;
    pub const MIDDLE_PIP: usize = 10;
    pub const MIDDLE_DIP: usize = 11;
    pub const MIDDLE_TIP: usize = 12;
    pub const RING_MCP: usize = 13;
    pub const RING_PIP: usize = 14;
    pub const RING_DIP: usize = 15;
    pub const RING_TIP: usize = 16;
    pub const PINKY_MCP: usize = 17;
    pub const PINKY_PIP: usize = 18;
    pub const PINKY_DIP: usize = 19;
    pub const PINKY_TIP: usize = 20;
}

/// Bones drawn by the debug overlay, as (from, to) landmark indices.
pub const HAND_CONNECTIONS: [(usize, usize); 21] = [
    (0, 1), (1, 2), (2, 3), (3, 4),
    (0, 5), (5, 6), (6, 7), (7, 8),
    (5, 9), (9, 10), (10, 11), (11, 12),
    (9, 13), (13, 14), (14, 15), (15, 16),
    (13, 17), (17, 18), (18, 19), (19, 20),
    (0, 17),
];

/// A single keypoint in normalized frame coordinates.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    pub x: f32,
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Landmark {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y, z: 0.0 }
    }
}

/// Which hand the detector believes it saw. Depending on whether the frame was
/// mirrored this may be the opposite of the person's anatomical hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Handedness {
    Left,
    Right,
}

impl Handedness {
    /// Parses the detector's label ("Left"/"Right", any case).
    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_ascii_lowercase().as_str() {
            "left" => Some(Self::Left),
            "right" => Some(Self::Right),
            _ => None,
        }
    }

    pub fn mirrored(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

/// The four non-thumb fingers. The thumb is left out: its opposable
/// joint makes tip-to-wrist ratios meaningless as a curl measure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Finger {
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; 4] = [Finger::Index, Finger::Middle, Finger::Ring, Finger::Pinky];

    pub fn mcp(self) -> usize {
        match self {
            Finger::Index => index::INDEX_MCP,
            Finger::Middle => index::MIDDLE_MCP,
            Finger::Ring => index::RING_MCP,
            Finger::Pinky => index::PINKY_MCP,
        }
    }

    /// The proximal interphalangeal joint, the reference for curl ratios.
    pub fn pip(self) -> usize {
        self.mcp() + 1
    }

    pub fn tip(self) -> usize {
        self.mcp() + 3
    }
}

/// One detected hand in one frame.
#[derive(Debug, Clone, PartialEq)]
pub struct HandObservation {
    /// All 21 landmarks in detector order.
    pub landmarks: [Landmark; LANDMARK_COUNT],
    pub handedness: Handedness,
    /// Detector confidence (0.0 to 1.0).
    pub score: f32,
}

impl HandObservation {
    pub fn new(landmarks: [Landmark; LANDMARK_COUNT], handedness: Handedness, score: f32) -> Self {
        Self { landmarks, handedness, score }
    }

    pub fn wrist(&self) -> Landmark {
        self.landmarks[index::WRIST]
    }

    pub fn point(&self, idx: usize) -> Landmark {
        self.landmarks[idx]
    }
}

/// Synthetic hands for tests. Fingers point "up" the frame (decreasing y) from the
/// wrist; a curled finger folds its tip back below the PIP joint.
#[cfg(test)]
pub(crate) mod test_support {
    use super::*;

    const FINGER_X: [f32; 4] = [-0.03, -0.01, 0.01, 0.03];

    pub fn hand(handedness: Handedness, wrist: (f32, f32), curled: [bool; 4]) -> HandObservation {
        let (wx, wy) = wrist;
        let mut landmarks = [Landmark::default(); LANDMARK_COUNT];
        landmarks[index::WRIST] = Landmark::new(wx, wy);
        landmarks[index::THUMB_CMC] = Landmark::new(wx - 0.04, wy - 0.02);
        landmarks[index::THUMB_MCP] = Landmark::new(wx - 0.06, wy - 0.05);
        landmarks[index::THUMB_IP] = Landmark::new(wx - 0.07, wy - 0.08);
        landmarks[index::THUMB_TIP] = Landmark::new(wx - 0.08, wy - 0.10);

        for (i, finger) in Finger::ALL.iter().enumerate() {
            let x = wx + FINGER_X[i];
            let mcp = finger.mcp();
            landmarks[mcp] = Landmark::new(x, wy - 0.08);
            landmarks[mcp + 1] = Landmark::new(x, wy - 0.12);
            if curled[i] {
                landmarks[mcp + 2] = Landmark::new(x, wy - 0.10);
                landmarks[mcp + 3] = Landmark::new(x, wy - 0.07);
            } else {
                landmarks[mcp + 2] = Landmark::new(x, wy - 0.15);
                landmarks[mcp + 3] = Landmark::new(x, wy - 0.18);
            }
        }

        HandObservation::new(landmarks, handedness, 0.9)
    }

    pub fn open_hand(handedness: Handedness, wrist: (f32, f32)) -> HandObservation {
        hand(handedness, wrist, [false; 4])
    }

    pub fn fist(handedness: Handedness, wrist: (f32, f32)) -> HandObservation {
        hand(handedness, wrist, [true; 4])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn handedness_labels_parse_case_insensitively() {
        assert_eq!(Handedness::from_label("Left"), Some(Handedness::Left));
        assert_eq!(Handedness::from_label(" RIGHT "), Some(Handedness::Right));
        assert_eq!(Handedness::from_label("both"), None);
        assert_eq!(Handedness::Left.mirrored(), Handedness::Right);
    }

    #[test]
    fn finger_joints_follow_detector_order() {
        assert_eq!(Finger::Index.pip(), index::INDEX_PIP);
        assert_eq!(Finger::Middle.tip(), index::MIDDLE_TIP);
        assert_eq!(Finger::Pinky.mcp(), index::PINKY_MCP);
        assert_eq!(Finger::Pinky.tip(), index::PINKY_TIP);
    }
}
