// THEORY:
// What the user sees is a pure function of the debounce state. This module decides
// *what* to show (status text, colors, which camera view), and the `live_tester`
// renders it with opencv. Keeping the decision here means the display can be tested
// without a window system.

use crate::core_modules::debounce::{DebounceState, Phase};
use std::time::Duration;

/// A color in OpenCV's BGR channel order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bgr(pub u8, pub u8, pub u8);

pub const STATUS_WINDOW_SIZE: (i32, i32) = (1200, 800);
pub const FACE_CAM_SIZE: (i32, i32) = (400, 300);
pub const FACE_CAM_LABEL: &str = "performative";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayStatus {
    Performative,
    NotPerformative,
}

impl DisplayStatus {
    /// Only a confirmed activation counts. A candidate is still "not performative".
    pub fn from_phase(phase: Phase) -> Self {
        match phase {
            Phase::Active => Self::Performative,
            Phase::Idle | Phase::Candidate => Self::NotPerformative,
        }
    }

    /// Status window text. Lines are separated by `\n`.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Performative => "PERFORMATIVE",
            Self::NotPerformative => "NOT\nPERFORMATIVE",
        }
    }

    pub fn text_color(&self) -> Bgr {
        match self {
            // matcha green
            Self::Performative => Bgr(100, 200, 100),
            Self::NotPerformative => Bgr(0, 0, 255),
        }
    }

    pub fn background(&self) -> Bgr {
        match self {
            Self::Performative => Bgr(40, 50, 30),
            Self::NotPerformative => Bgr(20, 20, 40),
        }
    }
}

/// Which camera view is on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DisplayMode {
    /// The full mirrored camera feed with the landmark overlay.
    CameraFeed,
    /// A small labelled picture-in-picture, shown once an activation has lasted
    /// for the face-cam delay.
    FaceCam,
}

impl DisplayMode {
    pub fn select(state: &DebounceState, t: Duration, face_cam_delay: Duration) -> Self {
        match (state.phase, state.active_since) {
            (Phase::Active, Some(since)) if t.saturating_sub(since) >= face_cam_delay => Self::FaceCam,
            _ => Self::CameraFeed,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn active_since(ms: u64) -> DebounceState {
        DebounceState {
            phase: Phase::Active,
            candidate_since: Some(Duration::ZERO),
            active_since: Some(Duration::from_millis(ms)),
            triggered_for_this_activation: true,
        }
    }

    #[test]
    fn only_active_is_performative() {
        assert_eq!(DisplayStatus::from_phase(Phase::Active), DisplayStatus::Performative);
        assert_eq!(DisplayStatus::from_phase(Phase::Candidate), DisplayStatus::NotPerformative);
        assert_eq!(DisplayStatus::from_phase(Phase::Idle), DisplayStatus::NotPerformative);
        assert_eq!(DisplayStatus::NotPerformative.label().lines().count(), 2);
    }

    #[test]
    fn face_cam_waits_for_the_delay() {
        let delay = Duration::from_secs(1);
        let state = active_since(600);
        assert_eq!(DisplayMode::select(&state, Duration::from_millis(1000), delay), DisplayMode::CameraFeed);
        assert_eq!(DisplayMode::select(&state, Duration::from_millis(1600), delay), DisplayMode::FaceCam);
        assert_eq!(DisplayMode::select(&state, Duration::from_millis(5000), delay), DisplayMode::FaceCam);
    }

    #[test]
    fn leaving_active_returns_to_the_feed() {
        let delay = Duration::from_secs(1);
        assert_eq!(
            DisplayMode::select(&DebounceState::default(), Duration::from_secs(10), delay),
            DisplayMode::CameraFeed
        );
    }
}
