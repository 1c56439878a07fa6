// THEORY:
// The `pipeline` module is the final, top-level API for the entire engine. It owns
// every piece of cross-frame state (fusion's display memory and the debounce state
// machine) and threads it through one call per frame:
//
//   hands -> gate -> classify -> fuse -> debounce -> display decision + report
//
// Callers only ever see the resulting `FrameAnalysis`. A `Report` flags the frames
// where something actionable happened, most importantly the activation that
// carries the one-shot `TriggerEvent` for the dispatcher.

use crate::config::PipelineConfig;
use crate::core_modules::debounce::HoldDebouncer;
use crate::core_modules::frame_fusion::FrameFusion;
use std::time::Duration;
use tracing::debug;

// Re-export key data structures for the public API.
pub use crate::core_modules::debounce::{DebounceState, Phase, TriggerEvent};
pub use crate::core_modules::frame_fusion::{CarriedHand, FrameClassification};
pub use crate::core_modules::landmark::{HandObservation, Handedness, Landmark};
pub use crate::display::{DisplayMode, DisplayStatus};

/// The detailed data package for a phase change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionData {
    pub previous: Phase,
    pub phase: Phase,
    /// Present only on the Candidate -> Active edge of a fresh activation.
    pub trigger: Option<TriggerEvent>,
    /// How long the activation lasted, set when leaving Active.
    pub active_for: Option<Duration>,
}

/// The primary output of the pipeline for a single frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Report {
    NoTransition,
    Transition(TransitionData),
}

impl Report {
    pub fn trigger(&self) -> Option<TriggerEvent> {
        match self {
            Report::Transition(data) => data.trigger,
            Report::NoTransition => None,
        }
    }
}

/// Everything the control loop needs after one frame.
#[derive(Debug, Clone)]
pub struct FrameAnalysis {
    pub frame_id: u64,
    pub timestamp: Duration,
    pub classification: FrameClassification,
    /// The gated hands the classifiers looked at.
    pub hands: Vec<HandObservation>,
    pub phase: Phase,
    pub status: DisplayStatus,
    pub mode: DisplayMode,
    pub report: Report,
}

impl FrameAnalysis {
    pub fn trigger(&self) -> Option<TriggerEvent> {
        self.report.trigger()
    }
}

/// The main, top-level struct for the engine.
pub struct GripPipeline {
    fusion: FrameFusion,
    debouncer: HoldDebouncer,
    config: PipelineConfig,
    frames_processed: u64,
}

impl GripPipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            fusion: FrameFusion::new(&config),
            debouncer: HoldDebouncer::new(config.holding_duration_threshold()),
            config,
            frames_processed: 0,
        }
    }

    /// Runs one frame and reports whether it fired the playback trigger.
    pub fn holding_confirmed(&mut self, observations: Vec<HandObservation>, t: Duration) -> bool {
        self.process_frame(observations, t).trigger().is_some()
    }

    pub fn process_frame(&mut self, observations: Vec<HandObservation>, t: Duration) -> FrameAnalysis {
        let frame_id = self.frames_processed;
        self.frames_processed += 1;

        // Stage 1: gating, both classifiers and OR fusion
        let fused = self.fusion.fuse(observations);
        let classification = fused.classification;

        // Stage 2: temporal debounce
        let active_since = self.debouncer.state().active_since;
        let update = self.debouncer.update(t, classification.holding);

        // Stage 3: display decision
        let state = self.debouncer.state();
        let status = DisplayStatus::from_phase(update.phase);
        let mode = DisplayMode::select(state, t, self.config.face_cam_delay());

        let report = if update.changed() {
            let active_for = match (update.previous, active_since) {
                (Phase::Active, Some(since)) => Some(t.saturating_sub(since)),
                _ => None,
            };
            Report::Transition(TransitionData {
                previous: update.previous,
                phase: update.phase,
                trigger: update.trigger,
                active_for,
            })
        } else {
            Report::NoTransition
        };

        debug!(
            frame = frame_id,
            hands = classification.hand_count,
            holding = classification.holding,
            phase = update.phase.as_str(),
            "frame classified"
        );

        FrameAnalysis {
            frame_id,
            timestamp: t,
            classification,
            hands: fused.hands,
            phase: update.phase,
            status,
            mode,
            report,
        }
    }

    /// Back to Idle, e.g. after the camera was reopened.
    pub fn reset(&mut self) {
        self.debouncer.reset();
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn debounce_state(&self) -> &DebounceState {
        self.debouncer.state()
    }

    pub fn activations(&self) -> u64 {
        self.debouncer.activations()
    }

    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Hands for the debug overlay, including briefly lost ones.
    pub fn carried_hands(&self) -> impl Iterator<Item = &CarriedHand> {
        self.fusion.carried_hands()
    }

    pub fn fusion(&self) -> &FrameFusion {
        &self.fusion
    }
}
