// THEORY:
// The `dispatcher` module is where a confirmed activation leaves the engine. It owns
// no activation state of its own: the at-most-once guarantee is already enforced by
// the debounce layer, so every `TriggerEvent` that reaches the dispatcher results in
// exactly one call to the playback collaborator.
//
// Failures are reported, never fatal, and never retried inside the same activation.
// The next activation cycle simply tries again.

use crate::core_modules::debounce::TriggerEvent;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("no active playback device")]
    NoActiveTarget,
    #[error("playback request was rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },
    #[error("playback service unreachable: {0}")]
    Transport(String),
    #[error("playback request timed out after {0:?}")]
    TimedOut(std::time::Duration),
}

/// The external music-playback collaborator.
pub trait PlaybackTarget {
    /// Whether there is a device that can currently start playback.
    fn has_active_target(&self) -> bool;

    /// Starts playing the given track on the active device.
    fn start_playback(&mut self, track: &str) -> Result<(), PlaybackError>;
}

impl<T: PlaybackTarget + ?Sized> PlaybackTarget for Box<T> {
    fn has_active_target(&self) -> bool {
        (**self).has_active_target()
    }

    fn start_playback(&mut self, track: &str) -> Result<(), PlaybackError> {
        (**self).start_playback(track)
    }
}

/// What happened to one trigger event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Started,
    NoTarget,
    Failed(PlaybackError),
}

impl DispatchOutcome {
    pub fn is_started(&self) -> bool {
        matches!(self, DispatchOutcome::Started)
    }
}

#[derive(Debug, Clone)]
pub struct ActionDispatcher {
    track_identifier: String,
}

impl ActionDispatcher {
    pub fn new(track_identifier: impl Into<String>) -> Self {
        Self {
            track_identifier: track_identifier.into(),
        }
    }

    pub fn track_identifier(&self) -> &str {
        &self.track_identifier
    }

    /// Calls the collaborator once for this event.
    pub fn dispatch<P: PlaybackTarget + ?Sized>(&self, target: &mut P, event: &TriggerEvent) -> DispatchOutcome {
        if !target.has_active_target() {
            warn!(activation = event.activation, "no playback target available, skipping");
            return DispatchOutcome::NoTarget;
        }

        match target.start_playback(&self.track_identifier) {
            Ok(()) => {
                info!(activation = event.activation, track = %self.track_identifier, "playback started");
                DispatchOutcome::Started
            }
            Err(e) => {
                warn!(activation = event.activation, error = %e, "playback failed");
                DispatchOutcome::Failed(e)
            }
        }
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::RecordingPlayback;
    use super::*;
    use std::time::Duration;

    fn event() -> TriggerEvent {
        TriggerEvent {
            activation: 1,
            candidate_since: Duration::ZERO,
            activated_at: Duration::from_millis(600),
        }
    }

    #[test]
    fn trigger_starts_the_configured_track_once() {
        let dispatcher = ActionDispatcher::new("spotify:track:abc");
        let mut target = RecordingPlayback::available();
        let outcome = dispatcher.dispatch(&mut target, &event());
        assert!(outcome.is_started());
        assert_eq!(target.started, vec!["spotify:track:abc".to_string()]);
    }

    #[test]
    fn missing_target_is_reported_without_a_call() {
        let dispatcher = ActionDispatcher::new("spotify:track:abc");
        let mut target = RecordingPlayback::default();
        assert_eq!(dispatcher.dispatch(&mut target, &event()), DispatchOutcome::NoTarget);
        assert!(target.started.is_empty());
    }

    #[test]
    fn failure_is_returned_not_retried() {
        let dispatcher = ActionDispatcher::new("spotify:track:abc");
        let mut target = RecordingPlayback::available();
        target.fail_with = Some(PlaybackError::Transport("connection reset".into()));
        let outcome = dispatcher.dispatch(&mut target, &event());
        assert!(matches!(outcome, DispatchOutcome::Failed(PlaybackError::Transport(_))));
        assert_eq!(target.started.len(), 1);
    }

    #[test]
    fn boxed_targets_dispatch_through() {
        let dispatcher = ActionDispatcher::new("t");
        let mut target: Box<dyn PlaybackTarget> = Box::new(RecordingPlayback::available());
        assert!(dispatcher.dispatch(&mut target, &event()).is_started());
    }
}
