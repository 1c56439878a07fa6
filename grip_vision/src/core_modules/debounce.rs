// THEORY:
// The `debounce` module is the heart of the temporal layer. The per-frame `holding`
// signal is noisy: a single misdetected frame would otherwise flip the display and
// fire the playback trigger. This module filters it through an explicit finite-state
// machine that only accepts a "holding" state after it has been sustained for a
// minimum duration.
//
// States and transitions, evaluated once per processed frame at time `t`:
//
//   | phase     | holding = true                                   | holding = false       |
//   |-----------|--------------------------------------------------|-----------------------|
//   | Idle      | -> Candidate, candidate_since = t, triggered = no | stay Idle             |
//   | Candidate | -> Active once t - candidate_since > threshold   | -> Idle               |
//   | Active    | stay Active                                      | -> Idle               |
//
// Key principles:
// 1.  **One owned state object**: `DebounceState` is the only mutable state in the core.
//     It lives inside `HoldDebouncer`, which is owned by the pipeline and threaded
//     explicitly through the control loop.
// 2.  **At most one trigger per activation**: entering Active emits one `TriggerEvent`
//     and latches `triggered_for_this_activation`. The latch is only cleared on the
//     Idle -> Candidate edge, so a new trigger requires a full Idle -> Candidate ->
//     Active cycle.
// 3.  **Clock agnostic**: timestamps are `Duration` offsets on whatever clock the caller
//     uses (live capture or a recorded replay). A timestamp that runs backwards counts
//     as zero elapsed time.

use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Phase {
    #[default]
    Idle,
    /// Holding has been seen, but not yet for long enough.
    Candidate,
    /// Holding has been sustained past the threshold.
    Active,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Candidate => "candidate",
            Phase::Active => "active",
        }
    }
}

/// The debounce state carried from one frame to the next.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DebounceState {
    pub phase: Phase,
    /// Start of the current unbroken run of holding frames. Set iff phase is
    /// Candidate or Active.
    pub candidate_since: Option<Duration>,
    /// When phase last entered Active. Set iff phase is Active.
    pub active_since: Option<Duration>,
    pub triggered_for_this_activation: bool,
}

/// Emitted exactly once per activation, on the Candidate -> Active edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerEvent {
    /// 1-based count of activations since the debouncer was created.
    pub activation: u64,
    pub candidate_since: Duration,
    pub activated_at: Duration,
}

impl TriggerEvent {
    /// How long holding was sustained before the activation was accepted.
    pub fn held_for(&self) -> Duration {
        self.activated_at.saturating_sub(self.candidate_since)
    }
}

/// The outcome of feeding one frame into the state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebounceUpdate {
    pub previous: Phase,
    pub phase: Phase,
    pub trigger: Option<TriggerEvent>,
}

impl DebounceUpdate {
    pub fn changed(&self) -> bool {
        self.previous != self.phase
    }
}

pub struct HoldDebouncer {
    state: DebounceState,
    holding_duration_threshold: Duration,
    activations: u64,
}

impl HoldDebouncer {
    pub fn new(holding_duration_threshold: Duration) -> Self {
        Self {
            state: DebounceState::default(),
            holding_duration_threshold,
            activations: 0,
        }
    }

    pub fn state(&self) -> &DebounceState {
        &self.state
    }

    pub fn phase(&self) -> Phase {
        self.state.phase
    }

    pub fn threshold(&self) -> Duration {
        self.holding_duration_threshold
    }

    pub fn activations(&self) -> u64 {
        self.activations
    }

    /// Advances the state machine by one frame.
    pub fn update(&mut self, t: Duration, holding: bool) -> DebounceUpdate {
        let previous = self.state.phase;
        let mut trigger = None;

        match (previous, holding) {
            (Phase::Idle, true) => {
                self.state = DebounceState {
                    phase: Phase::Candidate,
                    candidate_since: Some(t),
                    active_since: None,
                    triggered_for_this_activation: false,
                };
                debug!(t = ?t, "holding candidate started");
            }
            (Phase::Idle, false) => {}
            (Phase::Candidate, true) => {
                let since = self.state.candidate_since.unwrap_or(t);
                let elapsed = t.saturating_sub(since);
                if elapsed > self.holding_duration_threshold {
                    self.state.phase = Phase::Active;
                    self.state.active_since = Some(t);
                    if !self.state.triggered_for_this_activation {
                        self.state.triggered_for_this_activation = true;
                        self.activations += 1;
                        let event = TriggerEvent {
                            activation: self.activations,
                            candidate_since: since,
                            activated_at: t,
                        };
                        info!(activation = event.activation, held_for = ?event.held_for(), "holding confirmed");
                        trigger = Some(event);
                    }
                }
            }
            (Phase::Candidate, false) => {
                debug!(t = ?t, "holding candidate dropped before threshold");
                self.state.phase = Phase::Idle;
                self.state.candidate_since = None;
            }
            (Phase::Active, true) => {}
            (Phase::Active, false) => {
                let active_for = self
                    .state
                    .active_since
                    .map(|since| t.saturating_sub(since))
                    .unwrap_or_default();
                info!(active_for = ?active_for, "holding released");
                self.state.phase = Phase::Idle;
                self.state.candidate_since = None;
                self.state.active_since = None;
            }
        }

        DebounceUpdate {
            previous,
            phase: self.state.phase,
            trigger,
        }
    }

    /// Returns to the initial state, keeping the activation count.
    pub fn reset(&mut self) {
        self.state = DebounceState::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> Duration {
        Duration::from_millis(v)
    }

    /// Feeds `holding` at every `step` ms from `start` up to and including `end`.
    fn feed(
        debouncer: &mut HoldDebouncer,
        start: u64,
        end: u64,
        step: u64,
        holding: bool,
    ) -> Vec<DebounceUpdate> {
        (start..=end)
            .step_by(step as usize)
            .map(|t| debouncer.update(ms(t), holding))
            .collect()
    }

    fn assert_invariants(state: &DebounceState) {
        match state.phase {
            Phase::Idle => {
                assert!(state.candidate_since.is_none());
                assert!(state.active_since.is_none());
            }
            Phase::Candidate => {
                assert!(state.candidate_since.is_some());
                assert!(state.active_since.is_none());
            }
            Phase::Active => {
                assert!(state.candidate_since.is_some());
                assert!(state.active_since.is_some());
            }
        }
    }

    #[test]
    fn starts_idle() {
        let debouncer = HoldDebouncer::new(ms(500));
        assert_eq!(*debouncer.state(), DebounceState::default());
        assert_eq!(debouncer.phase(), Phase::Idle);
    }

    #[test]
    fn seven_frames_at_ten_hertz_activate_on_the_last() {
        let mut debouncer = HoldDebouncer::new(ms(500));
        let updates = feed(&mut debouncer, 0, 600, 100, true);

        for update in &updates[..6] {
            assert_eq!(update.phase, Phase::Candidate);
            assert!(update.trigger.is_none());
        }
        assert_eq!(updates[6].phase, Phase::Active);
        assert_eq!(updates.iter().filter(|u| u.trigger.is_some()).count(), 1);

        let event = updates[6].trigger.unwrap();
        assert_eq!(event.activated_at, ms(600));
        assert_eq!(event.candidate_since, ms(0));
        assert_eq!(event.held_for(), ms(600));
    }

    #[test]
    fn signal_shorter_than_threshold_never_activates() {
        let mut debouncer = HoldDebouncer::new(ms(500));
        let mut updates = feed(&mut debouncer, 0, 490, 10, true);
        updates.extend(feed(&mut debouncer, 500, 1500, 10, false));
        assert!(updates.iter().all(|u| u.phase != Phase::Active));
        assert!(updates.iter().all(|u| u.trigger.is_none()));
        assert_eq!(debouncer.phase(), Phase::Idle);
    }

    #[test]
    fn sustained_signal_activates_just_past_threshold() {
        let mut debouncer = HoldDebouncer::new(ms(500));
        let updates = feed(&mut debouncer, 0, 520, 10, true);
        let first_active = updates.iter().position(|u| u.phase == Phase::Active).unwrap();
        let event = updates[first_active].trigger.expect("activation must trigger");
        assert_eq!(event.activated_at, ms(510));
        assert_eq!(updates.iter().filter(|u| u.trigger.is_some()).count(), 1);
    }

    #[test]
    fn long_active_run_triggers_once() {
        let mut debouncer = HoldDebouncer::new(ms(300));
        let updates = feed(&mut debouncer, 0, 60_000, 33, true);
        assert_eq!(updates.iter().filter(|u| u.trigger.is_some()).count(), 1);
        assert_eq!(debouncer.phase(), Phase::Active);
        assert!(debouncer.state().triggered_for_this_activation);
    }

    #[test]
    fn new_trigger_requires_a_full_cycle() {
        let mut debouncer = HoldDebouncer::new(ms(200));
        let first = feed(&mut debouncer, 0, 1000, 50, true);
        assert_eq!(first.iter().filter(|u| u.trigger.is_some()).count(), 1);

        let release = debouncer.update(ms(1050), false);
        assert_eq!(release.previous, Phase::Active);
        assert_eq!(release.phase, Phase::Idle);
        assert_invariants(debouncer.state());

        let second = feed(&mut debouncer, 1100, 2000, 50, true);
        let triggers: Vec<_> = second.iter().filter_map(|u| u.trigger).collect();
        assert_eq!(triggers.len(), 1);
        assert_eq!(triggers[0].activation, 2);
        assert_eq!(triggers[0].candidate_since, ms(1100));
    }

    #[test]
    fn aborted_cycle_leaves_no_residue() {
        let mut fresh = HoldDebouncer::new(ms(500));
        let fresh_updates = feed(&mut fresh, 0, 700, 100, true);

        let mut reused = HoldDebouncer::new(ms(500));
        feed(&mut reused, 0, 300, 100, true);
        reused.update(ms(400), false);
        assert_eq!(*reused.state(), DebounceState::default());

        let reused_updates = feed(&mut reused, 1000, 1700, 100, true);
        fn phases(updates: &[DebounceUpdate]) -> Vec<(Phase, bool)> {
            updates.iter().map(|u| (u.phase, u.trigger.is_some())).collect()
        }
        assert_eq!(phases(&fresh_updates), phases(&reused_updates));
        assert_eq!(reused_updates[6].trigger.unwrap().held_for(), ms(600));
    }

    #[test]
    fn invariants_hold_through_a_noisy_signal() {
        let mut debouncer = HoldDebouncer::new(ms(100));
        for (i, t) in (0..3000).step_by(16).enumerate() {
            let holding = (i / 7) % 3 != 0;
            let update = debouncer.update(ms(t), holding);
            assert_invariants(debouncer.state());
            if update.trigger.is_some() {
                assert_eq!(update.previous, Phase::Candidate);
                assert_eq!(update.phase, Phase::Active);
            }
        }
    }

    #[test]
    fn backwards_timestamps_do_not_activate() {
        let mut debouncer = HoldDebouncer::new(ms(100));
        debouncer.update(ms(1000), true);
        let update = debouncer.update(ms(10), true);
        assert_eq!(update.phase, Phase::Candidate);
    }

    #[test]
    fn dropping_from_candidate_clears_since() {
        let mut debouncer = HoldDebouncer::new(ms(500));
        debouncer.update(ms(0), true);
        assert_eq!(debouncer.state().candidate_since, Some(ms(0)));
        let update = debouncer.update(ms(100), false);
        assert!(update.changed());
        assert_eq!(debouncer.state().candidate_since, None);
    }
}
