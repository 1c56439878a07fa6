// THEORY:
// The `frame_fusion` module turns one frame's raw detector output into a single,
// typed `FrameClassification`. It is the bridge between the stateless classifiers
// and the stateful debounce layer.
//
// Key architectural principles:
// 1.  **Gating**: observations below the detection-confidence floor are treated as
//     absent hands, and at most `max_num_hands` of the most confident ones are kept.
//     A low-confidence pair therefore falls into the one- or zero-hand paths instead
//     of producing a guessed answer.
// 2.  **OR fusion**: `holding` is true when either classifier fires. The classifiers
//     partition the hand count (one hand vs. two hands), so they never disagree about
//     which case they are looking at.
// 3.  **Dropped frames are negative**: zero surviving hands always yields
//     `holding == false`. The "holding" status is never carried across a missed frame,
//     so losing tracking cannot leave the system stuck in a holding state.
// 4.  **Display persistence**: separately from the signal, the last-known landmarks of
//     each hand are remembered for a few frames (object permanence, in the spirit of a
//     tracker's `frames_since_seen`) so the debug overlay does not flicker. This
//     history never feeds classification.

use crate::config::PipelineConfig;
use crate::core_modules::landmark::{HandObservation, Handedness};
use crate::core_modules::single_hand::SingleHandCurlClassifier;
use crate::core_modules::two_hand::TwoHandProximityClassifier;
use tracing::trace;

/// The fused per-frame result.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FrameClassification {
    pub holding: bool,
    /// Hands that survived confidence gating.
    pub hand_count: usize,
    /// Individual classifier outputs, kept for debugging and the overlay.
    pub two_hand: bool,
    pub single_hand: bool,
}

/// The single place the two classifier outputs are combined.
pub fn fuse_signals(hand_count: usize, two_hand: bool, single_hand: bool) -> bool {
    if hand_count == 0 {
        return false;
    }
    two_hand || single_hand
}

/// A hand remembered for the overlay after it stopped being detected.
#[derive(Debug, Clone)]
pub struct CarriedHand {
    pub observation: HandObservation,
    /// 0 when the hand was detected in the current frame.
    pub frames_since_seen: u32,
}

/// Everything fusion produced for one frame.
#[derive(Debug, Clone)]
pub struct FusedFrame {
    pub classification: FrameClassification,
    /// The hands the classifiers actually looked at.
    pub hands: Vec<HandObservation>,
}

pub struct FrameFusion {
    two_hand: TwoHandProximityClassifier,
    single_hand: SingleHandCurlClassifier,
    min_detection_confidence: f32,
    max_num_hands: usize,
    carry_forward_frames: u32,
    /// Indexed by handedness: [left, right].
    last_known: [Option<CarriedHand>; 2],
}

fn slot(handedness: Handedness) -> usize {
    match handedness {
        Handedness::Left => 0,
        Handedness::Right => 1,
    }
}

impl FrameFusion {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            two_hand: TwoHandProximityClassifier::from_config(config),
            single_hand: SingleHandCurlClassifier::from_config(config),
            min_detection_confidence: config.min_detection_confidence,
            max_num_hands: config.max_num_hands,
            carry_forward_frames: config.carry_forward_frames,
            last_known: [None, None],
        }
    }

    /// Drops low-confidence observations and caps the count, most confident first.
    pub fn gate(&self, mut observations: Vec<HandObservation>) -> Vec<HandObservation> {
        observations.retain(|hand| hand.score >= self.min_detection_confidence);
        observations.sort_by(|a, b| b.score.total_cmp(&a.score));
        observations.truncate(self.max_num_hands);
        observations
    }

    /// Runs both classifiers over already-gated hands. Pure.
    pub fn classify(&self, hands: &[HandObservation]) -> FrameClassification {
        let two_hand = self.two_hand.classify(hands);
        let single_hand = self.single_hand.classify(hands);
        FrameClassification {
            holding: fuse_signals(hands.len(), two_hand, single_hand),
            hand_count: hands.len(),
            two_hand,
            single_hand,
        }
    }

    /// Gates, classifies and updates the overlay memory for one frame.
    pub fn fuse(&mut self, observations: Vec<HandObservation>) -> FusedFrame {
        let raw_count = observations.len();
        let hands = self.gate(observations);
        let classification = self.classify(&hands);
        self.remember(&hands);

        trace!(
            raw = raw_count,
            kept = hands.len(),
            two_hand = classification.two_hand,
            single_hand = classification.single_hand,
            "fused frame"
        );

        FusedFrame { classification, hands }
    }

    fn remember(&mut self, hands: &[HandObservation]) {
        let mut seen = [false, false];
        for hand in hands {
            let i = slot(hand.handedness);
            seen[i] = true;
            self.last_known[i] = Some(CarriedHand {
                observation: hand.clone(),
                frames_since_seen: 0,
            });
        }

        for (i, entry) in self.last_known.iter_mut().enumerate() {
            if seen[i] {
                continue;
            }
            if let Some(carried) = entry {
                carried.frames_since_seen += 1;
                if carried.frames_since_seen > self.carry_forward_frames {
                    *entry = None;
                }
            }
        }
    }

    /// Hands to draw: current detections plus recently lost ones.
    pub fn carried_hands(&self) -> impl Iterator<Item = &CarriedHand> {
        self.last_known.iter().flatten()
    }

    pub fn two_hand(&self) -> &TwoHandProximityClassifier {
        &self.two_hand
    }

    pub fn single_hand(&self) -> &SingleHandCurlClassifier {
        &self.single_hand
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::landmark::test_support::{fist, open_hand};

    fn fusion() -> FrameFusion {
        FrameFusion::new(&PipelineConfig::default())
    }

    #[test]
    fn either_classifier_makes_the_frame_holding() {
        let mut fusion = fusion();

        let two = vec![
            open_hand(Handedness::Left, (0.45, 0.6)),
            open_hand(Handedness::Right, (0.55, 0.6)),
        ];
        let frame = fusion.fuse(two);
        assert!(frame.classification.two_hand);
        assert!(!frame.classification.single_hand);
        assert!(frame.classification.holding);

        let frame = fusion.fuse(vec![fist(Handedness::Right, (0.5, 0.6))]);
        assert!(frame.classification.single_hand);
        assert!(frame.classification.holding);
    }

    #[test]
    fn fused_signal_is_the_or_of_both() {
        for two in [false, true] {
            for single in [false, true] {
                assert_eq!(fuse_signals(1, two, single), two || single);
                assert!(!fuse_signals(0, two, single));
            }
        }
    }

    #[test]
    fn zero_hands_is_negative_even_after_holding() {
        let mut fusion = fusion();
        assert!(fusion.fuse(vec![fist(Handedness::Right, (0.5, 0.6))]).classification.holding);
        let frame = fusion.fuse(Vec::new());
        assert!(!frame.classification.holding);
        assert_eq!(frame.classification.hand_count, 0);
    }

    #[test]
    fn low_confidence_hands_count_as_absent() {
        let mut fusion = fusion();
        let mut left = open_hand(Handedness::Left, (0.45, 0.6));
        left.score = 0.2;
        let right = fist(Handedness::Right, (0.55, 0.6));
        let frame = fusion.fuse(vec![left, right]);
        assert_eq!(frame.classification.hand_count, 1);
        assert!(!frame.classification.two_hand);
        assert!(frame.classification.single_hand);
    }

    #[test]
    fn most_confident_hands_are_kept() {
        let fusion = fusion();
        let mut a = open_hand(Handedness::Left, (0.2, 0.6));
        a.score = 0.6;
        let mut b = open_hand(Handedness::Right, (0.5, 0.6));
        b.score = 0.95;
        let mut c = open_hand(Handedness::Right, (0.8, 0.6));
        c.score = 0.8;
        let kept = fusion.gate(vec![a, b, c]);
        assert_eq!(kept.len(), 2);
        assert_eq!(kept[0].score, 0.95);
        assert_eq!(kept[1].score, 0.8);
    }

    #[test]
    fn lost_hands_are_carried_for_display_then_forgotten() {
        let mut config = PipelineConfig::default();
        config.carry_forward_frames = 2;
        let mut fusion = FrameFusion::new(&config);

        fusion.fuse(vec![open_hand(Handedness::Left, (0.5, 0.6))]);
        assert_eq!(fusion.carried_hands().count(), 1);

        fusion.fuse(Vec::new());
        fusion.fuse(Vec::new());
        let carried: Vec<_> = fusion.carried_hands().collect();
        assert_eq!(carried.len(), 1);
        assert_eq!(carried[0].frames_since_seen, 2);

        fusion.fuse(Vec::new());
        assert_eq!(fusion.carried_hands().count(), 0);
    }
}
