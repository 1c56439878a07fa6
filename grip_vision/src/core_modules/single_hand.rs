// THEORY:
// The Single-Hand Curl Classifier recognizes a one-handed grip: most fingers wrapped
// around something, as if holding a cup. It measures each non-thumb finger's curl
// ratio and counts how many are folded back toward the wrist.
//
// The thumb never takes part in the count. Its opposable joint produces curl ratios
// that say little about whether the hand is closed.

use crate::config::PipelineConfig;
use crate::core_modules::geometry::geometry::{finger_curl_ratios, Region};
use crate::core_modules::landmark::HandObservation;

#[derive(Debug, Clone)]
pub struct SingleHandCurlClassifier {
    /// A finger counts as curled when its ratio is strictly below this.
    pub curl_threshold: f32,
    /// How many of the four non-thumb fingers must be curled.
    pub min_curled_fingers: usize,
    /// When set, the wrist must fall inside this window.
    pub center_region: Option<Region>,
}

impl SingleHandCurlClassifier {
    pub fn new(curl_threshold: f32, min_curled_fingers: usize) -> Self {
        Self {
            curl_threshold,
            min_curled_fingers,
            center_region: None,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            curl_threshold: config.curl_threshold,
            min_curled_fingers: config.min_curled_fingers,
            center_region: config.center_region,
        }
    }

    pub fn curled_finger_count(&self, hand: &HandObservation) -> usize {
        finger_curl_ratios(hand)
            .iter()
            .filter(|&&ratio| ratio < self.curl_threshold)
            .count()
    }

    pub fn classify(&self, hands: &[HandObservation]) -> bool {
        let [hand] = hands else {
            return false;
        };

        if let Some(region) = &self.center_region {
            if !region.contains(&hand.wrist()) {
                return false;
            }
        }

        self.curled_finger_count(hand) >= self.min_curled_fingers
    }
}
