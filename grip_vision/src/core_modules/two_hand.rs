// THEORY:
// The Two-Hand Proximity Classifier approximates "holding an object between both
// hands": when two hands are visible and brought close together, something is
// probably being held between them.
//
// It is one of two independent, stateless classifiers. It only ever answers for the
// two-hand case; zero or one visible hand is always `false` here and is the
// single-hand classifier's business.

use crate::config::PipelineConfig;
use crate::core_modules::geometry::geometry::{euclidean_distance, hand_center, midpoint, palm_center, Region};
use crate::core_modules::landmark::{HandObservation, Landmark};
use serde::{Deserialize, Serialize};

/// Which point on each hand is compared.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferencePoint {
    #[default]
    Wrist,
    /// Mean of the wrist and MCP joints.
    PalmCenter,
    /// Mean of all 21 landmarks.
    HandCenter,
}

impl ReferencePoint {
    pub fn locate(&self, hand: &HandObservation) -> Landmark {
        match self {
            ReferencePoint::Wrist => hand.wrist(),
            ReferencePoint::PalmCenter => palm_center(hand),
            ReferencePoint::HandCenter => hand_center(hand),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TwoHandProximityClassifier {
    /// Reference points must be strictly closer than this (normalized units).
    pub proximity_threshold: f32,
    pub reference_point: ReferencePoint,
    /// When set, the midpoint between the hands must fall inside this window.
    pub center_region: Option<Region>,
}

impl TwoHandProximityClassifier {
    pub fn new(proximity_threshold: f32, reference_point: ReferencePoint) -> Self {
        Self {
            proximity_threshold,
            reference_point,
            center_region: None,
        }
    }

    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            proximity_threshold: config.proximity_threshold,
            reference_point: config.reference_point,
            center_region: config.center_region,
        }
    }

    /// Distance between the two hands' reference points, or `None` unless exactly
    /// two hands are present.
    pub fn reference_distance(&self, hands: &[HandObservation]) -> Option<f32> {
        match hands {
            [a, b] => Some(euclidean_distance(
                &self.reference_point.locate(a),
                &self.reference_point.locate(b),
            )),
            _ => None,
        }
    }

    pub fn classify(&self, hands: &[HandObservation]) -> bool {
        let [a, b] = hands else {
            return false;
        };

        let pa = self.reference_point.locate(a);
        let pb = self.reference_point.locate(b);
        if euclidean_distance(&pa, &pb) >= self.proximity_threshold {
            return false;
        }

        match &self.center_region {
            Some(region) => region.contains(&midpoint(&pa, &pb)),
            None => true,
        }
    }
}
