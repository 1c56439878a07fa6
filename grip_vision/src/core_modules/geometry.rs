// THEORY:
// The `geometry` module provides the measuring tools for the classifiers. It follows
// the same "separation of concerns" principle as the rest of `core_modules`: the
// `HandObservation` is a dumb container, and every relationship between landmarks
// (distances, centroids, curl ratios) is computed here.
//
// Key principles:
// 1.  **Pure arithmetic**: every function is a pure function over well-formed landmark
//     sets. There are no error conditions; degenerate inputs map to a documented value.
// 2.  **2D by default**: the detector's depth channel is noisy and relative, so the
//     default distance ignores `z`. `euclidean_distance_3d` exists for callers that
//     explicitly want it.
// 3.  **Scale awareness**: a curl ratio compares two distances measured on the same
//     hand, so it is independent of how far the hand is from the camera.

pub mod geometry {
    use crate::core_modules::landmark::{index, Finger, HandObservation, Landmark};
    use serde::{Deserialize, Serialize};

    /// Straight-line distance in normalized frame space, ignoring depth.
    pub fn euclidean_distance(p1: &Landmark, p2: &Landmark) -> f32 {
        let dx = p1.x - p2.x;
        let dy = p1.y - p2.y;
        (dx * dx + dy * dy).sqrt()
    }

    pub fn euclidean_distance_3d(p1: &Landmark, p2: &Landmark) -> f32 {
        let dx = p1.x - p2.x;
        let dy = p1.y - p2.y;
        let dz = p1.z - p2.z;
        (dx * dx + dy * dy + dz * dz).sqrt()
    }

    /// Midpoint between two landmarks.
    pub fn midpoint(p1: &Landmark, p2: &Landmark) -> Landmark {
        Landmark {
            x: (p1.x + p2.x) / 2.0,
            y: (p1.y + p2.y) / 2.0,
            z: (p1.z + p2.z) / 2.0,
        }
    }

    fn centroid(points: impl Iterator<Item = Landmark>) -> Landmark {
        let mut count = 0usize;
        let mut sum = Landmark::default();
        for p in points {
            sum.x += p.x;
            sum.y += p.y;
            sum.z += p.z;
            count += 1;
        }
        if count == 0 {
            return sum;
        }
        let n = count as f32;
        Landmark { x: sum.x / n, y: sum.y / n, z: sum.z / n }
    }

    /// Mean of all 21 landmarks.
    pub fn hand_center(hand: &HandObservation) -> Landmark {
        centroid(hand.landmarks.iter().copied())
    }

    /// Mean of the wrist and the four finger knuckles (MCP joints).
    pub fn palm_center(hand: &HandObservation) -> Landmark {
        let joints = [index::WRIST, index::INDEX_MCP, index::MIDDLE_MCP, index::RING_MCP, index::PINKY_MCP];
        centroid(joints.iter().map(|&i| hand.point(i)))
    }

    /// Ratio of (fingertip → wrist) to (PIP joint → wrist) for a non-thumb finger.
    ///
    /// - `> 1.0`: the tip reaches past the proximal joint, the finger is extended.
    /// - `< 1.0`: the tip has folded back toward the wrist, the finger is curled.
    ///
    /// A PIP joint sitting on the wrist (degenerate detection) yields `f32::INFINITY`,
    /// which every classifier reads as "extended".
    pub fn finger_curl_ratio(hand: &HandObservation, finger: Finger) -> f32 {
        let wrist = hand.wrist();
        let tip_to_wrist = euclidean_distance(&hand.point(finger.tip()), &wrist);
        let pip_to_wrist = euclidean_distance(&hand.point(finger.pip()), &wrist);
        if pip_to_wrist <= f32::EPSILON {
            return f32::INFINITY;
        }
        tip_to_wrist / pip_to_wrist
    }

    /// Curl ratios for index, middle, ring and pinky, in that order.
    pub fn finger_curl_ratios(hand: &HandObservation) -> [f32; 4] {
        Finger::ALL.map(|finger| finger_curl_ratio(hand, finger))
    }

    /// An axis-aligned window of the frame in normalized coordinates.
    #[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
    pub struct Region {
        pub min_x: f32,
        pub max_x: f32,
        pub min_y: f32,
        pub max_y: f32,
    }

    impl Region {
        /// Keeps hands away from the frame edges, where the detector's landmarks are
        /// least reliable.
        pub fn original_center() -> Self {
            Self { min_x: 0.1, max_x: 0.9, min_y: 0.1, max_y: 0.95 }
        }

        /// Strict containment: a point on the border is outside.
        pub fn contains(&self, p: &Landmark) -> bool {
            self.min_x < p.x && p.x < self.max_x && self.min_y < p.y && p.y < self.max_y
        }

        pub fn is_well_formed(&self) -> bool {
            self.min_x < self.max_x && self.min_y < self.max_y
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;
        use crate::core_modules::landmark::test_support::{fist, open_hand};
        use crate::core_modules::landmark::Handedness;

        #[test]
        fn distance_is_planar_by_default() {
            let a = Landmark { x: 0.0, y: 0.0, z: 0.0 };
            let b = Landmark { x: 0.3, y: 0.4, z: 5.0 };
            assert!((euclidean_distance(&a, &b) - 0.5).abs() < 1e-6);
            assert!(euclidean_distance_3d(&a, &b) > 5.0);
        }

        #[test]
        fn extended_fingers_have_ratio_above_one() {
            let hand = open_hand(Handedness::Right, (0.5, 0.6));
            for ratio in finger_curl_ratios(&hand) {
                assert!(ratio > 1.0, "ratio {ratio} should be extended");
            }
        }

        #[test]
        fn curled_fingers_have_ratio_below_one() {
            let hand = fist(Handedness::Left, (0.5, 0.6));
            for ratio in finger_curl_ratios(&hand) {
                assert!(ratio < 0.8, "ratio {ratio} should be curled");
            }
        }

        #[test]
        fn curl_ratio_is_scale_independent() {
            let hand = fist(Handedness::Left, (0.5, 0.6));
            let mut scaled = hand.clone();
            for lm in scaled.landmarks.iter_mut() {
                lm.x *= 0.5;
                lm.y *= 0.5;
            }
            let a = finger_curl_ratio(&hand, Finger::Middle);
            let b = finger_curl_ratio(&scaled, Finger::Middle);
            assert!((a - b).abs() < 1e-4);
        }

        #[test]
        fn degenerate_pip_reads_as_extended() {
            let mut hand = fist(Handedness::Right, (0.5, 0.6));
            let wrist = hand.wrist();
            hand.landmarks[Finger::Ring.pip()] = wrist;
            assert_eq!(finger_curl_ratio(&hand, Finger::Ring), f32::INFINITY);
        }

        #[test]
        fn palm_center_sits_between_wrist_and_knuckles() {
            let hand = open_hand(Handedness::Right, (0.5, 0.6));
            let palm = palm_center(&hand);
            assert!((palm.x - 0.5).abs() < 1e-5);
            assert!(palm.y < 0.6 && palm.y > 0.52);
            let center = hand_center(&hand);
            assert!(center.y < palm.y);
        }

        #[test]
        fn region_border_is_outside() {
            let region = Region::original_center();
            assert!(region.contains(&Landmark::new(0.5, 0.5)));
            assert!(!region.contains(&Landmark::new(0.1, 0.5)));
            assert!(!region.contains(&Landmark::new(0.5, 0.95)));
        }
    }
}
