//! Fall scoring strategies
//!
//! Two heuristics exist and they are not numerically equivalent:
//! - [`TorsoSpreadScorer`]: continuous score from torso tilt and joint spread
//! - [`PostureRuleScorer`]: sum of three binary posture rules
//!
//! Exactly one is active per run, chosen through [`crate::ScoringPolicy`].

use std::f32::consts::FRAC_PI_2;

use serde::{Deserialize, Serialize};

use crate::keypoint::{centroid, Keypoint, KeypointIndex};

/// Keypoints at or below this confidence are ignored
pub const DEFAULT_KEYPOINT_CONFIDENCE: f32 = 0.2;

/// Minimum number of usable keypoints before any geometry is attempted
pub const MIN_VALID_KEYPOINTS: usize = 3;

/// Result of scoring one person
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FallAssessment {
    pub fall_score: f32,
    pub is_fall: bool,
}

impl FallAssessment {
    /// Conservative verdict for insufficient pose data
    pub const NOT_FALLING: FallAssessment = FallAssessment {
        fall_score: 0.0,
        is_fall: false,
    };
}

/// Maps one person's keypoints to a fall verdict.
///
/// An empty slice means no pose data. Implementations never fail: sparse or
/// degenerate input yields [`FallAssessment::NOT_FALLING`] or a finite score.
pub trait FallScorer: Send + Sync {
    fn assess(&self, keypoints: &[Keypoint]) -> FallAssessment;

    /// Short identifier for logs
    fn name(&self) -> &'static str;
}

fn valid_points(keypoints: &[Keypoint], slots: &[KeypointIndex], threshold: f32) -> Vec<Keypoint> {
    slots
        .iter()
        .filter_map(|slot| keypoints.get(slot.index()))
        .filter(|k| k.is_valid(threshold))
        .copied()
        .collect()
}

/// Population standard deviation
fn std_dev(values: &[f32]) -> f32 {
    if values.is_empty() {
        return 0.0;
    }
    let n = values.len() as f32;
    let mean = values.iter().sum::<f32>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / n;
    variance.sqrt()
}

/// Axis the torso angle is measured from.
///
/// The orientation term peaks when the angle is 90 degrees, so the reference
/// decides which posture scores high.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AngleReference {
    /// Measured from the image vertical: a lying torso scores 1.0
    #[default]
    Vertical,
    /// Measured from the image horizontal: an upright torso scores 1.0
    Horizontal,
}

/// Torso tilt plus body spread.
///
/// `score = 0.7 * orientation + 0.3 * min(spread / spread_scale, 1)` where
/// `orientation = 1 - |angle - pi/2| / (pi/2)` for the hip->shoulder angle
/// taken against `angle_reference`, and `spread` is the larger per-axis
/// standard deviation of the valid shoulders, hips and ankles.
#[derive(Debug, Clone)]
pub struct TorsoSpreadScorer {
    pub keypoint_confidence: f32,
    pub spread_scale: f32,
    pub fall_threshold: f32,
    pub angle_reference: AngleReference,
}

impl Default for TorsoSpreadScorer {
    fn default() -> Self {
        Self {
            keypoint_confidence: DEFAULT_KEYPOINT_CONFIDENCE,
            spread_scale: 100.0,
            fall_threshold: 0.6,
            angle_reference: AngleReference::Vertical,
        }
    }
}

impl TorsoSpreadScorer {
    /// Orientation term in [0, 1]; 0.0 when either centroid is unknown
    fn orientation(&self, shoulders: &[Keypoint], hips: &[Keypoint]) -> f32 {
        let (Some((sx, sy)), Some((hx, hy))) = (centroid(shoulders), centroid(hips)) else {
            return 0.0;
        };
        let (dx, dy) = (sx - hx, sy - hy);
        // Both in [0, pi]
        let angle = match self.angle_reference {
            AngleReference::Vertical => dx.atan2(dy).abs(),
            AngleReference::Horizontal => dy.atan2(dx).abs(),
        };
        (1.0 - (angle - FRAC_PI_2).abs() / FRAC_PI_2).clamp(0.0, 1.0)
    }
}

impl FallScorer for TorsoSpreadScorer {
    fn assess(&self, keypoints: &[Keypoint]) -> FallAssessment {
        let threshold = self.keypoint_confidence;
        let shoulders = valid_points(keypoints, &KeypointIndex::SHOULDERS, threshold);
        let hips = valid_points(keypoints, &KeypointIndex::HIPS, threshold);
        let ankles = valid_points(keypoints, &KeypointIndex::ANKLES, threshold);

        let body: Vec<Keypoint> = shoulders.iter().chain(&hips).chain(&ankles).copied().collect();
        if body.len() < MIN_VALID_KEYPOINTS {
            return FallAssessment::NOT_FALLING;
        }

        let xs: Vec<f32> = body.iter().map(|k| k.x).collect();
        let ys: Vec<f32> = body.iter().map(|k| k.y).collect();
        let spread = std_dev(&xs).max(std_dev(&ys));

        let spread_term = if self.spread_scale > 0.0 {
            (spread / self.spread_scale).min(1.0)
        } else {
            0.0
        };
        let fall_score = 0.7 * self.orientation(&shoulders, &hips) + 0.3 * spread_term;

        FallAssessment {
            fall_score,
            is_fall: fall_score > self.fall_threshold,
        }
    }

    fn name(&self) -> &'static str {
        "torso_spread"
    }
}

/// Three binary posture rules.
///
/// - +0.4 when the shoulder-hip axis is within 45 degrees of horizontal
/// - +0.3 when torso length over shoulder width is below `ratio_threshold`
/// - +0.3 when nose-to-hip distance is below `head_hip_threshold` torso lengths
///
/// Requires nose, both shoulders and both hips above the confidence threshold.
#[derive(Debug, Clone)]
pub struct PostureRuleScorer {
    pub keypoint_confidence: f32,
    pub ratio_threshold: f32,
    pub head_hip_threshold: f32,
    pub fall_threshold: f32,
}

impl Default for PostureRuleScorer {
    fn default() -> Self {
        Self {
            keypoint_confidence: DEFAULT_KEYPOINT_CONFIDENCE,
            ratio_threshold: 1.2,
            head_hip_threshold: 0.5,
            fall_threshold: 0.5,
        }
    }
}

const REQUIRED_POSTURE_POINTS: [KeypointIndex; 5] = [
    KeypointIndex::Nose,
    KeypointIndex::LeftShoulder,
    KeypointIndex::RightShoulder,
    KeypointIndex::LeftHip,
    KeypointIndex::RightHip,
];

/// Below this many pixels a length is treated as zero
const DEGENERATE_LENGTH: f32 = 1e-6;

impl FallScorer for PostureRuleScorer {
    fn assess(&self, keypoints: &[Keypoint]) -> FallAssessment {
        let points = valid_points(keypoints, &REQUIRED_POSTURE_POINTS, self.keypoint_confidence);
        if points.len() < REQUIRED_POSTURE_POINTS.len() {
            return FallAssessment::NOT_FALLING;
        }
        let [nose, left_shoulder, right_shoulder, left_hip, right_hip] =
            [points[0], points[1], points[2], points[3], points[4]];

        let shoulder_center = Keypoint::new(
            (left_shoulder.x + right_shoulder.x) / 2.0,
            (left_shoulder.y + right_shoulder.y) / 2.0,
            1.0,
        );
        let hip_center = Keypoint::new((left_hip.x + right_hip.x) / 2.0, (left_hip.y + right_hip.y) / 2.0, 1.0);

        // Axis angle from the image horizontal, in [0, 180]
        let axis_degrees = (shoulder_center.y - hip_center.y)
            .atan2(shoulder_center.x - hip_center.x)
            .abs()
            .to_degrees();

        let body_height = shoulder_center.distance(&hip_center);
        let shoulder_width = left_shoulder.distance(&right_shoulder);
        let height_width_ratio = if shoulder_width <= DEGENERATE_LENGTH {
            f32::INFINITY
        } else {
            body_height / shoulder_width
        };
        let head_hip_ratio = if body_height <= DEGENERATE_LENGTH {
            f32::INFINITY
        } else {
            nose.distance(&hip_center) / body_height
        };

        let mut fall_score = 0.0;
        if !(45.0..=135.0).contains(&axis_degrees) {
            fall_score += 0.4;
        }
        if height_width_ratio < self.ratio_threshold {
            fall_score += 0.3;
        }
        if head_hip_ratio < self.head_hip_threshold {
            fall_score += 0.3;
        }

        FallAssessment {
            fall_score,
            is_fall: fall_score > self.fall_threshold,
        }
    }

    fn name(&self) -> &'static str {
        "posture_rules"
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use proptest::prelude::*;

    pub(crate) fn pose(points: &[(KeypointIndex, f32, f32)]) -> [Keypoint; KeypointIndex::COUNT] {
        let mut keypoints = [Keypoint::default(); KeypointIndex::COUNT];
        for &(slot, x, y) in points {
            keypoints[slot.index()] = Keypoint::new(x, y, 0.9);
        }
        keypoints
    }

    pub(crate) fn standing() -> [Keypoint; KeypointIndex::COUNT] {
        use KeypointIndex::*;
        pose(&[
            (Nose, 120.0, 60.0),
            (LeftShoulder, 100.0, 100.0),
            (RightShoulder, 140.0, 100.0),
            (LeftHip, 105.0, 200.0),
            (RightHip, 135.0, 200.0),
            (LeftAnkle, 105.0, 300.0),
            (RightAnkle, 135.0, 300.0),
        ])
    }

    pub(crate) fn lying() -> [Keypoint; KeypointIndex::COUNT] {
        use KeypointIndex::*;
        pose(&[
            (Nose, 60.0, 320.0),
            (LeftShoulder, 100.0, 300.0),
            (RightShoulder, 100.0, 340.0),
            (LeftHip, 200.0, 305.0),
            (RightHip, 200.0, 335.0),
            (LeftAnkle, 300.0, 305.0),
            (RightAnkle, 300.0, 335.0),
        ])
    }

    #[test]
    fn test_torso_standing_is_normal() {
        let result = TorsoSpreadScorer::default().assess(&standing());
        assert!(!result.is_fall);
        assert!(result.fall_score < 0.3, "score {}", result.fall_score);
    }

    #[test]
    fn test_torso_lying_is_fall() {
        let result = TorsoSpreadScorer::default().assess(&lying());
        assert!(result.is_fall);
        assert!(result.fall_score > 0.9, "score {}", result.fall_score);
    }

    #[test]
    fn test_torso_horizontal_reference_inverts_orientation() {
        let scorer = TorsoSpreadScorer {
            angle_reference: AngleReference::Horizontal,
            ..Default::default()
        };

        // Upright torso: full orientation term plus ~0.245 spread
        let upright = scorer.assess(&standing());
        assert!(upright.is_fall);
        assert!((upright.fall_score - 0.945).abs() < 0.01, "score {}", upright.fall_score);

        // Lying torso: orientation term vanishes, spread alone stays below threshold
        let flat = scorer.assess(&lying());
        assert!(!flat.is_fall);
        assert!((flat.fall_score - 0.245).abs() < 0.01, "score {}", flat.fall_score);
    }

    #[test]
    fn test_angle_reference_names_are_snake_case() {
        let reference: AngleReference = serde_json::from_str("\"horizontal\"").unwrap();
        assert_eq!(reference, AngleReference::Horizontal);
        assert_eq!(AngleReference::default(), AngleReference::Vertical);
    }

    #[test]
    fn test_torso_spread_term_is_capped() {
        use KeypointIndex::*;
        let sprawled = pose(&[
            (LeftShoulder, 0.0, 500.0),
            (RightShoulder, 0.0, 540.0),
            (LeftHip, 400.0, 505.0),
            (RightHip, 400.0, 535.0),
            (LeftAnkle, 900.0, 505.0),
            (RightAnkle, 900.0, 535.0),
        ]);
        let result = TorsoSpreadScorer::default().assess(&sprawled);
        assert!(result.fall_score <= 1.0 + 1e-5);
    }

    #[test]
    fn test_torso_without_hips_scores_spread_only() {
        use KeypointIndex::*;
        let partial = pose(&[
            (LeftShoulder, 100.0, 300.0),
            (RightShoulder, 100.0, 340.0),
            (LeftAnkle, 300.0, 305.0),
        ]);
        let result = TorsoSpreadScorer::default().assess(&partial);
        assert!(!result.is_fall);
        assert!(result.fall_score <= 0.3);
    }

    #[test]
    fn test_empty_keypoints_not_falling() {
        assert_eq!(TorsoSpreadScorer::default().assess(&[]), FallAssessment::NOT_FALLING);
        assert_eq!(PostureRuleScorer::default().assess(&[]), FallAssessment::NOT_FALLING);
    }

    #[test]
    fn test_low_confidence_points_are_ignored() {
        let mut keypoints = lying();
        for k in keypoints.iter_mut().skip(5) {
            k.confidence = 0.2;
        }
        assert_eq!(TorsoSpreadScorer::default().assess(&keypoints), FallAssessment::NOT_FALLING);
    }

    #[test]
    fn test_posture_standing_is_normal() {
        let result = PostureRuleScorer::default().assess(&standing());
        assert_eq!(result.fall_score, 0.0);
        assert!(!result.is_fall);
    }

    #[test]
    fn test_posture_horizontal_axis_alone_is_not_enough() {
        let result = PostureRuleScorer::default().assess(&lying());
        assert!((result.fall_score - 0.4).abs() < 1e-6);
        assert!(!result.is_fall);
    }

    #[test]
    fn test_posture_crumpled_is_fall() {
        use KeypointIndex::*;
        // Horizontal torso with the head tucked back towards the hips
        let crumpled = pose(&[
            (Nose, 170.0, 320.0),
            (LeftShoulder, 100.0, 300.0),
            (RightShoulder, 100.0, 340.0),
            (LeftHip, 200.0, 305.0),
            (RightHip, 200.0, 335.0),
        ]);
        let result = PostureRuleScorer::default().assess(&crumpled);
        assert!((result.fall_score - 0.7).abs() < 1e-6);
        assert!(result.is_fall);
    }

    #[test]
    fn test_posture_degenerate_geometry_does_not_divide_by_zero() {
        use KeypointIndex::*;
        // Every joint on one pixel: zero shoulder width and zero torso length
        let collapsed = pose(&[
            (Nose, 50.0, 50.0),
            (LeftShoulder, 50.0, 50.0),
            (RightShoulder, 50.0, 50.0),
            (LeftHip, 50.0, 50.0),
            (RightHip, 50.0, 50.0),
        ]);
        let result = PostureRuleScorer::default().assess(&collapsed);
        assert!(result.fall_score.is_finite());
        // atan2(0, 0) is 0 degrees, so only the axis rule can fire
        assert!((result.fall_score - 0.4).abs() < 1e-6);
    }

    fn arb_keypoint() -> impl Strategy<Value = Keypoint> {
        (-1000.0f32..1000.0, -1000.0f32..1000.0, 0.0f32..=1.0).prop_map(|(x, y, c)| Keypoint::new(x, y, c))
    }

    proptest! {
        #[test]
        fn prop_sparse_pose_is_not_falling(
            mut keypoints in proptest::collection::vec(arb_keypoint(), KeypointIndex::COUNT),
            keep in proptest::collection::vec(0usize..KeypointIndex::COUNT, 0..3),
        ) {
            for (i, k) in keypoints.iter_mut().enumerate() {
                if !keep.contains(&i) {
                    k.confidence = k.confidence.min(DEFAULT_KEYPOINT_CONFIDENCE);
                }
            }
            prop_assert_eq!(TorsoSpreadScorer::default().assess(&keypoints), FallAssessment::NOT_FALLING);
            prop_assert_eq!(PostureRuleScorer::default().assess(&keypoints), FallAssessment::NOT_FALLING);
        }

        #[test]
        fn prop_scores_are_finite_and_bounded(
            keypoints in proptest::collection::vec(arb_keypoint(), KeypointIndex::COUNT),
        ) {
            for scorer in [&TorsoSpreadScorer::default() as &dyn FallScorer, &PostureRuleScorer::default()] {
                let result = scorer.assess(&keypoints);
                prop_assert!(result.fall_score.is_finite());
                prop_assert!((0.0..=1.0 + 1e-6).contains(&result.fall_score));
            }
        }
    }
}
