//! Fall scoring configuration

use serde::{Deserialize, Serialize};

use crate::classify::FallClassifier;
use crate::scorer::{AngleReference, FallScorer, PostureRuleScorer, TorsoSpreadScorer, DEFAULT_KEYPOINT_CONFIDENCE};

/// Which scoring heuristic drives the fall flag
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringPolicy {
    /// Continuous torso tilt + spread score
    #[default]
    TorsoSpread,
    /// Binary posture rules
    PostureRules,
}

/// Scoring configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    /// Active heuristic
    pub policy: ScoringPolicy,

    /// Keypoints at or below this confidence are ignored
    pub keypoint_confidence: f32,

    /// Fall threshold for the torso-spread score
    pub torso_fall_threshold: f32,

    /// Pixel spread that saturates the spread term
    pub spread_scale: f32,

    /// Axis the torso-spread angle is measured from
    pub torso_angle_reference: AngleReference,

    /// Fall threshold for the summed posture rules
    pub posture_fall_threshold: f32,

    /// Torso length over shoulder width below which the ratio rule fires
    pub posture_ratio_threshold: f32,

    /// Nose-hip distance over torso length below which the head rule fires
    pub posture_head_hip_threshold: f32,

    /// Also flag a person whose bbox height/width drops below this value
    pub bbox_aspect_threshold: Option<f32>,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            policy: ScoringPolicy::TorsoSpread,
            keypoint_confidence: DEFAULT_KEYPOINT_CONFIDENCE,
            torso_fall_threshold: 0.6,
            spread_scale: 100.0,
            torso_angle_reference: AngleReference::Vertical,
            posture_fall_threshold: 0.5,
            posture_ratio_threshold: 1.2,
            posture_head_hip_threshold: 0.5,
            bbox_aspect_threshold: None,
        }
    }
}

impl ScoringConfig {
    /// Posture rules plus the bounding-box aspect override
    pub fn posture_with_bbox() -> Self {
        Self {
            policy: ScoringPolicy::PostureRules,
            bbox_aspect_threshold: Some(1.2),
            ..Default::default()
        }
    }

    /// Instantiate the configured scorer
    pub fn scorer(&self) -> Box<dyn FallScorer> {
        match self.policy {
            ScoringPolicy::TorsoSpread => Box::new(TorsoSpreadScorer {
                keypoint_confidence: self.keypoint_confidence,
                spread_scale: self.spread_scale,
                fall_threshold: self.torso_fall_threshold,
                angle_reference: self.torso_angle_reference,
            }),
            ScoringPolicy::PostureRules => Box::new(PostureRuleScorer {
                keypoint_confidence: self.keypoint_confidence,
                ratio_threshold: self.posture_ratio_threshold,
                head_hip_threshold: self.posture_head_hip_threshold,
                fall_threshold: self.posture_fall_threshold,
            }),
        }
    }

    /// Classifier combining the scorer with the optional bbox override
    pub fn classifier(&self) -> FallClassifier {
        FallClassifier::new(self.scorer(), self.bbox_aspect_threshold)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_selects_scorer() {
        assert_eq!(ScoringConfig::default().scorer().name(), "torso_spread");
        assert_eq!(ScoringConfig::posture_with_bbox().scorer().name(), "posture_rules");
    }

    #[test]
    fn test_angle_reference_reaches_scorer() {
        use crate::scorer::tests::standing;

        let literal = ScoringConfig {
            torso_angle_reference: AngleReference::Horizontal,
            ..Default::default()
        };
        assert!(literal.scorer().assess(&standing()).is_fall);
        assert!(!ScoringConfig::default().scorer().assess(&standing()).is_fall);

        let parsed: ScoringConfig = serde_json::from_str(r#"{"torso_angle_reference": "horizontal"}"#).unwrap();
        assert_eq!(parsed.torso_angle_reference, AngleReference::Horizontal);
    }

    #[test]
    fn test_policy_names_are_snake_case() {
        let policy: ScoringPolicy = serde_json::from_str("\"posture_rules\"").unwrap();
        assert_eq!(policy, ScoringPolicy::PostureRules);
    }
}
