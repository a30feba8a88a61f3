//! Per-person fall classification

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::detection::PersonDetection;
use crate::scorer::{FallAssessment, FallScorer};

/// Per-person verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallStatus {
    Fall,
    Normal,
}

impl fmt::Display for FallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FallStatus::Fall => write!(f, "Fall"),
            FallStatus::Normal => write!(f, "Normal"),
        }
    }
}

/// A detection together with its assessment and final status
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredDetection {
    pub detection: PersonDetection,
    pub assessment: FallAssessment,
    pub status: FallStatus,
}

impl ScoredDetection {
    pub fn is_fall(&self) -> bool {
        self.status == FallStatus::Fall
    }
}

/// Runs the active scorer and applies the optional bbox aspect override
pub struct FallClassifier {
    scorer: Box<dyn FallScorer>,
    bbox_aspect_threshold: Option<f32>,
}

impl FallClassifier {
    pub fn new(scorer: Box<dyn FallScorer>, bbox_aspect_threshold: Option<f32>) -> Self {
        Self {
            scorer,
            bbox_aspect_threshold,
        }
    }

    pub fn scorer_name(&self) -> &'static str {
        self.scorer.name()
    }

    /// Score one person
    pub fn classify(&self, detection: PersonDetection) -> ScoredDetection {
        let assessment = self.scorer.assess(&detection.keypoints);
        let flat_box = self
            .bbox_aspect_threshold
            .is_some_and(|limit| detection.bbox.aspect_ratio() < limit);

        let status = if assessment.is_fall || flat_box {
            FallStatus::Fall
        } else {
            FallStatus::Normal
        };

        ScoredDetection {
            detection,
            assessment,
            status,
        }
    }

    /// Score every person in a frame, preserving order
    pub fn classify_all(&self, detections: Vec<PersonDetection>) -> Vec<ScoredDetection> {
        detections.into_iter().map(|d| self.classify(d)).collect()
    }
}

impl fmt::Debug for FallClassifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FallClassifier")
            .field("scorer", &self.scorer.name())
            .field("bbox_aspect_threshold", &self.bbox_aspect_threshold)
            .finish()
    }
}
