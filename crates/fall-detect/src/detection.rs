//! Tracked person records

use serde::{Deserialize, Serialize};

use crate::keypoint::{Keypoint, KeypointIndex};
use crate::DetectError;

/// Largest coordinate magnitude accepted from a pose source, in pixels
pub const MAX_COORDINATE: f32 = 16_777_216.0;

/// Axis-aligned box in integer pixel coordinates, `x1 <= x2`, `y1 <= y2`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x1: i32,
    pub y1: i32,
    pub x2: i32,
    pub y2: i32,
}

impl BoundingBox {
    /// Build a box, reordering corners if needed
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Self {
        Self {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
        }
    }

    pub fn width(&self) -> u32 {
        self.x2.abs_diff(self.x1)
    }

    pub fn height(&self) -> u32 {
        self.y2.abs_diff(self.y1)
    }

    /// Height over width; a zero-width box is infinitely tall
    pub fn aspect_ratio(&self) -> f32 {
        let w = self.width();
        if w == 0 {
            return f32::INFINITY;
        }
        self.height() as f32 / w as f32
    }

    pub fn as_tuple(&self) -> (i32, i32, i32, i32) {
        (self.x1, self.y1, self.x2, self.y2)
    }
}

/// One tracked person in one frame
#[derive(Debug, Clone, PartialEq)]
pub struct PersonDetection {
    /// Stable across frames for the same physical person
    pub track_id: i64,
    pub bbox: BoundingBox,
    /// Detector confidence (0.0 to 1.0)
    pub confidence: f32,
    /// COCO-17 keypoints; unseen joints carry zero confidence
    pub keypoints: [Keypoint; KeypointIndex::COUNT],
}

impl PersonDetection {
    pub fn keypoint(&self, index: KeypointIndex) -> &Keypoint {
        &self.keypoints[index.index()]
    }
}

/// Detection as delivered by an external pose tracker, before validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawDetection {
    pub track_id: Option<i64>,
    pub bbox: [f32; 4],
    pub confidence: f32,
    #[serde(default)]
    pub keypoints: Option<Vec<[f32; 3]>>,
}

impl TryFrom<RawDetection> for PersonDetection {
    type Error = DetectError;

    /// Reject records that cannot be placed or tracked; normalize the rest.
    ///
    /// Keypoint lists are padded or truncated to 17 entries and a missing list
    /// becomes all-invisible, so scorers only ever see the fixed layout.
    fn try_from(raw: RawDetection) -> Result<Self, Self::Error> {
        let track_id = raw
            .track_id
            .ok_or_else(|| DetectError::InvalidDetection("missing track id".to_string()))?;

        if raw.bbox.iter().any(|v| !v.is_finite()) {
            return Err(DetectError::InvalidDetection(format!(
                "track {track_id}: non-finite bounding box {:?}",
                raw.bbox
            )));
        }
        if raw.bbox.iter().any(|v| v.abs() > MAX_COORDINATE) {
            return Err(DetectError::InvalidDetection(format!(
                "track {track_id}: bounding box {:?} out of range",
                raw.bbox
            )));
        }
        if !raw.confidence.is_finite() {
            return Err(DetectError::InvalidDetection(format!(
                "track {track_id}: non-finite confidence"
            )));
        }

        let [x1, y1, x2, y2] = raw.bbox.map(|v| v as i32);

        let mut keypoints = [Keypoint::default(); KeypointIndex::COUNT];
        for (slot, triple) in keypoints.iter_mut().zip(raw.keypoints.unwrap_or_default()) {
            *slot = Keypoint::from_raw(triple);
        }

        Ok(Self {
            track_id,
            bbox: BoundingBox::new(x1, y1, x2, y2),
            confidence: raw.confidence.clamp(0.0, 1.0),
            keypoints,
        })
    }
}
