//! COCO-17 body keypoints

use serde::{Deserialize, Serialize};

/// Keypoint slots in the order pose models emit them
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(usize)]
pub enum KeypointIndex {
    Nose = 0,
    LeftEye = 1,
    RightEye = 2,
    LeftEar = 3,
    RightEar = 4,
    LeftShoulder = 5,
    RightShoulder = 6,
    LeftElbow = 7,
    RightElbow = 8,
    LeftWrist = 9,
    RightWrist = 10,
    LeftHip = 11,
    RightHip = 12,
    LeftKnee = 13,
    RightKnee = 14,
    LeftAnkle = 15,
    RightAnkle = 16,
}

impl KeypointIndex {
    pub const COUNT: usize = 17;

    pub const SHOULDERS: [KeypointIndex; 2] = [KeypointIndex::LeftShoulder, KeypointIndex::RightShoulder];
    pub const HIPS: [KeypointIndex; 2] = [KeypointIndex::LeftHip, KeypointIndex::RightHip];
    pub const ANKLES: [KeypointIndex; 2] = [KeypointIndex::LeftAnkle, KeypointIndex::RightAnkle];

    pub fn index(self) -> usize {
        self as usize
    }
}

/// Single keypoint in frame pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    /// Confidence score (0.0 to 1.0)
    pub confidence: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }

    /// Strictly above the threshold
    pub fn is_valid(&self, threshold: f32) -> bool {
        self.confidence > threshold
    }

    pub fn distance(&self, other: &Keypoint) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }

    /// Coerce a raw `[x, y, conf]` triple; non-finite values become an invisible point
    pub fn from_raw(raw: [f32; 3]) -> Self {
        let [x, y, confidence] = raw;
        if !(x.is_finite() && y.is_finite() && confidence.is_finite()) {
            return Self::default();
        }
        Self::new(x, y, confidence.clamp(0.0, 1.0))
    }
}

/// Mean position of the points, `None` when empty
pub fn centroid<'a>(points: impl IntoIterator<Item = &'a Keypoint>) -> Option<(f32, f32)> {
    let (sum_x, sum_y, n) = points
        .into_iter()
        .fold((0.0f32, 0.0f32, 0usize), |(sx, sy, n), p| (sx + p.x, sy + p.y, n + 1));
    (n > 0).then(|| (sum_x / n as f32, sum_y / n as f32))
}
