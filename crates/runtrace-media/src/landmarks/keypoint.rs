//! Body keypoints in normalized image coordinates.

/// COCO 17-keypoint layout used by MoveNet-style single-pose models.
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
}

/// Single keypoint; `x`/`y` normalized to `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub confidence: f32,
}

impl Keypoint {
    pub fn new(x: f32, y: f32, confidence: f32) -> Self {
        Self { x, y, confidence }
    }

    pub fn is_valid(&self, threshold: f32) -> bool {
        self.confidence >= threshold
    }
}

/// All keypoints of one detected person.
#[derive(Debug, Clone, PartialEq)]
pub struct PoseLandmarks {
    keypoints: [Keypoint; KeypointIndex::COUNT],
}

impl PoseLandmarks {
    pub fn new(keypoints: [Keypoint; KeypointIndex::COUNT]) -> Self {
        Self { keypoints }
    }

    /// Pose carrying only the two hips at the given normalized point.
    pub fn from_hip_center(x: f32, y: f32) -> Self {
        let mut keypoints = [Keypoint::default(); KeypointIndex::COUNT];
        keypoints[KeypointIndex::LeftHip as usize] = Keypoint::new(x, y, 1.0);
        keypoints[KeypointIndex::RightHip as usize] = Keypoint::new(x, y, 1.0);
        Self { keypoints }
    }

    pub fn get(&self, index: KeypointIndex) -> &Keypoint {
        &self.keypoints[index as usize]
    }

    pub fn keypoints(&self) -> &[Keypoint] {
        &self.keypoints
    }

    /// Mean confidence over all keypoints; a rough "is anyone there" score.
    pub fn mean_confidence(&self) -> f32 {
        self.keypoints.iter().map(|k| k.confidence).sum::<f32>() / KeypointIndex::COUNT as f32
    }

    /// Normalized hip center: mean of both hips, or the single confident hip.
    pub fn hip_center(&self, min_confidence: f32) -> Option<(f32, f32)> {
        let left = self.get(KeypointIndex::LeftHip);
        let right = self.get(KeypointIndex::RightHip);

        match (left.is_valid(min_confidence), right.is_valid(min_confidence)) {
            (true, true) => Some(((left.x + right.x) / 2.0, (left.y + right.y) / 2.0)),
            (true, false) => Some((left.x, left.y)),
            (false, true) => Some((right.x, right.y)),
            (false, false) => None,
        }
    }
}
