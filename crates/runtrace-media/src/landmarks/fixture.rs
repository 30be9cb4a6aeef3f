//! Deterministic landmark detector replaying fixed per-frame coordinates.
//!
//! Used for degraded mode (landmarks supplied by the caller instead of a
//! model) and in tests. Each frame is answered by its index in the video,
//! so concurrent segments sharing one detector never see each other's script.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::keypoint::PoseLandmarks;
use super::LandmarkDetector;
use crate::decode::DecodedFrame;
use crate::error::{MediaError, MediaResult};

/// Scripted answer for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FixtureFrame {
    /// Hip center at normalized `(x, y)`.
    Hip(f32, f32),
    /// No person in the frame.
    Missing,
    /// The detector errors on this frame.
    Fail,
    /// The detector blocks for the given time, then reports the hip.
    Stall(Duration, f32, f32),
}

/// Detector that replays a script; frames past its end are `Missing`.
pub struct FixtureDetector {
    frames: Vec<FixtureFrame>,
    calls: AtomicUsize,
}

impl FixtureDetector {
    pub fn new(frames: Vec<FixtureFrame>) -> Self {
        Self {
            frames,
            calls: AtomicUsize::new(0),
        }
    }

    /// Runner moving linearly across the frame from `start_x` to `end_x`.
    pub fn linear(frame_count: usize, start_x: f32, end_x: f32) -> Self {
        let step = if frame_count > 1 {
            (end_x - start_x) / (frame_count - 1) as f32
        } else {
            0.0
        };
        let frames = (0..frame_count)
            .map(|i| FixtureFrame::Hip(start_x + step * i as f32, 0.5))
            .collect();
        Self::new(frames)
    }

    /// Number of frames answered so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl LandmarkDetector for FixtureDetector {
    fn detect(&self, frame: &DecodedFrame) -> MediaResult<Option<PoseLandmarks>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let index = frame.index;
        let scripted = usize::try_from(index)
            .ok()
            .and_then(|i| self.frames.get(i).copied());
        match scripted.unwrap_or(FixtureFrame::Missing) {
            FixtureFrame::Hip(x, y) => Ok(Some(PoseLandmarks::from_hip_center(x, y))),
            FixtureFrame::Missing => Ok(None),
            FixtureFrame::Fail => Err(MediaError::detection_failed(format!(
                "scripted failure at frame {}",
                index
            ))),
            FixtureFrame::Stall(delay, x, y) => {
                std::thread::sleep(delay);
                Ok(Some(PoseLandmarks::from_hip_center(x, y)))
            }
        }
    }

    fn name(&self) -> &'static str {
        "fixture"
    }
}
