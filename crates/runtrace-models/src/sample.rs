//! Per-frame and per-sample kinematic data.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Landmark anchor for one processed video frame.
///
/// `detected == false` means the extractor found no landmark and the pixel
/// coordinates carry no spatial meaning.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FrameSample {
    /// Seconds since the first frame of the segment (`frame_index / fps`).
    pub timestamp: f64,
    /// Hip-center x coordinate in pixels.
    pub pixel_x: f64,
    /// Hip-center y coordinate in pixels.
    pub pixel_y: f64,
    pub detected: bool,
}

impl FrameSample {
    /// A frame with a detected anchor point.
    pub fn detected(timestamp: f64, pixel_x: f64, pixel_y: f64) -> Self {
        Self {
            timestamp,
            pixel_x,
            pixel_y,
            detected: true,
        }
    }

    /// A frame where the detector produced nothing (or failed).
    pub fn undetected(timestamp: f64) -> Self {
        Self {
            timestamp,
            pixel_x: 0.0,
            pixel_y: 0.0,
            detected: false,
        }
    }
}

/// Real-world position of the runner at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PositionSample {
    pub timestamp: f64,
    pub position_m: f64,
}

impl PositionSample {
    pub fn new(timestamp: f64, position_m: f64) -> Self {
        Self {
            timestamp,
            position_m,
        }
    }
}

/// Speed between two consecutive position samples.
///
/// `timestamp` and `position_m` are those of the later sample of the pair.
/// Samples rejected as outliers stay in the series with `valid == false`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VelocitySample {
    pub timestamp: f64,
    pub velocity_mps: f64,
    pub position_m: f64,
    pub valid: bool,
}

impl VelocitySample {
    pub fn new(timestamp: f64, velocity_mps: f64, position_m: f64) -> Self {
        Self {
            timestamp,
            velocity_mps,
            position_m,
            valid: true,
        }
    }

    /// Same sample marked as rejected.
    pub fn invalidated(self) -> Self {
        Self {
            valid: false,
            ..self
        }
    }
}
