//! Segment records: the kinematic result of processing one 25 m video.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{CourseRange, PositionSample, StrideMetrics, VelocitySample, SEGMENT_DISTANCE_M};

/// Source video properties kept alongside a segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct VideoMeta {
    pub fps: f64,
    pub width: u32,
    pub height: u32,
    pub frame_count: u64,
}

impl VideoMeta {
    /// Resolution formatted as `WIDTHxHEIGHT`.
    pub fn resolution(&self) -> String {
        format!("{}x{}", self.width, self.height)
    }
}

/// Scalar summary of one segment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SegmentSummary {
    pub range: CourseRange,
    /// Maximum valid velocity (m/s)
    pub max_speed: f64,
    /// Mean valid velocity (m/s)
    pub avg_speed: f64,
    /// Segment duration in seconds
    pub duration: f64,
    /// Always 25 m
    pub distance: f64,
    /// No valid velocity survived filtering; speeds are zero by policy.
    pub zero_confidence: bool,
    pub frames_total: usize,
    pub frames_detected: usize,
    pub outliers_rejected: usize,
    /// Position pairs dropped because their time delta was not positive.
    pub pairs_dropped: usize,
}

impl SegmentSummary {
    /// Empty summary for a range, zero confidence.
    pub fn empty(range: CourseRange, duration: f64) -> Self {
        Self {
            range,
            max_speed: 0.0,
            avg_speed: 0.0,
            duration,
            distance: SEGMENT_DISTANCE_M,
            zero_confidence: true,
            frames_total: 0,
            frames_detected: 0,
            outliers_rejected: 0,
            pairs_dropped: 0,
        }
    }

    /// Fraction of frames with a detected landmark.
    pub fn detection_rate(&self) -> f64 {
        if self.frames_total == 0 {
            return 0.0;
        }
        self.frames_detected as f64 / self.frames_total as f64
    }
}

/// Kinematic record of one processed segment video.
///
/// Built once per video and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct SegmentRecord {
    range: CourseRange,
    positions: Vec<PositionSample>,
    velocities: Vec<VelocitySample>,
    summary: SegmentSummary,
    strides: StrideMetrics,
    video: Option<VideoMeta>,
}

impl SegmentRecord {
    pub fn new(
        positions: Vec<PositionSample>,
        velocities: Vec<VelocitySample>,
        summary: SegmentSummary,
        strides: StrideMetrics,
        video: Option<VideoMeta>,
    ) -> Self {
        Self {
            range: summary.range,
            positions,
            velocities,
            summary,
            strides,
            video,
        }
    }

    pub fn range(&self) -> CourseRange {
        self.range
    }

    pub fn positions(&self) -> &[PositionSample] {
        &self.positions
    }

    pub fn velocities(&self) -> &[VelocitySample] {
        &self.velocities
    }

    pub fn summary(&self) -> &SegmentSummary {
        &self.summary
    }

    pub fn strides(&self) -> &StrideMetrics {
        &self.strides
    }

    pub fn video(&self) -> Option<&VideoMeta> {
        self.video.as_ref()
    }

    pub fn duration(&self) -> f64 {
        self.summary.duration
    }

    /// Duration used when laying segments end to end.
    ///
    /// Never shorter than the last sample timestamp, so stitched time stays
    /// non-decreasing across segment boundaries.
    pub fn effective_duration(&self) -> f64 {
        let last_position = self.positions.last().map(|p| p.timestamp);
        let last_velocity = self.velocities.last().map(|v| v.timestamp);
        [last_position, last_velocity]
            .into_iter()
            .flatten()
            .fold(self.summary.duration, f64::max)
    }
}
