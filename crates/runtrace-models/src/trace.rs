//! Stitched 100 m trace.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::{CourseRange, PositionSample, SegmentRecord, VelocitySample};

/// Course-global position/velocity series built from the four segments.
///
/// Timestamps and positions in the series already carry the cumulative
/// segment offsets; the segment records keep their local values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct StitchedTrace {
    /// Segment records in canonical course order.
    pub segments: Vec<SegmentRecord>,
    pub position_series: Vec<PositionSample>,
    pub velocity_series: Vec<VelocitySample>,
    /// Maximum over all valid velocity samples (m/s)
    pub max_velocity: f64,
    /// Mean over all valid velocity samples (m/s)
    pub avg_velocity: f64,
    /// Always 100 m
    pub total_distance: f64,
    /// Sum of segment durations (s)
    pub total_time: f64,
    /// Ranges whose segment had no valid velocity.
    pub zero_confidence_ranges: Vec<CourseRange>,
}

impl StitchedTrace {
    /// True when any segment is degenerate.
    pub fn is_low_confidence(&self) -> bool {
        !self.zero_confidence_ranges.is_empty()
    }

    pub fn segment(&self, range: CourseRange) -> Option<&SegmentRecord> {
        self.segments.iter().find(|s| s.range() == range)
    }

    /// Per-range mean speeds in course order.
    pub fn range_avg_speeds(&self) -> Vec<f64> {
        self.segments.iter().map(|s| s.summary().avg_speed).collect()
    }
}
