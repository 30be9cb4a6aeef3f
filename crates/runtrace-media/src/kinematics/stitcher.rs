//! Combine four segment-local records into one course-global trace.

use tracing::{debug, info, warn};

use runtrace_models::{
    CourseRange, PositionSample, SegmentRecord, StitchedTrace, VelocitySample, COURSE_DISTANCE_M,
    SEGMENT_DISTANCE_M,
};

use super::stats::mean;
use crate::error::{MediaError, MediaResult};

/// Stitches segment records with cumulative time and position offsets.
#[derive(Debug, Clone, Default)]
pub struct SegmentStitcher;

impl SegmentStitcher {
    pub fn new() -> Self {
        Self
    }

    /// Stitch records given in any order.
    ///
    /// Every course range must appear exactly once. Each segment's samples
    /// are shifted by the running offsets; after a segment the time offset
    /// grows by its effective duration and the position offset by 25 m.
    pub fn stitch(&self, records: Vec<SegmentRecord>) -> MediaResult<StitchedTrace> {
        let segments = Self::arrange(records)?;

        let mut position_series = Vec::new();
        let mut velocity_series: Vec<VelocitySample> = Vec::new();
        let mut time_offset = 0.0;
        let mut position_offset = 0.0;

        for segment in &segments {
            position_series.extend(segment.positions().iter().map(|p| {
                PositionSample::new(p.timestamp + time_offset, p.position_m + position_offset)
            }));
            velocity_series.extend(segment.velocities().iter().map(|v| VelocitySample {
                timestamp: v.timestamp + time_offset,
                position_m: v.position_m + position_offset,
                ..*v
            }));

            debug!(
                range = %segment.range(),
                time_offset,
                position_offset,
                "Stitched segment"
            );

            time_offset += segment.effective_duration();
            position_offset += SEGMENT_DISTANCE_M;
        }

        let valid: Vec<f64> = velocity_series
            .iter()
            .filter(|v| v.valid)
            .map(|v| v.velocity_mps)
            .collect();
        let max_velocity = valid.iter().copied().fold(0.0, f64::max);
        let avg_velocity = mean(&valid);

        let zero_confidence_ranges: Vec<CourseRange> = segments
            .iter()
            .filter(|s| s.summary().zero_confidence)
            .map(|s| s.range())
            .collect();
        if !zero_confidence_ranges.is_empty() {
            warn!(
                ranges = ?zero_confidence_ranges,
                "Stitched trace has segments without valid velocity"
            );
        }

        info!(
            total_time = time_offset,
            max_velocity,
            avg_velocity,
            samples = velocity_series.len(),
            "Stitched 100m trace"
        );

        Ok(StitchedTrace {
            segments,
            position_series,
            velocity_series,
            max_velocity,
            avg_velocity,
            total_distance: COURSE_DISTANCE_M,
            total_time: time_offset,
            zero_confidence_ranges,
        })
    }

    /// Sort records into course order, rejecting gaps and repeats.
    fn arrange(mut records: Vec<SegmentRecord>) -> MediaResult<Vec<SegmentRecord>> {
        records.sort_by_key(|r| r.range());

        if let Some(pair) = records.windows(2).find(|w| w[0].range() == w[1].range()) {
            return Err(MediaError::DuplicateSegment(pair[0].range()));
        }

        let missing: Vec<CourseRange> = CourseRange::ALL
            .iter()
            .copied()
            .filter(|range| !records.iter().any(|r| r.range() == *range))
            .collect();
        if !missing.is_empty() {
            return Err(MediaError::IncompleteCourse { missing });
        }

        Ok(records)
    }
}
