//! Stride models.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One step cycle between two consecutive velocity peaks.
///
/// Indices refer to the velocity series the stride was detected in.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct Stride {
    pub start_index: usize,
    pub end_index: usize,
    pub length_m: f64,
    pub duration_s: f64,
}

/// Aggregate stride statistics for a segment or a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize, JsonSchema)]
pub struct StrideMetrics {
    pub num_strides: usize,
    /// Mean stride length (m)
    pub avg_stride_length: f64,
    /// Population standard deviation of stride length (m)
    pub std_stride_length: f64,
    /// Strides per second
    pub avg_stride_frequency: f64,
    /// `1 - std/mean` of stride length in `[0, 1]`; `0` with fewer than two strides.
    pub stride_consistency: f64,
}
