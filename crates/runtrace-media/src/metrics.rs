//! Counters for frame and segment processing.
//!
//! Recorded through the `metrics` facade; without an installed recorder
//! these calls are no-ops.

use metrics::{counter, histogram};

/// Metric names as constants for consistency.
pub mod names {
    pub const FRAMES_TOTAL: &str = "runtrace_frames_total";
    pub const FRAME_TIMEOUTS_TOTAL: &str = "runtrace_frame_timeouts_total";
    pub const SEGMENTS_PROCESSED_TOTAL: &str = "runtrace_segments_processed_total";
    pub const SEGMENT_DURATION_SECONDS: &str = "runtrace_segment_processing_seconds";
    pub const RUNS_TOTAL: &str = "runtrace_runs_total";
}

/// Record one processed frame.
pub fn record_frame(detected: bool) {
    let labels = [("detected", detected.to_string())];
    counter!(names::FRAMES_TOTAL, &labels).increment(1);
}

/// Record a detector call that exceeded its time budget.
pub fn record_frame_timeout() {
    counter!(names::FRAME_TIMEOUTS_TOTAL).increment(1);
}

/// Record a finished segment.
pub fn record_segment(range: &str, zero_confidence: bool, duration_secs: f64) {
    let labels = [
        ("range", range.to_string()),
        ("zero_confidence", zero_confidence.to_string()),
    ];
    counter!(names::SEGMENTS_PROCESSED_TOTAL, &labels).increment(1);
    histogram!(names::SEGMENT_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record a finished run; `outcome` is `completed`, `failed` or `cancelled`.
pub fn record_run(outcome: &'static str) {
    counter!(names::RUNS_TOTAL, "outcome" => outcome).increment(1);
}
