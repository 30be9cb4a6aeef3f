//! Shared data models for RunTrace.
//!
//! This crate provides Serde-serializable types for:
//! - Course ranges and segment geometry
//! - Frame, position and velocity samples
//! - Segment records, strides and the stitched 100 m trace
//! - Analysis configuration and the run report
//! - Coaching insights

pub mod config;
pub mod course;
pub mod insight;
pub mod report;
pub mod sample;
pub mod segment;
pub mod stride;
pub mod trace;

// Re-export common types
pub use config::{AnalysisConfig, ConfigError};
pub use course::{CourseRange, ParseCourseRangeError, COURSE_DISTANCE_M, SEGMENT_DISTANCE_M};
pub use insight::{PerformanceComparison, Recommendation, RecommendationCategory};
pub use report::{KinematicReport, RunId};
pub use sample::{FrameSample, PositionSample, VelocitySample};
pub use segment::{SegmentRecord, SegmentSummary, VideoMeta};
pub use stride::{Stride, StrideMetrics};
pub use trace::StitchedTrace;
