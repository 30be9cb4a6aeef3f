#![deny(unreachable_patterns)]
//! Sprint segment video analysis.
//!
//! This crate provides:
//! - FFprobe inspection and FFmpeg raw-frame decoding with cancellation via `kill_on_drop`
//! - Pluggable pose landmark extraction (ONNX model or fixture)
//! - Pixel-to-meter mapping, velocity smoothing and outlier screening
//! - Stride segmentation and four-segment stitching into a 100 m trace
//! - Coaching insights over the stitched trace

pub mod decode;
pub mod error;
pub mod insights;
pub mod kinematics;
pub mod landmarks;
pub mod metrics;
pub mod pipeline;
pub mod probe;

pub use decode::{DecodedFrame, FrameStream};
pub use error::{MediaError, MediaResult};
pub use insights::{compare_performances, performance_summary, training_recommendations};
pub use kinematics::{KinematicSmoother, SegmentStitcher, SmoothedSegment, StrideSegmenter};
pub use landmarks::{
    ExtractedFrames, FixtureDetector, FixtureFrame, LandmarkDetector, LandmarkExtractor,
    OrtPoseDetector, PoseLandmarks,
};
pub use pipeline::{analyze_frames, analyze_positions, SegmentPipeline, SegmentProcessor};
pub use probe::{probe_video, validate_segment_video, VideoInfo};
