//! Error types for media and kinematic operations.

use std::path::PathBuf;
use thiserror::Error;

use runtrace_models::{ConfigError, CourseRange};

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur while turning segment videos into a 100 m trace.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    /// A single frame could not be decoded. Recovered per frame.
    #[error("Frame decode failed: {0}")]
    FrameDecode(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Operation timed out after {0} ms")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid video file: {0}")]
    InvalidVideo(String),

    #[error("Pose detection failed: {0}")]
    DetectionFailed(String),

    #[error("Model not found: {0}")]
    ModelNotFound(String),

    /// Fewer than four distinct ranges reached the stitcher.
    #[error("Incomplete course: missing ranges {}", format_ranges(.missing))]
    IncompleteCourse { missing: Vec<CourseRange> },

    #[error("Segment {0} supplied more than once")]
    DuplicateSegment(CourseRange),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

fn format_ranges(ranges: &[CourseRange]) -> String {
    ranges
        .iter()
        .map(|r| r.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

impl MediaError {
    /// Create a detection failure error.
    pub fn detection_failed(message: impl Into<String>) -> Self {
        Self::DetectionFailed(message.into())
    }

    /// Create a frame decode error.
    pub fn frame_decode(message: impl Into<String>) -> Self {
        Self::FrameDecode(message.into())
    }

    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create a model not found error.
    pub fn model_not_found(path: impl Into<String>) -> Self {
        Self::ModelNotFound(path.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Only structural course problems abort a run; per-frame and per-sample
    /// anomalies are folded into confidence flags instead.
    pub fn is_course_error(&self) -> bool {
        matches!(
            self,
            MediaError::IncompleteCourse { .. } | MediaError::DuplicateSegment(_)
        )
    }
}
