//! Worker configuration.

use std::path::PathBuf;
use std::time::Duration;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Per-frame pose inference budget
    pub frame_timeout: Duration,
    /// Maximum segments processed concurrently within one run
    pub max_segment_parallel: usize,
    /// Directory for staged segment videos
    pub work_dir: PathBuf,
    /// Pose model path; falls back to the default search when unset
    pub pose_model: Option<PathBuf>,
    /// Minimum hip keypoint confidence
    pub min_keypoint_confidence: f32,
    /// Reject segment videos outside the 1-10 s window
    pub validate_duration: bool,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            frame_timeout: Duration::from_millis(2000),
            max_segment_parallel: 4,
            work_dir: std::env::temp_dir().join("runtrace"),
            pose_model: None,
            min_keypoint_confidence: 0.3,
            validate_duration: true,
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables (and `.env` when present).
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            frame_timeout: Duration::from_millis(
                lookup("RUNTRACE_FRAME_TIMEOUT_MS")
                    .and_then(|s| s.parse().ok())
                    .filter(|ms: &u64| *ms > 0)
                    .unwrap_or(2000),
            ),
            max_segment_parallel: lookup("RUNTRACE_MAX_SEGMENT_PARALLEL")
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.max_segment_parallel),
            work_dir: lookup("RUNTRACE_WORK_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.work_dir),
            pose_model: lookup("RUNTRACE_POSE_MODEL")
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            min_keypoint_confidence: lookup("RUNTRACE_MIN_KEYPOINT_CONFIDENCE")
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.min_keypoint_confidence),
            validate_duration: lookup("RUNTRACE_VALIDATE_DURATION")
                .map(|s| !matches!(s.to_lowercase().as_str(), "0" | "false" | "no" | "off"))
                .unwrap_or(defaults.validate_duration),
        }
    }
}
