//! Per-call analysis configuration.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default centered moving-average window (samples).
pub const DEFAULT_SMOOTHING_WINDOW: usize = 5;

/// Default z-score above which a smoothed velocity is rejected.
pub const DEFAULT_OUTLIER_Z_THRESHOLD: f64 = 3.0;

/// Default minimum peak velocity for a stride boundary (m/s).
pub const DEFAULT_STRIDE_PEAK_THRESHOLD_MPS: f64 = 0.5;

/// Default upper bound on a physically plausible sprint velocity (m/s).
pub const DEFAULT_MAX_PLAUSIBLE_SPEED_MPS: f64 = 15.0;

/// Tunables for one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Moving-average window in samples (default: 5)
    pub smoothing_window: usize,

    /// z-score rejection threshold on the smoothed velocities (default: 3.0)
    #[serde(with = "unbounded")]
    #[schemars(with = "Option<f64>")]
    pub outlier_z_threshold: f64,

    /// Minimum velocity for a local maximum to count as a stride boundary (default: 0.5)
    #[serde(with = "unbounded")]
    #[schemars(with = "Option<f64>")]
    pub stride_peak_threshold_mps: f64,

    /// Velocities above this are never valid (default: 15.0)
    #[serde(with = "unbounded")]
    #[schemars(with = "Option<f64>")]
    pub max_plausible_speed_mps: f64,
}

/// Thresholds as JSON: `null` stands for `f64::INFINITY`, which JSON cannot hold.
mod unbounded {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_none()
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::INFINITY))
    }
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            smoothing_window: DEFAULT_SMOOTHING_WINDOW,
            outlier_z_threshold: DEFAULT_OUTLIER_Z_THRESHOLD,
            stride_peak_threshold_mps: DEFAULT_STRIDE_PEAK_THRESHOLD_MPS,
            max_plausible_speed_mps: DEFAULT_MAX_PLAUSIBLE_SPEED_MPS,
        }
    }
}

impl AnalysisConfig {
    /// Check every field before any processing starts.
    ///
    /// Thresholds may be `f64::INFINITY` to disable the corresponding filter.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.smoothing_window == 0 {
            return Err(ConfigError::NonPositiveWindow);
        }
        check_threshold("outlier_z_threshold", self.outlier_z_threshold)?;
        check_threshold("stride_peak_threshold_mps", self.stride_peak_threshold_mps)?;
        check_threshold("max_plausible_speed_mps", self.max_plausible_speed_mps)?;
        if self.max_plausible_speed_mps == 0.0 {
            return Err(ConfigError::InvalidThreshold {
                field: "max_plausible_speed_mps",
                value: self.max_plausible_speed_mps,
            });
        }
        Ok(())
    }

    pub fn with_smoothing_window(mut self, window: usize) -> Self {
        self.smoothing_window = window;
        self
    }

    pub fn with_outlier_z_threshold(mut self, threshold: f64) -> Self {
        self.outlier_z_threshold = threshold;
        self
    }

    pub fn with_stride_peak_threshold(mut self, threshold: f64) -> Self {
        self.stride_peak_threshold_mps = threshold;
        self
    }

    pub fn with_max_plausible_speed(mut self, speed: f64) -> Self {
        self.max_plausible_speed_mps = speed;
        self
    }
}

fn check_threshold(field: &'static str, value: f64) -> Result<(), ConfigError> {
    // NaN fails the comparison as well.
    if !(value >= 0.0) {
        return Err(ConfigError::InvalidThreshold { field, value });
    }
    Ok(())
}

/// Rejected analysis configuration.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("smoothing_window must be at least 1")]
    NonPositiveWindow,

    #[error("{field} must be a non-negative number, got {value}")]
    InvalidThreshold { field: &'static str, value: f64 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AnalysisConfig::default();
        assert_eq!(config.smoothing_window, 5);
        assert_eq!(config.outlier_z_threshold, 3.0);
        assert_eq!(config.stride_peak_threshold_mps, 0.5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_window_rejected() {
        let config = AnalysisConfig::default().with_smoothing_window(0);
        assert_eq!(config.validate(), Err(ConfigError::NonPositiveWindow));
    }

    #[test]
    fn test_negative_thresholds_rejected() {
        assert!(AnalysisConfig::default()
            .with_outlier_z_threshold(-1.0)
            .validate()
            .is_err());
        assert!(AnalysisConfig::default()
            .with_stride_peak_threshold(-0.1)
            .validate()
            .is_err());
        assert!(AnalysisConfig::default()
            .with_outlier_z_threshold(f64::NAN)
            .validate()
            .is_err());
        assert!(AnalysisConfig::default()
            .with_max_plausible_speed(0.0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_infinite_threshold_disables_filter() {
        let config = AnalysisConfig::default().with_outlier_z_threshold(f64::INFINITY);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_infinite_threshold_survives_json() {
        let config = AnalysisConfig::default()
            .with_outlier_z_threshold(f64::INFINITY)
            .with_max_plausible_speed(f64::INFINITY);

        let json = serde_json::to_string(&config).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert!(value["outlier_z_threshold"].is_null());
        assert_eq!(value["stride_peak_threshold_mps"], 0.5);

        let back: AnalysisConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
        assert!(back.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AnalysisConfig = serde_json::from_str(r#"{"smoothing_window": 7}"#).unwrap();
        assert_eq!(config.smoothing_window, 7);
        assert_eq!(config.outlier_z_threshold, DEFAULT_OUTLIER_Z_THRESHOLD);
    }
}
