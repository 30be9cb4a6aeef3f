//! Velocity derivation, smoothing and outlier rejection.
//!
//! Positions become raw per-pair velocities, which are smoothed with a
//! centered moving average and then screened twice: a z-score test against
//! the smoothed series and a hard physical speed cap.

use tracing::debug;

use runtrace_models::{AnalysisConfig, PositionSample, VelocitySample};

use super::stats::{abs_z_scores, mean, moving_average};

/// Smoothed velocities of one segment and their summary.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SmoothedSegment {
    pub velocities: Vec<VelocitySample>,
    /// Maximum over valid samples; `0.0` when none are valid.
    pub max_speed: f64,
    /// Mean over valid samples; `0.0` when none are valid.
    pub avg_speed: f64,
    /// No valid velocity survived.
    pub zero_confidence: bool,
    /// Position pairs skipped for a non-positive time step.
    pub pairs_dropped: usize,
    /// Samples marked invalid by either screen.
    pub outliers_rejected: usize,
}

impl SmoothedSegment {
    pub fn valid_count(&self) -> usize {
        self.velocities.iter().filter(|v| v.valid).count()
    }
}

/// Turns position samples into screened velocity samples.
#[derive(Debug, Clone)]
pub struct KinematicSmoother {
    window: usize,
    z_threshold: f64,
    max_plausible_speed: f64,
}

impl KinematicSmoother {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            window: config.smoothing_window,
            z_threshold: config.outlier_z_threshold,
            max_plausible_speed: config.max_plausible_speed_mps,
        }
    }

    /// Raw absolute velocities between consecutive positions.
    ///
    /// Each sample carries the later position and timestamp of its pair.
    /// Returns the samples and the number of pairs dropped for `Δt <= 0`.
    pub fn raw_velocities(positions: &[PositionSample]) -> (Vec<VelocitySample>, usize) {
        let mut dropped = 0;
        let velocities = positions
            .windows(2)
            .filter_map(|pair| {
                let dt = pair[1].timestamp - pair[0].timestamp;
                if !(dt > 0.0) {
                    dropped += 1;
                    return None;
                }
                let dp = pair[1].position_m - pair[0].position_m;
                Some(VelocitySample::new(
                    pair[1].timestamp,
                    (dp / dt).abs(),
                    pair[1].position_m,
                ))
            })
            .collect();
        (velocities, dropped)
    }

    /// Centered moving average with this smoother's window.
    pub fn smooth_series(&self, values: &[f64]) -> Vec<f64> {
        moving_average(values, self.window)
    }

    /// Full pass: derive, smooth, screen, summarize.
    pub fn smooth(&self, positions: &[PositionSample]) -> SmoothedSegment {
        let (raw, pairs_dropped) = Self::raw_velocities(positions);
        let speeds: Vec<f64> = raw.iter().map(|v| v.velocity_mps).collect();
        let smoothed = self.smooth_series(&speeds);
        let z_scores = abs_z_scores(&smoothed);

        let mut outliers_rejected = 0;
        let velocities: Vec<VelocitySample> = raw
            .iter()
            .zip(smoothed.iter().zip(z_scores.iter()))
            .map(|(sample, (&speed, &z))| {
                let screened = VelocitySample::new(sample.timestamp, speed, sample.position_m);
                if z > self.z_threshold || speed > self.max_plausible_speed {
                    outliers_rejected += 1;
                    screened.invalidated()
                } else {
                    screened
                }
            })
            .collect();

        let valid: Vec<f64> = velocities
            .iter()
            .filter(|v| v.valid)
            .map(|v| v.velocity_mps)
            .collect();
        let zero_confidence = valid.is_empty();
        let max_speed = valid.iter().copied().fold(0.0, f64::max);
        let avg_speed = mean(&valid);

        debug!(
            positions = positions.len(),
            velocities = velocities.len(),
            pairs_dropped,
            outliers_rejected,
            "Smoothed velocity series"
        );

        SmoothedSegment {
            velocities,
            max_speed,
            avg_speed,
            zero_confidence,
            pairs_dropped,
            outliers_rejected,
        }
    }
}

/// Acceleration at each sample (`dv/dt` against the previous one).
///
/// The first sample and any sample with `Δt <= 0` get `0.0`.
pub fn acceleration_series(velocities: &[VelocitySample]) -> Vec<f64> {
    let mut accelerations = Vec::with_capacity(velocities.len());
    if velocities.is_empty() {
        return accelerations;
    }
    accelerations.push(0.0);
    for pair in velocities.windows(2) {
        let dt = pair[1].timestamp - pair[0].timestamp;
        if dt > 0.0 {
            accelerations.push((pair[1].velocity_mps - pair[0].velocity_mps) / dt);
        } else {
            accelerations.push(0.0);
        }
    }
    accelerations
}

/// Fill invalid samples from their nearest valid neighbours.
///
/// Interior gaps take the mean of the nearest valid sample on each side;
/// leading and trailing gaps copy the nearest valid one. Filled samples are
/// marked valid. A series with no valid sample is returned unchanged.
pub fn interpolate_invalid(velocities: &[VelocitySample]) -> Vec<VelocitySample> {
    let valid_indices: Vec<usize> = velocities
        .iter()
        .enumerate()
        .filter(|(_, v)| v.valid)
        .map(|(i, _)| i)
        .collect();
    if valid_indices.is_empty() {
        return velocities.to_vec();
    }

    velocities
        .iter()
        .enumerate()
        .map(|(i, sample)| {
            if sample.valid {
                return *sample;
            }
            let after = valid_indices.partition_point(|&j| j < i);
            let prev = after.checked_sub(1).map(|k| velocities[valid_indices[k]].velocity_mps);
            let next = valid_indices.get(after).map(|&j| velocities[j].velocity_mps);
            let filled = match (prev, next) {
                (Some(p), Some(n)) => (p + n) / 2.0,
                (Some(p), None) => p,
                (None, Some(n)) => n,
                (None, None) => sample.velocity_mps,
            };
            VelocitySample::new(sample.timestamp, filled, sample.position_m)
        })
        .collect()
}
