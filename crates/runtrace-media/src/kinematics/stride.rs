//! Stride segmentation from local velocity peaks.
//!
//! A stride is the interval between two consecutive velocity peaks. Its
//! length is the distance covered between the peaks and its duration the
//! time between them.

use runtrace_models::{AnalysisConfig, SegmentRecord, Stride, StrideMetrics, VelocitySample};

use super::stats::{mean, std_deviation};

/// Finds stride boundaries in a smoothed velocity series.
#[derive(Debug, Clone)]
pub struct StrideSegmenter {
    peak_threshold: f64,
}

impl StrideSegmenter {
    pub fn new(config: &AnalysisConfig) -> Self {
        Self {
            peak_threshold: config.stride_peak_threshold_mps,
        }
    }

    pub fn with_peak_threshold(peak_threshold: f64) -> Self {
        Self { peak_threshold }
    }

    /// Indices of strict local maxima above the peak threshold.
    ///
    /// Endpoints are never peaks.
    pub fn find_peaks(&self, speeds: &[f64]) -> Vec<usize> {
        if speeds.len() < 3 {
            return Vec::new();
        }
        (1..speeds.len() - 1)
            .filter(|&i| {
                speeds[i] > speeds[i - 1]
                    && speeds[i] > speeds[i + 1]
                    && speeds[i] > self.peak_threshold
            })
            .collect()
    }

    /// Strides between consecutive peaks that both land on valid samples.
    ///
    /// A peak on an invalid sample ends the chain; strides never bridge it.
    pub fn strides(&self, velocities: &[VelocitySample]) -> Vec<Stride> {
        let speeds: Vec<f64> = velocities.iter().map(|v| v.velocity_mps).collect();
        let peaks = self.find_peaks(&speeds);

        peaks
            .windows(2)
            .filter(|pair| velocities[pair[0]].valid && velocities[pair[1]].valid)
            .map(|pair| {
                let (start, end) = (&velocities[pair[0]], &velocities[pair[1]]);
                Stride {
                    start_index: pair[0],
                    end_index: pair[1],
                    length_m: (end.position_m - start.position_m).abs(),
                    duration_s: end.timestamp - start.timestamp,
                }
            })
            .collect()
    }

    /// Strides and their metrics for one velocity series.
    pub fn segment(&self, velocities: &[VelocitySample]) -> (Vec<Stride>, StrideMetrics) {
        let strides = self.strides(velocities);
        let metrics = Self::aggregate(&strides);
        (strides, metrics)
    }

    /// Metrics over strides pooled from all segments of a course.
    ///
    /// Strides never span a segment boundary.
    pub fn course_metrics(&self, records: &[SegmentRecord]) -> StrideMetrics {
        let pooled: Vec<Stride> = records
            .iter()
            .flat_map(|record| self.strides(record.velocities()))
            .collect();
        Self::aggregate(&pooled)
    }

    /// Summary statistics for a set of strides.
    pub fn aggregate(strides: &[Stride]) -> StrideMetrics {
        if strides.is_empty() {
            return StrideMetrics::default();
        }

        let lengths: Vec<f64> = strides.iter().map(|s| s.length_m).collect();
        let durations: Vec<f64> = strides.iter().map(|s| s.duration_s).collect();

        let avg_stride_length = mean(&lengths);
        let std_stride_length = std_deviation(&lengths);
        let avg_duration = mean(&durations);

        let avg_stride_frequency = if avg_duration > 0.0 {
            1.0 / avg_duration
        } else {
            0.0
        };

        let stride_consistency = if strides.len() < 2 || avg_stride_length <= 0.0 {
            0.0
        } else {
            (1.0 - std_stride_length / avg_stride_length).clamp(0.0, 1.0)
        };

        StrideMetrics {
            num_strides: strides.len(),
            avg_stride_length,
            std_stride_length,
            avg_stride_frequency,
            stride_consistency,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn series(speeds: &[f64], dt: f64) -> Vec<VelocitySample> {
        let mut position = 0.0;
        speeds
            .iter()
            .enumerate()
            .map(|(i, &v)| {
                position += v * dt;
                VelocitySample::new((i + 1) as f64 * dt, v, position)
            })
            .collect()
    }

    fn stride(length_m: f64, duration_s: f64) -> Stride {
        Stride {
            start_index: 0,
            end_index: 1,
            length_m,
            duration_s,
        }
    }

    #[test]
    fn test_oscillating_series_has_two_peaks() {
        let segmenter = StrideSegmenter::with_peak_threshold(0.5);
        assert_eq!(segmenter.find_peaks(&[1.0, 3.0, 1.0, 3.0, 1.0]), vec![1, 3]);
    }

    #[test]
    fn test_peaks_respect_threshold_and_plateaus() {
        let segmenter = StrideSegmenter::with_peak_threshold(2.0);
        assert_eq!(segmenter.find_peaks(&[1.0, 1.5, 1.0, 3.0, 1.0]), vec![3]);
        // Flat tops are not strict maxima.
        assert!(segmenter.find_peaks(&[1.0, 3.0, 3.0, 1.0]).is_empty());
        assert!(segmenter.find_peaks(&[5.0, 1.0]).is_empty());
    }

    #[test]
    fn test_strides_between_consecutive_peaks() {
        let segmenter = StrideSegmenter::with_peak_threshold(0.5);
        let velocities = series(&[1.0, 3.0, 1.0, 3.0, 1.0, 3.0, 1.0], 0.1);
        let (strides, metrics) = segmenter.segment(&velocities);

        assert_eq!(strides.len(), 2);
        assert_eq!((strides[0].start_index, strides[0].end_index), (1, 3));
        assert!((strides[0].duration_s - 0.2).abs() < 1e-9);
        assert!((strides[0].length_m - 0.4).abs() < 1e-9);
        assert_eq!(metrics.num_strides, 2);
        assert!((metrics.avg_stride_frequency - 5.0).abs() < 1e-6);
        assert!((metrics.stride_consistency - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_peaks_are_skipped() {
        let segmenter = StrideSegmenter::with_peak_threshold(0.5);
        let mut velocities = series(&[1.0, 3.0, 1.0, 3.0, 1.0], 0.1);
        velocities[3] = velocities[3].invalidated();
        assert!(segmenter.strides(&velocities).is_empty());
    }

    #[test]
    fn test_invalid_peak_is_not_bridged() {
        let segmenter = StrideSegmenter::with_peak_threshold(0.5);
        let mut velocities = series(&[1.0, 3.0, 1.0, 3.0, 1.0, 3.0, 1.0, 3.0, 1.0], 0.1);
        velocities[5] = velocities[5].invalidated();

        let strides = segmenter.strides(&velocities);
        // Peaks 1, 3, 5, 7: only 1 -> 3 has two valid ends.
        assert_eq!(strides.len(), 1);
        assert_eq!((strides[0].start_index, strides[0].end_index), (1, 3));
        assert!((strides[0].length_m - 0.4).abs() < 1e-9);
    }

    #[test]
    fn test_consistency_zero_below_two_strides() {
        assert_eq!(StrideSegmenter::aggregate(&[]).stride_consistency, 0.0);
        let single = StrideSegmenter::aggregate(&[stride(2.0, 0.25)]);
        assert_eq!(single.num_strides, 1);
        assert_eq!(single.stride_consistency, 0.0);
        assert!((single.avg_stride_frequency - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_consistency_bounds() {
        let equal = StrideSegmenter::aggregate(&[stride(2.0, 0.25); 4]);
        assert_eq!(equal.std_stride_length, 0.0);
        assert_eq!(equal.stride_consistency, 1.0);

        // std exceeds mean: clamped at zero.
        let spread = StrideSegmenter::aggregate(&[
            stride(0.01, 0.25),
            stride(0.01, 0.25),
            stride(0.01, 0.25),
            stride(10.0, 0.25),
        ]);
        assert!((0.0..=1.0).contains(&spread.stride_consistency));
        assert_eq!(spread.stride_consistency, 0.0);

        let varied = StrideSegmenter::aggregate(&[stride(2.0, 0.25), stride(2.4, 0.25)]);
        assert!(varied.stride_consistency > 0.0 && varied.stride_consistency < 1.0);
    }

    #[test]
    fn test_zero_duration_frequency() {
        let metrics = StrideSegmenter::aggregate(&[stride(2.0, 0.0), stride(2.0, 0.0)]);
        assert_eq!(metrics.avg_stride_frequency, 0.0);
    }
}
