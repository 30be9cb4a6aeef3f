//! Statistical helpers for velocity series.
//!
//! - Basic statistics (mean, population standard deviation)
//! - Centered moving average with shrinking boundary windows
//! - z-scores

/// Arithmetic mean; `0.0` for an empty slice.
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation; `0.0` for fewer than two values.
pub fn std_deviation(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let avg = mean(values);
    let variance = values.iter().map(|v| (v - avg).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Centered moving average.
///
/// Each output is the mean of the inputs in `[i - window/2, i + window/2]`
/// clipped to the series. An even window therefore spans `window + 1`
/// samples away from the boundaries. The window shrinks at the boundaries: no padding,
/// no wraparound. Series shorter than the window simply use every sample
/// the clipped window reaches.
pub fn moving_average(data: &[f64], window: usize) -> Vec<f64> {
    if window <= 1 || data.len() < 2 {
        return data.to_vec();
    }

    let half = window / 2;
    (0..data.len())
        .map(|i| {
            let start = i.saturating_sub(half);
            let end = (i + half + 1).min(data.len());
            mean(&data[start..end])
        })
        .collect()
}

/// Spread below this is rounding noise, not variation.
const MIN_STD: f64 = 1e-9;

/// Absolute z-score of each value against the series' mean and population std.
///
/// A constant series (std of zero) yields all zeros.
pub fn abs_z_scores(values: &[f64]) -> Vec<f64> {
    let avg = mean(values);
    let std = std_deviation(values);
    if std <= MIN_STD {
        return vec![0.0; values.len()];
    }
    values.iter().map(|v| ((v - avg) / std).abs()).collect()
}
