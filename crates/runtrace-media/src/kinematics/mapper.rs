//! Pixel-to-meter position mapping.
//!
//! The full frame width is assumed to span exactly the 25 m range with no
//! lens or perspective correction. This is an approximation, not a
//! calibration: a runner near the frame edge is mapped as if the camera were
//! infinitely far away.

use runtrace_models::{FrameSample, PositionSample, SEGMENT_DISTANCE_M};

/// Linear scale for a frame whose width spans one 25 m range.
pub fn pixels_per_meter(frame_width_px: u32) -> f64 {
    frame_width_px as f64 / SEGMENT_DISTANCE_M
}

/// Convert a detected anchor into a position: `pixel_x / pixels_per_meter + range_offset_m`.
///
/// Returns `None` for undetected frames and for a non-positive scale.
pub fn map_position(
    sample: &FrameSample,
    pixels_per_meter: f64,
    range_offset_m: f64,
) -> Option<PositionSample> {
    if !sample.detected || !(pixels_per_meter > 0.0) || !pixels_per_meter.is_finite() {
        return None;
    }
    Some(PositionSample::new(
        sample.timestamp,
        sample.pixel_x / pixels_per_meter + range_offset_m,
    ))
}

/// Map every detected frame; undetected frames are skipped.
pub fn map_positions(
    samples: &[FrameSample],
    pixels_per_meter: f64,
    range_offset_m: f64,
) -> Vec<PositionSample> {
    samples
        .iter()
        .filter_map(|s| map_position(s, pixels_per_meter, range_offset_m))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pixels_per_meter() {
        assert_eq!(pixels_per_meter(1920), 76.8);
        assert_eq!(pixels_per_meter(0), 0.0);
    }

    #[test]
    fn test_map_detected_sample() {
        let ppm = pixels_per_meter(1000);
        let sample = FrameSample::detected(0.5, 400.0, 300.0);
        let position = map_position(&sample, ppm, 0.0).unwrap();
        assert_eq!(position.timestamp, 0.5);
        assert!((position.position_m - 10.0).abs() < 1e-12);

        let offset = map_position(&sample, ppm, 1.5).unwrap();
        assert!((offset.position_m - 11.5).abs() < 1e-12);
    }

    #[test]
    fn test_map_undetected_is_none() {
        let sample = FrameSample::undetected(0.5);
        assert!(map_position(&sample, 40.0, 0.0).is_none());
    }

    #[test]
    fn test_map_rejects_bad_scale() {
        let sample = FrameSample::detected(0.5, 400.0, 300.0);
        assert!(map_position(&sample, 0.0, 0.0).is_none());
        assert!(map_position(&sample, f64::NAN, 0.0).is_none());
    }

    #[test]
    fn test_map_positions_skips_gaps() {
        let frames = vec![
            FrameSample::detected(0.0, 0.0, 0.0),
            FrameSample::undetected(0.1),
            FrameSample::detected(0.2, 100.0, 0.0),
        ];
        let positions = map_positions(&frames, 40.0, 0.0);
        assert_eq!(positions.len(), 2);
        assert_eq!(positions[1].timestamp, 0.2);
    }
}
