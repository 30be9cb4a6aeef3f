//! Landmark extraction: one hip-center anchor per video frame.
//!
//! The detector behind the extractor is pluggable:
//! - `OrtPoseDetector` runs a MoveNet-style ONNX model
//! - `FixtureDetector` replays fixed coordinates (degraded mode, tests)
//!
//! Every per-frame failure (decode error, detector error, timeout) becomes
//! a `detected = false` sample. One bad frame never fails a segment and
//! frames are never retried.

pub mod fixture;
pub mod keypoint;
pub mod movenet;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::AsyncRead;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use runtrace_models::FrameSample;

use crate::decode::{DecodedFrame, FrameStream, DEFAULT_ANALYSIS_WIDTH};
use crate::error::MediaResult;
use crate::metrics;
use crate::probe::VideoInfo;

pub use fixture::{FixtureDetector, FixtureFrame};
pub use keypoint::{Keypoint, KeypointIndex, PoseLandmarks};
pub use movenet::OrtPoseDetector;

/// Default per-frame inference budget.
pub const DEFAULT_FRAME_TIMEOUT: Duration = Duration::from_secs(2);

/// Default minimum hip keypoint confidence.
pub const DEFAULT_MIN_KEYPOINT_CONFIDENCE: f32 = 0.3;

/// Body-pose model producing keypoints for a single frame.
///
/// Implementations are called from the blocking thread pool.
pub trait LandmarkDetector: Send + Sync {
    /// Detect the runner's pose; `Ok(None)` when nobody is in the frame.
    fn detect(&self, frame: &DecodedFrame) -> MediaResult<Option<PoseLandmarks>>;

    /// Detector name for logging.
    fn name(&self) -> &'static str;
}

type DetectionTask = JoinHandle<MediaResult<Option<PoseLandmarks>>>;

/// Frame samples extracted from one segment video.
#[derive(Debug, Clone, Default)]
pub struct ExtractedFrames {
    pub samples: Vec<FrameSample>,
    pub decode_errors: usize,
    pub detector_errors: usize,
    pub timeouts: usize,
    /// Frames not sent to the detector while a timed-out call was still running.
    pub skipped: usize,
}

impl ExtractedFrames {
    pub fn detected_count(&self) -> usize {
        self.samples.iter().filter(|s| s.detected).count()
    }
}

/// Outcome of analyzing a single frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameOutcome {
    Detected,
    NoPerson,
    DetectorError,
    TimedOut,
    Skipped,
}

/// Runs a `LandmarkDetector` over decoded frames.
///
/// Clones share the detector and its stalled call, if any.
#[derive(Clone)]
pub struct LandmarkExtractor {
    detector: Arc<dyn LandmarkDetector>,
    stalled: Arc<Mutex<Option<DetectionTask>>>,
    frame_timeout: Duration,
    min_keypoint_confidence: f32,
    analysis_width: u32,
}

impl LandmarkExtractor {
    pub fn new(detector: Arc<dyn LandmarkDetector>) -> Self {
        Self {
            detector,
            stalled: Arc::new(Mutex::new(None)),
            frame_timeout: DEFAULT_FRAME_TIMEOUT,
            min_keypoint_confidence: DEFAULT_MIN_KEYPOINT_CONFIDENCE,
            analysis_width: DEFAULT_ANALYSIS_WIDTH,
        }
    }

    pub fn with_frame_timeout(mut self, timeout: Duration) -> Self {
        self.frame_timeout = timeout;
        self
    }

    pub fn with_min_keypoint_confidence(mut self, confidence: f32) -> Self {
        self.min_keypoint_confidence = confidence;
        self
    }

    pub fn with_analysis_width(mut self, width: u32) -> Self {
        self.analysis_width = width;
        self
    }

    pub fn detector_name(&self) -> &'static str {
        self.detector.name()
    }

    /// Decode `video_path` and extract one frame sample per frame.
    ///
    /// Pixel coordinates are expressed in the source resolution from `info`.
    pub async fn extract_video(
        &self,
        video_path: &Path,
        info: &VideoInfo,
    ) -> MediaResult<ExtractedFrames> {
        info!(
            "Extracting landmarks with {} from {} ({} frames @ {:.2}fps)",
            self.detector.name(),
            video_path.display(),
            info.frame_count,
            info.fps
        );

        let mut stream = FrameStream::open(video_path, info, self.analysis_width).await?;
        let extracted = self.extract_stream(&mut stream, info).await;
        stream.finish().await?;
        Ok(extracted)
    }

    /// Extract one frame sample per frame of an already open stream.
    ///
    /// Decode failures are recorded, never returned.
    pub async fn extract_stream<R>(
        &self,
        stream: &mut FrameStream<R>,
        info: &VideoInfo,
    ) -> ExtractedFrames
    where
        R: AsyncRead + Unpin,
    {
        let mut extracted = ExtractedFrames::default();

        loop {
            let index = stream.next_index();
            match stream.next_frame().await {
                Ok(Some(frame)) => {
                    let (sample, outcome) =
                        self.extract_frame(frame, info.width, info.height).await;
                    match outcome {
                        FrameOutcome::DetectorError => extracted.detector_errors += 1,
                        FrameOutcome::TimedOut => extracted.timeouts += 1,
                        FrameOutcome::Skipped => extracted.skipped += 1,
                        FrameOutcome::Detected | FrameOutcome::NoPerson => {}
                    }
                    extracted.samples.push(sample);
                }
                Ok(None) => break,
                Err(e) => {
                    warn!("Frame {} could not be decoded: {}", index, e);
                    metrics::record_frame(false);
                    extracted.decode_errors += 1;
                    extracted
                        .samples
                        .push(FrameSample::undetected(index as f64 / info.fps));
                }
            }
        }

        debug!(
            "Extracted {} frames: {} detected, {} decode errors, {} detector errors, {} timeouts, {} skipped",
            extracted.samples.len(),
            extracted.detected_count(),
            extracted.decode_errors,
            extracted.detector_errors,
            extracted.timeouts,
            extracted.skipped
        );

        extracted
    }

    /// Run the detector on one frame under the per-frame timeout.
    ///
    /// While a timed-out call is still running the frame is not queued
    /// behind it; it is marked undetected at once.
    async fn extract_frame(
        &self,
        frame: DecodedFrame,
        source_width: u32,
        source_height: u32,
    ) -> (FrameSample, FrameOutcome) {
        let timestamp = frame.timestamp;
        let index = frame.index;

        let mut stalled = self.stalled.lock().await;
        if stalled.as_ref().is_some_and(|task| !task.is_finished()) {
            debug!("Detector still busy with a timed-out frame, skipping frame {}", index);
            metrics::record_frame(false);
            return (FrameSample::undetected(timestamp), FrameOutcome::Skipped);
        }
        *stalled = None;
        drop(stalled);

        let detector = Arc::clone(&self.detector);
        let mut task = tokio::task::spawn_blocking(move || detector.detect(&frame));

        let (sample, outcome) = match tokio::time::timeout(self.frame_timeout, &mut task).await {
            Ok(Ok(Ok(Some(pose)))) => match pose.hip_center(self.min_keypoint_confidence) {
                Some((x, y)) => (
                    FrameSample::detected(
                        timestamp,
                        x as f64 * source_width as f64,
                        y as f64 * source_height as f64,
                    ),
                    FrameOutcome::Detected,
                ),
                None => (FrameSample::undetected(timestamp), FrameOutcome::NoPerson),
            },
            Ok(Ok(Ok(None))) => (FrameSample::undetected(timestamp), FrameOutcome::NoPerson),
            Ok(Ok(Err(e))) => {
                debug!("Detector failed on frame {}: {}", index, e);
                (FrameSample::undetected(timestamp), FrameOutcome::DetectorError)
            }
            Ok(Err(e)) => {
                warn!("Detector task for frame {} panicked: {}", index, e);
                (FrameSample::undetected(timestamp), FrameOutcome::DetectorError)
            }
            Err(_) => {
                warn!(
                    "Detector exceeded {}ms on frame {}, marking undetected",
                    self.frame_timeout.as_millis(),
                    index
                );
                metrics::record_frame_timeout();
                *self.stalled.lock().await = Some(task);
                (FrameSample::undetected(timestamp), FrameOutcome::TimedOut)
            }
        };

        metrics::record_frame(sample.detected);
        (sample, outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;
    use std::time::Instant;

    fn frame(index: u64, fps: f64) -> DecodedFrame {
        DecodedFrame {
            index,
            timestamp: index as f64 / fps,
            image: RgbImage::new(8, 8),
        }
    }

    fn video_info(width: u32, height: u32, fps: f64) -> VideoInfo {
        VideoInfo {
            duration: 1.0,
            width,
            height,
            fps,
            frame_count: fps as u64,
            codec: "rawvideo".to_string(),
        }
    }

    /// Serializes calls like a detector holding a single inference session.
    struct SerialDetector {
        inner: FixtureDetector,
        session: std::sync::Mutex<()>,
    }

    impl LandmarkDetector for SerialDetector {
        fn detect(&self, frame: &DecodedFrame) -> MediaResult<Option<PoseLandmarks>> {
            let _session = self.session.lock().unwrap();
            self.inner.detect(frame)
        }

        fn name(&self) -> &'static str {
            "serial"
        }
    }

    #[tokio::test]
    async fn test_detected_frame_uses_source_resolution() {
        let detector = Arc::new(FixtureDetector::new(vec![
            FixtureFrame::Missing,
            FixtureFrame::Missing,
            FixtureFrame::Missing,
            FixtureFrame::Hip(0.25, 0.5),
        ]));
        let extractor = LandmarkExtractor::new(detector);

        let (sample, outcome) = extractor.extract_frame(frame(3, 30.0), 1920, 1080).await;
        assert_eq!(outcome, FrameOutcome::Detected);
        assert!(sample.detected);
        assert!((sample.timestamp - 0.1).abs() < 1e-12);
        assert!((sample.pixel_x - 480.0).abs() < 1e-3);
        assert!((sample.pixel_y - 540.0).abs() < 1e-3);
    }

    #[tokio::test]
    async fn test_detector_error_becomes_undetected() {
        let detector = Arc::new(FixtureDetector::new(vec![FixtureFrame::Fail]));
        let extractor = LandmarkExtractor::new(detector);

        let (sample, outcome) = extractor.extract_frame(frame(0, 30.0), 1920, 1080).await;
        assert_eq!(outcome, FrameOutcome::DetectorError);
        assert!(!sample.detected);
    }

    #[tokio::test]
    async fn test_stalled_detector_times_out() {
        let detector = Arc::new(FixtureDetector::new(vec![
            FixtureFrame::Missing,
            FixtureFrame::Stall(Duration::from_millis(500), 0.5, 0.5),
        ]));
        let extractor =
            LandmarkExtractor::new(detector).with_frame_timeout(Duration::from_millis(20));

        let (sample, outcome) = extractor.extract_frame(frame(1, 30.0), 1920, 1080).await;
        assert_eq!(outcome, FrameOutcome::TimedOut);
        assert!(!sample.detected);
        assert!((sample.timestamp - 1.0 / 30.0).abs() < 1e-12);
    }

    #[tokio::test]
    async fn test_frames_after_a_stall_do_not_queue_behind_it() {
        let mut script = vec![FixtureFrame::Stall(Duration::from_millis(400), 0.5, 0.5)];
        script.extend([FixtureFrame::Hip(0.5, 0.5); 4]);
        let detector = Arc::new(SerialDetector {
            inner: FixtureDetector::new(script),
            session: std::sync::Mutex::new(()),
        });
        let extractor =
            LandmarkExtractor::new(detector).with_frame_timeout(Duration::from_millis(50));

        let (_, outcome) = extractor.extract_frame(frame(0, 30.0), 100, 100).await;
        assert_eq!(outcome, FrameOutcome::TimedOut);

        let started = Instant::now();
        for index in 1..4 {
            let (sample, outcome) = extractor.extract_frame(frame(index, 30.0), 100, 100).await;
            assert_eq!(outcome, FrameOutcome::Skipped);
            assert!(!sample.detected);
        }
        // Three frames together finish well inside one frame timeout.
        assert!(started.elapsed() < Duration::from_millis(50));

        // Once the stalled call returns the detector is used again.
        tokio::time::sleep(Duration::from_millis(500)).await;
        let (sample, outcome) = extractor.extract_frame(frame(4, 30.0), 100, 100).await;
        assert_eq!(outcome, FrameOutcome::Detected);
        assert!(sample.detected);
    }

    #[tokio::test]
    async fn test_low_confidence_hips_are_undetected() {
        let detector = Arc::new(FixtureDetector::new(vec![FixtureFrame::Hip(0.5, 0.5)]));
        // Fixture hips carry confidence 1.0, anything above that rejects them.
        let extractor = LandmarkExtractor::new(detector).with_min_keypoint_confidence(1.5);

        let (sample, outcome) = extractor.extract_frame(frame(0, 30.0), 100, 100).await;
        assert_eq!(outcome, FrameOutcome::NoPerson);
        assert!(!sample.detected);
    }

    #[tokio::test]
    async fn test_truncated_frame_becomes_undetected_sample() {
        // Three full 2x2 frames and a truncated fourth.
        let bytes = vec![0u8; 12 * 3 + 5];
        let mut stream = FrameStream::from_reader(&bytes[..], 2, 2, 10.0);
        let extractor = LandmarkExtractor::new(Arc::new(FixtureDetector::linear(4, 0.0, 0.3)));

        let extracted = extractor
            .extract_stream(&mut stream, &video_info(200, 100, 10.0))
            .await;

        assert_eq!(extracted.samples.len(), 4);
        assert_eq!(extracted.decode_errors, 1);
        assert_eq!(extracted.detected_count(), 3);
        let last = extracted.samples[3];
        assert!(!last.detected);
        assert!((last.timestamp - 0.3).abs() < 1e-12);
        assert!((extracted.samples[2].pixel_x - 40.0).abs() < 1e-3);
    }

    #[tokio::test]
    async fn test_shared_detector_answers_by_frame_index() {
        let detector = Arc::new(FixtureDetector::linear(3, 0.0, 1.0));
        let first = LandmarkExtractor::new(detector.clone());
        let second = LandmarkExtractor::new(detector);
        let info = video_info(100, 100, 10.0);

        let bytes = vec![0u8; 12 * 3];
        let mut a = FrameStream::from_reader(&bytes[..], 2, 2, 10.0);
        let mut b = FrameStream::from_reader(&bytes[..], 2, 2, 10.0);
        let (a, b) = tokio::join!(
            first.extract_stream(&mut a, &info),
            second.extract_stream(&mut b, &info)
        );

        let xs = |e: &ExtractedFrames| e.samples.iter().map(|s| s.pixel_x).collect::<Vec<_>>();
        assert_eq!(xs(&a), vec![0.0, 50.0, 100.0]);
        assert_eq!(xs(&b), xs(&a));
    }
}
