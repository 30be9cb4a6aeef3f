//! Per-segment processing: video in, segment record out.
//!
//! ```text
//! probe -> decode -> landmarks -> positions -> velocities -> strides
//! ```
//!
//! Entry points below the video level exist for degraded operation:
//! `analyze_frames` when landmarks come from elsewhere, `analyze_positions`
//! when positions are already known.

use async_trait::async_trait;
use std::path::Path;
use std::time::Instant;
use tracing::{info, warn};

use runtrace_models::{
    AnalysisConfig, CourseRange, FrameSample, PositionSample, SegmentRecord, SegmentSummary,
    VideoMeta, SEGMENT_DISTANCE_M,
};

use crate::error::MediaResult;
use crate::kinematics::{map_positions, pixels_per_meter, KinematicSmoother, StrideSegmenter};
use crate::landmarks::LandmarkExtractor;
use crate::metrics;
use crate::probe::{probe_video, validate_segment_video, validate_video_stream};

/// Anything that turns one segment video into a segment record.
#[async_trait]
pub trait SegmentProcessor: Send + Sync {
    async fn process(&self, range: CourseRange, video_path: &Path) -> MediaResult<SegmentRecord>;
}

/// Processes one segment video with a fixed extractor and configuration.
#[derive(Clone)]
pub struct SegmentPipeline {
    extractor: LandmarkExtractor,
    config: AnalysisConfig,
    validate_duration: bool,
}

impl SegmentPipeline {
    /// Create a pipeline; the configuration is checked here, before any video is touched.
    pub fn new(extractor: LandmarkExtractor, config: AnalysisConfig) -> MediaResult<Self> {
        config.validate()?;
        Ok(Self {
            extractor,
            config,
            validate_duration: true,
        })
    }

    /// Enable or disable the 1-10 s plausibility window on video duration.
    pub fn with_duration_validation(mut self, enabled: bool) -> Self {
        self.validate_duration = enabled;
        self
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Run the full chain on one video.
    ///
    /// `range_offset_m` is added to every segment-local position; the
    /// stitcher supplies the course offset separately, so this is normally `0.0`.
    pub async fn process_video(
        &self,
        range: CourseRange,
        video_path: &Path,
        range_offset_m: f64,
    ) -> MediaResult<SegmentRecord> {
        let started = Instant::now();
        info!(range = %range, path = %video_path.display(), "Processing segment video");

        let video = probe_video(video_path).await?;
        if self.validate_duration {
            validate_segment_video(&video)?;
        } else {
            validate_video_stream(&video)?;
        }

        let extracted = self.extractor.extract_video(video_path, &video).await?;
        if extracted.timeouts > 0 || extracted.decode_errors > 0 || extracted.skipped > 0 {
            warn!(
                range = %range,
                timeouts = extracted.timeouts,
                skipped = extracted.skipped,
                decode_errors = extracted.decode_errors,
                "Segment had frames without a usable landmark"
            );
        }

        let record = build_record(
            range,
            &extracted.samples,
            video.width,
            video.frame_duration(),
            &self.config,
            range_offset_m,
            Some(video.meta()),
        );

        metrics::record_segment(
            range.as_str(),
            record.summary().zero_confidence,
            started.elapsed().as_secs_f64(),
        );
        info!(
            range = %range,
            frames = record.summary().frames_total,
            detected = record.summary().frames_detected,
            max_speed = record.summary().max_speed,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Segment processed"
        );

        Ok(record)
    }
}

#[async_trait]
impl SegmentProcessor for SegmentPipeline {
    async fn process(&self, range: CourseRange, video_path: &Path) -> MediaResult<SegmentRecord> {
        self.process_video(range, video_path, 0.0).await
    }
}

/// Build a segment record from frame samples supplied by the caller.
pub fn analyze_frames(
    range: CourseRange,
    frames: &[FrameSample],
    frame_width_px: u32,
    duration: f64,
    config: &AnalysisConfig,
    range_offset_m: f64,
) -> MediaResult<SegmentRecord> {
    config.validate()?;
    Ok(build_record(
        range,
        frames,
        frame_width_px,
        duration,
        config,
        range_offset_m,
        None,
    ))
}

/// Build a segment record from segment-local positions.
pub fn analyze_positions(
    range: CourseRange,
    positions: &[PositionSample],
    duration: f64,
    config: &AnalysisConfig,
) -> MediaResult<SegmentRecord> {
    config.validate()?;
    Ok(summarize(
        range,
        positions.to_vec(),
        duration,
        config,
        positions.len(),
        positions.len(),
        None,
    ))
}

fn build_record(
    range: CourseRange,
    frames: &[FrameSample],
    frame_width_px: u32,
    duration: f64,
    config: &AnalysisConfig,
    range_offset_m: f64,
    video: Option<VideoMeta>,
) -> SegmentRecord {
    let ppm = pixels_per_meter(frame_width_px);
    let positions = map_positions(frames, ppm, range_offset_m);
    let detected = frames.iter().filter(|f| f.detected).count();
    summarize(range, positions, duration, config, frames.len(), detected, video)
}

fn summarize(
    range: CourseRange,
    positions: Vec<PositionSample>,
    duration: f64,
    config: &AnalysisConfig,
    frames_total: usize,
    frames_detected: usize,
    video: Option<VideoMeta>,
) -> SegmentRecord {
    let smoothed = KinematicSmoother::new(config).smooth(&positions);
    let (_, strides) = StrideSegmenter::new(config).segment(&smoothed.velocities);

    if smoothed.zero_confidence {
        warn!(
            range = %range,
            positions = positions.len(),
            velocities = smoothed.velocities.len(),
            "Degenerate segment: no valid velocity, reporting zero speed"
        );
    }

    let summary = SegmentSummary {
        range,
        max_speed: smoothed.max_speed,
        avg_speed: smoothed.avg_speed,
        duration,
        distance: SEGMENT_DISTANCE_M,
        zero_confidence: smoothed.zero_confidence,
        frames_total,
        frames_detected,
        outliers_rejected: smoothed.outliers_rejected,
        pairs_dropped: smoothed.pairs_dropped,
    };

    SegmentRecord::new(positions, smoothed.velocities, summary, strides, video)
}
