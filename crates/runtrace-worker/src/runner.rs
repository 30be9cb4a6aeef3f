//! Four-segment course analysis.
//!
//! Each segment video is processed by an independent future; the four are
//! joined, then stitched in a single deterministic step. A semaphore bounds
//! how many segments decode at once and a watch channel cancels the run.

use async_trait::async_trait;
use futures::future::join_all;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tempfile::NamedTempFile;
use tokio::sync::{watch, Semaphore};
use tracing::{debug, Instrument};

use runtrace_media::kinematics::{SegmentStitcher, StrideSegmenter};
use runtrace_media::landmarks::{LandmarkDetector, LandmarkExtractor, OrtPoseDetector};
use runtrace_media::{metrics, MediaError, MediaResult, SegmentPipeline, SegmentProcessor};
use runtrace_models::{AnalysisConfig, CourseRange, KinematicReport, RunId, SegmentRecord};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::RunLogger;

/// Segment videos for one run, keyed by course range.
#[derive(Debug, Clone, Default)]
pub struct CourseUpload {
    videos: BTreeMap<CourseRange, Vec<u8>>,
}

impl CourseUpload {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from `(range name, bytes)` pairs such as `("25-50", ...)`.
    pub fn from_named<I, S>(videos: I) -> WorkerResult<Self>
    where
        I: IntoIterator<Item = (S, Vec<u8>)>,
        S: AsRef<str>,
    {
        let mut upload = Self::new();
        for (name, bytes) in videos {
            upload.insert_named(name.as_ref(), bytes)?;
        }
        Ok(upload)
    }

    pub fn insert_named(&mut self, range_name: &str, bytes: Vec<u8>) -> WorkerResult<()> {
        let range: CourseRange = range_name.parse()?;
        self.insert(range, bytes)
    }

    pub fn insert(&mut self, range: CourseRange, bytes: Vec<u8>) -> WorkerResult<()> {
        if bytes.is_empty() {
            return Err(WorkerError::invalid_input(format!(
                "Video for range {} is empty",
                range
            )));
        }
        if self.videos.insert(range, bytes).is_some() {
            return Err(WorkerError::invalid_input(format!(
                "Range {} uploaded more than once",
                range
            )));
        }
        Ok(())
    }

    /// Ranges with no video yet.
    pub fn missing(&self) -> Vec<CourseRange> {
        CourseRange::ALL
            .iter()
            .copied()
            .filter(|r| !self.videos.contains_key(r))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.videos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.videos.is_empty()
    }
}

/// Runs the segment pipeline over a full course and builds the report.
#[derive(Clone)]
pub struct CourseAnalyzer {
    processor: Arc<dyn SegmentProcessor>,
    analysis: AnalysisConfig,
    config: WorkerConfig,
    segment_semaphore: Arc<Semaphore>,
}

impl CourseAnalyzer {
    pub fn new(
        processor: Arc<dyn SegmentProcessor>,
        analysis: AnalysisConfig,
        config: WorkerConfig,
    ) -> WorkerResult<Self> {
        analysis.validate()?;
        let segment_semaphore = Arc::new(Semaphore::new(config.max_segment_parallel.max(1)));
        Ok(Self {
            processor,
            analysis,
            config,
            segment_semaphore,
        })
    }

    /// Analyzer backed by the ONNX pose model named in `config`.
    pub fn from_config(analysis: AnalysisConfig, config: WorkerConfig) -> WorkerResult<Self> {
        let detector = match &config.pose_model {
            Some(path) => OrtPoseDetector::load(path)?,
            None => OrtPoseDetector::load_default()?,
        };
        Self::with_detector(Arc::new(detector), analysis, config)
    }

    /// Analyzer backed by any landmark detector, shared by all segments.
    pub fn with_detector(
        detector: Arc<dyn LandmarkDetector>,
        analysis: AnalysisConfig,
        config: WorkerConfig,
    ) -> WorkerResult<Self> {
        analysis.validate()?;
        let pipeline = segment_pipeline(detector, &analysis, &config)?;
        Self::new(Arc::new(pipeline), analysis, config)
    }

    /// Analyzer with a separate detector for each course range.
    ///
    /// `detector_for` is called once per range, up front.
    pub fn with_detector_per_range<F>(
        detector_for: F,
        analysis: AnalysisConfig,
        config: WorkerConfig,
    ) -> WorkerResult<Self>
    where
        F: Fn(CourseRange) -> Arc<dyn LandmarkDetector>,
    {
        analysis.validate()?;
        let mut pipelines = BTreeMap::new();
        for &range in CourseRange::ALL {
            let pipeline = segment_pipeline(detector_for(range), &analysis, &config)?;
            pipelines.insert(range, pipeline);
        }
        Self::new(Arc::new(RangePipelines { pipelines }), analysis, config)
    }

    pub fn analysis_config(&self) -> &AnalysisConfig {
        &self.analysis
    }

    /// Analyze an upload with no external cancellation.
    pub async fn analyze(&self, upload: CourseUpload) -> WorkerResult<KinematicReport> {
        let (_cancel_tx, cancel_rx) = watch::channel(false);
        self.analyze_with_cancel(RunId::new(), upload, cancel_rx).await
    }

    /// Stage the uploaded bytes to temporary files and analyze them.
    ///
    /// An incomplete upload fails before anything is written or decoded.
    pub async fn analyze_with_cancel(
        &self,
        run_id: RunId,
        upload: CourseUpload,
        cancel: watch::Receiver<bool>,
    ) -> WorkerResult<KinematicReport> {
        let missing = upload.missing();
        if !missing.is_empty() {
            metrics::record_run("failed");
            return Err(MediaError::IncompleteCourse { missing }.into());
        }

        let staged = self.stage(upload).await?;
        let videos: Vec<(CourseRange, PathBuf)> = staged
            .iter()
            .map(|(range, file)| (*range, file.path().to_path_buf()))
            .collect();

        // Staged files live until the run finishes.
        let result = self.analyze_files(run_id, videos, cancel).await;
        drop(staged);
        result
    }

    /// Analyze segment videos already on disk.
    pub async fn analyze_files(
        &self,
        run_id: RunId,
        videos: Vec<(CourseRange, PathBuf)>,
        mut cancel: watch::Receiver<bool>,
    ) -> WorkerResult<KinematicReport> {
        let logger = RunLogger::new(&run_id, "course_analysis");
        let span = logger.create_span();
        let started = Instant::now();

        let result = async {
            logger.log_start(&format!("{} segment videos", videos.len()));
            let records = self.process_segments(&logger, videos, &mut cancel).await?;
            self.build_report(&logger, run_id.clone(), records)
        }
        .instrument(span)
        .await;

        match &result {
            Ok(report) => {
                metrics::record_run("completed");
                logger.log_completion(&format!(
                    "{:.3}s course, max {:.2} m/s, low_confidence={} in {}ms",
                    report.trace.total_time,
                    report.trace.max_velocity,
                    report.low_confidence,
                    started.elapsed().as_millis()
                ));
            }
            Err(e) if e.is_cancelled() => {
                metrics::record_run("cancelled");
                logger.log_warning("cancelled before completion");
            }
            Err(e) => {
                metrics::record_run("failed");
                logger.log_error(&e.to_string());
            }
        }

        result
    }

    async fn stage(
        &self,
        upload: CourseUpload,
    ) -> WorkerResult<Vec<(CourseRange, NamedTempFile)>> {
        tokio::fs::create_dir_all(&self.config.work_dir).await?;

        let mut staged = Vec::with_capacity(upload.len());
        for (range, bytes) in upload.videos {
            let file = tempfile::Builder::new()
                .prefix(&format!("runtrace-{}-", range))
                .suffix(".mp4")
                .tempfile_in(&self.config.work_dir)
                .map_err(|e| {
                    WorkerError::staging(format!(
                        "Cannot create temp file in {}: {}",
                        self.config.work_dir.display(),
                        e
                    ))
                })?;
            tokio::fs::write(file.path(), &bytes).await?;
            debug!(
                range = %range,
                bytes = bytes.len(),
                path = %file.path().display(),
                "Staged segment video"
            );
            staged.push((range, file));
        }
        Ok(staged)
    }

    /// Fork-join over the segment videos, abandoned as soon as `cancel` flips.
    async fn process_segments(
        &self,
        logger: &RunLogger,
        videos: Vec<(CourseRange, PathBuf)>,
        cancel: &mut watch::Receiver<bool>,
    ) -> WorkerResult<Vec<SegmentRecord>> {
        if *cancel.borrow() {
            return Err(WorkerError::Cancelled);
        }

        let futures = videos.into_iter().map(|(range, path)| {
            let processor = Arc::clone(&self.processor);
            let semaphore = Arc::clone(&self.segment_semaphore);
            async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|_| WorkerError::staging("Segment semaphore closed"))?;
                processor
                    .process(range, &path)
                    .await
                    .map_err(WorkerError::from)
            }
        });

        let results = tokio::select! {
            results = join_all(futures) => results,
            _ = wait_for_cancel(cancel) => {
                return Err(WorkerError::Cancelled);
            }
        };

        let mut records = Vec::with_capacity(results.len());
        for result in results {
            match result {
                Ok(record) => {
                    if record.summary().zero_confidence {
                        logger.log_warning(&format!(
                            "segment {} produced no valid velocity",
                            record.range()
                        ));
                    }
                    records.push(record);
                }
                Err(e) => return Err(e),
            }
        }
        logger.log_progress(&format!("{} segments processed", records.len()));
        Ok(records)
    }

    fn build_report(
        &self,
        logger: &RunLogger,
        run_id: RunId,
        records: Vec<SegmentRecord>,
    ) -> WorkerResult<KinematicReport> {
        let stride_metrics = StrideSegmenter::new(&self.analysis).course_metrics(&records);
        let trace = SegmentStitcher::new().stitch(records)?;
        logger.log_progress(&format!(
            "stitched {} velocity samples, {} strides",
            trace.velocity_series.len(),
            stride_metrics.num_strides
        ));
        Ok(KinematicReport::new(
            run_id,
            self.analysis.clone(),
            trace,
            stride_metrics,
        ))
    }
}

fn segment_pipeline(
    detector: Arc<dyn LandmarkDetector>,
    analysis: &AnalysisConfig,
    config: &WorkerConfig,
) -> WorkerResult<SegmentPipeline> {
    let extractor = LandmarkExtractor::new(detector)
        .with_frame_timeout(config.frame_timeout)
        .with_min_keypoint_confidence(config.min_keypoint_confidence);
    Ok(SegmentPipeline::new(extractor, analysis.clone())?
        .with_duration_validation(config.validate_duration))
}

/// One pipeline per course range.
struct RangePipelines {
    pipelines: BTreeMap<CourseRange, SegmentPipeline>,
}

#[async_trait]
impl SegmentProcessor for RangePipelines {
    async fn process(
        &self,
        range: CourseRange,
        video_path: &Path,
    ) -> MediaResult<SegmentRecord> {
        match self.pipelines.get(&range) {
            Some(pipeline) => pipeline.process(range, video_path).await,
            None => Err(MediaError::IncompleteCourse {
                missing: vec![range],
            }),
        }
    }
}

/// Resolve once the flag is set; never resolves if the sender is gone.
async fn wait_for_cancel(cancel: &mut watch::Receiver<bool>) {
    loop {
        if *cancel.borrow() {
            return;
        }
        if cancel.changed().await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use runtrace_media::FixtureDetector;
    use tokio_test::assert_err;

    fn bytes() -> Vec<u8> {
        vec![0u8; 16]
    }

    #[test]
    fn test_upload_parses_range_names() {
        let upload = CourseUpload::from_named(vec![("0-25", bytes()), ("25-50m", bytes())]).unwrap();
        assert_eq!(upload.len(), 2);
        assert_eq!(
            upload.missing(),
            vec![CourseRange::FiftyTo75, CourseRange::SeventyFiveTo100]
        );
    }

    #[test]
    fn test_upload_rejects_unknown_and_duplicate_ranges() {
        assert!(matches!(
            CourseUpload::from_named(vec![("100-125", bytes())]),
            Err(WorkerError::InvalidInput(_))
        ));
        assert!(matches!(
            CourseUpload::from_named(vec![("0-25", bytes()), ("0-25", bytes())]),
            Err(WorkerError::InvalidInput(_))
        ));
        assert!(matches!(
            CourseUpload::from_named(vec![("0-25", Vec::new())]),
            Err(WorkerError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn test_incomplete_upload_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let config = WorkerConfig {
            work_dir: dir.path().join("staging"),
            ..WorkerConfig::default()
        };
        let analyzer = CourseAnalyzer::with_detector(
            Arc::new(FixtureDetector::new(vec![])),
            AnalysisConfig::default(),
            config,
        )
        .unwrap();

        let upload = CourseUpload::from_named(vec![
            ("0-25", bytes()),
            ("25-50", bytes()),
            ("50-75", bytes()),
        ])
        .unwrap();
        let err = assert_err!(analyzer.analyze(upload).await);
        assert!(err.is_fatal_course_error());
        // Nothing was staged.
        assert!(!dir.path().join("staging").exists());
    }

    #[test]
    fn test_detector_per_range_builds_every_range() {
        let requested = std::sync::Mutex::new(Vec::new());
        let analyzer = CourseAnalyzer::with_detector_per_range(
            |range| {
                requested.lock().unwrap().push(range);
                Arc::new(FixtureDetector::linear(30, 0.1 * range.index() as f32, 1.0))
                    as Arc<dyn LandmarkDetector>
            },
            AnalysisConfig::default(),
            WorkerConfig::default(),
        )
        .unwrap();

        assert_eq!(requested.into_inner().unwrap(), CourseRange::ALL.to_vec());
        assert_eq!(analyzer.analysis_config(), &AnalysisConfig::default());
    }

    #[tokio::test]
    async fn test_range_pipelines_reject_unknown_range() {
        let processor = RangePipelines {
            pipelines: BTreeMap::new(),
        };
        let err = assert_err!(
            processor
                .process(CourseRange::ZeroTo25, Path::new("/nonexistent.mp4"))
                .await
        );
        assert!(err.is_course_error());
    }

    #[test]
    fn test_invalid_analysis_config_is_rejected() {
        let result = CourseAnalyzer::with_detector(
            Arc::new(FixtureDetector::new(vec![])),
            AnalysisConfig::default().with_smoothing_window(0),
            WorkerConfig::default(),
        );
        assert!(matches!(result, Err(WorkerError::InvalidConfiguration(_))));
    }

    #[tokio::test]
    async fn test_wait_for_cancel_ignores_dropped_sender() {
        let (tx, mut rx) = watch::channel(false);
        drop(tx);
        let waited =
            tokio::time::timeout(std::time::Duration::from_millis(20), wait_for_cancel(&mut rx))
                .await;
        assert!(waited.is_err());
    }
}
