//! ONNX Runtime single-person pose detector (MoveNet-style models).
//!
//! The model takes a square `[1, S, S, 3]` float tensor of RGB values in
//! `0..=255` and returns `[1, 1, 17, 3]` keypoints as `(y, x, score)`
//! normalized to the square input. Frames are letterboxed into the square
//! so the runner's horizontal position is not distorted; coordinates are
//! mapped back to the source frame before they leave this module.

use image::imageops::{self, FilterType};
use image::RgbImage;
use ndarray::Array4;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::{Tensor, Value};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::info;

use super::keypoint::{Keypoint, KeypointIndex, PoseLandmarks};
use super::LandmarkDetector;
use crate::decode::DecodedFrame;
use crate::error::{MediaError, MediaResult};

/// Environment variable pointing at the pose model.
pub const POSE_MODEL_ENV: &str = "RUNTRACE_POSE_MODEL";

/// Input size of MoveNet Lightning.
pub const DEFAULT_INPUT_SIZE: u32 = 192;

/// Mean keypoint score below which the frame counts as "no person".
const MIN_POSE_SCORE: f32 = 0.2;

/// Letterbox placement of a frame inside the square model input.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Letterbox {
    pad_x: f32,
    pad_y: f32,
    scaled_width: u32,
    scaled_height: u32,
}

impl Letterbox {
    fn new(width: u32, height: u32, size: u32) -> Self {
        let scale = size as f32 / width.max(height) as f32;
        let scaled_width = ((width as f32 * scale).round() as u32).clamp(1, size);
        let scaled_height = ((height as f32 * scale).round() as u32).clamp(1, size);
        Self {
            pad_x: ((size - scaled_width) / 2) as f32,
            pad_y: ((size - scaled_height) / 2) as f32,
            scaled_width,
            scaled_height,
        }
    }

    /// Map a point normalized to the square input back to frame-normalized coordinates.
    fn to_frame(&self, nx: f32, ny: f32, size: u32) -> (f32, f32) {
        let x = (nx * size as f32 - self.pad_x) / self.scaled_width as f32;
        let y = (ny * size as f32 - self.pad_y) / self.scaled_height as f32;
        (x.clamp(0.0, 1.0), y.clamp(0.0, 1.0))
    }
}

/// ONNX Runtime wrapper for a single-pose keypoint model.
pub struct OrtPoseDetector {
    session: Mutex<Session>,
    input_size: u32,
    output_name: Option<String>,
}

impl OrtPoseDetector {
    /// Load the model from `model_path`.
    pub fn load(model_path: &Path) -> MediaResult<Self> {
        if !model_path.exists() {
            return Err(MediaError::model_not_found(model_path.display().to_string()));
        }

        let model_bytes = std::fs::read(model_path)
            .map_err(|e| MediaError::detection_failed(format!("ORT read model file: {e}")))?;

        let session = Session::builder()
            .map_err(|e| MediaError::detection_failed(format!("ORT session builder: {e}")))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| MediaError::detection_failed(format!("ORT opt level: {e}")))?
            .commit_from_memory(model_bytes.as_slice())
            .map_err(|e| MediaError::detection_failed(format!("ORT load model: {e}")))?;

        info!("Loaded pose model from {}", model_path.display());

        Ok(Self {
            session: Mutex::new(session),
            input_size: DEFAULT_INPUT_SIZE,
            output_name: None,
        })
    }

    /// Load the model named by `RUNTRACE_POSE_MODEL`, or the first default location that exists.
    pub fn load_default() -> MediaResult<Self> {
        let path = find_default_model_path().ok_or_else(|| {
            MediaError::model_not_found(format!(
                "pose model not found; set {} or place movenet_singlepose.onnx under models/pose/",
                POSE_MODEL_ENV
            ))
        })?;
        Self::load(&path)
    }

    /// Square input edge in pixels (192 for Lightning, 256 for Thunder).
    pub fn with_input_size(mut self, size: u32) -> Self {
        self.input_size = size.max(1);
        self
    }

    /// Read keypoints from a named output instead of the first one.
    pub fn with_output_name(mut self, name: impl Into<String>) -> Self {
        self.output_name = Some(name.into());
        self
    }

    fn run(&self, frame: &RgbImage) -> MediaResult<PoseLandmarks> {
        let (tensor, letterbox) = frame_to_tensor(frame, self.input_size)?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| MediaError::detection_failed("ORT session poisoned"))?;

        let outputs = session
            .run(ort::inputs![tensor])
            .map_err(|e| MediaError::detection_failed(format!("ORT run failed: {e}")))?;

        let output = match &self.output_name {
            Some(name) => outputs
                .get(name.as_str())
                .ok_or_else(|| MediaError::detection_failed(format!("ORT output '{name}' missing")))?,
            None => &outputs[0],
        };

        let (shape, data) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| MediaError::detection_failed(format!("ORT extract: {e}")))?;

        let dims: Vec<usize> = shape.iter().map(|&d| d as usize).collect();
        parse_keypoints(&dims, data, &letterbox, self.input_size)
    }
}

impl LandmarkDetector for OrtPoseDetector {
    fn detect(&self, frame: &DecodedFrame) -> MediaResult<Option<PoseLandmarks>> {
        let pose = self.run(&frame.image)?;
        if pose.mean_confidence() < MIN_POSE_SCORE {
            return Ok(None);
        }
        Ok(Some(pose))
    }

    fn name(&self) -> &'static str {
        "ort_movenet"
    }
}

/// Letterbox `frame` into a `[1, size, size, 3]` tensor.
fn frame_to_tensor(frame: &RgbImage, size: u32) -> MediaResult<(Value, Letterbox)> {
    if frame.width() == 0 || frame.height() == 0 {
        return Err(MediaError::detection_failed("Empty frame"));
    }

    let letterbox = Letterbox::new(frame.width(), frame.height(), size);
    let resized = imageops::resize(
        frame,
        letterbox.scaled_width,
        letterbox.scaled_height,
        FilterType::Triangle,
    );

    let side = size as usize;
    let mut input = Array4::<f32>::zeros((1, side, side, 3));
    let (off_x, off_y) = (letterbox.pad_x as usize, letterbox.pad_y as usize);
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..3 {
            input[[0, off_y + y as usize, off_x + x as usize, c]] = pixel[c] as f32;
        }
    }

    let shape = vec![1usize, side, side, 3];
    let boxed = input.into_raw_vec().into_boxed_slice();
    let tensor = Tensor::from_array((shape, boxed))
        .map(Value::from)
        .map_err(|e| MediaError::detection_failed(format!("ORT tensor: {e}")))?;

    Ok((tensor, letterbox))
}

/// Decode `[1, 1, 17, 3]` (or `[17, 3]`) `(y, x, score)` output.
fn parse_keypoints(
    shape: &[usize],
    data: &[f32],
    letterbox: &Letterbox,
    size: u32,
) -> MediaResult<PoseLandmarks> {
    let (points, stride) = match shape {
        [1, 1, p, s] => (*p, *s),
        [1, p, s] => (*p, *s),
        [p, s] => (*p, *s),
        _ => {
            return Err(MediaError::detection_failed(format!(
                "Unexpected pose output shape: {:?}",
                shape
            )))
        }
    };

    if points < KeypointIndex::COUNT || stride < 3 || data.len() < points * stride {
        return Err(MediaError::detection_failed(format!(
            "Pose output too small: shape {:?}, {} values",
            shape,
            data.len()
        )));
    }

    let mut keypoints = [Keypoint::default(); KeypointIndex::COUNT];
    for (i, keypoint) in keypoints.iter_mut().enumerate() {
        let base = i * stride;
        let (x, y) = letterbox.to_frame(data[base + 1], data[base], size);
        *keypoint = Keypoint::new(x, y, data[base + 2]);
    }

    Ok(PoseLandmarks::new(keypoints))
}

/// Search the usual model locations.
pub fn find_default_model_path() -> Option<PathBuf> {
    if let Ok(path) = std::env::var(POSE_MODEL_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    [
        "models/pose/movenet_singlepose.onnx",
        "../models/pose/movenet_singlepose.onnx",
        "/app/models/pose/movenet_singlepose.onnx",
    ]
    .iter()
    .map(PathBuf::from)
    .find(|p| p.exists())
}
