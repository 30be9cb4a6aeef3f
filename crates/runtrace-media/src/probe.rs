//! FFprobe video information.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use runtrace_models::VideoMeta;

use crate::error::{MediaError, MediaResult};

/// Shortest plausible video for a filmed 25 m range (seconds).
pub const MIN_SEGMENT_DURATION_SECS: f64 = 1.0;

/// Longest plausible video for a filmed 25 m range (seconds).
pub const MAX_SEGMENT_DURATION_SECS: f64 = 10.0;

/// Video file information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoInfo {
    /// Duration in seconds
    pub duration: f64,
    /// Width in pixels
    pub width: u32,
    /// Height in pixels
    pub height: u32,
    /// Frame rate (fps)
    pub fps: f64,
    /// Number of frames in the video stream
    pub frame_count: u64,
    /// Video codec
    pub codec: String,
}

impl VideoInfo {
    /// Duration derived from the frame count, falling back to the container duration.
    pub fn frame_duration(&self) -> f64 {
        if self.fps > 0.0 && self.frame_count > 0 {
            self.frame_count as f64 / self.fps
        } else {
            self.duration
        }
    }

    pub fn meta(&self) -> VideoMeta {
        VideoMeta {
            fps: self.fps,
            width: self.width,
            height: self.height,
            frame_count: self.frame_count,
        }
    }
}

/// FFprobe JSON output format.
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
    streams: Vec<FfprobeStream>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    codec_type: String,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    avg_frame_rate: Option<String>,
    nb_frames: Option<String>,
    duration: Option<String>,
}

/// Probe a video file for information.
pub async fn probe_video(path: impl AsRef<Path>) -> MediaResult<VideoInfo> {
    let path = path.as_ref();

    if !path.exists() {
        return Err(MediaError::FileNotFound(path.to_path_buf()));
    }

    which::which("ffprobe").map_err(|_| MediaError::FfprobeNotFound)?;

    let output = Command::new("ffprobe")
        .args([
            "-v",
            "quiet",
            "-print_format",
            "json",
            "-show_format",
            "-show_streams",
        ])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .output()
        .await?;

    if !output.status.success() {
        return Err(MediaError::FfprobeFailed {
            message: "FFprobe failed".to_string(),
            stderr: Some(String::from_utf8_lossy(&output.stderr).to_string()),
        });
    }

    parse_probe_output(&output.stdout)
}

/// Parse FFprobe `-print_format json` output.
fn parse_probe_output(stdout: &[u8]) -> MediaResult<VideoInfo> {
    let probe: FfprobeOutput = serde_json::from_slice(stdout)?;

    let video_stream = probe
        .streams
        .iter()
        .find(|s| s.codec_type == "video")
        .ok_or_else(|| MediaError::InvalidVideo("No video stream found".to_string()))?;

    let duration = video_stream
        .duration
        .as_ref()
        .or(probe.format.duration.as_ref())
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0);

    let fps = video_stream
        .avg_frame_rate
        .as_ref()
        .and_then(|r| parse_frame_rate(r))
        .or_else(|| {
            video_stream
                .r_frame_rate
                .as_ref()
                .and_then(|r| parse_frame_rate(r))
        })
        .unwrap_or(30.0);

    // Some containers omit nb_frames; estimate from duration in that case.
    let frame_count = video_stream
        .nb_frames
        .as_ref()
        .and_then(|n| n.parse::<u64>().ok())
        .unwrap_or_else(|| (duration * fps).round().max(0.0) as u64);

    Ok(VideoInfo {
        duration,
        width: video_stream.width.unwrap_or(0),
        height: video_stream.height.unwrap_or(0),
        fps,
        frame_count,
        codec: video_stream.codec_name.clone().unwrap_or_default(),
    })
}

/// Parse frame rate string (e.g., "30/1" or "29.97").
fn parse_frame_rate(s: &str) -> Option<f64> {
    if let Some((num, den)) = s.split_once('/') {
        let num: f64 = num.parse().ok()?;
        let den: f64 = den.parse().ok()?;
        if den > 0.0 && num > 0.0 {
            return Some(num / den);
        }
        return None;
    }
    s.parse().ok().filter(|fps: &f64| *fps > 0.0)
}

/// Reject videos that cannot plausibly show a single 25 m range.
pub fn validate_segment_video(info: &VideoInfo) -> MediaResult<()> {
    validate_video_stream(info)?;

    let duration = info.frame_duration();
    if !(MIN_SEGMENT_DURATION_SECS..=MAX_SEGMENT_DURATION_SECS).contains(&duration) {
        return Err(MediaError::InvalidVideo(format!(
            "Video duration ({:.1}s) seems incorrect for a 25m range",
            duration
        )));
    }

    Ok(())
}

/// Reject streams that cannot be decoded into timed frames.
pub fn validate_video_stream(info: &VideoInfo) -> MediaResult<()> {
    if info.frame_count == 0 {
        return Err(MediaError::InvalidVideo("Video has no frames".to_string()));
    }
    if info.fps <= 0.0 {
        return Err(MediaError::InvalidVideo("Invalid frame rate".to_string()));
    }
    if info.width == 0 || info.height == 0 {
        return Err(MediaError::InvalidVideo(
            "Invalid video dimensions".to_string(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    fn info(duration: f64, fps: f64, frames: u64) -> VideoInfo {
        VideoInfo {
            duration,
            width: 1920,
            height: 1080,
            fps,
            frame_count: frames,
            codec: "h264".to_string(),
        }
    }

    #[test]
    fn test_parse_frame_rate() {
        assert!((parse_frame_rate("30/1").unwrap() - 30.0).abs() < 0.01);
        assert!((parse_frame_rate("30000/1001").unwrap() - 29.97).abs() < 0.01);
        assert!((parse_frame_rate("29.97").unwrap() - 29.97).abs() < 0.01);
        assert!(parse_frame_rate("0/0").is_none());
    }

    #[test]
    fn test_parse_probe_output() {
        let json = br#"{
            "format": {"duration": "3.100000"},
            "streams": [
                {"codec_type": "audio", "codec_name": "aac"},
                {"codec_type": "video", "codec_name": "h264", "width": 1280,
                 "height": 720, "avg_frame_rate": "60/1", "nb_frames": "180"}
            ]
        }"#;
        let info = parse_probe_output(json).unwrap();
        assert_eq!(info.width, 1280);
        assert_eq!(info.frame_count, 180);
        assert!((info.fps - 60.0).abs() < 1e-9);
        assert!((info.frame_duration() - 3.0).abs() < 1e-9);
        assert_eq!(info.meta().resolution(), "1280x720");
    }

    #[test]
    fn test_parse_probe_output_without_video() {
        let json = br#"{"format": {}, "streams": [{"codec_type": "audio"}]}"#;
        assert!(matches!(
            parse_probe_output(json),
            Err(MediaError::InvalidVideo(_))
        ));
    }

    #[test]
    fn test_validate_segment_video() {
        assert_ok!(validate_segment_video(&info(3.0, 30.0, 90)));
        assert_err!(validate_segment_video(&info(0.0, 30.0, 0)));
        assert_err!(validate_segment_video(&info(0.5, 30.0, 15)));
        assert_err!(validate_segment_video(&info(12.0, 30.0, 360)));
    }

    #[test]
    fn test_validate_video_stream_ignores_duration() {
        assert_ok!(validate_video_stream(&info(12.0, 30.0, 360)));
        assert_err!(validate_video_stream(&info(3.0, 0.0, 90)));
    }
}
