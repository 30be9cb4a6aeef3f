//! Streaming frame decoding through FFmpeg.
//!
//! Frames are read one at a time from an `rgb24` rawvideo pipe so a whole
//! segment never has to sit in memory. Frames are downscaled to an analysis
//! width for inference; landmark coordinates are normalized, so pixel
//! positions are later expressed in the source resolution.

use image::RgbImage;
use std::path::Path;
use std::process::Stdio;
use tokio::io::{AsyncRead, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};
use tracing::{debug, warn};

use crate::error::{MediaError, MediaResult};
use crate::probe::VideoInfo;

/// Default width frames are scaled to before inference.
pub const DEFAULT_ANALYSIS_WIDTH: u32 = 640;

/// One decoded video frame.
#[derive(Debug, Clone)]
pub struct DecodedFrame {
    pub index: u64,
    /// `index / fps` in seconds.
    pub timestamp: f64,
    pub image: RgbImage,
}

/// Pull-based reader over `rgb24` rawvideo bytes, normally an FFmpeg pipe.
pub struct FrameStream<R = BufReader<ChildStdout>> {
    child: Option<Child>,
    reader: R,
    width: u32,
    height: u32,
    fps: f64,
    next_index: u64,
    finished: bool,
}

impl FrameStream {
    /// Spawn FFmpeg for `video_path`, scaling frames to at most `analysis_width`.
    pub async fn open(
        video_path: &Path,
        info: &VideoInfo,
        analysis_width: u32,
    ) -> MediaResult<Self> {
        which::which("ffmpeg").map_err(|_| MediaError::FfmpegNotFound)?;

        if info.width == 0 || info.height == 0 || info.fps <= 0.0 {
            return Err(MediaError::InvalidVideo(format!(
                "Cannot decode {}x{} @ {:.2}fps",
                info.width, info.height, info.fps
            )));
        }

        let (width, height) = analysis_dimensions(info.width, info.height, analysis_width);

        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-hide_banner", "-loglevel", "error", "-i"])
            .arg(video_path)
            .args([
                "-vf",
                &format!("scale={}:{}", width, height),
                "-vsync",
                "passthrough",
                "-pix_fmt",
                "rgb24",
                "-f",
                "rawvideo",
                "-",
            ])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true);

        debug!(
            "Decoding {} at {}x{} ({}x{} source)",
            video_path.display(),
            width,
            height,
            info.width,
            info.height
        );

        let mut child = cmd.spawn().map_err(|e| {
            MediaError::ffmpeg_failed(format!("Failed to spawn FFmpeg: {}", e), None, None)
        })?;

        let stdout = child.stdout.take().ok_or_else(|| {
            MediaError::ffmpeg_failed("Failed to capture FFmpeg stdout", None, None)
        })?;

        let mut stream = FrameStream::from_reader(BufReader::new(stdout), width, height, info.fps);
        stream.child = Some(child);
        Ok(stream)
    }
}

impl<R: AsyncRead + Unpin> FrameStream<R> {
    /// Read `width x height` rgb24 frames from any byte source.
    pub fn from_reader(reader: R, width: u32, height: u32, fps: f64) -> Self {
        Self {
            child: None,
            reader,
            width,
            height,
            fps,
            next_index: 0,
            finished: false,
        }
    }

    fn frame_bytes(&self) -> usize {
        (self.width * self.height * 3) as usize
    }

    /// Index the next frame will carry.
    pub fn next_index(&self) -> u64 {
        self.next_index
    }

    /// Read the next frame.
    ///
    /// Returns `Ok(None)` at end of stream. A truncated trailing frame yields
    /// `Err(FrameDecode)` once; the stream is finished afterwards.
    pub async fn next_frame(&mut self) -> MediaResult<Option<DecodedFrame>> {
        if self.finished {
            return Ok(None);
        }

        let mut buffer = vec![0u8; self.frame_bytes()];
        let mut filled = 0;
        while filled < buffer.len() {
            let read = match self.reader.read(&mut buffer[filled..]).await {
                Ok(n) => n,
                Err(e) => {
                    self.finished = true;
                    return Err(MediaError::frame_decode(format!(
                        "frame {}: {}",
                        self.next_index, e
                    )));
                }
            };
            if read == 0 {
                break;
            }
            filled += read;
        }

        let index = self.next_index;
        self.next_index += 1;

        if filled == 0 {
            self.finished = true;
            return Ok(None);
        }
        if filled < buffer.len() {
            self.finished = true;
            return Err(MediaError::frame_decode(format!(
                "frame {} truncated ({} of {} bytes)",
                index,
                filled,
                buffer.len()
            )));
        }

        let image = RgbImage::from_raw(self.width, self.height, buffer).ok_or_else(|| {
            MediaError::frame_decode(format!("frame {} has an invalid buffer size", index))
        })?;

        Ok(Some(DecodedFrame {
            index,
            timestamp: index as f64 / self.fps,
            image,
        }))
    }

    /// Wait for FFmpeg to exit. A non-zero status is logged, not returned:
    /// frames already read stay usable.
    pub async fn finish(self) -> MediaResult<()> {
        let Some(mut child) = self.child else {
            return Ok(());
        };
        let status = child.wait().await.map_err(|e| {
            MediaError::ffmpeg_failed(format!("FFmpeg process error: {}", e), None, None)
        })?;

        if !status.success() {
            warn!(
                "FFmpeg returned non-zero status {:?} after {} frames",
                status.code(),
                self.next_index
            );
        }
        Ok(())
    }
}

/// Scale `(width, height)` down to `max_width`, keeping the aspect ratio and
/// even dimensions for FFmpeg.
pub fn analysis_dimensions(width: u32, height: u32, max_width: u32) -> (u32, u32) {
    if max_width == 0 || width <= max_width {
        return (width, height);
    }
    let scaled = (height as f64 * max_width as f64 / width as f64).round() as u32;
    let even = (scaled / 2 * 2).max(2);
    (max_width / 2 * 2, even)
}
