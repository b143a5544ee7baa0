//! The decoder seam and its ffmpeg subprocess backend.
//!
//! [`FrameDecoder`] is the boundary the decode pipeline talks through, so
//! the windowing/caching logic is independent of how bytes become pixels.
//! The shipped backend spawns the system `ffmpeg`/`ffprobe` binaries and
//! reads raw RGBA off a pipe, which avoids native FFmpeg header and linking
//! requirements entirely.

use crate::probe;
use montage_core::{FrameBuffer, MontageError, Result};
use std::process::Command;

/// Metadata for an opened media location.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceInfo {
    pub uri: String,
    pub width: u32,
    pub height: u32,
    pub fps_num: u32,
    pub fps_den: u32,
    pub duration_sec: f64,
    pub has_audio: bool,
}

impl SourceInfo {
    pub fn fps(&self) -> f64 {
        if self.fps_den == 0 {
            0.0
        } else {
            f64::from(self.fps_num) / f64::from(self.fps_den)
        }
    }

    /// Duration of one source frame in seconds.
    pub fn frame_step(&self) -> f64 {
        let fps = self.fps();
        if fps > 0.0 {
            1.0 / fps
        } else {
            1.0 / 30.0
        }
    }
}

/// How a decode pipeline reads compressed media.
pub trait FrameDecoder: Send {
    /// Open and probe a location.
    fn open(&self, uri: &str) -> Result<SourceInfo>;

    /// Keyframe presentation times, sorted ascending. An empty index means
    /// every decode starts from the beginning of the file.
    fn keyframes(&self, info: &SourceInfo) -> Result<Vec<f64>>;

    /// Decode `frame_count` sequential frames starting at `start_sec`,
    /// returned in presentation order. May return fewer near end of stream.
    fn decode_span(
        &self,
        info: &SourceInfo,
        start_sec: f64,
        frame_count: u32,
    ) -> Result<Vec<FrameBuffer>>;
}

/// Subprocess-based decoder using the system ffmpeg binaries.
#[derive(Debug, Default, Clone)]
pub struct FfmpegDecoder;

impl FrameDecoder for FfmpegDecoder {
    fn open(&self, uri: &str) -> Result<SourceInfo> {
        let info = probe::probe(uri)?;
        if !info.has_video {
            return Err(MontageError::Decoder(format!(
                "no video stream in '{uri}'"
            )));
        }
        Ok(SourceInfo {
            uri: uri.to_string(),
            width: info.width,
            height: info.height,
            fps_num: info.fps_num,
            fps_den: info.fps_den,
            duration_sec: info.duration_sec,
            has_audio: info.has_audio,
        })
    }

    fn keyframes(&self, info: &SourceInfo) -> Result<Vec<f64>> {
        probe::keyframe_index(&info.uri)
    }

    fn decode_span(
        &self,
        info: &SourceInfo,
        start_sec: f64,
        frame_count: u32,
    ) -> Result<Vec<FrameBuffer>> {
        if frame_count == 0 {
            return Ok(Vec::new());
        }
        let out = Command::new("ffmpeg")
            .args(["-v", "error", "-ss", &format!("{start_sec:.9}")])
            .arg("-i")
            .arg(&info.uri)
            .args([
                "-frames:v",
                &frame_count.to_string(),
                "-f",
                "rawvideo",
                "-pix_fmt",
                "rgba",
                "pipe:1",
            ])
            .output()
            .map_err(|e| MontageError::Decoder(format!("failed to run ffmpeg: {e}")))?;
        if !out.status.success() {
            return Err(MontageError::Decoder(format!(
                "ffmpeg decode failed for '{}': {}",
                info.uri,
                String::from_utf8_lossy(&out.stderr).trim()
            )));
        }

        let frame_len = info.width as usize * info.height as usize * 4;
        if frame_len == 0 {
            return Err(MontageError::Decoder(
                "decoded frame size is zero (invalid source dimensions)".into(),
            ));
        }
        if out.stdout.len() % frame_len != 0 {
            return Err(MontageError::Decoder(format!(
                "decoded batch has invalid size: {} bytes, expected a multiple of {frame_len}",
                out.stdout.len()
            )));
        }

        let available = (out.stdout.len() / frame_len).min(frame_count as usize);
        let mut frames = Vec::with_capacity(available);
        for idx in 0..available {
            let off = idx * frame_len;
            let data = out.stdout[off..off + frame_len].to_vec();
            let frame = FrameBuffer::from_rgba(info.width, info.height, data).ok_or_else(|| {
                MontageError::Decoder("decoded frame length mismatch".into())
            })?;
            frames.push(frame);
        }
        Ok(frames)
    }
}

/// Whether the ffmpeg binary is available on PATH.
pub fn is_ffmpeg_on_path() -> bool {
    Command::new("ffmpeg")
        .arg("-version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}
