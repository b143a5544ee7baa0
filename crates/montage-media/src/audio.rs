//! Compressed audio to PCM.
//!
//! Audio decode goes through one ffmpeg run per asset, producing interleaved
//! stereo f32 at the requested rate. Sources without an audio stream come
//! back as empty PCM rather than an error, so video-only clips mix silently.

use montage_core::{MontageError, Result};
use std::process::Command;
use tracing::debug;

/// Interleaved stereo PCM at a known sample rate.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioPcm {
    pub sample_rate: u32,
    pub channels: u16,
    pub interleaved_f32: Vec<f32>,
}

impl AudioPcm {
    /// Silence of the given length.
    pub fn silence(sample_rate: u32, frames: usize) -> Self {
        Self {
            sample_rate,
            channels: 2,
            interleaved_f32: vec![0.0; frames * 2],
        }
    }

    /// Number of sample frames (stereo pairs).
    pub fn frame_count(&self) -> usize {
        self.interleaved_f32.len() / self.channels.max(1) as usize
    }

    /// Duration in seconds.
    pub fn duration_sec(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frame_count() as f64 / self.sample_rate as f64
    }

    /// Resample to a new rate with linear interpolation. Returns the input
    /// untouched when the rates already match.
    pub fn resampled(&self, target_rate: u32) -> AudioPcm {
        if target_rate == self.sample_rate || self.sample_rate == 0 || self.interleaved_f32.is_empty()
        {
            let mut out = self.clone();
            out.sample_rate = target_rate;
            return out;
        }
        let src_frames = self.frame_count();
        let ratio = self.sample_rate as f64 / target_rate as f64;
        let dst_frames = (src_frames as f64 / ratio).round() as usize;
        let mut out = Vec::with_capacity(dst_frames * 2);
        for i in 0..dst_frames {
            let src_pos = i as f64 * ratio;
            let idx = src_pos as usize;
            let frac = (src_pos - idx as f64) as f32;
            for ch in 0..2usize {
                let a = self
                    .interleaved_f32
                    .get(idx * 2 + ch)
                    .copied()
                    .unwrap_or(0.0);
                let b = self
                    .interleaved_f32
                    .get((idx + 1) * 2 + ch)
                    .copied()
                    .unwrap_or(a);
                out.push(a + (b - a) * frac);
            }
        }
        AudioPcm {
            sample_rate: target_rate,
            channels: 2,
            interleaved_f32: out,
        }
    }
}

/// Decode a media location's audio to stereo f32 at `sample_rate`.
pub fn decode_audio_f32_stereo(uri: &str, sample_rate: u32) -> Result<AudioPcm> {
    let out = Command::new("ffmpeg")
        .args(["-v", "error", "-i"])
        .arg(uri)
        .args([
            "-vn",
            "-f",
            "f32le",
            "-acodec",
            "pcm_f32le",
            "-ac",
            "2",
            "-ar",
            &sample_rate.to_string(),
            "pipe:1",
        ])
        .output()
        .map_err(|e| MontageError::Decoder(format!("failed to run ffmpeg for audio: {e}")))?;

    if !out.status.success() {
        let msg = String::from_utf8_lossy(&out.stderr);
        // ffmpeg reports a missing audio stream as an error; treat that as
        // empty PCM so silent video files keep playing.
        if msg.contains("Stream specifier")
            || msg.contains("matches no streams")
            || msg.contains("does not contain any stream")
        {
            return Ok(AudioPcm {
                sample_rate,
                channels: 2,
                interleaved_f32: Vec::new(),
            });
        }
        return Err(MontageError::Decoder(format!(
            "ffmpeg audio decode failed for '{uri}': {}",
            msg.trim()
        )));
    }

    if out.stdout.len() % 4 != 0 {
        return Err(MontageError::Decoder(
            "decoded audio byte length is not aligned to f32 samples".into(),
        ));
    }
    let mut pcm = Vec::<f32>::with_capacity(out.stdout.len() / 4);
    for chunk in out.stdout.chunks_exact(4) {
        pcm.push(f32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }
    debug!(uri, frames = pcm.len() / 2, "decoded audio");

    Ok(AudioPcm {
        sample_rate,
        channels: 2,
        interleaved_f32: pcm,
    })
}
