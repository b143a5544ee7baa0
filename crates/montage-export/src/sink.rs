//! The encoder seam and its ffmpeg subprocess backend.
//!
//! [`EncoderSink`] is the boundary the export job writes through: raw RGBA
//! frames in presentation order plus an optional pre-mixed audio buffer,
//! muxed into one container. The shipped backend drives the system `ffmpeg`
//! binary over a pipe, mirroring how the decode side reads it.

use crate::preset::{AudioCodec, ExportFormat};
use montage_core::{MontageError, Result};
use montage_media::AudioPcm;
use std::io::Write;
use std::process::{Child, ChildStdin, Command, Stdio};
use tempfile::TempDir;
use tracing::{debug, info, warn};

/// Where composited frames and mixed audio are encoded and muxed.
pub trait EncoderSink: Send {
    /// Audio encoders this sink can use, for capability probing.
    fn supported_audio_codecs(&self) -> Result<Vec<AudioCodec>>;

    /// Start an encode. `audio`, when present, is the complete mixed-down
    /// program audio.
    fn begin(&mut self, format: &ExportFormat, audio: Option<&AudioPcm>) -> Result<()>;

    /// Append one frame of `width * height * 4` RGBA bytes.
    fn write_frame(&mut self, rgba: &[u8]) -> Result<()>;

    /// Finalize the container and return its bytes.
    fn finish(&mut self) -> Result<Vec<u8>>;

    /// Tear down without producing output. Safe to call at any point.
    fn abort(&mut self);
}

/// Parse `ffmpeg -encoders` output for the audio codecs we know.
pub fn probe_ffmpeg_audio_encoders() -> Result<Vec<AudioCodec>> {
    let out = Command::new("ffmpeg")
        .args(["-hide_banner", "-encoders"])
        .output()
        .map_err(|e| MontageError::Encoder(format!("failed to run ffmpeg: {e}")))?;
    if !out.status.success() {
        return Err(MontageError::Encoder(
            "ffmpeg -encoders exited with failure".into(),
        ));
    }
    let listing = String::from_utf8_lossy(&out.stdout);
    let available = AudioCodec::PREFERENCE_ORDER
        .into_iter()
        .filter(|codec| {
            listing
                .lines()
                .any(|line| line.split_whitespace().nth(1) == Some(codec.ffmpeg_encoder()))
        })
        .collect();
    Ok(available)
}

/// First codec in the fixed preference order that the sink supports.
pub fn pick_audio_codec(supported: &[AudioCodec]) -> Option<AudioCodec> {
    AudioCodec::PREFERENCE_ORDER
        .into_iter()
        .find(|c| supported.contains(c))
}

/// ffmpeg subprocess sink. Video streams through stdin; audio, when
/// present, is staged as raw f32 samples in a scratch directory that is
/// removed with the sink.
#[derive(Default)]
pub struct FfmpegSink {
    workdir: Option<TempDir>,
    child: Option<Child>,
    stdin: Option<ChildStdin>,
    output_path: Option<std::path::PathBuf>,
    frame_len: usize,
}

impl FfmpegSink {
    pub fn new() -> Self {
        Self::default()
    }

    fn teardown(&mut self) {
        self.stdin.take();
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
        self.output_path.take();
        self.workdir.take();
    }
}

impl EncoderSink for FfmpegSink {
    fn supported_audio_codecs(&self) -> Result<Vec<AudioCodec>> {
        probe_ffmpeg_audio_encoders()
    }

    fn begin(&mut self, format: &ExportFormat, audio: Option<&AudioPcm>) -> Result<()> {
        let workdir = TempDir::new()
            .map_err(|e| MontageError::Encoder(format!("scratch dir: {e}")))?;
        let output_path = workdir
            .path()
            .join(format!("program.{}", format.container.extension()));

        let mut args: Vec<String> = vec![
            "-y".into(),
            "-f".into(),
            "rawvideo".into(),
            "-pixel_format".into(),
            "rgba".into(),
            "-video_size".into(),
            format!("{}x{}", format.width, format.height),
            "-framerate".into(),
            format!(
                "{}/{}",
                format.frame_rate.numerator, format.frame_rate.denominator
            ),
            "-i".into(),
            "pipe:0".into(),
        ];

        if let Some(pcm) = audio {
            let audio_path = workdir.path().join("mixdown.f32");
            let mut bytes = Vec::with_capacity(pcm.interleaved_f32.len() * 4);
            for sample in &pcm.interleaved_f32 {
                bytes.extend_from_slice(&sample.to_le_bytes());
            }
            std::fs::write(&audio_path, bytes)
                .map_err(|e| MontageError::Encoder(format!("stage audio: {e}")))?;
            args.extend([
                "-f".into(),
                "f32le".into(),
                "-ar".into(),
                pcm.sample_rate.to_string(),
                "-ac".into(),
                "2".into(),
                "-i".into(),
                audio_path.to_string_lossy().into_owned(),
            ]);
        }

        args.extend(["-c:v".into(), format.video_codec.ffmpeg_encoder().into()]);
        if let Some(crf) = format.crf {
            args.extend(["-crf".into(), crf.to_string()]);
        }
        args.extend(["-pix_fmt".into(), "yuv420p".into()]);

        match (audio, format.audio_codec) {
            (Some(_), Some(codec)) => {
                args.extend([
                    "-c:a".into(),
                    codec.ffmpeg_encoder().into(),
                    "-shortest".into(),
                ]);
            }
            (Some(_), None) => {
                return Err(MontageError::Encoder(
                    "audio supplied without a negotiated codec".into(),
                ))
            }
            (None, _) => args.push("-an".into()),
        }

        args.push(output_path.to_string_lossy().into_owned());
        debug!(?args, "starting ffmpeg mux");

        let mut child = Command::new("ffmpeg")
            .args(["-v", "error"])
            .args(&args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| MontageError::Encoder(format!("failed to spawn ffmpeg: {e}")))?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| MontageError::Encoder("ffmpeg stdin unavailable".into()))?;

        self.frame_len = format.width as usize * format.height as usize * 4;
        self.workdir = Some(workdir);
        self.child = Some(child);
        self.stdin = Some(stdin);
        self.output_path = Some(output_path);
        Ok(())
    }

    fn write_frame(&mut self, rgba: &[u8]) -> Result<()> {
        if rgba.len() != self.frame_len {
            return Err(MontageError::Encoder(format!(
                "frame is {} bytes, expected {}",
                rgba.len(),
                self.frame_len
            )));
        }
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| MontageError::Encoder("sink is not started".into()))?;
        stdin
            .write_all(rgba)
            .map_err(|e| MontageError::Encoder(format!("write frame: {e}")))
    }

    fn finish(&mut self) -> Result<Vec<u8>> {
        // Closing stdin signals end-of-stream.
        self.stdin.take();
        let mut child = self
            .child
            .take()
            .ok_or_else(|| MontageError::Encoder("sink is not started".into()))?;
        let status = child
            .wait()
            .map_err(|e| MontageError::Encoder(format!("wait for ffmpeg: {e}")))?;
        if !status.success() {
            self.teardown();
            return Err(MontageError::Encoder(format!(
                "ffmpeg exited with {status}"
            )));
        }
        let path = self
            .output_path
            .take()
            .ok_or_else(|| MontageError::Encoder("no output path".into()))?;
        let data = std::fs::read(&path)
            .map_err(|e| MontageError::Encoder(format!("read container: {e}")))?;
        info!(bytes = data.len(), "mux complete");
        self.workdir.take();
        Ok(data)
    }

    fn abort(&mut self) {
        warn!("encode aborted, discarding scratch output");
        self.teardown();
    }
}

impl Drop for FfmpegSink {
    fn drop(&mut self) {
        self.teardown();
    }
}
