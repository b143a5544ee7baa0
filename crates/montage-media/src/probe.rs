//! Stream metadata via ffprobe.
//!
//! Probing shells out to `ffprobe` with JSON output; no decoding happens
//! here. The keyframe index reads packet flags so the decode pipeline can
//! find the nearest preceding keyframe without scanning the file again.

use montage_core::{MontageError, Result};
use serde::Deserialize;
use std::process::Command;
use tracing::debug;

#[derive(Debug, Deserialize)]
struct ProbeStream {
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
    sample_rate: Option<String>,
    channels: Option<u16>,
}

#[derive(Debug, Deserialize)]
struct ProbeFormat {
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
    format: Option<ProbeFormat>,
}

/// Parsed stream metadata for one media location.
#[derive(Debug, Clone, PartialEq)]
pub struct ProbeInfo {
    pub width: u32,
    pub height: u32,
    pub fps_num: u32,
    pub fps_den: u32,
    pub duration_sec: f64,
    pub video_codec: Option<String>,
    pub audio_codec: Option<String>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    pub has_video: bool,
    pub has_audio: bool,
}

impl ProbeInfo {
    pub fn fps(&self) -> f64 {
        if self.fps_den == 0 {
            0.0
        } else {
            f64::from(self.fps_num) / f64::from(self.fps_den)
        }
    }
}

/// Probe a media location with ffprobe.
pub fn probe(uri: &str) -> Result<ProbeInfo> {
    let out = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-print_format",
            "json",
            "-show_streams",
            "-show_format",
        ])
        .arg(uri)
        .output()
        .map_err(|e| MontageError::Probe(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(MontageError::Probe(format!(
            "ffprobe failed for '{uri}': {}",
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let parsed: ProbeOutput = serde_json::from_slice(&out.stdout)
        .map_err(|e| MontageError::Probe(format!("ffprobe json parse failed: {e}")))?;

    let video = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("video"));
    let audio = parsed
        .streams
        .iter()
        .find(|s| s.codec_type.as_deref() == Some("audio"));

    let (fps_num, fps_den) = video
        .and_then(|v| parse_ratio(v.r_frame_rate.as_deref().unwrap_or("0/1")))
        .unwrap_or((0, 1));
    let duration_sec = parsed
        .format
        .as_ref()
        .and_then(|f| f.duration.as_ref())
        .and_then(|s| s.parse::<f64>().ok())
        .unwrap_or(0.0);

    let info = ProbeInfo {
        width: video.and_then(|v| v.width).unwrap_or(0),
        height: video.and_then(|v| v.height).unwrap_or(0),
        fps_num,
        fps_den,
        duration_sec,
        video_codec: video.and_then(|v| v.codec_name.clone()),
        audio_codec: audio.and_then(|a| a.codec_name.clone()),
        sample_rate: audio
            .and_then(|a| a.sample_rate.as_ref())
            .and_then(|s| s.parse().ok()),
        channels: audio.and_then(|a| a.channels),
        has_video: video.is_some(),
        has_audio: audio.is_some(),
    };
    debug!(uri, ?info.duration_sec, "probed media");
    Ok(info)
}

#[derive(Debug, Deserialize)]
struct ProbePacket {
    pts_time: Option<String>,
    flags: Option<String>,
}

#[derive(Debug, Deserialize)]
struct PacketsOutput {
    #[serde(default)]
    packets: Vec<ProbePacket>,
}

/// Keyframe presentation times for the first video stream, sorted ascending.
pub fn keyframe_index(uri: &str) -> Result<Vec<f64>> {
    let out = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-select_streams",
            "v:0",
            "-show_entries",
            "packet=pts_time,flags",
            "-print_format",
            "json",
        ])
        .arg(uri)
        .output()
        .map_err(|e| MontageError::Probe(format!("failed to run ffprobe: {e}")))?;
    if !out.status.success() {
        return Err(MontageError::Probe(format!(
            "keyframe probe failed for '{uri}': {}",
            String::from_utf8_lossy(&out.stderr).trim()
        )));
    }

    let parsed: PacketsOutput = serde_json::from_slice(&out.stdout)
        .map_err(|e| MontageError::Probe(format!("packet json parse failed: {e}")))?;
    let mut keys: Vec<f64> = parsed
        .packets
        .iter()
        .filter(|p| p.flags.as_deref().is_some_and(|f| f.contains('K')))
        .filter_map(|p| p.pts_time.as_ref().and_then(|t| t.parse().ok()))
        .collect();
    keys.sort_by(f64::total_cmp);
    Ok(keys)
}

fn parse_ratio(s: &str) -> Option<(u32, u32)> {
    let mut parts = s.split('/');
    let num = parts.next()?.parse::<u32>().ok()?;
    let den = parts.next()?.parse::<u32>().ok()?;
    if den == 0 {
        return None;
    }
    Some((num, den))
}
