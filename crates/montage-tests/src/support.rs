//! Shared fixtures for the integration tests.

use montage_core::{
    AssetKind, AssetLocation, FrameBuffer, LocationFidelity, MediaAssetMeta, MontageError, Result,
};
use montage_media::{AudioPcm, FrameDecoder, SourceInfo};
use montage_timeline::{Clip, ClipKind, Sequence};
use uuid::Uuid;

/// Decoder producing solid-color frames (16x16, 10 fps) so tests can tell
/// assets apart by pixel value.
pub struct ColorDecoder {
    pub duration_sec: f64,
    pub rgba: [u8; 4],
    pub fail: bool,
}

impl ColorDecoder {
    pub fn new(duration_sec: f64, rgba: [u8; 4]) -> Self {
        Self {
            duration_sec,
            rgba,
            fail: false,
        }
    }
}

impl FrameDecoder for ColorDecoder {
    fn open(&self, uri: &str) -> Result<SourceInfo> {
        if self.fail {
            return Err(MontageError::Probe(format!("cannot open '{uri}'")));
        }
        Ok(SourceInfo {
            uri: uri.to_string(),
            width: 16,
            height: 16,
            fps_num: 10,
            fps_den: 1,
            duration_sec: self.duration_sec,
            has_audio: false,
        })
    }

    fn keyframes(&self, _info: &SourceInfo) -> Result<Vec<f64>> {
        Ok(vec![0.0, 2.0, 4.0, 6.0, 8.0])
    }

    fn decode_span(
        &self,
        info: &SourceInfo,
        start_sec: f64,
        frame_count: u32,
    ) -> Result<Vec<FrameBuffer>> {
        let step = info.frame_step();
        let mut frames = Vec::new();
        for i in 0..frame_count {
            if start_sec + f64::from(i) * step >= self.duration_sec {
                break;
            }
            frames.push(FrameBuffer::solid(info.width, info.height, self.rgba));
        }
        Ok(frames)
    }
}

/// PCM source producing a constant-amplitude stereo tone.
pub struct ToneSource(pub f32);

impl montage_export::PcmSource for ToneSource {
    fn decode(&self, _uri: &str, sample_rate: u32) -> Result<AudioPcm> {
        Ok(AudioPcm {
            sample_rate,
            channels: 2,
            interleaved_f32: vec![self.0; sample_rate as usize * 2 * 10],
        })
    }
}

pub fn video_asset(n: u128, duration_sec: f64) -> MediaAssetMeta {
    MediaAssetMeta {
        id: Uuid::from_u128(n),
        name: format!("asset-{n}"),
        kind: AssetKind::Video,
        duration_sec,
        width: Some(16),
        height: Some(16),
        frame_rate: None,
        sample_rate: None,
        channels: None,
        locations: vec![AssetLocation {
            fidelity: LocationFidelity::Source,
            uri: format!("asset-{n}.mp4"),
        }],
        waveform: None,
    }
}

pub fn audio_asset(n: u128, duration_sec: f64) -> MediaAssetMeta {
    MediaAssetMeta {
        id: Uuid::from_u128(n),
        name: format!("tone-{n}"),
        kind: AssetKind::Audio,
        duration_sec,
        width: None,
        height: None,
        frame_rate: None,
        sample_rate: Some(48_000),
        channels: Some(2),
        locations: vec![AssetLocation {
            fidelity: LocationFidelity::Source,
            uri: format!("tone-{n}.wav"),
        }],
        waveform: None,
    }
}

/// Place a video clip of `duration` on the sequence's first video track.
pub fn place_clip(seq: &mut Sequence, media_id: Uuid, start_sec: f64, duration_sec: f64) -> Uuid {
    let track_id = seq.tracks[0].id;
    let mut clip = Clip::new(media_id, track_id, ClipKind::Video, start_sec, 10.0);
    clip.duration_sec = duration_sec;
    let id = clip.id;
    seq.tracks[0].clips.push(clip);
    seq.normalize();
    id
}

/// The center pixel of a frame as RGB.
pub fn center_pixel(frame: &FrameBuffer) -> [u8; 3] {
    let idx = ((frame.height / 2) * frame.width + frame.width / 2) as usize * 4;
    [frame.data[idx], frame.data[idx + 1], frame.data[idx + 2]]
}
