//! Program audio mixdown.
//!
//! Every audio clip is decoded to stereo f32 at the target rate, gained
//! through the same mute/solo/volume policy the live mixer uses, and summed
//! into one fixed-length buffer covering the whole sequence. The result is
//! handed to the encoder sink as a single stream.

use montage_audio::{MixerGraph, TrackGain};
use montage_core::{MediaAssetMeta, MontageError, Result};
use montage_media::AudioPcm;
use montage_timeline::Sequence;
use std::collections::HashMap;
use tracing::{debug, warn};
use uuid::Uuid;

/// How mixdown reads a clip's source audio. Seam over the ffmpeg decode so
/// tests can feed synthetic PCM.
pub trait PcmSource {
    fn decode(&self, uri: &str, sample_rate: u32) -> Result<AudioPcm>;
}

/// Subprocess-backed source used by real exports.
#[derive(Debug, Default, Clone)]
pub struct FfmpegPcmSource;

impl PcmSource for FfmpegPcmSource {
    fn decode(&self, uri: &str, sample_rate: u32) -> Result<AudioPcm> {
        montage_media::audio::decode_audio_f32_stereo(uri, sample_rate)
    }
}

/// Mix every audio clip in the sequence into one stereo buffer of exactly
/// `ceil(duration * sample_rate)` frames.
pub fn mix_sequence(
    seq: &Sequence,
    assets: &HashMap<Uuid, MediaAssetMeta>,
    sample_rate: u32,
    source: &dyn PcmSource,
) -> Result<AudioPcm> {
    let total_frames = (seq.duration_sec * f64::from(sample_rate)).ceil() as usize;
    let mut mix = vec![0.0f32; total_frames * 2];

    let audio_tracks = seq.audio_tracks();
    let mut gains = MixerGraph::new(audio_tracks.len(), 64);
    gains.set_tracks(
        audio_tracks
            .iter()
            .map(|t| TrackGain {
                muted: t.muted,
                solo: t.solo,
                volume: t.volume as f32,
            })
            .collect(),
    );

    for (track_idx, track) in audio_tracks.iter().enumerate() {
        let track_gain = gains.effective_gain(track_idx);
        if track_gain == 0.0 {
            debug!(track = %track.name, "track silent, skipped in mixdown");
            continue;
        }
        for clip in &track.clips {
            let Some(meta) = assets.get(&clip.media_id) else {
                return Err(MontageError::NotFound(format!(
                    "audio clip {} references unknown asset {}",
                    clip.id, clip.media_id
                )));
            };
            // Export reads the authoritative media, never the proxy.
            let Some(location) = meta.source_location() else {
                warn!(asset = %meta.name, "asset has no source location, skipped");
                continue;
            };
            let pcm = source
                .decode(&location.uri, sample_rate)?
                .resampled(sample_rate);
            mix_clip_into(
                &mut mix,
                &pcm,
                sample_rate,
                clip.start_sec,
                clip.trim_start_sec,
                clip.duration_sec,
                track_gain * clip.volume as f32,
            );
        }
    }

    for sample in &mut mix {
        *sample = sample.clamp(-1.0, 1.0);
    }

    Ok(AudioPcm {
        sample_rate,
        channels: 2,
        interleaved_f32: mix,
    })
}

/// Add one clip's span of source PCM into the mix at its timeline offset.
fn mix_clip_into(
    mix: &mut [f32],
    pcm: &AudioPcm,
    sample_rate: u32,
    start_sec: f64,
    trim_start_sec: f64,
    duration_sec: f64,
    gain: f32,
) {
    if gain == 0.0 {
        return;
    }
    let rate = f64::from(sample_rate);
    let dst_start = (start_sec * rate).round() as usize;
    let src_start = (trim_start_sec * rate).round() as usize;
    let span = (duration_sec * rate).round() as usize;
    let src_frames = pcm.frame_count();
    let dst_frames = mix.len() / 2;

    for i in 0..span {
        let src = src_start + i;
        let dst = dst_start + i;
        if src >= src_frames || dst >= dst_frames {
            break;
        }
        mix[dst * 2] += pcm.interleaved_f32[src * 2] * gain;
        mix[dst * 2 + 1] += pcm.interleaved_f32[src * 2 + 1] * gain;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use montage_core::{AssetKind, AssetLocation, LocationFidelity};
    use montage_timeline::{Clip, ClipKind, Track, TrackKind};

    /// Constant-amplitude stereo tone at any requested rate.
    struct TonePcm(f32);

    impl PcmSource for TonePcm {
        fn decode(&self, _uri: &str, sample_rate: u32) -> Result<AudioPcm> {
            Ok(AudioPcm {
                sample_rate,
                channels: 2,
                interleaved_f32: vec![self.0; sample_rate as usize * 2 * 10],
            })
        }
    }

    fn audio_asset(n: u128) -> MediaAssetMeta {
        MediaAssetMeta {
            id: Uuid::from_u128(n),
            name: format!("tone-{n}"),
            kind: AssetKind::Audio,
            duration_sec: 10.0,
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

    fn sequence_with_audio_clip(start: f64, duration: f64) -> (Sequence, HashMap<Uuid, MediaAssetMeta>) {
        let mut seq = Sequence::default();
        let asset = audio_asset(1);
        let track_id = seq.tracks[1].id;
        let mut clip = Clip::new(asset.id, track_id, ClipKind::Audio, start, 10.0);
        clip.duration_sec = duration;
        seq.tracks[1].clips.push(clip);
        seq.normalize();
        let mut assets = HashMap::new();
        assets.insert(asset.id, asset);
        (seq, assets)
    }

    #[test]
    fn test_mix_length_matches_sequence_duration() {
        let (seq, assets) = sequence_with_audio_clip(0.0, 2.0);
        let pcm = mix_sequence(&seq, &assets, 48_000, &TonePcm(0.25)).unwrap();
        assert_eq!(pcm.frame_count(), 96_000);
        assert_eq!(pcm.sample_rate, 48_000);
    }

    #[test]
    fn test_clip_lands_at_timeline_offset() {
        let (seq, assets) = sequence_with_audio_clip(1.0, 1.0);
        let pcm = mix_sequence(&seq, &assets, 1_000, &TonePcm(0.5)).unwrap();
        // Before the clip: silence. Inside: the tone.
        assert_eq!(pcm.interleaved_f32[500 * 2], 0.0);
        assert!((pcm.interleaved_f32[1500 * 2] - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_muted_track_is_silent_in_mix() {
        let (mut seq, assets) = sequence_with_audio_clip(0.0, 2.0);
        seq.tracks[1].muted = true;
        let pcm = mix_sequence(&seq, &assets, 1_000, &TonePcm(0.5)).unwrap();
        assert!(pcm.interleaved_f32.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_solo_elsewhere_silences_track() {
        let (mut seq, assets) = sequence_with_audio_clip(0.0, 2.0);
        let mut other = Track::new("A2", TrackKind::Audio, 0);
        other.solo = true;
        seq.tracks.push(other);
        let pcm = mix_sequence(&seq, &assets, 1_000, &TonePcm(0.5)).unwrap();
        assert!(pcm.interleaved_f32.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_overlapping_clips_sum_and_clamp() {
        let (mut seq, assets) = sequence_with_audio_clip(0.0, 2.0);
        let track_id = seq.tracks[1].id;
        let asset_id = seq.tracks[1].clips[0].media_id;
        let mut second = Clip::new(asset_id, track_id, ClipKind::Audio, 0.0, 10.0);
        second.duration_sec = 2.0;
        seq.tracks[1].clips.push(second);
        seq.normalize();
        let pcm = mix_sequence(&seq, &assets, 1_000, &TonePcm(0.8)).unwrap();
        // 0.8 + 0.8 clamps at the master bus.
        assert!((pcm.interleaved_f32[100] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_trim_start_offsets_source_read() {
        let (mut seq, assets) = sequence_with_audio_clip(0.0, 1.0);
        seq.tracks[1].clips[0].trim_start_sec = 0.5;
        // A ramp source makes the offset observable.
        struct Ramp;
        impl PcmSource for Ramp {
            fn decode(&self, _uri: &str, sample_rate: u32) -> Result<AudioPcm> {
                let frames = sample_rate as usize * 2;
                let mut data = Vec::with_capacity(frames * 2);
                for i in 0..frames {
                    let v = i as f32 / frames as f32;
                    data.push(v);
                    data.push(v);
                }
                Ok(AudioPcm {
                    sample_rate,
                    channels: 2,
                    interleaved_f32: data,
                })
            }
        }
        let pcm = mix_sequence(&seq, &assets, 1_000, &Ramp).unwrap();
        // First mixed sample reads the source half a second in.
        assert!((pcm.interleaved_f32[0] - 0.25).abs() < 1e-3);
    }

    #[test]
    fn test_unknown_asset_fails_mixdown() {
        let (mut seq, _) = sequence_with_audio_clip(0.0, 1.0);
        seq.normalize();
        let err = mix_sequence(&seq, &HashMap::new(), 1_000, &TonePcm(0.1));
        assert!(err.is_err());
    }
}
