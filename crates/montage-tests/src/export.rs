//! End-to-end export tests: frame walk, mixdown, progress, cancellation.

use crate::support::{audio_asset, place_clip, video_asset, ColorDecoder, ToneSource};
use crossbeam_channel::unbounded;
use montage_core::{FrameRate, MediaAssetMeta, Result};
use montage_export::{
    mix_sequence, run_export, AudioCodec, CancelToken, EncoderSink, ExportFormat, ExportOutcome,
    ExportProgress, ExportRequest, ProgressReporter, ResolutionPreset,
};
use montage_media::AudioPcm;
use montage_timeline::{Clip, ClipKind, Sequence};
use std::collections::HashMap;
use uuid::Uuid;

/// Sink that records frames and mux decisions without touching ffmpeg.
#[derive(Default)]
struct MemorySink {
    frames: Vec<usize>,
    negotiated: Option<AudioCodec>,
    audio_frames: usize,
    finished: bool,
    aborted: bool,
    cancel_after: Option<(usize, CancelToken)>,
}

impl EncoderSink for MemorySink {
    fn supported_audio_codecs(&self) -> Result<Vec<AudioCodec>> {
        Ok(AudioCodec::PREFERENCE_ORDER.to_vec())
    }

    fn begin(&mut self, format: &ExportFormat, audio: Option<&AudioPcm>) -> Result<()> {
        self.negotiated = format.audio_codec;
        self.audio_frames = audio.map_or(0, AudioPcm::frame_count);
        Ok(())
    }

    fn write_frame(&mut self, rgba: &[u8]) -> Result<()> {
        self.frames.push(rgba.len());
        if let Some((after, token)) = &self.cancel_after {
            if self.frames.len() >= *after {
                token.cancel();
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<Vec<u8>> {
        self.finished = true;
        Ok(b"container".to_vec())
    }

    fn abort(&mut self) {
        self.aborted = true;
    }
}

/// 3-second sequence at 30 fps: video clip plus an audio bed.
fn export_fixture() -> (Sequence, HashMap<Uuid, MediaAssetMeta>) {
    let mut seq = Sequence::new("Program", 64, 36, FrameRate::FPS_30);
    let video = video_asset(1, 10.0);
    let tone = audio_asset(2, 10.0);
    place_clip(&mut seq, video.id, 0.0, 3.0);
    let audio_track_id = seq.tracks[1].id;
    let mut bed = Clip::new(tone.id, audio_track_id, ClipKind::Audio, 0.0, 10.0);
    bed.duration_sec = 3.0;
    seq.tracks[1].clips.push(bed);
    seq.normalize();

    let mut assets = HashMap::new();
    assets.insert(video.id, video);
    assets.insert(tone.id, tone);
    (seq, assets)
}

fn request() -> ExportRequest {
    let mut r = ExportRequest::new(Uuid::new_v4());
    r.resolution = ResolutionPreset::Sequence;
    r
}

#[test]
fn export_walks_exactly_duration_times_fps_frames() {
    let (seq, assets) = export_fixture();
    let mut sink = MemorySink::default();
    let outcome = run_export(
        &seq,
        &assets,
        &request(),
        &|| Box::new(ColorDecoder::new(10.0, [50, 60, 70, 255])),
        &ToneSource(0.25),
        &mut sink,
        &mut ProgressReporter::sink(),
        &CancelToken::new(),
    )
    .unwrap();

    assert_eq!(sink.frames.len(), 90);
    // Every frame is a full canvas of RGBA bytes.
    assert!(sink.frames.iter().all(|&len| len == 64 * 36 * 4));
    // Mixdown covers the whole program at 48 kHz.
    assert_eq!(sink.audio_frames, 144_000);
    assert!(sink.finished);
    match outcome {
        ExportOutcome::Finished(payload) => {
            assert_eq!(payload.mime, "video/mp4");
            assert_eq!(payload.data, b"container");
        }
        ExportOutcome::Cancelled => panic!("export should finish"),
    }
}

#[test]
fn cancellation_returns_the_cancelled_outcome_not_a_payload() {
    let (seq, assets) = export_fixture();
    let cancel = CancelToken::new();
    let mut sink = MemorySink {
        cancel_after: Some((20, cancel.clone())),
        ..Default::default()
    };
    let outcome = run_export(
        &seq,
        &assets,
        &request(),
        &|| Box::new(ColorDecoder::new(10.0, [50, 60, 70, 255])),
        &ToneSource(0.25),
        &mut sink,
        &mut ProgressReporter::sink(),
        &cancel,
    )
    .unwrap();

    assert_eq!(outcome, ExportOutcome::Cancelled);
    assert!(sink.aborted);
    assert!(!sink.finished);
    assert!(sink.frames.len() < 90);
}

#[test]
fn progress_is_monotonic_reaches_100_and_carries_status() {
    let (seq, assets) = export_fixture();
    let (tx, rx) = unbounded();
    run_export(
        &seq,
        &assets,
        &request(),
        &|| Box::new(ColorDecoder::new(10.0, [50, 60, 70, 255])),
        &ToneSource(0.25),
        &mut MemorySink::default(),
        &mut ProgressReporter::new(tx),
        &CancelToken::new(),
    )
    .unwrap();

    let updates: Vec<ExportProgress> = rx.try_iter().collect();
    assert!(updates.len() >= 3);
    let mut last = 0.0;
    for update in &updates {
        assert!(update.progress >= last);
        assert!(!update.status.is_empty());
        last = update.progress;
    }
    assert_eq!(last, 100.0);
}

#[test]
fn export_uses_the_negotiated_audio_codec() {
    let (seq, assets) = export_fixture();
    let mut sink = MemorySink::default();
    run_export(
        &seq,
        &assets,
        &request(),
        &|| Box::new(ColorDecoder::new(10.0, [50, 60, 70, 255])),
        &ToneSource(0.25),
        &mut sink,
        &mut ProgressReporter::sink(),
        &CancelToken::new(),
    )
    .unwrap();
    assert_eq!(sink.negotiated, Some(AudioCodec::Aac));
}

#[test]
fn mixdown_places_the_bed_across_the_program() {
    let (seq, assets) = export_fixture();
    let pcm = mix_sequence(&seq, &assets, 8_000, &ToneSource(0.5)).unwrap();
    assert_eq!(pcm.frame_count(), 24_000);
    // Tone present at the start and just before the end.
    assert!((pcm.interleaved_f32[0] - 0.5).abs() < 1e-6);
    let near_end = (23_990 * 2) as usize;
    assert!((pcm.interleaved_f32[near_end] - 0.5).abs() < 1e-6);
}

#[test]
fn deterministic_walk_maps_frame_index_to_time() {
    // A 1-second sequence at 24 fps walks 24 frames, each at i/24 s.
    let mut seq = Sequence::new("Short", 32, 18, FrameRate::FPS_24);
    let video = video_asset(1, 10.0);
    place_clip(&mut seq, video.id, 0.0, 1.0);
    let mut assets = HashMap::new();
    assets.insert(video.id, video);

    let mut sink = MemorySink::default();
    let mut r = request();
    r.include_audio = false;
    run_export(
        &seq,
        &assets,
        &r,
        &|| Box::new(ColorDecoder::new(10.0, [10, 20, 30, 255])),
        &ToneSource(0.0),
        &mut sink,
        &mut ProgressReporter::sink(),
        &CancelToken::new(),
    )
    .unwrap();
    assert_eq!(sink.frames.len(), 24);
    assert_eq!(sink.audio_frames, 0);
}
