//! End-to-end compositing and preview-loop tests.

use crate::support::{center_pixel, place_clip, video_asset, ColorDecoder};
use montage_audio::ManualClock;
use montage_media::{FetchMode, PipelineConfig};
use montage_render::{
    Compositor, ManualScheduler, OffscreenSurface, PipelineSet, PreviewEvent, PreviewRenderer,
    PreviewState,
};
use montage_timeline::{Easing, Sequence, TransitionKind, TransitionSpec};
use std::sync::Arc;

const RED: [u8; 4] = [200, 0, 0, 255];
const BLUE: [u8; 4] = [0, 0, 200, 255];

/// clip1 (red) on [0, 5), clip2 (blue) on [5, 9).
fn two_clip_setup() -> (Sequence, PipelineSet) {
    let mut seq = Sequence::default();
    let asset_red = video_asset(1, 10.0);
    let asset_blue = video_asset(2, 10.0);
    place_clip(&mut seq, asset_red.id, 0.0, 5.0);
    place_clip(&mut seq, asset_blue.id, 5.0, 4.0);

    let mut pipelines = PipelineSet::new();
    pipelines
        .open_asset(
            &asset_red,
            Box::new(ColorDecoder::new(10.0, RED)),
            PipelineConfig::default(),
        )
        .unwrap();
    pipelines
        .open_asset(
            &asset_blue,
            Box::new(ColorDecoder::new(10.0, BLUE)),
            PipelineConfig::default(),
        )
        .unwrap();
    (seq, pipelines)
}

#[test]
fn boundary_frame_is_exclusively_the_second_clip() {
    let (seq, mut pipelines) = two_clip_setup();
    let compositor = Compositor::new(64, 64);
    // At exactly t = 5.0 the first clip has ended; the frame must be
    // clip2's first frame, not clip1's last.
    let out = compositor.composite(&seq, &mut pipelines, 5.0, FetchMode::Playback);
    assert_eq!(out.drawn_layers, 1);
    assert_eq!(center_pixel(&out.frame), [0, 0, 200]);

    let just_before = compositor.composite(&seq, &mut pipelines, 4.99, FetchMode::Playback);
    assert_eq!(center_pixel(&just_before.frame), [200, 0, 0]);
}

#[test]
fn transition_composites_a_consistent_pair() {
    let (mut seq, mut pipelines) = two_clip_setup();
    seq.tracks[0].clips[1].transitions.push(TransitionSpec::new(
        TransitionKind::Crossfade,
        1.0,
        Easing::Linear,
    ));
    let compositor = Compositor::new(64, 64);

    let early = compositor.composite(&seq, &mut pipelines, 5.1, FetchMode::Playback);
    let [r_early, _, b_early] = center_pixel(&early.frame);
    let late = compositor.composite(&seq, &mut pipelines, 5.9, FetchMode::Playback);
    let [r_late, _, b_late] = center_pixel(&late.frame);
    // Red recedes and blue advances across the window.
    assert!(r_early > b_early);
    assert!(b_late > r_late);

    // Outside the window, pure blue.
    let after = compositor.composite(&seq, &mut pipelines, 6.5, FetchMode::Playback);
    assert_eq!(center_pixel(&after.frame), [0, 0, 200]);
}

#[test]
fn preview_loop_plays_through_the_cut() {
    let (seq, pipelines) = two_clip_setup();
    let clock = ManualClock::new();
    let scheduler = ManualScheduler::new();
    let handle = scheduler.handle();
    let mut preview = PreviewRenderer::new(Box::new(scheduler), Arc::new(clock.clone()));
    preview.set_sequence(seq);
    *preview.pipelines_mut() = pipelines;
    preview.attach(Box::new(OffscreenSurface::new())).unwrap();

    preview.seek(4.5).unwrap();
    preview.play().unwrap();
    assert_eq!(preview.state(), PreviewState::Playing);

    // Drive the loop across the clip boundary the way a host would.
    for _ in 0..8 {
        if handle.take() {
            clock.advance(0.1);
            preview.tick().unwrap();
        }
    }
    assert!(preview.current_time() > 5.0);

    let events = preview.events();
    let times: Vec<f64> = events
        .try_iter()
        .filter_map(|e| match e {
            PreviewEvent::Time { time_sec } => Some(time_sec),
            _ => None,
        })
        .collect();
    assert!(times.len() >= 2);
    assert!(times.windows(2).all(|w| w[1] >= w[0]));
}

#[test]
fn preview_survives_an_asset_that_never_opens() {
    let mut seq = Sequence::default();
    let good = video_asset(1, 10.0);
    let bad = video_asset(2, 10.0);
    place_clip(&mut seq, good.id, 0.0, 5.0);
    place_clip(&mut seq, bad.id, 5.0, 4.0);

    let clock = ManualClock::new();
    let mut preview = PreviewRenderer::new(
        Box::new(ManualScheduler::new()),
        Arc::new(clock),
    );
    preview.set_sequence(seq);

    let mut assets = std::collections::HashMap::new();
    let bad_id = bad.id;
    assets.insert(good.id, good);
    assets.insert(bad.id, bad);
    // Every location of the second asset fails to probe; the factory hands
    // out a failing decoder on its second call.
    let opened = std::sync::atomic::AtomicUsize::new(0);
    preview.open_assets_best_effort(&assets, &move || {
        let mut decoder = ColorDecoder::new(10.0, RED);
        decoder.fail = opened.fetch_add(1, std::sync::atomic::Ordering::SeqCst) > 0;
        Box::new(decoder)
    });
    assert_eq!(preview.pipelines_mut().len(), 1);
    assert!(!preview.pipelines_mut().contains(bad_id));

    preview.attach(Box::new(OffscreenSurface::new())).unwrap();
    preview.seek(1.0).unwrap();
    // Playback proceeds best-effort rather than hanging on the broken asset.
    preview.play().unwrap();
    assert_eq!(preview.state(), PreviewState::Playing);
}

#[test]
fn scrub_uses_wider_tolerance_than_playback() {
    let (_, mut pipelines) = two_clip_setup();
    let asset_id = uuid::Uuid::from_u128(1);
    let pipeline = pipelines.pipeline_mut(asset_id).unwrap();
    let _ = pipeline.frame_at(2.0, FetchMode::Playback).unwrap();
    // Both modes resolve; the distinction is exercised at the cache level
    // in montage-media. Here we only assert the seam accepts both.
    assert!(pipeline.frame_at(2.05, FetchMode::Scrub).unwrap().is_some());
    assert!(pipeline
        .frame_at(2.05, FetchMode::Playback)
        .unwrap()
        .is_some());
}
