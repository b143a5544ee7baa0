//! Audio gain policy and scheduling against the shared clock.

use montage_audio::{
    AudioClipSpec, AudioScheduler, ManualClock, MixerGraph, RingBuffer, TrackGain,
};
use std::sync::Arc;
use uuid::Uuid;

#[test]
fn solo_on_one_track_silences_the_other() {
    // A(muted=false, solo=false), B(solo=true) -> A gains 0, B plays at
    // its own volume.
    let mut mixer = MixerGraph::new(2, 4096);
    mixer.set_volume(0, 0.9);
    mixer.set_volume(1, 0.6);
    mixer.set_solo(1, true);
    assert_eq!(mixer.effective_gain(0), 0.0);
    assert!((mixer.effective_gain(1) - 0.6).abs() < 1e-6);

    // Releasing solo restores A.
    mixer.set_solo(1, false);
    assert!((mixer.effective_gain(0) - 0.9).abs() < 1e-6);
}

#[test]
fn gain_policy_recomputes_on_any_track_change() {
    let mut mixer = MixerGraph::new(3, 4096);
    mixer.set_solo(2, true);
    assert_eq!(mixer.effective_gain(0), 0.0);
    assert_eq!(mixer.effective_gain(1), 0.0);
    // Muting the soloed track silences it too (mute wins).
    mixer.set_muted(2, true);
    assert_eq!(mixer.effective_gain(2), 0.0);
}

#[test]
fn play_pause_seek_preserve_state_end_to_end() {
    let clock = ManualClock::new();
    let mut scheduler = AudioScheduler::new(Arc::new(clock.clone()));
    scheduler.set_program(vec![AudioClipSpec {
        clip_id: Uuid::from_u128(1),
        track: 0,
        start_sec: 0.0,
        duration_sec: 6.0,
        trim_start_sec: 0.25,
        volume: 1.0,
    }]);

    scheduler.play(1.0);
    let source = &scheduler.active_sources()[0];
    assert!((source.source_offset_sec - 1.25).abs() < 1e-9);

    clock.advance(2.0);
    scheduler.pause();
    assert!(!scheduler.is_playing());
    assert!((scheduler.current_time() - 3.0).abs() < 1e-9);
    assert!(scheduler.active_sources().is_empty());

    // Paused seek moves only the cursor; resuming schedules from there.
    scheduler.seek(5.0);
    assert!(scheduler.active_sources().is_empty());
    scheduler.play(scheduler.current_time());
    assert!((scheduler.active_sources()[0].source_offset_sec - 5.25).abs() < 1e-9);
    assert!((scheduler.active_sources()[0].remaining_sec - 1.0).abs() < 1e-9);
}

#[test]
fn mixed_output_reflects_track_and_master_stages() {
    let mut mixer = MixerGraph::new(2, 4096);
    mixer.set_volume(0, 0.5);
    mixer.set_volume(1, 0.25);
    mixer.set_master_volume(0.8);
    let a = vec![1.0f32; 8];
    let b = vec![1.0f32; 8];
    mixer.mix(&[&a, &b], 4);
    let mut out = vec![0.0f32; 8];
    assert_eq!(mixer.output.read(&mut out), 8);
    // (1.0 * 0.5 + 1.0 * 0.25) * 0.8
    for sample in &out {
        assert!((sample - 0.6).abs() < 1e-6);
    }
}

#[test]
fn ring_buffer_bridges_mixer_and_callback() {
    let ring = Arc::new(RingBuffer::new(64));
    assert_eq!(ring.write(&[0.5; 16]), 16);
    let mut out = [0.0f32; 8];
    assert_eq!(ring.read(&mut out), 8);
    assert!(out.iter().all(|&s| (s - 0.5).abs() < 1e-6));
    // Underrun reads return short counts, never an error.
    let mut big = [0.0f32; 32];
    assert_eq!(ring.read(&mut big), 8);
}
