//! Cross-crate tests for the timeline model and command engine.

use crate::support::{place_clip, video_asset};
use montage_timeline::{
    command, Clip, ClipKind, EditCommand, History, RippleScope, Sequence,
};
use uuid::Uuid;

fn sequence_with_clips(spans: &[(f64, f64)]) -> (Sequence, Vec<Uuid>) {
    let mut seq = Sequence::default();
    let asset = video_asset(1, 10.0);
    let ids = spans
        .iter()
        .map(|&(start, duration)| place_clip(&mut seq, asset.id, start, duration))
        .collect();
    (seq, ids)
}

#[test]
fn execute_then_undo_restores_structural_equality() {
    let (mut seq, ids) = sequence_with_clips(&[(0.0, 5.0), (5.0, 4.0)]);
    let mut history = History::default();
    let before = seq.clone();

    let commands = vec![
        EditCommand::MoveClip {
            clip_id: ids[1],
            target_track_id: seq.tracks[0].id,
            new_start_sec: 20.0,
            prev: None,
        },
        EditCommand::TrimClip {
            clip_id: ids[0],
            start_delta_sec: 0.5,
            end_delta_sec: 0.0,
            prev: None,
        },
        EditCommand::SplitClip {
            clip_id: ids[0],
            split_time_sec: 2.0,
            state: None,
        },
    ];
    for command in commands {
        history.execute(&mut seq, command).unwrap();
    }
    for _ in 0..3 {
        assert!(history.undo(&mut seq));
    }
    assert_eq!(before, seq);
}

#[test]
fn duration_is_rederived_after_every_command() {
    let (mut seq, ids) = sequence_with_clips(&[(0.0, 5.0), (5.0, 4.0)]);
    let mut history = History::default();
    assert!((seq.duration_sec - 9.0).abs() < 1e-9);

    history
        .execute(
            &mut seq,
            EditCommand::MoveClip {
                clip_id: ids[1],
                target_track_id: seq.tracks[0].id,
                new_start_sec: 12.0,
                prev: None,
            },
        )
        .unwrap();
    assert!((seq.duration_sec - 16.0).abs() < 1e-9);

    history.undo(&mut seq);
    assert!((seq.duration_sec - 9.0).abs() < 1e-9);
}

#[test]
fn clips_stay_sorted_after_moves() {
    let (mut seq, ids) = sequence_with_clips(&[(0.0, 2.0), (3.0, 2.0), (6.0, 2.0)]);
    let mut history = History::default();
    history
        .execute(
            &mut seq,
            EditCommand::MoveClip {
                clip_id: ids[0],
                target_track_id: seq.tracks[0].id,
                new_start_sec: 10.0,
                prev: None,
            },
        )
        .unwrap();
    let starts: Vec<f64> = seq.tracks[0].clips.iter().map(|c| c.start_sec).collect();
    let mut sorted = starts.clone();
    sorted.sort_by(f64::total_cmp);
    assert_eq!(starts, sorted);
}

#[test]
fn split_produces_two_pieces_meeting_at_the_cut() {
    let (mut seq, ids) = sequence_with_clips(&[(1.0, 6.0)]);
    let mut history = History::default();
    history
        .execute(
            &mut seq,
            EditCommand::SplitClip {
                clip_id: ids[0],
                split_time_sec: 4.0,
                state: None,
            },
        )
        .unwrap();
    let clips = &seq.tracks[0].clips;
    assert_eq!(clips.len(), 2);
    assert!((clips[0].end_sec() - 4.0).abs() < 1e-9);
    assert!((clips[1].start_sec - 4.0).abs() < 1e-9);
    assert!((clips[0].duration_sec + clips[1].duration_sec - 6.0).abs() < 1e-9);
}

#[test]
fn split_rejects_cuts_near_boundaries() {
    let (mut seq, ids) = sequence_with_clips(&[(1.0, 6.0)]);
    let mut history = History::default();
    for t in [1.005, 6.995, 0.5, 8.0] {
        let result = history.execute(
            &mut seq,
            EditCommand::SplitClip {
                clip_id: ids[0],
                split_time_sec: t,
                state: None,
            },
        );
        assert!(result.is_err(), "split at {t} should be rejected");
    }
    assert_eq!(seq.tracks[0].clips.len(), 1);
}

#[test]
fn split_keeps_effects_on_left_piece_only() {
    let (mut seq, ids) = sequence_with_clips(&[(0.0, 6.0)]);
    seq.find_clip_mut(ids[0]).unwrap().effects.push(
        montage_timeline::Effect::with_amount(montage_timeline::EffectKind::Blur, 0.5),
    );
    let mut history = History::default();
    history
        .execute(
            &mut seq,
            EditCommand::SplitClip {
                clip_id: ids[0],
                split_time_sec: 3.0,
                state: None,
            },
        )
        .unwrap();
    let clips = &seq.tracks[0].clips;
    assert_eq!(clips[0].effects.len(), 1);
    assert!(clips[1].effects.is_empty());
}

#[test]
fn ripple_delete_closes_the_gap_exactly() {
    let (mut seq, ids) = sequence_with_clips(&[(0.0, 3.0), (3.0, 2.0), (5.0, 4.0)]);
    let mut history = History::default();
    history
        .execute(
            &mut seq,
            EditCommand::RippleDeleteClip {
                clip_id: ids[1],
                scope: RippleScope::SingleTrack,
                removed: None,
                shifted: Vec::new(),
            },
        )
        .unwrap();
    let clips = &seq.tracks[0].clips;
    assert_eq!(clips.len(), 2);
    // The later clip shifted left by exactly the deleted duration.
    assert!((clips[1].start_sec - 3.0).abs() < 1e-9);
    assert!((seq.duration_sec - 7.0).abs() < 1e-9);
    // No overlap remains.
    assert!(clips[0].end_sec() <= clips[1].start_sec + 1e-9);
}

#[test]
fn ripple_skips_locked_tracks() {
    let (mut seq, ids) = sequence_with_clips(&[(0.0, 3.0), (3.0, 2.0)]);
    // Second video track with a clip that must not move.
    let mut other = montage_timeline::Track::new("V2", montage_timeline::TrackKind::Video, 1);
    other.locked = true;
    let other_id = other.id;
    let mut parked = Clip::new(Uuid::from_u128(9), other_id, ClipKind::Video, 5.0, 10.0);
    parked.duration_sec = 2.0;
    other.clips.push(parked);
    seq.tracks.push(other);
    seq.normalize();

    let mut history = History::default();
    history
        .execute(
            &mut seq,
            EditCommand::RippleDeleteClip {
                clip_id: ids[0],
                scope: RippleScope::AllTracks,
                removed: None,
                shifted: Vec::new(),
            },
        )
        .unwrap();
    let locked_track = seq.tracks.iter().find(|t| t.id == other_id).unwrap();
    assert!((locked_track.clips[0].start_sec - 5.0).abs() < 1e-9);
}

#[test]
fn slip_preserves_position_and_duration() {
    let (mut seq, ids) = sequence_with_clips(&[(2.0, 4.0)]);
    {
        let clip = seq.find_clip_mut(ids[0]).unwrap();
        clip.trim_start_sec = 1.0;
        clip.trim_end_sec = 5.0;
    }
    let mut history = History::default();
    history
        .execute(
            &mut seq,
            EditCommand::SlipClip {
                clip_id: ids[0],
                delta_sec: 2.0,
                prev: None,
            },
        )
        .unwrap();
    let (_, clip) = seq.find_clip(ids[0]).unwrap();
    assert!((clip.start_sec - 2.0).abs() < 1e-9);
    assert!((clip.duration_sec - 4.0).abs() < 1e-9);
    assert!((clip.trim_start_sec - 3.0).abs() < 1e-9);
}

#[test]
fn slide_preserves_the_gap_to_the_neighbor() {
    let (mut seq, ids) = sequence_with_clips(&[(0.0, 2.0), (3.0, 2.0), (6.0, 2.0)]);
    let mut history = History::default();
    history
        .execute(
            &mut seq,
            EditCommand::SlideClip {
                clip_id: ids[1],
                delta_sec: 1.0,
                prev_start: None,
                neighbor: None,
            },
        )
        .unwrap();
    let (_, moved) = seq.find_clip(ids[1]).unwrap();
    let (_, next) = seq.find_clip(ids[2]).unwrap();
    assert!((moved.start_sec - 4.0).abs() < 1e-9);
    // Gap between moved and next was 1.0 before and stays 1.0.
    assert!((next.start_sec - moved.end_sec() - 1.0).abs() < 1e-9);
}

#[test]
fn batch_failure_rolls_back_applied_prefix() {
    let (mut seq, ids) = sequence_with_clips(&[(0.0, 2.0), (5.0, 2.0)]);
    let before = seq.clone();
    let mut history = History::default();
    let batch = EditCommand::Batch {
        description: "Move both".into(),
        commands: vec![
            EditCommand::MoveClip {
                clip_id: ids[0],
                target_track_id: seq.tracks[0].id,
                new_start_sec: 10.0,
                prev: None,
            },
            EditCommand::MoveClip {
                clip_id: Uuid::from_u128(404),
                target_track_id: seq.tracks[0].id,
                new_start_sec: 12.0,
                prev: None,
            },
        ],
    };
    assert!(history.execute(&mut seq, batch).is_err());
    assert_eq!(before, seq);
    assert!(!history.can_undo());
}

#[test]
fn batch_duplicate_roundtrips_through_undo() {
    let (mut seq, ids) = sequence_with_clips(&[(0.0, 2.0), (2.0, 2.0)]);
    let before = seq.clone();
    let mut history = History::default();
    let duplicate = command::batch_duplicate(&seq, &[ids[0], ids[1]], 10.0).unwrap();
    history.execute(&mut seq, duplicate).unwrap();
    assert_eq!(seq.tracks[0].clips.len(), 4);
    assert!(history.undo(&mut seq));
    assert_eq!(before, seq);
}

#[test]
fn batch_move_and_delete_are_single_history_entries() {
    let (mut seq, ids) = sequence_with_clips(&[(0.0, 2.0), (3.0, 2.0), (6.0, 2.0)]);
    let mut history = History::default();
    let track_id = seq.tracks[0].id;

    let moves = command::batch_move(&[(ids[0], track_id, 10.0), (ids[1], track_id, 13.0)]);
    history.execute(&mut seq, moves).unwrap();
    assert!((seq.find_clip(ids[0]).unwrap().1.start_sec - 10.0).abs() < 1e-9);
    assert!((seq.find_clip(ids[1]).unwrap().1.start_sec - 13.0).abs() < 1e-9);

    let delete = command::batch_delete(&[ids[0], ids[2]]);
    history.execute(&mut seq, delete).unwrap();
    assert_eq!(seq.tracks[0].clips.len(), 1);

    // Each batch undoes as one unit.
    assert!(history.undo(&mut seq));
    assert_eq!(seq.tracks[0].clips.len(), 3);
    assert!(history.undo(&mut seq));
    assert!((seq.find_clip(ids[0]).unwrap().1.start_sec - 0.0).abs() < 1e-9);
    assert!(!history.can_undo());
}

#[test]
fn redo_on_empty_stack_is_a_noop() {
    let (mut seq, _) = sequence_with_clips(&[(0.0, 2.0)]);
    let before = seq.clone();
    let mut history = History::default();
    assert!(!history.redo(&mut seq));
    assert_eq!(before, seq);
}

#[test]
fn video_track_rejects_overlapping_placement() {
    let (mut seq, _) = sequence_with_clips(&[(0.0, 5.0)]);
    let mut history = History::default();
    let track_id = seq.tracks[0].id;
    let mut intruder = Clip::new(Uuid::from_u128(2), track_id, ClipKind::Video, 2.0, 10.0);
    intruder.duration_sec = 4.0;
    let result = history.execute(
        &mut seq,
        EditCommand::UpsertClip {
            clip: intruder,
            replaced: None,
        },
    );
    assert!(result.is_err());
    assert_eq!(seq.tracks[0].clips.len(), 1);
}

#[test]
fn committed_edit_emits_a_fresh_snapshot() {
    let mut project = montage_timeline::Project::new("Demo");
    project.add_asset(video_asset(1, 10.0));
    let asset_id = Uuid::from_u128(1);
    let seq = project.active_sequence_mut().unwrap();
    place_clip(seq, asset_id, 0.0, 5.0);

    let first = project.commit_snapshot().unwrap();
    std::thread::sleep(std::time::Duration::from_millis(5));
    let second = project.commit_snapshot().unwrap();
    let a: serde_json::Value = serde_json::from_str(&first).unwrap();
    let b: serde_json::Value = serde_json::from_str(&second).unwrap();
    assert!(b["updated_at_ms"].as_u64() >= a["updated_at_ms"].as_u64());
}

#[test]
fn history_entries_serialize_for_persistence() {
    let (mut seq, ids) = sequence_with_clips(&[(0.0, 4.0)]);
    let mut history = History::default();
    history
        .execute(
            &mut seq,
            EditCommand::SplitClip {
                clip_id: ids[0],
                split_time_sec: 2.0,
                state: None,
            },
        )
        .unwrap();
    assert_eq!(history.undo_labels(), ["Split clip"]);
}
