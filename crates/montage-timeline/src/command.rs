//! Reversible edit commands.
//!
//! Every mutation of the timeline model is an [`EditCommand`] that knows how
//! to apply itself to a sequence and how to undo itself from the minimal
//! before-state it captured during apply. Commands never touch caches or
//! renderers; a failed apply leaves the sequence unchanged.

use crate::clip::Clip;
use crate::project::Sequence;
use crate::track::{Track, TrackKind};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Splits closer than this to either clip boundary are rejected.
pub const SPLIT_EPSILON_SEC: f64 = 0.010;

/// No edit may leave a clip shorter than this.
pub const MIN_CLIP_DURATION_SEC: f64 = 0.100;

/// How far a ripple edit reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RippleScope {
    /// Shift later clips on the edited clip's track only.
    SingleTrack,
    /// Shift later clips on every unlocked track.
    AllTracks,
}

/// Why a command was rejected. The sequence is unchanged in every case.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CommandError {
    #[error("clip not found: {0}")]
    ClipNotFound(Uuid),
    #[error("track not found: {0}")]
    TrackNotFound(Uuid),
    #[error("track is locked")]
    TrackLocked,
    #[error("edit would overlap another clip")]
    Overlap,
    #[error("invalid edit: {0}")]
    InvalidEdit(String),
}

type CommandResult = Result<(), CommandError>;

fn invalid(msg: impl Into<String>) -> CommandError {
    CommandError::InvalidEdit(msg.into())
}

/// Whether a track kind can host a clip kind.
fn track_accepts(track: &Track, clip: &Clip) -> bool {
    match track.kind {
        TrackKind::Audio => clip.kind == crate::clip::ClipKind::Audio,
        TrackKind::Video | TrackKind::Overlay | TrackKind::Fx => {
            clip.kind != crate::clip::ClipKind::Audio
        }
    }
}

/// A reversible edit. Fields named `prev`, `removed`, `shifted`, or `state`
/// hold the minimal before-state captured during apply; they are `None`
/// (or empty) until the command has executed once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EditCommand {
    /// Insert a clip, or replace the clip with the same id.
    UpsertClip {
        clip: Clip,
        replaced: Option<Clip>,
    },
    /// Move a clip to a new start, possibly on another track.
    MoveClip {
        clip_id: Uuid,
        target_track_id: Uuid,
        new_start_sec: f64,
        prev: Option<(Uuid, f64)>,
    },
    /// Adjust trim-in/trim-out; timeline start stays put, duration shrinks
    /// by the sum of the deltas.
    TrimClip {
        clip_id: Uuid,
        start_delta_sec: f64,
        end_delta_sec: f64,
        prev: Option<TrimState>,
    },
    /// Change the out point by `delta_sec` and shift every later clip on
    /// the affected track(s) by the same amount.
    RippleTrim {
        clip_id: Uuid,
        delta_sec: f64,
        scope: RippleScope,
        prev: Option<TrimState>,
        shifted: Vec<(Uuid, f64)>,
    },
    /// Shift the source window without moving the clip on the timeline.
    SlipClip {
        clip_id: Uuid,
        delta_sec: f64,
        prev: Option<TrimState>,
    },
    /// Move the cut between a clip and its next adjacent neighbor; the
    /// combined duration of the pair is unchanged.
    RollEdit {
        clip_id: Uuid,
        delta_sec: f64,
        state: Option<RollState>,
    },
    /// Move a clip while shifting the adjacent clip to keep their gap.
    SlideClip {
        clip_id: Uuid,
        delta_sec: f64,
        prev_start: Option<f64>,
        neighbor: Option<(Uuid, f64)>,
    },
    /// Split a clip at an absolute timeline time.
    SplitClip {
        clip_id: Uuid,
        split_time_sec: f64,
        state: Option<SplitState>,
    },
    /// Remove a clip, leaving the gap in place.
    DeleteClip {
        clip_id: Uuid,
        removed: Option<(Uuid, Clip)>,
    },
    /// Remove a clip and close the gap by shifting later clips left.
    RippleDeleteClip {
        clip_id: Uuid,
        scope: RippleScope,
        removed: Option<(Uuid, Clip)>,
        shifted: Vec<(Uuid, f64)>,
    },
    /// Append a track.
    AddTrack { track: Track },
    /// Remove a track and everything on it.
    RemoveTrack {
        track_id: Uuid,
        removed: Option<(usize, Track)>,
    },
    /// Replace a track wholesale (flags, volume, rank, clips).
    UpdateTrack {
        track: Track,
        prev: Option<Track>,
    },
    /// N commands applied as one atomic unit. On mid-batch failure the
    /// already-applied prefix is undone in reverse order before reporting.
    Batch {
        description: String,
        commands: Vec<EditCommand>,
    },
}

/// Captured trim geometry for undo.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrimState {
    pub trim_start_sec: f64,
    pub trim_end_sec: f64,
    pub duration_sec: f64,
}

impl TrimState {
    fn of(clip: &Clip) -> Self {
        Self {
            trim_start_sec: clip.trim_start_sec,
            trim_end_sec: clip.trim_end_sec,
            duration_sec: clip.duration_sec,
        }
    }

    fn restore(self, clip: &mut Clip) {
        clip.trim_start_sec = self.trim_start_sec;
        clip.trim_end_sec = self.trim_end_sec;
        clip.duration_sec = self.duration_sec;
    }
}

/// Captured split bookkeeping for undo.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SplitState {
    pub prev_duration_sec: f64,
    pub prev_trim_end_sec: f64,
    pub right_id: Uuid,
}

/// Captured geometry of both sides of a rolled cut.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RollState {
    pub left: TrimState,
    pub right: TrimState,
    pub right_id: Uuid,
    pub right_start_sec: f64,
}

impl EditCommand {
    /// Short human description for history display.
    pub fn describe(&self) -> String {
        match self {
            Self::UpsertClip { .. } => "Place clip".into(),
            Self::MoveClip { .. } => "Move clip".into(),
            Self::TrimClip { .. } => "Trim clip".into(),
            Self::RippleTrim { .. } => "Ripple trim".into(),
            Self::SlipClip { .. } => "Slip clip".into(),
            Self::RollEdit { .. } => "Roll edit".into(),
            Self::SlideClip { .. } => "Slide clip".into(),
            Self::SplitClip { .. } => "Split clip".into(),
            Self::DeleteClip { .. } => "Delete clip".into(),
            Self::RippleDeleteClip { .. } => "Ripple delete".into(),
            Self::AddTrack { .. } => "Add track".into(),
            Self::RemoveTrack { .. } => "Remove track".into(),
            Self::UpdateTrack { .. } => "Update track".into(),
            Self::Batch { description, .. } => description.clone(),
        }
    }

    /// Apply this command. On failure the sequence is left unchanged.
    pub fn apply(&mut self, seq: &mut Sequence) -> CommandResult {
        let result = self.apply_inner(seq);
        if result.is_ok() {
            seq.normalize();
        }
        result
    }

    /// Undo this command using the before-state captured by `apply`.
    pub fn undo(&mut self, seq: &mut Sequence) -> CommandResult {
        let result = self.undo_inner(seq);
        if result.is_ok() {
            seq.normalize();
        }
        result
    }

    fn apply_inner(&mut self, seq: &mut Sequence) -> CommandResult {
        match self {
            Self::UpsertClip { clip, replaced } => {
                if !clip.is_valid() {
                    return Err(invalid("clip violates duration/trim invariants"));
                }
                let track = seq
                    .find_track(clip.track_id)
                    .ok_or(CommandError::TrackNotFound(clip.track_id))?;
                if track.locked {
                    return Err(CommandError::TrackLocked);
                }
                if !track_accepts(track, clip) {
                    return Err(invalid("clip kind does not match track kind"));
                }
                if track.would_overlap(clip, Some(clip.id)) {
                    return Err(CommandError::Overlap);
                }
                let clip_id = clip.id;
                let clip_clone = clip.clone();
                let track = seq
                    .find_track_mut(clip.track_id)
                    .ok_or(CommandError::TrackNotFound(clip.track_id))?;
                if let Some(existing) = track.find_clip_mut(clip_id) {
                    *replaced = Some(existing.clone());
                    *existing = clip_clone;
                } else {
                    *replaced = None;
                    track.clips.push(clip_clone);
                }
                Ok(())
            }

            Self::MoveClip {
                clip_id,
                target_track_id,
                new_start_sec,
                prev,
            } => {
                if *new_start_sec < 0.0 {
                    return Err(invalid("clip start cannot be negative"));
                }
                let (src_track, clip) = seq
                    .find_clip(*clip_id)
                    .ok_or(CommandError::ClipNotFound(*clip_id))?;
                if src_track.locked {
                    return Err(CommandError::TrackLocked);
                }
                let src_track_id = src_track.id;
                let old_start = clip.start_sec;
                let mut candidate = clip.clone();
                candidate.track_id = *target_track_id;
                candidate.start_sec = *new_start_sec;

                let target = seq
                    .find_track(*target_track_id)
                    .ok_or(CommandError::TrackNotFound(*target_track_id))?;
                if target.locked {
                    return Err(CommandError::TrackLocked);
                }
                if !track_accepts(target, &candidate) {
                    return Err(invalid("clip kind does not match track kind"));
                }
                if target.would_overlap(&candidate, Some(*clip_id)) {
                    return Err(CommandError::Overlap);
                }

                detach_clip(seq, src_track_id, *clip_id)
                    .ok_or(CommandError::ClipNotFound(*clip_id))?;
                let target = seq
                    .find_track_mut(*target_track_id)
                    .ok_or(CommandError::TrackNotFound(*target_track_id))?;
                target.clips.push(candidate);
                *prev = Some((src_track_id, old_start));
                Ok(())
            }

            Self::TrimClip {
                clip_id,
                start_delta_sec,
                end_delta_sec,
                prev,
            } => {
                let (track, clip) = seq
                    .find_clip(*clip_id)
                    .ok_or(CommandError::ClipNotFound(*clip_id))?;
                if track.locked {
                    return Err(CommandError::TrackLocked);
                }
                let state = TrimState::of(clip);
                let new_duration = state.duration_sec - start_delta_sec - end_delta_sec;
                let new_trim_start = state.trim_start_sec + *start_delta_sec;
                let new_trim_end = state.trim_end_sec + *end_delta_sec;
                if new_duration < MIN_CLIP_DURATION_SEC {
                    return Err(invalid("trim would leave clip too short"));
                }
                if new_trim_start < 0.0 || new_trim_end < 0.0 {
                    return Err(invalid("trim cannot be negative"));
                }
                let clip = seq
                    .find_clip_mut(*clip_id)
                    .ok_or(CommandError::ClipNotFound(*clip_id))?;
                clip.trim_start_sec = new_trim_start;
                clip.trim_end_sec = new_trim_end;
                clip.duration_sec = new_duration;
                if !clip.is_valid() {
                    state.restore(clip);
                    return Err(invalid("trim exceeds source bounds"));
                }
                *prev = Some(state);
                Ok(())
            }

            Self::RippleTrim {
                clip_id,
                delta_sec,
                scope,
                prev,
                shifted,
            } => {
                let (track, clip) = seq
                    .find_clip(*clip_id)
                    .ok_or(CommandError::ClipNotFound(*clip_id))?;
                if track.locked {
                    return Err(CommandError::TrackLocked);
                }
                let home_track_id = track.id;
                let anchor = clip.start_sec;
                let state = TrimState::of(clip);
                let new_duration = state.duration_sec + *delta_sec;
                let new_trim_end = state.trim_end_sec - *delta_sec;
                if new_duration < MIN_CLIP_DURATION_SEC {
                    return Err(invalid("ripple trim would leave clip too short"));
                }
                if new_trim_end < 0.0 {
                    return Err(invalid("ripple trim exceeds source length"));
                }

                let clip = seq
                    .find_clip_mut(*clip_id)
                    .ok_or(CommandError::ClipNotFound(*clip_id))?;
                clip.duration_sec = new_duration;
                clip.trim_end_sec = new_trim_end;
                if !clip.is_valid() {
                    state.restore(clip);
                    return Err(invalid("ripple trim exceeds source bounds"));
                }

                *shifted = shift_later_clips(seq, home_track_id, *scope, anchor, *clip_id, *delta_sec);
                *prev = Some(state);
                Ok(())
            }

            Self::SlipClip {
                clip_id,
                delta_sec,
                prev,
            } => {
                let (track, clip) = seq
                    .find_clip(*clip_id)
                    .ok_or(CommandError::ClipNotFound(*clip_id))?;
                if track.locked {
                    return Err(CommandError::TrackLocked);
                }
                let state = TrimState::of(clip);
                // Clamp the slip so the source window stays inside the media.
                let max_slip = clip.source_duration_sec - clip.duration_sec - clip.trim_start_sec;
                let min_slip = -clip.trim_start_sec;
                let actual = delta_sec.clamp(min_slip, max_slip.max(min_slip));
                let clip = seq
                    .find_clip_mut(*clip_id)
                    .ok_or(CommandError::ClipNotFound(*clip_id))?;
                clip.trim_start_sec += actual;
                clip.trim_end_sec =
                    (clip.source_duration_sec - clip.trim_start_sec - clip.duration_sec).max(0.0);
                *prev = Some(state);
                Ok(())
            }

            Self::RollEdit {
                clip_id,
                delta_sec,
                state,
            } => {
                let (track, left) = seq
                    .find_clip(*clip_id)
                    .ok_or(CommandError::ClipNotFound(*clip_id))?;
                if track.locked {
                    return Err(CommandError::TrackLocked);
                }
                let left_end = left.end_sec();
                let right = track
                    .clips
                    .iter()
                    .find(|c| c.id != *clip_id && (c.start_sec - left_end).abs() < 1e-6)
                    .ok_or_else(|| invalid("no adjacent clip to roll against"))?;

                let left_state = TrimState::of(left);
                let right_state = TrimState::of(right);
                let right_id = right.id;
                let right_start = right.start_sec;
                let delta = *delta_sec;

                let new_left_duration = left_state.duration_sec + delta;
                let new_right_duration = right_state.duration_sec - delta;
                if new_left_duration < MIN_CLIP_DURATION_SEC
                    || new_right_duration < MIN_CLIP_DURATION_SEC
                {
                    return Err(invalid("roll would leave a clip too short"));
                }
                if left_state.trim_end_sec - delta < 0.0 {
                    return Err(invalid("roll exceeds the outgoing clip's source"));
                }
                if right_state.trim_start_sec + delta < 0.0 {
                    return Err(invalid("roll exceeds the incoming clip's source"));
                }

                {
                    let left = seq
                        .find_clip_mut(*clip_id)
                        .ok_or(CommandError::ClipNotFound(*clip_id))?;
                    left.duration_sec = new_left_duration;
                    left.trim_end_sec = left_state.trim_end_sec - delta;
                    if !left.is_valid() {
                        left_state.restore(left);
                        return Err(invalid("roll exceeds source bounds"));
                    }
                }
                {
                    let right = seq
                        .find_clip_mut(right_id)
                        .ok_or(CommandError::ClipNotFound(right_id))?;
                    right.start_sec = right_start + delta;
                    right.duration_sec = new_right_duration;
                    right.trim_start_sec = right_state.trim_start_sec + delta;
                    if !right.is_valid() {
                        right_state.restore(right);
                        right.start_sec = right_start;
                        let left = seq
                            .find_clip_mut(*clip_id)
                            .ok_or(CommandError::ClipNotFound(*clip_id))?;
                        left_state.restore(left);
                        return Err(invalid("roll exceeds source bounds"));
                    }
                }

                *state = Some(RollState {
                    left: left_state,
                    right: right_state,
                    right_id,
                    right_start_sec: right_start,
                });
                Ok(())
            }

            Self::SlideClip {
                clip_id,
                delta_sec,
                prev_start,
                neighbor,
            } => {
                let (track, clip) = seq
                    .find_clip(*clip_id)
                    .ok_or(CommandError::ClipNotFound(*clip_id))?;
                if track.locked {
                    return Err(CommandError::TrackLocked);
                }
                let track_id = track.id;
                let old_start = clip.start_sec;
                let new_start = old_start + *delta_sec;
                if new_start < 0.0 {
                    return Err(invalid("slide would move clip before zero"));
                }
                let clip_snapshot = clip.clone();

                // The neighbor in the direction of motion keeps its gap.
                let track_ref = seq
                    .find_track(track_id)
                    .ok_or(CommandError::TrackNotFound(track_id))?;
                let adjacent = if *delta_sec < 0.0 {
                    track_ref
                        .clips
                        .iter()
                        .filter(|c| c.id != *clip_id && c.start_sec < clip_snapshot.start_sec)
                        .max_by(|a, b| a.start_sec.total_cmp(&b.start_sec))
                } else {
                    track_ref
                        .clips
                        .iter()
                        .filter(|c| c.id != *clip_id && c.start_sec > clip_snapshot.start_sec)
                        .min_by(|a, b| a.start_sec.total_cmp(&b.start_sec))
                };
                let adjacent = adjacent.map(|c| (c.id, c.start_sec));
                if let Some((_, adj_start)) = adjacent {
                    if adj_start + *delta_sec < 0.0 {
                        return Err(invalid("slide would move neighbor before zero"));
                    }
                }

                let clip = seq
                    .find_clip_mut(*clip_id)
                    .ok_or(CommandError::ClipNotFound(*clip_id))?;
                clip.start_sec = new_start;
                if let Some((adj_id, adj_start)) = adjacent {
                    if let Some(adj) = seq.find_clip_mut(adj_id) {
                        adj.start_sec = adj_start + *delta_sec;
                    }
                    *neighbor = Some((adj_id, adj_start));
                } else {
                    *neighbor = None;
                }
                *prev_start = Some(old_start);
                Ok(())
            }

            Self::SplitClip {
                clip_id,
                split_time_sec,
                state,
            } => {
                let (track, clip) = seq
                    .find_clip(*clip_id)
                    .ok_or(CommandError::ClipNotFound(*clip_id))?;
                if track.locked {
                    return Err(CommandError::TrackLocked);
                }
                let track_id = track.id;
                let offset = *split_time_sec - clip.start_sec;
                if offset < SPLIT_EPSILON_SEC || clip.duration_sec - offset < SPLIT_EPSILON_SEC {
                    return Err(invalid("split point too close to a clip boundary"));
                }
                if offset < MIN_CLIP_DURATION_SEC
                    || clip.duration_sec - offset < MIN_CLIP_DURATION_SEC
                {
                    return Err(invalid("split would leave a piece too short"));
                }

                let mut right = clip.clone();
                let prev_duration = clip.duration_sec;
                let prev_trim_end = clip.trim_end_sec;

                right.id = Uuid::new_v4();
                right.start_sec = clip.start_sec + offset;
                right.trim_start_sec = clip.trim_start_sec + offset;
                right.duration_sec = prev_duration - offset;
                // The right piece starts clean; the left keeps its chain.
                right.effects.clear();
                right.transitions.clear();
                right.speed = None;
                let right_id = right.id;

                let clip = seq
                    .find_clip_mut(*clip_id)
                    .ok_or(CommandError::ClipNotFound(*clip_id))?;
                clip.duration_sec = offset;
                clip.trim_end_sec = prev_trim_end + right.duration_sec;

                let track = seq
                    .find_track_mut(track_id)
                    .ok_or(CommandError::TrackNotFound(track_id))?;
                track.clips.push(right);

                *state = Some(SplitState {
                    prev_duration_sec: prev_duration,
                    prev_trim_end_sec: prev_trim_end,
                    right_id,
                });
                Ok(())
            }

            Self::DeleteClip { clip_id, removed } => {
                let (track, _) = seq
                    .find_clip(*clip_id)
                    .ok_or(CommandError::ClipNotFound(*clip_id))?;
                if track.locked {
                    return Err(CommandError::TrackLocked);
                }
                let track_id = track.id;
                let clip = detach_clip(seq, track_id, *clip_id)
                    .ok_or(CommandError::ClipNotFound(*clip_id))?;
                *removed = Some((track_id, clip));
                Ok(())
            }

            Self::RippleDeleteClip {
                clip_id,
                scope,
                removed,
                shifted,
            } => {
                let (track, clip) = seq
                    .find_clip(*clip_id)
                    .ok_or(CommandError::ClipNotFound(*clip_id))?;
                if track.locked {
                    return Err(CommandError::TrackLocked);
                }
                let track_id = track.id;
                let anchor = clip.start_sec;
                let width = clip.duration_sec;
                let clip = detach_clip(seq, track_id, *clip_id)
                    .ok_or(CommandError::ClipNotFound(*clip_id))?;
                *shifted = shift_later_clips(seq, track_id, *scope, anchor, *clip_id, -width);
                *removed = Some((track_id, clip));
                Ok(())
            }

            Self::AddTrack { track } => {
                if seq.find_track(track.id).is_some() {
                    return Err(invalid("track id already present"));
                }
                seq.tracks.push(track.clone());
                Ok(())
            }

            Self::RemoveTrack { track_id, removed } => {
                let index = seq
                    .tracks
                    .iter()
                    .position(|t| t.id == *track_id)
                    .ok_or(CommandError::TrackNotFound(*track_id))?;
                *removed = Some((index, seq.tracks.remove(index)));
                Ok(())
            }

            Self::UpdateTrack { track, prev } => {
                let existing = seq
                    .find_track_mut(track.id)
                    .ok_or(CommandError::TrackNotFound(track.id))?;
                *prev = Some(existing.clone());
                *existing = track.clone();
                Ok(())
            }

            Self::Batch { commands, .. } => {
                let mut applied = 0usize;
                let mut failure = None;
                for cmd in commands.iter_mut() {
                    match cmd.apply_inner(seq) {
                        Ok(()) => applied += 1,
                        Err(e) => {
                            failure = Some(e);
                            break;
                        }
                    }
                }
                if let Some(err) = failure {
                    // Roll back the applied prefix in reverse order.
                    for cmd in commands[..applied].iter_mut().rev() {
                        let _ = cmd.undo_inner(seq);
                    }
                    return Err(err);
                }
                Ok(())
            }
        }
    }

    fn undo_inner(&mut self, seq: &mut Sequence) -> CommandResult {
        match self {
            Self::UpsertClip { clip, replaced } => {
                match replaced.take() {
                    Some(old) => {
                        let existing = seq
                            .find_clip_mut(clip.id)
                            .ok_or(CommandError::ClipNotFound(clip.id))?;
                        *existing = old;
                    }
                    None => {
                        detach_clip(seq, clip.track_id, clip.id)
                            .ok_or(CommandError::ClipNotFound(clip.id))?;
                    }
                }
                Ok(())
            }

            Self::MoveClip { clip_id, prev, .. } => {
                let (old_track_id, old_start) =
                    prev.take().ok_or_else(|| invalid("move was not applied"))?;
                let (current_track, _) = seq
                    .find_clip(*clip_id)
                    .ok_or(CommandError::ClipNotFound(*clip_id))?;
                let current_track_id = current_track.id;
                let mut clip = detach_clip(seq, current_track_id, *clip_id)
                    .ok_or(CommandError::ClipNotFound(*clip_id))?;
                clip.track_id = old_track_id;
                clip.start_sec = old_start;
                let track = seq
                    .find_track_mut(old_track_id)
                    .ok_or(CommandError::TrackNotFound(old_track_id))?;
                track.clips.push(clip);
                Ok(())
            }

            Self::TrimClip { clip_id, prev, .. } => {
                let state = prev.take().ok_or_else(|| invalid("trim was not applied"))?;
                let clip = seq
                    .find_clip_mut(*clip_id)
                    .ok_or(CommandError::ClipNotFound(*clip_id))?;
                state.restore(clip);
                Ok(())
            }

            Self::RippleTrim {
                clip_id,
                prev,
                shifted,
                ..
            } => {
                let state = prev
                    .take()
                    .ok_or_else(|| invalid("ripple trim was not applied"))?;
                let clip = seq
                    .find_clip_mut(*clip_id)
                    .ok_or(CommandError::ClipNotFound(*clip_id))?;
                state.restore(clip);
                restore_shifted(seq, shifted);
                Ok(())
            }

            Self::SlipClip { clip_id, prev, .. } => {
                let state = prev.take().ok_or_else(|| invalid("slip was not applied"))?;
                let clip = seq
                    .find_clip_mut(*clip_id)
                    .ok_or(CommandError::ClipNotFound(*clip_id))?;
                state.restore(clip);
                Ok(())
            }

            Self::RollEdit { clip_id, state, .. } => {
                let roll = state.take().ok_or_else(|| invalid("roll was not applied"))?;
                let left = seq
                    .find_clip_mut(*clip_id)
                    .ok_or(CommandError::ClipNotFound(*clip_id))?;
                roll.left.restore(left);
                let right = seq
                    .find_clip_mut(roll.right_id)
                    .ok_or(CommandError::ClipNotFound(roll.right_id))?;
                roll.right.restore(right);
                right.start_sec = roll.right_start_sec;
                Ok(())
            }

            Self::SlideClip {
                clip_id,
                prev_start,
                neighbor,
                ..
            } => {
                let old_start = prev_start
                    .take()
                    .ok_or_else(|| invalid("slide was not applied"))?;
                let clip = seq
                    .find_clip_mut(*clip_id)
                    .ok_or(CommandError::ClipNotFound(*clip_id))?;
                clip.start_sec = old_start;
                if let Some((adj_id, adj_start)) = neighbor.take() {
                    if let Some(adj) = seq.find_clip_mut(adj_id) {
                        adj.start_sec = adj_start;
                    }
                }
                Ok(())
            }

            Self::SplitClip { clip_id, state, .. } => {
                let split = state
                    .take()
                    .ok_or_else(|| invalid("split was not applied"))?;
                let (track, _) = seq
                    .find_clip(split.right_id)
                    .ok_or(CommandError::ClipNotFound(split.right_id))?;
                let track_id = track.id;
                detach_clip(seq, track_id, split.right_id)
                    .ok_or(CommandError::ClipNotFound(split.right_id))?;
                let clip = seq
                    .find_clip_mut(*clip_id)
                    .ok_or(CommandError::ClipNotFound(*clip_id))?;
                clip.duration_sec = split.prev_duration_sec;
                clip.trim_end_sec = split.prev_trim_end_sec;
                Ok(())
            }

            Self::DeleteClip { removed, .. } => {
                let (track_id, clip) = removed
                    .take()
                    .ok_or_else(|| invalid("delete was not applied"))?;
                let track = seq
                    .find_track_mut(track_id)
                    .ok_or(CommandError::TrackNotFound(track_id))?;
                track.clips.push(clip);
                Ok(())
            }

            Self::RippleDeleteClip {
                removed, shifted, ..
            } => {
                let (track_id, clip) = removed
                    .take()
                    .ok_or_else(|| invalid("ripple delete was not applied"))?;
                restore_shifted(seq, shifted);
                let track = seq
                    .find_track_mut(track_id)
                    .ok_or(CommandError::TrackNotFound(track_id))?;
                track.clips.push(clip);
                Ok(())
            }

            Self::AddTrack { track } => {
                let index = seq
                    .tracks
                    .iter()
                    .position(|t| t.id == track.id)
                    .ok_or(CommandError::TrackNotFound(track.id))?;
                seq.tracks.remove(index);
                Ok(())
            }

            Self::RemoveTrack { removed, .. } => {
                let (index, track) = removed
                    .take()
                    .ok_or_else(|| invalid("remove was not applied"))?;
                let index = index.min(seq.tracks.len());
                seq.tracks.insert(index, track);
                Ok(())
            }

            Self::UpdateTrack { track, prev } => {
                let old = prev
                    .take()
                    .ok_or_else(|| invalid("update was not applied"))?;
                let existing = seq
                    .find_track_mut(track.id)
                    .ok_or(CommandError::TrackNotFound(track.id))?;
                *existing = old;
                Ok(())
            }

            Self::Batch { commands, .. } => {
                for cmd in commands.iter_mut().rev() {
                    cmd.undo_inner(seq)?;
                }
                Ok(())
            }
        }
    }
}

/// Remove a clip from a track and return it.
fn detach_clip(seq: &mut Sequence, track_id: Uuid, clip_id: Uuid) -> Option<Clip> {
    let track = seq.find_track_mut(track_id)?;
    let index = track.clips.iter().position(|c| c.id == clip_id)?;
    Some(track.clips.remove(index))
}

/// Shift every clip starting after `anchor` by `delta`, honoring the ripple
/// scope and skipping locked tracks. Returns the (id, previous start) pairs
/// needed to undo the shift exactly.
fn shift_later_clips(
    seq: &mut Sequence,
    home_track_id: Uuid,
    scope: RippleScope,
    anchor: f64,
    skip_clip: Uuid,
    delta: f64,
) -> Vec<(Uuid, f64)> {
    let mut shifted = Vec::new();
    for track in &mut seq.tracks {
        let in_scope = match scope {
            RippleScope::SingleTrack => track.id == home_track_id,
            RippleScope::AllTracks => true,
        };
        if !in_scope || track.locked {
            continue;
        }
        for clip in &mut track.clips {
            if clip.id != skip_clip && clip.start_sec > anchor {
                shifted.push((clip.id, clip.start_sec));
                clip.start_sec = (clip.start_sec + delta).max(0.0);
            }
        }
    }
    shifted
}

/// Put previously shifted clips back at their recorded starts.
fn restore_shifted(seq: &mut Sequence, shifted: &mut Vec<(Uuid, f64)>) {
    for (clip_id, old_start) in shifted.drain(..) {
        if let Some(clip) = seq.find_clip_mut(clip_id) {
            clip.start_sec = old_start;
        }
    }
}

// ── Batch builders ──────────────────────────────────────────────

/// Duplicate clips as one atomic edit; copies keep their track and land
/// `offset_sec` later with fresh ids.
pub fn batch_duplicate(
    seq: &Sequence,
    clip_ids: &[Uuid],
    offset_sec: f64,
) -> Result<EditCommand, CommandError> {
    let mut commands = Vec::with_capacity(clip_ids.len());
    for &id in clip_ids {
        let (_, clip) = seq.find_clip(id).ok_or(CommandError::ClipNotFound(id))?;
        let mut copy = clip.clone();
        copy.id = Uuid::new_v4();
        copy.start_sec += offset_sec;
        commands.push(EditCommand::UpsertClip {
            clip: copy,
            replaced: None,
        });
    }
    Ok(EditCommand::Batch {
        description: "Duplicate clips".into(),
        commands,
    })
}

/// Delete several clips as one atomic edit.
pub fn batch_delete(clip_ids: &[Uuid]) -> EditCommand {
    EditCommand::Batch {
        description: "Delete clips".into(),
        commands: clip_ids
            .iter()
            .map(|&clip_id| EditCommand::DeleteClip {
                clip_id,
                removed: None,
            })
            .collect(),
    }
}

/// Move several clips as one atomic edit; `moves` is
/// (clip, target track, new start).
pub fn batch_move(moves: &[(Uuid, Uuid, f64)]) -> EditCommand {
    EditCommand::Batch {
        description: "Move clips".into(),
        commands: moves
            .iter()
            .map(|&(clip_id, target_track_id, new_start_sec)| EditCommand::MoveClip {
                clip_id,
                target_track_id,
                new_start_sec,
                prev: None,
            })
            .collect(),
    }
}
