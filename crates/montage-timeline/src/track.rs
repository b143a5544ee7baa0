//! Track types for the timeline.

use crate::clip::Clip;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of track.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackKind {
    Video,
    Audio,
    Overlay,
    Fx,
}

impl TrackKind {
    /// Whether clips on this kind of track may overlap by default.
    /// Video-family tracks reject overlap; audio layering is allowed.
    pub fn allows_overlap(self) -> bool {
        matches!(self, Self::Audio)
    }

    /// Whether this kind of track contributes pixels to the composite.
    pub fn is_visual(self) -> bool {
        matches!(self, Self::Video | Self::Overlay | Self::Fx)
    }
}

/// A track holding an ordered list of clips.
///
/// Clips are kept sorted by `start_sec`; [`crate::project::Sequence`]
/// re-sorts after every command that touches the track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Track {
    pub id: Uuid,
    pub name: String,
    pub kind: TrackKind,
    /// Compositing rank; higher ranks draw on top.
    pub rank: u32,
    pub muted: bool,
    pub solo: bool,
    pub locked: bool,
    /// Track gain applied before the master gain.
    pub volume: f64,
    /// Overlap opt-in; defaults from the track kind.
    pub allow_overlap: bool,
    pub clips: Vec<Clip>,
}

impl Track {
    /// Create an empty track of a kind, with overlap policy derived from it.
    pub fn new(name: impl Into<String>, kind: TrackKind, rank: u32) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            kind,
            rank,
            muted: false,
            solo: false,
            locked: false,
            volume: 1.0,
            allow_overlap: kind.allows_overlap(),
            clips: Vec::new(),
        }
    }

    /// Sort clips by timeline start.
    pub fn sort_clips(&mut self) {
        self.clips
            .sort_by(|a, b| a.start_sec.total_cmp(&b.start_sec));
    }

    /// Latest clip end on this track.
    pub fn end_sec(&self) -> f64 {
        self.clips.iter().fold(0.0, |acc, c| acc.max(c.end_sec()))
    }

    /// Find a clip by id.
    pub fn find_clip(&self, id: Uuid) -> Option<&Clip> {
        self.clips.iter().find(|c| c.id == id)
    }

    /// Find a clip mutably by id.
    pub fn find_clip_mut(&mut self, id: Uuid) -> Option<&mut Clip> {
        self.clips.iter_mut().find(|c| c.id == id)
    }

    /// The clip active at a timeline time, if any (`start <= t < end`).
    pub fn clip_at(&self, time_sec: f64) -> Option<&Clip> {
        self.clips.iter().find(|c| c.contains(time_sec))
    }

    /// The clip ending exactly where `clip` starts (the outgoing neighbor
    /// for a transition), within a small tolerance.
    pub fn previous_adjacent(&self, clip: &Clip) -> Option<&Clip> {
        self.clips
            .iter()
            .filter(|c| c.id != clip.id)
            .find(|c| (c.end_sec() - clip.start_sec).abs() < 1e-6)
    }

    /// Whether `candidate` would overlap an existing clip, ignoring the clip
    /// with `ignore_id` (used when replacing). Uses the engine's shared
    /// overlap tolerance so abutting clips do not count as overlapping.
    pub fn would_overlap(&self, candidate: &Clip, ignore_id: Option<Uuid>) -> bool {
        if self.allow_overlap {
            return false;
        }
        self.clips.iter().any(|existing| {
            Some(existing.id) != ignore_id
                && existing.id != candidate.id
                && clips_overlap(existing, candidate)
        })
    }
}

/// Overlap check with the model's tolerance: abutting edges are not overlap.
pub fn clips_overlap(a: &Clip, b: &Clip) -> bool {
    let start = a.start_sec.max(b.start_sec);
    let end = a.end_sec().min(b.end_sec());
    end - start > 1e-6
}
