//! Project and sequence types.

use crate::clip::Clip;
use crate::track::{Track, TrackKind};
use montage_core::{FrameRate, MediaAssetMeta, MontageError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{SystemTime, UNIX_EPOCH};
use uuid::Uuid;

/// Current wall time as epoch milliseconds.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Editor-level settings carried with the project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EditorSettings {
    pub snap_enabled: bool,
    /// How close an edge must be before it snaps, in seconds.
    pub snap_tolerance_sec: f64,
    /// Timeline zoom, pixels per second.
    pub zoom: f64,
    pub active_sequence: Option<Uuid>,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            snap_enabled: true,
            snap_tolerance_sec: 0.1,
            zoom: 50.0,
            active_sequence: None,
        }
    }
}

impl EditorSettings {
    /// Snap a time to the nearest candidate edge within tolerance. Returns
    /// the input unchanged when snapping is off or nothing is close enough.
    pub fn snap(&self, time_sec: f64, candidates: &[f64]) -> f64 {
        if !self.snap_enabled {
            return time_sec;
        }
        candidates
            .iter()
            .copied()
            .map(|c| (c, (c - time_sec).abs()))
            .filter(|&(_, d)| d <= self.snap_tolerance_sec)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(c, _)| c)
            .unwrap_or(time_sec)
    }
}

/// A sequence (one timeline) of ordered tracks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sequence {
    pub id: Uuid,
    pub name: String,
    pub width: u32,
    pub height: u32,
    pub frame_rate: FrameRate,
    pub sample_rate: u32,
    /// Derived: max clip end across all tracks. Recomputed after every
    /// structural edit via [`Sequence::refresh_duration`], never edited
    /// directly.
    pub duration_sec: f64,
    pub tracks: Vec<Track>,
}

impl Sequence {
    /// Create a sequence with one video and one audio track.
    pub fn new(name: impl Into<String>, width: u32, height: u32, frame_rate: FrameRate) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            width,
            height,
            frame_rate,
            sample_rate: 48_000,
            duration_sec: 0.0,
            tracks: vec![
                Track::new("V1", TrackKind::Video, 0),
                Track::new("A1", TrackKind::Audio, 0),
            ],
        }
    }

    /// Find a track by id.
    pub fn find_track(&self, id: Uuid) -> Option<&Track> {
        self.tracks.iter().find(|t| t.id == id)
    }

    /// Find a track mutably by id.
    pub fn find_track_mut(&mut self, id: Uuid) -> Option<&mut Track> {
        self.tracks.iter_mut().find(|t| t.id == id)
    }

    /// Find a clip anywhere in the sequence, with its owning track.
    pub fn find_clip(&self, id: Uuid) -> Option<(&Track, &Clip)> {
        self.tracks
            .iter()
            .find_map(|t| t.find_clip(id).map(|c| (t, c)))
    }

    /// Find a clip mutably anywhere in the sequence.
    pub fn find_clip_mut(&mut self, id: Uuid) -> Option<&mut Clip> {
        self.tracks.iter_mut().find_map(|t| t.find_clip_mut(id))
    }

    /// Visual tracks in compositing order (lowest rank first, so higher
    /// ranks draw on top).
    pub fn visual_tracks(&self) -> Vec<&Track> {
        let mut tracks: Vec<&Track> = self
            .tracks
            .iter()
            .filter(|t| t.kind.is_visual())
            .collect();
        tracks.sort_by_key(|t| t.rank);
        tracks
    }

    /// Audio tracks in declaration order.
    pub fn audio_tracks(&self) -> Vec<&Track> {
        self.tracks
            .iter()
            .filter(|t| t.kind == TrackKind::Audio)
            .collect()
    }

    /// Recompute the derived duration: max `clip.end` over all tracks.
    pub fn refresh_duration(&mut self) {
        self.duration_sec = self
            .tracks
            .iter()
            .map(Track::end_sec)
            .fold(0.0, f64::max);
    }

    /// Restore the sequence's structural invariants after an edit: clips
    /// sorted by start on every track, duration re-derived.
    pub fn normalize(&mut self) {
        for track in &mut self.tracks {
            track.sort_clips();
        }
        self.refresh_duration();
    }
}

impl Default for Sequence {
    fn default() -> Self {
        Self::new("Sequence 1", 1920, 1080, FrameRate::FPS_30)
    }
}

/// A project: sequences plus the asset-metadata table handed over by the
/// backend collaborator. The engine never persists this itself; committed
/// edits produce a snapshot for the collaborator to store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: Uuid,
    pub title: String,
    pub created_at_ms: u64,
    pub updated_at_ms: u64,
    pub sequences: Vec<Sequence>,
    pub assets: HashMap<Uuid, MediaAssetMeta>,
    pub settings: EditorSettings,
}

impl Project {
    /// Create an empty project with one default sequence.
    pub fn new(title: impl Into<String>) -> Self {
        let sequence = Sequence::default();
        let now = now_ms();
        let settings = EditorSettings {
            active_sequence: Some(sequence.id),
            ..Default::default()
        };
        Self {
            id: Uuid::new_v4(),
            title: title.into(),
            created_at_ms: now,
            updated_at_ms: now,
            sequences: vec![sequence],
            assets: HashMap::new(),
            settings,
        }
    }

    /// The sequence currently being edited.
    pub fn active_sequence(&self) -> Option<&Sequence> {
        match self.settings.active_sequence {
            Some(id) => self.sequences.iter().find(|s| s.id == id),
            None => self.sequences.first(),
        }
    }

    /// The active sequence, mutably.
    pub fn active_sequence_mut(&mut self) -> Option<&mut Sequence> {
        match self.settings.active_sequence {
            Some(id) => self.sequences.iter_mut().find(|s| s.id == id),
            None => self.sequences.first_mut(),
        }
    }

    /// Register an asset in the metadata table.
    pub fn add_asset(&mut self, meta: MediaAssetMeta) {
        self.assets.insert(meta.id, meta);
    }

    /// Emit a snapshot of the project for the backend to persist, bumping
    /// `updated_at_ms` first. Called after every committed edit.
    pub fn commit_snapshot(&mut self) -> Result<String> {
        self.updated_at_ms = now_ms();
        serde_json::to_string(self).map_err(|e| MontageError::Serialization(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clip::ClipKind;

    #[test]
    fn test_refresh_duration_tracks_max_end() {
        let mut seq = Sequence::default();
        let track_id = seq.tracks[0].id;
        let mut clip = Clip::new(Uuid::new_v4(), track_id, ClipKind::Video, 2.0, 5.0);
        clip.duration_sec = 5.0;
        seq.tracks[0].clips.push(clip);
        seq.refresh_duration();
        assert!((seq.duration_sec - 7.0).abs() < 1e-9);
    }

    #[test]
    fn test_snapshot_bumps_updated_at() {
        let mut project = Project::new("Demo");
        let before = project.updated_at_ms;
        std::thread::sleep(std::time::Duration::from_millis(5));
        let json = project.commit_snapshot().unwrap();
        assert!(project.updated_at_ms >= before);
        assert!(json.contains("\"title\":\"Demo\""));
    }

    #[test]
    fn test_snap_within_tolerance() {
        let settings = EditorSettings::default();
        let snapped = settings.snap(4.95, &[5.0, 10.0]);
        assert_eq!(snapped, 5.0);
        let unsnapped = settings.snap(4.0, &[5.0, 10.0]);
        assert_eq!(unsnapped, 4.0);
    }

    #[test]
    fn test_project_roundtrips_through_serde() {
        let project = Project::new("Roundtrip");
        let json = serde_json::to_string(&project).unwrap();
        let back: Project = serde_json::from_str(&json).unwrap();
        assert_eq!(project, back);
    }
}
