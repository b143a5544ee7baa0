//! Active-clip resolution.
//!
//! Given a sequence and a timeline time, work out which clips contribute to
//! the presented frame: one layer per visual track in rank order, where a
//! layer is either a single clip or an in-progress transition between the
//! incoming clip and its outgoing neighbor.

use montage_timeline::{Clip, Sequence, Track, TransitionKind};

/// What one visual track contributes at a point in time.
#[derive(Debug)]
pub enum LayerContent<'a> {
    Single(&'a Clip),
    Transition {
        /// The clip ending as the transition runs; `None` when the incoming
        /// clip has no adjacent neighbor (transition from black).
        outgoing: Option<&'a Clip>,
        incoming: &'a Clip,
        kind: TransitionKind,
        /// Eased progress in [0, 1].
        progress: f64,
    },
}

/// One contributing layer, bottom-most first in the resolved list.
#[derive(Debug)]
pub struct ActiveLayer<'a> {
    pub track: &'a Track,
    pub content: LayerContent<'a>,
}

impl ActiveLayer<'_> {
    /// The clip whose opacity and identity drive this layer.
    pub fn primary_clip(&self) -> &Clip {
        match &self.content {
            LayerContent::Single(clip) => clip,
            LayerContent::Transition { incoming, .. } => incoming,
        }
    }
}

/// Resolve the layers contributing at `time_sec`, in compositing order
/// (lowest rank first). Tracks with no clip under the playhead contribute
/// nothing; muted tracks still contribute pixels (mute is an audio policy).
pub fn resolve_at(seq: &Sequence, time_sec: f64) -> Vec<ActiveLayer<'_>> {
    let mut layers = Vec::new();
    for track in seq.visual_tracks() {
        let Some(clip) = track.clip_at(time_sec) else {
            continue;
        };
        let content = match clip.transition_at(time_sec) {
            Some((spec, progress)) => LayerContent::Transition {
                outgoing: track.previous_adjacent(clip),
                incoming: clip,
                kind: spec.kind,
                progress,
            },
            None => LayerContent::Single(clip),
        };
        layers.push(ActiveLayer { track, content });
    }
    layers
}
