//! Clip types for the timeline.

use crate::speed::SpeedCurve;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

/// Kind of media a clip plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClipKind {
    Video,
    Audio,
    Image,
}

/// Built-in effect types. `Custom` carries a renderer-defined tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EffectKind {
    Brightness,
    Contrast,
    Saturation,
    Blur,
    Grain,
    ColorGrade,
    Vignette,
    FilmLook,
    Custom(String),
}

/// A single effect instance on a clip. Order within the clip's effect list
/// defines application order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Effect {
    pub id: Uuid,
    pub kind: EffectKind,
    /// Flat numeric parameter map (e.g. "amount" → 0.4).
    pub params: BTreeMap<String, f64>,
    pub enabled: bool,
}

impl Effect {
    /// Create an enabled effect with a single "amount" parameter.
    pub fn with_amount(kind: EffectKind, amount: f64) -> Self {
        let mut params = BTreeMap::new();
        params.insert("amount".to_string(), amount);
        Self {
            id: Uuid::new_v4(),
            kind,
            params,
            enabled: true,
        }
    }

    /// Read a parameter, falling back to a default.
    pub fn param(&self, name: &str, default: f64) -> f64 {
        self.params.get(name).copied().unwrap_or(default)
    }
}

/// Transition types between two clips.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionKind {
    Crossfade,
    DipToBlack,
    DipToWhite,
    Wipe,
    Push,
    Iris,
}

/// Easing applied to transition progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Easing {
    Linear,
    EaseIn,
    EaseOut,
    EaseInOut,
}

impl Easing {
    /// Map linear progress in [0, 1] through this curve.
    pub fn apply(self, p: f64) -> f64 {
        let p = p.clamp(0.0, 1.0);
        match self {
            Self::Linear => p,
            Self::EaseIn => p * p,
            Self::EaseOut => p * (2.0 - p),
            Self::EaseInOut => {
                if p < 0.5 {
                    2.0 * p * p
                } else {
                    -1.0 + (4.0 - 2.0 * p) * p
                }
            }
        }
    }
}

/// A transition attached to the incoming clip, active in
/// `[clip.start, clip.start + duration)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransitionSpec {
    pub id: Uuid,
    pub kind: TransitionKind,
    pub duration_sec: f64,
    pub easing: Easing,
}

impl TransitionSpec {
    pub fn new(kind: TransitionKind, duration_sec: f64, easing: Easing) -> Self {
        Self {
            id: Uuid::new_v4(),
            kind,
            duration_sec,
            easing,
        }
    }
}

/// A placed, trimmed instance of a media asset on a track.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub id: Uuid,
    /// Asset this clip reads from.
    pub media_id: Uuid,
    /// Owning track.
    pub track_id: Uuid,
    pub kind: ClipKind,
    /// Timeline position in seconds.
    pub start_sec: f64,
    /// Timeline duration in seconds; always > 0.
    pub duration_sec: f64,
    /// Source media skipped before the clip's first frame.
    pub trim_start_sec: f64,
    /// Source media dropped after the clip's last frame.
    pub trim_end_sec: f64,
    /// Full duration of the referenced source media.
    pub source_duration_sec: f64,
    pub opacity: f64,
    pub volume: f64,
    pub effects: Vec<Effect>,
    pub transitions: Vec<TransitionSpec>,
    /// `None` means constant 1x speed.
    pub speed: Option<SpeedCurve>,
    /// Preserve audio pitch under speed remapping.
    pub preserve_pitch: bool,
}

impl Clip {
    /// Create a clip spanning the whole source at a timeline position.
    pub fn new(media_id: Uuid, track_id: Uuid, kind: ClipKind, start_sec: f64, source_duration_sec: f64) -> Self {
        Self {
            id: Uuid::new_v4(),
            media_id,
            track_id,
            kind,
            start_sec,
            duration_sec: source_duration_sec,
            trim_start_sec: 0.0,
            trim_end_sec: 0.0,
            source_duration_sec,
            opacity: 1.0,
            volume: 1.0,
            effects: Vec::new(),
            transitions: Vec::new(),
            speed: None,
            preserve_pitch: true,
        }
    }

    /// Timeline end, exclusive.
    #[inline]
    pub fn end_sec(&self) -> f64 {
        self.start_sec + self.duration_sec
    }

    /// Whether a timeline time falls inside this clip (`start <= t < end`).
    #[inline]
    pub fn contains(&self, time_sec: f64) -> bool {
        time_sec >= self.start_sec && time_sec < self.end_sec()
    }

    /// Map a timeline time inside this clip to a source-media time, applying
    /// trim and the speed curve.
    pub fn source_time_at(&self, time_sec: f64) -> f64 {
        let local = (time_sec - self.start_sec).clamp(0.0, self.duration_sec);
        let consumed = match &self.speed {
            Some(curve) => curve.source_delta(local, self.duration_sec),
            None => local,
        };
        (self.trim_start_sec + consumed)
            .min(self.source_duration_sec - self.trim_end_sec)
            .max(0.0)
    }

    /// Check the clip's structural invariants.
    pub fn is_valid(&self) -> bool {
        self.duration_sec > 0.0
            && self.trim_start_sec >= 0.0
            && self.trim_end_sec >= 0.0
            && (self.kind == ClipKind::Image
                || self.trim_start_sec + self.duration_sec
                    <= self.source_duration_sec - self.trim_end_sec + 1e-9)
    }

    /// Transition active at `time_sec`, with its eased progress in [0, 1].
    pub fn transition_at(&self, time_sec: f64) -> Option<(&TransitionSpec, f64)> {
        for spec in &self.transitions {
            if spec.duration_sec <= 0.0 {
                continue;
            }
            let window_end = self.start_sec + spec.duration_sec.min(self.duration_sec);
            if time_sec >= self.start_sec && time_sec < window_end {
                let linear = (time_sec - self.start_sec) / (window_end - self.start_sec);
                return Some((spec, spec.easing.apply(linear)));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::speed::SpeedCurve;

    fn clip(start: f64, duration: f64, source: f64) -> Clip {
        let mut c = Clip::new(Uuid::new_v4(), Uuid::new_v4(), ClipKind::Video, start, source);
        c.duration_sec = duration;
        c
    }

    #[test]
    fn test_contains_is_end_exclusive() {
        let c = clip(5.0, 4.0, 10.0);
        assert!(c.contains(5.0));
        assert!(c.contains(8.999));
        assert!(!c.contains(9.0));
    }

    #[test]
    fn test_source_time_applies_trim() {
        let mut c = clip(2.0, 4.0, 10.0);
        c.trim_start_sec = 1.5;
        assert!((c.source_time_at(2.0) - 1.5).abs() < 1e-9);
        assert!((c.source_time_at(4.0) - 3.5).abs() < 1e-9);
    }

    #[test]
    fn test_source_time_with_speed_curve() {
        let mut c = clip(0.0, 4.0, 20.0);
        c.speed = Some(SpeedCurve::constant(2.0));
        // 2x speed consumes source twice as fast
        assert!((c.source_time_at(3.0) - 6.0).abs() < 1e-6);
    }

    #[test]
    fn test_invariants() {
        let mut c = clip(0.0, 4.0, 10.0);
        assert!(c.is_valid());
        c.trim_start_sec = 7.0; // 7 + 4 > 10
        assert!(!c.is_valid());
        c.trim_start_sec = 0.0;
        c.duration_sec = 0.0;
        assert!(!c.is_valid());
    }

    #[test]
    fn test_transition_window() {
        let mut c = clip(10.0, 5.0, 10.0);
        c.transitions
            .push(TransitionSpec::new(TransitionKind::Crossfade, 1.0, Easing::Linear));
        let (_, p) = c.transition_at(10.5).unwrap();
        assert!((p - 0.5).abs() < 1e-9);
        assert!(c.transition_at(11.0).is_none());
        assert!(c.transition_at(9.9).is_none());
    }

    #[test]
    fn test_easing_bounds() {
        for e in [Easing::Linear, Easing::EaseIn, Easing::EaseOut, Easing::EaseInOut] {
            assert_eq!(e.apply(0.0), 0.0);
            assert!((e.apply(1.0) - 1.0).abs() < 1e-9);
            let mid = e.apply(0.5);
            assert!((0.0..=1.0).contains(&mid));
        }
    }
}
