//! Speed curves: keyframed speed remapping from timeline time to source time.
//!
//! A curve is a list of (normalized time, speed multiplier) keyframes over
//! the clip's timeline duration. Mapping to source time integrates the speed
//! function rather than scaling, so ramps consume source media smoothly.

use serde::{Deserialize, Serialize};

/// One speed keyframe.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpeedKeyframe {
    /// Position within the clip, normalized to [0, 1].
    pub time_norm: f64,
    /// Playback speed multiplier at that position; must be > 0.
    pub speed: f64,
}

/// A piecewise-linear speed function over a clip.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpeedCurve {
    pub keyframes: Vec<SpeedKeyframe>,
}

impl SpeedCurve {
    /// A flat curve at the given multiplier.
    pub fn constant(speed: f64) -> Self {
        Self {
            keyframes: vec![
                SpeedKeyframe {
                    time_norm: 0.0,
                    speed,
                },
                SpeedKeyframe {
                    time_norm: 1.0,
                    speed,
                },
            ],
        }
    }

    /// Build a curve from (normalized time, speed) pairs. Keyframes are
    /// sorted and clamped; speeds below a small floor are rejected.
    pub fn from_keyframes(pairs: &[(f64, f64)]) -> Option<Self> {
        if pairs.is_empty() || pairs.iter().any(|&(_, s)| s < 1e-3) {
            return None;
        }
        let mut keyframes: Vec<SpeedKeyframe> = pairs
            .iter()
            .map(|&(t, s)| SpeedKeyframe {
                time_norm: t.clamp(0.0, 1.0),
                speed: s,
            })
            .collect();
        keyframes.sort_by(|a, b| a.time_norm.total_cmp(&b.time_norm));
        Some(Self { keyframes })
    }

    /// Speed at a normalized position, interpolating linearly between
    /// keyframes and holding the ends flat.
    pub fn speed_at(&self, time_norm: f64) -> f64 {
        let t = time_norm.clamp(0.0, 1.0);
        let first = match self.keyframes.first() {
            Some(k) => k,
            None => return 1.0,
        };
        if t <= first.time_norm {
            return first.speed;
        }
        for pair in self.keyframes.windows(2) {
            let (a, b) = (pair[0], pair[1]);
            if t <= b.time_norm {
                let span = b.time_norm - a.time_norm;
                if span <= f64::EPSILON {
                    return b.speed;
                }
                let f = (t - a.time_norm) / span;
                return a.speed + (b.speed - a.speed) * f;
            }
        }
        self.keyframes.last().map(|k| k.speed).unwrap_or(1.0)
    }

    /// Source seconds consumed by playing the first `local_sec` seconds of a
    /// clip of `clip_duration_sec`. Trapezoidal integration of the speed
    /// function; exact for the piecewise-linear curves we store.
    pub fn source_delta(&self, local_sec: f64, clip_duration_sec: f64) -> f64 {
        if clip_duration_sec <= 0.0 {
            return 0.0;
        }
        let end_norm = (local_sec / clip_duration_sec).clamp(0.0, 1.0);
        let mut consumed = 0.0;
        let mut prev_norm = 0.0;
        let mut prev_speed = self.speed_at(0.0);
        for key in &self.keyframes {
            let t = key.time_norm.clamp(0.0, 1.0);
            if t <= prev_norm {
                continue;
            }
            let seg_end = t.min(end_norm);
            if seg_end > prev_norm {
                let end_speed = self.speed_at(seg_end);
                consumed += (seg_end - prev_norm) * (prev_speed + end_speed) * 0.5;
            }
            if t >= end_norm {
                return consumed * clip_duration_sec;
            }
            prev_norm = t;
            prev_speed = key.speed;
        }
        if end_norm > prev_norm {
            let end_speed = self.speed_at(end_norm);
            consumed += (end_norm - prev_norm) * (prev_speed + end_speed) * 0.5;
        }
        consumed * clip_duration_sec
    }
}
