//! Time representation for the editing engine.
//!
//! Timeline positions, durations, and trims are `f64` seconds, matching the
//! command and compositing math which works in fractional seconds. Frame
//! rates are rational to stay exact for NTSC rates, and cache keys are
//! quantized millisecond ticks so that two lookups for "the same" time hit
//! the same entry.

use num_rational::Rational64;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Quantized time used as a frame-cache key (millisecond ticks).
pub type Ticks = i64;

const TICKS_PER_SECOND: f64 = 1_000.0;

/// Quantize a time in seconds to cache ticks.
#[inline]
pub fn to_ticks(seconds: f64) -> Ticks {
    (seconds * TICKS_PER_SECOND).round() as Ticks
}

/// Convert cache ticks back to seconds.
#[inline]
pub fn from_ticks(ticks: Ticks) -> f64 {
    ticks as f64 / TICKS_PER_SECOND
}

/// Frame rate as a rational number (e.g., 30000/1001 for 29.97 fps).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FrameRate {
    /// Numerator (e.g., 30000)
    pub numerator: u32,
    /// Denominator (e.g., 1001)
    pub denominator: u32,
}

impl FrameRate {
    /// Create a new frame rate.
    #[inline]
    pub const fn new(numerator: u32, denominator: u32) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    /// Convert to frames per second as f64.
    #[inline]
    pub fn to_fps_f64(self) -> f64 {
        self.numerator as f64 / self.denominator as f64
    }

    /// Duration of a single frame in seconds.
    #[inline]
    pub fn frame_duration_sec(self) -> f64 {
        self.denominator as f64 / self.numerator as f64
    }

    /// Frame index containing the given time (floor).
    #[inline]
    pub fn frame_at(self, seconds: f64) -> i64 {
        let exact = Rational64::approximate_float(seconds)
            .unwrap_or_else(|| Rational64::new(0, 1))
            * Rational64::new(self.numerator as i64, self.denominator as i64);
        exact.floor().to_integer()
    }

    /// Timeline time of the given frame index.
    #[inline]
    pub fn time_of_frame(self, frame: i64) -> f64 {
        frame as f64 * self.frame_duration_sec()
    }

    /// Common frame rates
    pub const FPS_23_976: Self = Self::new(24000, 1001);
    pub const FPS_24: Self = Self::new(24, 1);
    pub const FPS_25: Self = Self::new(25, 1);
    pub const FPS_29_97: Self = Self::new(30000, 1001);
    pub const FPS_30: Self = Self::new(30, 1);
    pub const FPS_60: Self = Self::new(60, 1);
}

impl Default for FrameRate {
    fn default() -> Self {
        Self::FPS_30
    }
}

impl fmt::Display for FrameRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let fps = self.to_fps_f64();
        if (fps - fps.round()).abs() < 0.001 {
            write!(f, "{} fps", fps.round() as u32)
        } else {
            write!(f, "{:.3} fps", fps)
        }
    }
}

/// Format a time in seconds as `HH:MM:SS.mmm`.
pub fn format_timecode(seconds: f64) -> String {
    let total = seconds.max(0.0);
    let hours = (total / 3600.0).floor() as u64;
    let minutes = ((total % 3600.0) / 60.0).floor() as u64;
    let secs = (total % 60.0).floor() as u64;
    let millis = ((total * 1000.0).round() as u64) % 1000;
    format!("{:02}:{:02}:{:02}.{:03}", hours, minutes, secs, millis)
}
