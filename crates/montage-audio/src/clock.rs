//! Playback clocks.
//!
//! The scheduler measures elapsed time against an [`AudioClock`]. In a live
//! session that is the audio device's sample position (the steadiest clock
//! available); when no device exists the wall clock stands in, and tests
//! drive a manual clock.

use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Instant;

/// A monotonically advancing time source in seconds.
pub trait AudioClock: Send + Sync {
    fn now_sec(&self) -> f64;
}

/// Wall-clock time since construction.
pub struct WallClock {
    origin: Instant,
}

impl WallClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for WallClock {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioClock for WallClock {
    fn now_sec(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// A clock tests advance by hand.
#[derive(Clone, Default)]
pub struct ManualClock {
    now: Arc<Mutex<f64>>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn advance(&self, delta_sec: f64) {
        *self.now.lock() += delta_sec;
    }

    pub fn set(&self, now_sec: f64) {
        *self.now.lock() = now_sec;
    }
}

impl AudioClock for ManualClock {
    fn now_sec(&self) -> f64 {
        *self.now.lock()
    }
}
