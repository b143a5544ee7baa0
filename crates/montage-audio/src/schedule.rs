//! Per-clip audio source scheduling against a shared clock.
//!
//! `play(from)` resolves the clips audible at that time and schedules one
//! source per clip at the right source offset. Sources remove their own
//! bookkeeping once their scheduled span has elapsed; `pause` both stops and
//! detaches every source, since a stopped-but-connected source can still
//! audibly drain buffered samples.

use crate::clock::AudioClock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

/// The audio-relevant slice of a timeline clip. The session layer maps
/// timeline clips into these so this crate stays model-agnostic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioClipSpec {
    pub clip_id: Uuid,
    /// Index of the owning audio track's mixer stage.
    pub track: usize,
    pub start_sec: f64,
    pub duration_sec: f64,
    pub trim_start_sec: f64,
    pub volume: f64,
}

impl AudioClipSpec {
    fn end_sec(&self) -> f64 {
        self.start_sec + self.duration_sec
    }
}

/// One playing source.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduledSource {
    pub clip_id: Uuid,
    pub track: usize,
    /// Offset into the source media where playback started.
    pub source_offset_sec: f64,
    /// Seconds this source will play before ending naturally.
    pub remaining_sec: f64,
    /// Clock reading when the source started.
    started_at_clock: f64,
    connected: bool,
}

impl ScheduledSource {
    fn ends_at_clock(&self) -> f64 {
        self.started_at_clock + self.remaining_sec
    }

    /// Whether the source is still attached to the mixer graph.
    pub fn is_connected(&self) -> bool {
        self.connected
    }
}

/// Schedules clip audio against the clock and tracks play/pause state.
pub struct AudioScheduler {
    clock: Arc<dyn AudioClock>,
    program: Vec<AudioClipSpec>,
    active: Vec<ScheduledSource>,
    playing: bool,
    /// Timeline position when paused, or at the moment play began.
    cursor_sec: f64,
    clock_at_play: f64,
}

impl AudioScheduler {
    pub fn new(clock: Arc<dyn AudioClock>) -> Self {
        Self {
            clock,
            program: Vec::new(),
            active: Vec::new(),
            playing: false,
            cursor_sec: 0.0,
            clock_at_play: 0.0,
        }
    }

    /// Replace the set of clips eligible for scheduling. Called after any
    /// committed edit; a live playback picks the change up on next play
    /// or seek.
    pub fn set_program(&mut self, clips: Vec<AudioClipSpec>) {
        self.program = clips;
    }

    pub fn is_playing(&self) -> bool {
        self.playing
    }

    /// Current timeline position in seconds.
    pub fn current_time(&self) -> f64 {
        if self.playing {
            self.cursor_sec + (self.clock.now_sec() - self.clock_at_play)
        } else {
            self.cursor_sec
        }
    }

    /// Sources currently scheduled (tests and the session inspect these).
    pub fn active_sources(&self) -> &[ScheduledSource] {
        &self.active
    }

    /// Start playback at `from_sec`: stop anything active, then schedule a
    /// source for every clip audible at that time.
    pub fn play(&mut self, from_sec: f64) {
        self.stop_all_sources();
        let now = self.clock.now_sec();
        self.cursor_sec = from_sec;
        self.clock_at_play = now;
        self.playing = true;

        for clip in &self.program {
            if from_sec < clip.start_sec || from_sec >= clip.end_sec() {
                continue;
            }
            let into_clip = from_sec - clip.start_sec;
            let source_offset = clip.trim_start_sec + into_clip;
            let remaining = clip.duration_sec - into_clip;
            self.active.push(ScheduledSource {
                clip_id: clip.clip_id,
                track: clip.track,
                source_offset_sec: source_offset,
                remaining_sec: remaining,
                started_at_clock: now,
                connected: true,
            });
        }
        debug!(from_sec, sources = self.active.len(), "audio play");
    }

    /// Stop and disconnect every source, remembering the pause position.
    pub fn pause(&mut self) {
        if self.playing {
            self.cursor_sec = self.current_time();
            self.playing = false;
        }
        self.stop_all_sources();
    }

    /// Move the cursor. Playing: restart sources at the new time. Paused:
    /// only the stored position moves.
    pub fn seek(&mut self, to_sec: f64) {
        if self.playing {
            self.play(to_sec);
        } else {
            self.cursor_sec = to_sec;
        }
    }

    /// Drop sources whose scheduled span has elapsed, the pull-model
    /// equivalent of a source cleaning up its own entry on completion.
    /// Called from the render tick.
    pub fn reap_finished(&mut self) {
        if !self.playing {
            return;
        }
        let now = self.clock.now_sec();
        self.active.retain(|s| s.ends_at_clock() > now);
    }

    /// Clips that should start between the previous tick and now but were
    /// not yet scheduled (playback ran into them). Schedules them.
    pub fn schedule_entering(&mut self) {
        if !self.playing {
            return;
        }
        let t = self.current_time();
        let now = self.clock.now_sec();
        let program = std::mem::take(&mut self.program);
        for clip in &program {
            let already = self.active.iter().any(|s| s.clip_id == clip.clip_id);
            if already || t < clip.start_sec || t >= clip.end_sec() {
                continue;
            }
            let into_clip = t - clip.start_sec;
            self.active.push(ScheduledSource {
                clip_id: clip.clip_id,
                track: clip.track,
                source_offset_sec: clip.trim_start_sec + into_clip,
                remaining_sec: clip.duration_sec - into_clip,
                started_at_clock: now,
                connected: true,
            });
        }
        self.program = program;
    }

    fn stop_all_sources(&mut self) {
        for source in &mut self.active {
            // Disconnect before dropping; stopping alone would let already
            // buffered samples keep playing.
            source.connected = false;
        }
        self.active.clear();
    }
}
