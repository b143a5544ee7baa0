//! Two-stage gain mixing with the global mute/solo policy.
//!
//! Each timeline audio track maps to a [`TrackGain`] stage feeding the
//! master stage. Effective gains are recomputed whenever mute, solo, or
//! volume changes on any track, because solo is a policy across the whole
//! clock: once anything is soloed, every non-soloed track goes silent.
//! Mute wins over solo; a muted track stays silent even while soloed.

use crate::ring_buffer::RingBuffer;
use std::sync::Arc;

/// Gain-relevant state for one track.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackGain {
    pub muted: bool,
    pub solo: bool,
    pub volume: f32,
}

impl Default for TrackGain {
    fn default() -> Self {
        Self {
            muted: false,
            solo: false,
            volume: 1.0,
        }
    }
}

/// Mixer over N track stages and one master stage.
pub struct MixerGraph {
    tracks: Vec<TrackGain>,
    effective: Vec<f32>,
    master_volume: f32,
    /// Mixed output, consumed by the audio callback.
    pub output: Arc<RingBuffer>,
    scratch: Vec<f32>,
}

impl MixerGraph {
    /// Create a mixer with `track_count` stages and an output buffer of
    /// `buffer_samples` samples.
    pub fn new(track_count: usize, buffer_samples: usize) -> Self {
        let mut mixer = Self {
            tracks: vec![TrackGain::default(); track_count],
            effective: vec![1.0; track_count],
            master_volume: 1.0,
            output: Arc::new(RingBuffer::new(buffer_samples)),
            scratch: vec![0.0; 4096],
        };
        mixer.recompute_gains();
        mixer
    }

    pub fn track_count(&self) -> usize {
        self.tracks.len()
    }

    /// Replace every track stage at once (e.g. after a timeline edit).
    pub fn set_tracks(&mut self, tracks: Vec<TrackGain>) {
        self.tracks = tracks;
        self.recompute_gains();
    }

    pub fn set_muted(&mut self, track: usize, muted: bool) {
        if let Some(t) = self.tracks.get_mut(track) {
            t.muted = muted;
            self.recompute_gains();
        }
    }

    pub fn set_solo(&mut self, track: usize, solo: bool) {
        if let Some(t) = self.tracks.get_mut(track) {
            t.solo = solo;
            self.recompute_gains();
        }
    }

    pub fn set_volume(&mut self, track: usize, volume: f32) {
        if let Some(t) = self.tracks.get_mut(track) {
            t.volume = volume.max(0.0);
            self.recompute_gains();
        }
    }

    pub fn set_master_volume(&mut self, volume: f32) {
        self.master_volume = volume.max(0.0);
    }

    pub fn master_volume(&self) -> f32 {
        self.master_volume
    }

    /// The gain a track actually contributes, before the master stage.
    pub fn effective_gain(&self, track: usize) -> f32 {
        self.effective.get(track).copied().unwrap_or(0.0)
    }

    fn recompute_gains(&mut self) {
        let any_solo = self.tracks.iter().any(|t| t.solo);
        self.effective = self
            .tracks
            .iter()
            .map(|t| {
                if t.muted {
                    0.0
                } else if any_solo && !t.solo {
                    0.0
                } else {
                    t.volume
                }
            })
            .collect();
    }

    /// Mix interleaved stereo sources (one slice per track, each holding
    /// `frame_count * 2` samples) through both gain stages into the output
    /// ring buffer.
    pub fn mix(&mut self, sources: &[&[f32]], frame_count: usize) {
        let len = frame_count * 2;
        if self.scratch.len() < len {
            self.scratch.resize(len, 0.0);
        }
        for s in self.scratch[..len].iter_mut() {
            *s = 0.0;
        }

        for (track, source) in sources.iter().enumerate() {
            let gain = self.effective_gain(track);
            if gain == 0.0 {
                continue;
            }
            for (dst, src) in self.scratch[..len].iter_mut().zip(source.iter()) {
                *dst += src * gain;
            }
        }

        for s in self.scratch[..len].iter_mut() {
            *s = (*s * self.master_volume).clamp(-1.0, 1.0);
        }
        self.output.write(&self.scratch[..len]);
    }
}
