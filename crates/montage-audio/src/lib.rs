//! Montage Audio - mixing and playback scheduling
//!
//! Architecture:
//! - `RingBuffer`: lock-free SPSC buffer between the mixer and the audio
//!   callback
//! - `MixerGraph`: two-stage gains (track, then master) with the global
//!   mute/solo policy
//! - `AudioScheduler`: schedules per-clip sources against a shared clock,
//!   preserving play/pause state across seeks
//! - `AudioOutput`: cpal sink whose sample position is the master clock
//! - `waveform`: peak summaries for display

pub mod clock;
pub mod mixer;
pub mod output;
pub mod ring_buffer;
pub mod schedule;
pub mod waveform;

pub use clock::{AudioClock, ManualClock, WallClock};
pub use mixer::{MixerGraph, TrackGain};
pub use output::AudioOutput;
pub use ring_buffer::RingBuffer;
pub use schedule::{AudioClipSpec, AudioScheduler};
pub use waveform::waveform_summary;
