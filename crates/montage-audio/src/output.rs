//! cpal output sink.
//!
//! The device callback drains the mixer's ring buffer and counts the
//! samples it has handed to the hardware; that sample position is the
//! steadiest clock available, so playback syncs video to it. When no
//! output device exists the session falls back to a wall clock and video
//! keeps playing silently.

use crate::clock::AudioClock;
use crate::ring_buffer::RingBuffer;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, Stream, StreamConfig};
use montage_core::{MontageError, Result};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{info, warn};

/// Audio device sink fed from a shared ring buffer.
pub struct AudioOutput {
    device: Device,
    config: StreamConfig,
    stream: Option<Stream>,
    ring: Arc<RingBuffer>,
    samples_played: Arc<AtomicU64>,
    sample_rate: u32,
    channels: u16,
}

impl AudioOutput {
    /// Open the default output device.
    pub fn new(ring: Arc<RingBuffer>) -> Result<Self> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| MontageError::Audio("no audio output device".into()))?;
        let default_config = device
            .default_output_config()
            .map_err(|e| MontageError::Audio(format!("default output config: {e}")))?;
        let sample_rate = default_config.sample_rate().0;
        let channels = default_config.channels();
        let config = StreamConfig::from(default_config);
        info!(sample_rate, channels, "audio output opened");
        Ok(Self {
            device,
            config,
            stream: None,
            ring,
            samples_played: Arc::new(AtomicU64::new(0)),
            sample_rate,
            channels,
        })
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Build and start the stream. The callback fills from the ring buffer
    /// and pads with silence on underrun rather than failing.
    pub fn start(&mut self) -> Result<()> {
        if self.stream.is_some() {
            return Ok(());
        }
        let ring = Arc::clone(&self.ring);
        let played = Arc::clone(&self.samples_played);
        let stream = self
            .device
            .build_output_stream(
                &self.config,
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    let got = ring.read(data);
                    for sample in data[got..].iter_mut() {
                        *sample = 0.0;
                    }
                    played.fetch_add(data.len() as u64, Ordering::Relaxed);
                },
                |err| warn!(error = %err, "audio stream error"),
                None,
            )
            .map_err(|e| MontageError::Audio(format!("build output stream: {e}")))?;
        stream
            .play()
            .map_err(|e| MontageError::Audio(format!("start output stream: {e}")))?;
        self.stream = Some(stream);
        Ok(())
    }

    /// Pause the device stream without tearing it down.
    pub fn pause(&mut self) -> Result<()> {
        if let Some(stream) = &self.stream {
            stream
                .pause()
                .map_err(|e| MontageError::Audio(format!("pause output stream: {e}")))?;
        }
        Ok(())
    }

    /// Stop and drop the stream; the sample counter keeps its value.
    pub fn stop(&mut self) {
        self.stream.take();
    }

    /// Seconds of audio handed to the hardware since the stream began.
    pub fn position_sec(&self) -> f64 {
        let samples = self.samples_played.load(Ordering::Relaxed);
        let per_sec = u64::from(self.sample_rate) * u64::from(self.channels.max(1));
        if per_sec == 0 {
            return 0.0;
        }
        samples as f64 / per_sec as f64
    }

    /// A shareable clock over this output's sample position. The stream
    /// itself is not `Send`, so the scheduler holds this handle instead.
    pub fn clock(&self) -> DeviceClock {
        DeviceClock {
            samples_played: Arc::clone(&self.samples_played),
            sample_rate: self.sample_rate,
            channels: self.channels,
        }
    }
}

/// Clock handle derived from an [`AudioOutput`]'s sample counter.
#[derive(Clone)]
pub struct DeviceClock {
    samples_played: Arc<AtomicU64>,
    sample_rate: u32,
    channels: u16,
}

impl AudioClock for DeviceClock {
    fn now_sec(&self) -> f64 {
        let samples = self.samples_played.load(Ordering::Relaxed);
        let per_sec = u64::from(self.sample_rate) * u64::from(self.channels.max(1));
        if per_sec == 0 {
            return 0.0;
        }
        samples as f64 / per_sec as f64
    }
}
