//! Interactive preview: state machine and render loop.
//!
//! States: detached → ready → playing/paused/scrubbing. The loop is
//! cooperative: each tick renders one frame, then asks the scheduler for the
//! next, so renders never overlap. Timeline time advances against the audio
//! clock, the steadiest reference available; with no audio device a wall
//! clock stands in and playback stays silent but visible.

use crate::compositor::{open_sequence_assets, Compositor, PipelineSet};
use crate::scheduler::{RenderGate, TickScheduler};
use crate::surface::PresentSurface;
use crossbeam_channel::{unbounded, Receiver, Sender};
use montage_audio::{AudioClipSpec, AudioClock, AudioScheduler, MixerGraph, TrackGain};
use montage_core::{FrameBuffer, MediaAssetMeta, MontageError, Result};
use montage_media::{FetchMode, FrameDecoder, PipelineConfig};
use montage_timeline::Sequence;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Preview lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewState {
    Detached,
    Ready,
    Playing,
    Paused,
    Scrubbing,
}

/// Notifications emitted while previewing.
#[derive(Debug, Clone, PartialEq)]
pub enum PreviewEvent {
    /// The playhead moved (one per rendered frame while playing).
    Time { time_sec: f64 },
    /// The state machine changed state.
    State { state: PreviewState },
}

/// Tunables for the preview loop.
#[derive(Debug, Clone)]
pub struct PreviewConfig {
    /// Rapid seeks during playback within this window coalesce into one.
    pub seek_debounce_sec: f64,
    pub pipeline: PipelineConfig,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            seek_debounce_sec: 0.016,
            pipeline: PipelineConfig::default(),
        }
    }
}

/// The preview renderer: owns the session's decode pipelines, the audio
/// scheduler, and the presentation surface. The timeline model is handed in
/// as a snapshot and treated read-only.
pub struct PreviewRenderer {
    state: PreviewState,
    config: PreviewConfig,
    sequence: Option<Sequence>,
    pipelines: PipelineSet,
    surface: Option<Box<dyn PresentSurface>>,
    scheduler: Box<dyn TickScheduler>,
    clock: Arc<dyn AudioClock>,
    audio: AudioScheduler,
    mixer: MixerGraph,
    gate: RenderGate,
    last_frame: Option<FrameBuffer>,
    pending_seek: Option<f64>,
    pending_seek_clock: f64,
    events_tx: Sender<PreviewEvent>,
    events_rx: Receiver<PreviewEvent>,
}

impl PreviewRenderer {
    pub fn new(scheduler: Box<dyn TickScheduler>, clock: Arc<dyn AudioClock>) -> Self {
        let (events_tx, events_rx) = unbounded();
        Self {
            state: PreviewState::Detached,
            config: PreviewConfig::default(),
            sequence: None,
            pipelines: PipelineSet::new(),
            surface: None,
            scheduler,
            clock: Arc::clone(&clock),
            audio: AudioScheduler::new(clock),
            mixer: MixerGraph::new(0, 8192),
            gate: RenderGate::new(),
            last_frame: None,
            pending_seek: None,
            pending_seek_clock: 0.0,
            events_tx,
            events_rx,
        }
    }

    pub fn with_config(mut self, config: PreviewConfig) -> Self {
        self.config = config;
        self
    }

    /// Receiver for time/state notifications.
    pub fn events(&self) -> Receiver<PreviewEvent> {
        self.events_rx.clone()
    }

    pub fn state(&self) -> PreviewState {
        self.state
    }

    pub fn current_time(&self) -> f64 {
        self.audio.current_time()
    }

    pub fn mixer_mut(&mut self) -> &mut MixerGraph {
        &mut self.mixer
    }

    pub fn pipelines_mut(&mut self) -> &mut PipelineSet {
        &mut self.pipelines
    }

    /// Attach a drawing surface. Sizes it to the active sequence's canvas
    /// when one is set.
    pub fn attach(&mut self, mut surface: Box<dyn PresentSurface>) -> Result<()> {
        let (w, h) = self
            .sequence
            .as_ref()
            .map_or((1280, 720), |s| (s.width, s.height));
        surface.configure(w, h)?;
        self.surface = Some(surface);
        if self.state == PreviewState::Detached {
            self.set_state(PreviewState::Ready);
        }
        Ok(())
    }

    /// Drop the surface and stop everything.
    pub fn detach(&mut self) {
        self.scheduler.cancel_tick();
        self.audio.pause();
        self.surface = None;
        self.last_frame = None;
        self.set_state(PreviewState::Detached);
    }

    /// Replace the sequence snapshot. Rebuilds the audio program and the
    /// mixer stages; a running playback picks the change up on next play or
    /// seek.
    pub fn set_sequence(&mut self, seq: Sequence) {
        let audio_tracks = seq.audio_tracks();
        let gains: Vec<TrackGain> = audio_tracks
            .iter()
            .map(|t| TrackGain {
                muted: t.muted,
                solo: t.solo,
                volume: t.volume as f32,
            })
            .collect();
        let mut program = Vec::new();
        for (idx, track) in audio_tracks.iter().enumerate() {
            for clip in &track.clips {
                program.push(AudioClipSpec {
                    clip_id: clip.id,
                    track: idx,
                    start_sec: clip.start_sec,
                    duration_sec: clip.duration_sec,
                    trim_start_sec: clip.trim_start_sec,
                    volume: clip.volume,
                });
            }
        }
        self.mixer.set_tracks(gains);
        self.audio.set_program(program);
        self.sequence = Some(seq);
    }

    /// Open a decode pipeline for one asset.
    pub fn open_asset(&mut self, meta: &MediaAssetMeta, decoder: Box<dyn FrameDecoder>) -> Result<()> {
        self.pipelines
            .open_asset(meta, decoder, self.config.pipeline.clone())
    }

    /// Open pipelines for every asset the sequence references, continuing
    /// past failures: playback then proceeds best-effort with degraded
    /// layers instead of waiting on a broken asset forever.
    pub fn open_assets_best_effort(
        &mut self,
        assets: &HashMap<Uuid, MediaAssetMeta>,
        make_decoder: &dyn Fn() -> Box<dyn FrameDecoder>,
    ) {
        let Some(seq) = self.sequence.clone() else {
            return;
        };
        if let Err(e) = open_sequence_assets(
            &mut self.pipelines,
            &seq,
            assets,
            make_decoder,
            &self.config.pipeline,
        ) {
            warn!(error = %e, "some assets failed to open; playing best-effort");
        }
    }

    /// Start playback from the current position.
    pub fn play(&mut self) -> Result<()> {
        match self.state {
            PreviewState::Detached => {
                return Err(MontageError::InvalidParameter(
                    "cannot play a detached preview".into(),
                ))
            }
            PreviewState::Playing => return Ok(()),
            _ => {}
        }
        let from = self.audio.current_time();
        info!(from, "preview play");
        self.audio.play(from);
        self.set_state(PreviewState::Playing);
        self.scheduler.request_tick();
        Ok(())
    }

    /// Stop playback, keeping the playhead where it is.
    pub fn pause(&mut self) {
        if self.state == PreviewState::Playing || self.state == PreviewState::Scrubbing {
            self.scheduler.cancel_tick();
            self.audio.pause();
            self.set_state(PreviewState::Paused);
        }
    }

    /// Move the playhead. While paused this redraws once; while playing the
    /// resync is deferred to the next tick so rapid seeks coalesce.
    pub fn seek(&mut self, time_sec: f64) -> Result<()> {
        let t = self.clamp_to_sequence(time_sec);
        if self.state == PreviewState::Playing {
            self.pending_seek = Some(t);
            self.pending_seek_clock = self.clock.now_sec();
            return Ok(());
        }
        self.audio.seek(t);
        self.render_once(t, FetchMode::Scrub)?;
        self.emit(PreviewEvent::Time { time_sec: t });
        Ok(())
    }

    /// Enter scrubbing: playback stops and seeks use the wider
    /// nearest-frame tolerance.
    pub fn begin_scrub(&mut self) {
        if self.state == PreviewState::Playing {
            self.scheduler.cancel_tick();
            self.audio.pause();
        }
        if self.state != PreviewState::Detached {
            self.set_state(PreviewState::Scrubbing);
        }
    }

    /// Leave scrubbing, back to paused.
    pub fn end_scrub(&mut self) {
        if self.state == PreviewState::Scrubbing {
            self.set_state(PreviewState::Paused);
        }
    }

    /// Resize the surface: the loop pauses, the surface reconfigures, one
    /// frame is redrawn, and the loop resumes only if it was running.
    pub fn resize(&mut self, width: u32, height: u32) -> Result<()> {
        let was_playing = self.state == PreviewState::Playing;
        if was_playing {
            self.scheduler.cancel_tick();
        }
        let Some(surface) = self.surface.as_mut() else {
            return Err(MontageError::InvalidParameter(
                "cannot resize a detached preview".into(),
            ));
        };
        surface.configure(width, height)?;
        let t = self.audio.current_time();
        self.render_once(t, FetchMode::Playback)?;
        if was_playing {
            self.scheduler.request_tick();
        }
        Ok(())
    }

    /// One render tick. The host calls this whenever the scheduler's
    /// request fires; overlapping calls coalesce through the gate.
    pub fn tick(&mut self) -> Result<()> {
        if self.state != PreviewState::Playing {
            return Ok(());
        }
        if !self.gate.try_begin() {
            return Ok(());
        }
        let outcome = self.tick_inner();
        self.gate.finish();
        if self.state == PreviewState::Playing {
            self.scheduler.request_tick();
        }
        outcome
    }

    fn tick_inner(&mut self) -> Result<()> {
        // Apply a debounced seek once the coalescing window has passed.
        if let Some(target) = self.pending_seek {
            if self.clock.now_sec() - self.pending_seek_clock >= self.config.seek_debounce_sec {
                self.pending_seek = None;
                debug!(target, "applying coalesced seek");
                self.audio.seek(target);
                if let Some(seq) = self.sequence.clone() {
                    self.pipelines.seek_sequence(&seq, target);
                }
            }
        }

        let t = self.audio.current_time();
        let duration = self.sequence.as_ref().map_or(0.0, |s| s.duration_sec);
        if duration > 0.0 && t >= duration {
            self.audio.pause();
            self.audio.seek(duration);
            self.set_state(PreviewState::Paused);
            self.render_once(duration, FetchMode::Playback)?;
            self.emit(PreviewEvent::Time { time_sec: duration });
            return Ok(());
        }

        self.audio.reap_finished();
        self.audio.schedule_entering();
        self.render_once(t, FetchMode::Playback)?;
        self.emit(PreviewEvent::Time { time_sec: t });
        Ok(())
    }

    /// Composite and present the frame at `t`. On a fully degraded frame the
    /// last good frame is held instead, so the viewer never sees a partial
    /// draw.
    fn render_once(&mut self, t: f64, mode: FetchMode) -> Result<()> {
        let Some(surface) = self.surface.as_mut() else {
            return Ok(());
        };
        let Some(seq) = self.sequence.as_ref() else {
            return Ok(());
        };
        let (w, h) = surface.size();
        let compositor = Compositor::new(w, h);
        let out = compositor.composite(seq, &mut self.pipelines, t, mode);
        if out.is_fully_degraded() {
            if let Some(held) = &self.last_frame {
                debug!(t, "holding last good frame");
                return surface.present(held);
            }
        }
        surface.present(&out.frame)?;
        self.last_frame = Some(out.frame);
        Ok(())
    }

    fn clamp_to_sequence(&self, t: f64) -> f64 {
        let max = self.sequence.as_ref().map_or(f64::MAX, |s| s.duration_sec);
        t.clamp(0.0, max.max(0.0))
    }

    fn set_state(&mut self, state: PreviewState) {
        if self.state != state {
            self.state = state;
            self.emit(PreviewEvent::State { state });
        }
    }

    fn emit(&self, event: PreviewEvent) {
        // Nobody listening is fine; the channel is unbounded.
        let _ = self.events_tx.send(event);
    }
}
