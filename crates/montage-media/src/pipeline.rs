//! Per-asset decode pipeline.
//!
//! One pipeline per media asset. Opening walks the asset's locations in
//! fidelity order (proxy, then source, then raw) and sticks with the first
//! that probes, so a playback session never mixes fidelities. Frame fetches
//! go through the cache; a miss decodes a look-ahead window anchored at the
//! nearest preceding keyframe and re-queries.

use crate::decoder::{FrameDecoder, SourceInfo};
use crate::frame_cache::FrameCache;
use montage_core::time::to_ticks;
use montage_core::{
    defaults, AssetKind, FrameHandle, LocationFidelity, MediaAssetMeta, MontageError, Result,
};
use tracing::{debug, info, warn};

/// Tunables for a decode pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub cache_capacity: usize,
    pub lookahead_sec: f64,
    pub cache_window_sec: f64,
    pub scrub_tolerance_sec: f64,
    pub playback_tolerance_sec: f64,
    /// Open the authoritative source location before the proxy. Interactive
    /// sessions keep this off; export requires full fidelity.
    pub prefer_source: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            cache_capacity: defaults::FRAME_CACHE_CAPACITY,
            lookahead_sec: defaults::DECODE_LOOKAHEAD_SEC,
            cache_window_sec: defaults::CACHE_WINDOW_SEC,
            scrub_tolerance_sec: defaults::SCRUB_TOLERANCE_SEC,
            playback_tolerance_sec: defaults::PLAYBACK_TOLERANCE_SEC,
            prefer_source: false,
        }
    }
}

impl PipelineConfig {
    /// Configuration for export jobs: full-fidelity sources, room for a
    /// whole clip, no trimming pressure from a tight capacity.
    pub fn for_export(max_frames: usize) -> Self {
        Self {
            cache_capacity: max_frames.max(defaults::FRAME_CACHE_CAPACITY),
            prefer_source: true,
            ..Default::default()
        }
    }
}

/// Who is asking for a frame; picks the nearest-frame fallback tolerance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchMode {
    Playback,
    Scrub,
}

/// Decode pipeline for a single asset.
pub struct DecodePipeline {
    asset: MediaAssetMeta,
    config: PipelineConfig,
    decoder: Box<dyn FrameDecoder>,
    source: Option<SourceInfo>,
    active_fidelity: Option<LocationFidelity>,
    keyframes: Vec<f64>,
    cache: FrameCache,
    export_mode: bool,
}

impl DecodePipeline {
    /// Create a pipeline; call [`DecodePipeline::open`] before fetching.
    pub fn new(asset: MediaAssetMeta, decoder: Box<dyn FrameDecoder>, config: PipelineConfig) -> Self {
        let cache = FrameCache::new(config.cache_capacity);
        Self {
            asset,
            config,
            decoder,
            source: None,
            active_fidelity: None,
            keyframes: Vec::new(),
            cache,
            export_mode: false,
        }
    }

    /// Open the asset, trying each location in preference order and failing
    /// only when every candidate fails.
    pub fn open(&mut self) -> Result<()> {
        let mut last_err = None;
        let mut candidates: Vec<(LocationFidelity, String)> = self
            .asset
            .locations_in_preference_order()
            .into_iter()
            .map(|l| (l.fidelity, l.uri.clone()))
            .collect();
        if self.config.prefer_source {
            // Source, then raw, then proxy: export never reads a proxy when
            // the authoritative media is reachable.
            candidates.sort_by_key(|&(f, _)| match f {
                LocationFidelity::Source => 0,
                LocationFidelity::Raw => 1,
                LocationFidelity::Proxy => 2,
            });
        }
        for (fidelity, uri) in candidates {
            match self.decoder.open(&uri) {
                Ok(source) => {
                    self.keyframes = match self.decoder.keyframes(&source) {
                        Ok(keys) => keys,
                        Err(e) => {
                            warn!(uri, error = %e, "keyframe index unavailable");
                            Vec::new()
                        }
                    };
                    info!(asset = %self.asset.name, uri, ?fidelity, "opened media source");
                    self.source = Some(source);
                    self.active_fidelity = Some(fidelity);
                    return Ok(());
                }
                Err(e) => {
                    warn!(uri, error = %e, "media location failed, trying next");
                    last_err = Some(e);
                }
            }
        }
        Err(last_err.unwrap_or_else(|| {
            MontageError::NotFound(format!("asset '{}' has no locations", self.asset.name))
        }))
    }

    pub fn is_open(&self) -> bool {
        self.source.is_some()
    }

    /// The fidelity tier playback locked onto at open time.
    pub fn active_fidelity(&self) -> Option<LocationFidelity> {
        self.active_fidelity
    }

    pub fn source_info(&self) -> Option<&SourceInfo> {
        self.source.as_ref()
    }

    pub fn asset(&self) -> &MediaAssetMeta {
        &self.asset
    }

    /// In export mode the cache is never trimmed, so a clip decoded once
    /// sequentially is reused for every frame of a deterministic render.
    pub fn set_export_mode(&mut self, on: bool) {
        self.export_mode = on;
    }

    pub fn cached_frames(&self) -> usize {
        self.cache.len()
    }

    /// Fetch the frame covering source time `t`. Returns `Ok(None)` when no
    /// frame could be produced, which the compositor treats as "hold the
    /// last good frame".
    pub fn frame_at(&mut self, t: f64, mode: FetchMode) -> Result<Option<FrameHandle>> {
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| MontageError::Decoder("pipeline is not open".into()))?
            .clone();

        if self.asset.kind == AssetKind::Image {
            return self.image_frame(&source);
        }

        let max_t = (source.duration_sec - source.frame_step() * 0.5).max(0.0);
        let t = t.clamp(0.0, max_t);
        let key = to_ticks(t);

        if let Some(hit) = self.cache.get(key) {
            return Ok(Some(hit));
        }

        self.decode_window(&source, t)?;
        if !self.export_mode {
            self.trim_to_window(t);
        }

        if let Some(hit) = self.cache.get(key) {
            return Ok(Some(hit));
        }
        let tolerance_sec = match mode {
            FetchMode::Playback => self.config.playback_tolerance_sec,
            FetchMode::Scrub => self.config.scrub_tolerance_sec,
        };
        Ok(self.cache.nearest_within(key, to_ticks(tolerance_sec)))
    }

    /// Flush decoder state, drop every cached frame, and re-decode around
    /// `t`. Any `frame_at` issued after this sees only post-seek frames.
    pub fn seek(&mut self, t: f64) -> Result<()> {
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| MontageError::Decoder("pipeline is not open".into()))?
            .clone();
        self.cache.clear();
        if self.asset.kind == AssetKind::Image {
            return Ok(());
        }
        let t = t.clamp(0.0, source.duration_sec.max(0.0));
        self.decode_window(&source, t)?;
        debug!(asset = %self.asset.name, t, "seek re-primed cache");
        Ok(())
    }

    /// Decode `[start, end)` sequentially into the cache. Export jobs call
    /// this once per clip with export mode on.
    pub fn prefetch(&mut self, start_sec: f64, end_sec: f64) -> Result<usize> {
        let source = self
            .source
            .as_ref()
            .ok_or_else(|| MontageError::Decoder("pipeline is not open".into()))?
            .clone();
        if self.asset.kind == AssetKind::Image {
            return self.image_frame(&source).map(|f| usize::from(f.is_some()));
        }
        let step = source.frame_step();
        let start = self.anchor_before(start_sec.max(0.0));
        let end = end_sec.min(source.duration_sec);
        if end <= start {
            return Ok(0);
        }
        let count = ((end - start) / step).ceil() as u32;
        let frames = self.decoder.decode_span(&source, start, count)?;
        let decoded = frames.len();
        for (i, frame) in frames.into_iter().enumerate() {
            let pts = start + i as f64 * step;
            self.cache.put(to_ticks(pts), FrameHandle::new(pts, frame));
        }
        Ok(decoded)
    }

    /// Nearest keyframe at or before `t`; falls back to `t` itself, where
    /// the backend's own input seek lands on the preceding keyframe.
    fn anchor_before(&self, t: f64) -> f64 {
        self.keyframes
            .iter()
            .copied()
            .take_while(|&k| k <= t)
            .last()
            .unwrap_or(t)
    }

    fn decode_window(&mut self, source: &SourceInfo, t: f64) -> Result<()> {
        let step = source.frame_step();
        let start = self.anchor_before(t);
        let end = (t + self.config.lookahead_sec).min(source.duration_sec.max(step));
        let span = (end - start).max(step);
        // Bound a single decode run; a distant keyframe must not balloon it.
        let count = ((span / step).ceil() as u32).clamp(1, 512);

        let frames = self.decoder.decode_span(source, start, count)?;
        debug!(
            asset = %self.asset.name,
            start,
            requested = count,
            decoded = frames.len(),
            "decoded window"
        );
        for (i, frame) in frames.into_iter().enumerate() {
            let pts = start + i as f64 * step;
            self.cache.put(to_ticks(pts), FrameHandle::new(pts, frame));
        }
        Ok(())
    }

    /// Single-frame stills: decode once, serve forever.
    fn image_frame(&mut self, source: &SourceInfo) -> Result<Option<FrameHandle>> {
        if let Some(hit) = self.cache.get(0) {
            return Ok(Some(hit));
        }
        let mut frames = self.decoder.decode_span(source, 0.0, 1)?;
        match frames.pop() {
            Some(frame) => {
                self.cache.put(0, FrameHandle::new(0.0, frame));
                Ok(self.cache.get(0))
            }
            None => Ok(None),
        }
    }

    /// Drop cached frames outside the sliding window around `anchor_sec`.
    fn trim_to_window(&mut self, anchor_sec: f64) {
        let lo = to_ticks(anchor_sec - self.config.cache_window_sec);
        let hi = to_ticks(anchor_sec + self.config.cache_window_sec + self.config.lookahead_sec);
        self.cache.sweep(|key| key < lo || key > hi);
    }
}

impl std::fmt::Debug for DecodePipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DecodePipeline")
            .field("asset", &self.asset.name)
            .field("open", &self.is_open())
            .field("cached", &self.cache.len())
            .field("export_mode", &self.export_mode)
            .finish()
    }
}
