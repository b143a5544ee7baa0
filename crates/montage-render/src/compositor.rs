//! Deterministic frame compositing.
//!
//! [`Compositor::composite`] turns a sequence, a set of decode pipelines,
//! and a timeline time into one canvas-sized RGBA frame. The preview loop
//! and the export walk both call this, so a frame composed at time `t`
//! is identical in either path.

use crate::effects::apply_effects;
use crate::layout::{blit_over, letterbox};
use crate::resolve::{resolve_at, ActiveLayer, LayerContent};
use crate::transition::render_transition;
use montage_core::{FrameBuffer, MediaAssetMeta, MontageError, Result};
use montage_media::{DecodePipeline, FetchMode, FrameDecoder, PipelineConfig};
use montage_timeline::{Clip, Sequence};
use std::collections::HashMap;
use tracing::warn;
use uuid::Uuid;

/// The decode pipelines owned by one rendering session or export job.
/// Never shared between the interactive session and an export.
#[derive(Default)]
pub struct PipelineSet {
    pipelines: HashMap<Uuid, DecodePipeline>,
}

impl PipelineSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a pipeline for an asset. Replaces any existing pipeline for the
    /// same asset id.
    pub fn open_asset(
        &mut self,
        asset: &MediaAssetMeta,
        decoder: Box<dyn FrameDecoder>,
        config: PipelineConfig,
    ) -> Result<()> {
        let mut pipeline = DecodePipeline::new(asset.clone(), decoder, config);
        pipeline.open()?;
        self.pipelines.insert(asset.id, pipeline);
        Ok(())
    }

    pub fn pipeline_mut(&mut self, media_id: Uuid) -> Option<&mut DecodePipeline> {
        self.pipelines.get_mut(&media_id)
    }

    pub fn contains(&self, media_id: Uuid) -> bool {
        self.pipelines.contains_key(&media_id)
    }

    pub fn len(&self) -> usize {
        self.pipelines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pipelines.is_empty()
    }

    /// Flip export mode on every pipeline (no cache trimming).
    pub fn set_export_mode(&mut self, on: bool) {
        for pipeline in self.pipelines.values_mut() {
            pipeline.set_export_mode(on);
        }
    }

    /// Seek every pipeline toward the source times implied by `time_sec`.
    /// Pipelines whose asset is not under the playhead are left alone.
    pub fn seek_sequence(&mut self, seq: &Sequence, time_sec: f64) {
        for layer in resolve_at(seq, time_sec) {
            let clip = layer.primary_clip();
            if let Some(pipeline) = self.pipelines.get_mut(&clip.media_id) {
                let src = clip.source_time_at(time_sec);
                if let Err(e) = pipeline.seek(src) {
                    warn!(error = %e, "seek failed; pipeline will decode on demand");
                }
            }
        }
    }
}

/// Result of compositing one timeline instant.
#[derive(Debug)]
pub struct CompositeOutput {
    pub frame: FrameBuffer,
    /// Layers that contributed pixels.
    pub drawn_layers: usize,
    /// Layers skipped because no frame could be produced.
    pub missing_layers: usize,
}

impl CompositeOutput {
    /// True when something was resolved but nothing could be drawn; the
    /// caller should hold its last good frame instead of presenting this.
    pub fn is_fully_degraded(&self) -> bool {
        self.drawn_layers == 0 && self.missing_layers > 0
    }
}

/// Composites resolved layers onto a fixed-size canvas.
#[derive(Debug, Clone, Copy)]
pub struct Compositor {
    pub width: u32,
    pub height: u32,
}

impl Compositor {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn for_sequence(seq: &Sequence) -> Self {
        Self::new(seq.width, seq.height)
    }

    /// Compose the frame at `time_sec`. Decode failures degrade the affected
    /// layer rather than failing the whole frame; the output reports how many
    /// layers were drawn versus missing.
    pub fn composite(
        &self,
        seq: &Sequence,
        pipelines: &mut PipelineSet,
        time_sec: f64,
        mode: FetchMode,
    ) -> CompositeOutput {
        let mut canvas = FrameBuffer::black(self.width, self.height);
        let mut drawn = 0usize;
        let mut missing = 0usize;

        for layer in resolve_at(seq, time_sec) {
            match self.render_layer(&layer, pipelines, time_sec, mode) {
                Some(rendered) => {
                    blit_over(&mut canvas, &rendered, layer.primary_clip().opacity);
                    drawn += 1;
                }
                None => missing += 1,
            }
        }

        CompositeOutput {
            frame: canvas,
            drawn_layers: drawn,
            missing_layers: missing,
        }
    }

    /// Produce one canvas-sized layer, or `None` when its media is absent.
    fn render_layer(
        &self,
        layer: &ActiveLayer<'_>,
        pipelines: &mut PipelineSet,
        time_sec: f64,
        mode: FetchMode,
    ) -> Option<FrameBuffer> {
        match &layer.content {
            LayerContent::Single(clip) => self.clip_frame(clip, pipelines, time_sec, mode),
            LayerContent::Transition {
                outgoing,
                incoming,
                kind,
                progress,
            } => {
                // Fetch both sides before composing anything, so the pair is
                // always consistent within one presented frame.
                let b = self.clip_frame(incoming, pipelines, time_sec, mode);
                let a = outgoing
                    .and_then(|clip| self.clip_frame(clip, pipelines, time_sec, mode));
                match (a, b) {
                    (Some(a), Some(b)) => Some(render_transition(*kind, &a, &b, *progress)),
                    // One side missing: dip/wipe from black keeps motion
                    // continuous instead of popping.
                    (Some(a), None) => {
                        let black = FrameBuffer::black(self.width, self.height);
                        Some(render_transition(*kind, &a, &black, *progress))
                    }
                    (None, Some(b)) => {
                        let black = FrameBuffer::black(self.width, self.height);
                        Some(render_transition(*kind, &black, &b, *progress))
                    }
                    (None, None) => None,
                }
            }
        }
    }

    /// Fetch, effect, and letterbox one clip's frame at a timeline time.
    fn clip_frame(
        &self,
        clip: &Clip,
        pipelines: &mut PipelineSet,
        time_sec: f64,
        mode: FetchMode,
    ) -> Option<FrameBuffer> {
        let pipeline = pipelines.pipeline_mut(clip.media_id)?;
        let source_time = clip.source_time_at(time_sec);
        let handle = match pipeline.frame_at(source_time, mode) {
            Ok(Some(handle)) => handle,
            Ok(None) => return None,
            Err(e) => {
                warn!(clip = %clip.id, error = %e, "frame fetch failed");
                return None;
            }
        };
        let mut frame = handle.buffer().map(|b| b.as_ref().clone())?;
        apply_effects(&mut frame, &clip.effects);
        Some(letterbox(&frame, self.width, self.height))
    }
}

impl std::fmt::Debug for PipelineSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PipelineSet")
            .field("assets", &self.pipelines.len())
            .finish()
    }
}

/// Open pipelines for every asset referenced by a sequence's clips,
/// skipping assets that are already open. Assets whose every location fails
/// are reported; callers decide whether that is fatal (export) or a
/// degraded preview.
pub fn open_sequence_assets(
    pipelines: &mut PipelineSet,
    seq: &Sequence,
    assets: &HashMap<Uuid, MediaAssetMeta>,
    make_decoder: &dyn Fn() -> Box<dyn FrameDecoder>,
    config: &PipelineConfig,
) -> Result<()> {
    let mut last_err = None;
    for track in &seq.tracks {
        for clip in &track.clips {
            if pipelines.contains(clip.media_id) {
                continue;
            }
            let Some(meta) = assets.get(&clip.media_id) else {
                warn!(clip = %clip.id, media = %clip.media_id, "clip references unknown asset");
                last_err = Some(MontageError::NotFound(format!(
                    "asset {} referenced by clip {}",
                    clip.media_id, clip.id
                )));
                continue;
            };
            if let Err(e) = pipelines.open_asset(meta, make_decoder(), config.clone()) {
                warn!(asset = %meta.name, error = %e, "asset failed to open");
                last_err = Some(e);
            }
        }
    }
    match last_err {
        Some(e) => Err(e),
        None => Ok(()),
    }
}
