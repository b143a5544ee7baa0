//! The export job: deterministic frame walk, mixdown, and mux.
//!
//! A job owns its decode pipelines and caches, runs on its own thread, and
//! talks back through a progress channel. Cancellation is cooperative,
//! checked once per frame boundary; a cancelled job tears the sink down and
//! reports [`ExportOutcome::Cancelled`] rather than a partial payload.

use crate::mixdown::{mix_sequence, FfmpegPcmSource, PcmSource};
use crate::preset::{ExportFormat, ExportOutcome, ExportPayload, ExportProgress, ExportRequest};
use crate::sink::{pick_audio_codec, EncoderSink, FfmpegSink};
use crossbeam_channel::{unbounded, Receiver, Sender};
use montage_core::{MediaAssetMeta, MontageError, Result};
use montage_media::{FetchMode, FfmpegDecoder, FrameDecoder, PipelineConfig};
use montage_render::{open_sequence_assets, Compositor, PipelineSet};
use montage_timeline::Sequence;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{info, warn};
use uuid::Uuid;

/// Shared cancellation flag for a running job.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// Sends progress as a monotonic percentage: an update below the high-water
/// mark is lifted to it, so consumers never see progress move backward.
pub struct ProgressReporter {
    tx: Option<Sender<ExportProgress>>,
    high_water: f64,
}

impl ProgressReporter {
    pub fn new(tx: Sender<ExportProgress>) -> Self {
        Self {
            tx: Some(tx),
            high_water: 0.0,
        }
    }

    /// A reporter that drops every update.
    pub fn sink() -> Self {
        Self {
            tx: None,
            high_water: 0.0,
        }
    }

    pub fn report(&mut self, progress: f64, status: impl Into<String>) {
        self.high_water = self.high_water.max(progress.clamp(0.0, 100.0));
        if let Some(tx) = &self.tx {
            let _ = tx.send(ExportProgress {
                progress: self.high_water,
                status: status.into(),
            });
        }
    }
}

/// Run one export to completion, cancellation, or failure.
///
/// The caller supplies the seams: a decoder factory for the job's own
/// pipelines, a PCM source for mixdown, and the encoder sink. Real exports
/// go through [`spawn_export`], which wires the ffmpeg-backed set.
pub fn run_export(
    seq: &Sequence,
    assets: &HashMap<Uuid, MediaAssetMeta>,
    request: &ExportRequest,
    make_decoder: &dyn Fn() -> Box<dyn FrameDecoder>,
    pcm_source: &dyn PcmSource,
    sink: &mut dyn EncoderSink,
    progress: &mut ProgressReporter,
    cancel: &CancelToken,
) -> Result<ExportOutcome> {
    let mut format = ExportFormat::resolve(request, seq);
    let fps = format.frame_rate.to_fps_f64();
    let total_frames = (seq.duration_sec * fps).ceil() as u64;
    if total_frames == 0 {
        return Err(MontageError::InvalidParameter(
            "sequence has no content to export".into(),
        ));
    }

    if request.include_audio {
        let supported = sink.supported_audio_codecs()?;
        let codec = pick_audio_codec(&supported).ok_or_else(|| {
            MontageError::Encoder("no supported audio encoder among candidates".into())
        })?;
        info!(codec = codec.ffmpeg_encoder(), "audio encoder negotiated");
        format.audio_codec = Some(codec);
    }

    progress.report(1.0, "Preparing media");
    let mut pipelines = PipelineSet::new();
    open_sequence_assets(
        &mut pipelines,
        seq,
        assets,
        make_decoder,
        &PipelineConfig::for_export(total_frames as usize),
    )?;
    pipelines.set_export_mode(true);

    let audio = if request.include_audio {
        progress.report(3.0, "Mixing audio");
        if cancel.is_cancelled() {
            return Ok(ExportOutcome::Cancelled);
        }
        Some(mix_sequence(seq, assets, format.sample_rate, pcm_source)?)
    } else {
        None
    };

    sink.begin(&format, audio.as_ref())?;
    let compositor = Compositor::new(format.width, format.height);

    for frame_index in 0..total_frames {
        if cancel.is_cancelled() {
            warn!(frame_index, "export cancelled");
            sink.abort();
            return Ok(ExportOutcome::Cancelled);
        }
        let t = frame_index as f64 / fps;
        let out = compositor.composite(seq, &mut pipelines, t, FetchMode::Playback);
        sink.write_frame(&out.frame.data)?;

        if frame_index % 10 == 0 || frame_index + 1 == total_frames {
            let fraction = (frame_index + 1) as f64 / total_frames as f64;
            progress.report(
                5.0 + fraction * 90.0,
                format!("Rendering frame {}/{total_frames}", frame_index + 1),
            );
        }
    }

    progress.report(97.0, "Finalizing container");
    let data = sink.finish()?;
    progress.report(100.0, "Complete");
    info!(frames = total_frames, bytes = data.len(), "export finished");
    Ok(ExportOutcome::Finished(ExportPayload {
        data,
        mime: format.container.mime(),
    }))
}

/// A running export job.
pub struct ExportHandle {
    thread: JoinHandle<Result<ExportOutcome>>,
    progress: Receiver<ExportProgress>,
    cancel: CancelToken,
}

impl ExportHandle {
    /// Progress notifications, streamed while the job runs.
    pub fn progress(&self) -> &Receiver<ExportProgress> {
        &self.progress
    }

    /// Request cooperative cancellation.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Wait for the job to end.
    pub fn join(self) -> Result<ExportOutcome> {
        self.thread
            .join()
            .map_err(|_| MontageError::Encoder("export thread panicked".into()))?
    }
}

/// Spawn an export on its own thread with the ffmpeg-backed decoder, PCM
/// source, and sink. The job owns isolated pipeline and cache instances, so
/// a long export never contends with interactive playback.
pub fn spawn_export(
    seq: Sequence,
    assets: HashMap<Uuid, MediaAssetMeta>,
    request: ExportRequest,
) -> ExportHandle {
    let (tx, rx) = unbounded();
    let cancel = CancelToken::new();
    let job_cancel = cancel.clone();
    let thread = std::thread::spawn(move || {
        let mut sink = FfmpegSink::new();
        let mut progress = ProgressReporter::new(tx);
        run_export(
            &seq,
            &assets,
            &request,
            &|| Box::new(FfmpegDecoder),
            &FfmpegPcmSource,
            &mut sink,
            &mut progress,
            &job_cancel,
        )
    });
    ExportHandle {
        thread,
        progress: rx,
        cancel,
    }
}
