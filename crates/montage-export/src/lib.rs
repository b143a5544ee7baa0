//! Montage Export - offline rendering to a container file
//!
//! Not real-time: a job walks the sequence frame by frame at the target
//! rate, composites each instant through the same compositor the preview
//! uses, mixes program audio down to one stereo stream, and muxes both into
//! a container via ffmpeg. Jobs run on their own thread with their own
//! decode pipelines and caches, report monotonic progress, and treat
//! cancellation as a first-class outcome distinct from failure.

pub mod job;
pub mod mixdown;
pub mod preset;
pub mod sink;

pub use job::{run_export, spawn_export, CancelToken, ExportHandle, ProgressReporter};
pub use mixdown::{mix_sequence, FfmpegPcmSource, PcmSource};
pub use preset::{
    AudioCodec, Container, ExportFormat, ExportOutcome, ExportPayload, ExportProgress,
    ExportRequest, QualityPreset, ResolutionPreset, VideoCodec,
};
pub use sink::{pick_audio_codec, probe_ffmpeg_audio_encoders, EncoderSink, FfmpegSink};
