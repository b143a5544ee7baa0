//! Montage Media - decode pipelines and the frame cache
//!
//! This crate turns compressed media into cached RGBA frames:
//! - `probe`: ffprobe-based stream metadata and keyframe indexing
//! - `decoder`: the [`FrameDecoder`] seam plus the ffmpeg subprocess backend
//! - `frame_cache`: bounded LRU store of decoded frames keyed by time
//! - `pipeline`: the per-asset decode pipeline gluing the above together
//! - `audio`: compressed audio to interleaved stereo f32 PCM
//! - `thumbnails`: low-resolution strips sampled across an asset
//!
//! Nothing here mutates the timeline model; pipelines are pulled by the
//! preview compositor and by export jobs, each owning its own instances.

pub mod audio;
pub mod decoder;
pub mod frame_cache;
pub mod pipeline;
pub mod probe;
pub mod thumbnails;

pub use audio::AudioPcm;
pub use decoder::{FfmpegDecoder, FrameDecoder, SourceInfo};
pub use frame_cache::FrameCache;
pub use pipeline::{DecodePipeline, FetchMode, PipelineConfig};
