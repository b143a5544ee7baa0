//! Montage Core - Foundation types for the editing engine
//!
//! This crate provides the fundamental types used throughout Montage:
//! - Time representation (seconds, FrameRate, quantized cache ticks)
//! - Frame buffers and shared frame handles
//! - Media asset metadata and resolvable locations
//! - Error types

pub mod asset;
pub mod error;
pub mod frame;
pub mod time;

pub use asset::{AssetKind, AssetLocation, LocationFidelity, MediaAssetMeta, WaveformSummary};
pub use error::{MontageError, Result};
pub use frame::{FrameBuffer, FrameHandle, SharedFrameBuffer};
pub use time::{FrameRate, Ticks};

/// Engine-wide resource defaults.
pub mod defaults {
    /// Maximum decoded frames held per asset cache during interactive use.
    pub const FRAME_CACHE_CAPACITY: usize = 120;

    /// Look-ahead decoded past the requested time, in seconds.
    pub const DECODE_LOOKAHEAD_SEC: f64 = 0.5;

    /// Sliding window kept around the playback anchor, in seconds.
    pub const CACHE_WINDOW_SEC: f64 = 1.0;

    /// Nearest-cached-frame tolerance while scrubbing.
    pub const SCRUB_TOLERANCE_SEC: f64 = 0.25;

    /// Nearest-cached-frame tolerance during steady playback.
    pub const PLAYBACK_TOLERANCE_SEC: f64 = 0.08;

    /// Upper bound waited on asset open before playback proceeds best-effort.
    pub const ASSET_OPEN_WAIT_SEC: f64 = 5.0;

    /// Undo/redo history depth.
    pub const HISTORY_DEPTH: usize = 50;

    /// Mixdown sample rate for export.
    pub const MIX_SAMPLE_RATE: u32 = 48_000;
}
