//! Media asset metadata and resolvable locations.
//!
//! The backend collaborator hands the engine a table of these; the engine
//! never fetches or validates ownership itself. Each asset exposes at least
//! one resolvable location, ordered by fidelity: a proxy is preferred for
//! interactive work, the full-resolution source is required for export.

use crate::time::FrameRate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// What kind of media an asset holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetKind {
    Video,
    Audio,
    Image,
}

/// Fidelity tier of a resolvable location.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationFidelity {
    /// Low-resolution copy for responsive interactive editing.
    Proxy,
    /// Authoritative full-resolution media.
    Source,
    /// Raw URL of last resort.
    Raw,
}

/// One place an asset's bytes can be read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetLocation {
    pub fidelity: LocationFidelity,
    /// Path or URL understood by the decode layer.
    pub uri: String,
}

/// Per-bucket min/max peaks summarizing an audio asset for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaveformSummary {
    /// Number of source samples folded into each bucket.
    pub samples_per_bucket: usize,
    /// (min, max) amplitude per bucket, in [-1, 1].
    pub buckets: Vec<(f32, f32)>,
}

/// Metadata for one media asset referenced by clips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaAssetMeta {
    pub id: Uuid,
    pub name: String,
    pub kind: AssetKind,
    /// Source duration in seconds. Images report 0.
    pub duration_sec: f64,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub frame_rate: Option<FrameRate>,
    pub sample_rate: Option<u32>,
    pub channels: Option<u16>,
    /// Resolvable locations; at least one.
    pub locations: Vec<AssetLocation>,
    pub waveform: Option<WaveformSummary>,
}

impl MediaAssetMeta {
    /// Locations in the fixed resolution order: proxy, then source, then raw.
    pub fn locations_in_preference_order(&self) -> Vec<&AssetLocation> {
        let mut ordered: Vec<&AssetLocation> = self.locations.iter().collect();
        ordered.sort_by_key(|l| l.fidelity);
        ordered
    }

    /// The authoritative full-fidelity location, required for export.
    pub fn source_location(&self) -> Option<&AssetLocation> {
        self.locations
            .iter()
            .find(|l| l.fidelity == LocationFidelity::Source)
            .or_else(|| {
                self.locations
                    .iter()
                    .find(|l| l.fidelity == LocationFidelity::Raw)
            })
    }
}
