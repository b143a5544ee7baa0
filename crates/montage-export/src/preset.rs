//! Export formats, presets, and the request/response contract.

use montage_core::FrameRate;
use montage_timeline::Sequence;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Output resolution preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResolutionPreset {
    Hd720,
    Hd1080,
    Uhd4k,
    /// Use the sequence's own canvas size.
    Sequence,
}

impl ResolutionPreset {
    /// Fixed dimensions, or `None` for [`ResolutionPreset::Sequence`].
    pub fn dimensions(self) -> Option<(u32, u32)> {
        match self {
            Self::Hd720 => Some((1280, 720)),
            Self::Hd1080 => Some((1920, 1080)),
            Self::Uhd4k => Some((3840, 2160)),
            Self::Sequence => None,
        }
    }
}

/// Encoding quality preset, mapped to a CRF per codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QualityPreset {
    Draft,
    Normal,
    High,
}

/// Output container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Container {
    Mp4,
    Mov,
    WebM,
}

impl Container {
    pub fn extension(self) -> &'static str {
        match self {
            Self::Mp4 => "mp4",
            Self::Mov => "mov",
            Self::WebM => "webm",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            Self::Mp4 => "video/mp4",
            Self::Mov => "video/quicktime",
            Self::WebM => "video/webm",
        }
    }

    /// The codec this container is exported with.
    pub fn video_codec(self) -> VideoCodec {
        match self {
            Self::Mp4 => VideoCodec::H264,
            Self::Mov => VideoCodec::ProRes422,
            Self::WebM => VideoCodec::Vp9,
        }
    }
}

/// Video codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum VideoCodec {
    H264,
    ProRes422,
    Vp9,
}

impl VideoCodec {
    /// FFmpeg encoder name.
    pub fn ffmpeg_encoder(self) -> &'static str {
        match self {
            Self::H264 => "libx264",
            Self::ProRes422 => "prores_ks",
            Self::Vp9 => "libvpx-vp9",
        }
    }

    /// CRF for a quality preset; `None` for codecs that do not take one.
    pub fn crf_for(self, quality: QualityPreset) -> Option<u32> {
        match self {
            Self::H264 => Some(match quality {
                QualityPreset::Draft => 28,
                QualityPreset::Normal => 18,
                QualityPreset::High => 14,
            }),
            Self::Vp9 => Some(match quality {
                QualityPreset::Draft => 40,
                QualityPreset::Normal => 30,
                QualityPreset::High => 24,
            }),
            Self::ProRes422 => None,
        }
    }
}

/// Audio codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AudioCodec {
    Aac,
    Opus,
    Flac,
    Pcm,
}

impl AudioCodec {
    /// FFmpeg encoder name.
    pub fn ffmpeg_encoder(self) -> &'static str {
        match self {
            Self::Aac => "aac",
            Self::Opus => "libopus",
            Self::Flac => "flac",
            Self::Pcm => "pcm_s16le",
        }
    }

    /// Capability probe order: the first supported entry wins.
    pub const PREFERENCE_ORDER: [AudioCodec; 4] =
        [Self::Aac, Self::Opus, Self::Flac, Self::Pcm];
}

/// An export request as handed over by the backend collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRequest {
    pub sequence_id: Uuid,
    pub resolution: ResolutionPreset,
    pub quality: QualityPreset,
    pub container: Container,
    pub include_audio: bool,
}

impl ExportRequest {
    pub fn new(sequence_id: Uuid) -> Self {
        Self {
            sequence_id,
            resolution: ResolutionPreset::Hd1080,
            quality: QualityPreset::Normal,
            container: Container::Mp4,
            include_audio: true,
        }
    }
}

/// Fully resolved encoding parameters for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFormat {
    pub width: u32,
    pub height: u32,
    pub frame_rate: FrameRate,
    pub container: Container,
    pub video_codec: VideoCodec,
    /// Chosen by capability probing; `None` when audio is excluded.
    pub audio_codec: Option<AudioCodec>,
    pub crf: Option<u32>,
    pub sample_rate: u32,
}

impl ExportFormat {
    /// Resolve a request against the sequence it targets. The audio codec
    /// stays unset until the encoder capability probe picks one.
    pub fn resolve(request: &ExportRequest, seq: &Sequence) -> Self {
        let (width, height) = request
            .resolution
            .dimensions()
            .unwrap_or((seq.width, seq.height));
        let video_codec = request.container.video_codec();
        Self {
            width,
            height,
            frame_rate: seq.frame_rate,
            container: request.container,
            video_codec,
            audio_codec: None,
            crf: video_codec.crf_for(request.quality),
            sample_rate: montage_core::defaults::MIX_SAMPLE_RATE,
        }
    }
}

/// Progress notification streamed during a run. `progress` is a monotonic
/// percentage in [0, 100].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportProgress {
    pub progress: f64,
    pub status: String,
}

/// A finished export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportPayload {
    pub data: Vec<u8>,
    pub mime: &'static str,
}

/// How a run ended. Cancellation is an outcome, not an error: a cancelled
/// job returns this instead of a partially-muxed payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExportOutcome {
    Finished(ExportPayload),
    Cancelled,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolution_dimensions() {
        assert_eq!(ResolutionPreset::Hd1080.dimensions(), Some((1920, 1080)));
        assert_eq!(ResolutionPreset::Sequence.dimensions(), None);
    }

    #[test]
    fn test_format_resolves_sequence_canvas() {
        let seq = Sequence::new("S", 640, 360, FrameRate::FPS_24);
        let mut request = ExportRequest::new(seq.id);
        request.resolution = ResolutionPreset::Sequence;
        let format = ExportFormat::resolve(&request, &seq);
        assert_eq!((format.width, format.height), (640, 360));
        assert_eq!(format.frame_rate, FrameRate::FPS_24);
        assert_eq!(format.video_codec, VideoCodec::H264);
        assert_eq!(format.crf, Some(18));
        assert!(format.audio_codec.is_none());
    }

    #[test]
    fn test_container_codec_mapping() {
        assert_eq!(Container::WebM.video_codec().ffmpeg_encoder(), "libvpx-vp9");
        assert_eq!(Container::Mov.video_codec().crf_for(QualityPreset::High), None);
        assert_eq!(Container::Mp4.mime(), "video/mp4");
    }

    #[test]
    fn test_audio_preference_order() {
        let names: Vec<&str> = AudioCodec::PREFERENCE_ORDER
            .iter()
            .map(|c| c.ffmpeg_encoder())
            .collect();
        assert_eq!(names, ["aac", "libopus", "flac", "pcm_s16le"]);
    }

    #[test]
    fn test_request_roundtrips_through_serde() {
        let request = ExportRequest::new(Uuid::new_v4());
        let json = serde_json::to_string(&request).unwrap();
        let back: ExportRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(request, back);
    }
}
