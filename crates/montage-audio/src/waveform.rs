//! Waveform peak summaries for display.

use montage_core::WaveformSummary;

/// Fold interleaved stereo PCM into per-bucket (min, max) peaks. Both
/// channels contribute to the same bucket, matching how editors draw a
/// single lane per track.
pub fn waveform_summary(interleaved: &[f32], samples_per_bucket: usize) -> WaveformSummary {
    let samples_per_bucket = samples_per_bucket.max(1);
    let mut buckets = Vec::with_capacity(interleaved.len() / samples_per_bucket + 1);
    for chunk in interleaved.chunks(samples_per_bucket) {
        let mut lo = f32::MAX;
        let mut hi = f32::MIN;
        for &s in chunk {
            lo = lo.min(s);
            hi = hi.max(s);
        }
        buckets.push((lo.clamp(-1.0, 1.0), hi.clamp(-1.0, 1.0)));
    }
    WaveformSummary {
        samples_per_bucket,
        buckets,
    }
}
