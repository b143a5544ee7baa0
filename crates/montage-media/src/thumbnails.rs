//! Thumbnail strips: small frames sampled evenly across an asset.

use crate::decoder::{FrameDecoder, SourceInfo};
use montage_core::{FrameBuffer, Result};

/// Downscale a frame with nearest-neighbor sampling, preserving aspect.
pub fn downscale_to_height(frame: &FrameBuffer, target_height: u32) -> FrameBuffer {
    if frame.height == 0 || frame.width == 0 || target_height >= frame.height {
        return frame.clone();
    }
    let target_height = target_height.max(1);
    let target_width =
        ((frame.width as u64 * target_height as u64) / frame.height as u64).max(1) as u32;
    let mut out = FrameBuffer::black(target_width, target_height);
    for y in 0..target_height {
        let src_y = (y as u64 * frame.height as u64 / target_height as u64) as u32;
        for x in 0..target_width {
            let src_x = (x as u64 * frame.width as u64 / target_width as u64) as u32;
            let src = ((src_y * frame.width + src_x) * 4) as usize;
            let dst = ((y * target_width + x) * 4) as usize;
            out.data[dst..dst + 4].copy_from_slice(&frame.data[src..src + 4]);
        }
    }
    out
}

/// Decode `count` evenly spaced thumbnails of `height` pixels.
pub fn thumbnail_strip(
    decoder: &dyn FrameDecoder,
    info: &SourceInfo,
    count: usize,
    height: u32,
) -> Result<Vec<FrameBuffer>> {
    if count == 0 || info.duration_sec <= 0.0 {
        return Ok(Vec::new());
    }
    let mut strip = Vec::with_capacity(count);
    for i in 0..count {
        // Sample mid-interval so the first thumb is not always a title card.
        let t = info.duration_sec * (i as f64 + 0.5) / count as f64;
        let mut frames = decoder.decode_span(info, t, 1)?;
        if let Some(frame) = frames.pop() {
            strip.push(downscale_to_height(&frame, height));
        }
    }
    Ok(strip)
}
