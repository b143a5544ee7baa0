//! Canvas layout: aspect-preserving scale and alpha-over blits.

use montage_core::FrameBuffer;

/// Placement of a source inside a canvas, letterboxed or pillarboxed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FitRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

/// The largest rect with the source's aspect ratio that fits the canvas,
/// centered. Bars appear top/bottom (letterbox) or left/right (pillarbox).
pub fn fit_rect(src_w: u32, src_h: u32, canvas_w: u32, canvas_h: u32) -> FitRect {
    if src_w == 0 || src_h == 0 || canvas_w == 0 || canvas_h == 0 {
        return FitRect {
            x: 0,
            y: 0,
            width: 0,
            height: 0,
        };
    }
    let scale = (f64::from(canvas_w) / f64::from(src_w))
        .min(f64::from(canvas_h) / f64::from(src_h));
    let width = ((f64::from(src_w) * scale).round() as u32).clamp(1, canvas_w);
    let height = ((f64::from(src_h) * scale).round() as u32).clamp(1, canvas_h);
    FitRect {
        x: (canvas_w - width) / 2,
        y: (canvas_h - height) / 2,
        width,
        height,
    }
}

/// Scale `src` into a black canvas of the given size, preserving aspect
/// ratio. Nearest-neighbor; preview and export share this path so both see
/// identical framing.
pub fn letterbox(src: &FrameBuffer, canvas_w: u32, canvas_h: u32) -> FrameBuffer {
    let mut canvas = FrameBuffer::black(canvas_w, canvas_h);
    let rect = fit_rect(src.width, src.height, canvas_w, canvas_h);
    if rect.width == 0 || rect.height == 0 {
        return canvas;
    }
    let stride = canvas_w as usize * 4;
    let src_stride = src.width as usize * 4;
    for dy in 0..rect.height {
        let sy = (dy as u64 * u64::from(src.height) / u64::from(rect.height)) as usize;
        let dst_row = (rect.y + dy) as usize * stride;
        let src_row = sy * src_stride;
        for dx in 0..rect.width {
            let sx = (dx as u64 * u64::from(src.width) / u64::from(rect.width)) as usize;
            let d = dst_row + (rect.x + dx) as usize * 4;
            let s = src_row + sx * 4;
            canvas.data[d..d + 4].copy_from_slice(&src.data[s..s + 4]);
        }
    }
    canvas
}

/// Alpha-over `src` onto `dst` at `opacity`. Both frames must be the same
/// size; mismatched layers are skipped by the compositor before this point.
pub fn blit_over(dst: &mut FrameBuffer, src: &FrameBuffer, opacity: f64) {
    debug_assert_eq!((dst.width, dst.height), (src.width, src.height));
    let opacity = opacity.clamp(0.0, 1.0) as f32;
    if opacity <= 0.0 {
        return;
    }
    for (d, s) in dst.data.chunks_exact_mut(4).zip(src.data.chunks_exact(4)) {
        let alpha = f32::from(s[3]) / 255.0 * opacity;
        if alpha <= 0.0 {
            continue;
        }
        let inv = 1.0 - alpha;
        for c in 0..3 {
            d[c] = (f32::from(s[c]) * alpha + f32::from(d[c]) * inv) as u8;
        }
        d[3] = 255;
    }
}
