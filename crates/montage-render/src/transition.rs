//! Transition rendering between an outgoing and an incoming frame.
//!
//! Both input frames are canvas-sized RGBA8; callers fetch and letterbox A
//! and B before blending so one presented frame always shows a consistent
//! A/B pair. Progress arrives already eased, 0 = pure A, 1 = pure B.

use montage_core::FrameBuffer;
use montage_timeline::TransitionKind;

/// Blend `a` (outgoing) and `b` (incoming) at eased `progress`.
pub fn render_transition(
    kind: TransitionKind,
    a: &FrameBuffer,
    b: &FrameBuffer,
    progress: f64,
) -> FrameBuffer {
    let p = progress.clamp(0.0, 1.0) as f32;
    let (w, h) = (a.width, a.height);
    let mut out = FrameBuffer::black(w, h);
    match kind {
        TransitionKind::Crossfade => crossfade(&mut out, a, b, p),
        TransitionKind::DipToBlack => dip(&mut out, a, b, p, 0),
        TransitionKind::DipToWhite => dip(&mut out, a, b, p, 255),
        TransitionKind::Wipe => wipe(&mut out, a, b, p),
        TransitionKind::Push => push(&mut out, a, b, p),
        TransitionKind::Iris => iris(&mut out, a, b, p),
    }
    out
}

fn crossfade(out: &mut FrameBuffer, a: &FrameBuffer, b: &FrameBuffer, p: f32) {
    let ip = 1.0 - p;
    for ((o, &ap), &bp) in out.data.iter_mut().zip(&a.data).zip(&b.data) {
        *o = (f32::from(ap) * ip + f32::from(bp) * p) as u8;
    }
}

/// First half fades A toward the dip color, second half fades it up to B.
fn dip(out: &mut FrameBuffer, a: &FrameBuffer, b: &FrameBuffer, p: f32, dip_value: u8) {
    let (src, fade) = if p < 0.5 {
        (a, 1.0 - p * 2.0)
    } else {
        (b, (p - 0.5) * 2.0)
    };
    let base = f32::from(dip_value);
    for (i, (o, &s)) in out.data.iter_mut().zip(&src.data).enumerate() {
        *o = if i % 4 == 3 {
            255
        } else {
            (base + (f32::from(s) - base) * fade) as u8
        };
    }
}

/// Left-to-right reveal of B.
fn wipe(out: &mut FrameBuffer, a: &FrameBuffer, b: &FrameBuffer, p: f32) {
    let w = out.width as usize;
    let stride = w * 4;
    for (y, row) in out.data.chunks_exact_mut(stride).enumerate() {
        let off = y * stride;
        for x in 0..w {
            let use_b = (x as f32 / w as f32) < p;
            let src = if use_b { &b.data } else { &a.data };
            let idx = x * 4;
            row[idx..idx + 4].copy_from_slice(&src[off + idx..off + idx + 4]);
        }
    }
}

/// B pushes A out to the left.
fn push(out: &mut FrameBuffer, a: &FrameBuffer, b: &FrameBuffer, p: f32) {
    let w = out.width as usize;
    let stride = w * 4;
    let offset = (w as f32 * p) as usize;
    for (y, row) in out.data.chunks_exact_mut(stride).enumerate() {
        let off = y * stride;
        for x in 0..w {
            let src_x = x + offset;
            let (src, sx) = if src_x < w {
                (&a.data, src_x)
            } else {
                (&b.data, src_x - w)
            };
            let idx = x * 4;
            row[idx..idx + 4].copy_from_slice(&src[off + sx * 4..off + sx * 4 + 4]);
        }
    }
}

/// Circular reveal of B from the center.
fn iris(out: &mut FrameBuffer, a: &FrameBuffer, b: &FrameBuffer, p: f32) {
    let w = out.width as usize;
    let stride = w * 4;
    let cx = out.width as f32 * 0.5;
    let cy = out.height as f32 * 0.5;
    let max_radius = (cx * cx + cy * cy).sqrt().max(1.0);
    for (y, row) in out.data.chunks_exact_mut(stride).enumerate() {
        let off = y * stride;
        let fy = y as f32 - cy;
        for x in 0..w {
            let fx = x as f32 - cx;
            let dist = (fx * fx + fy * fy).sqrt() / max_radius;
            let src = if dist < p { &b.data } else { &a.data };
            let idx = x * 4;
            row[idx..idx + 4].copy_from_slice(&src[off + idx..off + idx + 4]);
        }
    }
}
