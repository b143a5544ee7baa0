//! CPU effect rasterization.
//!
//! Effects run in clip order over RGBA8 frames before compositing. Pixel
//! loops are parallelized per row with rayon. Grain uses a hash of the pixel
//! coordinate so the same frame renders identically in preview and export.

use montage_core::FrameBuffer;
use montage_timeline::{Effect, EffectKind};
use rayon::prelude::*;
use tracing::trace;

/// Apply every enabled effect to `frame`, in list order.
pub fn apply_effects(frame: &mut FrameBuffer, effects: &[Effect]) {
    for effect in effects.iter().filter(|e| e.enabled) {
        apply_effect(frame, effect);
    }
}

fn apply_effect(frame: &mut FrameBuffer, effect: &Effect) {
    match &effect.kind {
        EffectKind::Brightness => brightness(frame, effect.param("amount", 0.0)),
        EffectKind::Contrast => contrast(frame, effect.param("amount", 0.0)),
        EffectKind::Saturation => saturation(frame, effect.param("amount", 1.0)),
        EffectKind::Blur => blur(frame, effect.param("radius", 2.0)),
        EffectKind::Grain => grain(
            frame,
            effect.param("amount", 0.3),
            effect.param("seed", 0.0) as u32,
        ),
        EffectKind::ColorGrade => color_grade(
            frame,
            effect.param("lift", 0.0),
            effect.param("gamma", 1.0),
            effect.param("gain", 1.0),
        ),
        EffectKind::Vignette => vignette(
            frame,
            effect.param("amount", 0.5),
            effect.param("radius", 0.75),
        ),
        EffectKind::FilmLook => film_look(frame, effect.param("amount", 0.5)),
        EffectKind::Custom(tag) => {
            // Renderer-defined effects are resolved by the embedding app;
            // unknown tags pass the frame through.
            trace!(tag, "skipping custom effect");
        }
    }
}

#[inline]
fn clamp_u8(v: f32) -> u8 {
    v.clamp(0.0, 255.0) as u8
}

fn for_each_row(frame: &mut FrameBuffer, op: impl Fn(u32, &mut [u8]) + Sync) {
    let stride = frame.width as usize * 4;
    if stride == 0 {
        return;
    }
    frame
        .data
        .par_chunks_exact_mut(stride)
        .enumerate()
        .for_each(|(y, row)| op(y as u32, row));
}

/// `amount` in [-1, 1]: additive shift of all channels.
fn brightness(frame: &mut FrameBuffer, amount: f64) {
    let shift = (amount.clamp(-1.0, 1.0) * 255.0) as f32;
    for_each_row(frame, |_, row| {
        for px in row.chunks_exact_mut(4) {
            for c in &mut px[..3] {
                *c = clamp_u8(f32::from(*c) + shift);
            }
        }
    });
}

/// `amount` in [-1, 1]: scale around mid gray.
fn contrast(frame: &mut FrameBuffer, amount: f64) {
    let factor = (1.0 + amount.clamp(-1.0, 1.0)) as f32;
    for_each_row(frame, |_, row| {
        for px in row.chunks_exact_mut(4) {
            for c in &mut px[..3] {
                *c = clamp_u8((f32::from(*c) - 128.0) * factor + 128.0);
            }
        }
    });
}

/// `amount` >= 0: 0 is grayscale, 1 is identity, above 1 oversaturates.
fn saturation(frame: &mut FrameBuffer, amount: f64) {
    let s = amount.max(0.0) as f32;
    for_each_row(frame, |_, row| {
        for px in row.chunks_exact_mut(4) {
            let (r, g, b) = (f32::from(px[0]), f32::from(px[1]), f32::from(px[2]));
            let luma = 0.2126 * r + 0.7152 * g + 0.0722 * b;
            px[0] = clamp_u8(luma + (r - luma) * s);
            px[1] = clamp_u8(luma + (g - luma) * s);
            px[2] = clamp_u8(luma + (b - luma) * s);
        }
    });
}

/// Separable box blur with `radius` in pixels.
fn blur(frame: &mut FrameBuffer, radius: f64) {
    let r = radius.round().clamp(0.0, 64.0) as i32;
    if r == 0 {
        return;
    }
    let (w, h) = (frame.width as i32, frame.height as i32);
    let norm = 1.0 / (2 * r + 1) as f32;

    // Horizontal pass reads the original, vertical pass reads the result.
    let src = frame.data.clone();
    let stride = w as usize * 4;
    frame
        .data
        .par_chunks_exact_mut(stride)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..w {
                let mut acc = [0.0f32; 4];
                for dx in -r..=r {
                    let sx = (x + dx).clamp(0, w - 1) as usize;
                    let idx = y * stride + sx * 4;
                    for (a, &s) in acc.iter_mut().zip(&src[idx..idx + 4]) {
                        *a += f32::from(s);
                    }
                }
                let out = x as usize * 4;
                for (c, a) in row[out..out + 4].iter_mut().zip(acc) {
                    *c = clamp_u8(a * norm);
                }
            }
        });

    let mid = frame.data.clone();
    frame
        .data
        .par_chunks_exact_mut(stride)
        .enumerate()
        .for_each(|(y, row)| {
            for x in 0..w as usize {
                let mut acc = [0.0f32; 4];
                for dy in -r..=r {
                    let sy = (y as i32 + dy).clamp(0, h - 1) as usize;
                    let idx = sy * stride + x * 4;
                    for (a, &s) in acc.iter_mut().zip(&mid[idx..idx + 4]) {
                        *a += f32::from(s);
                    }
                }
                let out = x * 4;
                for (c, a) in row[out..out + 4].iter_mut().zip(acc) {
                    *c = clamp_u8(a * norm);
                }
            }
        });
}

/// Deterministic integer hash, uniform enough for grain.
#[inline]
fn pixel_hash(x: u32, y: u32, seed: u32) -> f32 {
    let mut n = x
        .wrapping_mul(374_761_393)
        .wrapping_add(y.wrapping_mul(668_265_263))
        .wrapping_add(seed.wrapping_mul(2_246_822_519));
    n = (n ^ (n >> 13)).wrapping_mul(1_274_126_177);
    n ^= n >> 16;
    // Map to [-1, 1]
    (n as f32 / u32::MAX as f32) * 2.0 - 1.0
}

/// Additive monochrome noise, `amount` in [0, 1].
fn grain(frame: &mut FrameBuffer, amount: f64, seed: u32) {
    let strength = (amount.clamp(0.0, 1.0) * 48.0) as f32;
    for_each_row(frame, |y, row| {
        for (x, px) in row.chunks_exact_mut(4).enumerate() {
            let noise = pixel_hash(x as u32, y, seed) * strength;
            for c in &mut px[..3] {
                *c = clamp_u8(f32::from(*c) + noise);
            }
        }
    });
}

/// Lift-gamma-gain grade applied uniformly across channels.
fn color_grade(frame: &mut FrameBuffer, lift: f64, gamma: f64, gain: f64) {
    let lift = lift.clamp(-0.5, 0.5) as f32;
    let gain = gain.clamp(0.0, 4.0) as f32;
    let inv_gamma = 1.0 / gamma.clamp(0.2, 5.0) as f32;
    // Precomputed transfer curve; 256 entries beat per-pixel powf.
    let mut lut = [0u8; 256];
    for (i, out) in lut.iter_mut().enumerate() {
        let v = i as f32 / 255.0;
        let graded = ((v + lift * (1.0 - v)) * gain).clamp(0.0, 1.0).powf(inv_gamma);
        *out = clamp_u8(graded * 255.0);
    }
    for_each_row(frame, |_, row| {
        for px in row.chunks_exact_mut(4) {
            for c in &mut px[..3] {
                *c = lut[*c as usize];
            }
        }
    });
}

/// Darken toward the corners. `radius` is where falloff begins, normalized
/// to the half-diagonal.
fn vignette(frame: &mut FrameBuffer, amount: f64, radius: f64) {
    let amount = amount.clamp(0.0, 1.0) as f32;
    let radius = radius.clamp(0.0, 1.5) as f32;
    let cx = frame.width as f32 * 0.5;
    let cy = frame.height as f32 * 0.5;
    let max_dist = (cx * cx + cy * cy).sqrt();
    for_each_row(frame, |y, row| {
        let fy = y as f32 - cy;
        for (x, px) in row.chunks_exact_mut(4).enumerate() {
            let fx = x as f32 - cx;
            let dist = (fx * fx + fy * fy).sqrt() / max_dist;
            let falloff = ((dist - radius).max(0.0) / (1.0 - radius).max(1e-3)).min(1.0);
            let gain = 1.0 - falloff * amount;
            for c in &mut px[..3] {
                *c = clamp_u8(f32::from(*c) * gain);
            }
        }
    });
}

/// A combined "film" treatment: lifted blacks, warm cast, grain, vignette.
fn film_look(frame: &mut FrameBuffer, amount: f64) {
    let amount = amount.clamp(0.0, 1.0);
    let warm = (amount * 12.0) as f32;
    for_each_row(frame, |_, row| {
        for px in row.chunks_exact_mut(4) {
            px[0] = clamp_u8(f32::from(px[0]) + warm);
            px[2] = clamp_u8(f32::from(px[2]) - warm);
        }
    });
    contrast(frame, amount * 0.15);
    grain(frame, amount * 0.4, 97);
    vignette(frame, amount * 0.5, 0.6);
}
