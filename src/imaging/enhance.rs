//! Sharpness and contrast enhancement.
//!
//! Both operations follow the classic "enhancer" model: build a degenerate
//! version of the image, then interpolate (or extrapolate) between it and the
//! input by a factor.
//!
//! | Operation | Degenerate image |
//! |---|---|
//! | Sharpness | 3×3 smoothing kernel `[1 1 1; 1 5 1; 1 1 1] / 13`, edges untouched |
//! | Contrast | Flat gray at the rounded mean luminance |
//!
//! `out = degenerate + factor × (input − degenerate)`, clamped to `0..=255`.
//! Sharpness runs before contrast.

use super::params::Enhancement;
use image::{Rgb, RgbImage};

/// Apply an enhancement to an RGB image. Identity factors return the input untouched.
pub fn enhance(img: RgbImage, enhancement: &Enhancement) -> RgbImage {
    let mut out = img;
    if enhancement.sharpness != 1.0 {
        out = sharpen(&out, enhancement.sharpness);
    }
    if enhancement.contrast != 1.0 {
        out = adjust_contrast(&out, enhancement.contrast);
    }
    out
}

/// Blend between a smoothed copy and the input by `factor`.
pub fn sharpen(img: &RgbImage, factor: f32) -> RgbImage {
    let smoothed = smooth(img);
    blend(&smoothed, img, factor)
}

/// Blend between flat mean-luminance gray and the input by `factor`.
pub fn adjust_contrast(img: &RgbImage, factor: f32) -> RgbImage {
    let mean = mean_luminance(img).round().clamp(0.0, 255.0) as u8;
    let gray = RgbImage::from_pixel(img.width(), img.height(), Rgb([mean, mean, mean]));
    blend(&gray, img, factor)
}

/// ITU-R 601-2 luma averaged over every pixel.
pub fn mean_luminance(img: &RgbImage) -> f64 {
    let count = img.width() as u64 * img.height() as u64;
    if count == 0 {
        return 0.0;
    }
    let total: f64 = img
        .pixels()
        .map(|Rgb([r, g, b])| luma(*r, *g, *b) as f64)
        .sum();
    total / count as f64
}

fn luma(r: u8, g: u8, b: u8) -> f32 {
    r as f32 * 0.299 + g as f32 * 0.587 + b as f32 * 0.114
}

/// 3×3 smoothing filter; the one-pixel border is copied unchanged.
fn smooth(img: &RgbImage) -> RgbImage {
    const KERNEL: [[u32; 3]; 3] = [[1, 1, 1], [1, 5, 1], [1, 1, 1]];
    const SCALE: u32 = 13;

    let (w, h) = img.dimensions();
    let mut out = img.clone();
    if w < 3 || h < 3 {
        return out;
    }

    for y in 1..h - 1 {
        for x in 1..w - 1 {
            let mut acc = [0u32; 3];
            for (ky, row) in KERNEL.iter().enumerate() {
                for (kx, weight) in row.iter().enumerate() {
                    let px = img.get_pixel(x + kx as u32 - 1, y + ky as u32 - 1);
                    for c in 0..3 {
                        acc[c] += px[c] as u32 * weight;
                    }
                }
            }
            let px = out.get_pixel_mut(x, y);
            for c in 0..3 {
                px[c] = ((acc[c] + SCALE / 2) / SCALE) as u8;
            }
        }
    }
    out
}

/// `degenerate + factor × (input − degenerate)`, per channel.
fn blend(degenerate: &RgbImage, input: &RgbImage, factor: f32) -> RgbImage {
    let mut out = input.clone();
    for (dst, (d, i)) in out
        .pixels_mut()
        .zip(degenerate.pixels().zip(input.pixels()))
    {
        for c in 0..3 {
            let base = d[c] as f32;
            let value = base + factor * (i[c] as f32 - base);
            dst[c] = value.round().clamp(0.0, 255.0) as u8;
        }
    }
    out
}

/// Mean absolute horizontal + vertical gradient over the luma plane.
///
/// Used as an edge-strength measure: sharpening and contrast both raise it.
#[cfg(test)]
fn edge_strength(img: &RgbImage) -> f64 {
    let (w, h) = img.dimensions();
    if w < 2 || h < 2 {
        return 0.0;
    }
    let l = |x: u32, y: u32| {
        let Rgb([r, g, b]) = *img.get_pixel(x, y);
        luma(r, g, b) as f64
    };
    let mut total = 0.0;
    let mut samples = 0u64;
    for y in 0..h - 1 {
        for x in 0..w - 1 {
            let here = l(x, y);
            total += (l(x + 1, y) - here).abs() + (l(x, y + 1) - here).abs();
            samples += 1;
        }
    }
    total / samples as f64
}
