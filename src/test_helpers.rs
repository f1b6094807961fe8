//! Shared test utilities: synthetic image fixtures written to temp directories.
//!
//! Every fixture is generated on the fly so tests never depend on binary
//! files checked into the repo.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let tmp = tempfile::TempDir::new().unwrap();
//! let src = tmp.path().join("portrait.jpg");
//! create_test_jpeg(&src, 1080, 1920);
//! ```

use image::{ImageEncoder, RgbImage, RgbaImage};
use std::path::Path;

/// Gradient test pattern so resampling and enhancement have something to work on.
fn pattern(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 200) as u8 + 28])
    })
}

/// Write a baseline JPEG of the given size.
pub fn create_test_jpeg(path: &Path, width: u32, height: u32) {
    let img = pattern(width, height);
    let file = std::fs::File::create(path).unwrap();
    let writer = std::io::BufWriter::new(file);
    image::codecs::jpeg::JpegEncoder::new_with_quality(writer, 90)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

/// Write an RGBA PNG where every pixel has the given alpha.
pub fn create_test_png_rgba(path: &Path, width: u32, height: u32, alpha: u8) {
    let rgb = pattern(width, height);
    let img = RgbaImage::from_fn(width, height, |x, y| {
        let p = rgb.get_pixel(x, y);
        image::Rgba([p[0], p[1], p[2], alpha])
    });
    let file = std::fs::File::create(path).unwrap();
    image::codecs::png::PngEncoder::new(std::io::BufWriter::new(file))
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgba8)
        .unwrap();
}

/// Write a file that has an image extension but text content.
pub fn write_garbage(path: &Path) {
    std::fs::write(path, b"this is a shopping list, not a photograph\n").unwrap();
}

/// Write a real JPEG cut off after `keep` bytes.
pub fn create_truncated_jpeg(path: &Path, width: u32, height: u32, keep: usize) {
    create_test_jpeg(path, width, height);
    let bytes = std::fs::read(path).unwrap();
    std::fs::write(path, &bytes[..keep.min(bytes.len())]).unwrap();
}
