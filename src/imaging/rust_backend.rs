//! Production image backend.
//!
//! ## Crate mapping
//!
//! | Operation | Crate / function |
//! |---|---|
//! | Decode (JPEG, PNG, BMP, TIFF, WebP) | `image` crate decoders, content-sniffed |
//! | Decode (HEIC/HEIF) | `libheif-rs`, only with the `heic` feature |
//! | Resize | `image::imageops::resize` with `Lanczos3` |
//! | Crop | `image::imageops::crop_imm` |
//! | Enhance | [`enhance`](super::enhance) |
//! | Encode → WebP | `webp` (libwebp: lossy, method 6, non-exact) |
//! | Encode → JPEG | `mozjpeg` (progressive, optimized Huffman + scans) |
//! | Encode → PNG | `image::codecs::png` at best compression |
//! | EXIF / IPTC | `img-parts` segment surgery, no pixel re-encode |

use super::backend::{BackendError, EmbeddedMetadata, ImageBackend, Probe, Rendered};
use super::calculations::{calculate_cover_dimensions, center_crop_box};
use super::enhance::enhance;
use super::exif::{ExifFields, build_exif, parse_exif};
use super::iptc_parser::{IptcRecord, embed_iptc_in_jpeg, read_iptc_from_jpeg};
use super::params::{Encoding, Quality, RenderParams};
use crate::types::{ColorMode, ContainerFormat, extension_of};
use image::imageops::FilterType;
use image::{DynamicImage, ImageReader, Rgb, RgbImage};
use img_parts::jpeg::Jpeg;
use img_parts::png::Png;
use img_parts::{Bytes, ImageEXIF};
use std::path::Path;

/// Backend built on the `image` crate plus native WebP and JPEG encoders.
///
/// See the [module docs](self) for the crate-to-operation mapping.
pub struct RustBackend;

impl RustBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for RustBackend {
    fn default() -> Self {
        Self::new()
    }
}

fn is_heif(path: &Path) -> bool {
    matches!(extension_of(path).as_str(), "heic" | "heif")
}

/// Load and decode an image from disk.
fn load_image(path: &Path) -> Result<(DynamicImage, ContainerFormat), BackendError> {
    if is_heif(path) {
        return decode_heif(path).map(|img| (img, ContainerFormat::Heif));
    }
    let reader = ImageReader::open(path)?.with_guessed_format()?;
    let format = reader
        .format()
        .map(ContainerFormat::from_image_format)
        .unwrap_or(ContainerFormat::Other);
    let img = reader
        .decode()
        .map_err(|e| BackendError::Decode(format!("{}: {}", path.display(), e)))?;
    Ok((img, format))
}

#[cfg(feature = "heic")]
fn decode_heif(path: &Path) -> Result<DynamicImage, BackendError> {
    use libheif_rs::{ColorSpace, HeifContext, LibHeif, RgbChroma};

    let decode_err = |e: libheif_rs::HeifError| {
        BackendError::Decode(format!("{}: {}", path.display(), e))
    };
    let lib = LibHeif::new();
    let ctx = HeifContext::read_from_file(&path.to_string_lossy()).map_err(decode_err)?;
    let handle = ctx.primary_image_handle().map_err(decode_err)?;
    let image = lib
        .decode(&handle, ColorSpace::Rgb(RgbChroma::Rgb), None)
        .map_err(decode_err)?;

    let planes = image.planes();
    let plane = planes
        .interleaved
        .ok_or_else(|| BackendError::Decode("HEIF image has no interleaved plane".into()))?;
    let (width, height) = (plane.width, plane.height);
    let row_len = width as usize * 3;
    let mut buf = Vec::with_capacity(row_len * height as usize);
    for row in plane.data.chunks(plane.stride).take(height as usize) {
        buf.extend_from_slice(&row[..row_len]);
    }
    RgbImage::from_raw(width, height, buf)
        .map(DynamicImage::ImageRgb8)
        .ok_or_else(|| BackendError::Decode("HEIF plane size mismatch".into()))
}

#[cfg(not(feature = "heic"))]
fn decode_heif(path: &Path) -> Result<DynamicImage, BackendError> {
    Err(BackendError::Unsupported(format!(
        "{}: HEIC/HEIF decoding requires the `heic` feature",
        path.display()
    )))
}

/// Composite onto opaque white when the image carries an alpha channel.
fn flatten_to_rgb(img: &DynamicImage) -> RgbImage {
    if !img.color().has_alpha() {
        return img.to_rgb8();
    }
    let rgba = img.to_rgba8();
    RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let p = rgba.get_pixel(x, y);
        let a = p[3] as u32;
        let over_white = |c: u8| ((c as u32 * a + 255 * (255 - a) + 127) / 255) as u8;
        Rgb([over_white(p[0]), over_white(p[1]), over_white(p[2])])
    })
}

fn has_transparency(img: &DynamicImage) -> bool {
    img.color().has_alpha() && img.to_rgba8().pixels().any(|p| p[3] < 255)
}

/// Resize to cover `target`, then center-crop to it exactly.
fn cover_crop(img: &RgbImage, target: (u32, u32)) -> RgbImage {
    let (rw, rh) = calculate_cover_dimensions(img.dimensions(), target);
    let resized = image::imageops::resize(img, rw, rh, FilterType::Lanczos3);
    let (left, top, w, h) = center_crop_box((rw, rh), target);
    image::imageops::crop_imm(&resized, left, top, w, h).to_image()
}

fn encode(img: &RgbImage, encoding: &Encoding) -> Result<Vec<u8>, BackendError> {
    match *encoding {
        Encoding::WebP { quality, method } => encode_webp(img, quality, method),
        Encoding::Jpeg {
            quality,
            progressive,
        } => encode_jpeg(img, quality, progressive),
        Encoding::Png => encode_png(img),
    }
}

/// Lossy WebP. `exact = 0` lets libwebp alter RGB under transparent areas.
fn encode_webp(img: &RgbImage, quality: Quality, method: u8) -> Result<Vec<u8>, BackendError> {
    let encoder = webp::Encoder::from_rgb(img.as_raw(), img.width(), img.height());
    let mut config = webp::WebPConfig::new()
        .map_err(|_| BackendError::Encode("WebP config init failed".into()))?;
    config.quality = quality.value() as f32;
    config.method = method as i32;
    config.lossless = 0;
    config.exact = 0;
    let memory = encoder
        .encode_advanced(&config)
        .map_err(|e| BackendError::Encode(format!("WebP encode failed: {e:?}")))?;
    Ok(memory.to_vec())
}

/// JPEG through mozjpeg. libjpeg reports fatal errors by unwinding, so the
/// whole encode runs under `catch_unwind`.
fn encode_jpeg(img: &RgbImage, quality: Quality, progressive: bool) -> Result<Vec<u8>, BackendError> {
    let (width, height) = (img.width() as usize, img.height() as usize);
    let pixels = img.as_raw();

    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(
        || -> std::io::Result<Vec<u8>> {
            let mut comp = mozjpeg::Compress::new(mozjpeg::ColorSpace::JCS_RGB);
            comp.set_size(width, height);
            comp.set_quality(quality.value() as f32);
            if progressive {
                comp.set_progressive_mode();
            }
            comp.set_optimize_coding(true);
            comp.set_optimize_scans(progressive);
            let mut started = comp.start_compress(Vec::new())?;
            started.write_scanlines(pixels)?;
            started.finish()
        },
    ));

    match result {
        Ok(Ok(bytes)) => Ok(bytes),
        Ok(Err(e)) => Err(BackendError::Encode(format!("JPEG encode failed: {e}"))),
        Err(_) => Err(BackendError::Encode("JPEG encoder aborted".into())),
    }
}

fn encode_png(img: &RgbImage) -> Result<Vec<u8>, BackendError> {
    use image::ImageEncoder;
    use image::codecs::png::{CompressionType, FilterType as PngFilter, PngEncoder};

    let mut buf = Vec::new();
    PngEncoder::new_with_quality(&mut buf, CompressionType::Best, PngFilter::Adaptive)
        .write_image(
            img.as_raw(),
            img.width(),
            img.height(),
            image::ExtendedColorType::Rgb8,
        )
        .map_err(|e| BackendError::Encode(format!("PNG encode failed: {e}")))?;
    Ok(buf)
}

/// Container of an already-written output, sniffed from its magic bytes.
enum Written {
    Jpeg,
    Png,
    Other,
}

fn sniff(data: &[u8]) -> Written {
    if data.starts_with(&[0xFF, 0xD8]) {
        Written::Jpeg
    } else if data.starts_with(b"\x89PNG\r\n\x1a\n") {
        Written::Png
    } else {
        Written::Other
    }
}

fn container_err(path: &Path, e: img_parts::Error) -> BackendError {
    BackendError::ProcessingFailed(format!("{}: {}", path.display(), e))
}

impl ImageBackend for RustBackend {
    fn identify(&self, path: &Path) -> Result<Probe, BackendError> {
        let (img, format) = load_image(path)?;
        Ok(Probe {
            format,
            color_mode: ColorMode::from_color_type(img.color()),
            width: img.width(),
            height: img.height(),
            has_transparency: has_transparency(&img),
        })
    }

    fn read_metadata(&self, path: &Path) -> Result<EmbeddedMetadata, BackendError> {
        let data = std::fs::read(path)?;
        let parse_tiff = |raw: Option<Bytes>| raw.and_then(|tiff| parse_exif(&tiff).ok());

        match sniff(&data) {
            Written::Jpeg => {
                let iptc = read_iptc_from_jpeg(&data)
                    .map_err(|e| BackendError::ProcessingFailed(e.to_string()))?;
                let jpeg = Jpeg::from_bytes(Bytes::from(data)).map_err(|e| container_err(path, e))?;
                Ok(EmbeddedMetadata {
                    exif: parse_tiff(jpeg.exif()),
                    iptc,
                })
            }
            Written::Png => {
                let png = Png::from_bytes(Bytes::from(data)).map_err(|e| container_err(path, e))?;
                Ok(EmbeddedMetadata {
                    exif: parse_tiff(png.exif()),
                    iptc: None,
                })
            }
            Written::Other => Ok(EmbeddedMetadata::default()),
        }
    }

    fn render(&self, params: &RenderParams) -> Result<Rendered, BackendError> {
        let (img, _) = load_image(&params.source)?;
        let flat = flatten_to_rgb(&img);
        drop(img);

        let shaped = match params.target {
            Some(target) => cover_crop(&flat, target),
            None => flat,
        };
        let finished = enhance(shaped, &params.enhancement);
        let bytes = encode(&finished, &params.encoding)?;
        std::fs::write(&params.output, &bytes)?;

        Ok(Rendered {
            width: finished.width(),
            height: finished.height(),
            byte_size: bytes.len() as u64,
        })
    }

    fn embed_exif(&self, path: &Path, fields: &ExifFields) -> Result<(), BackendError> {
        let data = std::fs::read(path)?;
        let tiff = Bytes::from(build_exif(fields));
        let mut out = Vec::with_capacity(data.len() + tiff.len() + 16);

        match sniff(&data) {
            Written::Jpeg => {
                let mut jpeg = Jpeg::from_bytes(Bytes::from(data)).map_err(|e| container_err(path, e))?;
                jpeg.set_exif(Some(tiff));
                jpeg.encoder().write_to(&mut out)?;
            }
            Written::Png => {
                let mut png = Png::from_bytes(Bytes::from(data)).map_err(|e| container_err(path, e))?;
                png.set_exif(Some(tiff));
                png.encoder().write_to(&mut out)?;
            }
            Written::Other => {
                return Err(BackendError::Unsupported(format!(
                    "{}: EXIF is only written to JPEG and PNG files",
                    path.display()
                )));
            }
        }
        std::fs::write(path, out)?;
        Ok(())
    }

    fn embed_iptc(&self, path: &Path, record: &IptcRecord) -> Result<(), BackendError> {
        let data = std::fs::read(path)?;
        if !matches!(sniff(&data), Written::Jpeg) {
            return Err(BackendError::Unsupported(format!(
                "{}: IPTC is only written to JPEG files",
                path.display()
            )));
        }
        let out = embed_iptc_in_jpeg(&data, record)
            .map_err(|e| BackendError::ProcessingFailed(e.to_string()))?;
        std::fs::write(path, out)?;
        Ok(())
    }
}
