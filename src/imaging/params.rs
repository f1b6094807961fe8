//! Parameter types for image operations.
//!
//! These structs describe *what* to do, not *how* to do it. They are the
//! interface between the high-level [`operations`](super::operations) module
//! (which turns a profile into a render plan) and the [`backend`](super::backend)
//! (which does the actual pixel work). This separation allows swapping backends
//! (e.g. for testing with a mock) without changing pipeline logic.
//!
//! ## Types
//!
//! - [`Quality`]: Lossy encoding quality (1–100, default 95). Clamped on construction.
//! - [`Enhancement`]: Sharpness and contrast factors (`1.0` = unchanged).
//! - [`Encoding`]: Output container and its encoder settings.
//! - [`RenderParams`]: Everything the backend needs for one profile render.

use std::path::PathBuf;

/// Quality setting for lossy image encoding (1-100).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quality(u32);

impl Quality {
    pub fn new(value: u32) -> Self {
        Self(value.clamp(1, 100))
    }

    pub fn value(self) -> u32 {
        self.0
    }
}

impl Default for Quality {
    fn default() -> Self {
        Self(95)
    }
}

/// Enhancement factors applied after cropping.
///
/// Both factors interpolate between a degenerate image and the input:
/// `0.0` gives the degenerate (smoothed / flat gray), `1.0` the input,
/// values above `1.0` extrapolate away from it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Enhancement {
    pub sharpness: f32,
    pub contrast: f32,
}

impl Enhancement {
    pub fn none() -> Self {
        Self {
            sharpness: 1.0,
            contrast: 1.0,
        }
    }

    pub fn is_identity(&self) -> bool {
        self.sharpness == 1.0 && self.contrast == 1.0
    }
}

impl Default for Enhancement {
    fn default() -> Self {
        Self::none()
    }
}

/// WebP compression effort: 0 = fastest, 6 = smallest output.
pub const WEBP_BEST_METHOD: u8 = 6;

/// Output container and encoder settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// Lossy WebP, non-exact (RGB under transparent areas may be altered).
    WebP { quality: Quality, method: u8 },
    /// Baseline or progressive JPEG with optimized Huffman tables.
    Jpeg { quality: Quality, progressive: bool },
    /// Lossless PNG at maximum compression.
    Png,
}

impl Encoding {
    /// File extension written for this container.
    pub fn extension(&self) -> &'static str {
        match self {
            Self::WebP { .. } => "webp",
            Self::Jpeg { .. } => "jpg",
            Self::Png => "png",
        }
    }
}

/// Parameters for rendering one profile from a source file.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderParams {
    pub source: PathBuf,
    pub output: PathBuf,
    /// Exact cover-crop target; `None` keeps source dimensions.
    pub target: Option<(u32, u32)>,
    pub enhancement: Enhancement,
    pub encoding: Encoding,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_clamps_to_valid_range() {
        assert_eq!(Quality::new(0).value(), 1);
        assert_eq!(Quality::new(50).value(), 50);
        assert_eq!(Quality::new(150).value(), 100);
    }

    #[test]
    fn quality_default_is_95() {
        assert_eq!(Quality::default().value(), 95);
    }

    #[test]
    fn enhancement_identity() {
        assert!(Enhancement::none().is_identity());
        assert!(
            !Enhancement {
                sharpness: 1.2,
                contrast: 1.0
            }
            .is_identity()
        );
    }

    #[test]
    fn encoding_extensions() {
        let q = Quality::default();
        assert_eq!(
            Encoding::WebP {
                quality: q,
                method: WEBP_BEST_METHOD
            }
            .extension(),
            "webp"
        );
        assert_eq!(
            Encoding::Jpeg {
                quality: q,
                progressive: true
            }
            .extension(),
            "jpg"
        );
        assert_eq!(Encoding::Png.extension(), "png");
    }
}
