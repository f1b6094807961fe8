//! Image processing.
//!
//! | Operation | Crate / function |
//! |---|---|
//! | **Identify** | full decode through `image` (or `libheif-rs`) |
//! | **Cover crop** | Lanczos3 resize + center crop |
//! | **Enhance** | 3×3 smoothing blend (sharpness), mean-gray blend (contrast) |
//! | **Encode** | `webp`, `mozjpeg`, `image::codecs::png` |
//! | **EXIF / IPTC** | TIFF IFD + IIM writers, `img-parts` segment surgery |
//!
//! The module is split into:
//! - **Calculations**: Pure functions for cover-crop math (unit testable)
//! - **Parameters**: Data structures describing a render
//! - **Operations**: Profile → render plan, including the container policy
//! - **Backend**: [`ImageBackend`] trait + [`RustBackend`]
//! - **Enhance / EXIF / IPTC**: pixel and metadata primitives the backend uses

pub mod backend;
mod calculations;
pub mod enhance;
pub mod exif;
pub mod iptc_parser;
pub mod operations;
mod params;
pub mod rust_backend;

pub use backend::{BackendError, EmbeddedMetadata, ImageBackend, Probe, Rendered};
pub use calculations::{calculate_cover_dimensions, center_crop_box};
pub use exif::ExifFields;
pub use iptc_parser::IptcRecord;
pub use operations::{OutputFormat, plan_output_format, plan_render};
pub use params::{Encoding, Enhancement, Quality, RenderParams, WEBP_BEST_METHOD};
pub use rust_backend::RustBackend;
