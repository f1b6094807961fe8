//! Image processing backend trait and shared types.
//!
//! The [`ImageBackend`] trait defines the operations every backend must
//! support:
//!
//! | Operation | Used by |
//! |---|---|
//! | `identify` | Validator: full decode, dimensions, container, color mode |
//! | `read_metadata` | `wallpress inspect`, tests |
//! | `render` | Resolution pipeline: one profile, decode → crop → enhance → encode |
//! | `embed_exif` / `embed_iptc` | Metadata injector, "original" artifact only |
//!
//! The production implementation is
//! [`RustBackend`](super::rust_backend::RustBackend). Tests drive the pipeline
//! through [`tests::MockBackend`], which records every call.

use super::exif::ExifFields;
use super::iptc_parser::IptcRecord;
use super::params::RenderParams;
use crate::types::{ColorMode, ContainerFormat};
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BackendError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot decode image: {0}")]
    Decode(String),
    #[error("Unsupported: {0}")]
    Unsupported(String),
    #[error("Encoding failed: {0}")]
    Encode(String),
    #[error("Processing failed: {0}")]
    ProcessingFailed(String),
}

/// Result of an identify operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Probe {
    pub format: ContainerFormat,
    pub color_mode: ColorMode,
    pub width: u32,
    pub height: u32,
    /// True only when an alpha channel exists and some pixel is not fully opaque.
    pub has_transparency: bool,
}

/// What a render actually wrote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rendered {
    pub width: u32,
    pub height: u32,
    pub byte_size: u64,
}

/// Descriptive metadata found inside an image file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EmbeddedMetadata {
    pub exif: Option<ExifFields>,
    pub iptc: Option<IptcRecord>,
}

impl EmbeddedMetadata {
    pub fn is_empty(&self) -> bool {
        self.exif.is_none() && self.iptc.is_none()
    }
}

/// Trait for image processing backends.
///
/// Every backend must implement all operations so the pipeline stays
/// backend-agnostic. `Sync` lets one backend serve a rayon batch.
pub trait ImageBackend: Sync {
    /// Fully decode the file and describe it. Any decode error means the
    /// file is corrupt; unsupported containers return [`BackendError::Unsupported`].
    fn identify(&self, path: &Path) -> Result<Probe, BackendError>;

    /// Read embedded EXIF and IPTC blocks.
    fn read_metadata(&self, path: &Path) -> Result<EmbeddedMetadata, BackendError>;

    /// Render one profile: decode, flatten, cover-crop, enhance, encode, write.
    fn render(&self, params: &RenderParams) -> Result<Rendered, BackendError>;

    /// Attach an EXIF block to an already-written file, replacing any existing one.
    fn embed_exif(&self, path: &Path, fields: &ExifFields) -> Result<(), BackendError>;

    /// Attach an IPTC record to an already-written file.
    fn embed_iptc(&self, path: &Path, record: &IptcRecord) -> Result<(), BackendError>;
}
