//! Source validation: the gate every image passes before any profile runs.
//!
//! Checks run in order and stop at the first failure:
//!
//! 1. The path is an existing regular file (`NotFound`).
//! 2. The extension is supported, case-insensitively (`UnsupportedFormat`).
//! 3. The file fully decodes (`CorruptImage`).
//! 4. Both edges are at least [`MIN_DIMENSION`] pixels (`TooSmall`).
//! 5. `height / width >= 1.2`: portrait only (`WrongAspect`).
//!
//! Validation is a read-only probe. The thresholds are fixed constants, not
//! configuration.

use crate::imaging::{BackendError, ImageBackend};
use crate::types::{SourceImage, extension_of};
use serde::Serialize;
use std::path::Path;
use thiserror::Error;

/// Extensions accepted as sources.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "jpg", "jpeg", "png", "bmp", "tiff", "tif", "webp", "heic", "heif",
];

/// Minimum width and height in pixels.
pub const MIN_DIMENSION: u32 = 100;

/// Minimum `height / width`, as the exact fraction 6/5.
const MIN_ASPECT: (u64, u64) = (6, 5);

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    #[error("File does not exist: {0}")]
    NotFound(String),
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),
    #[error("Corrupt or unreadable image: {0}")]
    CorruptImage(String),
    #[error("Image too small: {width}x{height} (minimum {min}x{min}px)", min = MIN_DIMENSION)]
    TooSmall { width: u32, height: u32 },
    #[error("Image should be in portrait orientation (height > width * 1.2), got {width}x{height}")]
    WrongAspect { width: u32, height: u32 },
}

/// Whether an extension (without dot, any case) is accepted.
pub fn is_supported_extension(ext: &str) -> bool {
    let ext = ext.to_ascii_lowercase();
    SUPPORTED_EXTENSIONS.contains(&ext.as_str())
}

fn classify_backend_error(path: &Path, err: BackendError) -> ValidationError {
    match err {
        BackendError::Io(e) if e.kind() == std::io::ErrorKind::NotFound => {
            ValidationError::NotFound(path.display().to_string())
        }
        BackendError::Unsupported(msg) => ValidationError::UnsupportedFormat(msg),
        other => ValidationError::CorruptImage(other.to_string()),
    }
}

/// Validate a source file and describe it.
pub fn validate(backend: &impl ImageBackend, path: &Path) -> Result<SourceImage, ValidationError> {
    if !path.is_file() {
        return Err(ValidationError::NotFound(path.display().to_string()));
    }

    let ext = extension_of(path);
    if !is_supported_extension(&ext) {
        let found = if ext.is_empty() { "no extension".to_string() } else { format!(".{ext}") };
        return Err(ValidationError::UnsupportedFormat(format!(
            "{found}. Supported: {}",
            SUPPORTED_EXTENSIONS.join(", ")
        )));
    }

    let probe = backend
        .identify(path)
        .map_err(|e| classify_backend_error(path, e))?;
    let (width, height) = (probe.width, probe.height);

    if width < MIN_DIMENSION || height < MIN_DIMENSION {
        return Err(ValidationError::TooSmall { width, height });
    }
    // height / width < 6/5, cross-multiplied
    if (height as u64) * MIN_ASPECT.1 < (width as u64) * MIN_ASPECT.0 {
        return Err(ValidationError::WrongAspect { width, height });
    }

    let byte_size = std::fs::metadata(path)
        .map_err(|e| classify_backend_error(path, e.into()))?
        .len();

    Ok(SourceImage {
        path: path.to_path_buf(),
        filename: path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default(),
        format: probe.format,
        color_mode: probe.color_mode,
        width,
        height,
        aspect_ratio: height as f64 / width as f64,
        byte_size,
        has_transparency: probe.has_transparency,
    })
}

/// The `(is_valid, reason)` view of a validation result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValidationOutcome {
    pub is_valid: bool,
    pub reason: String,
}

impl<T> From<&Result<T, ValidationError>> for ValidationOutcome {
    fn from(result: &Result<T, ValidationError>) -> Self {
        match result {
            Ok(_) => Self {
                is_valid: true,
                reason: "Valid image".to_string(),
            },
            Err(e) => Self {
                is_valid: false,
                reason: e.to_string(),
            },
        }
    }
}

/// Validate and collapse to `(is_valid, reason)`.
pub fn check(backend: &impl ImageBackend, path: &Path) -> ValidationOutcome {
    ValidationOutcome::from(&validate(backend, path))
}
