//! Shared data model: what goes into a pipeline run and what comes out.
//!
//! Every value here is scoped to a single [`Pipeline::process`](crate::process::Pipeline::process)
//! call. Nothing is persisted by the crate itself; callers serialize a
//! [`ProcessingResult`] into whatever catalog they keep.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Container format detected while probing a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContainerFormat {
    Jpeg,
    Png,
    Bmp,
    Tiff,
    WebP,
    Heif,
    Other,
}

impl ContainerFormat {
    pub fn from_image_format(format: image::ImageFormat) -> Self {
        match format {
            image::ImageFormat::Jpeg => Self::Jpeg,
            image::ImageFormat::Png => Self::Png,
            image::ImageFormat::Bmp => Self::Bmp,
            image::ImageFormat::Tiff => Self::Tiff,
            image::ImageFormat::WebP => Self::WebP,
            _ => Self::Other,
        }
    }
}

/// Pixel layout of the decoded source.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMode {
    Luma,
    LumaAlpha,
    Rgb,
    Rgba,
}

impl ColorMode {
    pub fn from_color_type(color: image::ColorType) -> Self {
        match (color.has_color(), color.has_alpha()) {
            (false, false) => Self::Luma,
            (false, true) => Self::LumaAlpha,
            (true, false) => Self::Rgb,
            (true, true) => Self::Rgba,
        }
    }

    pub fn has_alpha(self) -> bool {
        matches!(self, Self::LumaAlpha | Self::Rgba)
    }
}

/// Immutable description of one validated input file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceImage {
    pub path: PathBuf,
    pub filename: String,
    pub format: ContainerFormat,
    pub color_mode: ColorMode,
    pub width: u32,
    pub height: u32,
    /// `height / width`; portrait sources are `>= 1.2`.
    pub aspect_ratio: f64,
    pub byte_size: u64,
    pub has_transparency: bool,
}

impl SourceImage {
    /// Lowercased file extension without the dot (`"jpg"`, `"heic"`, ...).
    pub fn extension(&self) -> String {
        extension_of(&self.path)
    }
}

/// Lowercased extension of a path, empty when there is none.
pub fn extension_of(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

/// Caller-supplied descriptive record embedded into the "original" artifact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WallpaperMetadata {
    pub title: String,
    pub description: String,
    pub category: String,
    /// Ordered; only the first five reach the keyword list.
    #[serde(default)]
    pub tags: Vec<String>,
}

impl WallpaperMetadata {
    /// Default record for a file with no curated metadata.
    ///
    /// `ocean_sunset-02.jpg` becomes the title "Ocean Sunset 02".
    pub fn from_filename(path: &Path, category: &str) -> Self {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            title: title_case(&stem.replace(['_', '-'], " ")),
            description: "High-quality mobile wallpaper".to_string(),
            category: category.to_string(),
            tags: vec!["wallpaper".into(), "mobile".into(), "hd".into()],
        }
    }
}

fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first
                    .to_uppercase()
                    .chain(chars.flat_map(char::to_lowercase))
                    .collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// One profile's output file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProcessedArtifact {
    pub profile: String,
    pub path: PathBuf,
    pub filename: String,
    pub width: u32,
    pub height: u32,
    pub byte_size: u64,
    pub quality: u32,
    /// Whether EXIF metadata landed in the file. Always false for WebP outputs.
    pub metadata_embedded: bool,
    pub created_at: DateTime<Local>,
}

/// Aggregate outcome for one source image.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingResult {
    pub success: bool,
    pub source_path: PathBuf,
    /// Absent when the source was rejected before any profile ran.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<SourceImage>,
    /// Rejection reason when validation failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub artifacts: BTreeMap<String, ProcessedArtifact>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub errors: BTreeMap<String, String>,
    pub processed_at: DateTime<Local>,
}

impl ProcessingResult {
    /// Artifact for a profile, if that profile succeeded.
    pub fn artifact(&self, profile: &str) -> Option<&ProcessedArtifact> {
        self.artifacts.get(profile)
    }

    /// Human-readable failure summary, `None` on success.
    pub fn failure_summary(&self) -> Option<String> {
        if self.success {
            return None;
        }
        if let Some(error) = &self.error {
            return Some(error.clone());
        }
        let parts: Vec<String> = self
            .errors
            .iter()
            .map(|(profile, err)| format!("{profile}: {err}"))
            .collect();
        Some(if parts.is_empty() {
            "Unknown error".to_string()
        } else {
            parts.join("; ")
        })
    }
}
