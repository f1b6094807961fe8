//! Pipeline configuration.
//!
//! Handles loading, validating, and merging `wallpress.toml`. The resolved
//! [`PipelineConfig`] is immutable once built and is handed to
//! [`Pipeline::new`](crate::process::Pipeline::new); nothing in the crate
//! reads configuration from global state.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! output_dir = "processed_images"
//!
//! [branding]
//! artist = "WallpaperHub"
//! software = "WallpaperHub Publisher V3"
//! website = "https://wallpaperhub.com"
//! # copyright = "© WallpaperHub - https://wallpaperhub.com"
//!
//! [batch]
//! delay_ms = 0               # Pause between images
//! default_category = "abstract"
//! # max_processes = 4        # Omit for auto (CPU cores)
//!
//! [[profiles]]
//! name = "thumbnail"
//! width = 150
//! height = 200
//! quality = 95
//! format = "webp"
//! sharpness = 1.2
//! contrast = 1.1
//! ```
//!
//! ## Merging
//!
//! Config files are sparse. Tables merge key-by-key on top of the stock
//! defaults; arrays (including `[[profiles]]`) replace the default wholesale.
//! Unknown keys are rejected to catch typos early.

use crate::imaging::Enhancement;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Name of the profile that keeps source dimensions and receives metadata.
pub const ORIGINAL_PROFILE: &str = "original";

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PipelineConfig {
    /// Directory that receives every artifact. Created if absent.
    pub output_dir: PathBuf,
    /// Constants written into EXIF/IPTC by the metadata injector.
    pub branding: Branding,
    /// Batch orchestration settings.
    pub batch: BatchConfig,
    /// Target profiles, produced in this order.
    pub profiles: Vec<ResolutionProfile>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("processed_images"),
            branding: Branding::default(),
            batch: BatchConfig::default(),
            profiles: ResolutionProfile::standard_set(),
        }
    }
}

impl PipelineConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.profiles.is_empty() {
            return Err(ConfigError::Validation(
                "at least one profile is required".into(),
            ));
        }
        let mut seen = HashSet::new();
        for profile in &self.profiles {
            if !seen.insert(profile.name.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate profile name '{}'",
                    profile.name
                )));
            }
            profile.validate()?;
        }
        Ok(())
    }

    /// Look up a profile by name.
    pub fn profile(&self, name: &str) -> Option<&ResolutionProfile> {
        self.profiles.iter().find(|p| p.name == name)
    }
}

/// Output container policy for a profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfileFormat {
    /// Lossy WebP, best compression effort.
    WebP,
    /// Derived from the source: PNG stays PNG, everything else becomes JPEG.
    Source,
}

/// A named, statically configured output target.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolutionProfile {
    pub name: String,
    /// Exact output width; absent means "keep source dimensions".
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    #[serde(default = "default_quality")]
    pub quality: u32,
    pub format: ProfileFormat,
    #[serde(default = "unit_factor")]
    pub sharpness: f32,
    #[serde(default = "unit_factor")]
    pub contrast: f32,
}

fn default_quality() -> u32 {
    95
}

fn unit_factor() -> f32 {
    1.0
}

impl ResolutionProfile {
    fn sized(name: &str, width: u32, height: u32, sharpness: f32, contrast: f32) -> Self {
        Self {
            name: name.to_string(),
            width: Some(width),
            height: Some(height),
            quality: default_quality(),
            format: ProfileFormat::WebP,
            sharpness,
            contrast,
        }
    }

    /// The four profiles every wallpaper is published in.
    pub fn standard_set() -> Vec<Self> {
        vec![
            Self::sized("thumbnail", 150, 200, 1.2, 1.1),
            Self::sized("medium", 400, 533, 1.1, 1.0),
            Self::sized("large", 720, 960, 1.1, 1.0),
            Self {
                name: ORIGINAL_PROFILE.to_string(),
                width: None,
                height: None,
                quality: default_quality(),
                format: ProfileFormat::Source,
                sharpness: 1.0,
                contrast: 1.0,
            },
        ]
    }

    /// Fixed `(width, height)` target, or `None` for encode-only profiles.
    pub fn target(&self) -> Option<(u32, u32)> {
        match (self.width, self.height) {
            (Some(w), Some(h)) => Some((w, h)),
            _ => None,
        }
    }

    pub fn is_original(&self) -> bool {
        self.name == ORIGINAL_PROFILE
    }

    pub fn enhancement(&self) -> Enhancement {
        Enhancement {
            sharpness: self.sharpness,
            contrast: self.contrast,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let err = |msg: &str| ConfigError::Validation(format!("profiles.{}: {msg}", self.name));
        if self.name.trim().is_empty() {
            return Err(ConfigError::Validation(
                "profile names must not be empty".into(),
            ));
        }
        match (self.width, self.height) {
            (Some(0), _) | (_, Some(0)) => return Err(err("width/height must be non-zero")),
            (Some(_), None) | (None, Some(_)) => {
                return Err(err("width and height must be set together"));
            }
            _ => {}
        }
        if !(1..=100).contains(&self.quality) {
            return Err(err("quality must be 1-100"));
        }
        if self.sharpness <= 0.0 || self.contrast <= 0.0 {
            return Err(err("sharpness/contrast must be positive"));
        }
        Ok(())
    }
}

/// Provenance constants embedded in the "original" artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Branding {
    pub artist: String,
    pub software: String,
    pub website: String,
    /// Defaults to `"© {artist} - {website}"` when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub copyright: Option<String>,
}

impl Default for Branding {
    fn default() -> Self {
        Self {
            artist: "WallpaperHub".to_string(),
            software: "WallpaperHub Publisher V3".to_string(),
            website: "https://wallpaperhub.com".to_string(),
            copyright: None,
        }
    }
}

impl Branding {
    pub fn copyright_notice(&self) -> String {
        self.copyright
            .clone()
            .unwrap_or_else(|| format!("\u{a9} {} - {}", self.artist, self.website))
    }
}

/// Batch orchestration settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BatchConfig {
    /// Pause between consecutive images. Non-zero forces sequential processing.
    pub delay_ms: u64,
    /// Maximum parallel workers when `delay_ms` is zero.
    /// When absent, defaults to the number of CPU cores.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_processes: Option<usize>,
    /// Category used for filename-derived metadata.
    pub default_category: String,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            delay_ms: 0,
            max_processes: None,
            default_category: "abstract".to_string(),
        }
    }
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &BatchConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_processes
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> Result<toml::Value, ConfigError> {
    toml::Value::try_from(PipelineConfig::default())
        .map_err(|e| ConfigError::Validation(format!("stock defaults: {e}")))
}

/// Recursively merge `overlay` on top of `base`.
///
/// - Tables are merged key-by-key (overlay keys override base keys).
/// - Non-table values in overlay, arrays included, replace base values entirely.
pub fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Merge an optional overlay onto the stock defaults, then deserialize and validate.
pub fn resolve_config(overlay: Option<toml::Value>) -> Result<PipelineConfig, ConfigError> {
    let base = stock_defaults_value()?;
    let merged = match overlay {
        Some(ov) => merge_toml(base, ov),
        None => base,
    };
    let config: PipelineConfig = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Parse a config document from a string.
pub fn parse_config(content: &str) -> Result<PipelineConfig, ConfigError> {
    let value: toml::Value = toml::from_str(content)?;
    resolve_config(Some(value))
}

/// Load config from a file. A missing file yields the stock defaults.
pub fn load_config(path: &Path) -> Result<PipelineConfig, ConfigError> {
    if !path.exists() {
        return resolve_config(None);
    }
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Returns a fully-commented stock `wallpress.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# wallpress configuration
# =======================
# All keys are optional. Unknown keys are rejected.

# Directory that receives every generated artifact (created if absent).
output_dir = "processed_images"

# Provenance constants embedded into the "original" artifact's EXIF/IPTC.
[branding]
artist = "WallpaperHub"
software = "WallpaperHub Publisher V3"
website = "https://wallpaperhub.com"
# copyright = "© WallpaperHub - https://wallpaperhub.com"

[batch]
# Pause between images in milliseconds. Non-zero forces sequential processing.
delay_ms = 0
# Parallel workers when delay_ms is 0. Omit to use every CPU core.
# max_processes = 4
# Category used when metadata is derived from filenames.
default_category = "abstract"

# Output profiles. Declaring any [[profiles]] replaces the whole list.
# format = "webp"   lossy WebP, best compression effort
# format = "source" PNG stays PNG, HEIC/HEIF and everything else become JPEG
# A profile without width/height keeps the source dimensions.

[[profiles]]
name = "thumbnail"
width = 150
height = 200
quality = 95
format = "webp"
sharpness = 1.2
contrast = 1.1

[[profiles]]
name = "medium"
width = 400
height = 533
quality = 95
format = "webp"
sharpness = 1.1

[[profiles]]
name = "large"
width = 720
height = 960
quality = 95
format = "webp"
sharpness = 1.1

[[profiles]]
name = "original"
quality = 95
format = "source"
"##
}
