//! Profile → render plan.
//!
//! Pure functions: given a profile and a source, decide the output
//! container, extension, crop target and enhancement. No I/O; the backend
//! executes the plan.
//!
//! ## Container policy
//!
//! | Profile | Source | Output |
//! |---|---|---|
//! | sized (thumbnail/medium/large) | any | lossy WebP, best method |
//! | original | heic, heif | progressive JPEG, `.jpg` |
//! | original | png | PNG, `.png` |
//! | original | jpg, jpeg | progressive JPEG, source extension |
//! | original | bmp, tif, tiff, webp | progressive JPEG, `.jpg` |

use super::params::{Encoding, Quality, RenderParams, WEBP_BEST_METHOD};
use crate::config::{ProfileFormat, ResolutionProfile};
use crate::naming::artifact_filename;
use std::path::Path;

/// Output container and extension for one profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OutputFormat {
    pub encoding: Encoding,
    pub extension: &'static str,
}

/// Decide container and extension from the profile policy and the
/// lowercased source extension.
pub fn plan_output_format(profile: &ResolutionProfile, source_ext: &str) -> OutputFormat {
    let quality = Quality::new(profile.quality);
    let encoding = match profile.format {
        ProfileFormat::WebP => Encoding::WebP {
            quality,
            method: WEBP_BEST_METHOD,
        },
        ProfileFormat::Source if source_ext == "png" => Encoding::Png,
        ProfileFormat::Source => Encoding::Jpeg {
            quality,
            progressive: true,
        },
    };
    // A `.jpeg` source keeps its spelling
    let extension = match (encoding, source_ext) {
        (Encoding::Jpeg { .. }, "jpeg") => "jpeg",
        _ => encoding.extension(),
    };
    OutputFormat {
        encoding,
        extension,
    }
}

/// Build the full render plan for one profile.
pub fn plan_render(
    source: &Path,
    source_ext: &str,
    output_dir: &Path,
    stem: &str,
    profile: &ResolutionProfile,
) -> RenderParams {
    let format = plan_output_format(profile, source_ext);
    let filename = artifact_filename(stem, &profile.name, format.extension);
    RenderParams {
        source: source.to_path_buf(),
        output: output_dir.join(filename),
        target: profile.target(),
        enhancement: profile.enhancement(),
        encoding: format.encoding,
    }
}
