//! Metadata injection for the "original" artifact.
//!
//! A caller-supplied [`WallpaperMetadata`] record is turned into two
//! independent embedded blocks:
//!
//! ## EXIF
//!
//! | Field | Value |
//! |---|---|
//! | ImageDescription | description |
//! | Artist / Software / Copyright | [`Branding`] constants |
//! | XPTitle | title |
//! | XPComment | description |
//! | XPKeywords | keywords joined by `", "` |
//! | XPSubject | `"{category} mobile wallpaper"` |
//! | UserComment | `"{title} - {description}"` |
//!
//! ## IPTC
//!
//! Keywords (max 15), caption, headline, object name, a 3-character
//! uppercased category code, supplemental categories
//! `[category, "mobile", "wallpaper"]`, copyright, credit, source and special
//! instructions.
//!
//! ## Failure policy
//!
//! Injection is best-effort. EXIF and IPTC are attempted independently; each
//! failure is logged on its own and never propagated. [`inject`] returns
//! whether the EXIF block landed, which is what the artifact records as
//! `metadata_embedded`.

use crate::config::Branding;
use crate::imaging::{ExifFields, ImageBackend, IptcRecord};
use crate::types::WallpaperMetadata;
use std::path::Path;
use tracing::{debug, warn};

pub const DEFAULT_TITLE: &str = "Mobile Wallpaper";
pub const DEFAULT_DESCRIPTION: &str = "High-quality mobile wallpaper";
pub const DEFAULT_CATEGORY: &str = "wallpaper";

/// Caller tags beyond this are not used as keywords.
pub const MAX_CALLER_TAGS: usize = 5;

/// Metadata with empty fields replaced by defaults.
struct Resolved<'a> {
    title: &'a str,
    description: &'a str,
    category: &'a str,
    tags: &'a [String],
}

fn or_default<'a>(value: &'a str, fallback: &'static str) -> &'a str {
    match value.trim() {
        "" => fallback,
        trimmed => trimmed,
    }
}

impl<'a> Resolved<'a> {
    fn new(meta: &'a WallpaperMetadata) -> Self {
        Self {
            title: or_default(&meta.title, DEFAULT_TITLE),
            description: or_default(&meta.description, DEFAULT_DESCRIPTION),
            category: or_default(&meta.category, DEFAULT_CATEGORY),
            tags: &meta.tags,
        }
    }
}

/// Search keywords: five fixed phrases, then up to five caller tags.
pub fn derive_keywords(meta: &WallpaperMetadata) -> Vec<String> {
    let resolved = Resolved::new(meta);
    let mut keywords = vec![
        format!("{} wallpaper", resolved.category),
        "mobile wallpaper".to_string(),
        "phone background".to_string(),
        "HD wallpaper".to_string(),
        "smartphone wallpaper".to_string(),
    ];
    keywords.extend(
        resolved
            .tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .take(MAX_CALLER_TAGS)
            .map(str::to_string),
    );
    keywords
}

/// Three-character uppercased category code (`"nature"` → `"NAT"`).
pub fn category_code(category: &str) -> String {
    category.chars().take(3).collect::<String>().to_uppercase()
}

/// EXIF fields for a record.
pub fn exif_fields(meta: &WallpaperMetadata, branding: &Branding) -> ExifFields {
    let r = Resolved::new(meta);
    ExifFields {
        description: r.description.to_string(),
        artist: branding.artist.clone(),
        software: branding.software.clone(),
        copyright: branding.copyright_notice(),
        xp_title: r.title.to_string(),
        xp_comment: r.description.to_string(),
        xp_keywords: derive_keywords(meta).join(", "),
        xp_subject: format!("{} mobile wallpaper", r.category),
        user_comment: format!("{} - {}", r.title, r.description),
    }
}

/// IPTC record for a record.
pub fn iptc_record(meta: &WallpaperMetadata, branding: &Branding) -> IptcRecord {
    let r = Resolved::new(meta);
    IptcRecord {
        object_name: r.title.to_string(),
        headline: r.title.to_string(),
        caption: r.description.to_string(),
        category: category_code(r.category),
        supplemental_categories: vec![
            r.category.to_string(),
            "mobile".to_string(),
            "wallpaper".to_string(),
        ],
        keywords: derive_keywords(meta),
        special_instructions: format!(
            "Mobile wallpaper in {} category - Free download",
            r.category
        ),
        credit: branding.artist.clone(),
        source: branding.website.clone(),
        copyright: branding.copyright_notice(),
    }
}

/// Embed EXIF and IPTC into `path`. Returns whether EXIF was written.
///
/// Never fails: errors are logged and reflected only in the return value.
pub fn inject(
    backend: &impl ImageBackend,
    path: &Path,
    meta: &WallpaperMetadata,
    branding: &Branding,
) -> bool {
    let exif_ok = match backend.embed_exif(path, &exif_fields(meta, branding)) {
        Ok(()) => {
            debug!(path = %path.display(), "EXIF metadata embedded");
            true
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "could not embed EXIF metadata");
            false
        }
    };

    match backend.embed_iptc(path, &iptc_record(meta, branding)) {
        Ok(()) => debug!(path = %path.display(), "IPTC metadata embedded"),
        Err(e) => warn!(path = %path.display(), error = %e, "could not embed IPTC metadata"),
    }

    exif_ok
}
