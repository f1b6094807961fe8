//! Content-addressed output filenames.
//!
//! Every artifact produced from one source shares a base stem:
//!
//! ```text
//! wallpaper_{YYYYMMDD}_{md5[..8]}[_{profile}].{ext}
//! ```
//!
//! - The hash is the MD5 of the full source file bytes, so identical sources
//!   always map to the same names and distinct sources practically never collide.
//! - The date prefix keeps the output directory browsable in chronological order.
//! - The `_{profile}` suffix is omitted for the "original" profile only.
//!
//! Examples for a source hashing to `3f2a9c1b...` on 2024-03-09:
//! - `wallpaper_20240309_3f2a9c1b_thumbnail.webp`
//! - `wallpaper_20240309_3f2a9c1b.jpg`

use crate::config::ORIGINAL_PROFILE;
use chrono::{DateTime, TimeZone};
use md5::{Digest, Md5};
use std::io;
use std::path::Path;

/// Hex characters of the content hash kept in filenames.
pub const HASH_PREFIX_LEN: usize = 8;

/// MD5 of a file's contents, returned as a lowercase hex string.
pub fn hash_file(path: &Path) -> io::Result<String> {
    let bytes = std::fs::read(path)?;
    let digest = Md5::digest(&bytes);
    Ok(format!("{:x}", digest))
}

/// Shared stem for every artifact of one source: `wallpaper_{YYYYMMDD}_{hash8}`.
pub fn base_stem<Tz: TimeZone>(when: &DateTime<Tz>, content_hash: &str) -> String
where
    Tz::Offset: std::fmt::Display,
{
    let short = &content_hash[..content_hash.len().min(HASH_PREFIX_LEN)];
    format!("wallpaper_{}_{}", when.format("%Y%m%d"), short)
}

/// Filename for one profile's artifact.
pub fn artifact_filename(stem: &str, profile: &str, extension: &str) -> String {
    if profile == ORIGINAL_PROFILE {
        format!("{stem}.{extension}")
    } else {
        format!("{stem}_{profile}.{extension}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Local, Utc};

    #[test]
    fn hash_file_is_md5_hex() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("a.bin");
        std::fs::write(&path, b"hello").unwrap();
        assert_eq!(hash_file(&path).unwrap(), "5d41402abc4b2a76b9719d911017c592");
    }

    #[test]
    fn hash_file_missing_errors() {
        assert!(hash_file(Path::new("/nonexistent/file.jpg")).is_err());
    }

    #[test]
    fn stem_uses_date_and_short_hash() {
        let when = Utc.with_ymd_and_hms(2024, 3, 9, 23, 59, 0).unwrap();
        assert_eq!(
            base_stem(&when, "5d41402abc4b2a76b9719d911017c592"),
            "wallpaper_20240309_5d41402a"
        );
    }

    #[test]
    fn stem_tolerates_short_hash() {
        let when = Local.with_ymd_and_hms(2025, 1, 2, 8, 0, 0).unwrap();
        assert_eq!(base_stem(&when, "abc"), "wallpaper_20250102_abc");
    }

    #[test]
    fn original_has_no_profile_suffix() {
        let stem = "wallpaper_20240309_5d41402a";
        assert_eq!(
            artifact_filename(stem, "original", "jpg"),
            "wallpaper_20240309_5d41402a.jpg"
        );
        assert_eq!(
            artifact_filename(stem, "thumbnail", "webp"),
            "wallpaper_20240309_5d41402a_thumbnail.webp"
        );
    }

    #[test]
    fn identical_bytes_share_a_stem() {
        let tmp = tempfile::TempDir::new().unwrap();
        let a = tmp.path().join("a.jpg");
        let b = tmp.path().join("nested_copy.jpg");
        std::fs::write(&a, b"same bytes").unwrap();
        std::fs::write(&b, b"same bytes").unwrap();
        let when = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(
            base_stem(&when, &hash_file(&a).unwrap()),
            base_stem(&when, &hash_file(&b).unwrap())
        );
    }
}
