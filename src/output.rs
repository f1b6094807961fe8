//! CLI output formatting for every command.
//!
//! # Information-First Display
//!
//! Each entity (source image, artifact) leads with its identity: the source
//! filename or the profile name. Paths, sizes and reasons follow as indented
//! context lines. The same helpers render a single `process` run and every
//! image inside a batch, so both read alike.
//!
//! # Output Format
//!
//! ## Process
//!
//! ```text
//! sunset.jpg  1080x1920 jpeg
//!     thumbnail  150x200   12.3 KB  wallpaper_20240309_5d41402a_thumbnail.webp
//!     medium     400x533   48.0 KB  wallpaper_20240309_5d41402a_medium.webp
//!     large      720x960  120.5 KB  wallpaper_20240309_5d41402a_large.webp
//!     original  1080x1920 812.9 KB  wallpaper_20240309_5d41402a.jpg  (metadata)
//! ```
//!
//! ## Batch
//!
//! ```text
//! Processing 3 images (parallel)
//! 001/003 sunset.jpg: ok
//! 002/003 wide.jpg: failed
//!     Image should be in portrait orientation (height > width * 1.2), got 500x400
//!
//! 2 succeeded, 1 failed of 3
//! ```
//!
//! # Architecture
//!
//! Each command has a `format_*` function (returns `Vec<String>`) for
//! testability and a `print_*` wrapper that writes to stdout. Format functions
//! are pure: no I/O, no side effects.

use crate::batch::{BatchEvent, BatchReport};
use crate::imaging::EmbeddedMetadata;
use crate::types::{ProcessingResult, SourceImage};
use crate::validate::ValidationOutcome;
use std::path::{Path, PathBuf};

// ============================================================================
// Shared entity display helpers
// ============================================================================

/// Format a 1-based positional index as 3-digit zero-padded.
fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

/// Return indentation string: 4 spaces per depth level.
fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn kilobytes(bytes: u64) -> String {
    format!("{:.1} KB", bytes as f64 / 1024.0)
}

/// Truncate text to `max` characters, appending `...` if truncated.
fn truncate_desc(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max).collect();
        format!("{cut}...")
    }
}

/// `sunset.jpg  1080x1920 jpeg`
fn source_line(source: &SourceImage) -> String {
    let format = serde_json::to_value(source.format)
        .ok()
        .and_then(|v| v.as_str().map(str::to_string))
        .unwrap_or_default();
    let mut line = format!(
        "{}  {}x{} {}",
        source.filename, source.width, source.height, format
    );
    if source.has_transparency {
        line.push_str(" (transparent)");
    }
    line
}

// ============================================================================
// validate
// ============================================================================

pub fn format_validation(path: &Path, outcome: &ValidationOutcome) -> Vec<String> {
    let verdict = if outcome.is_valid {
        outcome.reason.clone()
    } else {
        format!("Invalid: {}", outcome.reason)
    };
    vec![display_name(path), format!("{}{}", indent(1), verdict)]
}

pub fn print_validation(path: &Path, outcome: &ValidationOutcome) {
    for line in format_validation(path, outcome) {
        println!("{}", line);
    }
}

// ============================================================================
// process
// ============================================================================

/// Source header, one line per artifact, then one line per failed profile.
pub fn format_process_result(result: &ProcessingResult) -> Vec<String> {
    let mut lines = Vec::new();
    match &result.source {
        Some(source) => lines.push(source_line(source)),
        None => lines.push(display_name(&result.source_path)),
    }
    if let Some(error) = &result.error {
        lines.push(format!("{}Rejected: {}", indent(1), error));
        return lines;
    }

    let name_width = result
        .artifacts
        .keys()
        .chain(result.errors.keys())
        .map(|k| k.len())
        .max()
        .unwrap_or(0);

    for artifact in result.artifacts.values() {
        let dims = format!("{}x{}", artifact.width, artifact.height);
        let mut line = format!(
            "{}{:<nw$}  {:>9} {:>9}  {}",
            indent(1),
            artifact.profile,
            dims,
            kilobytes(artifact.byte_size),
            artifact.filename,
            nw = name_width,
        );
        if artifact.metadata_embedded {
            line.push_str("  (metadata)");
        }
        lines.push(line);
    }
    for (profile, error) in &result.errors {
        lines.push(format!(
            "{}{:<nw$}  failed: {}",
            indent(1),
            profile,
            error,
            nw = name_width
        ));
    }
    lines
}

pub fn print_process_result(result: &ProcessingResult) {
    for line in format_process_result(result) {
        println!("{}", line);
    }
}

// ============================================================================
// batch
// ============================================================================

/// Format a single batch progress event as display lines.
pub fn format_batch_event(event: &BatchEvent) -> Vec<String> {
    match event {
        BatchEvent::Started { total, parallel } => {
            let mode = if *parallel { "parallel" } else { "sequential" };
            vec![format!("Processing {} images ({})", total, mode)]
        }
        BatchEvent::ImageFinished {
            index,
            total,
            result,
        } => {
            let status = if result.success { "ok" } else { "failed" };
            let mut lines = vec![format!(
                "{}/{} {}: {}",
                format_index(*index),
                format_index(*total),
                display_name(&result.source_path),
                status
            )];
            if let Some(summary) = result.failure_summary() {
                lines.push(format!("{}{}", indent(1), truncate_desc(&summary, 160)));
            }
            lines
        }
        BatchEvent::Cancelled { completed, skipped } => vec![format!(
            "Cancelled after {} images, {} skipped",
            completed, skipped
        )],
    }
}

pub fn format_batch_report(report: &BatchReport) -> Vec<String> {
    let mut lines = vec![String::new()];
    if !report.errors.is_empty() {
        lines.push("Errors".to_string());
        for (path, error) in &report.errors {
            lines.push(format!("{}{}", indent(1), display_name(Path::new(path))));
            lines.push(format!("{}{}", indent(2), truncate_desc(error, 160)));
        }
    }
    lines.push(format!(
        "{} succeeded, {} failed of {}",
        report.successful, report.failed, report.total
    ));
    lines
}

pub fn print_batch_report(report: &BatchReport) {
    for line in format_batch_report(report) {
        println!("{}", line);
    }
}

// ============================================================================
// trim
// ============================================================================

pub fn format_trim(deleted: &[PathBuf], keep: usize) -> Vec<String> {
    let mut lines: Vec<String> = deleted
        .iter()
        .map(|p| format!("removed {}", display_name(p)))
        .collect();
    lines.push(format!(
        "Removed {} files, kept the {} most recent",
        deleted.len(),
        keep
    ));
    lines
}

pub fn print_trim(deleted: &[PathBuf], keep: usize) {
    for line in format_trim(deleted, keep) {
        println!("{}", line);
    }
}

// ============================================================================
// inspect
// ============================================================================

fn push_field(lines: &mut Vec<String>, label: &str, value: &str) {
    if !value.is_empty() {
        lines.push(format!("{}{}: {}", indent(2), label, value));
    }
}

pub fn format_inspect(path: &Path, metadata: &EmbeddedMetadata) -> Vec<String> {
    let mut lines = vec![display_name(path)];
    if metadata.is_empty() {
        lines.push(format!("{}No embedded metadata", indent(1)));
        return lines;
    }

    if let Some(exif) = &metadata.exif {
        lines.push(format!("{}EXIF", indent(1)));
        push_field(&mut lines, "Title", &exif.xp_title);
        push_field(&mut lines, "Description", &exif.description);
        push_field(&mut lines, "Artist", &exif.artist);
        push_field(&mut lines, "Software", &exif.software);
        push_field(&mut lines, "Copyright", &exif.copyright);
        push_field(&mut lines, "Subject", &exif.xp_subject);
        push_field(&mut lines, "Keywords", &exif.xp_keywords);
        push_field(&mut lines, "Comment", &exif.user_comment);
    }
    if let Some(iptc) = &metadata.iptc {
        lines.push(format!("{}IPTC", indent(1)));
        push_field(&mut lines, "Headline", &iptc.headline);
        push_field(&mut lines, "Caption", &iptc.caption);
        push_field(&mut lines, "Category", &iptc.category);
        push_field(&mut lines, "Supplemental", &iptc.supplemental_categories.join(", "));
        push_field(&mut lines, "Keywords", &iptc.keywords.join(", "));
        push_field(&mut lines, "Credit", &iptc.credit);
        push_field(&mut lines, "Source", &iptc.source);
        push_field(&mut lines, "Instructions", &iptc.special_instructions);
    }
    lines
}

pub fn print_inspect(path: &Path, metadata: &EmbeddedMetadata) {
    for line in format_inspect(path, metadata) {
        println!("{}", line);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::imaging::{ExifFields, IptcRecord, Rendered};
    use crate::manifest::{ManifestBuilder, artifact_from_render};
    use crate::types::{ColorMode, ContainerFormat};
    use crate::validate::ValidationError;
    use chrono::Local;

    fn source() -> SourceImage {
        SourceImage {
            path: PathBuf::from("/in/sunset.jpg"),
            filename: "sunset.jpg".into(),
            format: ContainerFormat::Jpeg,
            color_mode: ColorMode::Rgb,
            width: 1080,
            height: 1920,
            aspect_ratio: 1920.0 / 1080.0,
            byte_size: 4096,
            has_transparency: false,
        }
    }

    fn result_with_failure() -> ProcessingResult {
        let now = Local::now();
        let mut builder = ManifestBuilder::new(
            source(),
            ["thumbnail", "large"].map(String::from),
            now,
        );
        builder.record_artifact(artifact_from_render(
            "thumbnail",
            PathBuf::from("/out/w_thumbnail.webp"),
            Rendered {
                width: 150,
                height: 200,
                byte_size: 2048,
            },
            95,
            false,
            now,
        ));
        builder.record_failure("large", "Encoding failed: boom".into());
        builder.build()
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    #[test]
    fn format_index_pads() {
        assert_eq!(format_index(1), "001");
        assert_eq!(format_index(42), "042");
        assert_eq!(format_index(1000), "1000");
    }

    #[test]
    fn truncate_desc_counts_chars() {
        assert_eq!(truncate_desc("short", 10), "short");
        assert_eq!(truncate_desc("abcdef", 3), "abc...");
        assert_eq!(truncate_desc("\u{e9}\u{e9}\u{e9}\u{e9}", 2), "\u{e9}\u{e9}...");
    }

    #[test]
    fn source_line_names_container() {
        assert_eq!(source_line(&source()), "sunset.jpg  1080x1920 jpeg");
    }

    // =========================================================================
    // Commands
    // =========================================================================

    #[test]
    fn validation_ok_and_err() {
        let ok = format_validation(
            Path::new("/in/sunset.jpg"),
            &ValidationOutcome::from(&Ok::<_, ValidationError>(())),
        );
        assert_eq!(ok, vec!["sunset.jpg", "    Valid image"]);

        let err = format_validation(
            Path::new("/in/tiny.png"),
            &ValidationOutcome::from(&Err::<(), _>(ValidationError::TooSmall {
                width: 50,
                height: 50,
            })),
        );
        assert_eq!(err[0], "tiny.png");
        assert!(err[1].starts_with("    Invalid: Image too small: 50x50"));
    }

    #[test]
    fn process_result_lists_artifacts_then_failures() {
        let lines = format_process_result(&result_with_failure());
        assert_eq!(lines[0], "sunset.jpg  1080x1920 jpeg");
        assert!(lines[1].starts_with("    thumbnail"));
        assert!(lines[1].contains("150x200"));
        assert!(lines[1].contains("2.0 KB"));
        assert!(lines[1].ends_with("w_thumbnail.webp"));
        assert_eq!(lines[2], "    large      failed: Encoding failed: boom");
    }

    #[test]
    fn process_result_rejected() {
        let result = ManifestBuilder::rejected(
            Path::new("/in/anim.gif"),
            "Unsupported format: .gif".into(),
            Local::now(),
        );
        assert_eq!(
            format_process_result(&result),
            vec!["anim.gif", "    Rejected: Unsupported format: .gif"]
        );
    }

    #[test]
    fn batch_events() {
        assert_eq!(
            format_batch_event(&BatchEvent::Started {
                total: 3,
                parallel: true
            }),
            vec!["Processing 3 images (parallel)"]
        );

        let lines = format_batch_event(&BatchEvent::ImageFinished {
            index: 2,
            total: 3,
            result: Box::new(result_with_failure()),
        });
        assert_eq!(lines[0], "002/003 sunset.jpg: failed");
        assert_eq!(lines[1], "    large: Encoding failed: boom");

        assert_eq!(
            format_batch_event(&BatchEvent::Cancelled {
                completed: 1,
                skipped: 2
            }),
            vec!["Cancelled after 1 images, 2 skipped"]
        );
    }

    #[test]
    fn batch_report_summary() {
        let report = BatchReport::from_results(vec![result_with_failure()]);
        let lines = format_batch_report(&report);
        assert_eq!(lines[1], "Errors");
        assert_eq!(lines[2], "    sunset.jpg");
        assert_eq!(lines.last().unwrap(), "0 succeeded, 1 failed of 1");
    }

    #[test]
    fn trim_summary() {
        let lines = format_trim(&[PathBuf::from("/out/a.webp")], 5);
        assert_eq!(
            lines,
            vec!["removed a.webp", "Removed 1 files, kept the 5 most recent"]
        );
    }

    #[test]
    fn inspect_lists_present_fields_only() {
        let metadata = EmbeddedMetadata {
            exif: Some(ExifFields {
                xp_title: "Ocean".into(),
                artist: "Studio".into(),
                ..ExifFields::default()
            }),
            iptc: Some(IptcRecord {
                keywords: vec!["a".into(), "b".into()],
                ..IptcRecord::default()
            }),
        };
        let lines = format_inspect(Path::new("/out/x.jpg"), &metadata);
        assert_eq!(
            lines,
            vec![
                "x.jpg",
                "    EXIF",
                "        Title: Ocean",
                "        Artist: Studio",
                "    IPTC",
                "        Keywords: a, b",
            ]
        );
    }

    #[test]
    fn inspect_empty() {
        let lines = format_inspect(Path::new("x.webp"), &EmbeddedMetadata::default());
        assert_eq!(lines, vec!["x.webp", "    No embedded metadata"]);
    }
}
