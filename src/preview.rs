//! HTML preview of one processing result.
//!
//! Renders a single self-contained page with the source summary and a card
//! per artifact, in configured profile order. Image `src` attributes are bare
//! filenames, so the page is meant to be written next to the artifacts
//! (`{output_dir}/preview.html`).
//!
//! Uses [maud](https://maud.lambda.xyz/) for compile-time HTML templating;
//! every interpolated value is escaped.

use crate::config::{PipelineConfig, ResolutionProfile};
use crate::types::{ProcessedArtifact, ProcessingResult, SourceImage};
use maud::{DOCTYPE, Markup, html};
use std::io;
use std::path::PathBuf;

pub const PREVIEW_FILENAME: &str = "preview.html";

const CSS: &str = "\
body{font-family:system-ui,sans-serif;margin:2rem;background:#111;color:#eee}\
h1{font-size:1.4rem}\
.error{color:#f66}\
.grid{display:flex;flex-wrap:wrap;gap:1.5rem;align-items:flex-start}\
.card{background:#1c1c1c;padding:1rem;border-radius:8px}\
.card img{display:block;max-width:240px;height:auto;margin-bottom:.5rem}\
dl{display:grid;grid-template-columns:auto auto;gap:.2rem 1rem;margin:0}\
dt{color:#999}\
";

fn kilobytes(bytes: u64) -> String {
    format!("{:.1} KB", bytes as f64 / 1024.0)
}

fn base_document(title: &str, content: Markup) -> Markup {
    html! {
        (DOCTYPE)
        html lang="en" {
            head {
                meta charset="UTF-8";
                meta name="viewport" content="width=device-width, initial-scale=1.0";
                title { (title) }
                style { (CSS) }
            }
            body {
                (content)
            }
        }
    }
}

fn source_summary(source: &SourceImage) -> Markup {
    html! {
        section.source {
            h2 { "Original" }
            dl {
                dt { "File" } dd { (source.filename) }
                dt { "Dimensions" } dd { (source.width) "\u{d7}" (source.height) }
                dt { "Aspect" } dd { (format!("{:.2}", source.aspect_ratio)) }
                dt { "Size" } dd { (kilobytes(source.byte_size)) }
                dt { "Transparency" } dd { @if source.has_transparency { "yes" } @else { "no" } }
            }
        }
    }
}

fn artifact_card(artifact: &ProcessedArtifact) -> Markup {
    html! {
        figure.card {
            img src=(artifact.filename) alt=(artifact.profile) loading="lazy";
            figcaption {
                strong { (artifact.profile) }
                dl {
                    dt { "Dimensions" } dd { (artifact.width) "\u{d7}" (artifact.height) }
                    dt { "Size" } dd { (kilobytes(artifact.byte_size)) }
                    dt { "Quality" } dd { (artifact.quality) }
                    dt { "File" } dd { code { (artifact.filename) } }
                    @if artifact.metadata_embedded {
                        dt { "Metadata" } dd { "embedded" }
                    }
                }
            }
        }
    }
}

/// Artifacts in profile order; any profile not in `profiles` trails in name order.
fn in_profile_order<'a>(
    result: &'a ProcessingResult,
    profiles: &[ResolutionProfile],
) -> Vec<&'a ProcessedArtifact> {
    let mut ordered: Vec<&ProcessedArtifact> = profiles
        .iter()
        .filter_map(|p| result.artifact(&p.name))
        .collect();
    ordered.extend(
        result
            .artifacts
            .values()
            .filter(|a| !profiles.iter().any(|p| p.name == a.profile)),
    );
    ordered
}

/// Render the preview page.
pub fn render_preview(result: &ProcessingResult, profiles: &[ResolutionProfile]) -> Markup {
    let name = result
        .source_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let content = html! {
        h1 { "Processing result: " (name) }
        @if let Some(summary) = result.failure_summary() {
            p.error { "Failed: " (summary) }
        }
        @if let Some(source) = &result.source {
            (source_summary(source))
        }
        @if !result.artifacts.is_empty() {
            section.grid {
                @for artifact in in_profile_order(result, profiles) {
                    (artifact_card(artifact))
                }
            }
        }
        footer {
            small { "Processed " (result.processed_at.format("%Y-%m-%d %H:%M:%S").to_string()) }
        }
    };
    base_document(&format!("{name} - preview"), content)
}

/// Write `preview.html` into the output directory and return its path.
pub fn write_preview(result: &ProcessingResult, config: &PipelineConfig) -> io::Result<PathBuf> {
    let path = config.output_dir.join(PREVIEW_FILENAME);
    std::fs::write(&path, render_preview(result, &config.profiles).into_string())?;
    Ok(path)
}
