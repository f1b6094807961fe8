//! Retention trim for the output directory.
//!
//! Artifacts are never cleaned up by the pipeline itself. Callers that keep
//! the output directory around between runs use [`trim_output`] to cap it at
//! the N most recently modified images.

use std::io;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::{debug, info};

/// Extensions considered artifacts.
const ARTIFACT_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

fn is_artifact(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| ARTIFACT_EXTENSIONS.contains(&e.to_ascii_lowercase().as_str()))
}

/// Delete all but the `keep` newest artifacts directly inside `dir`.
///
/// Only top-level files are considered; subdirectories and other files are
/// left alone. Returns the deleted paths, oldest last.
pub fn trim_output(dir: &Path, keep: usize) -> io::Result<Vec<PathBuf>> {
    let mut files: Vec<(SystemTime, PathBuf)> = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        let meta = entry.metadata()?;
        if meta.is_file() && is_artifact(&path) {
            files.push((meta.modified()?, path));
        }
    }

    // Newest first; path breaks ties so the order is stable
    files.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| a.1.cmp(&b.1)));

    let mut deleted = Vec::new();
    for (_, path) in files.into_iter().skip(keep) {
        std::fs::remove_file(&path)?;
        debug!(path = %path.display(), "removed old artifact");
        deleted.push(path);
    }
    if !deleted.is_empty() {
        info!(removed = deleted.len(), kept = keep, "trimmed output directory");
    }
    Ok(deleted)
}
