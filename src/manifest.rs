//! Manifest builder: folds per-profile outcomes into a [`ProcessingResult`].
//!
//! Pure aggregation with no I/O. The builder knows which profiles were
//! expected, so a run that silently skipped a profile still reports failure.

use crate::imaging::Rendered;
use crate::types::{ProcessedArtifact, ProcessingResult, SourceImage};
use chrono::{DateTime, Local};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

pub struct ManifestBuilder {
    source: SourceImage,
    expected: Vec<String>,
    artifacts: BTreeMap<String, ProcessedArtifact>,
    errors: BTreeMap<String, String>,
    processed_at: DateTime<Local>,
}

impl ManifestBuilder {
    pub fn new(
        source: SourceImage,
        expected: impl IntoIterator<Item = String>,
        processed_at: DateTime<Local>,
    ) -> Self {
        Self {
            source,
            expected: expected.into_iter().collect(),
            artifacts: BTreeMap::new(),
            errors: BTreeMap::new(),
            processed_at,
        }
    }

    /// Result for a source that never reached the profiles.
    pub fn rejected(path: &Path, error: String, processed_at: DateTime<Local>) -> ProcessingResult {
        ProcessingResult {
            success: false,
            source_path: path.to_path_buf(),
            source: None,
            error: Some(error),
            artifacts: BTreeMap::new(),
            errors: BTreeMap::new(),
            processed_at,
        }
    }

    pub fn record_artifact(&mut self, artifact: ProcessedArtifact) {
        self.errors.remove(&artifact.profile);
        self.artifacts.insert(artifact.profile.clone(), artifact);
    }

    pub fn record_failure(&mut self, profile: &str, error: String) {
        self.artifacts.remove(profile);
        self.errors.insert(profile.to_string(), error);
    }

    /// Success only when every expected profile produced an artifact.
    pub fn build(mut self) -> ProcessingResult {
        for name in &self.expected {
            if !self.artifacts.contains_key(name) && !self.errors.contains_key(name) {
                self.errors
                    .insert(name.clone(), "profile produced no artifact".to_string());
            }
        }
        let success = self.errors.is_empty()
            && self.expected.iter().all(|n| self.artifacts.contains_key(n));
        ProcessingResult {
            success,
            source_path: self.source.path.clone(),
            source: Some(self.source),
            error: None,
            artifacts: self.artifacts,
            errors: self.errors,
            processed_at: self.processed_at,
        }
    }
}

/// Describe a written artifact.
pub fn artifact_from_render(
    profile: &str,
    path: PathBuf,
    rendered: Rendered,
    quality: u32,
    metadata_embedded: bool,
    created_at: DateTime<Local>,
) -> ProcessedArtifact {
    let filename = path
        .file_name()
        .map(|f| f.to_string_lossy().into_owned())
        .unwrap_or_default();
    ProcessedArtifact {
        profile: profile.to_string(),
        path,
        filename,
        width: rendered.width,
        height: rendered.height,
        byte_size: rendered.byte_size,
        quality,
        metadata_embedded,
        created_at,
    }
}
