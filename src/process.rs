//! Resolution pipeline: one source image in, one artifact per profile out.
//!
//! ## Per-image flow
//!
//! ```text
//! validate ──✗──► ProcessingResult { success: false, error }
//!    │
//!    ▼
//! md5(source) → stem "wallpaper_{YYYYMMDD}_{hash8}"
//!    │
//!    ▼  for each profile, independently
//! plan_render → backend.render → [original + metadata] inject → artifact
//!    │                     ✗ → errors[profile], continue
//!    ▼
//! ManifestBuilder::build
//! ```
//!
//! ## Output Structure
//!
//! ```text
//! processed_images/
//! ├── wallpaper_20240309_5d41402a_thumbnail.webp   # 150x200
//! ├── wallpaper_20240309_5d41402a_medium.webp      # 400x533
//! ├── wallpaper_20240309_5d41402a_large.webp       # 720x960
//! └── wallpaper_20240309_5d41402a.jpg              # source size, EXIF + IPTC
//! ```
//!
//! ## Failure policy
//!
//! Validation failures and per-profile codec failures are reported inside
//! the returned [`ProcessingResult`], never as `Err`. A failed profile does
//! not stop the others, so a failed result may leave a partial artifact set
//! on disk; nothing is rolled back.
//!
//! The pipeline holds no mutable state. One [`Pipeline`] can serve many
//! threads at once as long as the backend is `Sync`.

use crate::config::{ConfigError, PipelineConfig};
use crate::imaging::{ImageBackend, plan_render};
use crate::manifest::{ManifestBuilder, artifact_from_render};
use crate::metadata;
use crate::naming::{base_stem, hash_file};
use crate::types::{ProcessingResult, SourceImage, WallpaperMetadata};
use crate::validate::{ValidationError, validate};
use chrono::{DateTime, Local};
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

/// A configured pipeline bound to a backend.
pub struct Pipeline<B: ImageBackend> {
    config: PipelineConfig,
    backend: B,
}

impl<B: ImageBackend> Pipeline<B> {
    /// Validate the configuration and create the output directory.
    pub fn new(config: PipelineConfig, backend: B) -> Result<Self, ProcessError> {
        config.validate()?;
        std::fs::create_dir_all(&config.output_dir)?;
        Ok(Self { config, backend })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Run only the validator.
    pub fn validate(&self, path: &Path) -> Result<SourceImage, ValidationError> {
        validate(&self.backend, path)
    }

    /// Process one source with the current local time.
    pub fn process(&self, path: &Path, metadata: Option<&WallpaperMetadata>) -> ProcessingResult {
        self.process_at(path, metadata, Local::now())
    }

    /// Process one source as of `now`, which fixes the filename date prefix
    /// and every timestamp in the result.
    pub fn process_at(
        &self,
        path: &Path,
        metadata: Option<&WallpaperMetadata>,
        now: DateTime<Local>,
    ) -> ProcessingResult {
        info!(source = %path.display(), "processing image");

        let source = match validate(&self.backend, path) {
            Ok(source) => source,
            Err(e) => {
                warn!(source = %path.display(), reason = %e, "image rejected");
                return ManifestBuilder::rejected(path, e.to_string(), now);
            }
        };

        let hash = match hash_file(path) {
            Ok(hash) => hash,
            Err(e) => {
                warn!(source = %path.display(), error = %e, "cannot hash source");
                return ManifestBuilder::rejected(path, format!("Cannot read source: {e}"), now);
            }
        };
        let stem = base_stem(&now, &hash);
        let source_ext = source.extension();

        let expected = self.config.profiles.iter().map(|p| p.name.clone());
        let mut builder = ManifestBuilder::new(source, expected, now);

        for profile in &self.config.profiles {
            let params = plan_render(path, &source_ext, &self.config.output_dir, &stem, profile);
            debug!(profile = %profile.name, output = %params.output.display(), "rendering");

            match self.backend.render(&params) {
                Ok(mut rendered) => {
                    // Metadata only ever goes into the "original" artifact
                    let embedded = match metadata {
                        Some(meta) if profile.is_original() => {
                            let embedded =
                                metadata::inject(&self.backend, &params.output, meta, &self.config.branding);
                            // Injection rewrites the file in place
                            match std::fs::metadata(&params.output) {
                                Ok(written) => rendered.byte_size = written.len(),
                                Err(e) => {
                                    warn!(output = %params.output.display(), error = %e, "cannot stat original")
                                }
                            }
                            embedded
                        }
                        _ => false,
                    };
                    builder.record_artifact(artifact_from_render(
                        &profile.name,
                        params.output,
                        rendered,
                        profile.quality,
                        embedded,
                        now,
                    ));
                }
                Err(e) => {
                    warn!(profile = %profile.name, error = %e, "profile failed");
                    builder.record_failure(&profile.name, e.to_string());
                }
            }
        }

        let result = builder.build();
        info!(
            source = %path.display(),
            success = result.success,
            artifacts = result.artifacts.len(),
            "finished image"
        );
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ProfileFormat, ResolutionProfile};
    use crate::imaging::backend::tests::{MOCK_EXIF_BYTES, MOCK_IPTC_BYTES, MockBackend, RecordedOp};
    use crate::imaging::{BackendError, Encoding};
    use chrono::TimeZone;
    use std::path::PathBuf;
    use tempfile::TempDir;

    fn fixed_now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).single().unwrap()
    }

    fn setup(backend: MockBackend) -> (TempDir, Pipeline<MockBackend>, PathBuf) {
        let tmp = TempDir::new().unwrap();
        let config = PipelineConfig {
            output_dir: tmp.path().join("out"),
            ..PipelineConfig::default()
        };
        let source = tmp.path().join("photo.jpg");
        std::fs::write(&source, b"hello").unwrap();
        let pipeline = Pipeline::new(config, backend).unwrap();
        (tmp, pipeline, source)
    }

    fn ocean() -> WallpaperMetadata {
        WallpaperMetadata {
            title: "Ocean".into(),
            description: "Blue".into(),
            category: "nature".into(),
            tags: vec![],
        }
    }

    #[test]
    fn new_creates_output_dir() {
        let (tmp, _pipeline, _) = setup(MockBackend::new());
        assert!(tmp.path().join("out").is_dir());
    }

    #[test]
    fn new_rejects_invalid_config() {
        let tmp = TempDir::new().unwrap();
        let config = PipelineConfig {
            output_dir: tmp.path().join("out"),
            profiles: vec![],
            ..PipelineConfig::default()
        };
        assert!(matches!(
            Pipeline::new(config, MockBackend::new()),
            Err(ProcessError::Config(_))
        ));
    }

    #[test]
    fn produces_all_four_profiles() {
        let (_tmp, pipeline, source) = setup(MockBackend::with_probe(1080, 1920));
        let result = pipeline.process_at(&source, None, fixed_now());

        assert!(result.success, "{:?}", result.errors);
        let dims: Vec<(&str, u32, u32)> = ["thumbnail", "medium", "large", "original"]
            .iter()
            .map(|p| {
                let a = result.artifact(p).unwrap();
                (*p, a.width, a.height)
            })
            .collect();
        assert_eq!(
            dims,
            vec![
                ("thumbnail", 150, 200),
                ("medium", 400, 533),
                ("large", 720, 960),
                ("original", 1080, 1920),
            ]
        );
    }

    #[test]
    fn filenames_are_content_addressed() {
        let (_tmp, pipeline, source) = setup(MockBackend::new());
        let result = pipeline.process_at(&source, None, fixed_now());

        // md5("hello") = 5d41402a...
        assert_eq!(
            result.artifact("thumbnail").unwrap().filename,
            "wallpaper_20240309_5d41402a_thumbnail.webp"
        );
        assert_eq!(
            result.artifact("original").unwrap().filename,
            "wallpaper_20240309_5d41402a.jpg"
        );
    }

    #[test]
    fn same_input_same_names() {
        let (_tmp, pipeline, source) = setup(MockBackend::new());
        let a = pipeline.process_at(&source, None, fixed_now());
        let b = pipeline.process_at(&source, None, fixed_now());
        let paths = |r: &ProcessingResult| {
            r.artifacts.values().map(|a| a.path.clone()).collect::<Vec<_>>()
        };
        assert_eq!(paths(&a), paths(&b));
    }

    #[test]
    fn rejected_source_renders_nothing() {
        let (tmp, pipeline, _) = setup(MockBackend::with_probe(500, 400));
        let source = tmp.path().join("wide.jpg");
        std::fs::write(&source, b"x").unwrap();

        let result = pipeline.process_at(&source, Some(&ocean()), fixed_now());
        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().contains("portrait"));
        assert!(result.artifacts.is_empty());
        assert!(pipeline.backend().renders().is_empty());
    }

    #[test]
    fn missing_source_is_structured_failure() {
        let (tmp, pipeline, _) = setup(MockBackend::new());
        let result = pipeline.process_at(&tmp.path().join("gone.jpg"), None, fixed_now());
        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().starts_with("File does not exist"));
    }

    #[test]
    fn corrupt_source_is_structured_failure() {
        let backend = MockBackend::new().identify_fails_with(BackendError::Decode("eof".into()));
        let (_tmp, pipeline, source) = setup(backend);
        let result = pipeline.process_at(&source, None, fixed_now());
        assert!(!result.success);
        assert!(result.error.as_deref().unwrap().starts_with("Corrupt"));
    }

    #[test]
    fn one_profile_failing_keeps_the_others() {
        let (_tmp, pipeline, source) = setup(MockBackend::new().failing_on("_large"));
        let result = pipeline.process_at(&source, None, fixed_now());

        assert!(!result.success);
        assert_eq!(result.artifacts.len(), 3);
        assert!(result.artifact("large").is_none());
        assert!(result.errors["large"].contains("mock failure"));
        // Every profile was still attempted
        assert_eq!(pipeline.backend().renders().len(), 4);
    }

    #[test]
    fn metadata_only_injected_into_original() {
        let (_tmp, pipeline, source) = setup(MockBackend::new());
        let result = pipeline.process_at(&source, Some(&ocean()), fixed_now());

        let embeds = pipeline.backend().embeds();
        assert_eq!(embeds.len(), 2);
        for op in &embeds {
            let path = match op {
                RecordedOp::EmbedExif { path, .. } | RecordedOp::EmbedIptc { path, .. } => path,
                _ => unreachable!(),
            };
            assert!(path.ends_with("wallpaper_20240309_5d41402a.jpg"), "{path}");
        }
        assert!(result.artifact("original").unwrap().metadata_embedded);
        assert!(!result.artifact("thumbnail").unwrap().metadata_embedded);
    }

    #[test]
    fn no_metadata_no_injection() {
        let (_tmp, pipeline, source) = setup(MockBackend::new());
        let result = pipeline.process_at(&source, None, fixed_now());
        assert!(pipeline.backend().embeds().is_empty());
        assert!(!result.artifact("original").unwrap().metadata_embedded);
    }

    #[test]
    fn failed_original_skips_injection() {
        let (_tmp, pipeline, source) = setup(MockBackend::new().failing_on("5d41402a.jpg"));
        let result = pipeline.process_at(&source, Some(&ocean()), fixed_now());
        assert!(result.errors.contains_key("original"));
        assert!(pipeline.backend().embeds().is_empty());
    }

    #[test]
    fn exif_failure_still_publishes_original() {
        let mut backend = MockBackend::new();
        backend.fail_exif = true;
        let (_tmp, pipeline, source) = setup(backend);
        let result = pipeline.process_at(&source, Some(&ocean()), fixed_now());
        assert!(result.success);
        assert!(!result.artifact("original").unwrap().metadata_embedded);
    }

    #[test]
    fn original_size_includes_injected_metadata() {
        let (_tmp, pipeline, source) = setup(MockBackend::with_probe(300, 500).writing_files());
        let result = pipeline.process_at(&source, Some(&ocean()), fixed_now());

        let original = result.artifact("original").unwrap();
        let encoded = 300 * 500 / 10;
        assert_eq!(
            original.byte_size,
            (encoded + MOCK_EXIF_BYTES + MOCK_IPTC_BYTES) as u64
        );
        assert_eq!(original.byte_size, std::fs::metadata(&original.path).unwrap().len());

        // Tiers are never touched after encoding
        let thumb = result.artifact("thumbnail").unwrap();
        assert_eq!(thumb.byte_size, 150 * 200 / 10);
        assert_eq!(thumb.byte_size, std::fs::metadata(&thumb.path).unwrap().len());
    }

    #[test]
    fn original_size_after_iptc_failure_counts_exif_only() {
        let mut backend = MockBackend::with_probe(300, 500).writing_files();
        backend.fail_iptc = true;
        let (_tmp, pipeline, source) = setup(backend);
        let result = pipeline.process_at(&source, Some(&ocean()), fixed_now());

        let original = result.artifact("original").unwrap();
        assert!(original.metadata_embedded);
        assert_eq!(original.byte_size, (300 * 500 / 10 + MOCK_EXIF_BYTES) as u64);
        assert_eq!(original.byte_size, std::fs::metadata(&original.path).unwrap().len());
    }

    #[test]
    fn heic_original_becomes_jpeg() {
        let (tmp, pipeline, _) = setup(MockBackend::new());
        let source = tmp.path().join("IMG_0042.HEIC");
        std::fs::write(&source, b"heic bytes").unwrap();

        let result = pipeline.process_at(&source, None, fixed_now());
        let original = result.artifact("original").unwrap();
        assert!(original.filename.ends_with(".jpg"));

        let renders = pipeline.backend().renders();
        let last = renders.last().unwrap();
        assert!(matches!(
            last,
            RecordedOp::Render {
                target: None,
                encoding: Encoding::Jpeg {
                    progressive: true,
                    ..
                },
                ..
            }
        ));
    }

    #[test]
    fn enhancement_per_tier() {
        let (_tmp, pipeline, source) = setup(MockBackend::new());
        pipeline.process_at(&source, None, fixed_now());
        let factors: Vec<(f32, f32)> = pipeline
            .backend()
            .renders()
            .into_iter()
            .map(|op| match op {
                RecordedOp::Render {
                    sharpness,
                    contrast,
                    ..
                } => (sharpness, contrast),
                _ => unreachable!(),
            })
            .collect();
        assert_eq!(factors, vec![(1.2, 1.1), (1.1, 1.0), (1.1, 1.0), (1.0, 1.0)]);
    }

    #[test]
    fn custom_profiles_replace_the_standard_set() {
        let tmp = TempDir::new().unwrap();
        let config = PipelineConfig {
            output_dir: tmp.path().join("out"),
            profiles: vec![ResolutionProfile {
                name: "tiny".into(),
                width: Some(30),
                height: Some(40),
                quality: 70,
                format: ProfileFormat::WebP,
                sharpness: 1.0,
                contrast: 1.0,
            }],
            ..PipelineConfig::default()
        };
        let source = tmp.path().join("a.png");
        std::fs::write(&source, b"png").unwrap();
        let pipeline = Pipeline::new(config, MockBackend::new()).unwrap();

        let result = pipeline.process_at(&source, None, fixed_now());
        assert!(result.success);
        let tiny = result.artifact("tiny").unwrap();
        assert_eq!((tiny.width, tiny.height, tiny.quality), (30, 40, 70));
    }
}
