//! Batch orchestration over a folder of sources.
//!
//! ```text
//! discover(dir)            walkdir, supported extensions, sorted, de-duplicated
//!    │
//!    ▼
//! prefilter(backend)       validator; rejects are logged and reported, never processed
//!    │
//!    ▼
//! run(pipeline, items)     delay_ms == 0 → rayon pool
//!                          delay_ms  > 0 → sequential, sleep between images
//!    │
//!    ▼
//! BatchReport              totals + per-image results + per-path errors → JSON
//! ```
//!
//! Cancellation is cooperative: the flag is checked before each image starts.
//! An image already in flight always runs to completion.
//!
//! Progress is reported through an optional [`BatchEvent`] channel so the
//! CLI can print while workers run.

use crate::imaging::ImageBackend;
use crate::process::Pipeline;
use crate::types::{ProcessingResult, WallpaperMetadata};
use crate::validate::{is_supported_extension, validate};
use chrono::{DateTime, Local};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::Sender;
use std::time::Duration;
use thiserror::Error;
use tracing::{info, warn};
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum BatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Cannot walk directory: {0}")]
    Walk(#[from] walkdir::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One unit of batch work.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchItem {
    pub path: PathBuf,
    pub metadata: WallpaperMetadata,
}

/// Sources that passed or failed the validation pre-filter.
#[derive(Debug, Default)]
pub struct Prefiltered {
    pub accepted: Vec<PathBuf>,
    pub rejected: Vec<(PathBuf, String)>,
}

/// Progress events sent while a batch runs.
#[derive(Debug, Clone)]
pub enum BatchEvent {
    Started {
        total: usize,
        parallel: bool,
    },
    ImageFinished {
        index: usize,
        total: usize,
        result: Box<ProcessingResult>,
    },
    Cancelled {
        completed: usize,
        skipped: usize,
    },
}

/// Knobs for one batch run.
#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    /// Pause between images. Non-zero forces sequential processing.
    pub delay: Duration,
    pub cancel: Option<Arc<AtomicBool>>,
    pub events: Option<Sender<BatchEvent>>,
}

impl BatchOptions {
    fn cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|flag| flag.load(Ordering::Relaxed))
    }

    fn emit(&self, event: BatchEvent) {
        if let Some(tx) = &self.events {
            // A dropped receiver only means nobody is watching
            let _ = tx.send(event);
        }
    }
}

/// Aggregate outcome of a batch, exportable as JSON.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchReport {
    pub exported_at: DateTime<Local>,
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    pub results: Vec<ProcessingResult>,
    /// Failure summary per source path.
    pub errors: BTreeMap<String, String>,
}

impl BatchReport {
    pub fn from_results(results: Vec<ProcessingResult>) -> Self {
        let successful = results.iter().filter(|r| r.success).count();
        let errors = results
            .iter()
            .filter_map(|r| {
                r.failure_summary()
                    .map(|e| (r.source_path.display().to_string(), e))
            })
            .collect();
        Self {
            exported_at: Local::now(),
            total: results.len(),
            successful,
            failed: results.len() - successful,
            results,
            errors,
        }
    }

    /// Count pre-filter rejections as failures.
    pub fn record_rejections(&mut self, rejected: &[(PathBuf, String)]) {
        for (path, reason) in rejected {
            self.errors
                .insert(path.display().to_string(), reason.clone());
        }
        self.total += rejected.len();
        self.failed += rejected.len();
    }

    pub fn to_json(&self) -> Result<String, BatchError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: &Path) -> Result<(), BatchError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_json()?)?;
        Ok(())
    }
}

/// Every file under `dir` (recursively) with a supported extension, in any
/// case. Sorted and de-duplicated.
pub fn discover(dir: &Path) -> Result<Vec<PathBuf>, BatchError> {
    let mut found = BTreeSet::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let supported = entry
            .path()
            .extension()
            .and_then(|e| e.to_str())
            .is_some_and(is_supported_extension);
        if supported {
            found.insert(entry.into_path());
        }
    }
    Ok(found.into_iter().collect())
}

/// Run the validator over discovered paths.
pub fn prefilter(backend: &impl ImageBackend, paths: Vec<PathBuf>) -> Prefiltered {
    let mut out = Prefiltered::default();
    for path in paths {
        match validate(backend, &path) {
            Ok(_) => out.accepted.push(path),
            Err(e) => {
                warn!(source = %path.display(), reason = %e, "skipping invalid image");
                out.rejected.push((path, e.to_string()));
            }
        }
    }
    out
}

/// Pair each path with metadata derived from its filename.
pub fn items_from_filenames(paths: Vec<PathBuf>, category: &str) -> Vec<BatchItem> {
    paths
        .into_iter()
        .map(|path| {
            let metadata = WallpaperMetadata::from_filename(&path, category);
            BatchItem { path, metadata }
        })
        .collect()
}

/// Process every item and build the report.
pub fn run<B: ImageBackend>(
    pipeline: &Pipeline<B>,
    items: &[BatchItem],
    options: &BatchOptions,
) -> BatchReport {
    let total = items.len();
    let parallel = options.delay.is_zero();
    info!(total, parallel, "starting batch");
    options.emit(BatchEvent::Started { total, parallel });

    let finish = |index: usize, item: &BatchItem| {
        let result = pipeline.process(&item.path, Some(&item.metadata));
        options.emit(BatchEvent::ImageFinished {
            index,
            total,
            result: Box::new(result.clone()),
        });
        result
    };

    let results: Vec<ProcessingResult> = if parallel {
        items
            .par_iter()
            .enumerate()
            .map(|(i, item)| {
                if options.cancelled() {
                    None
                } else {
                    Some(finish(i + 1, item))
                }
            })
            .collect::<Vec<_>>()
            .into_iter()
            .flatten()
            .collect()
    } else {
        let mut results = Vec::with_capacity(total);
        for (i, item) in items.iter().enumerate() {
            if options.cancelled() {
                break;
            }
            results.push(finish(i + 1, item));
            if i + 1 < total {
                std::thread::sleep(options.delay);
            }
        }
        results
    };

    if results.len() < total {
        info!(completed = results.len(), "batch cancelled");
        options.emit(BatchEvent::Cancelled {
            completed: results.len(),
            skipped: total - results.len(),
        });
    }

    let report = BatchReport::from_results(results);
    info!(
        successful = report.successful,
        failed = report.failed,
        "batch finished"
    );
    report
}
