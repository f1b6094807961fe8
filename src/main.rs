use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use wallpress::batch::{self, BatchOptions};
use wallpress::config::{self, PipelineConfig};
use wallpress::imaging::{ImageBackend, RustBackend};
use wallpress::process::Pipeline;
use wallpress::types::WallpaperMetadata;
use wallpress::{output, preview, retention, validate};

fn version_string() -> &'static str {
    let on_tag = env!("WALLPRESS_ON_TAG");
    if on_tag == "true" {
        env!("CARGO_PKG_VERSION")
    } else {
        let hash = env!("WALLPRESS_GIT_HASH");
        if hash.is_empty() {
            "dev@unknown"
        } else {
            // Leaked once at startup
            Box::leak(format!("dev@{hash}").into_boxed_str())
        }
    }
}

#[derive(Parser)]
#[command(name = "wallpress")]
#[command(about = "Turn portrait photos into web-ready mobile wallpaper artifacts")]
#[command(long_about = "\
Turn portrait photos into web-ready mobile wallpaper artifacts

Every accepted source produces four files in the output directory:

  wallpaper_20240309_5d41402a_thumbnail.webp   150x200
  wallpaper_20240309_5d41402a_medium.webp      400x533
  wallpaper_20240309_5d41402a_large.webp       720x960
  wallpaper_20240309_5d41402a.jpg              source size, EXIF + IPTC

PNG sources keep a PNG original. It carries EXIF only: IPTC is written to
JPEG originals alone.

Sources must be JPEG, PNG, BMP, TIFF, WebP or HEIC/HEIF, at least 100x100,
and portrait (height >= 1.2 x width).

Logging goes to stderr and honours RUST_LOG (default: wallpress=info).
Run 'wallpress gen-config' to generate a documented wallpress.toml.")]
#[command(version = version_string())]
struct Cli {
    /// Config file (missing file = stock defaults)
    #[arg(long, default_value = "wallpress.toml", global = true)]
    config: PathBuf,

    /// Output directory (overrides output_dir from the config)
    #[arg(long, global = true)]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Descriptive metadata for the "original" artifact.
#[derive(clap::Args, Clone)]
struct MetadataArgs {
    /// Title (default: derived from the filename)
    #[arg(long)]
    title: Option<String>,
    /// Description
    #[arg(long)]
    description: Option<String>,
    /// Category (default: batch.default_category)
    #[arg(long)]
    category: Option<String>,
    /// Tag, repeatable; only the first five are used as keywords
    #[arg(long = "tag")]
    tags: Vec<String>,
    /// Do not embed any metadata
    #[arg(long, conflicts_with_all = ["title", "description", "category", "tags"])]
    no_metadata: bool,
}

impl MetadataArgs {
    fn resolve(self, path: &Path, default_category: &str) -> Option<WallpaperMetadata> {
        if self.no_metadata {
            return None;
        }
        let mut meta = WallpaperMetadata::from_filename(path, default_category);
        if let Some(title) = self.title {
            meta.title = title;
        }
        if let Some(description) = self.description {
            meta.description = description;
        }
        if let Some(category) = self.category {
            meta.category = category;
        }
        if !self.tags.is_empty() {
            meta.tags = self.tags;
        }
        Some(meta)
    }
}

#[derive(Subcommand)]
enum Command {
    /// Check sources without producing anything
    Validate {
        #[arg(required = true)]
        paths: Vec<PathBuf>,
    },
    /// Produce every profile for one source
    Process {
        path: PathBuf,
        #[command(flatten)]
        metadata: MetadataArgs,
        /// Also write preview.html into the output directory
        #[arg(long)]
        preview: bool,
    },
    /// Process every supported image under a directory
    ///
    /// Images run in parallel unless a delay is set. Ctrl-C is not trapped:
    /// it ends the process at once, so the image in flight may leave a partial
    /// artifact set and no report is written.
    Batch {
        dir: PathBuf,
        /// Pause between images in milliseconds (overrides batch.delay_ms)
        #[arg(long)]
        delay_ms: Option<u64>,
        /// Write the batch report as JSON
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Keep only the N most recent artifacts in the output directory
    Trim {
        #[arg(long, default_value_t = 50)]
        keep: usize,
    },
    /// Print the EXIF and IPTC metadata embedded in a file
    Inspect { path: PathBuf },
    /// Print a stock wallpress.toml with all options documented
    GenConfig,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_logging();

    let mut config = config::load_config(&cli.config)?;
    if let Some(output) = cli.output {
        config.output_dir = output;
    }

    match cli.command {
        Command::Validate { paths } => {
            let backend = RustBackend::new();
            let mut invalid = 0;
            for path in &paths {
                let outcome = validate::check(&backend, path);
                invalid += usize::from(!outcome.is_valid);
                output::print_validation(path, &outcome);
            }
            if invalid > 0 {
                return Err(format!("{invalid} of {} images are invalid", paths.len()).into());
            }
        }
        Command::Process {
            path,
            metadata,
            preview: write_preview,
        } => {
            let meta = metadata.resolve(&path, &config.batch.default_category);
            let pipeline = Pipeline::new(config, RustBackend::new())?;
            let result = pipeline.process(&path, meta.as_ref());
            output::print_process_result(&result);
            if write_preview {
                let page = preview::write_preview(&result, pipeline.config())?;
                println!("Preview: {}", page.display());
            }
            if let Some(summary) = result.failure_summary() {
                return Err(summary.into());
            }
        }
        Command::Batch {
            dir,
            delay_ms,
            report,
        } => {
            if let Some(ms) = delay_ms {
                config.batch.delay_ms = ms;
            }
            run_batch(config, &dir, report.as_deref())?;
        }
        Command::Trim { keep } => {
            let deleted = retention::trim_output(&config.output_dir, keep)?;
            output::print_trim(&deleted, keep);
        }
        Command::Inspect { path } => {
            let metadata = RustBackend::new().read_metadata(&path)?;
            output::print_inspect(&path, &metadata);
        }
        Command::GenConfig => {
            print!("{}", config::stock_config_toml());
        }
    }

    Ok(())
}

fn run_batch(
    config: PipelineConfig,
    dir: &Path,
    report_path: Option<&Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    init_thread_pool(&config.batch);
    let delay = Duration::from_millis(config.batch.delay_ms);
    let category = config.batch.default_category.clone();
    let pipeline = Pipeline::new(config, RustBackend::new())?;

    let found = batch::discover(dir)?;
    let filtered = batch::prefilter(pipeline.backend(), found);
    let items = batch::items_from_filenames(filtered.accepted, &category);

    let (tx, rx) = std::sync::mpsc::channel();
    let printer = std::thread::spawn(move || {
        for event in rx {
            for line in output::format_batch_event(&event) {
                println!("{}", line);
            }
        }
    });
    let options = BatchOptions {
        delay,
        cancel: None,
        events: Some(tx),
    };
    let mut report = batch::run(&pipeline, &items, &options);
    drop(options);
    printer
        .join()
        .map_err(|_| "progress printer thread panicked")?;

    report.record_rejections(&filtered.rejected);
    output::print_batch_report(&report);
    if let Some(path) = report_path {
        report.write_json(path)?;
        println!("Report: {}", path.display());
    }
    Ok(())
}

/// Log to stderr; `RUST_LOG` wins over the default `wallpress=info`.
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("wallpress=info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Initialize the rayon thread pool based on batch config.
///
/// Caps at the number of available CPU cores: user can constrain down, not up.
fn init_thread_pool(batch: &config::BatchConfig) {
    let threads = config::effective_threads(batch);
    rayon::ThreadPoolBuilder::new()
        .num_threads(threads)
        .build_global()
        .ok();
}
