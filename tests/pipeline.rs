//! End-to-end runs of the real backend against temp directories.
//!
//! Fixtures are generated with the `image` crate on the fly; nothing binary
//! is checked in.

use image::{ImageEncoder, RgbImage, RgbaImage};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use wallpress::batch::{self, BatchOptions};
use wallpress::config::PipelineConfig;
use wallpress::imaging::{ImageBackend, RustBackend};
use wallpress::process::Pipeline;
use wallpress::types::WallpaperMetadata;

fn pattern(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
        image::Rgb([(x % 256) as u8, (y % 256) as u8, ((x * 3 + y) % 256) as u8])
    })
}

fn write_jpeg(path: &Path, width: u32, height: u32) {
    let img = pattern(width, height);
    let file = fs::File::create(path).unwrap();
    image::codecs::jpeg::JpegEncoder::new_with_quality(std::io::BufWriter::new(file), 90)
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgb8)
        .unwrap();
}

fn write_png_rgba(path: &Path, width: u32, height: u32) {
    let rgb = pattern(width, height);
    let img = RgbaImage::from_fn(width, height, |x, y| {
        let p = rgb.get_pixel(x, y);
        image::Rgba([p[0], p[1], p[2], if x < width / 2 { 0 } else { 255 }])
    });
    let file = fs::File::create(path).unwrap();
    image::codecs::png::PngEncoder::new(std::io::BufWriter::new(file))
        .write_image(img.as_raw(), width, height, image::ExtendedColorType::Rgba8)
        .unwrap();
}

fn pipeline(tmp: &TempDir) -> Pipeline<RustBackend> {
    let config = PipelineConfig {
        output_dir: tmp.path().join("out"),
        ..PipelineConfig::default()
    };
    Pipeline::new(config, RustBackend::new()).unwrap()
}

fn ocean() -> WallpaperMetadata {
    WallpaperMetadata {
        title: "Ocean Sunset".into(),
        description: "Calm ocean at dusk".into(),
        category: "nature".into(),
        tags: vec!["ocean".into(), "sunset".into()],
    }
}

fn listing(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

fn is_webp(path: &Path) -> bool {
    let bytes = fs::read(path).unwrap();
    bytes.len() > 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WEBP"
}

#[test]
fn jpeg_source_produces_every_profile_with_exact_dimensions() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("sunset.jpg");
    write_jpeg(&source, 540, 960);
    let pipeline = pipeline(&tmp);

    let result = pipeline.process(&source, Some(&ocean()));
    assert!(result.success, "{:?}", result.failure_summary());
    assert_eq!(result.artifacts.len(), 4);

    for (profile, w, h) in [
        ("thumbnail", 150, 200),
        ("medium", 400, 533),
        ("large", 720, 960),
        ("original", 540, 960),
    ] {
        let artifact = result.artifact(profile).unwrap();
        assert_eq!((artifact.width, artifact.height), (w, h), "{profile}");
        assert_eq!(image::image_dimensions(&artifact.path).unwrap(), (w, h), "{profile}");
        assert_eq!(artifact.byte_size, fs::metadata(&artifact.path).unwrap().len());
        assert_eq!(is_webp(&artifact.path), profile != "original", "{profile}");
    }

    let original = result.artifact("original").unwrap();
    assert!(original.filename.starts_with("wallpaper_"));
    assert!(original.filename.ends_with(".jpg"));
    assert!(original.metadata_embedded);
    assert_eq!(&fs::read(&original.path).unwrap()[..2], &[0xFF, 0xD8]);
}

#[test]
fn embedded_metadata_reads_back() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("sunset.jpg");
    write_jpeg(&source, 300, 500);
    let pipeline = pipeline(&tmp);

    let result = pipeline.process(&source, Some(&ocean()));
    let backend = RustBackend::new();

    let original = backend
        .read_metadata(&result.artifact("original").unwrap().path)
        .unwrap();
    let exif = original.exif.unwrap();
    assert_eq!(exif.xp_title, "Ocean Sunset");
    assert_eq!(exif.description, "Calm ocean at dusk");
    assert_eq!(exif.xp_subject, "nature mobile wallpaper");
    assert_eq!(exif.user_comment, "Ocean Sunset - Calm ocean at dusk");
    let iptc = original.iptc.unwrap();
    assert_eq!(iptc.category, "NAT");
    assert_eq!(iptc.keywords[0], "nature wallpaper");
    assert!(iptc.keywords.contains(&"sunset".to_string()));

    let thumb = backend
        .read_metadata(&result.artifact("thumbnail").unwrap().path)
        .unwrap();
    assert!(thumb.is_empty());
}

#[test]
fn transparent_png_keeps_png_original() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("glass.png");
    write_png_rgba(&source, 200, 400);
    let pipeline = pipeline(&tmp);

    let result = pipeline.process(&source, Some(&ocean()));
    assert!(result.success, "{:?}", result.failure_summary());
    assert!(result.source.as_ref().unwrap().has_transparency);

    let original = result.artifact("original").unwrap();
    assert!(original.filename.ends_with(".png"));
    assert_eq!(
        image::ImageFormat::from_path(&original.path).unwrap(),
        image::ImageFormat::Png
    );
    // EXIF lands in PNG; IPTC has no PNG home
    let metadata = RustBackend::new().read_metadata(&original.path).unwrap();
    assert_eq!(metadata.exif.unwrap().xp_title, "Ocean Sunset");
    assert!(metadata.iptc.is_none());

    // Transparent half is flattened onto white
    let thumb = image::open(&result.artifact("thumbnail").unwrap().path)
        .unwrap()
        .to_rgb8();
    let p = thumb.get_pixel(5, 100);
    assert!(p.0.iter().all(|&c| c > 230), "{:?}", p);
}

#[test]
fn iptc_failure_keeps_exif_on_disk() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("clear.png");
    write_png_rgba(&source, 240, 400);
    let pipeline = pipeline(&tmp);

    // PNG originals refuse IPTC, so only the EXIF half of injection lands
    let result = pipeline.process(&source, Some(&ocean()));
    assert!(result.success, "{:?}", result.failure_summary());
    let original = result.artifact("original").unwrap();
    assert!(original.metadata_embedded);
    assert_eq!(original.byte_size, fs::metadata(&original.path).unwrap().len());

    let metadata = RustBackend::new().read_metadata(&original.path).unwrap();
    let exif = metadata.exif.unwrap();
    assert_eq!(exif.xp_title, "Ocean Sunset");
    assert_eq!(exif.user_comment, "Ocean Sunset - Calm ocean at dusk");
    assert!(metadata.iptc.is_none());
    assert!(image::open(&original.path).is_ok());
}

#[test]
fn landscape_source_is_rejected_without_output() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("wide.jpg");
    write_jpeg(&source, 500, 400);
    let pipeline = pipeline(&tmp);

    let result = pipeline.process(&source, Some(&ocean()));
    assert!(!result.success);
    assert!(result.error.unwrap().contains("portrait"));
    assert!(listing(&tmp.path().join("out")).is_empty());
}

#[test]
fn rerun_overwrites_the_same_files() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("a.jpg");
    write_jpeg(&source, 240, 400);
    let pipeline = pipeline(&tmp);

    let first = pipeline.process(&source, None);
    let second = pipeline.process(&source, None);
    let names = |r: &wallpress::types::ProcessingResult| -> Vec<PathBuf> {
        r.artifacts.values().map(|a| a.path.clone()).collect()
    };
    // Same calendar day unless the run straddles midnight
    if first.processed_at.date_naive() == second.processed_at.date_naive() {
        assert_eq!(names(&first), names(&second));
        assert_eq!(listing(&tmp.path().join("out")).len(), 4);
    }
    assert!(!first.artifact("original").unwrap().metadata_embedded);
}

#[test]
fn batch_over_a_folder() {
    let tmp = TempDir::new().unwrap();
    let input = tmp.path().join("incoming");
    fs::create_dir_all(input.join("nested")).unwrap();
    write_jpeg(&input.join("first_pick.jpg"), 200, 300);
    write_jpeg(&input.join("nested/Second.JPG"), 210, 300);
    write_jpeg(&input.join("wide.jpg"), 400, 300);
    fs::write(input.join("notes.txt"), "skip me").unwrap();

    let pipeline = pipeline(&tmp);
    let found = batch::discover(&input).unwrap();
    assert_eq!(found.len(), 3);

    let filtered = batch::prefilter(pipeline.backend(), found);
    assert_eq!(filtered.accepted.len(), 2);
    assert_eq!(filtered.rejected.len(), 1);

    let items = batch::items_from_filenames(filtered.accepted, "abstract");
    assert_eq!(items[0].metadata.title, "First Pick");

    let mut report = batch::run(&pipeline, &items, &BatchOptions::default());
    report.record_rejections(&filtered.rejected);
    assert_eq!((report.total, report.successful, report.failed), (3, 2, 1));
    assert_eq!(listing(&tmp.path().join("out")).len(), 8);

    let json = tmp.path().join("report.json");
    report.write_json(&json).unwrap();
    let value: serde_json::Value = serde_json::from_str(&fs::read_to_string(&json).unwrap()).unwrap();
    assert_eq!(value["results"].as_array().unwrap().len(), 2);
}
