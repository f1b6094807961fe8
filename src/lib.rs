//! # wallpress
//!
//! Turns one portrait photo into the fixed set of web-ready artifacts a
//! mobile-wallpaper site publishes: three WebP resolutions and a re-encoded
//! "original" carrying search-engine metadata.
//!
//! # Architecture: Four-Step Pipeline
//!
//! ```text
//! 1. Validate   source path   →  SourceImage | ValidationError
//! 2. Render     per profile   →  cover-crop, enhance, encode, write
//! 3. Inject     "original"    →  EXIF + IPTC, best effort
//! 4. Manifest   outcomes      →  ProcessingResult
//! ```
//!
//! Each step is small and testable in isolation: validation and planning are
//! pure apart from a backend probe, the backend sits behind a trait so the
//! pipeline runs against a recording mock in tests, and the manifest builder
//! is plain aggregation.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`validate`] | Step 1: existence, extension, decode, minimum size, portrait aspect |
//! | [`process`] | Step 2: the [`process::Pipeline`] driving every profile |
//! | [`metadata`] | Step 3: keyword derivation and EXIF/IPTC injection |
//! | [`manifest`] | Step 4: folds per-profile outcomes into a result |
//! | [`imaging`] | Backend trait, pure-Rust backend, crop math, enhancement, EXIF/IPTC codecs |
//! | [`naming`] | Content-addressed `wallpaper_{date}_{hash8}` filenames |
//! | [`config`] | `wallpress.toml` loading, stock defaults, merging, validation |
//! | [`types`] | Shared data model |
//! | [`batch`] | Folder scan, pacing, cancellation, JSON report |
//! | [`retention`] | Keep-N-newest trim of the output directory |
//! | [`preview`] | Single-page HTML preview of a result, rendered with Maud |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Results, Not Errors, at the Pipeline Boundary
//!
//! [`process::Pipeline::process`] never returns `Err`. A rejected source or a
//! failed profile is reported inside the [`types::ProcessingResult`], and the
//! remaining profiles still run. Callers get a complete diagnostic picture
//! from one call and decide themselves what to publish.
//!
//! ## Content-Addressed Names
//!
//! Output names derive from the MD5 of the source bytes plus the processing
//! date. Re-running the same file on the same day overwrites the same paths
//! instead of accumulating copies, and callers can compute public URLs from
//! the filename alone.
//!
//! ## Metadata Only on the Original
//!
//! The three WebP tiers ship without EXIF or IPTC. Injection is an explicit
//! step after encoding, keyed on the profile name, so the encoder never needs
//! to know about metadata.
//!
//! ## Configuration as a Value
//!
//! Profiles, branding and batch settings live in one immutable
//! [`config::PipelineConfig`] handed to the pipeline constructor. Tests swap
//! in tiny profiles; nothing reads global state.

pub mod batch;
pub mod config;
pub mod imaging;
pub mod manifest;
pub mod metadata;
pub mod naming;
pub mod output;
pub mod preview;
pub mod process;
pub mod retention;
pub mod types;
pub mod validate;

#[cfg(test)]
pub(crate) mod test_helpers;
