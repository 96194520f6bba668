//! # pdf2assets
//!
//! Extract per-product photos from PDF catalogs and reconcile them with a
//! JSON product manifest.
//!
//! ## Why this crate?
//!
//! Supplier catalogs arrive as PDFs laid out page by page: a band of product
//! photos at the top, a table of items (id, description, UPC, price)
//! underneath. Pulling the embedded images out of such a PDF is easy; knowing
//! *which product each image belongs to* is not, because the embedded objects
//! carry no association at all. This crate renders each page, finds the photo
//! band above the table, contour-detects the photo blocks, and pairs them
//! with the page's products in reading order, so every crop lands on disk
//! under a `Page{n}_{item}_{description}.png` name the manifest can track.
//! Items the detector misses are recovered by a text-anchored fallback over
//! an embedded-image pool.
//!
//! ## Pipeline Overview
//!
//! ```text
//! catalog.json + PDFs
//!  │
//!  ├─ 1. Detect   render each product page, crop the photo band above the
//!  │              table, pair blocks with products in reading order
//!  ├─ 2. Harvest  pull every embedded image into the raw pool
//!  ├─ 3. Match    anchor still-missing items by page text, copy from the pool
//!  ├─ 4. Curate   drop junk and duplicate crops, prune the manifest
//!  └─ 5. Report   write the missing-photo list
//! ```
//!
//! Each pass also runs standalone (see [`extract`]); they communicate only
//! through the manifest and the filesystem, so reruns pick up where the last
//! run left off.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdf2assets::{run_pipeline, PipelineConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = PipelineConfig::builder()
//!         .document("catalog_part1.pdf")
//!         .document("catalog_part2.pdf")
//!         .manifest_path("catalog.json")
//!         .build()?;
//!     let summary = run_pipeline(&config)?;
//!     println!(
//!         "{} assigned, {} matched by fallback, {} still missing",
//!         summary.detection.assigned,
//!         summary.fallback.matched,
//!         summary.missing_reported,
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdf2assets` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in CLI-only deps:
//! ```toml
//! pdf2assets = { version = "0.3", default-features = false }
//! ```
//!
//! ## Pdfium Setup
//!
//! All PDF access goes through pdfium, loaded at runtime rather than linked.
//! The shared library is searched in the `PDFIUM_LIB_PATH` directory, then
//! the current directory, then the system loader. When none is found the run
//! fails fast with download instructions in the error text; see
//! [`document::catalog_runtime`].

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod document;
pub mod error;
pub mod extract;
pub mod manifest;
pub mod pipeline;
pub mod progress;
pub mod report;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PipelineConfig, PipelineConfigBuilder};
pub use error::ExtractError;
pub use extract::{
    inspect_documents, run_curation, run_detection, run_fallback, run_harvest,
    run_missing_report, run_pipeline, DetectionSummary, DocumentProbe, FallbackSummary,
    PipelineSummary,
};
pub use manifest::{CatalogManifest, ProductRecord};
pub use pipeline::curate::CurationSummary;
pub use progress::{PipelineObserver, Stage};
