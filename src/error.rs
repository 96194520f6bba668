//! Error types for the pdf2assets library.
//!
//! The pipeline distinguishes two failure modes:
//!
//! * [`ExtractError`] — **Fatal**: the run cannot proceed at all (manifest
//!   missing or unparseable, no usable catalog document, pdfium could not be
//!   bound, a report or asset directory cannot be written). Returned as
//!   `Err(ExtractError)` from the top-level `run_*` functions.
//!
//! * **Local anomalies** — a page renders oddly, a detection pass finds fewer
//!   photo blocks than products, an item id never appears in any document, a
//!   pool image is unreadable. These are expected operating conditions of
//!   messy catalog PDFs, not errors: they are logged via `tracing`, recorded
//!   in the shortfall log or the missing-photo report, and the run continues.
//!
//! Keeping the local cases out of the error enum is deliberate. A batch run
//! over a 400-page catalog must finish and tell you what it could not match,
//! not abort on page 17.

use std::path::PathBuf;
use thiserror::Error;

/// All fatal errors returned by the pdf2assets library.
///
/// Per-page and per-item anomalies are not represented here; they surface via
/// the shortfall log and the missing-photo report instead.
#[derive(Debug, Error)]
pub enum ExtractError {
    // ── Manifest errors ───────────────────────────────────────────────────
    /// The product manifest was not found at the given path.
    #[error("Catalog manifest not found: '{path}'\nCheck the path exists and is readable.")]
    ManifestNotFound { path: PathBuf },

    /// The manifest file exists but could not be read.
    #[error("Failed to read catalog manifest '{path}': {source}")]
    ManifestRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The manifest file is not the expected `{{products, images}}` JSON document.
    #[error("Catalog manifest '{path}' is not valid JSON: {source}\nExpected an object with \"products\" and \"images\" arrays.")]
    ManifestParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// The updated manifest could not be written back.
    #[error("Failed to write catalog manifest '{path}': {source}")]
    ManifestWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Document errors ───────────────────────────────────────────────────
    /// None of the configured catalog documents could be opened.
    #[error("No usable catalog documents: all {checked} configured paths were missing or failed to open.\nCheck the document paths passed to the pipeline.")]
    NoUsableDocuments { checked: usize },

    /// pdfium failed to open a specific document.
    #[error("Failed to open catalog document '{path}': {detail}")]
    DocumentOpen { path: PathBuf, detail: String },

    /// pdfium failed to load a page that the document claims to have.
    #[error("Failed to load page {page} of '{label}': {detail}")]
    PageLoad {
        label: String,
        page: u32,
        detail: String,
    },

    /// pdfium-render returned an error while rasterising a page.
    #[error("Rasterisation failed for page {page} of '{label}': {detail}")]
    RasterisationFailed {
        label: String,
        page: u32,
        detail: String,
    },

    /// pdfium-render returned an error while reading page text.
    #[error("Text extraction failed for page {page} of '{label}': {detail}")]
    TextRead {
        label: String,
        page: u32,
        detail: String,
    },

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Could not create or write a cropped product photo.
    #[error("Failed to write product photo '{path}': {source}")]
    AssetWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not create or write a raw pool image.
    #[error("Failed to write pool image '{path}': {source}")]
    PoolWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Could not write the shortfall log or the missing-photo report.
    #[error("Failed to write report '{path}': {source}")]
    ReportWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Pdfium binding errors ─────────────────────────────────────────────
    /// Could not bind to a pdfium library.
    #[error(
        "Failed to bind to pdfium library: {0}\n\n\
You can:\n\
  • Set PDFIUM_LIB_PATH=/path/to/libpdfium to use an existing copy.\n\
  • Place libpdfium.so / libpdfium.dylib / pdfium.dll next to the binary.\n\
  • Install pdfium system-wide so the dynamic loader can find it.\n"
    )]
    PdfiumBindingFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn no_usable_documents_display() {
        let e = ExtractError::NoUsableDocuments { checked: 3 };
        let msg = e.to_string();
        assert!(msg.contains("all 3"), "got: {msg}");
    }

    #[test]
    fn rasterisation_failed_display() {
        let e = ExtractError::RasterisationFailed {
            label: "catalog".into(),
            page: 6,
            detail: "bitmap allocation failed".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("page 6"));
        assert!(msg.contains("catalog"));
    }

    #[test]
    fn manifest_parse_mentions_expected_shape() {
        let bad = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let e = ExtractError::ManifestParse {
            path: PathBuf::from("catalog.json"),
            source: bad,
        };
        assert!(e.to_string().contains("products"));
    }

    #[test]
    fn invalid_config_display() {
        let e = ExtractError::InvalidConfig("zoom must be positive".into());
        assert!(e.to_string().contains("zoom must be positive"));
    }
}
