//! Run reports: the per-page shortfall log and the missing-photo list.
//!
//! The shortfall log is written in processing order, interleaving each
//! page's summary line with the items that page could not resolve, so a
//! human can read straight down a problem page. The missing-photo report is
//! regenerable at any time by scanning the manifest alone; it never depends
//! on state from the run that wrote it.

use crate::error::ExtractError;
use crate::manifest::CatalogManifest;
use std::fs;
use std::path::Path;

/// One detection page's outcome.
#[derive(Debug, Clone, PartialEq)]
pub struct PageOutcome {
    pub page: u32,
    /// Candidate blocks the extractor admitted.
    pub found: usize,
    /// Products the page's group asked for.
    pub wanted: usize,
    /// Table-top boundary in document points (page height when no header
    /// label was found).
    pub table_y: f32,
}

/// An item the detection pass left without a block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnresolvedItem {
    pub item: String,
    pub page: u32,
}

/// The interleaved detection report, accumulated page by page.
#[derive(Debug, Clone, Default)]
pub struct DetectionReport {
    lines: Vec<String>,
    /// Pages processed.
    pub pages: usize,
    /// Block-to-product pairs made.
    pub assigned: usize,
    /// Items handed to the fallback matcher, in processing order.
    pub unresolved: Vec<UnresolvedItem>,
}

impl DetectionReport {
    pub fn record_page(&mut self, outcome: &PageOutcome) {
        self.pages += 1;
        self.assigned += outcome.found.min(outcome.wanted);
        self.lines.push(format!(
            "Page {}: Found {}/{} images (TableY={:.1})",
            outcome.page, outcome.found, outcome.wanted, outcome.table_y
        ));
    }

    pub fn record_unresolved(&mut self, item: &str, page: u32) {
        self.lines
            .push(format!("  - Missing Item {item} on Page {page}"));
        self.unresolved.push(UnresolvedItem {
            item: item.to_string(),
            page,
        });
    }

    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Write the shortfall log, one line per entry.
    pub fn write(&self, path: &Path) -> Result<(), ExtractError> {
        fs::write(path, self.lines.join("\n")).map_err(|source| ExtractError::ReportWrite {
            path: path.to_path_buf(),
            source,
        })
    }
}

/// Render the missing-photo report: `<item> | <description>` for every item
/// with no associated image, sorted and de-duplicated.
pub fn missing_photo_lines(manifest: &CatalogManifest) -> Vec<String> {
    let mut lines: Vec<String> = manifest
        .missing_items()
        .iter()
        .map(|p| format!("{} | {}", p.item, p.description))
        .collect();
    lines.sort_unstable();
    lines.dedup();
    lines
}

/// Write the missing-photo report. Returns the number of listed items.
pub fn write_missing_report(
    manifest: &CatalogManifest,
    path: &Path,
) -> Result<usize, ExtractError> {
    let lines = missing_photo_lines(manifest);
    let mut body = lines.join("\n");
    if !body.is_empty() {
        body.push('\n');
    }
    fs::write(path, body).map_err(|source| ExtractError::ReportWrite {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(lines.len())
}
