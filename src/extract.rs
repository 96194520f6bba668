//! Stage orchestration: the full extraction run and its individual passes.
//!
//! ## Why four separate passes?
//!
//! Detection, harvest, fallback, and curation are useful on their own (the
//! CLI exposes each) and recover from each other's gaps: a page whose crops
//! failed to write simply leaves its items unassociated in the manifest, and
//! the fallback pass picks them up from there. Every pass therefore reads
//! its inputs from the manifest and the filesystem, not from the previous
//! pass's in-memory state.
//!
//! Fatal errors are confined to "cannot even start": an unopenable manifest,
//! a document list with zero usable entries, or a missing pdfium library.
//! Everything else is logged and skipped, because a batch run over a large
//! catalog must finish and report what it could not match.

use crate::config::PipelineConfig;
use crate::document::{catalog_runtime, doc_label, CatalogDocument, PageWord};
use crate::error::ExtractError;
use crate::manifest::{asset_filename, CatalogManifest, ProductRecord};
use crate::pipeline::assign::{AssignStrategy, ReadingOrderAssigner};
use crate::pipeline::contours::detect_blocks;
use crate::pipeline::curate::{curate_assets, CurationSummary};
use crate::pipeline::fallback::{match_item, MatchOutcome};
use crate::pipeline::harvest::{harvest_page, RawPool};
use crate::pipeline::region::{photo_band, table_top_boundary};
use crate::progress::Stage;
use crate::report::{self, DetectionReport, PageOutcome};
use image::DynamicImage;
use pdfium_render::prelude::Pdfium;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

// ── Summaries ────────────────────────────────────────────────────────────

/// Totals from one detection pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct DetectionSummary {
    pub pages: usize,
    pub assigned: usize,
    pub unresolved: usize,
}

/// Totals from one fallback pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackSummary {
    pub matched: usize,
    pub unresolved: usize,
}

/// Totals from one full pipeline run.
#[derive(Debug, Clone, Default)]
pub struct PipelineSummary {
    pub detection: DetectionSummary,
    pub harvested: usize,
    pub fallback: FallbackSummary,
    pub curation: CurationSummary,
    pub missing_reported: usize,
    pub total_duration_ms: u64,
}

/// One detection page's results: the log line data, the `(item, filename)`
/// pairs written, and the products left for the fallback matcher.
#[derive(Debug, Clone)]
pub struct PageAssets {
    pub outcome: PageOutcome,
    pub written: Vec<(String, String)>,
    pub unresolved: Vec<ProductRecord>,
}

// ── Document selection ───────────────────────────────────────────────────

/// Open the first configured document that works. The detection pass scans
/// only this one; by convention the full catalog is listed first.
fn first_usable<'a>(
    pdfium: &'a Pdfium,
    config: &PipelineConfig,
) -> Result<CatalogDocument<'a>, ExtractError> {
    for path in &config.documents {
        if !path.exists() {
            warn!(path = %path.display(), "Catalog document missing; skipping");
            continue;
        }
        match CatalogDocument::open(pdfium, path) {
            Ok(doc) => return Ok(doc),
            Err(e) => warn!(error = %e, "Catalog document unopenable; skipping"),
        }
    }
    Err(ExtractError::NoUsableDocuments {
        checked: config.documents.len(),
    })
}

/// Open every configured document that works, in declared order.
fn usable_documents<'a>(
    pdfium: &'a Pdfium,
    config: &PipelineConfig,
) -> Result<Vec<CatalogDocument<'a>>, ExtractError> {
    let mut docs = Vec::new();
    for path in &config.documents {
        if !path.exists() {
            warn!(path = %path.display(), "Catalog document missing; skipping");
            continue;
        }
        match CatalogDocument::open(pdfium, path) {
            Ok(doc) => docs.push(doc),
            Err(e) => warn!(error = %e, "Catalog document unopenable; skipping"),
        }
    }
    if docs.is_empty() {
        return Err(ExtractError::NoUsableDocuments {
            checked: config.documents.len(),
        });
    }
    Ok(docs)
}

// ── Detection ────────────────────────────────────────────────────────────

/// Detect, pair, crop, and write one page's product photos.
///
/// Split out from the document walk so the whole detection path can be
/// driven with synthetic rasters and word lists in tests; nothing here
/// touches pdfium.
pub fn detect_page_assets(
    raster: &DynamicImage,
    words: &[PageWord],
    page_height_pts: f32,
    page: u32,
    group: &[ProductRecord],
    output_dir: &Path,
    config: &PipelineConfig,
) -> Result<PageAssets, ExtractError> {
    let boundary = table_top_boundary(words, &config.header_labels);
    let table_y = boundary.unwrap_or(page_height_pts);

    let boxes = match photo_band(boundary, page_height_pts, raster.height(), config) {
        Some(band) => {
            let gray = band.crop(raster);
            detect_blocks(&gray, band.top, group.len(), config)
        }
        None => Vec::new(),
    };

    let pairing = ReadingOrderAssigner.pair(&boxes, group);

    let mut written = Vec::with_capacity(pairing.assigned.len());
    for (block, product) in &pairing.assigned {
        let filename = asset_filename(
            page,
            &product.item,
            &product.description,
            "png",
            config.slug_max_len,
        );
        let dest = output_dir.join(&filename);
        block.crop(raster).save(&dest).map_err(|e| ExtractError::AssetWrite {
            path: dest.clone(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })?;
        written.push((product.item.clone(), filename));
    }

    Ok(PageAssets {
        outcome: PageOutcome {
            page,
            found: boxes.len(),
            wanted: group.len(),
            table_y,
        },
        written,
        unresolved: pairing.unresolved,
    })
}

/// Contour-detection pass over the detection catalog.
///
/// Walks the manifest's page groups in ascending page order, crops and
/// writes one photo per paired product, records the new names in the
/// manifest, and writes the shortfall log.
pub fn run_detection(config: &PipelineConfig) -> Result<DetectionSummary, ExtractError> {
    let pdfium = catalog_runtime()?;
    run_detection_with(&pdfium, config)
}

fn run_detection_with(
    pdfium: &Pdfium,
    config: &PipelineConfig,
) -> Result<DetectionSummary, ExtractError> {
    let mut manifest = CatalogManifest::load(&config.manifest_path)?;
    let groups = manifest.page_groups();
    let unpaged = manifest.unpaged_count();
    if unpaged > 0 {
        info!(
            records = unpaged,
            "Products without a usable page value; excluded from detection"
        );
    }

    fs::create_dir_all(&config.output_dir).map_err(|source| ExtractError::AssetWrite {
        path: config.output_dir.clone(),
        source,
    })?;

    let doc = first_usable(pdfium, config)?;
    info!(
        label = doc.label(),
        pages = doc.page_count(),
        product_pages = groups.len(),
        "Starting detection"
    );
    if let Some(ref obs) = config.observer {
        obs.on_stage_start(Stage::Detection, groups.len());
    }

    let mut report = DetectionReport::default();
    for (page, group) in &groups {
        let page = *page;
        let page_index = match page.checked_sub(1) {
            Some(idx) if idx < doc.page_count() => idx,
            _ => {
                debug!(page, "Catalog page outside the document; skipping group");
                continue;
            }
        };

        let scan = match doc.scan_page(page_index, config.zoom) {
            Ok(scan) => scan,
            Err(e) => {
                warn!(page, error = %e, "Page scan failed; skipping");
                continue;
            }
        };
        let assets = match detect_page_assets(
            &scan.raster,
            &scan.words,
            scan.height_pts,
            page,
            group,
            &config.output_dir,
            config,
        ) {
            Ok(assets) => assets,
            Err(e) => {
                warn!(page, error = %e, "Detection failed on page; skipping");
                continue;
            }
        };

        info!(
            page,
            found = assets.outcome.found,
            wanted = assets.outcome.wanted,
            table_y = assets.outcome.table_y,
            "Page processed"
        );
        report.record_page(&assets.outcome);
        for (item, filename) in &assets.written {
            manifest.insert_image(filename);
            if let Some(ref obs) = config.observer {
                obs.on_item_matched(item, filename);
            }
        }
        for product in &assets.unresolved {
            report.record_unresolved(&product.item, page);
            if let Some(ref obs) = config.observer {
                obs.on_item_unresolved(&product.item, page);
            }
        }
        if let Some(ref obs) = config.observer {
            obs.on_page_processed(Stage::Detection, page, assets.written.len(), group.len());
        }
    }

    report.write(&config.shortfall_log)?;
    manifest.save(&config.manifest_path)?;

    let summary = DetectionSummary {
        pages: report.pages,
        assigned: report.assigned,
        unresolved: report.unresolved.len(),
    };
    if let Some(ref obs) = config.observer {
        obs.on_stage_complete(Stage::Detection, summary.assigned);
    }
    info!(
        pages = summary.pages,
        assigned = summary.assigned,
        unresolved = summary.unresolved,
        "Detection complete"
    );
    Ok(summary)
}

// ── Harvest ──────────────────────────────────────────────────────────────

/// Harvest every usable document's embedded images into the raw pool.
pub fn run_harvest(config: &PipelineConfig) -> Result<usize, ExtractError> {
    let pdfium = catalog_runtime()?;
    run_harvest_with(&pdfium, config)
}

fn run_harvest_with(pdfium: &Pdfium, config: &PipelineConfig) -> Result<usize, ExtractError> {
    let docs = usable_documents(pdfium, config)?;
    let pool = RawPool::at(&config.pool_dir)?;

    if let Some(ref obs) = config.observer {
        let total_pages: usize = docs.iter().map(|d| d.page_count() as usize).sum();
        obs.on_stage_start(Stage::Harvest, total_pages);
    }

    let mut total = 0usize;
    for doc in &docs {
        let mut stored = 0usize;
        for page_index in 0..doc.page_count() {
            let count = harvest_page(doc, &pool, page_index);
            stored += count;
            if let Some(ref obs) = config.observer {
                obs.on_page_processed(Stage::Harvest, page_index + 1, count, 0);
            }
        }
        info!(label = doc.label(), stored, "Harvested document");
        total += stored;
    }

    if let Some(ref obs) = config.observer {
        obs.on_stage_complete(Stage::Harvest, total);
    }
    Ok(total)
}

// ── Fallback ─────────────────────────────────────────────────────────────

/// Text-anchored matching for every manifest item still without an image.
pub fn run_fallback(config: &PipelineConfig) -> Result<FallbackSummary, ExtractError> {
    let pdfium = catalog_runtime()?;
    run_fallback_with(&pdfium, config)
}

fn run_fallback_with(
    pdfium: &Pdfium,
    config: &PipelineConfig,
) -> Result<FallbackSummary, ExtractError> {
    let mut manifest = CatalogManifest::load(&config.manifest_path)?;
    let docs = usable_documents(pdfium, config)?;
    let pool = RawPool::at(&config.pool_dir)?;
    fs::create_dir_all(&config.output_dir).map_err(|source| ExtractError::AssetWrite {
        path: config.output_dir.clone(),
        source,
    })?;

    let candidates: Vec<ProductRecord> =
        manifest.missing_items().into_iter().cloned().collect();
    let (paged, unpaged): (Vec<_>, Vec<_>) = candidates
        .into_iter()
        .partition(|p| p.catalog_page().is_some());
    if !unpaged.is_empty() {
        info!(
            count = unpaged.len(),
            "Items without a usable page value; excluded from fallback matching"
        );
    }

    info!(candidates = paged.len(), "Starting fallback matching");
    if let Some(ref obs) = config.observer {
        obs.on_stage_start(Stage::Fallback, paged.len());
    }

    let mut summary = FallbackSummary {
        matched: 0,
        unresolved: unpaged.len(),
    };
    for product in &paged {
        let page = product.catalog_page().unwrap_or(0);
        match match_item(product, &docs, &pool, &config.output_dir, config) {
            Ok(MatchOutcome::Matched(filename)) => {
                manifest.insert_image(&filename);
                if let Some(ref obs) = config.observer {
                    obs.on_item_matched(&product.item, &filename);
                }
                summary.matched += 1;
            }
            Ok(MatchOutcome::NoPoolImages { label, page: doc_page }) => {
                debug!(
                    item = %product.item,
                    label = %label,
                    page = doc_page,
                    "Matching page has no pool images; item unresolved"
                );
                if let Some(ref obs) = config.observer {
                    obs.on_item_unresolved(&product.item, page);
                }
                summary.unresolved += 1;
            }
            Ok(MatchOutcome::NotFound) => {
                debug!(item = %product.item, "Item id absent from all documents");
                if let Some(ref obs) = config.observer {
                    obs.on_item_unresolved(&product.item, page);
                }
                summary.unresolved += 1;
            }
            Err(e) => {
                warn!(item = %product.item, error = %e, "Fallback copy failed; item unresolved");
                if let Some(ref obs) = config.observer {
                    obs.on_item_unresolved(&product.item, page);
                }
                summary.unresolved += 1;
            }
        }
    }

    manifest.save(&config.manifest_path)?;
    if let Some(ref obs) = config.observer {
        obs.on_stage_complete(Stage::Fallback, summary.matched);
    }
    info!(
        matched = summary.matched,
        unresolved = summary.unresolved,
        "Fallback matching complete"
    );
    Ok(summary)
}

// ── Curation & report ────────────────────────────────────────────────────

/// Junk/duplicate curation over the asset directory, manifest rewritten.
/// Needs no pdfium.
pub fn run_curation(config: &PipelineConfig) -> Result<CurationSummary, ExtractError> {
    let mut manifest = CatalogManifest::load(&config.manifest_path)?;
    if let Some(ref obs) = config.observer {
        obs.on_stage_start(Stage::Curation, 0);
    }
    let summary = curate_assets(&config.output_dir, &mut manifest, config);
    manifest.save(&config.manifest_path)?;
    if let Some(ref obs) = config.observer {
        obs.on_stage_complete(Stage::Curation, summary.removed_from_manifest);
    }
    Ok(summary)
}

/// Regenerate the missing-photo report from the manifest alone.
pub fn run_missing_report(config: &PipelineConfig) -> Result<usize, ExtractError> {
    let manifest = CatalogManifest::load(&config.manifest_path)?;
    let count = report::write_missing_report(&manifest, &config.missing_report)?;
    info!(
        count,
        path = %config.missing_report.display(),
        "Missing-photo report written"
    );
    Ok(count)
}

// ── Full pipeline ────────────────────────────────────────────────────────

/// Run every pass in order: detection, harvest, fallback, curation, report.
///
/// This is the primary entry point for the library.
pub fn run_pipeline(config: &PipelineConfig) -> Result<PipelineSummary, ExtractError> {
    let start = Instant::now();
    let pdfium = catalog_runtime()?;

    let detection = run_detection_with(&pdfium, config)?;
    let harvested = run_harvest_with(&pdfium, config)?;
    let fallback = run_fallback_with(&pdfium, config)?;
    let curation = run_curation(config)?;
    let missing_reported = run_missing_report(config)?;

    let summary = PipelineSummary {
        detection,
        harvested,
        fallback,
        curation,
        missing_reported,
        total_duration_ms: start.elapsed().as_millis() as u64,
    };
    info!(
        assigned = summary.detection.assigned,
        harvested = summary.harvested,
        fallback_matched = summary.fallback.matched,
        missing = summary.missing_reported,
        duration_ms = summary.total_duration_ms,
        "Pipeline complete"
    );
    Ok(summary)
}

// ── Inspection ───────────────────────────────────────────────────────────

/// What a quick probe of one document found.
#[derive(Debug, Clone)]
pub struct DocumentProbe {
    pub path: PathBuf,
    pub label: String,
    /// `None` when the file was missing or unopenable.
    pub pages: Option<u32>,
    /// `(page, embedded image count)` for the first pages probed.
    pub image_counts: Vec<(u32, usize)>,
}

/// Number of leading pages probed by [`inspect_documents`].
pub const INSPECT_PAGE_LIMIT: u32 = 15;

/// Probe each configured document: page count and embedded-image counts for
/// its leading pages. Missing documents come back with `pages: None` so the
/// caller can show what was skipped.
pub fn inspect_documents(config: &PipelineConfig) -> Result<Vec<DocumentProbe>, ExtractError> {
    let pdfium = catalog_runtime()?;
    let mut probes = Vec::new();

    for path in &config.documents {
        let label = doc_label(path);
        if !path.exists() {
            warn!(path = %path.display(), "Document missing");
            probes.push(DocumentProbe {
                path: path.clone(),
                label,
                pages: None,
                image_counts: Vec::new(),
            });
            continue;
        }
        let doc = match CatalogDocument::open(&pdfium, path) {
            Ok(doc) => doc,
            Err(e) => {
                warn!(error = %e, "Document unopenable");
                probes.push(DocumentProbe {
                    path: path.clone(),
                    label,
                    pages: None,
                    image_counts: Vec::new(),
                });
                continue;
            }
        };

        let pages = doc.page_count();
        let mut image_counts = Vec::new();
        for index in 0..pages.min(INSPECT_PAGE_LIMIT) {
            match doc.embedded_image_count(index) {
                Ok(count) => image_counts.push((index + 1, count)),
                Err(e) => {
                    warn!(page = index + 1, error = %e, "Page probe failed");
                }
            }
        }
        probes.push(DocumentProbe {
            path: path.clone(),
            label,
            pages: Some(pages),
            image_counts,
        });
    }
    Ok(probes)
}
