//! Integration tests for the pdfium-free pipeline surface.
//!
//! Everything here drives the stages with synthetic rasters, stub text
//! indexes, and temp directories, so no pdfium library and no real catalog
//! PDFs are needed. The pdfium-backed paths (page rendering, embedded-image
//! decoding) are exercised manually against real catalogs.
//!
//! Run with:
//!   cargo test --test pipeline -- --nocapture

use image::{Rgba, RgbaImage};
use pdf2assets::document::{PageWord, TextIndex};
use pdf2assets::extract::detect_page_assets;
use pdf2assets::manifest::CatalogManifest;
use pdf2assets::pipeline::fallback::{match_item, MatchOutcome};
use pdf2assets::pipeline::harvest::RawPool;
use pdf2assets::report::{missing_photo_lines, DetectionReport};
use pdf2assets::{run_curation, run_missing_report, PipelineConfig, ProductRecord};
use std::fs;
use std::path::Path;
use tempfile::tempdir;

// ── Test helpers ─────────────────────────────────────────────────────────────

/// Config with every output path rooted in `root`.
fn pipeline_config(root: &Path) -> PipelineConfig {
    PipelineConfig::builder()
        .manifest_path(root.join("catalog.json"))
        .output_dir(root.join("product_images"))
        .pool_dir(root.join("raw_images"))
        .shortfall_log(root.join("extraction_log.txt"))
        .missing_report(root.join("missing_photos.txt"))
        .build()
        .expect("valid config")
}

/// White page raster with solid dark blocks at the given `(x, y, w, h)` spots.
fn page_raster(width: u32, height: u32, blocks: &[(u32, u32, u32, u32)]) -> image::DynamicImage {
    let mut img = RgbaImage::from_pixel(width, height, Rgba([255, 255, 255, 255]));
    for &(bx, by, bw, bh) in blocks {
        for y in by..by + bh {
            for x in bx..bx + bw {
                img.put_pixel(x, y, Rgba([20, 20, 20, 255]));
            }
        }
    }
    image::DynamicImage::ImageRgba8(img)
}

fn solid_png(path: &Path, side: u32, shade: u8) {
    let img = RgbaImage::from_pixel(side, side, Rgba([shade, shade, shade, 255]));
    img.save(path).expect("write png");
}

fn seed_manifest(path: &Path, json: &str) {
    fs::write(path, json).expect("seed manifest");
}

/// In-memory document for the fallback matcher: one string per page.
struct StubDoc {
    label: String,
    pages: Vec<String>,
}

impl TextIndex for StubDoc {
    fn label(&self) -> &str {
        &self.label
    }

    fn page_count(&self) -> u32 {
        self.pages.len() as u32
    }

    fn page_contains(&self, index: u32, needle: &str) -> bool {
        self.pages[index as usize].contains(needle)
    }
}

// ── Detection flow ───────────────────────────────────────────────────────────

/// A three-product page with only two photo blocks: the two crops land under
/// canonical names, the manifest tracks them, and the shortfall log carries
/// the exact page line plus the missing-item line.
#[test]
fn test_detection_page_flow_writes_crops_log_and_manifest() {
    let root = tempdir().expect("tempdir");
    let config = pipeline_config(root.path());
    fs::create_dir_all(&config.output_dir).expect("output dir");
    seed_manifest(
        &config.manifest_path,
        r#"{
            "products": [
                {"Item": "11111", "Description": "Steel Mug", "Page": "6"},
                {"Item": "22222", "Description": "Oak Chair", "Page": 6},
                {"Item": "33333", "Description": "Pine Table", "Page": "6"}
            ]
        }"#,
    );

    let mut manifest = CatalogManifest::load(&config.manifest_path).expect("load manifest");
    let groups = manifest.page_groups();
    let group = groups.get(&6).expect("page 6 group");
    assert_eq!(group.len(), 3, "numeric and string Page values both group");

    // Column header at 400 pt; at zoom 2 the photo band is rows [200, 800).
    let raster = page_raster(1224, 1584, &[(100, 250, 150, 150), (500, 250, 150, 150)]);
    let words = vec![PageWord {
        text: "Item".into(),
        y_top: 400.0,
    }];

    let assets = detect_page_assets(
        &raster,
        &words,
        792.0,
        6,
        group,
        &config.output_dir,
        &config,
    )
    .expect("detection");

    let mut report = DetectionReport::default();
    report.record_page(&assets.outcome);
    for (_, filename) in &assets.written {
        manifest.insert_image(filename);
    }
    for product in &assets.unresolved {
        report.record_unresolved(&product.item, 6);
    }
    report.write(&config.shortfall_log).expect("write log");
    manifest.save(&config.manifest_path).expect("save manifest");

    assert!(config.output_dir.join("Page6_11111_Steel_Mug.png").exists());
    assert!(config.output_dir.join("Page6_22222_Oak_Chair.png").exists());

    let log = fs::read_to_string(&config.shortfall_log).expect("read log");
    assert_eq!(
        log,
        "Page 6: Found 2/3 images (TableY=400.0)\n  - Missing Item 33333 on Page 6"
    );

    let reloaded = CatalogManifest::load(&config.manifest_path).expect("reload");
    assert!(reloaded.has_image_for("11111"));
    assert!(reloaded.has_image_for("22222"));
    assert!(!reloaded.has_image_for("33333"));
    let missing: Vec<&str> = reloaded
        .missing_items()
        .into_iter()
        .map(|p| p.item.as_str())
        .collect();
    assert_eq!(missing, vec!["33333"]);
}

// ── Fallback flow ────────────────────────────────────────────────────────────

/// An item the detector missed is anchored by its id in another document's
/// page text; the pool image of that page is copied under the canonical name
/// built from the *catalog* page, and the item leaves the missing list.
#[test]
fn test_fallback_recovers_missed_item_from_pool() {
    let root = tempdir().expect("tempdir");
    let config = pipeline_config(root.path());
    fs::create_dir_all(&config.output_dir).expect("output dir");
    seed_manifest(
        &config.manifest_path,
        r#"{
            "products": [
                {"Item": "44444", "Description": "Brass Lamp", "Page": "9"}
            ]
        }"#,
    );
    let mut manifest = CatalogManifest::load(&config.manifest_path).expect("load manifest");

    // The id appears on page 10 of the second document.
    let mut pages = vec![String::new(); 10];
    pages[9] = "44444 Brass Lamp 12.99".to_string();
    let docs = vec![
        StubDoc {
            label: "part1".into(),
            pages: vec![String::new(); 4],
        },
        StubDoc {
            label: "part2".into(),
            pages,
        },
    ];

    let pool = RawPool::at(config.pool_dir.clone()).expect("pool");
    let photo = page_raster(160, 160, &[(10, 10, 100, 100)]);
    pool.store("part2", 10, 0, &photo).expect("store pool image");

    let product = manifest.products[0].clone();
    let outcome =
        match_item(&product, &docs, &pool, &config.output_dir, &config).expect("match");
    let filename = match outcome {
        MatchOutcome::Matched(filename) => filename,
        other => panic!("expected a match, got {other:?}"),
    };

    // Named after catalog page 9, not document page 10.
    assert_eq!(filename, "Page9_44444_Brass_Lamp.png");
    assert!(config.output_dir.join(&filename).exists());

    manifest.insert_image(&filename);
    manifest.save(&config.manifest_path).expect("save");

    let count = run_missing_report(&config).expect("report");
    assert_eq!(count, 0);
    let report = fs::read_to_string(&config.missing_report).expect("read report");
    assert_eq!(report, "", "no missing items, empty report file");
}

// ── Curation and report flow ─────────────────────────────────────────────────

/// Curation drops a junk thumbnail and a byte-duplicate, prunes both from the
/// manifest on disk, and the regenerated missing report lists exactly the two
/// items whose photos were dropped, sorted.
#[test]
fn test_curation_prunes_assets_and_report_reflects_it() {
    let root = tempdir().expect("tempdir");
    let config = pipeline_config(root.path());
    fs::create_dir_all(&config.output_dir).expect("output dir");
    seed_manifest(
        &config.manifest_path,
        r#"{
            "products": [
                {"Item": "11111", "Description": "Steel Mug", "Page": "6"},
                {"Item": "22222", "Description": "Oak Chair", "Page": "6"},
                {"Item": "33333", "Description": "Pine Table", "Page": "6"}
            ],
            "images": [
                "Page6_11111_Steel_Mug.png",
                "Page6_22222_Oak_Chair.png",
                "Page6_33333_Pine_Table.png"
            ]
        }"#,
    );

    // 22222 is a byte-duplicate of 11111; 33333 is an undersized thumbnail.
    solid_png(&config.output_dir.join("Page6_11111_Steel_Mug.png"), 150, 90);
    solid_png(&config.output_dir.join("Page6_22222_Oak_Chair.png"), 150, 90);
    solid_png(&config.output_dir.join("Page6_33333_Pine_Table.png"), 10, 40);

    let summary = run_curation(&config).expect("curation");
    assert_eq!(summary.scanned, 3);
    assert_eq!(summary.junk, vec!["Page6_33333_Pine_Table.png"]);
    assert_eq!(summary.duplicates, vec!["Page6_22222_Oak_Chair.png"]);
    assert_eq!(summary.removed_from_manifest, 2);

    let reloaded = CatalogManifest::load(&config.manifest_path).expect("reload");
    assert_eq!(reloaded.images, vec!["Page6_11111_Steel_Mug.png"]);

    let count = run_missing_report(&config).expect("report");
    assert_eq!(count, 2);
    let report = fs::read_to_string(&config.missing_report).expect("read report");
    assert_eq!(report, "22222 | Oak Chair\n33333 | Pine Table\n");
}

// ── Manifest round trip ──────────────────────────────────────────────────────

/// Saving keeps the source table's column names and the tracked image list,
/// and a reload sees the identical records.
#[test]
fn test_manifest_round_trip_keeps_column_names() {
    let root = tempdir().expect("tempdir");
    let config = pipeline_config(root.path());
    seed_manifest(
        &config.manifest_path,
        r#"{
            "products": [
                {"Item": "11111", "Description": "Steel Mug", "Page": 6},
                {"Item": "", "Description": "Divider row", "Page": null}
            ],
            "images": ["Page6_11111_Steel_Mug.png"]
        }"#,
    );

    let manifest = CatalogManifest::load(&config.manifest_path).expect("load");
    assert_eq!(manifest.products[0].page, "6", "numeric Page read as text");
    assert_eq!(manifest.products[1].page, "", "null Page read as empty");
    manifest.save(&config.manifest_path).expect("save");

    let raw = fs::read_to_string(&config.manifest_path).expect("raw json");
    assert!(raw.contains("\"Item\": \"11111\""), "column names survive a save");
    assert!(raw.contains("\"images\""), "image list survives a save");

    let reloaded = CatalogManifest::load(&config.manifest_path).expect("reload");
    assert_eq!(reloaded.products, manifest.products);
    assert_eq!(reloaded.images, manifest.images);
}

// ── Association precision ────────────────────────────────────────────────────

/// `1234` must not ride on `11234`'s photo: association needs the id between
/// underscores, exactly as the canonical namer writes it.
#[test]
fn test_missing_report_does_not_credit_substring_ids() {
    let manifest = CatalogManifest {
        products: vec![
            ProductRecord {
                item: "1234".into(),
                description: "Short id".into(),
                page: "3".into(),
            },
            ProductRecord {
                item: "11234".into(),
                description: "Long id".into(),
                page: "3".into(),
            },
        ],
        images: vec!["Page3_11234_Long_id.png".into()],
    };

    assert!(manifest.has_image_for("11234"));
    assert!(!manifest.has_image_for("1234"));
    assert_eq!(missing_photo_lines(&manifest), vec!["1234 | Short id"]);
}
