//! Asset curation: drop junk-sized, skewed, and duplicate images from the
//! manifest.
//!
//! Both filters only remove manifest entries, never files. Disk cleanup is a
//! separate concern; keeping the bytes around makes a bad curation run
//! recoverable by re-running with different thresholds.
//!
//! The directory is scanned in sorted filename order so the duplicate
//! filter's "first seen wins" is reproducible across runs and filesystems.

use crate::config::PipelineConfig;
use crate::manifest::CatalogManifest;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tracing::{debug, info, warn};

/// What one curation pass found and removed.
#[derive(Debug, Default, Clone)]
pub struct CurationSummary {
    /// Image files examined (curatable extensions only).
    pub scanned: usize,
    /// Names rejected by the size/aspect rules.
    pub junk: Vec<String>,
    /// Names whose content repeated an earlier file.
    pub duplicates: Vec<String>,
    /// Files skipped entirely: unreadable or not decodable as an image.
    pub unreadable: usize,
    /// Manifest entries removed by this pass.
    pub removed_from_manifest: usize,
}

fn curatable(name: &str) -> bool {
    let lower = name.to_ascii_lowercase();
    lower.ends_with(".png") || lower.ends_with(".jpg") || lower.ends_with(".jpeg")
}

/// The junk rule: too small on either side, or more than `max_aspect_ratio`
/// times as wide as tall (or vice versa). Catalogs do not contain usable
/// product photos that small or that elongated; those blobs are icons,
/// rules, and page furniture.
fn is_junk(width: u32, height: u32, config: &PipelineConfig) -> bool {
    if width < config.min_photo_px || height < config.min_photo_px {
        return true;
    }
    let (w, h) = (width as f32, height as f32);
    w / h > config.max_aspect_ratio || h / w > config.max_aspect_ratio
}

/// Scan `dir`, classify junk and duplicates, and rewrite the manifest's
/// image set to exclude them.
///
/// Unreadable files are excluded from both filters and stay in the manifest;
/// a later run with the file repaired can still curate it.
pub fn curate_assets(
    dir: &Path,
    manifest: &mut CatalogManifest,
    config: &PipelineConfig,
) -> CurationSummary {
    let mut summary = CurationSummary::default();

    let mut names: Vec<String> = Vec::new();
    match fs::read_dir(dir) {
        Ok(read) => {
            for entry in read.filter_map(|e| e.ok()) {
                if let Some(name) = entry.file_name().to_str() {
                    if curatable(name) {
                        names.push(name.to_string());
                    }
                }
            }
        }
        Err(e) => {
            warn!(dir = %dir.display(), error = %e, "Asset directory unreadable; nothing to curate");
            return summary;
        }
    }
    names.sort_unstable();

    let mut seen: HashMap<String, String> = HashMap::new();
    for name in names {
        summary.scanned += 1;
        let path = dir.join(&name);

        let (width, height) = match image::image_dimensions(&path) {
            Ok(dims) => dims,
            Err(e) => {
                debug!(file = %name, error = %e, "Skipping unreadable image");
                summary.unreadable += 1;
                continue;
            }
        };
        if is_junk(width, height, config) {
            debug!(file = %name, width, height, "Classified as junk");
            summary.junk.push(name);
            continue;
        }

        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) => {
                debug!(file = %name, error = %e, "Skipping unhashable image");
                summary.unreadable += 1;
                continue;
            }
        };
        let hash = format!("{:x}", md5::compute(&bytes));
        if let Some(kept) = seen.get(&hash) {
            debug!(file = %name, duplicate_of = %kept, "Classified as duplicate");
            summary.duplicates.push(name);
        } else {
            seen.insert(hash, name);
        }
    }

    let before = manifest.images.len();
    manifest
        .images
        .retain(|img| !summary.junk.contains(img) && !summary.duplicates.contains(img));
    summary.removed_from_manifest = before - manifest.images.len();

    info!(
        scanned = summary.scanned,
        junk = summary.junk.len(),
        duplicates = summary.duplicates.len(),
        removed = summary.removed_from_manifest,
        "Curation pass complete"
    );
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::tempdir;

    fn write_image(dir: &Path, name: &str, width: u32, height: u32, shade: u8) {
        let img = RgbaImage::from_pixel(width, height, Rgba([shade, shade, shade, 255]));
        img.save(dir.join(name)).unwrap();
    }

    fn manifest_with(names: &[&str]) -> CatalogManifest {
        CatalogManifest {
            products: Vec::new(),
            images: names.iter().map(|n| n.to_string()).collect(),
        }
    }

    fn cfg() -> PipelineConfig {
        PipelineConfig::builder().build().unwrap()
    }

    #[test]
    fn size_boundary_at_the_minimum() {
        let dir = tempdir().unwrap();
        write_image(dir.path(), "small.png", 40, 40, 10);
        write_image(dir.path(), "fine.png", 50, 50, 20);
        let mut manifest = manifest_with(&["small.png", "fine.png"]);

        let summary = curate_assets(dir.path(), &mut manifest, &cfg());
        assert_eq!(summary.junk, vec!["small.png"]);
        assert_eq!(manifest.images, vec!["fine.png"]);
    }

    #[test]
    fn aspect_rule_is_strictly_greater_than() {
        let dir = tempdir().unwrap();
        write_image(dir.path(), "exact.png", 200, 50, 10);
        write_image(dir.path(), "wide.png", 201, 50, 20);
        write_image(dir.path(), "tall.png", 50, 201, 30);
        let mut manifest = manifest_with(&["exact.png", "wide.png", "tall.png"]);

        let summary = curate_assets(dir.path(), &mut manifest, &cfg());
        assert_eq!(summary.junk, vec!["tall.png", "wide.png"]);
        assert_eq!(manifest.images, vec!["exact.png"]);
    }

    #[test]
    fn duplicate_content_keeps_exactly_one_either_ordering() {
        let dir = tempdir().unwrap();
        write_image(dir.path(), "a.png", 60, 60, 77);
        write_image(dir.path(), "b.png", 60, 60, 77);

        let mut forward = manifest_with(&["a.png", "b.png"]);
        curate_assets(dir.path(), &mut forward, &cfg());
        assert_eq!(forward.images.len(), 1);

        let mut reversed = manifest_with(&["b.png", "a.png"]);
        curate_assets(dir.path(), &mut reversed, &cfg());
        assert_eq!(reversed.images.len(), 1);
    }

    #[test]
    fn first_seen_name_is_the_survivor() {
        let dir = tempdir().unwrap();
        write_image(dir.path(), "b_copy.png", 60, 60, 5);
        write_image(dir.path(), "z_copy.png", 60, 60, 5);
        let mut manifest = manifest_with(&["z_copy.png", "b_copy.png"]);

        let summary = curate_assets(dir.path(), &mut manifest, &cfg());
        assert_eq!(summary.duplicates, vec!["z_copy.png"]);
        assert_eq!(manifest.images, vec!["b_copy.png"]);
    }

    #[test]
    fn distinct_content_survives() {
        let dir = tempdir().unwrap();
        write_image(dir.path(), "a.png", 60, 60, 1);
        write_image(dir.path(), "b.png", 60, 60, 2);
        let mut manifest = manifest_with(&["a.png", "b.png"]);

        let summary = curate_assets(dir.path(), &mut manifest, &cfg());
        assert!(summary.duplicates.is_empty());
        assert_eq!(manifest.images.len(), 2);
    }

    #[test]
    fn unreadable_files_are_skipped_and_retained() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("broken.png"), b"not a png at all").unwrap();
        write_image(dir.path(), "ok.png", 60, 60, 9);
        let mut manifest = manifest_with(&["broken.png", "ok.png"]);

        let summary = curate_assets(dir.path(), &mut manifest, &cfg());
        assert_eq!(summary.unreadable, 1);
        assert!(summary.junk.is_empty());
        assert_eq!(manifest.images, vec!["broken.png", "ok.png"]);
    }

    #[test]
    fn non_image_files_are_ignored() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), b"hello").unwrap();
        write_image(dir.path(), "ok.png", 60, 60, 9);
        let mut manifest = manifest_with(&["ok.png"]);

        let summary = curate_assets(dir.path(), &mut manifest, &cfg());
        assert_eq!(summary.scanned, 1);
        assert_eq!(manifest.images, vec!["ok.png"]);
    }

    #[test]
    fn manifest_names_without_files_are_left_alone() {
        let dir = tempdir().unwrap();
        write_image(dir.path(), "ok.png", 60, 60, 9);
        let mut manifest = manifest_with(&["ok.png", "phantom.png"]);

        curate_assets(dir.path(), &mut manifest, &cfg());
        assert_eq!(manifest.images, vec!["ok.png", "phantom.png"]);
    }

    #[test]
    fn missing_directory_is_a_no_op() {
        let dir = tempdir().unwrap();
        let mut manifest = manifest_with(&["ok.png"]);
        let summary =
            curate_assets(&dir.path().join("nope"), &mut manifest, &cfg());
        assert_eq!(summary.scanned, 0);
        assert_eq!(manifest.images, vec!["ok.png"]);
    }
}
