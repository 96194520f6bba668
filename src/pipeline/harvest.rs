//! Raw-image harvest: dump every embedded image into the pool.
//!
//! The pool is pure extraction. No filtering, no deduplication, no product
//! knowledge: the fallback matcher later borrows from it by `(document,
//! page)` key across possibly many unresolved items, so the harvest runs
//! once per document, before any product-level logic.
//!
//! Pool entries are named `<label>_P<page>_I<index>.png` with a 1-based page
//! and a 0-based extraction index. pdfium hands back decoded pixels, so the
//! pool persists them re-encoded as PNG rather than copying source streams.

use crate::document::CatalogDocument;
use crate::error::ExtractError;
use image::DynamicImage;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// The on-disk pool of harvested embedded images.
pub struct RawPool {
    dir: PathBuf,
}

impl RawPool {
    /// Open (and create if needed) the pool directory.
    pub fn at(dir: impl Into<PathBuf>) -> Result<Self, ExtractError> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|source| ExtractError::PoolWrite {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn entry_name(label: &str, page: u32, index: usize) -> String {
        format!("{label}_P{page}_I{index}.png")
    }

    /// Persist one harvested image under its pool name. `page` is 1-based.
    pub fn store(
        &self,
        label: &str,
        page: u32,
        index: usize,
        image: &DynamicImage,
    ) -> Result<PathBuf, ExtractError> {
        let path = self.dir.join(Self::entry_name(label, page, index));
        image.save(&path).map_err(|e| ExtractError::PoolWrite {
            path: path.clone(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })?;
        Ok(path)
    }

    /// Pool entries for one `(label, page)` key, ordered by extraction
    /// index. The numeric sort matters: lexicographic order would put
    /// `I10` before `I2` and break the "first by extraction index"
    /// tie-break the fallback matcher relies on.
    pub fn page_entries(&self, label: &str, page: u32) -> Vec<PathBuf> {
        let prefix = format!("{label}_P{page}_I");
        let read = match fs::read_dir(&self.dir) {
            Ok(read) => read,
            Err(_) => return Vec::new(),
        };

        let mut entries: Vec<(usize, PathBuf)> = Vec::new();
        for entry in read.filter_map(|e| e.ok()) {
            let name = entry.file_name();
            let name = match name.to_str() {
                Some(name) => name,
                None => continue,
            };
            let rest = match name.strip_prefix(&prefix) {
                Some(rest) => rest,
                None => continue,
            };
            let index = match rest.split('.').next().and_then(|i| i.parse::<usize>().ok()) {
                Some(index) => index,
                None => continue,
            };
            entries.push((index, entry.path()));
        }
        entries.sort_by_key(|(index, _)| *index);
        entries.into_iter().map(|(_, path)| path).collect()
    }
}

/// Harvest one page's embedded images into the pool. Failures are logged
/// and skipped; returns the number of images stored.
pub fn harvest_page(doc: &CatalogDocument<'_>, pool: &RawPool, page_index: u32) -> usize {
    let images = match doc.embedded_images(page_index) {
        Ok(images) => images,
        Err(e) => {
            warn!(error = %e, "Skipping page during harvest");
            return 0;
        }
    };
    let mut stored = 0usize;
    for (index, image) in images.iter().enumerate() {
        match pool.store(doc.label(), page_index + 1, index, image) {
            Ok(path) => {
                stored += 1;
                debug!(path = %path.display(), "Stored pool image");
            }
            Err(e) => warn!(error = %e, "Failed to store pool image"),
        }
    }
    stored
}

/// Harvest every page of `doc` into the pool. Returns the number of images
/// stored across the whole document.
pub fn harvest_document(doc: &CatalogDocument<'_>, pool: &RawPool) -> usize {
    (0..doc.page_count())
        .map(|page_index| harvest_page(doc, pool, page_index))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Rgba, RgbaImage};
    use tempfile::tempdir;

    fn sample(side: u32, shade: u8) -> DynamicImage {
        DynamicImage::ImageRgba8(RgbaImage::from_pixel(
            side,
            side,
            Rgba([shade, shade, shade, 255]),
        ))
    }

    #[test]
    fn stored_entries_come_back_in_extraction_order() {
        let dir = tempdir().unwrap();
        let pool = RawPool::at(dir.path()).unwrap();
        // Eleven entries force the I10-versus-I2 lexicographic trap.
        for index in 0..11 {
            pool.store("cat", 3, index, &sample(8, index as u8)).unwrap();
        }
        let entries = pool.page_entries("cat", 3);
        assert_eq!(entries.len(), 11);
        for (i, path) in entries.iter().enumerate() {
            let name = path.file_name().unwrap().to_str().unwrap();
            assert_eq!(name, format!("cat_P3_I{i}.png"));
        }
    }

    #[test]
    fn page_entries_filter_by_label_and_page() {
        let dir = tempdir().unwrap();
        let pool = RawPool::at(dir.path()).unwrap();
        pool.store("cat", 1, 0, &sample(8, 10)).unwrap();
        pool.store("cat", 2, 0, &sample(8, 20)).unwrap();
        pool.store("dog", 1, 0, &sample(8, 30)).unwrap();
        // Page 12 must not leak into the page-1 prefix.
        pool.store("cat", 12, 0, &sample(8, 40)).unwrap();

        let entries = pool.page_entries("cat", 1);
        assert_eq!(entries.len(), 1);
        assert!(entries[0].ends_with("cat_P1_I0.png"));
    }

    #[test]
    fn entries_are_valid_pngs() {
        let dir = tempdir().unwrap();
        let pool = RawPool::at(dir.path()).unwrap();
        let path = pool.store("cat", 1, 0, &sample(12, 99)).unwrap();
        let opened = image::open(&path).unwrap();
        assert_eq!(opened.width(), 12);
    }

    #[test]
    fn missing_pool_directory_reads_as_empty() {
        let dir = tempdir().unwrap();
        let pool = RawPool {
            dir: dir.path().join("never_created"),
        };
        assert!(pool.page_entries("cat", 1).is_empty());
    }
}
