//! The catalog manifest: the `{products, images}` record shared with
//! downstream consumers.
//!
//! The manifest is the only durable link between the tabular product list and
//! the extracted photo files. There is no foreign key: an image belongs to an
//! item if and only if its filename contains the literal substring
//! `_<item_id>_`. Association is therefore recomputed by scanning, which lets
//! independent pipeline runs reconcile without coordinating.
//!
//! Writes are whole-document replacements. A crash mid-write can corrupt the
//! file; that is acceptable because the next full run regenerates it, and no
//! concurrent access is supported.

use crate::error::ExtractError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

// ── Product records ──────────────────────────────────────────────────────

/// One product row from the tabular catalog.
///
/// Field names mirror the source columns (`Item`, `Description`, `Page`).
/// The raw `Page` value is kept verbatim; use [`ProductRecord::catalog_page`]
/// for the cleaned integer page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductRecord {
    /// Item identifier. Unique within a catalog; may be empty for filler rows.
    #[serde(rename = "Item", deserialize_with = "stringly", default)]
    pub item: String,

    /// Free-text product description, used for the filename slug.
    #[serde(rename = "Description", deserialize_with = "stringly", default)]
    pub description: String,

    /// Raw page value as found in the source table. Not always numeric.
    #[serde(rename = "Page", deserialize_with = "stringly", default)]
    pub page: String,
}

impl ProductRecord {
    /// The cleaned catalog page, or `None` when the raw value is unusable.
    pub fn catalog_page(&self) -> Option<u32> {
        clean_page(&self.page)
    }
}

/// Normalise a raw `Page` value.
///
/// Catalog exports are messy: pages arrive as `"6"`, `" 12 "`, the known
/// typo `"6g"`, or placeholders like `"N/A"`. Everything that is not a plain
/// integer (after the documented `"6g"` exception) means "no page": the
/// record is excluded from page grouping and from fallback matching, but
/// still shows up in the missing-photo report.
pub fn clean_page(raw: &str) -> Option<u32> {
    let s = raw.trim();
    if s == "6g" {
        return Some(6);
    }
    if !s.is_empty() && s.chars().all(|c| c.is_ascii_digit()) {
        return s.parse().ok();
    }
    None
}

/// Build the filename slug from a product description: every
/// non-alphanumeric character becomes `_`, truncated to `max_len` characters.
pub fn description_slug(description: &str, max_len: usize) -> String {
    description
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { '_' })
        .take(max_len)
        .collect()
}

/// Render the canonical asset filename `Page<page>_<item>_<slug>.<ext>`.
///
/// This shape is the association contract: the `_<item>_` infix is what
/// [`CatalogManifest::has_image_for`] scans for, so both writers (detection
/// crops and fallback copies) must go through this function.
pub fn asset_filename(page: u32, item: &str, description: &str, ext: &str, slug_max: usize) -> String {
    format!(
        "Page{page}_{item}_{slug}.{ext}",
        slug = description_slug(description, slug_max)
    )
}

// ── Manifest ─────────────────────────────────────────────────────────────

/// The on-disk catalog manifest: ordered products plus the image name set.
///
/// `images` has set semantics: [`CatalogManifest::insert_image`] refuses
/// duplicates, so the serialized array never holds the same name twice.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CatalogManifest {
    /// Product rows in source order. Never mutated by the pipeline.
    pub products: Vec<ProductRecord>,

    /// Associated image filenames. Insertion-ordered, duplicate-free.
    #[serde(default)]
    pub images: Vec<String>,
}

impl CatalogManifest {
    /// Load a manifest from disk.
    ///
    /// A missing, unreadable, or unparseable manifest is fatal: nothing
    /// downstream can run without the product list.
    pub fn load(path: &Path) -> Result<Self, ExtractError> {
        if !path.exists() {
            return Err(ExtractError::ManifestNotFound {
                path: path.to_path_buf(),
            });
        }
        let raw = fs::read_to_string(path).map_err(|source| ExtractError::ManifestRead {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&raw).map_err(|source| ExtractError::ManifestParse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Write the manifest back as pretty-printed JSON, replacing the whole
    /// document.
    pub fn save(&self, path: &Path) -> Result<(), ExtractError> {
        let json = serde_json::to_string_pretty(self).map_err(|e| ExtractError::ManifestWrite {
            path: path.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })?;
        fs::write(path, json).map_err(|source| ExtractError::ManifestWrite {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Add an image name, keeping set semantics. Returns `false` when the
    /// name was already present.
    pub fn insert_image(&mut self, name: &str) -> bool {
        if self.images.iter().any(|n| n == name) {
            return false;
        }
        self.images.push(name.to_string());
        true
    }

    /// Whether any manifest image is associated with `item` via the
    /// `_<item>_` contract. An empty id never matches: `__` would collide
    /// with the slug's replacement underscores.
    pub fn has_image_for(&self, item: &str) -> bool {
        if item.is_empty() {
            return false;
        }
        let needle = format!("_{item}_");
        self.images.iter().any(|img| img.contains(&needle))
    }

    /// Products with a non-empty id and no associated image, in source order.
    pub fn missing_items(&self) -> Vec<&ProductRecord> {
        self.products
            .iter()
            .filter(|p| !p.item.is_empty() && !self.has_image_for(&p.item))
            .collect()
    }

    /// Group products by cleaned page, ascending, preserving source order
    /// within each page. Records without a usable page are left out.
    pub fn page_groups(&self) -> BTreeMap<u32, Vec<ProductRecord>> {
        let mut groups: BTreeMap<u32, Vec<ProductRecord>> = BTreeMap::new();
        for product in &self.products {
            if let Some(page) = product.catalog_page() {
                groups.entry(page).or_default().push(product.clone());
            }
        }
        groups
    }

    /// Count of records excluded from page grouping by an unusable `Page`.
    pub fn unpaged_count(&self) -> usize {
        self.products
            .iter()
            .filter(|p| p.catalog_page().is_none())
            .count()
    }
}

// ── Serde helpers ────────────────────────────────────────────────────────

/// Accept strings and bare numbers for the tabular columns.
///
/// Catalog exports write `Item` and `Page` as JSON numbers when a column
/// happens to be fully numeric, and as strings otherwise. Downstream logic
/// wants the textual form either way.
fn stringly<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    use serde::de::Error;
    match serde_json::Value::deserialize(deserializer)? {
        serde_json::Value::String(s) => Ok(s),
        serde_json::Value::Number(n) => Ok(n.to_string()),
        serde_json::Value::Null => Ok(String::new()),
        other => Err(D::Error::custom(format!(
            "expected string or number, got {other}"
        ))),
    }
}
