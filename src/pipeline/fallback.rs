//! Text-anchored fallback matching for items the row assigner missed.
//!
//! A product's item id almost always appears verbatim in the text of the
//! page that sells it. The fallback walks documents in declared order and
//! pages ascending, and anchors the item to the first page whose text
//! contains the id. That page's first pool image (by extraction index)
//! becomes the product photo, copied under the canonical filename.
//!
//! This is deliberately a weaker, text-presence-only heuristic: it trades
//! precision for recall, since position-based matching already failed for
//! these items. The first matching page wins even when it has no harvested
//! images; the item then stays unresolved for this run.

use crate::config::PipelineConfig;
use crate::document::TextIndex;
use crate::error::ExtractError;
use crate::manifest::{asset_filename, ProductRecord};
use crate::pipeline::harvest::RawPool;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Outcome of one fallback attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchOutcome {
    /// A pool image was copied under this canonical filename.
    Matched(String),
    /// The id was found, but the matching page has no harvested images.
    /// Terminal for this run; the scan does not continue past it.
    NoPoolImages { label: String, page: u32 },
    /// The id never occurred in any document's text.
    NotFound,
}

/// Try to anchor one unresolved product to a page by its item id.
///
/// Callers pass products with a non-empty id and a usable catalog page;
/// anything else comes back [`MatchOutcome::NotFound`] without scanning.
/// The only error is a failed copy of the chosen pool image.
pub fn match_item<D: TextIndex>(
    product: &ProductRecord,
    docs: &[D],
    pool: &RawPool,
    output_dir: &Path,
    config: &PipelineConfig,
) -> Result<MatchOutcome, ExtractError> {
    let needle = product.item.as_str();
    if needle.is_empty() {
        return Ok(MatchOutcome::NotFound);
    }
    let catalog_page = match product.catalog_page() {
        Some(page) => page,
        None => return Ok(MatchOutcome::NotFound),
    };

    for doc in docs {
        for page_index in 0..doc.page_count() {
            if !doc.page_contains(page_index, needle) {
                continue;
            }
            let document_page = page_index + 1;
            debug!(
                item = needle,
                label = doc.label(),
                page = document_page,
                "Item id found in page text"
            );

            let entries = pool.page_entries(doc.label(), document_page);
            let source_path = match entries.first() {
                Some(path) => path,
                None => {
                    return Ok(MatchOutcome::NoPoolImages {
                        label: doc.label().to_string(),
                        page: document_page,
                    })
                }
            };

            let ext = source_path
                .extension()
                .and_then(|e| e.to_str())
                .unwrap_or("png");
            let filename = asset_filename(
                catalog_page,
                &product.item,
                &product.description,
                ext,
                config.slug_max_len,
            );
            let dest = output_dir.join(&filename);
            fs::copy(source_path, &dest).map_err(|e| ExtractError::AssetWrite {
                path: dest.clone(),
                source: e,
            })?;
            return Ok(MatchOutcome::Matched(filename));
        }
    }
    Ok(MatchOutcome::NotFound)
}
