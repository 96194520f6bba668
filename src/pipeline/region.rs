//! Photo-band location: where on the page do product photos live?
//!
//! Catalog pages stack a masthead, a strip of product photos, and a product
//! table. The table's column-header row (`Item`, `Description`, ...) is the
//! most reliable landmark on the page, so the photo band is defined as
//! everything between a fixed header offset and the highest column-header
//! word. Pages without a header row (dividers, index pages) fall back to a
//! fixed split so the band never swallows footer furniture.

use crate::config::PipelineConfig;
use crate::document::PageWord;
use image::{DynamicImage, GrayImage};

/// The horizontal slice of a zoomed page raster to search for photo blocks.
/// Rows `top..bottom`, full page width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhotoBand {
    pub top: u32,
    pub bottom: u32,
}

impl PhotoBand {
    pub fn height(&self) -> u32 {
        self.bottom - self.top
    }

    /// Cut the band out of the page raster as grayscale, ready for
    /// binarisation.
    pub fn crop(&self, raster: &DynamicImage) -> GrayImage {
        raster
            .crop_imm(0, self.top, raster.width(), self.height())
            .to_luma8()
    }
}

/// Find the table-top boundary: the minimum `y_top` among words equal to one
/// of the configured column-header labels. `None` when no label occurs on
/// the page. Never an error; an absent boundary is an expected page shape.
pub fn table_top_boundary(words: &[PageWord], labels: &[String]) -> Option<f32> {
    words
        .iter()
        .filter(|w| labels.iter().any(|l| l == &w.text))
        .map(|w| w.y_top)
        .fold(None, |acc: Option<f32>, y| {
            Some(match acc {
                Some(best) => best.min(y),
                None => y,
            })
        })
}

/// Convert the table-top boundary into pixel rows of the zoomed raster.
///
/// The normal band runs from the header offset down to the boundary. Two
/// degenerate shapes are handled the same way production catalogs need:
/// a boundary above the header offset means the table starts at the very
/// top, so the header offset is dropped; no boundary at all on a page too
/// short to clear the header offset substitutes the configured fallback
/// split. A band that still has no rows yields `None` and the page simply
/// produces zero candidate boxes.
pub fn photo_band(
    boundary: Option<f32>,
    page_height_pts: f32,
    raster_height: u32,
    config: &PipelineConfig,
) -> Option<PhotoBand> {
    let mut top = config.header_offset_px();
    let mut bottom = boundary.unwrap_or(page_height_pts) * config.zoom;

    if bottom <= top {
        match boundary {
            None => bottom = config.fallback_split_px(),
            Some(_) => top = 0.0,
        }
    }

    let top = top as u32;
    let bottom = (bottom as u32).min(raster_height);
    if bottom <= top {
        return None;
    }
    Some(PhotoBand { top, bottom })
}
