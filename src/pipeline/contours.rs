//! Adaptive contour extraction: turn the photo band into candidate blocks.
//!
//! Product photos are irregular scanned blocks on a near-white page, not a
//! fixed grid, so no single area threshold separates "photo" from "speck"
//! reliably across sparse and dense pages. The extractor binarizes once,
//! takes the outer contours once, then walks a descending ladder of minimum
//! areas: the first rung that admits at least as many blocks as the page has
//! products wins, and when no rung gets there the most productive rung is
//! kept as a best effort. One extra pass buys robustness on both page kinds.

use crate::config::PipelineConfig;
use image::{DynamicImage, GrayImage};
use imageproc::contours::{find_contours, BorderType, Contour};

/// A candidate photo block in zoomed page-raster coordinates.
///
/// `y` is page-space (the band offset is already applied), so a box can be
/// cropped straight out of the full page raster.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
    /// Bounding-box area in px². The detected blocks are solid rectangles,
    /// for which this equals the enclosed contour area.
    pub area: u32,
}

impl BlockBox {
    /// Cut this block out of the full page raster.
    pub fn crop(&self, raster: &DynamicImage) -> DynamicImage {
        raster.crop_imm(self.x, self.y, self.width, self.height)
    }
}

/// Binarize a grayscale region: pixels at or below `cutoff` become
/// foreground (255), everything brighter becomes background (0).
///
/// The cutoff sits just under pure white so anything printed — photo,
/// rule, text — is foreground against the page background.
pub fn binarize(gray: &GrayImage, cutoff: u8) -> GrayImage {
    let mut mask = GrayImage::new(gray.width(), gray.height());
    for (src, dst) in gray.pixels().zip(mask.pixels_mut()) {
        dst.0[0] = if src.0[0] <= cutoff { 255 } else { 0 };
    }
    mask
}

/// Outer-contour bounding boxes of a binary mask, with `offset_y` added so
/// the boxes land in page coordinates.
fn outer_boxes(mask: &GrayImage, offset_y: u32) -> Vec<BlockBox> {
    let contours: Vec<Contour<u32>> = find_contours(mask);
    let mut boxes = Vec::new();
    for contour in &contours {
        if contour.border_type != BorderType::Outer || contour.points.is_empty() {
            continue;
        }
        let mut min_x = u32::MAX;
        let mut min_y = u32::MAX;
        let mut max_x = 0u32;
        let mut max_y = 0u32;
        for p in &contour.points {
            min_x = min_x.min(p.x);
            min_y = min_y.min(p.y);
            max_x = max_x.max(p.x);
            max_y = max_y.max(p.y);
        }
        let width = max_x - min_x + 1;
        let height = max_y - min_y + 1;
        boxes.push(BlockBox {
            x: min_x,
            y: min_y + offset_y,
            width,
            height,
            area: width * height,
        });
    }
    boxes
}

/// Order boxes left-to-right within row buckets, top-to-bottom across them.
///
/// Bucketing `y` tolerates a few pixels of baseline wobble between photos
/// that sit visually side by side; exact-`y` ordering would flip them.
pub fn sort_reading_order(boxes: &mut [BlockBox], row_bucket_px: u32) {
    boxes.sort_by_key(|b| (b.y / row_bucket_px, b.x));
}

/// Detect photo blocks in a grayscale band cropped at `offset_y` from the
/// page top.
///
/// Returns the admitted boxes in reading order. The result can be shorter
/// than `num_wanted` (best effort) or longer (the page holds more blocks
/// than products); the caller pairs what it can.
pub fn detect_blocks(
    region: &GrayImage,
    offset_y: u32,
    num_wanted: usize,
    config: &PipelineConfig,
) -> Vec<BlockBox> {
    let mask = binarize(region, config.intensity_cutoff);
    let all_boxes = outer_boxes(&mask, offset_y);

    let mut best: Vec<BlockBox> = Vec::new();
    for &threshold in &config.area_thresholds {
        let mut admitted: Vec<BlockBox> = all_boxes
            .iter()
            .filter(|b| b.area > threshold)
            .copied()
            .collect();
        sort_reading_order(&mut admitted, config.row_bucket_px);

        if admitted.len() >= num_wanted {
            return admitted;
        }
        if admitted.len() > best.len() {
            best = admitted;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    fn cfg() -> PipelineConfig {
        PipelineConfig::builder().build().unwrap()
    }

    /// White region with solid dark rectangles at the given
    /// `(x, y, width, height)` positions.
    fn region_with_blocks(width: u32, height: u32, blocks: &[(u32, u32, u32, u32)]) -> GrayImage {
        let mut img = GrayImage::from_pixel(width, height, Luma([255]));
        for &(bx, by, bw, bh) in blocks {
            for y in by..by + bh {
                for x in bx..bx + bw {
                    img.put_pixel(x, y, Luma([0]));
                }
            }
        }
        img
    }

    #[test]
    fn binarize_cutoff_is_inclusive() {
        let mut gray = GrayImage::new(3, 1);
        gray.put_pixel(0, 0, Luma([245]));
        gray.put_pixel(1, 0, Luma([246]));
        gray.put_pixel(2, 0, Luma([0]));
        let mask = binarize(&gray, 245);
        assert_eq!(mask.get_pixel(0, 0).0[0], 255);
        assert_eq!(mask.get_pixel(1, 0).0[0], 0);
        assert_eq!(mask.get_pixel(2, 0).0[0], 255);
    }

    #[test]
    fn large_blocks_are_found_at_the_first_rung() {
        // Three 150x150 blocks: area 22500 clears every rung of the default
        // ladder, so the largest threshold already admits all of them.
        let region = region_with_blocks(
            800,
            600,
            &[(20, 20, 150, 150), (300, 20, 150, 150), (20, 300, 150, 150)],
        );
        let boxes = detect_blocks(&region, 0, 3, &cfg());
        assert_eq!(boxes.len(), 3);
        for b in &boxes {
            assert_eq!(b.width, 150);
            assert_eq!(b.height, 150);
            assert_eq!(b.area, 22_500);
        }
    }

    #[test]
    fn ladder_descends_until_enough_blocks_admit() {
        // 80x80 blocks (area 6400) only clear the 5000 rung; a 30x30 speck
        // clears nothing.
        let region = region_with_blocks(
            600,
            400,
            &[(10, 10, 80, 80), (200, 10, 80, 80), (400, 10, 30, 30)],
        );
        let boxes = detect_blocks(&region, 0, 2, &cfg());
        assert_eq!(boxes.len(), 2);
        assert!(boxes.iter().all(|b| b.area == 6_400));
    }

    #[test]
    fn best_effort_keeps_the_most_productive_rung() {
        let region = region_with_blocks(600, 400, &[(10, 10, 80, 80)]);
        let boxes = detect_blocks(&region, 0, 3, &cfg());
        assert_eq!(boxes.len(), 1);
    }

    #[test]
    fn empty_region_yields_no_blocks() {
        let region = region_with_blocks(400, 300, &[]);
        assert!(detect_blocks(&region, 0, 2, &cfg()).is_empty());
    }

    #[test]
    fn reading_order_buckets_rows() {
        // Two blocks on one visual row with a 30 px wobble, one below.
        let region = region_with_blocks(
            800,
            600,
            &[(500, 10, 150, 150), (10, 40, 150, 150), (10, 300, 150, 150)],
        );
        let boxes = detect_blocks(&region, 0, 3, &cfg());
        let xs: Vec<u32> = boxes.iter().map(|b| b.x).collect();
        assert_eq!(xs, vec![10, 500, 10]);
    }

    #[test]
    fn offset_moves_boxes_into_page_space() {
        let region = region_with_blocks(400, 300, &[(50, 60, 150, 150)]);
        let boxes = detect_blocks(&region, 200, 1, &cfg());
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes[0].x, 50);
        assert_eq!(boxes[0].y, 260);
    }

    #[test]
    fn sort_is_stable_for_identical_keys() {
        let mut boxes = vec![
            BlockBox { x: 10, y: 5, width: 100, height: 100, area: 10_000 },
            BlockBox { x: 10, y: 20, width: 100, height: 100, area: 10_000 },
        ];
        sort_reading_order(&mut boxes, 50);
        assert_eq!(boxes[0].y, 5);
        assert_eq!(boxes[1].y, 20);
    }
}
