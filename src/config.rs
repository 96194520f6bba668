//! Configuration types for the photo-extraction pipeline.
//!
//! All pipeline behaviour is controlled through [`PipelineConfig`], built via
//! its [`PipelineConfigBuilder`]. Keeping every knob in one struct makes it
//! trivial to share configs across stages, log them, and diff two runs to
//! understand why their outputs differ.
//!
//! # Design choice: builder over constructor
//! A fifteen-field constructor is unreadable and breaks on every new field.
//! The builder pattern lets callers set only what they care about and rely on
//! well-documented defaults for the rest. Every default below matches the
//! production values the pipeline was tuned with.

use crate::error::ExtractError;
use crate::progress::PipelineObserver;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration for a catalog photo-extraction run.
///
/// Built via [`PipelineConfig::builder()`] or using
/// [`PipelineConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf2assets::PipelineConfig;
///
/// let config = PipelineConfig::builder()
///     .document("catalog_2024.pdf")
///     .document("supplement.pdf")
///     .zoom(2.0)
///     .min_photo_px(45)
///     .build()
///     .unwrap();
/// ```
#[derive(Clone)]
pub struct PipelineConfig {
    /// Catalog documents, in priority order.
    ///
    /// The first path that opens successfully becomes the detection catalog
    /// (the document whose pages are scanned for photo blocks). Every usable
    /// document feeds the raw-image harvest and the text-anchored fallback.
    /// Missing or unopenable paths are logged and skipped; a run aborts only
    /// when none of them open.
    pub documents: Vec<PathBuf>,

    /// Path of the `{products, images}` JSON manifest. Default: `catalog.json`.
    pub manifest_path: PathBuf,

    /// Directory receiving canonical `Page<p>_<item>_<slug>` photos. Default: `product_images`.
    pub output_dir: PathBuf,

    /// Directory receiving the raw harvested pool. Default: `raw_images`.
    pub pool_dir: PathBuf,

    /// Path of the per-page shortfall log. Default: `extraction_log.txt`.
    pub shortfall_log: PathBuf,

    /// Path of the missing-photo report. Default: `missing_photos.txt`.
    pub missing_report: PathBuf,

    /// Raster scale factor applied to page dimensions. Default: 2.0.
    ///
    /// At zoom 2 a US-letter page renders at 1224 × 1584 px, which keeps
    /// 45-px thumbnails comfortably above the contour detector's smallest
    /// area threshold. Every pixel-valued knob below is interpreted in this
    /// zoomed raster space.
    pub zoom: f32,

    /// Rows above this document-space offset (in points) belong to the page
    /// header and are excluded from the photo band. Default: 100.
    pub header_offset_pts: f32,

    /// Substitute table boundary (in points) for pages where no column header
    /// is found. Default: 550.
    ///
    /// Product pages always carry the column header row; when it is absent
    /// the page is degenerate (a divider, an index page) and this split keeps
    /// the band clear of footer furniture.
    pub fallback_split_pts: f32,

    /// Column-header words that mark the top of the product table.
    /// Default: `Item`, `Description`, `UPC`, `Retail`.
    pub header_labels: Vec<String>,

    /// Grayscale cutoff separating photo pixels from the near-white page
    /// background: a pixel is foreground when its intensity is at or below
    /// this value. Default: 245.
    pub intensity_cutoff: u8,

    /// Descending ladder of minimum block areas (px²) tried by the contour
    /// extractor. Default: `[20000, 15000, 10000, 5000, 2000]`.
    ///
    /// The first rung admitting at least as many blocks as the page has
    /// products wins; if none does, the rung admitting the most blocks is
    /// used as a best effort. Must be non-empty and strictly descending.
    pub area_thresholds: Vec<u32>,

    /// Height (px) of the horizontal bucket used when ordering detected
    /// blocks into reading order. Default: 50.
    ///
    /// Blocks whose top edges fall in the same bucket are treated as one
    /// visual row and ordered left to right, so a few pixels of baseline
    /// wobble cannot flip two side-by-side photos.
    pub row_bucket_px: u32,

    /// Minimum width and height (px) a curated image must have. Anything
    /// smaller is an icon or a rule, not a product photo. Default: 45.
    pub min_photo_px: u32,

    /// Maximum allowed ratio between the longer and shorter side of a
    /// curated image. Default: 4.0.
    pub max_aspect_ratio: f32,

    /// Maximum length of the description slug embedded in canonical
    /// filenames. Default: 50.
    pub slug_max_len: usize,

    /// Optional observer notified of stage and page progress.
    ///
    /// The library itself never prints; the CLI installs an indicatif-backed
    /// observer here. `None` means no notifications.
    pub observer: Option<Arc<dyn PipelineObserver>>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            documents: Vec::new(),
            manifest_path: PathBuf::from("catalog.json"),
            output_dir: PathBuf::from("product_images"),
            pool_dir: PathBuf::from("raw_images"),
            shortfall_log: PathBuf::from("extraction_log.txt"),
            missing_report: PathBuf::from("missing_photos.txt"),
            zoom: 2.0,
            header_offset_pts: 100.0,
            fallback_split_pts: 550.0,
            header_labels: vec![
                "Item".to_string(),
                "Description".to_string(),
                "UPC".to_string(),
                "Retail".to_string(),
            ],
            intensity_cutoff: 245,
            area_thresholds: vec![20_000, 15_000, 10_000, 5_000, 2_000],
            row_bucket_px: 50,
            min_photo_px: 45,
            max_aspect_ratio: 4.0,
            slug_max_len: 50,
            observer: None,
        }
    }
}

impl fmt::Debug for PipelineConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineConfig")
            .field("documents", &self.documents)
            .field("manifest_path", &self.manifest_path)
            .field("output_dir", &self.output_dir)
            .field("pool_dir", &self.pool_dir)
            .field("shortfall_log", &self.shortfall_log)
            .field("missing_report", &self.missing_report)
            .field("zoom", &self.zoom)
            .field("header_offset_pts", &self.header_offset_pts)
            .field("fallback_split_pts", &self.fallback_split_pts)
            .field("header_labels", &self.header_labels)
            .field("intensity_cutoff", &self.intensity_cutoff)
            .field("area_thresholds", &self.area_thresholds)
            .field("row_bucket_px", &self.row_bucket_px)
            .field("min_photo_px", &self.min_photo_px)
            .field("max_aspect_ratio", &self.max_aspect_ratio)
            .field("slug_max_len", &self.slug_max_len)
            .field("observer", &self.observer.as_ref().map(|_| "<dyn PipelineObserver>"))
            .finish()
    }
}

impl PipelineConfig {
    /// Create a new builder for `PipelineConfig`.
    pub fn builder() -> PipelineConfigBuilder {
        PipelineConfigBuilder {
            config: Self::default(),
        }
    }

    /// Header offset converted into zoomed-raster pixel rows.
    pub fn header_offset_px(&self) -> f32 {
        self.header_offset_pts * self.zoom
    }

    /// Fallback split converted into zoomed-raster pixel rows.
    pub fn fallback_split_px(&self) -> f32 {
        self.fallback_split_pts * self.zoom
    }
}

/// Builder for [`PipelineConfig`].
#[derive(Debug)]
pub struct PipelineConfigBuilder {
    config: PipelineConfig,
}

impl PipelineConfigBuilder {
    /// Append a catalog document path. Order matters: the first usable
    /// document is the detection catalog.
    pub fn document(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.documents.push(path.into());
        self
    }

    /// Replace the whole document list.
    pub fn documents<I, P>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        self.config.documents = paths.into_iter().map(Into::into).collect();
        self
    }

    pub fn manifest_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.manifest_path = path.into();
        self
    }

    pub fn output_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.output_dir = path.into();
        self
    }

    pub fn pool_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.pool_dir = path.into();
        self
    }

    pub fn shortfall_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.shortfall_log = path.into();
        self
    }

    pub fn missing_report(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.missing_report = path.into();
        self
    }

    pub fn zoom(mut self, zoom: f32) -> Self {
        self.config.zoom = zoom;
        self
    }

    pub fn header_offset_pts(mut self, pts: f32) -> Self {
        self.config.header_offset_pts = pts.max(0.0);
        self
    }

    pub fn fallback_split_pts(mut self, pts: f32) -> Self {
        self.config.fallback_split_pts = pts;
        self
    }

    /// Replace the column-header label set.
    pub fn header_labels<I, S>(mut self, labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.header_labels = labels.into_iter().map(Into::into).collect();
        self
    }

    pub fn intensity_cutoff(mut self, cutoff: u8) -> Self {
        self.config.intensity_cutoff = cutoff;
        self
    }

    /// Replace the area-threshold ladder. Validated at `build()`:
    /// non-empty, strictly descending.
    pub fn area_thresholds(mut self, thresholds: Vec<u32>) -> Self {
        self.config.area_thresholds = thresholds;
        self
    }

    pub fn row_bucket_px(mut self, px: u32) -> Self {
        self.config.row_bucket_px = px.max(1);
        self
    }

    pub fn min_photo_px(mut self, px: u32) -> Self {
        self.config.min_photo_px = px;
        self
    }

    pub fn max_aspect_ratio(mut self, ratio: f32) -> Self {
        self.config.max_aspect_ratio = ratio;
        self
    }

    pub fn slug_max_len(mut self, len: usize) -> Self {
        self.config.slug_max_len = len.max(1);
        self
    }

    pub fn observer(mut self, observer: Arc<dyn PipelineObserver>) -> Self {
        self.config.observer = Some(observer);
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<PipelineConfig, ExtractError> {
        let c = &self.config;
        if !c.zoom.is_finite() || c.zoom <= 0.0 {
            return Err(ExtractError::InvalidConfig(format!(
                "zoom must be a positive number, got {}",
                c.zoom
            )));
        }
        if !c.fallback_split_pts.is_finite() || c.fallback_split_pts <= 0.0 {
            return Err(ExtractError::InvalidConfig(format!(
                "fallback split must be a positive number of points, got {}",
                c.fallback_split_pts
            )));
        }
        if c.area_thresholds.is_empty() {
            return Err(ExtractError::InvalidConfig(
                "area threshold ladder must not be empty".into(),
            ));
        }
        if c.area_thresholds.windows(2).any(|w| w[0] <= w[1]) {
            return Err(ExtractError::InvalidConfig(format!(
                "area threshold ladder must be strictly descending, got {:?}",
                c.area_thresholds
            )));
        }
        if !c.max_aspect_ratio.is_finite() || c.max_aspect_ratio < 1.0 {
            return Err(ExtractError::InvalidConfig(format!(
                "max aspect ratio must be at least 1.0, got {}",
                c.max_aspect_ratio
            )));
        }
        Ok(self.config)
    }
}
