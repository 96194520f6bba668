//! Progress-observer trait for pipeline stage and page events.
//!
//! Inject an [`Arc<dyn PipelineObserver>`] via
//! [`crate::config::PipelineConfigBuilder::observer`] to receive real-time
//! events as the pipeline walks stages, pages, and items.
//!
//! # Why an observer instead of return values?
//!
//! A batch run over a 400-page catalog can take minutes; its useful results
//! (the summary structs, the reports) only exist at the end. The observer is
//! the least-invasive way to surface liveness in the meantime: callers can
//! forward events to a terminal progress bar, a log sink, or a GUI without
//! the library knowing anything about how the host application communicates.
//! The trait is `Send + Sync` so one observer can be shared across threads
//! even though the pipeline itself runs sequentially.

use std::fmt;
use std::sync::Arc;

/// One pass of the extraction pipeline, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Contour-based detection over the detection catalog.
    Detection,
    /// Raw embedded-image harvest into the pool.
    Harvest,
    /// Text-anchored matching of unresolved items.
    Fallback,
    /// Junk and duplicate curation of the asset directory.
    Curation,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Detection => "detection",
            Stage::Harvest => "harvest",
            Stage::Fallback => "fallback",
            Stage::Curation => "curation",
        };
        f.write_str(name)
    }
}

/// Called by the pipeline as it processes stages, pages, and items.
///
/// All methods have default no-op implementations so callers only override
/// what they care about. The pipeline is sequential, so calls arrive in
/// order, but implementations must still be `Send + Sync` to be shareable
/// behind an `Arc`.
pub trait PipelineObserver: Send + Sync {
    /// Called once when a stage begins.
    ///
    /// # Arguments
    /// * `stage` — which pass is starting
    /// * `total_units` — pages (detection, harvest), items (fallback), or
    ///   files (curation) the stage expects to walk; 0 when unknown
    fn on_stage_start(&self, stage: Stage, total_units: usize) {
        let _ = (stage, total_units);
    }

    /// Called after each page of a page-walking stage.
    ///
    /// # Arguments
    /// * `stage` — the running stage
    /// * `page` — catalog page number (1-indexed where the document defines it)
    /// * `found` — items or images handled on this page
    /// * `wanted` — items or images the page asked for
    fn on_page_processed(&self, stage: Stage, page: u32, found: usize, wanted: usize) {
        let _ = (stage, page, found, wanted);
    }

    /// Called when an item receives an associated image.
    fn on_item_matched(&self, item_id: &str, filename: &str) {
        let _ = (item_id, filename);
    }

    /// Called when a stage gives up on an item.
    fn on_item_unresolved(&self, item_id: &str, page: u32) {
        let _ = (item_id, page);
    }

    /// Called once when a stage finishes.
    ///
    /// # Arguments
    /// * `stage` — which pass ended
    /// * `handled` — units the stage actually produced or matched
    fn on_stage_complete(&self, stage: Stage, handled: usize) {
        let _ = (stage, handled);
    }
}

/// A no-op implementation for callers that don't need progress events.
///
/// This is the default when no observer is configured.
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

/// Convenience alias matching the type stored in [`crate::config::PipelineConfig`].
pub type Observer = Arc<dyn PipelineObserver>;
