//! Pipeline stages for catalog photo extraction.
//!
//! Each submodule implements exactly one transformation step.
//! Keeping stages separate makes each independently testable with synthetic
//! inputs and lets us swap implementations (e.g. replace the positional row
//! assigner with a content-verified one) without touching other stages.
//!
//! ## Data Flow
//!
//! ```text
//! words ──▶ region ──▶ contours ──▶ assign          (per detection page)
//! (pdfium)  (band)     (boxes)      (crops + names)
//!
//! documents ──▶ harvest ──▶ fallback ──▶ curate     (per run)
//!               (raw pool)  (text match) (junk/dup)
//! ```
//!
//! 1. [`region`]   — locate the photo band between the page header and the
//!    product-table top
//! 2. [`contours`] — binarize the band and search a descending area ladder
//!    for product-photo blocks
//! 3. [`assign`]   — pair blocks with product rows by reading order
//! 4. [`harvest`]  — dump every embedded image into the raw pool
//! 5. [`fallback`] — anchor still-unresolved items to pages by item-id text
//!    and borrow a pool image from the matching page
//! 6. [`curate`]   — drop junk-sized, skewed, and duplicate images from the
//!    manifest

pub mod assign;
pub mod contours;
pub mod curate;
pub mod fallback;
pub mod harvest;
pub mod region;
