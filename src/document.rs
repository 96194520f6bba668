//! pdfium-backed access to catalog documents.
//!
//! Everything the pipeline wants from a PDF goes through [`CatalogDocument`]:
//! word positions for the region locator, zoomed rasters for the contour
//! extractor, raw page text for the fallback matcher, and embedded images for
//! the harvester. Keeping all pdfium calls in one module means the stage code
//! never touches a pdfium type directly, and the fallback matcher can run
//! against the [`TextIndex`] trait in tests without a pdfium library present.

use crate::error::ExtractError;
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Bind to a pdfium library and return the runtime handle.
///
/// Search order: the `PDFIUM_LIB_PATH` directory when set, then the current
/// directory, then the system loader. One runtime is created per process run
/// and shared by every document.
pub fn catalog_runtime() -> Result<Pdfium, ExtractError> {
    let override_dir =
        std::env::var("PDFIUM_LIB_PATH").unwrap_or_else(|_| String::from("./"));
    let bindings =
        Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(&override_dir))
            .or_else(|_| {
                Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
            })
            .or_else(|_| Pdfium::bind_to_system_library())
            .map_err(|e| ExtractError::PdfiumBindingFailed(format!("{e:?}")))?;
    Ok(Pdfium::new(bindings))
}

/// Short label for a document path: the file stem, or the whole path when
/// there is none. Used in pool filenames, probes, and logs.
pub fn doc_label(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// One whitespace-delimited word with the top edge of its text segment, in
/// top-origin document points.
#[derive(Debug, Clone, PartialEq)]
pub struct PageWord {
    pub text: String,
    pub y_top: f32,
}

/// Everything the detection stage needs from one page, loaded in a single
/// pass: the word list, the page height in points, and the zoomed raster.
pub struct PageScan {
    pub words: Vec<PageWord>,
    pub height_pts: f32,
    pub raster: DynamicImage,
}

/// Read-only text access used by the fallback matcher.
///
/// [`CatalogDocument`] implements this over pdfium; tests implement it over
/// in-memory page strings.
pub trait TextIndex {
    /// Short document label (file stem), used in pool filenames and logs.
    fn label(&self) -> &str;

    /// Number of pages in the document.
    fn page_count(&self) -> u32;

    /// Whether the page's extracted text contains `needle` anywhere.
    /// Text-extraction failures count as "not found" and are logged.
    fn page_contains(&self, index: u32, needle: &str) -> bool;
}

/// An open catalog document.
///
/// Borrows the [`Pdfium`] runtime, so the runtime must outlive every
/// document opened from it.
pub struct CatalogDocument<'a> {
    doc: PdfDocument<'a>,
    label: String,
    path: PathBuf,
}

impl<'a> CatalogDocument<'a> {
    /// Open a document. Failure is local to this document: callers skip it
    /// with a diagnostic and move on.
    pub fn open(pdfium: &'a Pdfium, path: &Path) -> Result<Self, ExtractError> {
        let doc = pdfium
            .load_pdf_from_file(path, None)
            .map_err(|e| ExtractError::DocumentOpen {
                path: path.to_path_buf(),
                detail: format!("{e:?}"),
            })?;
        let label = doc_label(path);
        debug!(label = %label, pages = doc.pages().len(), "Opened catalog document");
        Ok(Self {
            doc,
            label,
            path: path.to_path_buf(),
        })
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn page_count(&self) -> u32 {
        self.doc.pages().len() as u32
    }

    fn page(&self, index: u32) -> Result<PdfPage<'_>, ExtractError> {
        self.doc
            .pages()
            .get(index as u16)
            .map_err(|e| ExtractError::PageLoad {
                label: self.label.clone(),
                page: index + 1,
                detail: format!("{e:?}"),
            })
    }

    /// Load one page for detection: words, height, and the raster scaled by
    /// `zoom` in both dimensions.
    pub fn scan_page(&self, index: u32, zoom: f32) -> Result<PageScan, ExtractError> {
        let page = self.page(index)?;
        let height_pts = page.height().value;
        let width_px = (page.width().value * zoom) as i32;
        let height_px = (height_pts * zoom) as i32;

        let words = Self::segment_words(&page, height_pts, self.label(), index)?;

        let render_config = PdfRenderConfig::new()
            .set_target_width(width_px)
            .set_target_height(height_px);
        let raster = page
            .render_with_config(&render_config)
            .map_err(|e| ExtractError::RasterisationFailed {
                label: self.label.clone(),
                page: index + 1,
                detail: format!("{e:?}"),
            })?
            .as_image();

        Ok(PageScan {
            words,
            height_pts,
            raster,
        })
    }

    /// Full extracted text of one page.
    pub fn page_text(&self, index: u32) -> Result<String, ExtractError> {
        let page = self.page(index)?;
        let text = page.text().map_err(|e| ExtractError::TextRead {
            label: self.label.clone(),
            page: index + 1,
            detail: format!("{e:?}"),
        })?;
        Ok(text.all())
    }

    /// Decode every embedded raster image on one page, in object order.
    ///
    /// Individual images that pdfium cannot decode are skipped; the page's
    /// remaining images still come back.
    pub fn embedded_images(&self, index: u32) -> Result<Vec<DynamicImage>, ExtractError> {
        let page = self.page(index)?;
        let mut images = Vec::new();
        for object in page.objects().iter() {
            if let PdfPageObject::Image(image_obj) = &object {
                match image_obj.get_raw_image() {
                    Ok(img) => images.push(img),
                    Err(e) => {
                        debug!(
                            label = %self.label,
                            page = index + 1,
                            error = ?e,
                            "Skipping undecodable embedded image"
                        );
                    }
                }
            }
        }
        Ok(images)
    }

    /// Count embedded image objects on one page without decoding them.
    pub fn embedded_image_count(&self, index: u32) -> Result<usize, ExtractError> {
        let page = self.page(index)?;
        let count = page
            .objects()
            .iter()
            .filter(|o| matches!(o, PdfPageObject::Image(_)))
            .count();
        Ok(count)
    }

    /// Split page text segments into positioned words. pdfium reports
    /// bottom-origin rectangles; `y_top` is converted to top-origin so it is
    /// directly comparable with raster rows.
    fn segment_words(
        page: &PdfPage<'_>,
        page_height: f32,
        label: &str,
        index: u32,
    ) -> Result<Vec<PageWord>, ExtractError> {
        let text = page.text().map_err(|e| ExtractError::TextRead {
            label: label.to_string(),
            page: index + 1,
            detail: format!("{e:?}"),
        })?;

        let mut words = Vec::new();
        for segment in text.segments().iter() {
            let content = segment.text();
            if content.trim().is_empty() {
                continue;
            }
            let bounds = segment.bounds();
            let y_top = page_height - bounds.top().value;
            for word in content.split_whitespace() {
                words.push(PageWord {
                    text: word.to_string(),
                    y_top,
                });
            }
        }
        Ok(words)
    }
}

impl TextIndex for CatalogDocument<'_> {
    fn label(&self) -> &str {
        &self.label
    }

    fn page_count(&self) -> u32 {
        self.doc.pages().len() as u32
    }

    fn page_contains(&self, index: u32, needle: &str) -> bool {
        match self.page_text(index) {
            Ok(text) => text.contains(needle),
            Err(e) => {
                warn!(
                    label = %self.label,
                    page = index + 1,
                    error = %e,
                    "Text read failed; treating page as not matching"
                );
                false
            }
        }
    }
}
