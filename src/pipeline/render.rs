//! Document rendering: page count, text layer, rasters and page copies.
//!
//! The pipeline only talks to [`DocumentRenderer`] / [`RenderedDocument`];
//! [`PdfiumRenderer`] is the production implementation on top of
//! `pdfium-render`. Page indices are 0-based at this seam and 1-based
//! everywhere a human sees them.
//!
//! ## Why cap pixels as well as DPI?
//!
//! Page sizes vary wildly: an A0 poster at 400 DPI would produce a
//! 13,000 × 18,000 px image. `max_rendered_pixels` caps the longest edge
//! regardless of physical size, keeping memory bounded.

use crate::error::{ConvertError, RenderError};
use image::DynamicImage;
use pdfium_render::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Opens documents for the pipeline.
pub trait DocumentRenderer {
    /// Open a PDF. The returned document may borrow the renderer.
    fn open<'a>(&'a self, path: &Path) -> Result<Box<dyn RenderedDocument + 'a>, ConvertError>;
}

/// An opened document.
pub trait RenderedDocument {
    fn page_count(&self) -> usize;

    /// Embedded text of page `index` (0-based). Empty for image-only pages.
    fn text_of(&self, index: usize) -> Result<String, RenderError>;

    /// Rasterise page `index` (0-based) at `dpi`.
    fn raster_of(&self, index: usize, dpi: u32) -> Result<DynamicImage, RenderError>;

    /// Copy `indices` (0-based, in the given order) into a new PDF saved at `dest`.
    fn copy_pages(&self, indices: &[usize], dest: &Path) -> Result<(), RenderError>;
}

/// pdfium-backed renderer.
pub struct PdfiumRenderer {
    pdfium: Pdfium,
    password: Option<String>,
    max_pixels: u32,
}

impl PdfiumRenderer {
    /// Bind to libpdfium, from `lib_dir` when given, else from the working
    /// directory or the system library path.
    pub fn new(
        lib_dir: Option<&Path>,
        password: Option<String>,
        max_pixels: u32,
    ) -> Result<Self, ConvertError> {
        let bindings = match lib_dir {
            Some(dir) => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(dir)),
            None => Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                .or_else(|_| Pdfium::bind_to_system_library()),
        }
        .map_err(|e| ConvertError::PdfiumBindingFailed(format!("{:?}", e)))?;

        Ok(Self {
            pdfium: Pdfium::new(bindings),
            password,
            max_pixels,
        })
    }
}

impl DocumentRenderer for PdfiumRenderer {
    fn open<'a>(&'a self, path: &Path) -> Result<Box<dyn RenderedDocument + 'a>, ConvertError> {
        let password = self.password.as_deref();
        let document = self.pdfium.load_pdf_from_file(path, password).map_err(|e| {
            let err_str = format!("{:?}", e);
            if err_str.contains("Password") || err_str.contains("password") {
                if password.is_some() {
                    ConvertError::WrongPassword {
                        path: path.to_path_buf(),
                    }
                } else {
                    ConvertError::PasswordRequired {
                        path: path.to_path_buf(),
                    }
                }
            } else {
                ConvertError::CorruptPdf {
                    path: path.to_path_buf(),
                    detail: err_str,
                }
            }
        })?;

        let page_count = document.pages().len() as usize;
        info!("PDF loaded: {} ({} pages)", path.display(), page_count);

        Ok(Box::new(PdfiumDocument {
            pdfium: &self.pdfium,
            document,
            page_count,
            max_pixels: self.max_pixels,
        }))
    }
}

struct PdfiumDocument<'a> {
    pdfium: &'a Pdfium,
    document: PdfDocument<'a>,
    page_count: usize,
    max_pixels: u32,
}

impl PdfiumDocument<'_> {
    fn page(&self, index: usize) -> Result<PdfPage<'_>, RenderError> {
        if index >= self.page_count {
            return Err(RenderError {
                page: index + 1,
                detail: format!("document has {} pages", self.page_count),
            });
        }
        self.document
            .pages()
            .get(index as u16)
            .map_err(|e| page_error(index, e))
    }
}

impl RenderedDocument for PdfiumDocument<'_> {
    fn page_count(&self) -> usize {
        self.page_count
    }

    fn text_of(&self, index: usize) -> Result<String, RenderError> {
        let page = self.page(index)?;
        let text = page.text().map_err(|e| page_error(index, e))?;
        Ok(text.all())
    }

    fn raster_of(&self, index: usize, dpi: u32) -> Result<DynamicImage, RenderError> {
        let page = self.page(index)?;
        let render_config = PdfRenderConfig::new()
            .scale_page_by_factor(dpi as f32 / 72.0)
            .set_maximum_width(self.max_pixels as i32)
            .set_maximum_height(self.max_pixels as i32);

        let bitmap = page
            .render_with_config(&render_config)
            .map_err(|e| page_error(index, e))?;

        let image = bitmap.as_image();
        debug!(
            "Rendered page {} → {}x{} px at {} DPI",
            index + 1,
            image.width(),
            image.height(),
            dpi
        );
        Ok(image)
    }

    fn copy_pages(&self, indices: &[usize], dest: &Path) -> Result<(), RenderError> {
        let first = indices.first().copied().unwrap_or(0);
        let mut target = self
            .pdfium
            .create_new_pdf()
            .map_err(|e| page_error(first, e))?;

        for (position, &index) in indices.iter().enumerate() {
            if index >= self.page_count {
                return Err(RenderError {
                    page: index + 1,
                    detail: format!("document has {} pages", self.page_count),
                });
            }
            target
                .pages_mut()
                .copy_page_from_document(&self.document, index as u16, position as u16)
                .map_err(|e| page_error(index, e))?;
        }

        target
            .save_to_file(dest)
            .map_err(|e| page_error(first, e))?;
        debug!("Wrote {} page(s) to {}", indices.len(), dest.display());
        Ok(())
    }
}

fn page_error(index: usize, e: PdfiumError) -> RenderError {
    RenderError {
        page: index + 1,
        detail: format!("{:?}", e),
    }
}
