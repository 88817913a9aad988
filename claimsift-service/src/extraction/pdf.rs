//! PDF access: pdfium binding, first-page rasterization, and text extraction.

use std::path::Path;

use image::RgbImage;
use pdfium_render::prelude::*;
use tracing::debug;

use crate::error::ProcessingError;

/// Create a new Pdfium instance (dynamically linked).
///
/// Searches for libpdfium in:
/// 1. Current directory (./libpdfium.so)
/// 2. vendor/pdfium/lib/
/// 3. System library paths
pub fn create_pdfium() -> Result<Pdfium, ProcessingError> {
    // Try local paths first, then system
    let bindings = Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
        .or_else(|_| {
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path(
                "./vendor/pdfium/lib/",
            ))
        })
        .or_else(|_| Pdfium::bind_to_system_library())
        .map_err(|e| ProcessingError::Load {
            source: Box::new(std::io::Error::other(format!(
                "Failed to load PDFium library. Install libpdfium or place it next to the binary: {:?}",
                e
            ))),
        })?;

    Ok(Pdfium::new(bindings))
}

fn load_document<'a>(
    pdfium: &'a Pdfium,
    path: &Path,
) -> Result<PdfDocument<'a>, ProcessingError> {
    pdfium
        .load_pdf_from_file(path, None)
        .map_err(|e| ProcessingError::Load {
            source: Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("Failed to load PDF: {:?}", e),
            )),
        })
}

/// Render page 1 of a PDF to an RGB raster at the given DPI.
///
/// The checkbox row is always on the first page of the claim form; other
/// pages are never rasterized.
pub fn render_first_page(path: &Path, dpi: f32) -> Result<RgbImage, ProcessingError> {
    let pdfium = create_pdfium()?;
    let document = load_document(&pdfium, path)?;

    let pages = document.pages();
    let page = pages
        .get(0)
        .map_err(|e| ProcessingError::PageRender {
            page: 1,
            source: Box::new(std::io::Error::other(format!(
                "Failed to get page 1: {:?}",
                e
            ))),
        })?;

    // Page geometry is in PDF points (1/72 inch)
    let pixels_per_point = dpi / 72.0;
    let width = (page.width().value * pixels_per_point).ceil() as i32;
    let height = (page.height().value * pixels_per_point).ceil() as i32;

    let config = PdfRenderConfig::new()
        .set_target_width(width)
        .set_target_height(height);

    let bitmap = page
        .render_with_config(&config)
        .map_err(|e| ProcessingError::PageRender {
            page: 1,
            source: Box::new(std::io::Error::other(format!(
                "Failed to render page 1: {:?}",
                e
            ))),
        })?;

    debug!(width, height, dpi, "Rendered claim page");

    // as_image() yields RGBA; flatten the alpha channel away
    Ok(bitmap.as_image().to_rgb8())
}

/// Extract text from every page, concatenated in page order with one newline
/// per page (matching the form's line-oriented layout).
pub fn extract_document_text(path: &Path) -> Result<String, ProcessingError> {
    let pdfium = create_pdfium()?;
    let document = load_document(&pdfium, path)?;

    let mut text = String::new();
    for (page_index, page) in document.pages().iter().enumerate() {
        let page_num = page_index as u32 + 1;

        let page_text = page.text().map_err(|e| ProcessingError::TextExtraction {
            page: page_num,
            source: Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("Failed to extract text from page {}: {:?}", page_num, e),
            )),
        })?;

        text.push_str(&page_text.all());
        text.push('\n');
    }

    debug!(
        pages = document.pages().len(),
        chars = text.len(),
        "Extracted claim text"
    );

    Ok(text)
}
