//! Positioned page text.

use lopdf::Document;
use pdfium_render::prelude::*;

use crate::config::EngineConfig;
use crate::error::Result;
use crate::geometry::CropBox;
use crate::pdf::engine::{self, engine_error};
use crate::text::{Bounds, Glyph};

/// Supplies the characters of a page in reading order.
pub trait TextSource {
    /// Characters of page `page_index` (0-based), boxed in top-left-origin
    /// points relative to `crop`.
    fn glyphs(&self, pdf: &mut Document, page_index: u32, crop: &CropBox) -> Result<Vec<Glyph>>;
}

/// Text source backed by pdfium's text page.
#[derive(Debug, Clone, Default)]
pub struct PdfiumTextSource {
    config: EngineConfig,
}

impl PdfiumTextSource {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }
}

impl TextSource for PdfiumTextSource {
    fn glyphs(&self, pdf: &mut Document, page_index: u32, crop: &CropBox) -> Result<Vec<Glyph>> {
        let bytes = engine::document_bytes(pdf)?;
        let pdfium = engine::bind(&self.config)?;
        let document = pdfium
            .load_pdf_from_byte_slice(&bytes, None)
            .map_err(engine_error)?;
        let page = document
            .pages()
            .get(engine::page_index(page_index)?)
            .map_err(engine_error)?;
        let text_page = page.text().map_err(engine_error)?;

        let mut glyphs = Vec::new();
        for char_obj in text_page.chars().iter() {
            let Some(ch) = char_obj.unicode_char() else {
                continue;
            };
            // generated spaces and breaks often have no tight box
            let rect = match char_obj.tight_bounds() {
                Ok(rect) if rect.width().value > 0.0 || !ch.is_whitespace() => rect,
                _ => match char_obj.loose_bounds() {
                    Ok(rect) => rect,
                    Err(_) if ch == '\n' || ch == '\r' => PdfRect::zero(),
                    Err(_) => continue,
                },
            };
            glyphs.push(Glyph {
                ch,
                bounds: Bounds::from_page_rect(
                    crop,
                    f64::from(rect.left().value),
                    f64::from(rect.bottom().value),
                    f64::from(rect.right().value),
                    f64::from(rect.top().value),
                ),
            });
        }
        log::debug!("page {} has {} text characters", page_index, glyphs.len());
        Ok(glyphs)
    }
}
