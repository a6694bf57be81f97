//! Page rasterization.

use image::RgbImage;
use lopdf::Document;
use pdfium_render::prelude::*;

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::geometry::{scaled_page_size, PixelGeometry, POINTS_PER_INCH};
use crate::pdf::engine::{self, engine_error};

/// One slice of one page to paint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RasterJob {
    /// 0-based page index.
    pub page_index: u32,
    pub page_width: f64,
    pub page_height: f64,
    pub ppi: f64,
    pub geometry: PixelGeometry,
}

impl RasterJob {
    /// Points to pixels.
    pub fn scale(&self) -> f64 {
        self.ppi / POINTS_PER_INCH
    }

    /// True when the slice is the whole page at this resolution.
    pub fn is_full_page(&self) -> bool {
        let (width, height) = scaled_page_size(self.page_width, self.page_height, self.ppi);
        self.geometry.offset_x == 0
            && self.geometry.offset_y == 0
            && f64::from(self.geometry.width) == width.floor()
            && f64::from(self.geometry.height) == height.floor()
    }
}

/// Paints page content into an RGB bitmap.
pub trait Rasterizer {
    /// Render the slice described by `job`. The returned image must be
    /// exactly `job.geometry.width` x `job.geometry.height`.
    fn render(&self, pdf: &mut Document, job: &RasterJob) -> Result<RgbImage>;
}

/// Rasterizer backed by the pdfium library.
#[derive(Debug, Clone, Default)]
pub struct PdfiumRasterizer {
    config: EngineConfig,
}

impl PdfiumRasterizer {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Render settings that paint only the requested slice.
    fn slice_config(&self, job: &RasterJob) -> Result<PdfRenderConfig> {
        let geometry = &job.geometry;
        let config = PdfRenderConfig::new()
            .render_annotations(self.config.render_annotations)
            .clear_before_rendering(true)
            .set_clear_color(PdfColor::WHITE);

        // pdfium paints form data only on untransformed renders
        if self.config.render_form_data && job.is_full_page() {
            return Ok(config
                .render_form_data(true)
                .set_target_size(geometry.width as Pixels, geometry.height as Pixels));
        }
        if self.config.render_form_data {
            log::debug!("form data is not painted into partial slices");
        }

        // translate in points, then scale into pixels
        let scale = job.scale();
        config
            .render_form_data(false)
            .scale_page_by_factor(scale as f32)
            .set_fixed_size(geometry.width as Pixels, geometry.height as Pixels)
            .translate(
                PdfPoints::new((-f64::from(geometry.offset_x) / scale) as f32),
                PdfPoints::new((-f64::from(geometry.offset_y) / scale) as f32),
            )
            .map_err(engine_error)
    }
}

impl Rasterizer for PdfiumRasterizer {
    fn render(&self, pdf: &mut Document, job: &RasterJob) -> Result<RgbImage> {
        if job.geometry.is_empty() {
            return Ok(RgbImage::new(job.geometry.width, job.geometry.height));
        }
        let config = self.slice_config(job)?;

        let bytes = engine::document_bytes(pdf)?;
        let pdfium = engine::bind(&self.config)?;
        let document = pdfium
            .load_pdf_from_byte_slice(&bytes, None)
            .map_err(engine_error)?;
        let page = document
            .pages()
            .get(engine::page_index(job.page_index)?)
            .map_err(engine_error)?;

        let bitmap = page.render_with_config(&config).map_err(engine_error)?;
        let slice = bitmap.as_image().into_rgb8();
        log::debug!(
            "rendered page {} slice {}x{} at offset {},{}",
            job.page_index,
            slice.width(),
            slice.height(),
            job.geometry.offset_x,
            job.geometry.offset_y
        );
        if slice.dimensions() != (job.geometry.width, job.geometry.height) {
            return Err(Error::Engine(format!(
                "pdfium rendered {}x{}, expected {}x{}",
                slice.width(),
                slice.height(),
                job.geometry.width,
                job.geometry.height
            )));
        }
        Ok(slice)
    }
}
