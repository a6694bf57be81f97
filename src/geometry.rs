//! Relative page coordinates and their conversion to raster pixels.
//!
//! Relative coordinates are fractions of the page width/height with the
//! vertical origin at the bottom of the page. Raster space has its origin
//! at the top-left corner, so every conversion flips the vertical axis once.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// PDF user space units per inch.
pub const POINTS_PER_INCH: f64 = 72.0;

/// Largest slice, in pixels, a single render may produce.
pub const MAX_PIXELS: u64 = 100_000_000;

/// A relative sub-rectangle of the page selected for rendering.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Slice {
    /// Left edge, fraction of page width.
    pub x: f64,
    /// Bottom edge, fraction of page height.
    pub y: f64,
    pub w: f64,
    pub h: f64,
}

impl Slice {
    pub const FULL: Slice = Slice {
        x: 0.0,
        y: 0.0,
        w: 1.0,
        h: 1.0,
    };

    /// Shrink `w`/`h` so the slice ends at the page edge.
    pub fn clamped(self) -> Slice {
        let mut slice = self;
        if slice.y + slice.h > 1.0 {
            slice.h = 1.0 - slice.y;
        }
        if slice.x + slice.w > 1.0 {
            slice.w = 1.0 - slice.x;
        }
        if slice != self {
            log::warn!("slice {:?} extends past the page edge, clamped to {:?}", self, slice);
        }
        slice
    }
}

impl Default for Slice {
    fn default() -> Self {
        Slice::FULL
    }
}

/// Absolute slice geometry in device pixels, top-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PixelGeometry {
    pub offset_x: u32,
    pub offset_y: u32,
    pub width: u32,
    pub height: u32,
}

impl PixelGeometry {
    /// Convert a slice of a `page_width` x `page_height` point page rendered at `ppi`.
    ///
    /// Fails with [`Error::ResourceLimit`] when the slice would exceed [`MAX_PIXELS`].
    pub fn compute(page_width: f64, page_height: f64, ppi: f64, slice: &Slice) -> Result<Self> {
        let slice = slice.clamped();
        let (scaled_width, scaled_height) = scaled_page_size(page_width, page_height, ppi);

        let width = (scaled_width * slice.w).floor();
        let height = (scaled_height * slice.h).floor();
        let offset_x = (scaled_width * slice.x).floor();
        // relative y counts from the page bottom, raster rows from the top
        let offset_y = (scaled_height - scaled_height * slice.y - height).floor();

        let (width, height) = (to_pixels(width), to_pixels(height));
        let pixels = width.saturating_mul(height);
        if pixels > MAX_PIXELS || width > u64::from(u32::MAX) || height > u64::from(u32::MAX) {
            return Err(Error::ResourceLimit {
                pixels: pixels.max(width).max(height),
                limit: MAX_PIXELS,
            });
        }

        let geometry = PixelGeometry {
            offset_x: clamp_u32(to_pixels(offset_x)),
            offset_y: clamp_u32(to_pixels(offset_y)),
            width: width as u32,
            height: height as u32,
        };
        log::debug!(
            "page {}x{}pt at {} ppi, slice {:?} -> {:?}",
            page_width,
            page_height,
            ppi,
            slice,
            geometry
        );
        Ok(geometry)
    }

    pub fn pixel_count(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Page size in pixels at `ppi`, before flooring.
pub fn scaled_page_size(page_width: f64, page_height: f64, ppi: f64) -> (f64, f64) {
    let scale = ppi / POINTS_PER_INCH;
    (page_width * scale, page_height * scale)
}

fn to_pixels(value: f64) -> u64 {
    // saturating: negatives and NaN become 0
    value as u64
}

fn clamp_u32(value: u64) -> u32 {
    value.min(u64::from(u32::MAX)) as u32
}

/// A relative rectangle, bottom-left origin.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RelRect {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

/// A page box in PDF user space, normalised so `x1 <= x2` and `y1 <= y2`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CropBox {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl CropBox {
    pub fn new(x1: f64, y1: f64, x2: f64, y2: f64) -> Self {
        Self {
            x1: x1.min(x2),
            y1: y1.min(y2),
            x2: x1.max(x2),
            y2: y1.max(y2),
        }
    }

    pub fn width(&self) -> f64 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f64 {
        self.y2 - self.y1
    }
}
