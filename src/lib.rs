// pdfpage - per-page PDF operations
//
// Renders relative page slices to PNG/JPEG/TIFF through pdfium, searches page
// text and adds highlight annotations, with argument checking suited to a
// dynamically typed host.

pub mod annotations;
pub mod commands;
pub mod config;
pub mod document;
pub mod error;
pub mod geometry;
pub mod options;
pub mod page;
pub mod pdf;
pub mod text;

pub use config::EngineConfig;
pub use document::Document;
pub use error::{Error, Result};
pub use geometry::{CropBox, PixelGeometry, RelRect, Slice, MAX_PIXELS};
pub use options::{Encoder, EncoderKind, RenderOptions, RenderRequest};
pub use page::{Page, PageInfo};
pub use pdf::{PdfiumRasterizer, PdfiumTextSource, RasterJob, Rasterizer, RenderOutput, TextSource};
pub use text::{Bounds, Glyph};
