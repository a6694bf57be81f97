//! PDF engine work: rasterization, text extraction, output encoders and the render pipeline.

pub mod encoder;
pub mod engine;
pub mod extract;
pub mod pipeline;
pub mod renderer;
pub mod utils;

pub use extract::{PdfiumTextSource, TextSource};
pub use pipeline::{PageTarget, RenderOutput};
pub use renderer::{PdfiumRasterizer, RasterJob, Rasterizer};
