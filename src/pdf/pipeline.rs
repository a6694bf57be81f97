//! Render a validated request: geometry, rasterize, encode.

use std::fs::{self, File};
use std::io::{BufWriter, Cursor, Seek, Write};
use std::path::{Path, PathBuf};

use base64::{engine::general_purpose::STANDARD, Engine as _};
use lopdf::Document;
use serde::{Serialize, Serializer};

use crate::error::{Error, Result};
use crate::geometry::PixelGeometry;
use crate::options::{EncoderKind, RenderRequest};
use crate::pdf::encoder;
use crate::pdf::renderer::{RasterJob, Rasterizer};

/// Where a finished render ended up.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum RenderOutput {
    File {
        path: PathBuf,
    },
    Buffer {
        encoder: EncoderKind,
        #[serde(serialize_with = "as_base64")]
        data: Vec<u8>,
    },
}

fn as_base64<S: Serializer>(data: &[u8], serializer: S) -> std::result::Result<S::Ok, S::Error> {
    serializer.serialize_str(&STANDARD.encode(data))
}

/// Page facts the pipeline needs.
#[derive(Debug, Clone, Copy)]
pub struct PageTarget {
    pub index: u32,
    pub width: f64,
    pub height: f64,
}

/// Pixel geometry of `request` on `page`, refusing slices above the pixel ceiling.
pub fn geometry(page: PageTarget, request: &RenderRequest) -> Result<PixelGeometry> {
    PixelGeometry::compute(page.width, page.height, request.ppi, &request.options.slice)
}

/// Rasterize `geometry` of `page` and encode it into `out`.
pub fn render_to_writer<W: Write + Seek>(
    pdf: &mut Document,
    rasterizer: &dyn Rasterizer,
    page: PageTarget,
    request: &RenderRequest,
    geometry: PixelGeometry,
    out: W,
) -> Result<()> {
    let job = RasterJob {
        page_index: page.index,
        page_width: page.width,
        page_height: page.height,
        ppi: request.ppi,
        geometry,
    };

    let image = rasterizer.render(pdf, &job)?;
    if image.dimensions() != (geometry.width, geometry.height) {
        return Err(Error::Engine(format!(
            "rasterizer returned {}x{}, expected {}x{}",
            image.width(),
            image.height(),
            geometry.width,
            geometry.height
        )));
    }

    encoder::encode(&image, &request.options.encoder, request.ppi, out)
}

/// Render into a new file at `path`. The file is removed again if rendering fails.
pub fn render_to_file(
    pdf: &mut Document,
    rasterizer: &dyn Rasterizer,
    page: PageTarget,
    request: &RenderRequest,
    path: &Path,
) -> Result<RenderOutput> {
    // size check first, so an oversized request never creates the file
    let geometry = geometry(page, request)?;

    let file = File::create(path).map_err(|e| {
        log::warn!("can't create {:?}: {}", path, e);
        Error::Open("Can't open output file".to_string())
    })?;

    let mut writer = BufWriter::new(file);
    let rendered = render_to_writer(pdf, rasterizer, page, request, geometry, &mut writer).and_then(|()| {
        writer
            .flush()
            .map_err(|e| Error::encode(crate::error::codes::OPEN_FILE, e.to_string()))
    });
    drop(writer);

    match rendered {
        Ok(()) => {
            log::info!(
                "page {} written to {:?} ({}x{} {})",
                page.index + 1,
                path,
                geometry.width,
                geometry.height,
                request.encoder_kind().as_str()
            );
            Ok(RenderOutput::File {
                path: path.to_path_buf(),
            })
        }
        Err(err) => {
            if let Err(e) = fs::remove_file(path) {
                log::warn!("failed to remove partial output {:?}: {}", path, e);
            }
            Err(err)
        }
    }
}

/// Render into an in-memory buffer.
pub fn render_to_buffer(
    pdf: &mut Document,
    rasterizer: &dyn Rasterizer,
    page: PageTarget,
    request: &RenderRequest,
) -> Result<RenderOutput> {
    let geometry = geometry(page, request)?;
    let mut out = Cursor::new(Vec::new());
    render_to_writer(pdf, rasterizer, page, request, geometry, &mut out)?;
    let data = out.into_inner();
    log::debug!("page {} rendered to {} byte buffer", page.index + 1, data.len());
    Ok(RenderOutput::Buffer {
        encoder: request.encoder_kind(),
        data,
    })
}
