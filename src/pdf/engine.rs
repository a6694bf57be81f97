//! Binding pdfium and loading the working document into it.
//!
//! `Pdfium` handles are not Send+Sync and borrow the loaded library, so every
//! pdfium-backed operation binds for the duration of one call.

use std::sync::atomic::{AtomicBool, Ordering};

use lopdf::Document;
use pdfium_render::prelude::*;

use crate::config::EngineConfig;
use crate::error::{Error, Result};

/// Prefix of the error returned when no pdfium library can be bound.
pub const UNBOUND: &str = "could not load the pdfium library";

static LOGGED_SUCCESS: AtomicBool = AtomicBool::new(false);

fn loaded(bindings: Box<dyn PdfiumLibraryBindings>, from: &str) -> Pdfium {
    if !LOGGED_SUCCESS.swap(true, Ordering::Relaxed) {
        log::info!("loaded pdfium from {}", from);
    }
    Pdfium::new(bindings)
}

/// Bind to pdfium: the configured library first, then the search dirs, then the system library.
pub(crate) fn bind(config: &EngineConfig) -> Result<Pdfium> {
    if let Some(path) = &config.pdfium_library_path {
        match Pdfium::bind_to_library(path) {
            Ok(bindings) => return Ok(loaded(bindings, &path.display().to_string())),
            Err(e) => log::warn!("failed to load pdfium from {:?}: {:?}", path, e),
        }
    }

    for dir in &config.pdfium_search_dirs {
        let candidate = Pdfium::pdfium_platform_library_name_at_path(dir);
        if !candidate.exists() {
            continue;
        }
        match Pdfium::bind_to_library(&candidate) {
            Ok(bindings) => return Ok(loaded(bindings, &candidate.display().to_string())),
            Err(e) => log::warn!("failed to load pdfium from {:?}: {:?}", candidate, e),
        }
    }

    Pdfium::bind_to_system_library()
        .map(|bindings| loaded(bindings, "the system library path"))
        .map_err(|e| Error::Engine(format!("{UNBOUND}: {e:?}")))
}

/// Serialize the working copy, annotations included, for pdfium to load.
pub(crate) fn document_bytes(pdf: &mut Document) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    pdf.save_to(&mut bytes)
        .map_err(|e| Error::Engine(format!("failed to serialize document: {e}")))?;
    Ok(bytes)
}

pub(crate) fn page_index(index: u32) -> Result<u16> {
    u16::try_from(index).map_err(|_| Error::bounds("Page number out of bounds."))
}

pub(crate) fn engine_error(e: PdfiumError) -> Error {
    Error::Engine(e.to_string())
}
