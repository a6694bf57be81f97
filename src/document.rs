//! Document ownership and the page handles it hands out.

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::path::Path;
use std::rc::{Rc, Weak};

use lopdf::ObjectId;

use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::page::Page;
use crate::pdf::extract::{PdfiumTextSource, TextSource};
use crate::pdf::renderer::{PdfiumRasterizer, Rasterizer};
use crate::pdf::utils::page_box;

/// What a document owns and pages borrow.
pub(crate) struct DocumentContent {
    pub(crate) pdf: lopdf::Document,
    pub(crate) rasterizer: Box<dyn Rasterizer>,
    pub(crate) text_source: Box<dyn TextSource>,
}

/// Shared between a page and its document; flipped when the document closes.
#[derive(Debug, Default)]
pub(crate) struct PageLink {
    closed: Cell<bool>,
}

impl PageLink {
    pub(crate) fn is_closed(&self) -> bool {
        self.closed.get()
    }
}

/// A parsed PDF document.
///
/// Pages hold only weak references to the content, so closing the document
/// invalidates every page handed out before.
pub struct Document {
    content: Option<Rc<RefCell<DocumentContent>>>,
    page_ids: BTreeMap<u32, ObjectId>,
    pages: RefCell<Vec<Weak<PageLink>>>,
}

impl Document {
    /// Parse the file at `path`, rasterizing with pdfium.
    pub fn load(path: impl AsRef<Path>, config: EngineConfig) -> Result<Self> {
        let path = path.as_ref();
        let pdf = lopdf::Document::load(path).map_err(|e| {
            log::warn!("failed to parse {:?}: {}", path, e);
            Error::Open(format!("Can't open document: {e}"))
        })?;
        log::info!("opened {:?}", path);
        Ok(Self::with_pdfium(pdf, config))
    }

    /// Parse an in-memory document, rasterizing with pdfium.
    pub fn load_mem(bytes: &[u8], config: EngineConfig) -> Result<Self> {
        let pdf = lopdf::Document::load_mem(bytes)
            .map_err(|e| Error::Open(format!("Can't open document: {e}")))?;
        Ok(Self::with_pdfium(pdf, config))
    }

    fn with_pdfium(pdf: lopdf::Document, config: EngineConfig) -> Self {
        Self::from_lopdf(pdf, PdfiumRasterizer::new(config.clone()))
            .with_text_source(PdfiumTextSource::new(config))
    }

    /// Wrap an already parsed document with any rasterizer. Text comes from
    /// pdfium with the default engine settings until [`Self::with_text_source`].
    pub fn from_lopdf(pdf: lopdf::Document, rasterizer: impl Rasterizer + 'static) -> Self {
        let page_ids = pdf.get_pages();
        log::debug!("document has {} page(s)", page_ids.len());
        Self {
            content: Some(Rc::new(RefCell::new(DocumentContent {
                pdf,
                rasterizer: Box::new(rasterizer),
                text_source: Box::new(PdfiumTextSource::default()),
            }))),
            page_ids,
            pages: RefCell::new(Vec::new()),
        }
    }

    /// Replace where page text comes from. Pages already opened keep any text they cached.
    pub fn with_text_source(self, source: impl TextSource + 'static) -> Self {
        if let Some(content) = &self.content {
            content.borrow_mut().text_source = Box::new(source);
        }
        self
    }

    pub fn page_count(&self) -> u32 {
        self.page_ids.len() as u32
    }

    pub fn is_closed(&self) -> bool {
        self.content.is_none()
    }

    /// Open page `num`, counting from 1.
    pub fn page(&self, num: u32) -> Result<Page> {
        let content = self.content.as_ref().ok_or(Error::StaleReference)?;
        if num == 0 || num > self.page_count() {
            return Err(Error::bounds("Page number out of bounds."));
        }
        let id = *self
            .page_ids
            .get(&num)
            .ok_or_else(|| Error::bounds("Page number out of bounds."))?;

        let crop = {
            let content = content.borrow();
            content
                .pdf
                .get_dictionary(id)
                .map_err(|e| Error::Open(format!("Can't read page {num}: {e}")))?;
            page_box(&content.pdf, id)
        };

        let link = Rc::new(PageLink::default());
        let mut pages = self.pages.borrow_mut();
        pages.retain(|page| page.strong_count() > 0);
        pages.push(Rc::downgrade(&link));
        log::debug!("page {} opened, {} open", num, pages.len());

        Ok(Page::new(num, id, crop, Rc::downgrade(content), link))
    }

    /// Pages handed out and not yet dropped.
    pub fn open_page_count(&self) -> usize {
        self.pages
            .borrow()
            .iter()
            .filter(|page| page.strong_count() > 0)
            .count()
    }

    /// Invalidate every open page and release the content. Closing twice is a no-op.
    pub fn close(&mut self) {
        let Some(content) = self.content.take() else {
            return;
        };
        let pages = self.pages.get_mut();
        let mut notified = 0;
        for link in pages.drain(..).filter_map(|page| page.upgrade()) {
            link.closed.set(true);
            notified += 1;
        }
        self.page_ids.clear();
        drop(content);
        log::debug!("document closed, {} open page(s) invalidated", notified);
    }
}

impl Drop for Document {
    fn drop(&mut self) {
        self.close();
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("pages", &self.page_count())
            .field("closed", &self.is_closed())
            .finish()
    }
}
