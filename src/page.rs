//! A single page of an open [`Document`](crate::Document).

use std::cell::{OnceCell, RefCell, RefMut};
use std::path::Path;
use std::rc::{Rc, Weak};

use lopdf::ObjectId;
use serde::Serialize;
use serde_json::Value;

use crate::annotations;
use crate::document::{DocumentContent, PageLink};
use crate::error::{Error, Result};
use crate::geometry::{CropBox, RelRect};
use crate::options::RenderRequest;
use crate::pdf::pipeline::{self, PageTarget, RenderOutput};
use crate::pdf::utils::annot_ids;
use crate::text::{self, TextLayout};

/// Read-only page facts, as exposed to callers.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    pub num: u32,
    pub width: f64,
    pub height: f64,
    pub crop_box: CropBox,
    pub num_annots: usize,
}

/// A page handle.
///
/// Holds a weak reference to the document content; every operation fails
/// with [`Error::StaleReference`] once the document is closed.
pub struct Page {
    num: u32,
    id: ObjectId,
    crop: CropBox,
    content: Weak<RefCell<DocumentContent>>,
    link: Rc<PageLink>,
    text: OnceCell<TextLayout>,
}

impl Page {
    pub(crate) fn new(
        num: u32,
        id: ObjectId,
        crop: CropBox,
        content: Weak<RefCell<DocumentContent>>,
        link: Rc<PageLink>,
    ) -> Self {
        Self {
            num,
            id,
            crop,
            content,
            link,
            text: OnceCell::new(),
        }
    }

    /// 1-based page number.
    pub fn num(&self) -> u32 {
        self.num
    }

    /// Width in points.
    pub fn width(&self) -> f64 {
        self.crop.width()
    }

    /// Height in points.
    pub fn height(&self) -> f64 {
        self.crop.height()
    }

    pub fn crop_box(&self) -> CropBox {
        self.crop
    }

    pub fn is_stale(&self) -> bool {
        self.link.is_closed() || self.content.strong_count() == 0
    }

    fn content(&self) -> Result<Rc<RefCell<DocumentContent>>> {
        if self.link.is_closed() {
            return Err(Error::StaleReference);
        }
        self.content.upgrade().ok_or(Error::StaleReference)
    }

    fn lock<'a>(content: &'a Rc<RefCell<DocumentContent>>) -> Result<RefMut<'a, DocumentContent>> {
        content
            .try_borrow_mut()
            .map_err(|_| Error::Engine("document is busy".to_string()))
    }

    fn target(&self) -> PageTarget {
        PageTarget {
            index: self.num - 1,
            width: self.width(),
            height: self.height(),
        }
    }

    pub fn num_annots(&self) -> Result<usize> {
        let content = self.content()?;
        let content = Self::lock(&content)?;
        Ok(annot_ids(&content.pdf, self.id).len())
    }

    pub fn info(&self) -> Result<PageInfo> {
        Ok(PageInfo {
            num: self.num,
            width: self.width(),
            height: self.height(),
            crop_box: self.crop,
            num_annots: self.num_annots()?,
        })
    }

    /// Render to a new file at `path`.
    pub fn render_to_file(&self, path: impl AsRef<Path>, request: &RenderRequest) -> Result<RenderOutput> {
        let path = path.as_ref();
        if path.as_os_str().is_empty() {
            return Err(Error::validation("'path' can't be empty"));
        }
        let content = self.content()?;
        let mut content = Self::lock(&content)?;
        let DocumentContent { pdf, rasterizer, .. } = &mut *content;
        pipeline::render_to_file(pdf, &**rasterizer, self.target(), request, path)
    }

    /// Render into memory.
    pub fn render_to_buffer(&self, request: &RenderRequest) -> Result<RenderOutput> {
        let content = self.content()?;
        let mut content = Self::lock(&content)?;
        let DocumentContent { pdf, rasterizer, .. } = &mut *content;
        pipeline::render_to_buffer(pdf, &**rasterizer, self.target(), request)
    }

    /// Every case-insensitive match of `query`, as bottom-origin relative rectangles.
    pub fn find_text(&self, query: &str) -> Result<Vec<RelRect>> {
        let content = self.content()?;
        let layout = match self.text.get() {
            Some(layout) => layout,
            None => {
                let glyphs = {
                    let mut content = Self::lock(&content)?;
                    let DocumentContent { pdf, text_source, .. } = &mut *content;
                    text_source.glyphs(pdf, self.num - 1, &self.crop)?
                };
                self.text.get_or_init(|| TextLayout::from_glyphs(glyphs))
            }
        };
        Ok(text::find_all(layout, query, self.width(), self.height()))
    }

    /// Add highlights from a rectangle value or an array of them.
    pub fn add_annot(&self, rects: &Value) -> Result<()> {
        // stale pages fail before argument errors
        self.content()?;
        let rects = annotations::parse_rects(rects)?;
        self.add_highlights(&rects).map(|_| ())
    }

    /// Add one highlight annotation covering every rectangle in `rects`.
    pub fn add_highlights(&self, rects: &[RelRect]) -> Result<ObjectId> {
        let content = self.content()?;
        let mut content = Self::lock(&content)?;
        annotations::add_highlight(&mut content.pdf, self.id, &self.crop, rects)
    }

    /// Remove every annotation from the page. Idempotent.
    pub fn delete_annots(&self) -> Result<()> {
        let content = self.content()?;
        let mut content = Self::lock(&content)?;
        annotations::delete_all(&mut content.pdf, self.id);
        Ok(())
    }
}

impl std::fmt::Debug for Page {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Page")
            .field("num", &self.num)
            .field("id", &self.id)
            .field("crop", &self.crop)
            .field("stale", &self.is_stale())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Document;
    use crate::pdf::extract::TextSource;
    use crate::pdf::renderer::{RasterJob, Rasterizer};
    use crate::text::{Bounds, Glyph};
    use image::RgbImage;
    use std::cell::Cell;
    use lopdf::{dictionary, Object, Stream};
    use serde_json::json;

    struct Blank;

    impl Rasterizer for Blank {
        fn render(&self, _pdf: &mut lopdf::Document, job: &RasterJob) -> Result<RgbImage> {
            Ok(RgbImage::new(job.geometry.width, job.geometry.height))
        }
    }

    /// "Hello" at (72, 700), counting how often the page text is read.
    #[derive(Default)]
    struct Hello {
        reads: Rc<Cell<usize>>,
    }

    impl TextSource for Hello {
        fn glyphs(&self, _pdf: &mut lopdf::Document, _page_index: u32, crop: &CropBox) -> Result<Vec<Glyph>> {
            self.reads.set(self.reads.get() + 1);
            Ok("Hello"
                .chars()
                .enumerate()
                .map(|(i, ch)| {
                    let left = 72.0 + 12.0 * i as f64;
                    Glyph {
                        ch,
                        bounds: Bounds::from_page_rect(crop, left, 695.2, left + 12.0, 719.2),
                    }
                })
                .collect())
        }
    }

    fn single_page(content: &str) -> lopdf::Document {
        let mut doc = lopdf::Document::with_version("1.5");
        let font_id = doc.add_object(dictionary! {
            "Type" => "Font",
            "Subtype" => "Type1",
            "BaseFont" => "Helvetica",
        });
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.as_bytes().to_vec()));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "MediaBox" => vec![Object::Integer(0), Object::Integer(0), Object::Integer(612), Object::Integer(792)],
            "Contents" => Object::Reference(content_id),
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => Object::Reference(font_id) },
            },
        });
        let pages_id = doc.add_object(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![Object::Reference(page_id)],
            "Count" => Object::Integer(1),
        });
        if let Ok(page) = doc.get_object_mut(page_id).and_then(Object::as_dict_mut) {
            page.set("Parent", Object::Reference(pages_id));
        }
        let catalog_id = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => Object::Reference(pages_id),
        });
        doc.trailer.set("Root", Object::Reference(catalog_id));
        doc
    }

    #[test]
    fn info_reports_properties() {
        let doc = Document::from_lopdf(single_page("BT ET"), Blank);
        let page = doc.page(1).unwrap();
        let info = page.info().unwrap();
        assert_eq!(info.num, 1);
        assert_eq!(info.num_annots, 0);

        let json = serde_json::to_value(info).unwrap();
        assert_eq!(json["cropBox"]["x2"], 612.0);
        assert_eq!(json["numAnnots"], 0);
    }

    #[test]
    fn layout_is_cached() {
        let source = Hello::default();
        let reads = Rc::clone(&source.reads);
        let doc = Document::from_lopdf(single_page("BT /F1 24 Tf 72 700 Td (Hello) Tj ET"), Blank)
            .with_text_source(source);
        let page = doc.page(1).unwrap();
        assert_eq!(page.find_text("hello").unwrap().len(), 1);
        assert!(page.text.get().is_some());
        assert_eq!(reads.get(), 1);
        assert_eq!(page.find_text("HELLO").unwrap().len(), 1);
        assert!(page.find_text("bye").unwrap().is_empty());
        assert_eq!(reads.get(), 1);
    }

    #[test]
    fn annotate_then_clear() {
        let doc = Document::from_lopdf(single_page("BT ET"), Blank);
        let page = doc.page(1).unwrap();
        page.add_annot(&json!([
            {"x1": 0.1, "y1": 0.1, "x2": 0.2, "y2": 0.2},
            {"x1": 0.3, "y1": 0.3, "x2": 0.4, "y2": 0.4}
        ]))
        .unwrap();
        // one markup annotation per call
        assert_eq!(page.num_annots().unwrap(), 1);
        page.add_annot(&json!({"x1": 0.5, "y1": 0.5, "x2": 0.6, "y2": 0.6}))
            .unwrap();
        assert_eq!(page.num_annots().unwrap(), 2);

        // a bad batch adds nothing
        assert!(page
            .add_annot(&json!([{"x1": 0.1, "y1": 0.1, "x2": 0.2, "y2": 0.2}, {"x1": 0.1}]))
            .is_err());
        assert_eq!(page.num_annots().unwrap(), 2);

        page.delete_annots().unwrap();
        page.delete_annots().unwrap();
        assert_eq!(page.num_annots().unwrap(), 0);
    }

    #[test]
    fn empty_path_is_rejected() {
        let doc = Document::from_lopdf(single_page("BT ET"), Blank);
        let page = doc.page(1).unwrap();
        let request = RenderRequest::new(crate::options::Encoder::Png, 72.0, None).unwrap();
        let err = page.render_to_file("", &request).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }
}
