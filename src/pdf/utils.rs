//! Small helpers over the lopdf object model.

use lopdf::{Document, Object, ObjectId};

use crate::geometry::CropBox;

/// Guard against cyclic `/Parent` chains.
const MAX_TREE_DEPTH: usize = 64;

/// US Letter, used when a page has neither CropBox nor MediaBox.
const DEFAULT_PAGE_BOX: (f64, f64, f64, f64) = (0.0, 0.0, 612.0, 792.0);

/// Follow one level of indirection.
pub fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> &'a Object {
    match obj {
        Object::Reference(id) => doc.get_object(*id).unwrap_or(obj),
        _ => obj,
    }
}

/// Extract a number from a PDF object.
pub fn number(obj: &Object) -> Option<f64> {
    match obj {
        Object::Integer(i) => Some(*i as f64),
        Object::Real(f) => Some(f64::from(*f)),
        _ => None,
    }
}

/// Look up `key` on the page, then up the page tree.
pub fn inherited<'a>(doc: &'a Document, page_id: ObjectId, key: &[u8]) -> Option<&'a Object> {
    let mut node = doc.get_dictionary(page_id).ok()?;
    for _ in 0..MAX_TREE_DEPTH {
        if let Ok(value) = node.get(key) {
            return Some(resolve(doc, value));
        }
        let parent = node.get(b"Parent").ok()?.as_reference().ok()?;
        node = doc.get_dictionary(parent).ok()?;
    }
    None
}

fn rectangle(doc: &Document, obj: &Object) -> Option<CropBox> {
    let Object::Array(values) = resolve(doc, obj) else {
        return None;
    };
    let values: Vec<f64> = values
        .iter()
        .filter_map(|o| number(resolve(doc, o)))
        .collect();
    match values.as_slice() {
        [x1, y1, x2, y2] => Some(CropBox::new(*x1, *y1, *x2, *y2)),
        _ => None,
    }
}

/// The visible page rectangle: CropBox, else MediaBox, else US Letter.
pub fn page_box(doc: &Document, page_id: ObjectId) -> CropBox {
    if let Some(crop) = inherited(doc, page_id, b"CropBox").and_then(|o| rectangle(doc, o)) {
        return crop;
    }
    if let Some(media) = inherited(doc, page_id, b"MediaBox").and_then(|o| rectangle(doc, o)) {
        log::debug!("page {:?} has no CropBox, using MediaBox {:?}", page_id, media);
        return media;
    }
    log::warn!("page {:?} has no CropBox or MediaBox, using US Letter", page_id);
    let (x1, y1, x2, y2) = DEFAULT_PAGE_BOX;
    CropBox::new(x1, y1, x2, y2)
}

/// Annotation object ids listed in a page's `/Annots`, direct or indirect array.
pub fn annot_ids(doc: &Document, page_id: ObjectId) -> Vec<ObjectId> {
    let Ok(page) = doc.get_dictionary(page_id) else {
        return Vec::new();
    };
    let Ok(annots) = page.get(b"Annots") else {
        return Vec::new();
    };
    match resolve(doc, annots) {
        Object::Array(refs) => refs
            .iter()
            .filter_map(|o| o.as_reference().ok())
            .collect(),
        _ => Vec::new(),
    }
}
