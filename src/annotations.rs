//! Highlight annotations built from relative rectangles.
//!
//! Annotations are real PDF objects on the page, so they show up in the
//! rendered output and in any reader the document is handed to.

use std::collections::HashSet;

use lopdf::{Dictionary, Document, Object, ObjectId, StringFormat};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::geometry::{CropBox, RelRect};
use crate::pdf::utils::{annot_ids, resolve};

/// Highlight color, RGB in 0-1.
const HIGHLIGHT_COLOR: [f32; 3] = [0.0, 1.0, 0.0];
const HIGHLIGHT_OPACITY: f32 = 0.5;
/// Print flag.
const ANNOT_FLAGS: i64 = 4;

/// Four absolute corner points of one highlighted rectangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Quad {
    pub points: [(f64, f64); 4],
}

impl Quad {
    /// Corners of `rect` on a `width` x `height` page.
    pub fn from_relative(rect: &RelRect, width: f64, height: f64) -> Self {
        let left = width * rect.x1;
        let right = width * rect.x2;
        let bottom = height * rect.y1;
        let top = height * rect.y2;
        Quad {
            points: [(left, top), (left, bottom), (right, top), (right, bottom)],
        }
    }

    /// Bounding box as `[x_min, y_min, x_max, y_max]`.
    pub fn bounds(&self) -> [f64; 4] {
        self.points.iter().fold(
            [f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY],
            |[x0, y0, x1, y1], &(x, y)| [x0.min(x), y0.min(y), x1.max(x), y1.max(y)],
        )
    }

    fn translated(&self, dx: f64, dy: f64) -> Quad {
        Quad {
            points: self.points.map(|(x, y)| (x + dx, y + dy)),
        }
    }
}

/// Parse a rectangle object or a non-empty array of them.
///
/// Every rectangle is checked before any is returned.
pub fn parse_rects(value: &Value) -> Result<Vec<RelRect>> {
    match value {
        Value::Array(items) if !items.is_empty() => items.iter().map(parse_rect).collect(),
        Value::Array(_) => Err(Error::validation(
            "Invalid rectangle definition for annotation quadrilateral",
        )),
        other => Ok(vec![parse_rect(other)?]),
    }
}

fn parse_rect(value: &Value) -> Result<RelRect> {
    let Value::Object(map) = value else {
        return Err(Error::validation(
            "Invalid rectangle definition for annotation quadrilateral",
        ));
    };
    Ok(RelRect {
        x1: corner(map, "x1")?,
        y1: corner(map, "y1")?,
        x2: corner(map, "x2")?,
        y2: corner(map, "y2")?,
    })
}

fn corner(map: &Map<String, Value>, key: &str) -> Result<f64> {
    match map.get(key) {
        None => Err(Error::validation(
            "Invalid rectangle definition for annotation quadrilateral",
        )),
        Some(value) => value
            .as_f64()
            .ok_or_else(|| Error::validation("Wrong values for rectangle corners definition")),
    }
}

fn pdf_date() -> Object {
    let now = chrono::Utc::now();
    let stamp = format!("D:{}", now.format("%Y%m%d%H%M%S+00'00'"));
    Object::String(stamp.into_bytes(), StringFormat::Literal)
}

fn reals(values: impl IntoIterator<Item = f64>) -> Object {
    Object::Array(values.into_iter().map(|v| Object::Real(v as f32)).collect())
}

/// Union of the quads' bounding boxes.
fn enclosing(quads: &[Quad]) -> [f64; 4] {
    quads.iter().map(Quad::bounds).fold(
        [f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY],
        |[x0, y0, x1, y1], [a0, b0, a1, b1]| [x0.min(a0), y0.min(b0), x1.max(a1), y1.max(b1)],
    )
}

fn highlight_dictionary(quads: &[Quad], page_id: ObjectId, date: &Object) -> Dictionary {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"Annot".to_vec()));
    dict.set("Subtype", Object::Name(b"Highlight".to_vec()));
    dict.set("P", Object::Reference(page_id));
    dict.set("Rect", reals(enclosing(quads)));
    dict.set(
        "QuadPoints",
        reals(quads.iter().flat_map(|q| q.points).flat_map(|(x, y)| [x, y])),
    );
    dict.set(
        "C",
        Object::Array(HIGHLIGHT_COLOR.iter().map(|&c| Object::Real(c)).collect()),
    );
    dict.set("CA", Object::Real(HIGHLIGHT_OPACITY));
    dict.set("F", Object::Integer(ANNOT_FLAGS));
    dict.set("CreationDate", date.clone());
    dict.set("M", date.clone());
    dict
}

/// Add one highlight covering every rectangle and return its object id.
///
/// Rectangles are relative to `crop`, and quads are written in page user space.
pub fn add_highlight(
    doc: &mut Document,
    page_id: ObjectId,
    crop: &CropBox,
    rects: &[RelRect],
) -> Result<ObjectId> {
    if rects.is_empty() {
        return Err(Error::validation(
            "Invalid rectangle definition for annotation quadrilateral",
        ));
    }
    // resolve the page before allocating anything
    doc.get_dictionary(page_id)
        .map_err(|e| Error::Open(format!("page object unavailable: {e}")))?;

    let quads: Vec<Quad> = rects
        .iter()
        .map(|rect| Quad::from_relative(rect, crop.width(), crop.height()).translated(crop.x1, crop.y1))
        .collect();
    let id = doc.add_object(highlight_dictionary(&quads, page_id, &pdf_date()));

    match page_annots_array(doc, page_id) {
        Some(array_id) => {
            if let Ok(Object::Array(existing)) = doc.get_object_mut(array_id) {
                existing.push(Object::Reference(id));
            }
        }
        None => {
            let mut existing = match doc.get_dictionary(page_id).ok().and_then(|p| p.get(b"Annots").ok()) {
                Some(Object::Array(items)) => items.clone(),
                _ => Vec::new(),
            };
            existing.push(Object::Reference(id));
            let page = doc
                .get_object_mut(page_id)
                .and_then(Object::as_dict_mut)
                .map_err(|e| Error::Open(format!("page object unavailable: {e}")))?;
            page.set("Annots", Object::Array(existing));
        }
    }

    log::info!(
        "added highlight {:?} with {} quad(s) to page {:?}",
        id,
        quads.len(),
        page_id
    );
    Ok(id)
}

/// The object id of an indirect `/Annots` array, if the page uses one.
fn page_annots_array(doc: &Document, page_id: ObjectId) -> Option<ObjectId> {
    let page = doc.get_dictionary(page_id).ok()?;
    let id = page.get(b"Annots").ok()?.as_reference().ok()?;
    matches!(resolve(doc, &Object::Reference(id)), Object::Array(_)).then_some(id)
}

/// Remove every annotation from the page. Returns how many were removed.
///
/// Annotation objects still referenced elsewhere in the document, such as
/// form field widgets listed in `/AcroForm`, are unlinked from the page but kept.
pub fn delete_all(doc: &mut Document, page_id: ObjectId) -> usize {
    let ids = annot_ids(doc, page_id);
    let array_id = page_annots_array(doc, page_id);
    if let Ok(page) = doc.get_object_mut(page_id).and_then(Object::as_dict_mut) {
        page.remove(b"Annots");
    }
    if ids.is_empty() && array_id.is_none() {
        return 0;
    }

    let reachable: HashSet<ObjectId> = doc.traverse_objects(|_| {}).into_iter().collect();
    let mut dropped = 0;
    for id in ids.iter().copied().chain(array_id) {
        if !reachable.contains(&id) && doc.objects.remove(&id).is_some() {
            dropped += 1;
        }
    }
    log::debug!(
        "removed {} annotation(s) from page {:?}, {} object(s) dropped",
        ids.len(),
        page_id,
        dropped
    );
    ids.len()
}
