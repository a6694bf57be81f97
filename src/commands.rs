//! Entry points for a dynamic host runtime.
//!
//! Every command takes the caller's argument list as JSON values, checks
//! arity and types the way a host binding would, runs the page operation and
//! returns a JSON descriptor. Errors serialize to their message.

use serde_json::{json, Value};

use crate::document::Document;
use crate::error::{Error, Result};
use crate::options::RenderRequest;
use crate::page::Page;

/// `(page: Uint32)`, 1-based.
pub fn open_page(doc: &Document, args: &[Value]) -> Result<Page> {
    let [num] = args else {
        return Err(Error::validation("One argument required: (page: Uint32)."));
    };
    let num = num
        .as_u64()
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| Error::validation("'page' must be an instance of Uint32."))?;
    doc.page(num)
}

/// `(path: String, encoder: String, PPI: Number[, options: Object])`
pub fn render_to_file(page: &Page, args: &[Value]) -> Result<Value> {
    if page.is_stale() {
        return Err(Error::StaleReference);
    }
    if args.len() < 3 {
        return Err(Error::validation(
            "Arguments: (path: String, method: String, PPI: Number[, options: Object])",
        ));
    }
    let path = match &args[0] {
        Value::String(path) if path.is_empty() => {
            return Err(Error::validation("'path' can't be empty"))
        }
        Value::String(path) => path,
        _ => return Err(Error::validation("'path' must be an instance of string")),
    };
    let request = RenderRequest::parse(&args[1], &args[2], args.get(3))?;
    let output = page.render_to_file(path, &request)?;
    to_json(&output)
}

/// `(encoder: String, PPI: Number[, options: Object])`
pub fn render_to_buffer(page: &Page, args: &[Value]) -> Result<Value> {
    if page.is_stale() {
        return Err(Error::StaleReference);
    }
    if args.len() < 2 {
        return Err(Error::validation(
            "Arguments: (method: String, PPI: Number[, options: Object])",
        ));
    }
    let request = RenderRequest::parse(&args[0], &args[1], args.get(2))?;
    let output = page.render_to_buffer(&request)?;
    to_json(&output)
}

/// `(str: String)`, returns an array of relative rectangles.
pub fn find_text(page: &Page, args: &[Value]) -> Result<Value> {
    if page.is_stale() {
        return Err(Error::StaleReference);
    }
    let [Value::String(query)] = args else {
        return Err(Error::validation("One argument required: (str: String)"));
    };
    let matches = page.find_text(query)?;
    to_json(&matches)
}

/// `(annot: Object | Array)`
pub fn add_annot(page: &Page, args: &[Value]) -> Result<Value> {
    if page.is_stale() {
        return Err(Error::StaleReference);
    }
    let Some(rects) = args.first() else {
        return Err(Error::validation(
            "One argument required: (annot: Object | Array).",
        ));
    };
    page.add_annot(rects)?;
    Ok(Value::Null)
}

pub fn delete_annots(page: &Page) -> Result<Value> {
    page.delete_annots()?;
    Ok(Value::Null)
}

/// Read one of `num`, `width`, `height`, `cropBox`, `numAnnots`.
pub fn page_property(page: &Page, name: &str) -> Result<Value> {
    match name {
        "num" => Ok(json!(page.num())),
        "width" => Ok(json!(page.width())),
        "height" => Ok(json!(page.height())),
        "cropBox" | "crop_box" => to_json(&page.crop_box()),
        "numAnnots" | "num_annots" => Ok(json!(page.num_annots()?)),
        other => Err(Error::validation(format!("Unknown page property '{other}'"))),
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value> {
    serde_json::to_value(value).map_err(|e| Error::Engine(format!("can't serialize result: {e}")))
}
