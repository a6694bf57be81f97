//! Text search over a page, reported in relative page coordinates.

mod layout;

pub use layout::{Bounds, Glyph, SearchCursor, SearchPolicy, TextHit, TextLayout};

use crate::geometry::RelRect;

/// Case-insensitive substring search, words may match partially.
pub const DEFAULT_POLICY: SearchPolicy = SearchPolicy {
    case_sensitive: false,
    whole_word: false,
};

/// Encode `query` as zero-terminated UCS-4 code units.
pub fn ucs4(query: &str) -> Vec<u32> {
    query.chars().map(u32::from).chain(std::iter::once(0)).collect()
}

/// Every match of `query` on a `width` x `height` page, in reading order.
///
/// Each rectangle is relative to the page size with the vertical origin at
/// the bottom, the orientation accepted by annotation input.
pub fn find_all(layout: &TextLayout, query: &str, width: f64, height: f64) -> Vec<RelRect> {
    let encoded = ucs4(query);
    // the terminator is not part of the searched text
    let units = &encoded[..encoded.len() - 1];

    let mut matches = Vec::new();
    let mut cursor = SearchCursor::default();
    while let Some(hit) = layout.find_next(units, cursor, DEFAULT_POLICY) {
        matches.push(relative(&hit.bounds, width, height));
        cursor = hit.next;
    }
    log::debug!("found {} matches for {:?}", matches.len(), query);
    matches
}

fn relative(bounds: &Bounds, width: f64, height: f64) -> RelRect {
    RelRect {
        x1: bounds.x_min / width,
        y1: (height - bounds.y_max) / height,
        x2: bounds.x_max / width,
        y2: (height - bounds.y_min) / height,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ucs4_is_terminated() {
        assert_eq!(ucs4("Aé"), vec![0x41, 0xE9, 0]);
        assert_eq!(ucs4(""), vec![0]);
    }

    #[test]
    fn empty_query_finds_nothing() {
        let layout = TextLayout::default();
        assert!(find_all(&layout, "", 612.0, 792.0).is_empty());
    }

    #[test]
    fn flips_to_bottom_origin() {
        let bounds = Bounds {
            x_min: 61.2,
            y_min: 79.2,
            x_max: 122.4,
            y_max: 158.4,
        };
        let r = relative(&bounds, 612.0, 792.0);
        assert!((r.x1 - 0.1).abs() < 1e-9);
        assert!((r.x2 - 0.2).abs() < 1e-9);
        assert!((r.y1 - 0.8).abs() < 1e-9);
        assert!((r.y2 - 0.9).abs() < 1e-9);
        assert!(r.y1 < r.y2);
    }
}
