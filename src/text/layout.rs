//! Lines of positioned characters and forward search over them.
//!
//! Glyph boxes are kept in top-left-origin page space (points, relative to
//! the crop box), the same orientation a raster of the page has.

use crate::geometry::CropBox;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub x_min: f64,
    pub y_min: f64,
    pub x_max: f64,
    pub y_max: f64,
}

impl Bounds {
    /// Convert a PDF user-space rectangle (bottom-left origin) on a page cropped to `crop`.
    pub fn from_page_rect(crop: &CropBox, left: f64, bottom: f64, right: f64, top: f64) -> Bounds {
        Bounds {
            x_min: left.min(right) - crop.x1,
            y_min: crop.y2 - top.max(bottom),
            x_max: left.max(right) - crop.x1,
            y_max: crop.y2 - top.min(bottom),
        }
    }

    fn union(&self, other: &Bounds) -> Bounds {
        Bounds {
            x_min: self.x_min.min(other.x_min),
            y_min: self.y_min.min(other.y_min),
            x_max: self.x_max.max(other.x_max),
            y_max: self.y_max.max(other.y_max),
        }
    }

    fn height(&self) -> f64 {
        self.y_max - self.y_min
    }

    /// Vertical centres closer than half the taller box.
    fn shares_row(&self, other: &Bounds) -> bool {
        let centre = |b: &Bounds| (b.y_min + b.y_max) / 2.0;
        (centre(self) - centre(other)).abs() <= self.height().max(other.height()) / 2.0
    }
}

/// One character and its box.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Glyph {
    pub ch: char,
    pub bounds: Bounds,
}

/// Matching policy for [`TextLayout::find_next`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchPolicy {
    pub case_sensitive: bool,
    pub whole_word: bool,
}

/// Where the next search resumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SearchCursor {
    line: usize,
    index: usize,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextHit {
    pub bounds: Bounds,
    /// Resume point just past this hit.
    pub next: SearchCursor,
}

#[derive(Debug, Clone, Default)]
pub struct TextLayout {
    lines: Vec<Vec<Glyph>>,
}

impl TextLayout {
    /// Group characters in reading order into lines.
    ///
    /// A line ends at a line break character or where a character leaves the
    /// row of the previous visible one. Other control characters are dropped.
    pub fn from_glyphs(glyphs: impl IntoIterator<Item = Glyph>) -> Self {
        let mut lines = Vec::new();
        let mut line: Vec<Glyph> = Vec::new();
        for glyph in glyphs {
            if glyph.ch == '\n' || glyph.ch == '\r' {
                flush(&mut lines, &mut line);
                continue;
            }
            if glyph.ch.is_control() {
                continue;
            }
            if !glyph.ch.is_whitespace() {
                let previous = line.iter().rev().find(|g| !g.ch.is_whitespace());
                if previous.is_some_and(|p| !p.bounds.shares_row(&glyph.bounds)) {
                    flush(&mut lines, &mut line);
                }
            }
            line.push(glyph);
        }
        flush(&mut lines, &mut line);
        Self { lines }
    }

    pub fn glyph_count(&self) -> usize {
        self.lines.iter().map(Vec::len).sum()
    }

    /// Extracted text, one line per row.
    pub fn text(&self) -> String {
        self.lines
            .iter()
            .map(|line| line.iter().map(|g| g.ch).collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Find the first match of `query` (UCS-4 code units) at or after `from`.
    ///
    /// Matches never span lines. An empty query never matches.
    pub fn find_next(
        &self,
        query: &[u32],
        from: SearchCursor,
        policy: SearchPolicy,
    ) -> Option<TextHit> {
        if query.is_empty() {
            return None;
        }
        let query: Vec<char> = query
            .iter()
            .map(|&unit| char::from_u32(unit).unwrap_or(char::REPLACEMENT_CHARACTER))
            .map(|c| fold(c, policy))
            .collect();

        for (line_no, line) in self.lines.iter().enumerate().skip(from.line) {
            let start = if line_no == from.line { from.index } else { 0 };
            if line.len() < query.len() {
                continue;
            }
            for begin in start..=(line.len() - query.len()) {
                let end = begin + query.len();
                let window = &line[begin..end];
                if !window
                    .iter()
                    .zip(&query)
                    .all(|(g, &q)| fold(g.ch, policy) == q)
                {
                    continue;
                }
                if policy.whole_word && !is_word_boundary(line, begin, end) {
                    continue;
                }
                return Some(TextHit {
                    bounds: extent(window),
                    next: SearchCursor {
                        line: line_no,
                        index: end,
                    },
                });
            }
        }
        None
    }
}

fn flush(lines: &mut Vec<Vec<Glyph>>, line: &mut Vec<Glyph>) {
    if line.iter().any(|g| !g.ch.is_whitespace()) {
        lines.push(std::mem::take(line));
    } else {
        line.clear();
    }
}

/// Union of the visible glyph boxes; whitespace boxes count only when nothing else is there.
fn extent(window: &[Glyph]) -> Bounds {
    let visible: Vec<&Glyph> = window.iter().filter(|g| !g.ch.is_whitespace()).collect();
    let glyphs = if visible.is_empty() {
        window.iter().collect()
    } else {
        visible
    };
    glyphs[1..]
        .iter()
        .fold(glyphs[0].bounds, |acc, g| acc.union(&g.bounds))
}

fn fold(c: char, policy: SearchPolicy) -> char {
    if policy.case_sensitive {
        c
    } else {
        c.to_lowercase().next().unwrap_or(c)
    }
}

fn is_word_boundary(line: &[Glyph], begin: usize, end: usize) -> bool {
    let before = begin
        .checked_sub(1)
        .and_then(|i| line.get(i))
        .map_or(true, |g| !g.ch.is_alphanumeric());
    let after = line.get(end).map_or(true, |g| !g.ch.is_alphanumeric());
    before && after
}

#[cfg(test)]
mod tests {
    use super::*;

    const INSENSITIVE: SearchPolicy = SearchPolicy {
        case_sensitive: false,
        whole_word: false,
    };

    fn units(s: &str) -> Vec<u32> {
        s.chars().map(u32::from).collect()
    }

    /// Characters of `text` set at `size` points from (`x`, `top`), half an em apart.
    fn run(text: &str, x: f64, top: f64, size: f64) -> Vec<Glyph> {
        text.chars()
            .enumerate()
            .map(|(i, ch)| {
                let left = x + i as f64 * size * 0.5;
                Glyph {
                    ch,
                    bounds: Bounds {
                        x_min: left,
                        y_min: top,
                        x_max: left + size * 0.5,
                        y_max: top + size,
                    },
                }
            })
            .collect()
    }

    fn hello_world() -> TextLayout {
        let mut glyphs = run("Hello", 10.0, 12.0, 10.0);
        glyphs.extend(run("big World", 10.0, 32.0, 10.0));
        TextLayout::from_glyphs(glyphs)
    }

    #[test]
    fn rows_become_lines() {
        let layout = hello_world();
        assert_eq!(layout.text(), "Hello\nbig World");
        assert_eq!(layout.glyph_count(), 14);

        let hit = layout
            .find_next(&units("hello"), SearchCursor::default(), INSENSITIVE)
            .unwrap();
        assert_eq!(
            hit.bounds,
            Bounds {
                x_min: 10.0,
                y_min: 12.0,
                x_max: 35.0,
                y_max: 22.0,
            }
        );
    }

    #[test]
    fn break_characters_end_lines() {
        let mut glyphs = run("ab", 0.0, 0.0, 10.0);
        glyphs.extend(run("\r\n", 10.0, 0.0, 10.0));
        glyphs.extend(run("cd", 10.0, 0.0, 10.0));
        glyphs.extend(run("\u{2}", 20.0, 0.0, 10.0));
        let layout = TextLayout::from_glyphs(glyphs);
        assert_eq!(layout.text(), "ab\ncd");
        assert!(layout
            .find_next(&units("bc"), SearchCursor::default(), INSENSITIVE)
            .is_none());
    }

    #[test]
    fn mixed_heights_share_a_row() {
        // a short 'o' beside a tall 'l' stays on one line
        let tall = Glyph {
            ch: 'l',
            bounds: Bounds {
                x_min: 0.0,
                y_min: 10.0,
                x_max: 3.0,
                y_max: 20.0,
            },
        };
        let short = Glyph {
            ch: 'o',
            bounds: Bounds {
                x_min: 3.0,
                y_min: 14.0,
                x_max: 8.0,
                y_max: 20.0,
            },
        };
        assert_eq!(TextLayout::from_glyphs([tall, short]).text(), "lo");
    }

    #[test]
    fn respects_case_policy() {
        let layout = hello_world();
        let sensitive = SearchPolicy {
            case_sensitive: true,
            whole_word: false,
        };
        assert!(layout
            .find_next(&units("WORLD"), SearchCursor::default(), sensitive)
            .is_none());
        assert!(layout
            .find_next(&units("WORLD"), SearchCursor::default(), INSENSITIVE)
            .is_some());
    }

    #[test]
    fn whole_word_policy() {
        let layout = hello_world();
        let whole = SearchPolicy {
            case_sensitive: false,
            whole_word: true,
        };
        assert!(layout
            .find_next(&units("orl"), SearchCursor::default(), whole)
            .is_none());
        assert!(layout
            .find_next(&units("world"), SearchCursor::default(), whole)
            .is_some());
    }

    #[test]
    fn resumes_after_previous_hit() {
        let layout = TextLayout::from_glyphs(run("abab", 0.0, 40.0, 12.0));
        let query = units("ab");
        let first = layout
            .find_next(&query, SearchCursor::default(), INSENSITIVE)
            .unwrap();
        let second = layout.find_next(&query, first.next, INSENSITIVE).unwrap();
        assert!(second.bounds.x_min > first.bounds.x_min);
        assert!(layout.find_next(&query, second.next, INSENSITIVE).is_none());
    }

    #[test]
    fn empty_query_never_matches() {
        assert!(hello_world()
            .find_next(&[], SearchCursor::default(), INSENSITIVE)
            .is_none());
    }

    #[test]
    fn whitespace_boxes_do_not_widen_hits() {
        let mut glyphs = run("big", 10.0, 32.0, 10.0);
        // a generated space with a stray box far below the row
        glyphs.push(Glyph {
            ch: ' ',
            bounds: Bounds {
                x_min: 25.0,
                y_min: 32.0,
                x_max: 25.0,
                y_max: 90.0,
            },
        });
        glyphs.extend(run("World", 30.0, 32.0, 10.0));
        let layout = TextLayout::from_glyphs(glyphs);
        assert_eq!(layout.text(), "big World");

        let hit = layout
            .find_next(&units("g w"), SearchCursor::default(), INSENSITIVE)
            .unwrap();
        assert_eq!(hit.bounds.y_max, 42.0);
        assert_eq!((hit.bounds.x_min, hit.bounds.x_max), (20.0, 35.0));
    }

    #[test]
    fn page_rects_flip_to_top_left() {
        let crop = CropBox::new(36.0, 36.0, 576.0, 756.0);
        let bounds = Bounds::from_page_rect(&crop, 72.0, 695.2, 132.0, 719.2);
        assert_eq!(bounds.x_min, 36.0);
        assert_eq!(bounds.x_max, 96.0);
        assert!((bounds.y_min - 36.8).abs() < 1e-9);
        assert!((bounds.y_max - 60.8).abs() < 1e-9);
    }
}
