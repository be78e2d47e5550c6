//! Key layout
//!
//! Computes the on-screen rectangle of every key in a display range.
//! White keys tile the full canvas width with integer widths; black keys
//! straddle the boundary between their neighbours and overlap them.

use crate::note::{DisplayRange, KeyClass, NoteId};
use serde::{Deserialize, Serialize};

/// Black key width relative to the base white key width
pub const BLACK_KEY_WIDTH_RATIO: f64 = 0.7;
/// Black key height relative to the canvas height
pub const BLACK_KEY_HEIGHT_RATIO: f64 = 0.6;

/// Axis-aligned rectangle in canvas pixels
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl BoundingBox {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    /// Half-open containment: the right and bottom edges are outside
    pub fn contains(&self, x: f64, y: f64) -> bool {
        self.x <= x && x < self.right() && self.y <= y && y < self.bottom()
    }

    /// Shrink from the left and top edges, leaving a gap to the previous key
    pub fn inset_leading(&self, amount: f64) -> BoundingBox {
        let dx = amount.min(self.width).max(0.0);
        let dy = amount.min(self.height).max(0.0);
        BoundingBox {
            x: self.x + dx,
            y: self.y + dy,
            width: self.width - dx,
            height: self.height - dy,
        }
    }
}

/// A single laid-out key
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyRect {
    pub note: NoteId,
    pub class: KeyClass,
    pub bounds: BoundingBox,
}

/// Mapping from every note in a display range to its bounding box
///
/// Built only by [`LayoutTable::recompute`] and never patched afterwards:
/// a change of range or canvas size produces a fresh table.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutTable {
    range: DisplayRange,
    width: u32,
    height: u32,
    /// Indexed by `note - range.lower()`; empty when the range has no white keys
    keys: Vec<KeyRect>,
}

impl LayoutTable {
    /// Lay out `range` across a `width` x `height` canvas.
    ///
    /// The white key widths always sum to `width`. Any rounding remainder is
    /// spread one pixel at a time over every `white_total / remainder`-th
    /// white key, and the last white key takes whatever is left.
    ///
    /// A range without white keys cannot be laid out and yields an empty table.
    pub fn recompute(range: DisplayRange, width: u32, height: u32) -> Self {
        let white_total = range.white_count() as u32;
        if white_total == 0 {
            log::warn!("Display range {} has no white keys, layout is empty", range);
            return Self {
                range,
                width,
                height,
                keys: Vec::new(),
            };
        }

        let base_width = width / white_total;
        let mut remainder = width % white_total;
        let step = if remainder > 0 { white_total / remainder } else { 0 };

        let base = base_width as f64;
        let black_width = base * BLACK_KEY_WIDTH_RATIO;
        let black_height = height as f64 * BLACK_KEY_HEIGHT_RATIO;
        let black_shift = black_width / 2.0;

        let mut keys = Vec::with_capacity(range.len());
        let mut offset: u32 = 0;
        let mut white_index: u32 = 0;

        for note in range.notes() {
            match note.class() {
                KeyClass::White => {
                    white_index += 1;
                    let mut key_width = base_width;
                    if remainder > 0 {
                        if white_index == white_total {
                            key_width += remainder;
                            remainder = 0;
                        } else if white_index % step == 0 {
                            key_width += 1;
                            remainder -= 1;
                        }
                    }

                    keys.push(KeyRect {
                        note,
                        class: KeyClass::White,
                        bounds: BoundingBox::new(offset as f64, 0.0, key_width as f64, height as f64),
                    });
                    offset += key_width;
                }
                KeyClass::Black => {
                    // Centered on the right edge of the previous white key
                    keys.push(KeyRect {
                        note,
                        class: KeyClass::Black,
                        bounds: BoundingBox::new(offset as f64 - black_shift, 0.0, black_width, black_height),
                    });
                }
            }
        }

        log::debug!(
            "Laid out {} keys ({} white) over {}x{}",
            keys.len(),
            white_total,
            width,
            height
        );

        Self {
            range,
            width,
            height,
            keys,
        }
    }

    pub fn range(&self) -> DisplayRange {
        self.range
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// True if this table was computed for exactly this geometry
    pub fn matches(&self, range: DisplayRange, width: u32, height: u32) -> bool {
        self.range == range && self.width == width && self.height == height
    }

    pub fn key(&self, note: NoteId) -> Option<&KeyRect> {
        if !self.range.contains(note) {
            return None;
        }
        let index = (note.value() as i64 - self.range.lower().value() as i64) as usize;
        self.keys.get(index)
    }

    pub fn get(&self, note: NoteId) -> Option<&BoundingBox> {
        self.key(note).map(|key| &key.bounds)
    }

    /// All keys in note order
    pub fn keys(&self) -> impl Iterator<Item = &KeyRect> {
        self.keys.iter()
    }

    pub fn white_keys(&self) -> impl Iterator<Item = &KeyRect> {
        self.keys.iter().filter(|key| key.class == KeyClass::White)
    }

    pub fn black_keys(&self) -> impl Iterator<Item = &KeyRect> {
        self.keys.iter().filter(|key| key.class == KeyClass::Black)
    }
}
