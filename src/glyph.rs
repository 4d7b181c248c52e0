// src/glyph.rs

//! Defines the character bitmap buffer, the packed 16-bit codepoint cell, and
//! the reserved glyph indices.
//!
//! Bitmaps are stored bottom-up: row 0 is the lowest pixel row of the cell and
//! bit 0 of a row is its leftmost column.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::config::{CellGeometry, CodeLayout};

/// Largest cell height a [`CharBitmap`] can hold.
pub const MAX_CELL_HEIGHT: usize = 16;

/// Glyph index of the replacement glyph drawn for unsupported codepoints.
pub const REPLACEMENT_GLYPH: u16 = 0;
/// Glyph index meaning "apply the transform to the previously drawn glyph".
pub const COMBINING_SENTINEL: u16 = 1;
/// First glyph index assigned to a real glyph.
pub const FIRST_GLYPH_INDEX: u16 = 2;

/// A mapped codepoint's 16-bit cell: `glyph_index | transform_code`.
///
/// The value 0 means "replacement glyph, no transform".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CodepointEntry(pub u16);

impl CodepointEntry {
    pub const UNMAPPED: CodepointEntry = CodepointEntry(0);

    pub fn new(glyph: u16, slot: u16, layout: &CodeLayout) -> Self {
        CodepointEntry((glyph & layout.glyph_mask()) | layout.code_for_slot(slot))
    }

    pub fn glyph(self, layout: &CodeLayout) -> u16 {
        self.0 & layout.glyph_mask()
    }

    /// Transform slot (0 = no transform).
    pub fn slot(self, layout: &CodeLayout) -> u16 {
        ((self.0 as u32) >> layout.char_bits) as u16
    }

    /// Transform code as stored in the cell, i.e. `slot << char_bits`.
    pub fn transform_code(self, layout: &CodeLayout) -> u16 {
        self.0 & !layout.glyph_mask()
    }

    pub fn is_unmapped(self) -> bool {
        self.0 == 0
    }
}

/// The working bitmap of one character cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharBitmap {
    rows: [u8; MAX_CELL_HEIGHT],
    width: usize,
    height: usize,
}

impl CharBitmap {
    pub fn blank(cell: &CellGeometry) -> Self {
        CharBitmap {
            rows: [0; MAX_CELL_HEIGHT],
            width: cell.width,
            height: cell.height.min(MAX_CELL_HEIGHT),
        }
    }

    /// Builds a bitmap from bottom-up rows. Extra rows are ignored.
    pub fn from_rows(cell: &CellGeometry, rows: &[u8]) -> Self {
        let mut bitmap = Self::blank(cell);
        let mask = cell.row_mask();
        for (dst, src) in bitmap.rows_mut().iter_mut().zip(rows) {
            *dst = src & mask;
        }
        bitmap
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn rows(&self) -> &[u8] {
        &self.rows[..self.height]
    }

    pub fn rows_mut(&mut self) -> &mut [u8] {
        &mut self.rows[..self.height]
    }

    /// Row `i`, or 0 for rows outside the cell.
    pub fn row(&self, i: isize) -> u8 {
        if i < 0 || i as usize >= self.height {
            0
        } else {
            self.rows[i as usize]
        }
    }

    /// Writes row `i`, ignoring rows outside the cell.
    pub fn set_row(&mut self, i: isize, bits: u8) {
        if i >= 0 && (i as usize) < self.height {
            self.rows[i as usize] = bits & self.mask();
        }
    }

    pub fn or_row(&mut self, i: isize, bits: u8) {
        let current = self.row(i);
        self.set_row(i, current | bits);
    }

    pub fn mask(&self) -> u8 {
        ((1u16 << self.width) - 1) as u8
    }

    pub fn pixel(&self, row: usize, col: usize) -> bool {
        row < self.height && col < self.width && self.rows[row] >> col & 1 == 1
    }

    pub fn is_blank(&self) -> bool {
        self.rows().iter().all(|&r| r == 0)
    }

    pub fn clear(&mut self) {
        self.rows = [0; MAX_CELL_HEIGHT];
    }

    /// Highest row containing ink.
    pub fn top_ink_row(&self) -> Option<usize> {
        self.rows().iter().rposition(|&r| r != 0)
    }

    /// Lowest row containing ink.
    pub fn bottom_ink_row(&self) -> Option<usize> {
        self.rows().iter().position(|&r| r != 0)
    }
}

impl fmt::Display for CharBitmap {
    /// Prints the cell top row first, `#` for ink and `.` for blank.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.rows().iter().rev() {
            for col in 0..self.width {
                let c = if row >> col & 1 == 1 { '#' } else { '.' };
                write!(f, "{}", c)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
