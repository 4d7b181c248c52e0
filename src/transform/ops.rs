// src/transform/ops.rs

//! Pixel operations for custom transforms.
//!
//! Rows are addressed bottom-up (row 0 is the lowest row) and bit 0 is the
//! leftmost column. Operations never fail: rows outside the cell are skipped.

use serde::{Deserialize, Serialize};

use crate::config::CellGeometry;
use crate::diacritic::DiacriticTable;
use crate::glyph::CharBitmap;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum PixelOp {
    /// Mirror every row left to right after shifting it `nudge` columns left.
    MirrorHorizontal {
        #[serde(default)]
        nudge: u8,
    },
    /// Flip rows `0..=top` upside down and clear everything above `top`.
    FlipRows { top: usize },
    /// OR `bits` into `row`.
    Or { row: usize, bits: u8 },
    /// Overwrite `row` with `bits`.
    Assign { row: usize, bits: u8 },
    /// Per row: keep `keep` bits in place, move `take` bits by `shift`
    /// columns (positive is rightwards).
    Remap { keep: u8, take: u8, shift: i8 },
    /// Apply `then` only if any of `rows` has ink under `mask`.
    WhenAny {
        rows: Vec<usize>,
        mask: u8,
        then: Vec<PixelOp>,
    },
    /// Smear ink one column to the right.
    Bold,
    /// Smear ink one column to the left.
    BoldLeft,
    /// Shift everything below the midline one column left.
    Italic,
    /// Replace ink by its one-pixel outline.
    Outline,
    /// Invert the glyph inside a rounded box.
    Entomb,
    /// Stamp a combining mark as a diacritic would be.
    Stamp { mark: u8 },
}

impl PixelOp {
    /// Rejects operands that cannot mean anything in a cell of `cell.width`
    /// columns. Nested `then` lists are checked too.
    pub fn check(&self, cell: &CellGeometry) -> Result<(), String> {
        match self {
            PixelOp::MirrorHorizontal { nudge } if *nudge as usize >= cell.width => Err(format!(
                "mirror_horizontal nudge {} must be below the cell width {}",
                nudge, cell.width
            )),
            PixelOp::WhenAny { then, .. } => then.iter().try_for_each(|op| op.check(cell)),
            _ => Ok(()),
        }
    }

    pub fn apply(&self, bitmap: &mut CharBitmap, cell: &CellGeometry, marks: &DiacriticTable) {
        let mask = bitmap.mask();
        match self {
            PixelOp::MirrorHorizontal { nudge } => {
                let width = bitmap.width() as u32;
                for row in bitmap.rows_mut() {
                    let v = (*row & mask).checked_shr(*nudge as u32).unwrap_or(0);
                    *row = v.reverse_bits() >> (8 - width) & mask;
                }
            }
            PixelOp::FlipRows { top } => {
                let rows = bitmap.rows_mut();
                let end = (*top + 1).min(rows.len());
                rows[..end].reverse();
                for row in rows.iter_mut().skip(end) {
                    *row = 0;
                }
            }
            PixelOp::Or { row, bits } => bitmap.or_row(*row as isize, *bits),
            PixelOp::Assign { row, bits } => bitmap.set_row(*row as isize, *bits),
            PixelOp::Remap { keep, take, shift } => {
                for row in bitmap.rows_mut() {
                    let moved = shift_columns(*row & take, *shift);
                    *row = ((*row & keep) | moved) & mask;
                }
            }
            PixelOp::WhenAny { rows, mask: any, then } => {
                if rows.iter().any(|&r| bitmap.row(r as isize) & any != 0) {
                    for op in then {
                        op.apply(bitmap, cell, marks);
                    }
                }
            }
            PixelOp::Bold => {
                let (left, right) = side_masks(mask);
                for row in bitmap.rows_mut() {
                    *row |= ((*row & right) << 1) & !((*row & left) >> 1) & left;
                }
            }
            PixelOp::BoldLeft => {
                let (left, right) = side_masks(mask);
                for row in bitmap.rows_mut() {
                    *row |= ((*row & left) >> 1) & !((*row & right) << 1) & right;
                }
            }
            PixelOp::Italic => italicize(bitmap, cell.midline),
            PixelOp::Outline => outline(bitmap),
            PixelOp::Entomb => entomb(bitmap),
            PixelOp::Stamp { mark } => {
                marks.stamp(*mark, bitmap, cell);
            }
        }
    }
}

/// Applies `ops` in order.
pub fn apply_all(ops: &[PixelOp], bitmap: &mut CharBitmap, cell: &CellGeometry, marks: &DiacriticTable) {
    for op in ops {
        op.apply(bitmap, cell, marks);
    }
}

fn shift_columns(bits: u8, shift: i8) -> u8 {
    let n = shift.unsigned_abs() as u32;
    if n >= 8 {
        0
    } else if shift >= 0 {
        bits << n
    } else {
        bits >> n
    }
}

// (everything but the leftmost column, everything but the rightmost column)
fn side_masks(mask: u8) -> (u8, u8) {
    (mask & !1, mask >> 1)
}

fn italicize(bitmap: &mut CharBitmap, split: usize) {
    let split = split.min(bitmap.height());
    if split == 0 {
        return;
    }
    let keep = bitmap.mask() >> 1;
    let above = bitmap.row(split as isize);
    let below = bitmap.row(split as isize - 1);
    let rejoin = (above >> 1) & !(below >> 1) & below & !above;
    for row in &mut bitmap.rows_mut()[..split] {
        *row = (*row >> 1) & keep;
    }
    bitmap.or_row(split as isize - 1, rejoin);
}

fn outline(bitmap: &mut CharBitmap) {
    let mask = bitmap.mask();
    let original: Vec<u8> = bitmap.rows().to_vec();
    let n = original.len() as isize;
    let at = |i: isize| if i < 0 || i >= n { 0 } else { original[i as usize] };
    for i in 0..n {
        let blur = at(i - 1) | at(i) | at(i + 1);
        let spread = (blur << 1) | blur | (blur >> 1);
        bitmap.set_row(i, spread & !at(i) & mask);
    }
}

fn entomb(bitmap: &mut CharBitmap) {
    let mask = bitmap.mask();
    let middle = mask & !1 & !(1 << (bitmap.width() - 1));
    let h = bitmap.height() as isize;
    let bottom = bitmap.row(0);
    let top = bitmap.row(h - 1);
    for i in 1..h - 2 {
        let r = bitmap.row(i);
        bitmap.set_row(i, r ^ mask);
    }
    bitmap.set_row(0, !bottom & middle);
    bitmap.set_row(h - 2, !top & middle);
    bitmap.set_row(h - 1, 0);
}
