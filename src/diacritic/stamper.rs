// src/diacritic/stamper.rs

//! Places a diacritic bitmap onto the glyph currently being composed.
//!
//! Placement never fails. When the mark does not fit, a fixed chain of
//! space-making fallbacks runs; each successful step buys one row, and the
//! number of steps is bounded by the rows still needed (at most the cell
//! height). Rows that still fall outside the cell are clipped.

use log::trace;

use super::Location;
use crate::config::CellGeometry;
use crate::glyph::CharBitmap;

/// Stamps `mark` (bottom-up rows) onto `bitmap`.
pub fn stamp(
    bitmap: &mut CharBitmap,
    mark: &[u8],
    location: Location,
    padding: u8,
    cell: &CellGeometry,
) {
    if mark.is_empty() {
        return;
    }
    let mut rows: Vec<u8> = mark.iter().map(|r| r & bitmap.mask()).collect();
    let union = rows.iter().fold(0u8, |acc, r| acc | r);

    let mut location = location;
    if location == Location::Greek {
        // Capitals take the mark to their upper left.
        let top = bitmap.top_ink_row().unwrap_or(0);
        location = if top > cell.midline {
            Location::AboveLeft
        } else {
            Location::Above
        };
    }

    location = match location {
        Location::AboveRight | Location::BelowRight => {
            shift_right_edge(&mut rows, union, bitmap.width());
            if location == Location::AboveRight {
                Location::Above
            } else {
                Location::Below
            }
        }
        Location::AboveLeft | Location::BelowLeft => {
            shift_left_edge(&mut rows, union);
            // NOTE: compares against AboveRight, so AboveLeft resolves to Below.
            if location == Location::AboveRight {
                Location::Above
            } else {
                Location::Below
            }
        }
        Location::Left => {
            shift_left_edge(&mut rows, union);
            Location::Overlay
        }
        Location::Right => {
            shift_right_edge(&mut rows, union, bitmap.width());
            Location::Overlay
        }
        other => other,
    };

    trace!("Stamping {}-row mark at {:?} pad {}", rows.len(), location, padding);
    match location {
        Location::Above => stamp_above(bitmap, &rows, padding, cell),
        Location::Below => stamp_below(bitmap, &rows, padding, cell),
        _ => stamp_overlay(bitmap, &rows, cell),
    }
}

// Moves the mark so its rightmost ink touches the last column.
fn shift_right_edge(rows: &mut [u8], union: u8, width: usize) {
    if union == 0 {
        return;
    }
    let highest = 7 - union.leading_zeros() as usize;
    let shift = (width - 1).saturating_sub(highest);
    for row in rows.iter_mut() {
        *row <<= shift;
    }
}

// Moves the mark so its leftmost ink touches column 0.
fn shift_left_edge(rows: &mut [u8], union: u8) {
    if union == 0 {
        return;
    }
    let shift = union.trailing_zeros();
    for row in rows.iter_mut() {
        *row >>= shift;
    }
}

fn stamp_above(bitmap: &mut CharBitmap, rows: &[u8], padding: u8, cell: &CellGeometry) {
    let ch = bitmap.height() as isize;
    let midline = cell.midline as isize;
    let nrow = rows.len() as isize;
    let tittle = 1u8 << (bitmap.width() / 2);

    let mut i = ch - 1;
    while i >= midline && bitmap.row(i) == 0 {
        i -= 1;
    }
    if bitmap.row(i) == tittle && bitmap.row(i - 1) == 0 {
        // Marks replace the dot on i and j.
        bitmap.set_row(i, 0);
        while i >= midline && bitmap.row(i) == 0 {
            i -= 1;
        }
    }

    let mut pad = padding as isize;
    let mut start = i + pad;
    let last = start + nrow - 1;
    if last >= ch {
        let mut need = last - (ch - 1);
        let fallbacks: [fn(&mut CharBitmap, &CellGeometry) -> bool; 4] = [
            shorten_down_top,
            nudge_down_top,
            smash_down_conservative,
            smash_down_aggressive,
        ];
        for fallback in fallbacks {
            while need > 0 && fallback(bitmap, cell) {
                need -= 1;
                start -= 1;
            }
        }
        while need > 0 && pad > 0 {
            pad -= 1;
            need -= 1;
            start -= 1;
        }
    } else if i == midline - 1 && (0..=i).all(|r| bitmap.row(r) == 0) {
        start = ch - 1 - nrow;
    }

    for (k, &bits) in rows.iter().enumerate() {
        let r = start + k as isize;
        if r >= ch {
            break;
        }
        bitmap.or_row(r, bits);
    }
}

fn stamp_below(bitmap: &mut CharBitmap, rows: &[u8], padding: u8, cell: &CellGeometry) {
    let nrow = rows.len() as isize;
    let mut pad = padding as isize;

    let mut start = match bitmap.bottom_ink_row() {
        Some(low) => low as isize - pad - (nrow - 1),
        None => 0,
    };
    if start < 0 {
        let mut need = -start;
        let fallbacks: [fn(&mut CharBitmap, &CellGeometry) -> bool; 4] = [
            shorten_up_base,
            nudge_up_base,
            smash_up_conservative,
            smash_up_aggressive,
        ];
        for fallback in fallbacks {
            while need > 0 && fallback(bitmap, cell) {
                need -= 1;
                start += 1;
            }
        }
        while need > 0 && pad > 0 {
            pad -= 1;
            need -= 1;
            start += 1;
        }
    }

    for (k, &bits) in rows.iter().enumerate() {
        // or_row drops rows below the cell.
        bitmap.or_row(start + k as isize, bits);
    }
}

fn stamp_overlay(bitmap: &mut CharBitmap, rows: &[u8], cell: &CellGeometry) {
    let base = cell.midline as isize - rows.len() as isize / 2;
    for (k, &bits) in rows.iter().enumerate() {
        bitmap.or_row(base + k as isize, bits);
    }
}

// --- Space-making fallbacks ---
//
// Each returns true if it freed one row.

/// Removes row `i` by copying every row above it down by one.
pub fn copy_down(bitmap: &mut CharBitmap, i: usize) {
    let rows = bitmap.rows_mut();
    if i >= rows.len() {
        return;
    }
    rows.copy_within(i + 1.., i);
    if let Some(top) = rows.last_mut() {
        *top = 0;
    }
}

/// Removes row `i` by copying every row below it up by one.
pub fn copy_up(bitmap: &mut CharBitmap, i: usize) {
    let rows = bitmap.rows_mut();
    if i >= rows.len() {
        return;
    }
    rows.copy_within(..i, 1);
    rows[0] = 0;
}

/// Merges the first pair of identical rows found below the top of the glyph.
pub fn shorten_down_top(bitmap: &mut CharBitmap, cell: &CellGeometry) -> bool {
    let baseline = cell.baseline as isize;
    let mut i = bitmap.height() as isize - 1;
    while i >= baseline && bitmap.row(i) == 0 {
        i -= 1;
    }
    while i > baseline && bitmap.row(i) != bitmap.row(i - 1) {
        i -= 1;
    }
    if i <= baseline {
        return false;
    }
    copy_down(bitmap, i as usize);
    true
}

/// Moves the whole glyph down one row, if the bottom row is empty.
pub fn nudge_down_top(bitmap: &mut CharBitmap, _cell: &CellGeometry) -> bool {
    if bitmap.row(0) != 0 {
        return false;
    }
    copy_down(bitmap, 0);
    true
}

/// Removes an empty row above the baseline whose neighbours do not collide.
pub fn smash_down_conservative(bitmap: &mut CharBitmap, cell: &CellGeometry) -> bool {
    smash_down(bitmap, cell, true)
}

/// Removes the highest empty row above the baseline.
pub fn smash_down_aggressive(bitmap: &mut CharBitmap, cell: &CellGeometry) -> bool {
    smash_down(bitmap, cell, false)
}

fn smash_down(bitmap: &mut CharBitmap, cell: &CellGeometry, conservative: bool) -> bool {
    let top = bitmap.height() as isize - 2;
    let baseline = cell.baseline as isize;
    let mut i = top;
    while i > baseline {
        let collides = bitmap.row(i + 1) & bitmap.row(i - 1) != 0;
        if bitmap.row(i) == 0 && !(conservative && collides) {
            copy_down(bitmap, i as usize);
            return true;
        }
        i -= 1;
    }
    false
}

/// Merges the first pair of identical rows found above the base of the glyph.
pub fn shorten_up_base(bitmap: &mut CharBitmap, _cell: &CellGeometry) -> bool {
    let ch = bitmap.height() as isize;
    let mut i = 0;
    while i < ch && bitmap.row(i) == 0 {
        i += 1;
    }
    while i < ch - 1 && bitmap.row(i) != bitmap.row(i + 1) {
        i += 1;
    }
    if i >= ch - 1 {
        return false;
    }
    copy_up(bitmap, i as usize);
    true
}

/// Moves the whole glyph up one row, if the top row is empty.
pub fn nudge_up_base(bitmap: &mut CharBitmap, _cell: &CellGeometry) -> bool {
    let top = bitmap.height() as isize - 1;
    if bitmap.row(top) != 0 {
        return false;
    }
    copy_up(bitmap, top as usize);
    true
}

/// Removes an empty row at or below the midline whose neighbours do not collide.
pub fn smash_up_conservative(bitmap: &mut CharBitmap, cell: &CellGeometry) -> bool {
    smash_up(bitmap, cell, true)
}

/// Removes the lowest empty row at or below the midline.
pub fn smash_up_aggressive(bitmap: &mut CharBitmap, cell: &CellGeometry) -> bool {
    smash_up(bitmap, cell, false)
}

fn smash_up(bitmap: &mut CharBitmap, cell: &CellGeometry, conservative: bool) -> bool {
    for i in 1..=cell.midline as isize {
        let collides = bitmap.row(i - 1) & bitmap.row(i + 1) != 0;
        if bitmap.row(i) == 0 && !(conservative && collides) {
            copy_up(bitmap, i as usize);
            return true;
        }
    }
    false
}
