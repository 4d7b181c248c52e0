// src/bitpack/mod.rs

//! Bit packing for monochrome pixel matrices.
//!
//! A [`PixelMatrix`] is held in visual order (row 0 is the top row). Packing
//! applies the [`PackOptions`] transformations in a fixed order and then
//! flattens the result into a continuous bit stream, lowest bit first:
//!
//! 1. `MIRROR_VERTICAL` reverses the row order, so encoding starts at the
//!    bottom of the cell.
//! 2. `MIRROR_HORIZONTAL` reverses each row, so the right edge lands in bit 0.
//! 3. `SIDEWAYS` transposes the matrix (column-major packing).
//! 4. `REVERSE_BITS` fills each byte from bit 7 down instead of bit 0 up.
//!
//! With 8 columns the stream is exactly one byte per packed row. Narrower
//! matrices share bytes between consecutive rows.

use std::fmt::Write as _;

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::config::CellGeometry;
use crate::glyph::CharBitmap;

bitflags! {
    /// Independent packing options. The default is `MIRROR_VERTICAL` alone,
    /// which is the only combination with a generated unpack procedure.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct PackOptions: u8 {
        const MIRROR_VERTICAL   = 1 << 0;
        const MIRROR_HORIZONTAL = 1 << 1;
        const SIDEWAYS          = 1 << 2;
        const REVERSE_BITS      = 1 << 3;
    }
}

impl Default for PackOptions {
    fn default() -> Self {
        PackOptions::MIRROR_VERTICAL
    }
}

/// Rectangular boolean pixel matrix in visual (top-down) order.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PixelMatrix {
    rows: Vec<Vec<bool>>,
    ncols: usize,
}

impl PixelMatrix {
    pub fn new(nrows: usize, ncols: usize) -> Self {
        PixelMatrix {
            rows: vec![vec![false; ncols]; nrows],
            ncols,
        }
    }

    /// Builds a matrix from rows of equal length. Returns `None` when ragged.
    pub fn from_rows(rows: Vec<Vec<bool>>) -> Option<Self> {
        let ncols = rows.first().map_or(0, Vec::len);
        if rows.iter().any(|r| r.len() != ncols) {
            return None;
        }
        Some(PixelMatrix { rows, ncols })
    }

    /// Builds a matrix from bottom-up packed rows (bit 0 = leftmost column).
    pub fn from_bottom_up_rows(rows: &[u8], ncols: usize) -> Self {
        let rows = rows
            .iter()
            .rev()
            .map(|&bits| (0..ncols).map(|c| bits >> c & 1 == 1).collect())
            .collect();
        PixelMatrix { rows, ncols }
    }

    pub fn nrows(&self) -> usize {
        self.rows.len()
    }

    pub fn ncols(&self) -> usize {
        self.ncols
    }

    pub fn get(&self, row: usize, col: usize) -> bool {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .copied()
            .unwrap_or(false)
    }

    pub fn set(&mut self, row: usize, col: usize, value: bool) {
        if let Some(cell) = self.rows.get_mut(row).and_then(|r| r.get_mut(col)) {
            *cell = value;
        }
    }

    pub fn rows(&self) -> &[Vec<bool>] {
        &self.rows
    }

    /// Packs each row into a byte, bottom row first, bit 0 = leftmost column.
    /// Only meaningful for matrices at most 8 columns wide.
    pub fn to_bottom_up_rows(&self) -> Vec<u8> {
        self.rows.iter().rev().map(|r| pack_row(r)).collect()
    }

    fn transposed(&self) -> PixelMatrix {
        let nrows = self.nrows();
        let rows = (0..self.ncols)
            .map(|c| (0..nrows).map(|r| self.rows[r][c]).collect())
            .collect();
        PixelMatrix { rows, ncols: nrows }
    }
}

/// Packs up to 8 pixels into one byte, first pixel in bit 0.
pub fn pack_row(pixels: &[bool]) -> u8 {
    pixels
        .iter()
        .take(8)
        .enumerate()
        .fold(0u8, |acc, (i, &p)| acc | (p as u8) << i)
}

/// Packs a row of any length into `ceil(len / 8)` bytes, first pixel in bit 0
/// of the first byte.
pub fn pack_wide_row(pixels: &[bool]) -> Vec<u8> {
    pixels.chunks(8).map(pack_row).collect()
}

fn oriented(matrix: &PixelMatrix, options: PackOptions) -> PixelMatrix {
    let mut m = matrix.clone();
    if options.contains(PackOptions::MIRROR_VERTICAL) {
        m.rows.reverse();
    }
    if options.contains(PackOptions::MIRROR_HORIZONTAL) {
        for row in &mut m.rows {
            row.reverse();
        }
    }
    if options.contains(PackOptions::SIDEWAYS) {
        m = m.transposed();
    }
    m
}

fn bit_position(k: usize, options: PackOptions) -> (usize, u8) {
    let bit = (k & 7) as u8;
    if options.contains(PackOptions::REVERSE_BITS) {
        (k >> 3, 7 - bit)
    } else {
        (k >> 3, bit)
    }
}

/// Packs a pixel matrix into a byte sequence under `options`.
pub fn pack_bits(matrix: &PixelMatrix, options: PackOptions) -> Vec<u8> {
    let m = oriented(matrix, options);
    let nbits = m.nrows() * m.ncols();
    let mut out = vec![0u8; nbits.div_ceil(8)];
    let pixels = m.rows.iter().flatten();
    for (k, &p) in pixels.enumerate() {
        if p {
            let (byte, bit) = bit_position(k, options);
            out[byte] |= 1 << bit;
        }
    }
    out
}

/// Inverse of [`pack_bits`] for any option set. `nrows`/`ncols` are the
/// dimensions of the original (visual) matrix.
pub fn unpack_bits(data: &[u8], options: PackOptions, nrows: usize, ncols: usize) -> PixelMatrix {
    let (prows, pcols) = if options.contains(PackOptions::SIDEWAYS) {
        (ncols, nrows)
    } else {
        (nrows, ncols)
    };
    let mut packed = PixelMatrix::new(prows, pcols);
    for r in 0..prows {
        for c in 0..pcols {
            let (byte, bit) = bit_position(r * pcols + c, options);
            let value = data.get(byte).is_some_and(|b| b >> bit & 1 == 1);
            packed.rows[r][c] = value;
        }
    }
    // Undo the orientation steps in reverse order.
    if options.contains(PackOptions::SIDEWAYS) {
        packed = packed.transposed();
    }
    if options.contains(PackOptions::MIRROR_HORIZONTAL) {
        for row in &mut packed.rows {
            row.reverse();
        }
    }
    if options.contains(PackOptions::MIRROR_VERTICAL) {
        packed.rows.reverse();
    }
    packed
}

/// Shift/mask decode procedure for data packed with the default options.
///
/// Output rows are bottom-up with bit 0 as the leftmost column, which is the
/// layout of [`crate::glyph::CharBitmap`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UnpackPlan {
    pub nrows: usize,
    pub ncols: usize,
}

impl UnpackPlan {
    /// Returns a plan only for `PackOptions::MIRROR_VERTICAL` alone. Every
    /// other combination is manual decode only.
    pub fn for_options(options: PackOptions, nrows: usize, ncols: usize) -> Option<UnpackPlan> {
        if options == PackOptions::MIRROR_VERTICAL && ncols <= 8 {
            Some(UnpackPlan { nrows, ncols })
        } else {
            None
        }
    }

    fn mask(&self) -> u8 {
        ((1u16 << self.ncols) - 1) as u8
    }

    /// `(byte, shift, straddles)` for each packed row: the row starts at bit
    /// `shift` of `data[byte]` and continues into `data[byte + 1]` only when
    /// it straddles a byte boundary.
    fn row_reads(&self) -> impl Iterator<Item = (usize, usize, bool)> + '_ {
        (0..self.nrows).map(move |r| {
            let bit = r * self.ncols;
            let shift = bit & 7;
            (bit >> 3, shift, shift + self.ncols > 8)
        })
    }

    /// Runs the documented procedure on `data`.
    pub fn apply(&self, data: &[u8]) -> Vec<u8> {
        let byte_at = |i: usize| data.get(i).copied().unwrap_or(0) as u16;
        self.row_reads()
            .map(|(i, shift, straddles)| {
                let mut word = byte_at(i) >> shift;
                if straddles {
                    word |= byte_at(i + 1) << (8 - shift);
                }
                word as u8 & self.mask()
            })
            .collect()
    }

    /// C-like pseudocode for [`UnpackPlan::apply`], emitted next to the data.
    /// One statement per row; no statement reads past the packed data.
    pub fn pseudocode(&self, data_name: &str, out_name: &str) -> String {
        let mut s = String::new();
        let _ = writeln!(s, "// Unpack {} ({} rows x {} cols, bottom row first):", data_name, self.nrows, self.ncols);
        for (r, (i, shift, straddles)) in self.row_reads().enumerate() {
            let _ = if straddles {
                writeln!(
                    s,
                    "{o}[{r}] = (({d}[{i}] >> {shift}) | ({d}[{next}] << {back})) & {mask:#04x};",
                    o = out_name,
                    d = data_name,
                    next = i + 1,
                    back = 8 - shift,
                    mask = self.mask()
                )
            } else {
                writeln!(
                    s,
                    "{o}[{r}] = ({d}[{i}] >> {shift}) & {mask:#04x};",
                    o = out_name,
                    d = data_name,
                    mask = self.mask()
                )
            };
        }
        let _ = writeln!(s, "// bit 0 of each row is the leftmost column");
        s
    }
}

/// Unpack documentation for `options`: the generated procedure, or a note that
/// the layout has to be decoded by hand.
pub fn unpack_pseudocode(options: PackOptions, nrows: usize, ncols: usize, data_name: &str) -> String {
    match UnpackPlan::for_options(options, nrows, ncols) {
        Some(plan) => plan.pseudocode(data_name, "rows"),
        None => format!(
            "// {} packed with {:?}: manual decode only\n",
            data_name, options
        ),
    }
}

/// A full cell packed with arbitrary options, e.g. the replacement glyph.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PackedCell {
    pub options: PackOptions,
    pub nrows: usize,
    pub ncols: usize,
    pub data: Vec<u8>,
}

impl PackedCell {
    pub fn pack(bitmap: &CharBitmap, options: PackOptions) -> PackedCell {
        let matrix = PixelMatrix::from_bottom_up_rows(bitmap.rows(), bitmap.width());
        PackedCell {
            options,
            nrows: bitmap.height(),
            ncols: bitmap.width(),
            data: pack_bits(&matrix, options),
        }
    }

    pub fn unpack(&self, cell: &CellGeometry) -> CharBitmap {
        let matrix = unpack_bits(&self.data, self.options, self.nrows, self.ncols);
        CharBitmap::from_rows(cell, &matrix.to_bottom_up_rows())
    }

    /// Generated decode procedure, or the manual-decode note.
    pub fn pseudocode(&self, data_name: &str) -> String {
        unpack_pseudocode(self.options, self.nrows, self.ncols, data_name)
    }
}

#[cfg(test)]
mod tests;
