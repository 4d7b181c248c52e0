// src/grouping/mod.rs

//! Glyph grouping and index assignment.
//!
//! Glyphs whose ink fits inside the same box are stored together: each group
//! keeps one wide bitmap made of its members cropped to the shared box and
//! laid side by side. Every row of that wide bitmap is packed as a bit vector
//! (first glyph in the low bits), and the rows are interleaved byte by byte so
//! that `data[offset + b * row_count + r]` is byte `b` of row `r`.
//!
//! Index order: glyphs used with transforms come first so they stay below
//! `2^char_bits`; glyphs only ever drawn plain follow and may spill into
//! extended code pages.

use std::collections::{BTreeMap, BTreeSet};

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::bitpack::pack_wide_row;
use crate::config::{CellGeometry, CodeLayout, SeedSpec};
use crate::error::CompileError;
use crate::glyph::{CharBitmap, FIRST_GLYPH_INDEX};

/// Blank columns/rows on each side of a glyph's ink. A blank glyph has
/// margins equal to the full cell on every side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Margins {
    pub left: usize,
    pub right: usize,
    pub low: usize,
    pub high: usize,
}

impl Margins {
    pub fn of(bitmap: &CharBitmap) -> Margins {
        let (width, height) = (bitmap.width(), bitmap.height());
        let union = bitmap.rows().iter().fold(0u8, |acc, r| acc | r);
        match (bitmap.bottom_ink_row(), bitmap.top_ink_row()) {
            (Some(bottom), Some(top)) if union != 0 => Margins {
                left: union.trailing_zeros() as usize,
                right: width - 1 - (7 - union.leading_zeros() as usize),
                low: bottom,
                high: height - 1 - top,
            },
            _ => Margins {
                left: width,
                right: width,
                low: height,
                high: height,
            },
        }
    }

    /// Smallest box containing both.
    pub fn union(self, other: Margins) -> Margins {
        Margins {
            left: self.left.min(other.left),
            right: self.right.min(other.right),
            low: self.low.min(other.low),
            high: self.high.min(other.high),
        }
    }

    /// True when `self` fits the seed box on the vertical sides.
    fn fits(&self, seed: &Margins, require_left_margin: bool) -> bool {
        (!require_left_margin || self.left > 0) && self.low >= seed.low && self.high >= seed.high
    }
}

/// Layout of one packed group.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlyphGroup {
    /// First glyph index in the group.
    pub start: u16,
    pub count: u16,
    pub row_start: u8,
    pub row_count: u8,
    pub col_start: u8,
    pub col_count: u8,
    /// Offset of the group's wide bitmap in [`GlyphTable::data`].
    pub offset: u32,
}

impl GlyphGroup {
    fn contains(&self, index: u16) -> bool {
        index >= self.start && (index - self.start) < self.count
    }
}

/// All groups plus their concatenated bitmap data. Groups are sorted by
/// `start` and cover `[FIRST_GLYPH_INDEX, FIRST_GLYPH_INDEX + glyph_count)`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlyphTable {
    pub groups: Vec<GlyphGroup>,
    pub data: Vec<u8>,
}

impl GlyphTable {
    pub fn glyph_count(&self) -> usize {
        self.groups.iter().map(|g| g.count as usize).sum()
    }

    /// Binary search for the group holding glyph `index`.
    pub fn find_group(&self, index: u16) -> Option<&GlyphGroup> {
        let i = self
            .groups
            .partition_point(|g| (g.start as u32 + g.count as u32) <= index as u32);
        self.groups.get(i).filter(|g| g.contains(index))
    }

    /// Unpacks glyph `index` into `bitmap`, clearing it first. Returns false
    /// when no group holds the index.
    pub fn load_glyph(&self, index: u16, bitmap: &mut CharBitmap) -> bool {
        let Some(group) = self.find_group(index) else {
            return false;
        };
        bitmap.clear();
        let nrows = group.row_count as usize;
        let ncols = group.col_count as usize;
        if nrows == 0 || ncols == 0 {
            return true;
        }
        let local = (index - group.start) as usize;
        let bit = local * ncols;
        let (byte, shift) = (bit >> 3, bit & 7);
        let head = group.offset as usize + byte * nrows;
        let split = shift + ncols > 8;
        let mask = ((1u16 << ncols) - 1) as u8;
        let read = |i: usize| self.data.get(i).copied().unwrap_or(0) as u16;
        for r in 0..nrows {
            let mut v = read(head + r) >> shift;
            if split {
                v |= read(head + r + nrows) << (8 - shift);
            }
            let row = (v as u8 & mask) << group.col_start;
            bitmap.set_row((group.row_start as usize + r) as isize, row);
        }
        true
    }
}

/// A glyph ready for grouping.
#[derive(Debug, Clone)]
pub struct GlyphInput {
    pub codepoint: char,
    pub bitmap: CharBitmap,
}

/// Result of grouping: the packed table and the codepoint at each index.
#[derive(Debug, Clone, Default)]
pub struct GroupPlan {
    pub table: GlyphTable,
    /// Glyph index of each canonical codepoint.
    pub indices: BTreeMap<char, u16>,
    /// Number of glyphs packed ahead of the plain-only glyphs.
    pub transform_glyphs: usize,
}

struct Bucket {
    label: String,
    members: Vec<usize>,
}

/// Groups `glyphs`, assigns indices and packs the group bitmaps.
///
/// `seeds` must already be canonical codepoints. Fails if the glyphs used with
/// transforms do not fit below `2^char_bits`.
pub fn plan_groups(
    glyphs: &[GlyphInput],
    with_transforms: &BTreeSet<char>,
    seeds: &[SeedSpec],
    cell: &CellGeometry,
    layout: &CodeLayout,
) -> Result<GroupPlan, CompileError> {
    let margins: Vec<Margins> = glyphs.iter().map(|g| Margins::of(&g.bitmap)).collect();
    let mut unmatched: BTreeSet<usize> = (0..glyphs.len()).collect();
    let mut buckets: Vec<Bucket> = Vec::new();

    for seed in seeds {
        let Some(seed_index) = glyphs.iter().position(|g| g.codepoint == seed.glyph) else {
            debug!("Seed {:?} is not a packed glyph, skipping", seed.glyph);
            continue;
        };
        let seed_margins = margins[seed_index];
        let matched: Vec<usize> = unmatched
            .iter()
            .copied()
            .filter(|&i| margins[i].fits(&seed_margins, seed.require_left_margin))
            .collect();
        if matched.is_empty() {
            continue;
        }
        for i in &matched {
            unmatched.remove(i);
        }
        buckets.push(Bucket {
            label: seed.glyph.to_string(),
            members: matched,
        });
    }
    buckets.push(Bucket {
        label: "catch-all".to_string(),
        members: unmatched.into_iter().collect(),
    });

    let mut packer = Packer::new(glyphs, &margins, cell);
    for bucket in &buckets {
        let used: Vec<usize> = bucket
            .members
            .iter()
            .copied()
            .filter(|&i| with_transforms.contains(&glyphs[i].codepoint))
            .collect();
        packer.add_group(&bucket.label, used)?;
    }

    let transform_glyphs = packer.next_index as usize - FIRST_GLYPH_INDEX as usize;
    let capacity = layout.glyph_capacity();
    if transform_glyphs > capacity {
        return Err(CompileError::GlyphSpaceExhausted {
            capacity,
            count: transform_glyphs,
            overflow: transform_glyphs - capacity,
        });
    }

    for bucket in &buckets {
        let plain: Vec<usize> = bucket
            .members
            .iter()
            .copied()
            .filter(|&i| !with_transforms.contains(&glyphs[i].codepoint))
            .collect();
        packer.add_group(&bucket.label, plain)?;
    }

    info!(
        "Packed {} glyphs into {} groups ({} bytes of bitmap data)",
        packer.indices.len(),
        packer.table.groups.len(),
        packer.table.data.len()
    );
    Ok(GroupPlan {
        table: packer.table,
        indices: packer.indices,
        transform_glyphs,
    })
}

struct Packer<'a> {
    glyphs: &'a [GlyphInput],
    margins: &'a [Margins],
    cell: &'a CellGeometry,
    next_index: u32,
    table: GlyphTable,
    indices: BTreeMap<char, u16>,
}

impl<'a> Packer<'a> {
    fn new(glyphs: &'a [GlyphInput], margins: &'a [Margins], cell: &'a CellGeometry) -> Self {
        Packer {
            glyphs,
            margins,
            cell,
            next_index: FIRST_GLYPH_INDEX as u32,
            table: GlyphTable::default(),
            indices: BTreeMap::new(),
        }
    }

    fn add_group(&mut self, label: &str, mut members: Vec<usize>) -> Result<(), CompileError> {
        if members.is_empty() {
            return Ok(());
        }
        members.sort_by_key(|&i| self.glyphs[i].codepoint);

        let area = members
            .iter()
            .map(|&i| self.margins[i])
            .reduce(Margins::union)
            .unwrap_or(Margins {
                left: 0,
                right: 0,
                low: 0,
                high: 0,
            });
        let (width, height) = (self.cell.width, self.cell.height);
        let (row_start, row_count, col_start, col_count) = if area.low + area.high >= height {
            (0, 0, 0, 0)
        } else {
            (
                area.low,
                height - area.low - area.high,
                area.left,
                width - area.left - area.right,
            )
        };

        let count = members.len();
        let start = self.next_index;
        let end = start as usize + count;
        if end > u16::MAX as usize + 1 {
            return Err(CompileError::TableOverflow {
                table: "glyph_index",
                bits: 16,
                value: end,
            });
        }
        let offset = self.table.data.len();
        if offset > u32::MAX as usize {
            return Err(CompileError::TableOverflow {
                table: "bitmap_data",
                bits: 32,
                value: offset,
            });
        }

        // Byte-major interleave: byte b of every row, then byte b + 1.
        let bytes_per_row = (count * col_count).div_ceil(8);
        let mut block = vec![0u8; bytes_per_row * row_count];
        for r in 0..row_count {
            let pixels: Vec<bool> = members
                .iter()
                .flat_map(|&i| {
                    let bits = self.glyphs[i].bitmap.row((row_start + r) as isize) >> col_start;
                    (0..col_count).map(move |c| bits >> c & 1 == 1)
                })
                .collect();
            for (b, byte) in pack_wide_row(&pixels).into_iter().enumerate() {
                block[b * row_count + r] = byte;
            }
        }
        self.table.data.extend_from_slice(&block);

        for (k, &i) in members.iter().enumerate() {
            self.indices.insert(self.glyphs[i].codepoint, (start as usize + k) as u16);
        }
        let group = GlyphGroup {
            start: start as u16,
            count: count as u16,
            row_start: row_start as u8,
            row_count: row_count as u8,
            col_start: col_start as u8,
            col_count: col_count as u8,
            offset: offset as u32,
        };
        debug!(
            "Group {} ({}): {} glyphs from {}, box {}x{} at ({}, {})",
            self.table.groups.len(),
            label,
            count,
            start,
            col_count,
            row_count,
            col_start,
            row_start
        );
        self.table.groups.push(group);
        self.next_index += count as u32;
        Ok(())
    }
}

#[cfg(test)]
mod tests;
