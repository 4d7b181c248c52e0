// src/diacritic/mod.rs

//! Combining-mark table: bitmaps plus a two-byte descriptor per mark.
//!
//! Descriptor layout, indexed by `offset - first_mark`:
//!
//! - byte 0: offset of the mark's first row in `bitmaps`, or
//!   [`UNDEFINED_MARK`] when the offset has no mark.
//! - byte 1: `(height - 1) << 6 | padding << 4 | location`.
//!
//! Mark rows are stored bottom-up, bit 0 = leftmost column. Aliased marks
//! share bitmap rows but keep their own placement and padding.

use std::collections::BTreeMap;

use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::config::CellGeometry;
use crate::error::CompileError;
use crate::glyph::CharBitmap;

pub mod stamper;

/// Descriptor byte 0 for offsets without a mark.
pub const UNDEFINED_MARK: u8 = 0xFF;
/// Tallest mark, in rows.
pub const MAX_MARK_HEIGHT: usize = 4;

/// Where a mark goes relative to the base glyph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Location {
    Above = 0,
    Below = 1,
    Overlay = 2,
    Left = 3,
    Right = 4,
    AboveLeft = 5,
    AboveRight = 6,
    BelowLeft = 7,
    BelowRight = 8,
    /// Above for short glyphs, upper left for tall ones.
    Greek = 9,
}

impl Location {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Location> {
        use Location::*;
        Some(match code {
            0 => Above,
            1 => Below,
            2 => Overlay,
            3 => Left,
            4 => Right,
            5 => AboveLeft,
            6 => AboveRight,
            7 => BelowLeft,
            8 => BelowRight,
            9 => Greek,
            _ => return None,
        })
    }

    /// Guesses the placement from a mark's name, e.g. "COMBINING DOT BELOW".
    pub fn infer(name: &str) -> Location {
        let name = name.to_uppercase().replace('_', " ");
        if name.contains("GREEK DIALYTIKA TONOS") {
            return Location::Above;
        }
        if name.contains("GREEK") {
            return Location::Greek;
        }
        if name.contains("CEDILLA") || name.contains("OGONEK") {
            return Location::Below;
        }
        if name.ends_with(" HORN") || name == "HORN" {
            return Location::AboveRight;
        }
        let suffixes = [
            ("ABOVE LEFT", Location::AboveLeft),
            ("ABOVE RIGHT", Location::AboveRight),
            ("BELOW LEFT", Location::BelowLeft),
            ("BELOW RIGHT", Location::BelowRight),
            ("LEFT", Location::Left),
            ("RIGHT", Location::Right),
            ("ABOVE", Location::Above),
            ("BELOW", Location::Below),
            ("OVERLAY", Location::Overlay),
        ];
        suffixes
            .iter()
            .find(|(suffix, _)| name.ends_with(suffix))
            .map_or(Location::Above, |&(_, loc)| loc)
    }
}

fn default_padding() -> u8 {
    1
}

/// A combining mark as authored in the font source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiacriticSource {
    /// Offset within the combining-marks block.
    pub offset: u8,
    #[serde(default)]
    pub name: String,
    /// Bitmap rows, top row first, `1`/`#` for ink.
    #[serde(default)]
    pub rows: Vec<String>,
    /// 0 overlaps the glyph, 1 abuts it, 2 leaves a gap.
    #[serde(default = "default_padding")]
    pub padding: u8,
    /// Placement; inferred from `name` when absent.
    #[serde(default)]
    pub location: Option<Location>,
    /// Reuse another mark's bitmap.
    #[serde(default)]
    pub alias_of: Option<u8>,
}

/// Unpacked descriptor for one mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MarkInfo {
    pub bitmap_offset: u8,
    pub height: usize,
    pub padding: u8,
    pub location: Location,
}

impl MarkInfo {
    pub fn encode(&self) -> [u8; 2] {
        let info = ((self.height as u8 - 1) & 0b11) << 6 | (self.padding & 0b11) << 4 | self.location.code();
        [self.bitmap_offset, info]
    }

    pub fn decode(descriptor: [u8; 2]) -> Option<MarkInfo> {
        if descriptor[0] == UNDEFINED_MARK {
            return None;
        }
        let info = descriptor[1];
        Some(MarkInfo {
            bitmap_offset: descriptor[0],
            height: ((info >> 6) & 0b11) as usize + 1,
            padding: (info >> 4) & 0b11,
            location: Location::from_code(info & 0b1111)?,
        })
    }
}

/// Compiled mark table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiacriticTable {
    /// Offset described by `descriptors[0]`.
    pub first_mark: u8,
    pub bitmaps: Vec<u8>,
    pub descriptors: Vec<[u8; 2]>,
}

fn parse_mark_rows(source: &DiacriticSource, cell: &CellGeometry) -> Result<Vec<u8>, CompileError> {
    if source.rows.is_empty() || source.rows.len() > MAX_MARK_HEIGHT {
        return Err(CompileError::DiacriticHeight {
            offset: source.offset,
            height: source.rows.len(),
        });
    }
    let mut rows = Vec::with_capacity(source.rows.len());
    // Top-down text, bottom-up storage.
    for text in source.rows.iter().rev() {
        if text.chars().count() > cell.width {
            return Err(CompileError::DiacriticRowWidth {
                offset: source.offset,
                row: text.clone(),
            });
        }
        let bits = text
            .chars()
            .enumerate()
            .filter(|(_, c)| matches!(c, '1' | '#'))
            .fold(0u8, |acc, (i, _)| acc | 1 << i);
        rows.push(bits);
    }
    Ok(rows)
}

impl DiacriticTable {
    pub fn compile(sources: &[DiacriticSource], cell: &CellGeometry) -> Result<DiacriticTable, CompileError> {
        let mut by_offset: BTreeMap<u8, &DiacriticSource> = BTreeMap::new();
        for source in sources {
            if by_offset.insert(source.offset, source).is_some() {
                return Err(CompileError::DuplicateDiacritic(source.offset));
            }
        }

        // Bitmaps first, so aliases can point at any mark.
        let mut bitmaps: Vec<u8> = Vec::new();
        let mut placed: BTreeMap<u8, (u8, usize)> = BTreeMap::new();
        for source in by_offset.values().filter(|s| s.alias_of.is_none()) {
            let rows = parse_mark_rows(source, cell)?;
            let start = bitmaps.len();
            if start + rows.len() > UNDEFINED_MARK as usize {
                return Err(CompileError::TableOverflow {
                    table: "diacritic_bitmaps",
                    bits: 8,
                    value: start + rows.len(),
                });
            }
            placed.insert(source.offset, (start as u8, rows.len()));
            bitmaps.extend(rows);
        }

        let Some((&first_mark, _)) = by_offset.first_key_value() else {
            return Ok(DiacriticTable::default());
        };
        let last_mark = by_offset.keys().next_back().copied().unwrap_or(first_mark);
        let mut descriptors = vec![[UNDEFINED_MARK, 0]; (last_mark - first_mark) as usize + 1];

        for source in by_offset.values() {
            let (bitmap_offset, height) = match source.alias_of {
                None => placed[&source.offset],
                Some(target) => {
                    if !source.rows.is_empty() {
                        return Err(CompileError::DiacriticBitmapConflict {
                            offset: source.offset,
                            alias_of: target,
                        });
                    }
                    *placed.get(&target).ok_or(CompileError::UnknownDiacriticAlias {
                        offset: source.offset,
                        alias_of: target,
                    })?
                }
            };
            let padding = if source.padding > 2 {
                warn!(
                    "Diacritic {:#04X} padding {} clamped to 2",
                    source.offset, source.padding
                );
                2
            } else {
                source.padding
            };
            let location = source.location.unwrap_or_else(|| Location::infer(&source.name));
            let info = MarkInfo {
                bitmap_offset,
                height,
                padding,
                location,
            };
            debug!("Diacritic {:#04X} {:?}: {:?}", source.offset, source.name, info);
            descriptors[(source.offset - first_mark) as usize] = info.encode();
        }

        Ok(DiacriticTable {
            first_mark,
            bitmaps,
            descriptors,
        })
    }

    /// Descriptor for the mark at `offset`, if defined.
    pub fn info(&self, offset: u8) -> Option<MarkInfo> {
        let index = offset.checked_sub(self.first_mark)? as usize;
        MarkInfo::decode(*self.descriptors.get(index)?)
    }

    /// Bottom-up rows of the mark at `offset`.
    pub fn rows(&self, offset: u8) -> Option<&[u8]> {
        let info = self.info(offset)?;
        let start = info.bitmap_offset as usize;
        self.bitmaps.get(start..start + info.height)
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Stamps the mark at `offset` onto `bitmap`. Returns false, leaving the
    /// bitmap untouched, when no such mark exists.
    pub fn stamp(&self, offset: u8, bitmap: &mut CharBitmap, cell: &CellGeometry) -> bool {
        let (Some(info), Some(rows)) = (self.info(offset), self.rows(offset)) else {
            return false;
        };
        stamper::stamp(bitmap, rows, info.location, info.padding, cell);
        true
    }
}

#[cfg(test)]
mod tests;
