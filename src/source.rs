// src/source.rs

//! The pre-parsed font description consumed by the compiler.
//!
//! Everything here arrives already tokenised: block records, the glyph atlas
//! as rows of characters, one pixel matrix per atlas slot, alias groups,
//! decomposition rules, transform definitions and combining marks.

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::blocks::BlockInfo;
use crate::config::Config;
use crate::diacritic::DiacriticSource;
use crate::error::CompileError;
use crate::glyph::CharBitmap;
use crate::transform::TransformDef;

/// `composed` is drawn as `base` with transform `transform` applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decomposition {
    pub composed: char,
    pub base: char,
    pub transform: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontSource {
    pub blocks: Vec<BlockInfo>,
    /// Glyph grid rows; every row but the last is `atlas.columns` wide.
    pub atlas: Vec<String>,
    /// Pixel matrix for each atlas slot, top row first.
    pub bitmaps: Vec<Vec<String>>,
    pub aliases: Vec<String>,
    pub decompositions: Vec<Decomposition>,
    pub transforms: Vec<TransformDef>,
    pub diacritics: Vec<DiacriticSource>,
}

/// One non-filler atlas slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtlasGlyph {
    pub slot: usize,
    pub codepoint: char,
    pub bitmap: CharBitmap,
}

impl FontSource {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading font source {}", path.display()))?;
        serde_json::from_str(&text).with_context(|| format!("parsing font source {}", path.display()))
    }

    /// Walks the atlas grid and parses each slot's bitmap. Spaces after the
    /// first one are filler and skipped.
    pub fn atlas_glyphs(&self, config: &Config) -> Result<Vec<AtlasGlyph>, CompileError> {
        let columns = config.atlas.columns;
        let last = self.atlas.len().saturating_sub(1);
        let mut glyphs = Vec::new();
        let mut seen_space = false;

        for (row, text) in self.atlas.iter().enumerate() {
            let found = text.chars().count();
            if found > columns || (row < last && found != columns) {
                return Err(CompileError::AtlasShape {
                    row,
                    found,
                    expected: columns,
                });
            }
            for (col, codepoint) in text.chars().enumerate() {
                if codepoint == ' ' {
                    if seen_space {
                        continue;
                    }
                    seen_space = true;
                }
                let slot = row * columns + col;
                let bitmap = self.parse_bitmap(slot, codepoint, config)?;
                glyphs.push(AtlasGlyph {
                    slot,
                    codepoint,
                    bitmap,
                });
            }
        }
        Ok(glyphs)
    }

    fn parse_bitmap(&self, slot: usize, codepoint: char, config: &Config) -> Result<CharBitmap, CompileError> {
        let cell = &config.cell;
        let shape_error = |reason: String| CompileError::BitmapShape {
            index: slot,
            glyph: codepoint,
            reason,
        };
        let rows = self
            .bitmaps
            .get(slot)
            .ok_or_else(|| shape_error("no bitmap for this atlas slot".to_string()))?;
        if rows.len() != cell.height {
            return Err(shape_error(format!("{} rows, expected {}", rows.len(), cell.height)));
        }

        let mut bitmap = CharBitmap::blank(cell);
        // Text is top-down; row 0 of the bitmap is the bottom.
        for (i, text) in rows.iter().rev().enumerate() {
            if text.chars().count() != cell.width {
                return Err(shape_error(format!("row {:?} is not {} pixels wide", text, cell.width)));
            }
            let mut bits = 0u8;
            for (col, c) in text.chars().enumerate() {
                match c {
                    '1' | '#' => bits |= 1 << col,
                    '0' | '.' => {}
                    other => return Err(shape_error(format!("unexpected pixel {:?}", other))),
                }
            }
            bitmap.set_row(i as isize, bits);
        }
        Ok(bitmap)
    }
}
