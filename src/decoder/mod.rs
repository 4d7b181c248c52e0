// src/decoder/mod.rs

//! Runtime decoding of compiled tables.
//!
//! [`Decoder`] is the stateless half: codepoint to code, code to bitmap.
//! [`GlyphRenderer`] adds the single "previous glyph" slot that combining
//! codepoints draw over. Nothing here returns an error; every miss degrades
//! to the replacement glyph.

use log::trace;

use crate::compiler::CompiledFont;
use crate::config::CellGeometry;
use crate::glyph::{CharBitmap, COMBINING_SENTINEL, REPLACEMENT_GLYPH};
use crate::transform::ops::apply_all;
use crate::transform::TransformAction;

mod renderer;
pub mod softfonts;

pub use renderer::GlyphRenderer;
pub use softfonts::{SoftBlockHandler, SoftContext, SoftGlyph, SoftRegistry};

/// Outcome of a table lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Lookup {
    Unsupported,
    /// Rendered by the handler registered for `soft_names[index]`.
    Soft { index: usize, offset: u32 },
    Mapped { glyph: u16, slot: u16 },
}

impl Lookup {
    /// `(glyph index, transform slot)`; `(0, 0)` unless mapped.
    pub fn codes(&self) -> (u16, u16) {
        match *self {
            Lookup::Mapped { glyph, slot } => (glyph, slot),
            _ => (REPLACEMENT_GLYPH, 0),
        }
    }
}

/// Where a drawn bitmap goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placement {
    /// Occupies a new cell.
    NewCell,
    /// Replaces the previously drawn cell.
    OverPrevious,
    /// The replacement glyph in a new cell.
    Replacement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rendered {
    pub bitmap: CharBitmap,
    pub placement: Placement,
}

#[derive(Debug, Clone)]
pub struct Decoder {
    font: CompiledFont,
}

impl Decoder {
    pub fn new(font: CompiledFont) -> Self {
        Decoder { font }
    }

    pub fn font(&self) -> &CompiledFont {
        &self.font
    }

    pub fn cell(&self) -> &CellGeometry {
        &self.font.cell
    }

    pub fn decode(&self, codepoint: u32) -> Lookup {
        use crate::blocks::BlockLookup;

        let lookup = match self.font.blocks.lookup(codepoint) {
            BlockLookup::Unsupported => Lookup::Unsupported,
            BlockLookup::Soft { index, offset } => Lookup::Soft { index, offset },
            BlockLookup::Mapped(entry) => Lookup::Mapped {
                glyph: entry.glyph(&self.font.codes),
                slot: entry.slot(&self.font.codes),
            },
        };
        trace!("decode U+{:04X} -> {:?}", codepoint, lookup);
        lookup
    }

    /// Code name of soft block `index`.
    pub fn soft_name(&self, index: usize) -> Option<&str> {
        self.font.blocks.soft_names.get(index).map(String::as_str)
    }

    pub fn replacement(&self) -> CharBitmap {
        self.font.replacement.unpack(&self.font.cell)
    }

    /// Unpacks base glyph `glyph`. The replacement index and indices with no
    /// group both yield the replacement glyph and return false.
    pub fn load_glyph(&self, glyph: u16, bitmap: &mut CharBitmap) -> bool {
        if glyph != REPLACEMENT_GLYPH && self.font.glyphs.load_glyph(glyph, bitmap) {
            return true;
        }
        *bitmap = self.replacement();
        false
    }

    /// Consumes extended-page transforms, returning the full glyph index and
    /// the remaining slot.
    pub fn resolve_page(&self, glyph: u16, slot: u16) -> (u16, u16) {
        match self.font.transforms.action(slot) {
            Some(TransformAction::ExtendedPage { page }) => {
                let full = glyph as u32 + ((*page as u32) << self.font.codes.char_bits);
                trace!("extended page {}: glyph {} -> {}", page, glyph, full);
                (full.min(u16::MAX as u32) as u16, 0)
            }
            _ => (glyph, slot),
        }
    }

    /// Applies the transform in `slot` to `bitmap`. Unknown slots leave it
    /// untouched.
    pub fn apply_transform(&self, slot: u16, bitmap: &mut CharBitmap) {
        if slot == 0 {
            return;
        }
        let font = &self.font;
        match font.transforms.action(slot) {
            Some(TransformAction::Diacritic { mark }) => {
                if !font.diacritics.stamp(*mark, bitmap, &font.cell) {
                    trace!("slot {}: mark {:#04X} undefined", slot, mark);
                }
            }
            Some(TransformAction::Custom { ops }) => apply_all(ops, bitmap, &font.cell, &font.diacritics),
            Some(TransformAction::ExtendedPage { .. }) | None => {
                trace!("slot {} has nothing to apply", slot);
            }
        }
    }

    /// Draws a mapped code. `previous` is the last drawn cell, used by the
    /// combining sentinel.
    pub fn draw(&self, glyph: u16, slot: u16, previous: Option<&CharBitmap>) -> Rendered {
        let (glyph, slot) = self.resolve_page(glyph, slot);
        let mut bitmap = CharBitmap::blank(&self.font.cell);
        let placement = match glyph {
            COMBINING_SENTINEL => match previous {
                Some(prev) => {
                    bitmap = *prev;
                    Placement::OverPrevious
                }
                None => Placement::NewCell,
            },
            _ => {
                if !self.load_glyph(glyph, &mut bitmap) {
                    return Rendered {
                        bitmap,
                        placement: Placement::Replacement,
                    };
                }
                Placement::NewCell
            }
        };
        self.apply_transform(slot, &mut bitmap);
        Rendered { bitmap, placement }
    }
}
