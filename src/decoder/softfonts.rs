// src/decoder/softfonts.rs

//! Handlers for soft blocks: ranges drawn by code instead of table lookups.

use std::collections::HashMap;

use log::debug;

use crate::config::CellGeometry;
use crate::diacritic::DiacriticTable;
use crate::glyph::CharBitmap;

pub const BRAILLE_PATTERNS: &str = "braillepatterns";
pub const COMBINING_MARKS: &str = "combiningdiacriticalmarks";

/// What a handler may look at.
#[derive(Debug, Clone, Copy)]
pub struct SoftContext<'a> {
    pub cell: &'a CellGeometry,
    pub previous: Option<&'a CharBitmap>,
    pub diacritics: &'a DiacriticTable,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SoftGlyph {
    pub bitmap: CharBitmap,
    /// Draw over the previous cell instead of a new one.
    pub combining: bool,
}

pub trait SoftBlockHandler: Send + Sync {
    /// Renders the codepoint at `offset` from the block start, or `None` when
    /// the handler has nothing for it.
    fn render(&self, offset: u32, ctx: &SoftContext) -> Option<SoftGlyph>;
}

/// Handlers by block code name.
pub struct SoftRegistry {
    handlers: HashMap<String, Box<dyn SoftBlockHandler>>,
}

impl SoftRegistry {
    pub fn empty() -> Self {
        SoftRegistry {
            handlers: HashMap::new(),
        }
    }

    pub fn register<H: SoftBlockHandler + 'static>(&mut self, name: &str, handler: H) {
        debug!("Registering soft block handler for {}", name);
        self.handlers.insert(name.to_string(), Box::new(handler));
    }

    pub fn get(&self, name: &str) -> Option<&dyn SoftBlockHandler> {
        self.handlers.get(name).map(|h| h.as_ref())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }
}

impl Default for SoftRegistry {
    fn default() -> Self {
        let mut registry = SoftRegistry::empty();
        registry.register(BRAILLE_PATTERNS, BraillePatterns);
        registry.register(COMBINING_MARKS, CombiningMarks);
        registry
    }
}

impl std::fmt::Debug for SoftRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut names: Vec<&String> = self.handlers.keys().collect();
        names.sort();
        f.debug_struct("SoftRegistry").field("handlers", &names).finish()
    }
}

/// U+2800..U+28FF: a 2x4 grid of dots, one bit per dot.
///
/// Bits 0-2 are the left column top to bottom, bits 3-5 the right column,
/// bit 6 the bottom left dot and bit 7 the bottom right dot.
#[derive(Debug, Clone, Copy, Default)]
pub struct BraillePatterns;

impl BraillePatterns {
    /// (column, row from top) of each dot bit.
    const DOTS: [(usize, usize); 8] = [(0, 0), (0, 1), (0, 2), (1, 0), (1, 1), (1, 2), (0, 3), (1, 3)];
}

impl SoftBlockHandler for BraillePatterns {
    fn render(&self, offset: u32, ctx: &SoftContext) -> Option<SoftGlyph> {
        let pattern = u8::try_from(offset).ok()?;
        let cell = ctx.cell;
        let (half, quarter) = (cell.width / 2, cell.height / 4);
        let dot_w = half.saturating_sub(1).max(1);
        let dot_h = quarter.saturating_sub(1).max(1);
        let dot_bits = ((1u16 << dot_w) - 1) as u8;

        let mut bitmap = CharBitmap::blank(cell);
        for (bit, &(col, row)) in Self::DOTS.iter().enumerate() {
            if pattern >> bit & 1 == 0 {
                continue;
            }
            let x = col * half + half.saturating_sub(dot_w) / 2;
            let top = cell.height - row * quarter - (quarter - dot_h) / 2;
            for r in top - dot_h..top {
                bitmap.or_row(r as isize, dot_bits << x);
            }
        }
        Some(SoftGlyph {
            bitmap,
            combining: false,
        })
    }
}

/// U+0300..U+036F: stamps the mark onto the previous cell, or onto a blank
/// cell when nothing precedes it.
#[derive(Debug, Clone, Copy, Default)]
pub struct CombiningMarks;

impl SoftBlockHandler for CombiningMarks {
    fn render(&self, offset: u32, ctx: &SoftContext) -> Option<SoftGlyph> {
        let mark = u8::try_from(offset).ok()?;
        let mut bitmap = ctx.previous.copied().unwrap_or_else(|| CharBitmap::blank(ctx.cell));
        if !ctx.diacritics.stamp(mark, &mut bitmap, ctx.cell) {
            return None;
        }
        Some(SoftGlyph {
            bitmap,
            combining: ctx.previous.is_some(),
        })
    }
}
