// src/decoder/renderer.rs

use log::{debug, trace};

use super::{Decoder, Lookup, Placement, Rendered, SoftContext, SoftRegistry};
use crate::glyph::CharBitmap;

/// Draws codepoints one at a time, remembering the last drawn cell.
///
/// The previous-glyph slot is written only after a successful draw and is
/// cleared whenever the replacement glyph is drawn.
#[derive(Debug)]
pub struct GlyphRenderer {
    decoder: Decoder,
    soft: SoftRegistry,
    previous: Option<CharBitmap>,
}

impl GlyphRenderer {
    pub fn new(decoder: Decoder) -> Self {
        Self::with_registry(decoder, SoftRegistry::default())
    }

    pub fn with_registry(decoder: Decoder, soft: SoftRegistry) -> Self {
        GlyphRenderer {
            decoder,
            soft,
            previous: None,
        }
    }

    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    pub fn previous(&self) -> Option<&CharBitmap> {
        self.previous.as_ref()
    }

    /// Forgets the previous cell, e.g. at a line break.
    pub fn reset(&mut self) {
        self.previous = None;
    }

    pub fn render(&mut self, codepoint: u32) -> Rendered {
        let rendered = match self.decoder.decode(codepoint) {
            Lookup::Unsupported => self.replacement(),
            Lookup::Soft { index, offset } => self.render_soft(index, offset),
            Lookup::Mapped { glyph, slot } => self.decoder.draw(glyph, slot, self.previous.as_ref()),
        };
        trace!("U+{:04X} drawn as {:?}", codepoint, rendered.placement);
        self.previous = match rendered.placement {
            Placement::Replacement => None,
            _ => Some(rendered.bitmap),
        };
        rendered
    }

    fn render_soft(&self, index: usize, offset: u32) -> Rendered {
        let Some(name) = self.decoder.soft_name(index) else {
            return self.replacement();
        };
        let Some(handler) = self.soft.get(name) else {
            debug!("No handler for soft block {}", name);
            return self.replacement();
        };
        let font = self.decoder.font();
        let ctx = SoftContext {
            cell: &font.cell,
            previous: self.previous.as_ref(),
            diacritics: &font.diacritics,
        };
        match handler.render(offset, &ctx) {
            Some(glyph) => Rendered {
                bitmap: glyph.bitmap,
                placement: if glyph.combining {
                    Placement::OverPrevious
                } else {
                    Placement::NewCell
                },
            },
            None => self.replacement(),
        }
    }

    fn replacement(&self) -> Rendered {
        Rendered {
            bitmap: self.decoder.replacement(),
            placement: Placement::Replacement,
        }
    }
}
