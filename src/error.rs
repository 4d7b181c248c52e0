// src/error.rs

//! Build-time errors. Every variant aborts the compile; nothing is emitted.
//!
//! Decode-time code never returns these: lookups degrade to "unsupported" and
//! diacritic placement degrades to a clipped bitmap instead.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CompileError {
    // --- Aliases ---
    #[error("glyphs aliased but distinct: {glyphs:?} in alias group {group:?}")]
    AliasedDistinctGlyphs { group: String, glyphs: Vec<char> },

    #[error("duplicate alias assignment: {codepoint:?} appears in {first:?} and {second:?}")]
    DuplicateAlias {
        codepoint: char,
        first: String,
        second: String,
    },

    #[error("glyph {0:?} (canonical {1:?}) appears twice in the atlas")]
    DuplicateGlyph(char, char),

    #[error("{0:?} is defined both as a base glyph and as a decomposition")]
    ConflictingDefinition(char),

    // --- Transforms and code space ---
    #[error("transform key {0:?} is defined more than once or shares its C identifier with another key")]
    DuplicateTransformKey(String),

    #[error("transform {key}: {reason}")]
    InvalidPixelOp { key: String, reason: String },

    #[error("transform space exhausted: {needed} slots needed, at most {available} available")]
    TransformSpaceExhausted { needed: usize, available: usize },

    #[error(
        "no more than {capacity} glyphs can be used with transforms, \
         but there are {count} ({overflow} too many)"
    )]
    GlyphSpaceExhausted {
        capacity: usize,
        count: usize,
        overflow: usize,
    },

    // --- Blocks ---
    #[error("sparse block {name} spans {length} codepoints, at most 256 allowed")]
    SparseBlockTooLong { name: String, length: u32 },

    #[error("block {name} has {rows} rows of 16, at most 255 allowed")]
    BlockTooLong { name: String, rows: u32 },

    #[error("block {name} [{start:#06X}, {end:#06X}] is not aligned to 16 codepoints")]
    MisalignedBlock { name: String, start: u32, end: u32 },

    #[error("blocks {0} and {1} overlap")]
    OverlappingBlocks(String, String),

    #[error("too many {kind} blocks: index {index} does not fit in 6 bits")]
    BlockIndexOverflow { kind: &'static str, index: usize },

    #[error("table {table} overflows its {bits}-bit field with value {value}")]
    TableOverflow {
        table: &'static str,
        bits: u32,
        value: usize,
    },

    #[error("soft blocks {0} and {1} share the C identifier {2}")]
    DuplicateSoftBlock(String, String, String),

    #[error("required block {0} has no mapped codepoints")]
    EmptyRequiredBlock(String),

    // --- Diacritics ---
    #[error("diacritic at offset {offset:#04X} has {height} rows, expected 1..=4")]
    DiacriticHeight { offset: u8, height: usize },

    #[error("diacritic at offset {offset:#04X} has a row wider than the cell: {row:?}")]
    DiacriticRowWidth { offset: u8, row: String },

    #[error("diacritic at offset {offset:#04X} aliases {alias_of:#04X} but also defines its own bitmap")]
    DiacriticBitmapConflict { offset: u8, alias_of: u8 },

    #[error("diacritic at offset {0:#04X} is defined more than once")]
    DuplicateDiacritic(u8),

    #[error("diacritic at offset {offset:#04X} aliases undefined mark {alias_of:#04X}")]
    UnknownDiacriticAlias { offset: u8, alias_of: u8 },

    // --- Input shape ---
    #[error("atlas row {row} has {found} glyphs, expected {expected}")]
    AtlasShape {
        row: usize,
        found: usize,
        expected: usize,
    },

    #[error("bitmap {index} ({glyph:?}) is malformed: {reason}")]
    BitmapShape {
        index: usize,
        glyph: char,
        reason: String,
    },

    #[error("replacement glyph {0:?} is missing from the atlas")]
    MissingReplacementGlyph(char),

    #[error("required glyph {0:?} is missing from the atlas")]
    MissingRequiredGlyph(char),

    #[error("invalid config: {0}")]
    InvalidConfig(String),
}
