// src/emit/mod.rs

//! C header emission for a compiled table set.

use std::fmt::{self, Write as _};

use crate::compiler::CompiledFont;
use crate::grouping::GlyphGroup;

const VALUES_PER_LINE: usize = 12;

/// Upper-case C identifier for a transform key.
pub fn c_identifier(key: &str) -> String {
    let mut id: String = key
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
        .collect();
    if id.starts_with(|c: char| c.is_ascii_digit()) {
        id.insert(0, '_');
    }
    id
}

fn array<T, F>(out: &mut String, ctype: &str, name: &str, values: &[T], fmt_value: F) -> fmt::Result
where
    F: Fn(&T) -> String,
{
    writeln!(out, "static const {} {}[{}] = {{", ctype, name, values.len().max(1))?;
    if values.is_empty() {
        writeln!(out, "    0")?;
    }
    for chunk in values.chunks(VALUES_PER_LINE) {
        let line: Vec<String> = chunk.iter().map(&fmt_value).collect();
        writeln!(out, "    {},", line.join(", "))?;
    }
    writeln!(out, "}};\n")
}

fn group_column(groups: &[GlyphGroup], f: fn(&GlyphGroup) -> u32) -> Vec<u32> {
    groups.iter().map(f).collect()
}

fn hex8(v: &u8) -> String {
    format!("{:#04x}", v)
}

fn dec<T: fmt::Display>(v: &T) -> String {
    v.to_string()
}

/// Renders every table of `font` as C arrays and defines.
pub fn c_header(font: &CompiledFont) -> String {
    let mut out = String::new();
    // Writing into a String cannot fail.
    let _ = write_header(&mut out, font);
    out
}

fn write_header(out: &mut String, font: &CompiledFont) -> fmt::Result {
    let codes = &font.codes;
    let cell = &font.cell;
    let blocks = &font.blocks;
    let glyphs = &font.glyphs;
    let marks = &font.diacritics;

    writeln!(out, "/* Generated by cellfont. Do not edit. */")?;
    writeln!(out, "#pragma once\n#include <stdint.h>\n")?;
    writeln!(out, "#define CELL_WIDTH {}", cell.width)?;
    writeln!(out, "#define CELL_HEIGHT {}", cell.height)?;
    writeln!(out, "#define CELL_BASELINE {}", cell.baseline)?;
    writeln!(out, "#define CELL_MIDLINE {}", cell.midline)?;
    writeln!(out, "#define CELL_TOPLINE {}", cell.topline)?;
    writeln!(out, "#define CHARBITS {}", codes.char_bits)?;
    writeln!(out, "#define TRANSFORMBITS {}", codes.transform_bits())?;
    writeln!(out, "#define CHARMASK {:#06x}", codes.glyph_mask())?;
    writeln!(out, "#define REPLACEMENT_GLYPH 0")?;
    writeln!(out, "#define COMBINING_SENTINEL 1\n")?;

    writeln!(out, "/* Block directory: start row (codepoint >> 4), rows, index << 2 | kind. */")?;
    writeln!(out, "#define BLOCK_MISSING 0\n#define BLOCK_SOFT 1\n#define BLOCK_DENSE 2\n#define BLOCK_SPARSE 3")?;
    writeln!(out, "#define NUM_BLOCKS {}\n", blocks.dir_start.len())?;
    array(out, "uint16_t", "block_start", &blocks.dir_start, dec)?;
    array(out, "uint8_t", "block_rows", &blocks.dir_rows, dec)?;
    array(out, "uint8_t", "block_code", &blocks.dir_code, hex8)?;

    writeln!(out, "/* Mapped blocks, sparse first. */")?;
    array(out, "uint16_t", "block_bstart_index", &blocks.bstart_indices, dec)?;
    array(out, "uint16_t", "block_first_offset", &blocks.first_offsets, dec)?;
    array(out, "uint16_t", "block_last_offset", &blocks.last_offsets, dec)?;
    array(out, "uint16_t", "sparse_offset", &blocks.sparse_offsets, dec)?;
    array(out, "uint16_t", "sparse_nmapped", &blocks.sparse_nmapped, dec)?;
    writeln!(out, "/* Mapped offsets relative to each sparse block's first offset. */")?;
    array(out, "uint8_t", "sparse_indices", &blocks.sparse_indices, dec)?;
    writeln!(out, "/* glyph index | transform << CHARBITS */")?;
    array(out, "uint16_t", "codepoint_map", &blocks.codepoint_map, |e| format!("{:#06x}", e.0))?;

    writeln!(out, "/* Soft blocks, by directory index. */")?;
    for (i, name) in blocks.soft_names.iter().enumerate() {
        writeln!(out, "#define SOFT_{} {}", c_identifier(name), i)?;
    }
    writeln!(out)?;

    writeln!(out, "/* Glyph groups: row-packed, byte b of row r at offset + b * row_count + r. */")?;
    writeln!(out, "#define NUM_GROUPS {}", glyphs.groups.len())?;
    writeln!(out, "#define NUM_GLYPHS {}\n", glyphs.glyph_count())?;
    let column = |f: fn(&GlyphGroup) -> u32| group_column(&glyphs.groups, f);
    array(out, "uint16_t", "group_start", &column(|g| g.start as u32), dec)?;
    array(out, "uint16_t", "group_count", &column(|g| g.count as u32), dec)?;
    array(out, "uint8_t", "group_row_start", &column(|g| g.row_start as u32), dec)?;
    array(out, "uint8_t", "group_row_count", &column(|g| g.row_count as u32), dec)?;
    array(out, "uint8_t", "group_col_start", &column(|g| g.col_start as u32), dec)?;
    array(out, "uint8_t", "group_col_count", &column(|g| g.col_count as u32), dec)?;
    array(out, "uint32_t", "group_offset", &column(|g| g.offset), dec)?;
    array(out, "uint8_t", "glyph_data", &glyphs.data, hex8)?;

    writeln!(out, "/* Combining marks: descriptor = {{bitmap offset or 0xff, (h-1) << 6 | pad << 4 | location}}. */")?;
    writeln!(out, "#define FIRST_DIACRITIC {:#04x}", marks.first_mark)?;
    writeln!(out, "#define NUM_DIACRITICS {}\n", marks.descriptors.len())?;
    array(out, "uint8_t", "diacritic_bitmaps", &marks.bitmaps, hex8)?;
    let descriptors: Vec<u8> = marks.descriptors.iter().flatten().copied().collect();
    array(out, "uint8_t", "diacritic_descriptors", &descriptors, hex8)?;

    writeln!(out, "/* Transform codes. */")?;
    for entry in &font.transforms.entries {
        writeln!(
            out,
            "#define TRANSFORM_{} ({} << CHARBITS) /* {} */",
            c_identifier(&entry.key),
            entry.slot,
            entry.name
        )?;
    }
    writeln!(out, "#define NUM_DIACRITIC_TRANSFORMS {}", font.transforms.diacritic_count)?;
    writeln!(out, "#define NUM_EXTENDED_PAGES {}\n", font.transforms.extended_pages)?;

    let replacement = &font.replacement;
    writeln!(out, "/* Replacement glyph, packed with {:?}. */", replacement.options)?;
    array(out, "uint8_t", "replacement_glyph", &replacement.data, hex8)?;
    writeln!(out, "/*")?;
    for line in replacement.pseudocode("replacement_glyph").lines() {
        writeln!(out, " * {}", line.trim_start_matches("// "))?;
    }
    writeln!(out, " */")
}
