// src/grouping/tests.rs

use super::*;
use test_log::test;

fn cell() -> CellGeometry {
    CellGeometry::default()
}

fn input(codepoint: char, rows: &[u8]) -> GlyphInput {
    GlyphInput {
        codepoint,
        bitmap: CharBitmap::from_rows(&cell(), rows),
    }
}

fn seed(glyph: char, require_left_margin: bool) -> SeedSpec {
    SeedSpec {
        glyph,
        require_left_margin,
    }
}

// Small deterministic font: x-height letters, capitals, a descender, a blank.
fn font() -> Vec<GlyphInput> {
    vec![
        input('a', &[0, 0, 0b011110, 0b010010, 0b011100, 0b011110]),
        input('c', &[0, 0, 0b011100, 0b000010, 0b000010, 0b011100]),
        input('A', &[0, 0, 0b010001, 0b011111, 0b010001, 0b010001, 0b001010, 0b000100, 0b000100]),
        input('H', &[0, 0, 0b010001, 0b010001, 0b011111, 0b010001, 0b010001, 0b010001, 0b010001]),
        input('g', &[0b001110, 0b010000, 0b011110, 0b010010, 0b011110]),
        input('|', &[0b1; 12]),
        input(' ', &[]),
    ]
}

fn used(s: &str) -> BTreeSet<char> {
    s.chars().collect()
}

#[test]
fn test_margins() {
    let c = cell();
    let blank = CharBitmap::blank(&c);
    assert_eq!(
        Margins::of(&blank),
        Margins {
            left: 6,
            right: 6,
            low: 12,
            high: 12
        }
    );
    let a = CharBitmap::from_rows(&c, &[0, 0, 0b011110, 0b010010, 0b011100, 0b011110]);
    assert_eq!(
        Margins::of(&a),
        Margins {
            left: 1,
            right: 1,
            low: 2,
            high: 6
        }
    );
}

#[test]
fn test_every_glyph_round_trips_through_its_group() {
    let glyphs = font();
    let plan = plan_groups(
        &glyphs,
        &used("aA"),
        &[seed('a', true), seed('A', true)],
        &cell(),
        &CodeLayout::default(),
    )
    .unwrap();

    assert_eq!(plan.indices.len(), glyphs.len());
    assert_eq!(plan.table.glyph_count(), glyphs.len());
    for g in &glyphs {
        let index = plan.indices[&g.codepoint];
        let mut out = CharBitmap::blank(&cell());
        out.set_row(11, 0b111111);
        assert!(plan.table.load_glyph(index, &mut out));
        assert_eq!(out, g.bitmap, "glyph {:?} at index {}", g.codepoint, index);
    }
}

#[test]
fn test_transform_glyphs_come_first() {
    let glyphs = font();
    let plan = plan_groups(
        &glyphs,
        &used("Ag"),
        &[seed('a', true), seed('A', true)],
        &cell(),
        &CodeLayout::default(),
    )
    .unwrap();
    assert_eq!(plan.transform_glyphs, 2);
    // Neither fits the x-height seed; both land in the catch-all group,
    // ordered by codepoint.
    assert_eq!(plan.indices[&'A'], 2);
    assert_eq!(plan.indices[&'g'], 3);
    assert!(plan.indices.values().all(|&i| i >= FIRST_GLYPH_INDEX));
    assert_eq!(plan.table.groups[0].start, 2);
}

#[test]
fn test_seed_groups_share_a_box() {
    let glyphs = font();
    let plan = plan_groups(
        &glyphs,
        &used(""),
        &[seed('a', true)],
        &cell(),
        &CodeLayout::default(),
    )
    .unwrap();
    // 'a', 'c' and the blank fit the x-height box.
    let group = plan.table.find_group(plan.indices[&'a']).unwrap();
    assert_eq!(group.count, 3);
    assert_eq!((group.row_start, group.row_count), (2, 4));
    assert_eq!((group.col_start, group.col_count), (1, 4));
    assert_eq!(plan.table.find_group(plan.indices[&'c']), Some(group));
    assert_eq!(plan.table.find_group(plan.indices[&' ']), Some(group));
}

#[test]
fn test_groups_partition_index_range() {
    let glyphs = font();
    let plan = plan_groups(
        &glyphs,
        &used("a|"),
        &[seed('a', true), seed('A', false)],
        &cell(),
        &CodeLayout::default(),
    )
    .unwrap();
    let mut next = FIRST_GLYPH_INDEX;
    for g in &plan.table.groups {
        assert_eq!(g.start, next);
        assert!(g.count > 0);
        next += g.count;
    }
    assert_eq!(plan.table.find_group(0), None);
    assert_eq!(plan.table.find_group(1), None);
    assert_eq!(plan.table.find_group(next), None);
    assert!(plan.table.find_group(next - 1).is_some());
}

#[test]
fn test_blank_only_group_is_empty_box() {
    let glyphs = vec![input(' ', &[]), input('\u{2003}', &[])];
    let plan = plan_groups(&glyphs, &used(""), &[], &cell(), &CodeLayout::default()).unwrap();
    let g = plan.table.groups[0];
    assert_eq!((g.row_start, g.row_count, g.col_start, g.col_count), (0, 0, 0, 0));
    assert!(plan.table.data.is_empty());
    let mut out = CharBitmap::from_rows(&cell(), &[0xFF; 12]);
    assert!(plan.table.load_glyph(3, &mut out));
    assert!(out.is_blank());
}

#[test]
fn test_glyph_space_exhausted_counts_transform_glyphs_only() {
    // 3 index bits: 6 usable glyph indices.
    let layout = CodeLayout::with_char_bits(3);
    let glyphs: Vec<GlyphInput> = "abcdefg"
        .chars()
        .enumerate()
        .map(|(i, c)| input(c, &[0, 0, 1 << (i % 6)]))
        .collect();

    let err = plan_groups(&glyphs, &used("abcdefg"), &[], &cell(), &layout).unwrap_err();
    assert_eq!(
        err,
        CompileError::GlyphSpaceExhausted {
            capacity: 6,
            count: 7,
            overflow: 1
        }
    );

    let plan = plan_groups(&glyphs, &used("ab"), &[], &cell(), &layout).unwrap();
    assert_eq!(plan.transform_glyphs, 2);
    assert_eq!(plan.indices[&'g'], 8);
}

#[test]
fn test_wide_bitmap_spans_bytes() {
    // Twelve 6-wide glyphs force rows across byte boundaries.
    let glyphs: Vec<GlyphInput> = (0..12u8)
        .map(|i| {
            let c = char::from(b'A' + i);
            input(c, &[0, 0, 0b100001 | (i & 0b011110), 0b010010, 0b001100])
        })
        .collect();
    let plan = plan_groups(&glyphs, &used(""), &[], &cell(), &CodeLayout::default()).unwrap();
    assert_eq!(plan.table.groups.len(), 1);
    let g = plan.table.groups[0];
    assert_eq!((g.col_count, g.row_count), (6, 3));
    assert_eq!(plan.table.data.len(), 9 * 3);
    for glyph in &glyphs {
        let mut out = CharBitmap::blank(&cell());
        plan.table.load_glyph(plan.indices[&glyph.codepoint], &mut out);
        assert_eq!(out, glyph.bitmap);
    }
}
