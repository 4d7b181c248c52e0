// src/diacritic/tests.rs

use super::stamper::*;
use super::*;
use test_log::test;

fn cell() -> CellGeometry {
    CellGeometry::default()
}

fn glyph(rows: &[u8]) -> CharBitmap {
    CharBitmap::from_rows(&cell(), rows)
}

// Capital-A-like block: ink on rows 2..=8.
fn capital() -> CharBitmap {
    let mut rows = [0u8; 12];
    for (i, row) in rows.iter_mut().enumerate().take(9).skip(2) {
        *row = if i % 2 == 0 { 0b011110 } else { 0b010010 };
    }
    glyph(&rows)
}

// Lowercase-a-like block: ink on rows 2..=5.
fn small() -> CharBitmap {
    glyph(&[0, 0, 0b011110, 0b010010, 0b011110, 0b001110])
}

fn mark(offset: u8, rows: &[&str], location: Option<Location>) -> DiacriticSource {
    DiacriticSource {
        offset,
        name: String::new(),
        rows: rows.iter().map(|r| r.to_string()).collect(),
        padding: 1,
        location,
        alias_of: None,
    }
}

// --- Descriptors ---

#[test]
fn test_descriptor_bit_layout() {
    let info = MarkInfo {
        bitmap_offset: 7,
        height: 3,
        padding: 2,
        location: Location::BelowRight,
    };
    let bytes = info.encode();
    assert_eq!(bytes, [7, 0b10_10_1000]);
    assert_eq!(MarkInfo::decode(bytes), Some(info));
    assert_eq!(MarkInfo::decode([UNDEFINED_MARK, 0]), None);
}

#[test]
fn test_location_inferred_from_name() {
    assert_eq!(Location::infer("COMBINING DOT BELOW"), Location::Below);
    assert_eq!(Location::infer("COMBINING CEDILLA"), Location::Below);
    assert_eq!(Location::infer("COMBINING COMMA ABOVE RIGHT"), Location::AboveRight);
    assert_eq!(Location::infer("COMBINING HORN"), Location::AboveRight);
    assert_eq!(Location::infer("COMBINING GREEK PERISPOMENI"), Location::Greek);
    assert_eq!(Location::infer("COMBINING GREEK DIALYTIKA TONOS"), Location::Above);
    assert_eq!(Location::infer("COMBINING ACUTE ACCENT"), Location::Above);
    for code in 0..10 {
        assert_eq!(Location::from_code(code).map(Location::code), Some(code));
    }
    assert_eq!(Location::from_code(10), None);
}

#[test]
fn test_compile_descriptor_range_and_aliases() {
    let mut macron = mark(0x04, &["011110"], None);
    macron.name = "COMBINING MACRON".to_string();
    let mut below = mark(0x31, &[], Some(Location::Below));
    below.alias_of = Some(0x04);
    below.padding = 0;
    let acute = mark(0x01, &["000100", "001000"], None);

    let table = DiacriticTable::compile(&[macron, below, acute], &cell()).unwrap();
    assert_eq!(table.first_mark, 0x01);
    assert_eq!(table.descriptors.len(), 0x31 - 0x01 + 1);
    // Acute has the lowest offset so its rows come first, stored bottom-up.
    assert_eq!(table.bitmaps, vec![0b000100, 0b001000, 0b011110]);
    assert_eq!(table.descriptors[1], [UNDEFINED_MARK, 0]);

    let above = table.info(0x04).unwrap();
    let under = table.info(0x31).unwrap();
    assert_eq!(above.bitmap_offset, under.bitmap_offset);
    assert_eq!(above.location, Location::Above);
    assert_eq!(under.location, Location::Below);
    assert_eq!(above.padding, 1);
    assert_eq!(under.padding, 0);
    assert_eq!(table.rows(0x31), Some(&[0b011110u8][..]));
    assert_eq!(table.info(0x00), None);
    assert_eq!(table.info(0x40), None);
}

#[test]
fn test_compile_rejects_bad_marks() {
    let tall = mark(0, &["1", "1", "1", "1", "1"], None);
    assert!(matches!(
        DiacriticTable::compile(&[tall], &cell()),
        Err(CompileError::DiacriticHeight { height: 5, .. })
    ));

    let wide = mark(0, &["1111111"], None);
    assert!(matches!(
        DiacriticTable::compile(&[wide], &cell()),
        Err(CompileError::DiacriticRowWidth { .. })
    ));

    let dup = [mark(3, &["1"], None), mark(3, &["11"], None)];
    assert_eq!(
        DiacriticTable::compile(&dup, &cell()),
        Err(CompileError::DuplicateDiacritic(3))
    );

    let mut both = mark(5, &["1"], None);
    both.alias_of = Some(3);
    assert_eq!(
        DiacriticTable::compile(&[mark(3, &["1"], None), both], &cell()),
        Err(CompileError::DiacriticBitmapConflict {
            offset: 5,
            alias_of: 3
        })
    );

    let mut dangling = mark(5, &[], None);
    dangling.alias_of = Some(9);
    assert_eq!(
        DiacriticTable::compile(&[dangling], &cell()),
        Err(CompileError::UnknownDiacriticAlias {
            offset: 5,
            alias_of: 9
        })
    );
}

#[test]
fn test_stamp_unknown_mark_is_noop() {
    let table = DiacriticTable::default();
    let mut b = capital();
    assert!(!table.stamp(0x01, &mut b, &cell()));
    assert_eq!(b, capital());
}

// --- Placement ---

#[test]
fn test_above_abuts_top_of_glyph() {
    let mut b = capital();
    stamp(&mut b, &[0b001100], Location::Above, 1, &cell());
    assert_eq!(b.row(9), 0b001100);
    assert_eq!(b.row(8), capital().row(8));

    let mut b = capital();
    stamp(&mut b, &[0b100001], Location::Above, 0, &cell());
    assert_eq!(b.row(8), capital().row(8) | 0b100001);

    let mut b = small();
    stamp(&mut b, &[0b001100], Location::Above, 2, &cell());
    assert_eq!(b.row(7), 0b001100);
    assert_eq!(b.row(6), 0);
}

#[test]
fn test_above_replaces_tittle() {
    // Dotless stem up to the midline, blank row, then the dot.
    let mut b = glyph(&[0, 0, 0b001000, 0b001000, 0b001000, 0b001000, 0, 0b001000]);
    stamp(&mut b, &[0b000100], Location::Above, 1, &cell());
    assert_eq!(b.row(7), 0);
    assert_eq!(b.row(6), 0b000100);
}

#[test]
fn test_above_on_blank_glyph_sits_high() {
    let mut b = CharBitmap::blank(&cell());
    stamp(&mut b, &[0b011110, 0b001100], Location::Above, 1, &cell());
    // start = CH - 1 - nrow
    assert_eq!(b.row(9), 0b011110);
    assert_eq!(b.row(10), 0b001100);
    assert_eq!(b.row(11), 0);
}

#[test]
fn test_above_overflow_nudges_glyph_down() {
    let mut rows = [0u8; 12];
    rows[2..=10].copy_from_slice(&[1, 2, 4, 8, 16, 32, 3, 6, 12]);
    let mut b = glyph(&rows);
    stamp(&mut b, &[0b110000, 0b000011], Location::Above, 1, &cell());
    assert_eq!(b.row(1), 1);
    assert_eq!(b.row(9), 12);
    assert_eq!(b.row(10), 0b110000);
    assert_eq!(b.row(11), 0b000011);
}

#[test]
fn test_above_overflow_shortens_duplicate_rows_first() {
    let mut rows = [0u8; 12];
    rows[2..=10].copy_from_slice(&[1, 2, 4, 8, 16, 16, 3, 6, 12]);
    let mut b = glyph(&rows);
    stamp(&mut b, &[0b100000, 0b010000], Location::Above, 1, &cell());
    // One of the two 16 rows is merged, the base stays in place.
    assert_eq!(b.row(2), 1);
    assert_eq!(&b.rows()[6..12], &[16, 3, 6, 12, 0b100000, 0b010000]);
}

#[test]
fn test_below_abuts_base_of_glyph() {
    let mut b = capital();
    stamp(&mut b, &[0b011110], Location::Below, 1, &cell());
    assert_eq!(b.row(1), 0b011110);
    assert_eq!(b.row(0), 0);
}

#[test]
fn test_below_overflow_raises_glyph() {
    let descender = [1u8, 2, 4, 8, 16, 32];
    let mut b = glyph(&descender);
    stamp(&mut b, &[0b011110], Location::Below, 1, &cell());
    assert_eq!(b.row(0), 0b011110);
    assert_eq!(&b.rows()[1..7], &descender);
}

#[test]
fn test_overlay_centres_on_midline() {
    let mut b = CharBitmap::blank(&cell());
    stamp(&mut b, &[0b111111], Location::Overlay, 1, &cell());
    assert_eq!(b.row(5), 0b111111);
    let mut b = CharBitmap::blank(&cell());
    stamp(&mut b, &[0b000001, 0b000010], Location::Overlay, 1, &cell());
    assert_eq!(b.row(4), 0b000001);
    assert_eq!(b.row(5), 0b000010);
}

#[test]
fn test_right_placements_shift_to_last_column() {
    let mut b = capital();
    stamp(&mut b, &[0b000011], Location::AboveRight, 1, &cell());
    assert_eq!(b.row(9), 0b110000);

    let mut b = CharBitmap::blank(&cell());
    stamp(&mut b, &[0b000110], Location::Right, 1, &cell());
    assert_eq!(b.row(5), 0b110000);

    let mut b = CharBitmap::blank(&cell());
    stamp(&mut b, &[0b011000], Location::Left, 1, &cell());
    assert_eq!(b.row(5), 0b000011);
}

#[test]
fn test_above_left_resolves_below() {
    let mut b = capital();
    stamp(&mut b, &[0b000100], Location::AboveLeft, 1, &cell());
    assert_eq!(b.row(1), 0b000001);
    assert_eq!(b.row(9), 0);
}

#[test]
fn test_greek_picks_by_glyph_height() {
    let mut b = small();
    stamp(&mut b, &[0b000110], Location::Greek, 1, &cell());
    assert_eq!(b.row(6), 0b000110);

    // Tall glyphs take the upper-left route.
    let mut b = capital();
    stamp(&mut b, &[0b000110], Location::Greek, 1, &cell());
    assert_eq!(b.row(1), 0b000011);
}

// --- Fallbacks ---

#[test]
fn test_fallbacks_report_failure() {
    let c = cell();
    let mut full = glyph(&[0b1; 12]);
    assert!(!nudge_down_top(&mut full, &c));
    assert!(!nudge_up_base(&mut full, &c));
    assert!(!smash_down_aggressive(&mut full, &c));
    assert!(!smash_up_aggressive(&mut full, &c));

    let mut blank = CharBitmap::blank(&c);
    assert!(!shorten_down_top(&mut blank, &c));
    assert!(!shorten_up_base(&mut blank, &c));
}

#[test]
fn test_conservative_smash_avoids_collisions() {
    let c = cell();
    let mut rows = [0u8; 12];
    rows[9] = 0b000100;
    rows[7] = 0b000100;
    let mut b = glyph(&rows);
    // Rows 10 and 8 are free: 10 sits between 11 (blank) and 9.
    assert!(smash_down_conservative(&mut b, &c));
    assert_eq!(b.row(9), 0b000100);

    let mut rows = [0u8; 12];
    rows[10] = 0b1;
    rows[8] = 0b1;
    rows[6] = 0b1;
    rows[4] = 0b1;
    let mut b = glyph(&rows);
    // Every empty row above the baseline separates colliding rows except 3.
    assert!(smash_down_conservative(&mut b, &c));
    assert_eq!(b.row(3), 0b1);
    assert_eq!(b.row(4), 0);
}

// Tiny LCG so the sweep is reproducible.
struct Lcg(u32);

impl Lcg {
    fn next(&mut self) -> u8 {
        self.0 = self.0.wrapping_mul(1664525).wrapping_add(1013904223);
        (self.0 >> 24) as u8
    }
}

#[test]
fn test_stamping_terminates_and_stays_in_cell() {
    let c = cell();
    let mask = c.row_mask();
    let mut rng = Lcg(0xC0FFEE);
    for _ in 0..400 {
        let mut rows = [0u8; 12];
        let density = rng.next() % 4;
        for row in rows.iter_mut() {
            if rng.next() % 4 < density {
                *row = rng.next() & mask;
            }
        }
        for height in 1..=4usize {
            let mark: Vec<u8> = (0..height).map(|_| rng.next() & mask | 1).collect();
            for padding in 0..=2u8 {
                for code in 0..10 {
                    let location = Location::from_code(code).unwrap();
                    let mut b = glyph(&rows);
                    // Stack several marks to drive the fallbacks hard.
                    for _ in 0..6 {
                        stamp(&mut b, &mark, location, padding, &c);
                    }
                    assert_eq!(b.rows().len(), 12);
                    assert!(b.rows().iter().all(|&r| r & !mask == 0));
                }
            }
        }
    }
}
