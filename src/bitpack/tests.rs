// src/bitpack/tests.rs

use super::*;
use crate::config::CellGeometry;
use crate::glyph::CharBitmap;
use test_log::test;

// Deterministic pseudo-random fill so every size gets a varied pattern.
fn patterned(nrows: usize, ncols: usize, seed: u32) -> PixelMatrix {
    let mut state = seed.wrapping_mul(2654435761).wrapping_add(12345);
    let mut m = PixelMatrix::new(nrows, ncols);
    for r in 0..nrows {
        for c in 0..ncols {
            state = state.wrapping_mul(1103515245).wrapping_add(12345);
            m.set(r, c, state >> 16 & 1 == 1);
        }
    }
    m
}

#[test]
fn test_pack_row_lsb_first() {
    assert_eq!(pack_row(&[true, false, false, false, false, false]), 0b000001);
    assert_eq!(pack_row(&[false, false, false, false, false, true]), 0b100000);
    assert_eq!(pack_row(&[]), 0);
}

#[test]
fn test_pack_wide_row_spills_into_next_byte() {
    let mut pixels = vec![false; 10];
    pixels[0] = true;
    pixels[9] = true;
    assert_eq!(pack_wide_row(&pixels), vec![0b0000_0001, 0b0000_0010]);
}

#[test]
fn test_default_options_start_at_bottom_row() {
    // 2x8: top row has only the leftmost pixel, bottom row is solid.
    let m = PixelMatrix::from_rows(vec![
        vec![true, false, false, false, false, false, false, false],
        vec![true; 8],
    ])
    .unwrap();
    assert_eq!(pack_bits(&m, PackOptions::default()), vec![0xFF, 0x01]);
    assert_eq!(pack_bits(&m, PackOptions::empty()), vec![0x01, 0xFF]);
}

#[test]
fn test_horizontal_mirror_and_bit_reversal() {
    let m = PixelMatrix::from_rows(vec![vec![
        true, true, false, false, false, false, false, false,
    ]])
    .unwrap();
    assert_eq!(pack_bits(&m, PackOptions::MIRROR_HORIZONTAL), vec![0b1100_0000]);
    assert_eq!(pack_bits(&m, PackOptions::REVERSE_BITS), vec![0b1100_0000]);
    assert_eq!(
        pack_bits(&m, PackOptions::MIRROR_HORIZONTAL | PackOptions::REVERSE_BITS),
        vec![0b0000_0011]
    );
}

#[test]
fn test_sideways_packs_columns() {
    // 8 rows x 1 column, only the top pixel set.
    let mut m = PixelMatrix::new(8, 1);
    m.set(0, 0, true);
    assert_eq!(pack_bits(&m, PackOptions::SIDEWAYS), vec![0b0000_0001]);
    assert_eq!(
        pack_bits(&m, PackOptions::SIDEWAYS | PackOptions::MIRROR_VERTICAL),
        vec![0b1000_0000]
    );
}

#[test]
fn test_narrow_rows_share_bytes() {
    let m = PixelMatrix::from_rows(vec![vec![true; 6]; 2]).unwrap();
    let packed = pack_bits(&m, PackOptions::default());
    assert_eq!(packed, vec![0xFF, 0x0F]);
}

#[test]
fn test_default_plan_round_trip_all_sizes() {
    for nrows in 1..=12 {
        for ncols in 1..=8 {
            let m = patterned(nrows, ncols, (nrows * 16 + ncols) as u32);
            let data = pack_bits(&m, PackOptions::default());
            let plan = UnpackPlan::for_options(PackOptions::default(), nrows, ncols)
                .expect("default options have a plan");
            let rows = plan.apply(&data);
            assert_eq!(rows, m.to_bottom_up_rows(), "size {}x{}", nrows, ncols);
            assert_eq!(PixelMatrix::from_bottom_up_rows(&rows, ncols), m);
        }
    }
}

#[test]
fn test_general_unpack_inverts_every_option_set() {
    for bits in 0..16u8 {
        let options = PackOptions::from_bits_truncate(bits);
        for (nrows, ncols) in [(12, 6), (3, 8), (5, 7), (1, 1)] {
            let m = patterned(nrows, ncols, bits as u32 + 7);
            let data = pack_bits(&m, options);
            assert_eq!(unpack_bits(&data, options, nrows, ncols), m, "{:?}", options);
        }
    }
}

#[test]
fn test_plan_only_for_default_options() {
    assert!(UnpackPlan::for_options(PackOptions::MIRROR_VERTICAL, 12, 6).is_some());
    assert!(UnpackPlan::for_options(PackOptions::empty(), 12, 6).is_none());
    assert!(UnpackPlan::for_options(PackOptions::default() | PackOptions::SIDEWAYS, 12, 6).is_none());

    let doc = unpack_pseudocode(PackOptions::SIDEWAYS, 12, 6, "replacement_glyph");
    assert!(doc.contains("manual decode only"));
    let doc = unpack_pseudocode(PackOptions::default(), 12, 6, "replacement_glyph");
    assert!(doc.contains("rows[0] = (replacement_glyph[0] >> 0) & 0x3f;"));
    assert!(doc.contains("rows[1] = ((replacement_glyph[0] >> 6) | (replacement_glyph[1] << 2)) & 0x3f;"));
    assert!(doc.contains("rows[11] = (replacement_glyph[8] >> 2) & 0x3f;"));
}

/// Every `data[i]` the generated procedure mentions.
fn data_indices(doc: &str, data_name: &str) -> Vec<usize> {
    let open = format!("{}[", data_name);
    doc.match_indices(&open)
        .filter_map(|(at, _)| {
            let rest = &doc[at + open.len()..];
            rest[..rest.find(']')?].parse().ok()
        })
        .collect()
}

#[test]
fn test_plan_never_reads_past_the_data() {
    for nrows in 1..=12 {
        for ncols in 1..=8 {
            let m = patterned(nrows, ncols, (nrows * 31 + ncols) as u32);
            let data = pack_bits(&m, PackOptions::default());
            let plan = UnpackPlan::for_options(PackOptions::default(), nrows, ncols).unwrap();
            let indices = data_indices(&plan.pseudocode("data", "rows"), "data");
            assert!(!indices.is_empty());
            assert!(
                indices.iter().all(|&i| i < data.len()),
                "size {}x{} reads {:?} of {} bytes",
                nrows,
                ncols,
                indices,
                data.len()
            );
            // Truncated input: the Rust procedure must agree without padding.
            assert_eq!(plan.apply(&data), m.to_bottom_up_rows());
        }
    }
}

#[test]
fn test_ragged_matrix_rejected() {
    assert!(PixelMatrix::from_rows(vec![vec![true; 3], vec![true; 2]]).is_none());
}

#[test]
fn test_packed_cell_round_trip() {
    let cell = CellGeometry::default();
    let rows = [0b011110u8, 0b100001, 0b101101, 0b110011, 0b101101, 0b100001, 0b011110];
    let bitmap = CharBitmap::from_rows(&cell, &rows);
    for options in [PackOptions::default(), PackOptions::SIDEWAYS | PackOptions::REVERSE_BITS] {
        let packed = PackedCell::pack(&bitmap, options);
        assert_eq!(packed.data.len(), 12 * 6 / 8);
        assert_eq!(packed.unpack(&cell), bitmap);
    }
    let packed = PackedCell::pack(&bitmap, PackOptions::default());
    let plan = UnpackPlan::for_options(packed.options, packed.nrows, packed.ncols).unwrap();
    assert_eq!(&plan.apply(&packed.data)[..], bitmap.rows());
}
