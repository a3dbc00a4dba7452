//! Atlas layers grow without moving glyphs.

mod common;

use common::{CELL, bare_config, context};
use strata_text::{CellLocation, FontError, FontKey};

/// 48px layers with 12px cells: 4 per row, 16 per layer.
const ATLAS: u32 = 48;

#[test]
fn test_spill_grows_exactly_one_layer() {
    let mut fonts = context(bare_config().atlas_size(ATLAS));
    let id = fonts.font(&FontKey::new("stub.ttf", 14)).unwrap();
    let font = fonts.instance_mut(id).unwrap();
    assert_eq!(font.cell_size(), CELL);
    assert_eq!(font.glyphs_per_layer(), 16);

    let first_layer: Vec<char> = ('a'..='p').collect();
    let mut placed: Vec<(CellLocation, u8)> = Vec::new();
    for &c in &first_layer {
        let cell = font.ensure_glyph(c as u32).unwrap().cell.unwrap();
        let pixel = font.atlas().read(cell.x, cell.y, cell.layer).unwrap();
        placed.push((cell, pixel));
    }
    assert_eq!(font.layer_count(), 1);
    assert_eq!(font.atlas_stats().layer_growths, 0);
    assert!(placed.iter().all(|(cell, _)| cell.layer == 0));

    let spilled = font.ensure_glyph('q' as u32).unwrap().cell.unwrap();
    assert_eq!(spilled, CellLocation { x: 0, y: 0, layer: 1 });
    assert_eq!(font.layer_count(), 2);
    assert_eq!(font.atlas_stats().layer_growths, 1);

    for (&c, (cell, pixel)) in first_layer.iter().zip(&placed) {
        let entry = *font.glyphs().get(c as u32).unwrap();
        assert_eq!(entry.cell, Some(*cell));
        assert_eq!(font.atlas().read(cell.x, cell.y, cell.layer), Some(*pixel));
    }

    // The rest of layer 1 fills without another growth.
    for c in 'r'..='z' {
        font.ensure_glyph(c as u32).unwrap();
    }
    assert_eq!(font.layer_count(), 2);
    assert_eq!(font.atlas_stats().layer_growths, 1);
}

#[test]
fn test_cells_follow_ordinal_order() {
    let mut fonts = context(bare_config().atlas_size(ATLAS));
    let id = fonts.font(&FontKey::new("stub.ttf", 14)).unwrap();
    let font = fonts.instance_mut(id).unwrap();

    font.measure_width(b"abcdef").unwrap();
    let f = font.glyphs().get('f' as u32).unwrap();
    assert_eq!(f.ordinal, 5);
    // col = 5 % 4, row = (5 % 16) / 4
    assert_eq!(f.cell, Some(CellLocation { x: CELL, y: CELL, layer: 0 }));
}

#[test]
fn test_space_consumes_ordinal_but_no_cell() {
    let mut fonts = context(bare_config().atlas_size(ATLAS));
    let id = fonts.font(&FontKey::new("stub.ttf", 14)).unwrap();
    let font = fonts.instance_mut(id).unwrap();

    font.measure_width(b" a").unwrap();
    let space = font.glyphs().get(' ' as u32).unwrap();
    assert_eq!(space.cell, None);
    let a = font.glyphs().get('a' as u32).unwrap();
    assert_eq!(a.ordinal, 1);
    assert_eq!(a.cell, Some(CellLocation { x: CELL, y: 0, layer: 0 }));
}

#[test]
fn test_cell_larger_than_atlas_is_rejected() {
    let mut fonts = context(bare_config().atlas_size(8));
    let err = fonts.font(&FontKey::new("stub.ttf", 14)).unwrap_err();
    assert!(matches!(
        err,
        FontError::CellTooLarge {
            cell_size: CELL,
            atlas_size: 8
        }
    ));
    assert!(fonts.cache().is_empty());
}

#[test]
fn test_empty_glyph_on_layer_boundary_grows_atlas() {
    let mut fonts = context(bare_config().atlas_size(ATLAS));
    let id = fonts.font(&FontKey::new("stub.ttf", 14)).unwrap();
    let font = fonts.instance_mut(id).unwrap();

    font.measure_width(b"abcdefghijklmnop").unwrap();
    assert_eq!(font.layer_count(), 1);

    let space = font.ensure_glyph(' ' as u32).unwrap();
    assert_eq!(space.ordinal, 16);
    assert_eq!(space.cell, None);
    assert_eq!(space.layer(), 1);
    assert_eq!(font.layer_count(), 2);
    assert_eq!(font.atlas_stats().layer_growths, 1);

    let q = font.ensure_glyph('q' as u32).unwrap();
    assert_eq!(q.cell, Some(CellLocation { x: CELL, y: 0, layer: 1 }));
    assert_eq!(font.atlas_stats().layer_growths, 1);
}

#[test]
fn test_every_entry_records_its_layer() {
    let mut fonts = context(bare_config().atlas_size(ATLAS));
    let id = fonts.font(&FontKey::new("stub.ttf", 14)).unwrap();
    let font = fonts.instance_mut(id).unwrap();

    font.measure_width("abcdefghijklmno p q\u{E000}".as_bytes()).unwrap();
    for entry in font.glyphs().entries() {
        assert_eq!(entry.layer(), entry.ordinal / 16);
        if let Some(cell) = entry.cell {
            assert_eq!(cell.layer, entry.layer());
        }
    }
}
