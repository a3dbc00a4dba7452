//! Real font files through the headless backend.
//!
//! Set `STRATA_TEST_FONT` to a TrueType file, otherwise a few common system
//! locations are tried. Tests return early when no font is found.

mod common;

use std::path::PathBuf;

use strata_text::{FontConfig, FontContext, FontFace, FontKey, StyleAxes, TtfFace};

const CANDIDATES: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

fn system_font() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os("STRATA_TEST_FONT") {
        return Some(PathBuf::from(path));
    }
    CANDIDATES
        .iter()
        .map(PathBuf::from)
        .find(|path| path.is_file())
}

#[test]
fn test_real_face_metrics() {
    let Some(path) = system_font() else {
        eprintln!("no system font found, skipping");
        return;
    };
    let face = TtfFace::open(&path, 16, &StyleAxes::DEFAULT).unwrap();

    let metrics = face.line_metrics();
    assert!(metrics.ascender > 0.0);
    assert!(metrics.descender <= 0.0);
    assert!(metrics.line_height() >= metrics.text_height());

    let (w, h) = face.bounding_box_px();
    assert!(w > 0 && h > 0);

    let index = face.glyph_index('A' as u32);
    assert_ne!(index, 0);
    let bitmap = face.render_glyph(index).unwrap();
    assert!(!bitmap.is_empty());
    assert_eq!(bitmap.coverage.len(), (bitmap.width * bitmap.height) as usize);
    assert!(bitmap.coverage.iter().any(|&c| c > 0));
    assert!(bitmap.advance_x > 0.0);

    let space = face.render_glyph(face.glyph_index(' ' as u32)).unwrap();
    assert!(space.is_empty());
    assert!(space.advance_x > 0.0);
}

#[test]
fn test_real_font_through_context() {
    common::init_tracing();
    let Some(path) = system_font() else {
        eprintln!("no system font found, skipping");
        return;
    };
    let mut fonts = FontContext::headless(FontConfig::default()).unwrap();
    let id = fonts.font(&FontKey::new(&path, 18)).unwrap();

    let hello = fonts.measure_width(id, b"Hello").unwrap();
    let hello_world = fonts.measure_width(id, b"Hello, world").unwrap();
    assert!(hello > 0.0);
    assert!(hello_world > hello);

    let index = fonts.index_at_width(id, b"Hello, world", hello).unwrap();
    assert!((4..=6).contains(&index), "caret at {index}");

    let larger = fonts.font_with_size(id, 36).unwrap();
    let doubled = fonts.measure_width(larger, b"Hello").unwrap();
    assert!(doubled > hello * 1.8 && doubled < hello * 2.2);
}

#[test]
fn test_unknown_axes_on_static_font_are_ignored() {
    let Some(path) = system_font() else {
        eprintln!("no system font found, skipping");
        return;
    };
    let plain = TtfFace::open(&path, 16, &StyleAxes::DEFAULT).unwrap();
    let axes = StyleAxes::DEFAULT
        .with_weight(900)
        .with_slant(-12)
        .with_width(50);
    let styled = TtfFace::open(&path, 16, &axes).unwrap();
    assert_eq!(plain.line_metrics(), styled.line_metrics());
    assert_eq!(styled.variations().count(), 0);

    let index = styled.glyph_index('W' as u32);
    assert_eq!(index, plain.glyph_index('W' as u32));
    let a = plain.render_glyph(index).unwrap();
    let b = styled.render_glyph(index).unwrap();
    assert_eq!(a.coverage, b.coverage);
    assert_eq!(a.advance_x, b.advance_x);
}

#[test]
fn test_repeated_rendering_is_stable() {
    let Some(path) = system_font() else {
        eprintln!("no system font found, skipping");
        return;
    };
    let face = TtfFace::open(&path, 20, &StyleAxes::DEFAULT).unwrap();
    let index = face.glyph_index('g' as u32);
    let first = face.render_glyph(index).unwrap();
    for _ in 0..3 {
        assert_eq!(face.render_glyph(index).unwrap(), first);
    }
    assert_eq!(face.kerning(index, index), face.kerning(index, index));
}
