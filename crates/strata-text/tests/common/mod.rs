//! Shared fixtures: a deterministic face and a backend that serves it.
#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use strata_text::{
    AtlasSurface, FontBackend, FontConfig, FontContext, FontError, FontFace, FontKey, FontResult,
    GlyphBitmap, LineMetrics, MemoryAtlas,
};

/// Advance of most glyphs.
pub const WIDE: f32 = 7.25;
/// Advance of `i` and `l`.
pub const NARROW: f32 = 3.5;
/// Advance of the space.
pub const SPACE: f32 = 4.0;
/// Bitmap size of every visible glyph.
pub const GLYPH_W: u32 = 5;
pub const GLYPH_H: u32 = 7;
/// Cell size derived from the stub bounding box.
pub const CELL: u32 = 12;
/// Codepoint the stub refuses to render.
pub const BROKEN: char = '\u{E000}';

/// A face with fixed metrics: glyph index equals codepoint, every visible
/// glyph is a 5x7 block whose coverage depends on the codepoint, and the pairs
/// `AV` and `To` kern.
pub struct StubFace {
    pixel_size: u32,
    kerning_queries: Arc<AtomicUsize>,
}

impl StubFace {
    pub fn new(pixel_size: u32) -> Self {
        Self {
            pixel_size,
            kerning_queries: Arc::default(),
        }
    }
}

pub fn advance_of(ch: char) -> f32 {
    match ch {
        ' ' => SPACE,
        'i' | 'l' => NARROW,
        c if c == BROKEN => 0.0,
        _ => WIDE,
    }
}

pub fn coverage_of(codepoint: u32) -> u8 {
    (codepoint % 200 + 50) as u8
}

impl FontFace for StubFace {
    fn pixel_size(&self) -> u32 {
        self.pixel_size
    }

    fn line_metrics(&self) -> LineMetrics {
        LineMetrics {
            ascender: 11.0,
            descender: -3.0,
            line_gap: 2.0,
        }
    }

    fn bounding_box_px(&self) -> (u32, u32) {
        (10, CELL)
    }

    fn has_kerning(&self) -> bool {
        true
    }

    fn glyph_index(&self, codepoint: u32) -> u32 {
        codepoint
    }

    fn render_glyph(&self, glyph_index: u32) -> FontResult<GlyphBitmap> {
        let ch = char::from_u32(glyph_index).unwrap_or('\u{FFFD}');
        if ch == BROKEN {
            return Err(FontError::Rasterization {
                glyph_index,
                reason: "stub refuses".into(),
            });
        }
        if ch == ' ' {
            return Ok(GlyphBitmap::empty(SPACE));
        }
        Ok(GlyphBitmap {
            width: GLYPH_W,
            height: GLYPH_H,
            bearing_x: 1.0,
            bearing_y: 7.0,
            advance_x: advance_of(ch),
            coverage: vec![coverage_of(glyph_index); (GLYPH_W * GLYPH_H) as usize],
        })
    }

    fn kerning(&self, left: u32, right: u32) -> f32 {
        self.kerning_queries.fetch_add(1, Ordering::Relaxed);
        match (char::from_u32(left), char::from_u32(right)) {
            (Some('A'), Some('V')) => -2.0,
            (Some('T'), Some('o')) => -1.0,
            _ => 0.0,
        }
    }
}

/// Serves [`StubFace`]s with in-memory atlases. Paths containing `missing`
/// fail to load.
#[derive(Clone, Default)]
pub struct StubBackend {
    pub kerning_queries: Arc<AtomicUsize>,
    pub faces_opened: Arc<AtomicUsize>,
}

impl FontBackend for StubBackend {
    fn open_face(&self, key: &FontKey) -> FontResult<Box<dyn FontFace>> {
        if key.path.to_string_lossy().contains("missing") {
            return Err(FontError::Load {
                path: key.path.clone(),
                reason: "no such file".into(),
            });
        }
        self.faces_opened.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(StubFace {
            pixel_size: key.pixel_size,
            kerning_queries: Arc::clone(&self.kerning_queries),
        }))
    }

    fn create_atlas(&self, dimension: u32) -> FontResult<Box<dyn AtlasSurface>> {
        Ok(Box::new(MemoryAtlas::new(dimension)))
    }
}

/// Configuration with an empty preload set, so tests control every glyph.
pub fn bare_config() -> FontConfig {
    FontConfig::default().preload("")
}

pub fn context(config: FontConfig) -> FontContext {
    init_tracing();
    FontContext::new(StubBackend::default(), config).unwrap()
}

pub fn context_with(backend: StubBackend, config: FontConfig) -> FontContext {
    init_tracing();
    FontContext::new(backend, config).unwrap()
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}
