//! A loaded, sized font.
//!
//! A [`FontInstance`] exclusively owns its face, its glyph cache and its atlas.
//! Its cell size is fixed at construction from the face bounding box, so a
//! different pixel size always means a different instance.

use std::collections::HashMap;

use tracing::debug;

use crate::atlas::{AtlasPageStore, AtlasStats, AtlasSurface};
use crate::config::FontConfig;
use crate::error::FontResult;
use crate::face::{FontFace, LineMetrics};
use crate::font_cache::FontKey;
use crate::glyph_cache::{GammaTable, GlyphCache, GlyphCacheStats, GlyphEntry};
use crate::logging::targets;

/// One font face at one pixel size and style-axis position.
pub struct FontInstance {
    key: FontKey,
    face: Box<dyn FontFace>,
    metrics: LineMetrics,
    glyphs: GlyphCache,
    atlas: AtlasPageStore,
    kerning: HashMap<(u32, u32), f32>,
}

impl FontInstance {
    /// Build an instance around an opened face and a fresh one-layer atlas,
    /// then rasterize the configured preload set.
    pub fn new(
        key: FontKey,
        face: Box<dyn FontFace>,
        surface: Box<dyn AtlasSurface>,
        config: &FontConfig,
    ) -> FontResult<Self> {
        let (bbox_w, bbox_h) = face.bounding_box_px();
        let cell_size = bbox_w.max(bbox_h);
        let atlas = AtlasPageStore::new(surface, cell_size)?;

        let mut font = Self {
            metrics: face.line_metrics(),
            glyphs: GlyphCache::with_table(
                config.glyph_table_capacity,
                config.glyph_table_growth,
                GammaTable::new(config.gamma),
            ),
            kerning: HashMap::new(),
            key,
            face,
            atlas,
        };

        for ch in config.preload.chars() {
            font.ensure_glyph(u32::from(ch))?;
        }

        debug!(
            target: targets::FONT,
            font = %font.key,
            cell_size = font.atlas.grid().cell_size(),
            glyphs_per_layer = font.atlas.grid().per_layer(),
            preloaded = font.glyphs.len(),
            "font created"
        );

        Ok(font)
    }

    /// The key this instance was created for.
    pub fn key(&self) -> &FontKey {
        &self.key
    }

    /// Rasterization size in pixels.
    pub fn pixel_size(&self) -> u32 {
        self.face.pixel_size()
    }

    /// Face line metrics at this size.
    pub fn metrics(&self) -> LineMetrics {
        self.metrics
    }

    /// Baseline-to-baseline distance in pixels.
    pub fn line_height(&self) -> f32 {
        self.metrics.line_height()
    }

    /// Ascender minus descender, in pixels.
    pub fn text_height(&self) -> f32 {
        self.metrics.text_height()
    }

    /// Distance from the top of the line box to the baseline.
    pub fn ascender(&self) -> f32 {
        self.metrics.ascender
    }

    /// Side of the square atlas cell reserved for each glyph.
    pub fn cell_size(&self) -> u32 {
        self.atlas.grid().cell_size()
    }

    /// Glyph cells per atlas layer.
    pub fn glyphs_per_layer(&self) -> u32 {
        self.atlas.grid().per_layer()
    }

    /// Current number of atlas layers.
    pub fn layer_count(&self) -> u32 {
        self.atlas.layer_count()
    }

    /// The glyph cache.
    pub fn glyphs(&self) -> &GlyphCache {
        &self.glyphs
    }

    /// Glyph cache statistics.
    pub fn glyph_stats(&self) -> &GlyphCacheStats {
        self.glyphs.stats()
    }

    /// Atlas statistics.
    pub fn atlas_stats(&self) -> &AtlasStats {
        self.atlas.stats()
    }

    /// The atlas surface, for binding at draw time.
    pub fn atlas(&self) -> &dyn AtlasSurface {
        self.atlas.surface()
    }

    /// Cached glyph for `codepoint`, without rasterizing.
    pub fn lookup(&mut self, codepoint: u32) -> Option<GlyphEntry> {
        self.glyphs.lookup(codepoint)
    }

    /// Cached glyph for `codepoint`, rasterizing it on a miss.
    pub fn ensure_glyph(&mut self, codepoint: u32) -> FontResult<GlyphEntry> {
        match self.glyphs.lookup(codepoint) {
            Some(entry) => Ok(entry),
            None => self
                .glyphs
                .rasterize(codepoint, self.face.as_ref(), &mut self.atlas),
        }
    }

    /// Kerning between two face glyph indices, in whole pixels.
    pub fn kerning(&mut self, left: u32, right: u32) -> f32 {
        if !self.face.has_kerning() {
            return 0.0;
        }
        let face = self.face.as_ref();
        *self
            .kerning
            .entry((left, right))
            .or_insert_with(|| face.kerning(left, right))
    }
}

impl std::fmt::Debug for FontInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontInstance")
            .field("key", &self.key)
            .field("glyphs", &self.glyphs)
            .field("atlas", &self.atlas)
            .finish_non_exhaustive()
    }
}
