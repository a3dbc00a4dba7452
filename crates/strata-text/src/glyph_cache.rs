//! Per-font glyph cache.
//!
//! Maps codepoints to their metrics and atlas cell. Glyphs are rasterized
//! lazily on the first lookup miss, gamma corrected, and uploaded into the
//! font's atlas. Entries are never removed.
//!
//! Codepoint 0 is reserved as the empty-slot marker and is
//! never cached; NUL is treated as a terminator by callers.

use tracing::{debug, trace, warn};

use crate::atlas::{AtlasPageStore, CellLocation};
use crate::error::FontResult;
use crate::face::{FontFace, GlyphBitmap};
use crate::logging::targets;
use crate::table::ProbeTable;

/// Default initial glyph table capacity.
pub const DEFAULT_TABLE_CAPACITY: usize = 256;

/// Default number of slots added when the glyph table fills up.
pub const DEFAULT_TABLE_GROWTH: usize = 128;

/// A cached glyph.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GlyphEntry {
    /// The codepoint this entry was rasterized for (never 0).
    pub codepoint: u32,
    /// Pen-relative x offset of the bitmap.
    pub bearing_x: f32,
    /// Baseline-relative y offset of the bitmap top (up is positive).
    pub bearing_y: f32,
    /// Horizontal pen advance.
    pub advance_x: f32,
    /// Bitmap width in pixels.
    pub bitmap_width: u32,
    /// Bitmap height in pixels.
    pub bitmap_height: u32,
    /// Face-internal glyph index, used for kerning.
    pub glyph_index: u32,
    /// Position among all glyphs rasterized for this font.
    pub ordinal: u32,
    /// Atlas layer the ordinal falls in, reserved even when nothing is drawn.
    pub layer: u32,
    /// Atlas cell, `None` for glyphs with nothing to draw.
    pub cell: Option<CellLocation>,
}

impl GlyphEntry {
    /// Whether the glyph produces a draw record.
    pub fn is_visible(&self) -> bool {
        self.cell.is_some() && self.bitmap_width > 0 && self.bitmap_height > 0
    }

    /// Atlas layer of the glyph's ordinal.
    pub fn layer(&self) -> u32 {
        self.layer
    }
}

/// Lookup table mapping linear coverage to gamma-corrected bytes.
#[derive(Clone)]
pub struct GammaTable {
    gamma: f64,
    lut: [u8; 256],
}

impl GammaTable {
    /// Build the table for `gamma` (display gamma, typically 2.2).
    pub fn new(gamma: f64) -> Self {
        let mut lut = [0u8; 256];
        for (a, out) in lut.iter_mut().enumerate() {
            let corrected = (a as f64 / 255.0).powf(1.0 / gamma) * 255.0;
            *out = corrected.round().clamp(0.0, 255.0) as u8;
        }
        Self { gamma, lut }
    }

    /// The gamma this table was built for.
    pub fn gamma(&self) -> f64 {
        self.gamma
    }

    /// Correct one coverage sample.
    #[inline]
    pub fn apply(&self, coverage: u8) -> u8 {
        self.lut[coverage as usize]
    }

    /// Correct a whole bitmap.
    pub fn correct(&self, coverage: &[u8]) -> Vec<u8> {
        coverage.iter().map(|&a| self.apply(a)).collect()
    }
}

impl Default for GammaTable {
    fn default() -> Self {
        Self::new(2.2)
    }
}

impl std::fmt::Debug for GammaTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GammaTable")
            .field("gamma", &self.gamma)
            .finish_non_exhaustive()
    }
}

/// Statistics about glyph cache usage.
#[derive(Debug, Clone, Default)]
pub struct GlyphCacheStats {
    /// Number of lookups.
    pub lookups: u64,
    /// Lookups answered from the table.
    pub hits: u64,
    /// Glyphs rasterized.
    pub rasterized: u64,
    /// Rasterizations that failed and were cached as empty.
    pub failed: u64,
    /// Times the table was grown.
    pub table_growths: u64,
}

impl GlyphCacheStats {
    /// Fraction of lookups that hit, 0.0 when nothing was looked up.
    pub fn hit_rate(&self) -> f64 {
        if self.lookups == 0 {
            0.0
        } else {
            self.hits as f64 / self.lookups as f64
        }
    }
}

/// Codepoint to glyph table for one font.
pub struct GlyphCache {
    table: ProbeTable<u32, GlyphEntry>,
    growth: usize,
    gamma: GammaTable,
    stats: GlyphCacheStats,
}

impl GlyphCache {
    /// Create a cache with the default table size and gamma.
    pub fn new() -> Self {
        Self::with_table(DEFAULT_TABLE_CAPACITY, DEFAULT_TABLE_GROWTH, GammaTable::default())
    }

    /// Create a cache with an explicit table capacity, growth step and gamma.
    pub fn with_table(capacity: usize, growth: usize, gamma: GammaTable) -> Self {
        Self {
            table: ProbeTable::with_capacity(capacity),
            growth: growth.max(1),
            gamma,
            stats: GlyphCacheStats::default(),
        }
    }

    /// Number of cached glyphs.
    pub fn len(&self) -> usize {
        self.table.len()
    }

    /// Whether nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.table.is_empty()
    }

    /// Current table capacity.
    pub fn capacity(&self) -> usize {
        self.table.capacity()
    }

    /// Usage statistics.
    pub fn stats(&self) -> &GlyphCacheStats {
        &self.stats
    }

    /// Reset the statistics.
    pub fn reset_stats(&mut self) {
        self.stats = GlyphCacheStats::default();
    }

    /// Look up a cached glyph, counting the lookup.
    pub fn lookup(&mut self, codepoint: u32) -> Option<GlyphEntry> {
        self.stats.lookups += 1;
        let entry = self.get(codepoint).copied();
        if entry.is_some() {
            self.stats.hits += 1;
        }
        entry
    }

    /// Look up a cached glyph without touching the statistics.
    pub fn get(&self, codepoint: u32) -> Option<&GlyphEntry> {
        if codepoint == 0 {
            return None;
        }
        self.table.get(&codepoint)
    }

    /// Iterate over cached glyphs in table order.
    pub fn entries(&self) -> impl Iterator<Item = &GlyphEntry> {
        self.table.values()
    }

    /// Rasterize `codepoint`, place it in the atlas and cache it.
    ///
    /// Returns the existing entry if the codepoint is already cached. A glyph
    /// the face fails to render is cached with an empty bitmap so the failure
    /// is not retried. Codepoint 0 yields an empty entry that is not stored.
    ///
    /// Every new glyph reserves the atlas layer of its ordinal, so crossing a
    /// layer boundary grows the atlas even when the glyph is empty. Bitmaps
    /// larger than a cell are clipped, and the entry records the clipped size.
    /// If the atlas fails to grow, nothing is cached.
    pub fn rasterize(
        &mut self,
        codepoint: u32,
        face: &dyn FontFace,
        atlas: &mut AtlasPageStore,
    ) -> FontResult<GlyphEntry> {
        if codepoint == 0 {
            return Ok(GlyphEntry::default());
        }
        if let Some(entry) = self.get(codepoint) {
            return Ok(*entry);
        }

        self.reserve_slot();

        let glyph_index = face.glyph_index(codepoint);
        let bitmap = match face.render_glyph(glyph_index) {
            Ok(bitmap) => bitmap,
            Err(err) => {
                warn!(
                    target: targets::GLYPH,
                    codepoint = format_args!("U+{codepoint:04X}"),
                    glyph_index,
                    error = %err,
                    "glyph rasterization failed; caching as empty"
                );
                self.stats.failed += 1;
                GlyphBitmap::default()
            }
        };

        let ordinal = self.table.len() as u32;
        let layer = atlas.reserve_layer(ordinal)?;

        let cell_size = atlas.grid().cell_size();
        let (width, height) = (bitmap.width.min(cell_size), bitmap.height.min(cell_size));
        let cell = if bitmap.is_empty() {
            None
        } else {
            if (width, height) != (bitmap.width, bitmap.height) {
                debug!(
                    target: targets::GLYPH,
                    codepoint = format_args!("U+{codepoint:04X}"),
                    width = bitmap.width,
                    height = bitmap.height,
                    cell_size,
                    "glyph bitmap clipped to its cell"
                );
            }
            let cell = atlas.allocate(ordinal)?;
            let corrected = self.gamma.correct(&bitmap.coverage);
            atlas.upload(cell, bitmap.width, bitmap.height, &corrected);
            Some(cell)
        };

        let entry = GlyphEntry {
            codepoint,
            bearing_x: bitmap.bearing_x,
            bearing_y: bitmap.bearing_y,
            advance_x: bitmap.advance_x,
            bitmap_width: width,
            bitmap_height: height,
            glyph_index,
            ordinal,
            layer,
            cell,
        };

        self.stats.rasterized += 1;
        trace!(
            target: targets::GLYPH,
            codepoint = format_args!("U+{codepoint:04X}"),
            ordinal,
            ?cell,
            "glyph cached"
        );

        self.table.insert(codepoint, entry)?;
        Ok(entry)
    }

    /// Grow the table if it has no free slot for one more glyph.
    fn reserve_slot(&mut self) {
        if self.table.is_full() {
            let before = self.table.capacity();
            self.table.grow(self.growth);
            self.stats.table_growths += 1;
            trace!(
                target: targets::GLYPH,
                from = before,
                to = self.table.capacity(),
                "glyph table grown"
            );
        }
    }
}

impl Default for GlyphCache {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for GlyphCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GlyphCache")
            .field("len", &self.table.len())
            .field("capacity", &self.table.capacity())
            .field("gamma", &self.gamma.gamma())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::MemoryAtlas;
    use crate::error::FontError;
    use crate::face::LineMetrics;

    /// Every glyph is a 2x2 block with coverage 128, except 'X' which fails,
    /// ' ' which is empty and 'W' which overflows its 4px cell.
    struct BlockFace;

    impl FontFace for BlockFace {
        fn pixel_size(&self) -> u32 {
            4
        }
        fn line_metrics(&self) -> LineMetrics {
            LineMetrics::default()
        }
        fn bounding_box_px(&self) -> (u32, u32) {
            (4, 4)
        }
        fn has_kerning(&self) -> bool {
            false
        }
        fn glyph_index(&self, codepoint: u32) -> u32 {
            codepoint
        }
        fn render_glyph(&self, glyph_index: u32) -> FontResult<GlyphBitmap> {
            match char::from_u32(glyph_index) {
                Some('X') => Err(FontError::Rasterization {
                    glyph_index,
                    reason: "broken outline".into(),
                }),
                Some(' ') => Ok(GlyphBitmap::empty(2.0)),
                Some('W') => Ok(GlyphBitmap {
                    width: 5,
                    height: 5,
                    bearing_x: 0.0,
                    bearing_y: 5.0,
                    advance_x: 5.0,
                    coverage: vec![255; 25],
                }),
                _ => Ok(GlyphBitmap {
                    width: 2,
                    height: 2,
                    bearing_x: 0.0,
                    bearing_y: 2.0,
                    advance_x: 3.0,
                    coverage: vec![128; 4],
                }),
            }
        }
        fn kerning(&self, _: u32, _: u32) -> f32 {
            0.0
        }
    }

    fn store() -> AtlasPageStore {
        AtlasPageStore::new(Box::new(MemoryAtlas::new(16)), 4).unwrap()
    }

    #[test]
    fn test_gamma_table() {
        let gamma = GammaTable::new(2.2);
        assert_eq!(gamma.apply(0), 0);
        assert_eq!(gamma.apply(255), 255);
        let expected = ((128.0f64 / 255.0).powf(1.0 / 2.2) * 255.0).round() as u8;
        assert_eq!(gamma.apply(128), expected);
        assert!(gamma.apply(128) > 128);

        let identity = GammaTable::new(1.0);
        assert!((0..=255u8).all(|a| identity.apply(a) == a));
    }

    #[test]
    fn test_lookup_miss_then_hit() {
        let mut cache = GlyphCache::new();
        let mut atlas = store();

        assert!(cache.lookup('a' as u32).is_none());
        let entry = cache.rasterize('a' as u32, &BlockFace, &mut atlas).unwrap();
        assert_eq!(cache.lookup('a' as u32), Some(entry));
        assert_eq!(cache.stats().lookups, 2);
        assert_eq!(cache.stats().hits, 1);
        assert_eq!(cache.stats().rasterized, 1);
    }

    #[test]
    fn test_empty_bitmap_has_no_cell() {
        let mut cache = GlyphCache::new();
        let mut atlas = store();

        let space = cache.rasterize(' ' as u32, &BlockFace, &mut atlas).unwrap();
        assert_eq!(space.cell, None);
        assert!(!space.is_visible());
        assert_eq!(space.advance_x, 2.0);

        // The ordinal is still consumed.
        let a = cache.rasterize('a' as u32, &BlockFace, &mut atlas).unwrap();
        assert_eq!(a.ordinal, 1);
        assert_eq!(a.cell, Some(CellLocation { x: 4, y: 0, layer: 0 }));
    }

    #[test]
    fn test_empty_glyph_at_layer_boundary_grows_atlas() {
        let mut cache = GlyphCache::new();
        let mut atlas = store();
        assert_eq!(atlas.grid().per_layer(), 16);

        for cp in 'a'..='p' {
            cache.rasterize(cp as u32, &BlockFace, &mut atlas).unwrap();
        }
        assert_eq!(atlas.layer_count(), 1);

        let space = cache.rasterize(' ' as u32, &BlockFace, &mut atlas).unwrap();
        assert_eq!(space.ordinal, 16);
        assert_eq!(space.layer(), 1);
        assert_eq!(space.cell, None);
        assert_eq!(atlas.layer_count(), 2);
        assert_eq!(atlas.stats().layer_growths, 1);

        let q = cache.rasterize('q' as u32, &BlockFace, &mut atlas).unwrap();
        assert_eq!(q.cell, Some(CellLocation { x: 4, y: 0, layer: 1 }));
        assert_eq!(q.layer(), 1);
        assert_eq!(atlas.stats().layer_growths, 1);
    }

    #[test]
    fn test_oversized_bitmap_is_clipped_to_cell() {
        let mut cache = GlyphCache::new();
        let mut atlas = store();

        let w = cache.rasterize('W' as u32, &BlockFace, &mut atlas).unwrap();
        let cell = w.cell.unwrap();
        assert_eq!((w.bitmap_width, w.bitmap_height), (4, 4));
        assert_eq!(w.advance_x, 5.0);

        let surface = atlas.surface();
        assert_eq!(surface.read(cell.x + 3, cell.y + 3, 0), Some(255));
        // Neighbouring cells stay untouched.
        assert_eq!(surface.read(cell.x + 4, cell.y, 0), Some(0));
        assert_eq!(surface.read(cell.x, cell.y + 4, 0), Some(0));
    }

    #[test]
    fn test_failed_glyph_cached_as_empty() {
        let mut cache = GlyphCache::new();
        let mut atlas = store();

        let entry = cache.rasterize('X' as u32, &BlockFace, &mut atlas).unwrap();
        assert!(!entry.is_visible());
        assert_eq!(cache.stats().failed, 1);

        cache.rasterize('X' as u32, &BlockFace, &mut atlas).unwrap();
        assert_eq!(cache.stats().failed, 1);
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_nul_is_never_cached() {
        let mut cache = GlyphCache::new();
        let mut atlas = store();
        cache.rasterize(0, &BlockFace, &mut atlas).unwrap();
        assert!(cache.is_empty());
        assert!(cache.lookup(0).is_none());
    }

    #[test]
    fn test_table_grows_when_full() {
        let mut cache = GlyphCache::with_table(4, 2, GammaTable::default());
        let mut atlas = AtlasPageStore::new(Box::new(MemoryAtlas::new(64)), 4).unwrap();

        for cp in 'a'..='e' {
            cache.rasterize(cp as u32, &BlockFace, &mut atlas).unwrap();
        }
        assert_eq!(cache.capacity(), 6);
        assert_eq!(cache.len(), 5);
        assert_eq!(cache.stats().table_growths, 1);
        for (ordinal, cp) in ('a'..='e').enumerate() {
            assert_eq!(cache.get(cp as u32).unwrap().ordinal, ordinal as u32);
        }
    }

    #[test]
    fn test_upload_is_gamma_corrected() {
        let mut cache = GlyphCache::new();
        let mut atlas = store();
        let entry = cache.rasterize('b' as u32, &BlockFace, &mut atlas).unwrap();
        let cell = entry.cell.unwrap();

        let corrected = GammaTable::default().apply(128);
        let surface = atlas.surface();
        assert_eq!(surface.read(cell.x, cell.y, cell.layer), Some(corrected));
        assert_eq!(surface.read(cell.x + 1, cell.y + 1, cell.layer), Some(corrected));
        assert_eq!(surface.read(cell.x + 2, cell.y, cell.layer), Some(0));
        assert_eq!(atlas.stats().bytes_uploaded, 4);
    }
}
