//! The font context: owner of every font instance.
//!
//! A [`FontContext`] is created by the rendering subsystem, handed to the UI
//! by reference, and dropped at shutdown, releasing every face and atlas.
//! Callers hold [`FontId`] handles, never the instances themselves.
//!
//! Where faces come from and where atlases live is decided by a
//! [`FontBackend`]: [`HeadlessBackend`] keeps atlases in memory, the wgpu
//! backend in the `gpu` module puts them in texture arrays.

use std::path::Path;

use glam::{Mat4, Vec2};
use tracing::debug;

use crate::atlas::{AtlasSurface, MemoryAtlas};
use crate::config::FontConfig;
use crate::draw::TextDrawList;
use crate::error::{FontError, FontResult};
use crate::face::{FontFace, TtfFace};
use crate::font::FontInstance;
use crate::font_cache::{FontCache, FontId, FontKey};
use crate::logging::targets;
use crate::types::Color;

/// Opens faces and creates atlas surfaces for new fonts.
pub trait FontBackend {
    /// Open the face described by `key`.
    fn open_face(&self, key: &FontKey) -> FontResult<Box<dyn FontFace>>;

    /// Create a one-layer atlas surface with square layers of `dimension` pixels.
    fn create_atlas(&self, dimension: u32) -> FontResult<Box<dyn AtlasSurface>>;
}

/// Faces from font files, atlases in system memory.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadlessBackend;

impl FontBackend for HeadlessBackend {
    fn open_face(&self, key: &FontKey) -> FontResult<Box<dyn FontFace>> {
        Ok(Box::new(TtfFace::open(&key.path, key.pixel_size, &key.axes)?))
    }

    fn create_atlas(&self, dimension: u32) -> FontResult<Box<dyn AtlasSurface>> {
        Ok(Box::new(MemoryAtlas::new(dimension)))
    }
}

/// What a UI or binding layer needs from the text system.
pub trait TextServices {
    /// Handle for the font described by `key`, loading it on first use.
    fn font(&mut self, key: &FontKey) -> FontResult<FontId>;

    /// Width of `text` in pixels.
    fn measure_width(&mut self, font: FontId, text: &[u8]) -> FontResult<f32>;

    /// Byte offset of the first codepoint extending past `target` pixels.
    fn index_at_width(&mut self, font: FontId, text: &[u8], target: f32) -> FontResult<usize>;

    /// Baseline-to-baseline distance in pixels.
    fn line_height(&self, font: FontId) -> FontResult<f32>;

    /// Lay out `text` with its line box top-left at `origin` and append the
    /// glyph quads to `list`. Returns the width of the run.
    fn render_text(
        &mut self,
        list: &mut TextDrawList,
        font: FontId,
        projection: Mat4,
        origin: Vec2,
        text: &[u8],
        color: Color,
    ) -> FontResult<f32>;
}

/// Owns the font cache and the backend that feeds it.
pub struct FontContext {
    backend: Box<dyn FontBackend>,
    config: FontConfig,
    cache: FontCache,
}

impl FontContext {
    /// Create a context with the given backend and configuration.
    pub fn new(backend: impl FontBackend + 'static, config: FontConfig) -> FontResult<Self> {
        config.validate()?;
        debug!(
            target: targets::FONT,
            capacity = config.cache_capacity,
            atlas_size = config.atlas_size,
            gamma = config.gamma,
            "font context created"
        );
        Ok(Self {
            backend: Box::new(backend),
            cache: FontCache::new(config.cache_capacity),
            config,
        })
    }

    /// A context backed by [`HeadlessBackend`].
    pub fn headless(config: FontConfig) -> FontResult<Self> {
        Self::new(HeadlessBackend, config)
    }

    /// The configuration in use.
    pub fn config(&self) -> &FontConfig {
        &self.config
    }

    /// The font cache.
    pub fn cache(&self) -> &FontCache {
        &self.cache
    }

    /// Handle for the font described by `key`.
    ///
    /// The first request for a key opens the face, creates its atlas and
    /// preloads glyphs; later requests return the same handle.
    pub fn font(&mut self, key: &FontKey) -> FontResult<FontId> {
        if key.pixel_size == 0 {
            return Err(FontError::InvalidPixelSize(0));
        }
        let backend = self.backend.as_ref();
        let config = &self.config;
        self.cache.get_or_load(key, |key| {
            let face = backend.open_face(key)?;
            let surface = backend.create_atlas(config.atlas_size)?;
            FontInstance::new(key.clone(), face, surface, config)
        })
    }

    /// Shorthand for [`font`](Self::font) with no style axes.
    pub fn font_at(&mut self, path: impl AsRef<Path>, pixel_size: u32) -> FontResult<FontId> {
        self.font(&FontKey::new(path.as_ref(), pixel_size))
    }

    /// The font with the same path and style axes as `base` at `pixel_size`.
    pub fn font_with_size(&mut self, base: FontId, pixel_size: u32) -> FontResult<FontId> {
        let key = self.instance(base)?.key().with_size(pixel_size);
        self.font(&key)
    }

    /// The font with the same path and style axes as `base`, its size
    /// multiplied by `factor` and rounded down.
    pub fn font_with_size_scaled(&mut self, base: FontId, factor: f32) -> FontResult<FontId> {
        let size = self.instance(base)?.pixel_size() as f32 * factor;
        self.font_with_size(base, size.floor().max(0.0) as u32)
    }

    /// The instance behind a handle.
    pub fn instance(&self, font: FontId) -> FontResult<&FontInstance> {
        self.cache.get(font).ok_or(FontError::UnknownFont(font))
    }

    /// The instance behind a handle, mutably.
    pub fn instance_mut(&mut self, font: FontId) -> FontResult<&mut FontInstance> {
        self.cache.get_mut(font).ok_or(FontError::UnknownFont(font))
    }

    /// Width of `text` in pixels.
    pub fn measure_width(&mut self, font: FontId, text: &[u8]) -> FontResult<f32> {
        self.instance_mut(font)?.measure_width(text)
    }

    /// Byte offset of the first codepoint whose advance ends past `target`.
    pub fn index_at_width(&mut self, font: FontId, text: &[u8], target: f32) -> FontResult<usize> {
        self.instance_mut(font)?.index_at_width(text, target)
    }

    /// Baseline-to-baseline distance in pixels.
    pub fn line_height(&self, font: FontId) -> FontResult<f32> {
        Ok(self.instance(font)?.line_height())
    }

    /// Ascender minus descender, in pixels.
    pub fn text_height(&self, font: FontId) -> FontResult<f32> {
        Ok(self.instance(font)?.text_height())
    }

    /// Lay out `text` and append its quads to `list` as one draw.
    ///
    /// Glyphs missing from the cache are rasterized and uploaded first, so the
    /// list is ready to render as soon as this returns.
    pub fn render_text(
        &mut self,
        list: &mut TextDrawList,
        font: FontId,
        projection: Mat4,
        origin: Vec2,
        text: &[u8],
        color: Color,
    ) -> FontResult<f32> {
        let instance = self.instance_mut(font)?;
        list.record(font, projection, color, |quads| {
            instance.layout_quads(text, origin, quads)
        })
    }
}

impl TextServices for FontContext {
    fn font(&mut self, key: &FontKey) -> FontResult<FontId> {
        FontContext::font(self, key)
    }

    fn measure_width(&mut self, font: FontId, text: &[u8]) -> FontResult<f32> {
        FontContext::measure_width(self, font, text)
    }

    fn index_at_width(&mut self, font: FontId, text: &[u8], target: f32) -> FontResult<usize> {
        FontContext::index_at_width(self, font, text, target)
    }

    fn line_height(&self, font: FontId) -> FontResult<f32> {
        FontContext::line_height(self, font)
    }

    fn render_text(
        &mut self,
        list: &mut TextDrawList,
        font: FontId,
        projection: Mat4,
        origin: Vec2,
        text: &[u8],
        color: Color,
    ) -> FontResult<f32> {
        FontContext::render_text(self, list, font, projection, origin, text, color)
    }
}

impl Drop for FontContext {
    fn drop(&mut self) {
        debug!(
            target: targets::FONT,
            fonts = self.cache.len(),
            "font context torn down"
        );
    }
}

impl std::fmt::Debug for FontContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FontContext")
            .field("cache", &self.cache)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
