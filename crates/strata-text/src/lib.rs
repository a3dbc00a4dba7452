//! Glyph caching, layered atlases and UTF-8 text layout for GPU text rendering.
//!
//! A UI asks a [`FontContext`] for fonts by [`FontKey`] (path, pixel size and
//! optional weight/slant/width) and gets back [`FontId`] handles. Each font
//! rasterizes glyphs on first use, stores them in its own layered atlas and
//! lays text out with one loop shared by drawing, measuring and hit-testing,
//! so the three always agree.
//!
//! # Getting Started
//!
//! Without a GPU, atlases live in memory:
//!
//! ```no_run
//! use strata_text::{FontConfig, FontContext, FontKey};
//!
//! # fn main() -> strata_text::FontResult<()> {
//! let mut fonts = FontContext::headless(FontConfig::default())?;
//! let body = fonts.font(&FontKey::new("fonts/Inter.ttf", 14).weight(450))?;
//!
//! let text = "Grüße".as_bytes();
//! let width = fonts.measure_width(body, text)?;
//! let caret = fonts.index_at_width(body, text, width / 2.0)?;
//! println!("{width}px wide, midpoint at byte {caret}");
//! # Ok(())
//! # }
//! ```
//!
//! With the `gpu` feature (on by default), create the context with
//! [`gpu::WgpuBackend`] and draw with [`gpu::TextRenderer`].
//!
//! # Configuration
//!
//! [`FontConfig`] can be loaded from TOML:
//!
//! ```
//! use strata_text::FontConfig;
//!
//! let config = FontConfig::from_toml_str("gamma = 1.8\natlas_size = 1024").unwrap();
//! assert_eq!(config.atlas_size, 1024);
//! assert_eq!(config.cache_capacity, 50);
//! ```

pub mod atlas;
mod config;
mod context;
mod draw;
mod error;
pub mod face;
mod font;
mod font_cache;
pub mod glyph_cache;
pub mod layout;
pub mod logging;
pub mod table;
mod types;
pub mod utf8;

#[cfg(feature = "gpu")]
pub mod gpu;

// Core infrastructure
pub use config::{DEFAULT_ATLAS_SIZE, DEFAULT_CACHE_CAPACITY, DEFAULT_PRELOAD, FontConfig};
pub use context::{FontBackend, FontContext, HeadlessBackend, TextServices};
pub use error::{FontError, FontResult, RenderError, RenderResult};

// Fonts and glyphs
pub use atlas::{AtlasStats, AtlasSurface, CellLocation, MemoryAtlas};
pub use face::{FontFace, GlyphBitmap, LineMetrics, StyleAxes, TtfFace};
pub use font::FontInstance;
pub use font_cache::{FontCache, FontId, FontKey};
pub use glyph_cache::{GlyphCacheStats, GlyphEntry};
pub use layout::{LayoutSink, PlacedGlyph};

// Drawing types
pub use draw::{GlyphQuad, TextDraw, TextDrawList};
pub use types::Color;

// Re-export wgpu types that users commonly need
#[cfg(feature = "gpu")]
pub use wgpu;
