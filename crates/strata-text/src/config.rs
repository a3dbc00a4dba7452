//! Font subsystem configuration.
//!
//! Every field has a default, so a TOML file only needs to list what it
//! changes:
//!
//! ```toml
//! gamma = 1.8
//! cache_capacity = 64
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{FontError, FontResult};
use crate::glyph_cache::{DEFAULT_TABLE_CAPACITY, DEFAULT_TABLE_GROWTH};

/// Characters rasterized as soon as a font is created.
pub const DEFAULT_PRELOAD: &str = concat!(
    " ~!@#$%^&*()_+`1234567890,.;:'\"-=\\|/?><[]{}",
    "abcdefghijklmnopqrstuvwxyz",
    "ABCDEFGHIJKLMNOPQRSTUVWXYZ"
);

/// Default atlas layer width and height in pixels.
pub const DEFAULT_ATLAS_SIZE: u32 = 512;

/// Default number of fonts the cache can hold.
pub const DEFAULT_CACHE_CAPACITY: usize = 50;

/// Configuration for fonts, glyph tables and atlases.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FontConfig {
    /// Width and height of each atlas layer.
    pub atlas_size: u32,
    /// Gamma applied to rasterized coverage before upload.
    pub gamma: f64,
    /// Maximum number of font instances.
    pub cache_capacity: usize,
    /// Initial glyph table capacity per font.
    pub glyph_table_capacity: usize,
    /// Slots added each time a glyph table fills up.
    pub glyph_table_growth: usize,
    /// Characters rasterized when a font is created.
    pub preload: String,
}

impl Default for FontConfig {
    fn default() -> Self {
        Self {
            atlas_size: DEFAULT_ATLAS_SIZE,
            gamma: 2.2,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
            glyph_table_capacity: DEFAULT_TABLE_CAPACITY,
            glyph_table_growth: DEFAULT_TABLE_GROWTH,
            preload: DEFAULT_PRELOAD.to_string(),
        }
    }
}

impl FontConfig {
    /// Create a configuration with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the atlas layer size.
    pub fn atlas_size(mut self, size: u32) -> Self {
        self.atlas_size = size;
        self
    }

    /// Set the gamma used for coverage correction.
    pub fn gamma(mut self, gamma: f64) -> Self {
        self.gamma = gamma;
        self
    }

    /// Set the font cache ceiling.
    pub fn cache_capacity(mut self, capacity: usize) -> Self {
        self.cache_capacity = capacity;
        self
    }

    /// Set the initial glyph table capacity and its growth step.
    pub fn glyph_table(mut self, capacity: usize, growth: usize) -> Self {
        self.glyph_table_capacity = capacity;
        self.glyph_table_growth = growth;
        self
    }

    /// Set the preload character set.
    pub fn preload(mut self, chars: impl Into<String>) -> Self {
        self.preload = chars.into();
        self
    }

    /// Parse a configuration from TOML text.
    pub fn from_toml_str(text: &str) -> FontResult<Self> {
        let config: Self = toml::from_str(text).map_err(|e| FontError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read a configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> FontResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_toml_str(&text)
    }

    /// Check that the values can be used.
    pub fn validate(&self) -> FontResult<()> {
        if self.atlas_size == 0 {
            return Err(FontError::Config("atlas_size must be positive".into()));
        }
        if !(self.gamma.is_finite() && self.gamma > 0.0) {
            return Err(FontError::Config(format!(
                "gamma must be a positive number, got {}",
                self.gamma
            )));
        }
        if self.cache_capacity == 0 {
            return Err(FontError::Config("cache_capacity must be positive".into()));
        }
        if self.glyph_table_capacity == 0 || self.glyph_table_growth == 0 {
            return Err(FontError::Config(
                "glyph table capacity and growth must be positive".into(),
            ));
        }
        Ok(())
    }
}
