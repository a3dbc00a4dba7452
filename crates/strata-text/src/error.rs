//! Error types for the text crate.

use std::path::PathBuf;

use thiserror::Error;

use crate::font_cache::FontId;
use crate::table::TableFull;

/// Errors that can occur while loading fonts, caching glyphs or laying out text.
#[derive(Error, Debug)]
pub enum FontError {
    /// The font file is missing, unreadable or not a font.
    #[error("couldn't load font {path}: {reason}")]
    Load {
        /// Path that was requested.
        path: PathBuf,
        /// What went wrong.
        reason: String,
    },

    /// The font cache has no free slot for another font/size/axis combination.
    #[error("font cache is full ({capacity} fonts)")]
    CapacityExceeded {
        /// The configured ceiling.
        capacity: usize,
    },

    /// The face could not produce a bitmap for a glyph.
    #[error("couldn't rasterize glyph {glyph_index}: {reason}")]
    Rasterization {
        /// Face-internal glyph index.
        glyph_index: u32,
        /// What went wrong.
        reason: String,
    },

    /// A glyph cell is larger than an atlas layer.
    #[error("glyph cell of {cell_size}px does not fit an atlas layer of {atlas_size}px")]
    CellTooLarge {
        /// Cell size derived from the face bounding box.
        cell_size: u32,
        /// Atlas layer width/height.
        atlas_size: u32,
    },

    /// A pixel size of zero was requested.
    #[error("invalid pixel size: {0}")]
    InvalidPixelSize(u32),

    /// The handle was not issued by this context.
    #[error("unknown font handle {0:?}")]
    UnknownFont(FontId),

    /// A lookup table had no free slot.
    #[error(transparent)]
    Table(#[from] TableFull),

    /// Invalid configuration.
    #[error("invalid font configuration: {0}")]
    Config(String),

    /// I/O failure while reading configuration or font data.
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    /// GPU failure.
    #[error(transparent)]
    Render(#[from] RenderError),
}

/// Result type for font operations.
pub type FontResult<T> = Result<T, FontError>;

/// Errors that can occur during graphics operations.
#[derive(Error, Debug)]
pub enum RenderError {
    /// No suitable graphics adapter was found.
    #[error("no suitable graphics adapter found")]
    NoAdapter,

    /// Failed to request a graphics device.
    #[cfg(feature = "gpu")]
    #[error("failed to request graphics device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    /// The atlas texture would exceed the device's array layer limit.
    #[error("atlas needs {requested} layers but the device allows {limit}")]
    LayerLimit {
        /// Layers needed after growth.
        requested: u32,
        /// `max_texture_array_layers` of the device.
        limit: u32,
    },

    /// The atlas layer size exceeds the device's 2-D texture limit.
    #[error("atlas layers of {size}px exceed the device limit of {limit}px")]
    TextureTooLarge {
        /// Requested layer width/height.
        size: u32,
        /// `max_texture_dimension_2d` of the device.
        limit: u32,
    },

    /// Too many draws were queued for one render call.
    #[error("too many text draws in one frame ({0})")]
    TooManyDraws(usize),
}

/// Result type for render operations.
pub type RenderResult<T> = Result<T, RenderError>;
