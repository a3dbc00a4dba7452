//! Tracing targets used by the text subsystem.
//!
//! The crate only emits events through the `tracing` macros. To see them,
//! install a subscriber in the application:
//!
//! ```ignore
//! tracing_subscriber::fmt()
//!     .with_env_filter("strata_text::atlas=info,strata_text::font=debug")
//!     .init();
//! ```

/// Target names for log filtering.
///
/// Use these with `tracing` directives to filter logs by subsystem.
pub mod targets {
    /// Font loading, the font cache and context lifecycle.
    pub const FONT: &str = "strata_text::font";
    /// Glyph rasterization and glyph table maintenance.
    pub const GLYPH: &str = "strata_text::glyph";
    /// Atlas layer allocation and growth.
    pub const ATLAS: &str = "strata_text::atlas";
    /// wgpu device and pipeline setup.
    pub const GPU: &str = "strata_text::gpu";
}
