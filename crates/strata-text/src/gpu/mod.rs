//! wgpu backend: device ownership, texture-array atlases and the text pipeline.
//!
//! # Example
//!
//! ```no_run
//! use glam::{Mat4, Vec2};
//! use strata_text::gpu::{GpuContext, GraphicsConfig, TextRenderer, WgpuBackend};
//! use strata_text::{Color, FontConfig, FontContext, FontKey, TextDrawList};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let gpu = GpuContext::new(GraphicsConfig::default())?;
//! let mut fonts = FontContext::new(WgpuBackend::new(&gpu), FontConfig::default())?;
//! let mut renderer = TextRenderer::new(&gpu, wgpu::TextureFormat::Bgra8UnormSrgb);
//!
//! let body = fonts.font(&FontKey::new("fonts/Inter.ttf", 14))?;
//! let projection = Mat4::orthographic_rh(0.0, 800.0, 600.0, 0.0, -1.0, 1.0);
//!
//! let mut list = TextDrawList::new();
//! fonts.render_text(&mut list, body, projection, Vec2::new(16.0, 16.0), b"Hello", Color::WHITE)?;
//! # let target: wgpu::TextureView = unimplemented!();
//! renderer.render(&gpu, &fonts, &list, &target)?;
//! # Ok(())
//! # }
//! ```

mod atlas;
mod backend;
mod context;
mod text_render_pass;

pub use atlas::{ATLAS_FORMAT, GpuAtlas};
pub use backend::WgpuBackend;
pub use context::{GpuContext, GpuResources, GraphicsConfig};
pub use text_render_pass::TextRenderer;
