//! Glyph atlas in a wgpu 2-D array texture.

use std::sync::Arc;

use tracing::debug;

use super::context::GpuResources;
use crate::atlas::AtlasSurface;
use crate::error::{FontResult, RenderError, RenderResult};
use crate::logging::targets;

/// Single-channel coverage format of every atlas.
pub const ATLAS_FORMAT: wgpu::TextureFormat = wgpu::TextureFormat::R8Unorm;

/// An [`AtlasSurface`] backed by an `R8Unorm` texture array.
///
/// Growth allocates a texture with one more layer, copies every existing layer
/// into it on the GPU, submits the copy and only then replaces the old texture.
pub struct GpuAtlas {
    gpu: Arc<GpuResources>,
    texture: wgpu::Texture,
    view: wgpu::TextureView,
    dim: u32,
    layers: u32,
}

impl GpuAtlas {
    /// Create a one-layer atlas of `dim * dim` pixels.
    pub fn new(gpu: Arc<GpuResources>, dim: u32) -> RenderResult<Self> {
        let limit = gpu.device.limits().max_texture_dimension_2d;
        if dim > limit {
            return Err(RenderError::TextureTooLarge { size: dim, limit });
        }
        let (texture, view) = Self::create_texture(&gpu.device, dim, 1);
        Ok(Self {
            gpu,
            texture,
            view,
            dim,
            layers: 1,
        })
    }

    fn create_texture(
        device: &wgpu::Device,
        dim: u32,
        layers: u32,
    ) -> (wgpu::Texture, wgpu::TextureView) {
        let texture = device.create_texture(&wgpu::TextureDescriptor {
            label: Some("glyph_atlas"),
            size: wgpu::Extent3d {
                width: dim,
                height: dim,
                depth_or_array_layers: layers,
            },
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: ATLAS_FORMAT,
            usage: wgpu::TextureUsages::TEXTURE_BINDING
                | wgpu::TextureUsages::COPY_DST
                | wgpu::TextureUsages::COPY_SRC,
            view_formats: &[],
        });

        let view = texture.create_view(&wgpu::TextureViewDescriptor {
            label: Some("glyph_atlas_view"),
            dimension: Some(wgpu::TextureViewDimension::D2Array),
            ..Default::default()
        });

        (texture, view)
    }

    /// The texture array.
    pub fn texture(&self) -> &wgpu::Texture {
        &self.texture
    }

    /// A `D2Array` view of every layer.
    pub fn view(&self) -> &wgpu::TextureView {
        &self.view
    }

    fn grow_texture(&mut self) -> RenderResult<()> {
        let device = &self.gpu.device;
        let requested = self.layers + 1;
        let limit = device.limits().max_texture_array_layers;
        if requested > limit {
            return Err(RenderError::LayerLimit { requested, limit });
        }

        let (texture, view) = Self::create_texture(device, self.dim, requested);

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("glyph_atlas_grow_encoder"),
        });
        encoder.copy_texture_to_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::TexelCopyTextureInfo {
                texture: &texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::Extent3d {
                width: self.dim,
                height: self.dim,
                depth_or_array_layers: self.layers,
            },
        );
        self.gpu.queue.submit(std::iter::once(encoder.finish()));

        debug!(
            target: targets::GPU,
            from = self.layers,
            to = requested,
            "atlas texture reallocated"
        );

        self.texture = texture;
        self.view = view;
        self.layers = requested;
        Ok(())
    }
}

impl AtlasSurface for GpuAtlas {
    fn dimension(&self) -> u32 {
        self.dim
    }

    fn layer_count(&self) -> u32 {
        self.layers
    }

    fn grow(&mut self) -> FontResult<()> {
        Ok(self.grow_texture()?)
    }

    fn write(&mut self, x: u32, y: u32, layer: u32, width: u32, height: u32, pixels: &[u8]) {
        if width == 0 || height == 0 {
            return;
        }
        self.gpu.queue.write_texture(
            wgpu::TexelCopyTextureInfo {
                texture: &self.texture,
                mip_level: 0,
                origin: wgpu::Origin3d { x, y, z: layer },
                aspect: wgpu::TextureAspect::All,
            },
            pixels,
            wgpu::TexelCopyBufferLayout {
                offset: 0,
                bytes_per_row: Some(width),
                rows_per_image: Some(height),
            },
            wgpu::Extent3d {
                width,
                height,
                depth_or_array_layers: 1,
            },
        );
    }

    fn texture_view(&self) -> Option<&wgpu::TextureView> {
        Some(&self.view)
    }
}

impl std::fmt::Debug for GpuAtlas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GpuAtlas")
            .field("dim", &self.dim)
            .field("layers", &self.layers)
            .finish()
    }
}
