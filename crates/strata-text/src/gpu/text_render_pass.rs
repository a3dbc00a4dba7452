//! GPU text rendering pass.
//!
//! Draws a [`TextDrawList`] as instanced quads: one [`GlyphQuad`] instance per
//! glyph, four strip vertices generated in the shader. Each draw gets its own
//! projection and color through a dynamic uniform offset and binds the atlas of
//! its font as it is at render time, so glyphs added (and layers grown) while
//! the list was built are all visible.

use std::num::NonZeroU64;

use bytemuck::{Pod, Zeroable};
use tracing::{trace, warn};

use super::context::GpuContext;
use crate::context::FontContext;
use crate::draw::{GlyphQuad, TextDrawList};
use crate::error::{FontResult, RenderError};
use crate::logging::targets;

/// Initial instance buffer capacity, in quads.
const INITIAL_QUADS: usize = 4096;
/// Initial uniform buffer capacity, in draws.
const INITIAL_DRAWS: usize = 64;

/// Per-draw uniforms.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct DrawUniforms {
    projection: [[f32; 4]; 4],
    color: [f32; 4],
}

const UNIFORM_SIZE: u64 = std::mem::size_of::<DrawUniforms>() as u64;

/// Renders text draw lists into a color target.
pub struct TextRenderer {
    pipeline: wgpu::RenderPipeline,
    uniform_layout: wgpu::BindGroupLayout,
    atlas_layout: wgpu::BindGroupLayout,
    uniform_buffer: wgpu::Buffer,
    uniform_bind_group: wgpu::BindGroup,
    uniform_stride: u64,
    uniform_capacity: usize,
    instance_buffer: wgpu::Buffer,
    instance_capacity: usize,
}

impl TextRenderer {
    /// Create a renderer drawing into targets of `format`.
    pub fn new(gpu: &GpuContext, format: wgpu::TextureFormat) -> Self {
        let device = gpu.device();

        let shader = device.create_shader_module(wgpu::ShaderModuleDescriptor {
            label: Some("glyph_quad_shader"),
            source: wgpu::ShaderSource::Wgsl(include_str!("../shaders/glyph_quad.wgsl").into()),
        });

        let uniform_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("text_uniform_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: true,
                    min_binding_size: NonZeroU64::new(UNIFORM_SIZE),
                },
                count: None,
            }],
        });

        let atlas_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("glyph_atlas_bind_group_layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2Array,
                    sample_type: wgpu::TextureSampleType::Float { filterable: false },
                },
                count: None,
            }],
        });

        let pipeline_layout = device.create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
            label: Some("text_pipeline_layout"),
            bind_group_layouts: &[&uniform_layout, &atlas_layout],
            push_constant_ranges: &[],
        });

        let pipeline = device.create_render_pipeline(&wgpu::RenderPipelineDescriptor {
            label: Some("text_pipeline"),
            layout: Some(&pipeline_layout),
            vertex: wgpu::VertexState {
                module: &shader,
                entry_point: Some("vs_main"),
                buffers: &[GlyphQuad::buffer_layout()],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            },
            primitive: wgpu::PrimitiveState {
                topology: wgpu::PrimitiveTopology::TriangleStrip,
                strip_index_format: None,
                front_face: wgpu::FrontFace::Ccw,
                cull_mode: None,
                polygon_mode: wgpu::PolygonMode::Fill,
                unclipped_depth: false,
                conservative: false,
            },
            depth_stencil: None,
            multisample: wgpu::MultisampleState::default(),
            fragment: Some(wgpu::FragmentState {
                module: &shader,
                entry_point: Some("fs_main"),
                targets: &[Some(wgpu::ColorTargetState {
                    format,
                    blend: Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
                    write_mask: wgpu::ColorWrites::ALL,
                })],
                compilation_options: wgpu::PipelineCompilationOptions::default(),
            }),
            multiview: None,
            cache: None,
        });

        let alignment = u64::from(device.limits().min_uniform_buffer_offset_alignment);
        let uniform_stride = UNIFORM_SIZE.div_ceil(alignment) * alignment;

        let uniform_buffer = Self::create_uniform_buffer(device, uniform_stride, INITIAL_DRAWS);
        let uniform_bind_group =
            Self::create_uniform_bind_group(device, &uniform_layout, &uniform_buffer);
        let instance_buffer = Self::create_instance_buffer(device, INITIAL_QUADS);

        Self {
            pipeline,
            uniform_layout,
            atlas_layout,
            uniform_buffer,
            uniform_bind_group,
            uniform_stride,
            uniform_capacity: INITIAL_DRAWS,
            instance_buffer,
            instance_capacity: INITIAL_QUADS,
        }
    }

    fn create_uniform_buffer(device: &wgpu::Device, stride: u64, draws: usize) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("text_uniform_buffer"),
            size: stride * draws as u64,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn create_uniform_bind_group(
        device: &wgpu::Device,
        layout: &wgpu::BindGroupLayout,
        buffer: &wgpu::Buffer,
    ) -> wgpu::BindGroup {
        device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some("text_uniform_bind_group"),
            layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::Buffer(wgpu::BufferBinding {
                    buffer,
                    offset: 0,
                    size: NonZeroU64::new(UNIFORM_SIZE),
                }),
            }],
        })
    }

    fn create_instance_buffer(device: &wgpu::Device, quads: usize) -> wgpu::Buffer {
        device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("text_instance_buffer"),
            size: (quads * std::mem::size_of::<GlyphQuad>()) as u64,
            usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
            mapped_at_creation: false,
        })
    }

    fn reserve(&mut self, gpu: &GpuContext, quads: usize, draws: usize) -> FontResult<()> {
        let device = gpu.device();

        if quads > self.instance_capacity {
            let capacity = quads.next_power_of_two();
            self.instance_buffer = Self::create_instance_buffer(device, capacity);
            self.instance_capacity = capacity;
        }

        if draws > self.uniform_capacity {
            let capacity = draws.next_power_of_two();
            if self.uniform_stride * capacity as u64 > device.limits().max_buffer_size {
                return Err(RenderError::TooManyDraws(draws).into());
            }
            self.uniform_buffer = Self::create_uniform_buffer(device, self.uniform_stride, capacity);
            self.uniform_bind_group =
                Self::create_uniform_bind_group(device, &self.uniform_layout, &self.uniform_buffer);
            self.uniform_capacity = capacity;
        }

        Ok(())
    }

    /// Draw `list` on top of the current contents of `target`.
    ///
    /// Draws whose font has no GPU atlas are skipped with a warning.
    pub fn render(
        &mut self,
        gpu: &GpuContext,
        fonts: &FontContext,
        list: &TextDrawList,
        target: &wgpu::TextureView,
    ) -> FontResult<()> {
        if list.is_empty() {
            return Ok(());
        }

        let draws = list.draws();
        self.reserve(gpu, list.quads().len(), draws.len())?;

        let device = gpu.device();
        let queue = gpu.queue();

        queue.write_buffer(&self.instance_buffer, 0, bytemuck::cast_slice(list.quads()));

        let mut uniforms = vec![0u8; (self.uniform_stride as usize) * draws.len()];
        for (i, draw) in draws.iter().enumerate() {
            let block = DrawUniforms {
                projection: draw.projection.to_cols_array_2d(),
                color: draw.color.to_array(),
            };
            let start = i * self.uniform_stride as usize;
            uniforms[start..start + UNIFORM_SIZE as usize]
                .copy_from_slice(bytemuck::bytes_of(&block));
        }
        queue.write_buffer(&self.uniform_buffer, 0, &uniforms);

        let mut atlas_groups = Vec::with_capacity(draws.len());
        for draw in draws {
            let font = fonts.instance(draw.font)?;
            let Some(view) = font.atlas().texture_view() else {
                warn!(
                    target: targets::GPU,
                    font = %font.key(),
                    "font atlas is not on the GPU; draw skipped"
                );
                atlas_groups.push(None);
                continue;
            };
            atlas_groups.push(Some(device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some("glyph_atlas_bind_group"),
                layout: &self.atlas_layout,
                entries: &[wgpu::BindGroupEntry {
                    binding: 0,
                    resource: wgpu::BindingResource::TextureView(view),
                }],
            })));
        }

        let mut encoder = device.create_command_encoder(&wgpu::CommandEncoderDescriptor {
            label: Some("text_render_encoder"),
        });

        {
            let mut pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("text_render_pass"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: target,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            pass.set_pipeline(&self.pipeline);
            pass.set_vertex_buffer(0, self.instance_buffer.slice(..));

            for (i, (draw, group)) in draws.iter().zip(&atlas_groups).enumerate() {
                let Some(group) = group else { continue };
                let offset = (i as u64 * self.uniform_stride) as u32;
                pass.set_bind_group(0, &self.uniform_bind_group, &[offset]);
                pass.set_bind_group(1, group, &[]);
                pass.draw(0..4, draw.quads.clone());
            }
        }

        queue.submit(std::iter::once(encoder.finish()));

        trace!(
            target: targets::GPU,
            draws = draws.len(),
            quads = list.quads().len(),
            "text rendered"
        );

        Ok(())
    }
}

impl std::fmt::Debug for TextRenderer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TextRenderer")
            .field("instance_capacity", &self.instance_capacity)
            .field("uniform_capacity", &self.uniform_capacity)
            .finish()
    }
}
