//! Draw records produced by text layout.
//!
//! Layout appends one [`GlyphQuad`] per visible glyph to a [`TextDrawList`];
//! each `render_text` call also records a [`TextDraw`] naming the font whose
//! atlas the quads sample, the projection and the color. The list is handed to
//! the GPU renderer once per frame.

use std::ops::Range;

use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::font_cache::FontId;
use crate::types::Color;

/// One glyph instance: where it goes on screen and where it lives in the atlas.
///
/// This is the per-instance vertex format of the text pipeline.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GlyphQuad {
    /// Screen rectangle: left, top, width, height in pixels.
    pub screen: [f32; 4],
    /// Atlas rectangle: x, y, width, height in texels.
    pub atlas: [f32; 4],
    /// Atlas layer.
    pub layer: u32,
}

impl GlyphQuad {
    /// Create a quad.
    pub fn new(screen: [f32; 4], atlas: [f32; 4], layer: u32) -> Self {
        Self {
            screen,
            atlas,
            layer,
        }
    }

    #[cfg(feature = "gpu")]
    const ATTRIBS: [wgpu::VertexAttribute; 3] = wgpu::vertex_attr_array![
        0 => Float32x4, // screen
        1 => Float32x4, // atlas
        2 => Uint32,    // layer
    ];

    /// Instance buffer layout for the text pipeline.
    #[cfg(feature = "gpu")]
    pub fn buffer_layout() -> wgpu::VertexBufferLayout<'static> {
        wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Self>() as wgpu::BufferAddress,
            step_mode: wgpu::VertexStepMode::Instance,
            attributes: &Self::ATTRIBS,
        }
    }
}

/// One `render_text` call.
#[derive(Debug, Clone, PartialEq)]
pub struct TextDraw {
    /// Font whose atlas the quads reference.
    pub font: FontId,
    /// Maps pixel coordinates to clip space.
    pub projection: Mat4,
    /// Premultiplied text color.
    pub color: Color,
    /// Quads belonging to this draw.
    pub quads: Range<u32>,
}

/// Quads and draws accumulated for one frame.
#[derive(Debug, Default, Clone)]
pub struct TextDrawList {
    quads: Vec<GlyphQuad>,
    draws: Vec<TextDraw>,
}

impl TextDrawList {
    /// Create an empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// All quads, in emission order.
    pub fn quads(&self) -> &[GlyphQuad] {
        &self.quads
    }

    /// All draws, in call order.
    pub fn draws(&self) -> &[TextDraw] {
        &self.draws
    }

    /// Quads of one draw.
    pub fn quads_of(&self, draw: &TextDraw) -> &[GlyphQuad] {
        &self.quads[draw.quads.start as usize..draw.quads.end as usize]
    }

    /// Whether there is nothing to draw.
    pub fn is_empty(&self) -> bool {
        self.quads.is_empty()
    }

    /// Drop everything, keeping allocations.
    pub fn clear(&mut self) {
        self.quads.clear();
        self.draws.clear();
    }

    /// Append quads via `emit` and record them as one draw.
    ///
    /// Nothing is recorded if `emit` fails or adds no quads.
    pub(crate) fn record<E>(
        &mut self,
        font: FontId,
        projection: Mat4,
        color: Color,
        emit: impl FnOnce(&mut Vec<GlyphQuad>) -> Result<f32, E>,
    ) -> Result<f32, E> {
        let start = self.quads.len();
        let width = match emit(&mut self.quads) {
            Ok(width) => width,
            Err(err) => {
                self.quads.truncate(start);
                return Err(err);
            }
        };
        if self.quads.len() > start {
            self.draws.push(TextDraw {
                font,
                projection,
                color,
                quads: start as u32..self.quads.len() as u32,
            });
        }
        Ok(width)
    }
}
