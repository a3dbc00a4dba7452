//! The shared layout loop.
//!
//! Drawing, width measurement and hit-testing all walk text through
//! [`FontInstance::layout`], differing only in the [`LayoutSink`] that
//! receives each placed glyph. Because the pen arithmetic exists once, the
//! width used to lay out a line is exactly the width used to draw it and to map
//! a click back to a byte offset.
//!
//! Per decoded codepoint, in order:
//! 1. add kerning between the previous and current glyph, if the face has any;
//! 2. hand the glyph and its pen position to the sink;
//! 3. advance the pen by the glyph's advance;
//! 4. remember the glyph index for the next kerning query.
//!
//! A NUL byte ends the run.

use std::ops::ControlFlow;

use glam::Vec2;

use crate::draw::GlyphQuad;
use crate::error::FontResult;
use crate::font::FontInstance;
use crate::glyph_cache::GlyphEntry;
use crate::utf8::Utf8Decoder;

/// A glyph at its position in the run.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlacedGlyph {
    /// Byte offset of the codepoint in the input.
    pub offset: usize,
    /// Encoded length of the codepoint in bytes.
    pub len: usize,
    /// Pen position after kerning, before the advance.
    pub pen_x: f32,
    /// Kerning added before this glyph.
    pub kerning: f32,
    /// The cached glyph.
    pub entry: GlyphEntry,
}

impl PlacedGlyph {
    /// Pen position after this glyph's advance.
    pub fn pen_after(&self) -> f32 {
        self.pen_x + self.entry.advance_x
    }
}

/// Receives glyphs from the layout loop, left to right in byte order.
pub trait LayoutSink {
    /// Called once per decoded codepoint. Returning `Break` stops the run.
    fn glyph(&mut self, glyph: &PlacedGlyph) -> ControlFlow<()>;
}

impl<F: FnMut(&PlacedGlyph) -> ControlFlow<()>> LayoutSink for F {
    fn glyph(&mut self, glyph: &PlacedGlyph) -> ControlFlow<()> {
        self(glyph)
    }
}

/// Consumes glyphs without recording anything; the width is the final pen.
#[derive(Debug, Default)]
pub struct MeasureSink;

impl LayoutSink for MeasureSink {
    fn glyph(&mut self, _: &PlacedGlyph) -> ControlFlow<()> {
        ControlFlow::Continue(())
    }
}

/// Finds the first codepoint whose post-advance pen passes a target width.
#[derive(Debug)]
pub struct IndexAtWidthSink {
    target: f32,
    found: Option<usize>,
}

impl IndexAtWidthSink {
    /// Search for `target` pixels.
    pub fn new(target: f32) -> Self {
        Self {
            target,
            found: None,
        }
    }

    /// Byte offset of the codepoint that crossed the target, if any did.
    pub fn found(&self) -> Option<usize> {
        self.found
    }
}

impl LayoutSink for IndexAtWidthSink {
    fn glyph(&mut self, glyph: &PlacedGlyph) -> ControlFlow<()> {
        if glyph.pen_after() > self.target {
            self.found = Some(glyph.offset);
            ControlFlow::Break(())
        } else {
            ControlFlow::Continue(())
        }
    }
}

/// Emits one [`GlyphQuad`] per visible glyph.
#[derive(Debug)]
pub struct QuadSink<'a> {
    origin: Vec2,
    ascender: f32,
    quads: &'a mut Vec<GlyphQuad>,
}

impl<'a> QuadSink<'a> {
    /// Place quads for a run whose line box top-left is at `origin`.
    pub fn new(origin: Vec2, ascender: f32, quads: &'a mut Vec<GlyphQuad>) -> Self {
        Self {
            origin,
            ascender,
            quads,
        }
    }
}

impl LayoutSink for QuadSink<'_> {
    fn glyph(&mut self, glyph: &PlacedGlyph) -> ControlFlow<()> {
        let entry = &glyph.entry;
        if let Some(cell) = entry.cell.filter(|_| entry.is_visible()) {
            let left = self.origin.x + glyph.pen_x + entry.bearing_x;
            let top = self.origin.y + self.ascender - entry.bearing_y;
            self.quads.push(GlyphQuad::new(
                [
                    left,
                    top,
                    entry.bitmap_width as f32,
                    entry.bitmap_height as f32,
                ],
                [
                    cell.x as f32,
                    cell.y as f32,
                    entry.bitmap_width as f32,
                    entry.bitmap_height as f32,
                ],
                cell.layer,
            ));
        }
        ControlFlow::Continue(())
    }
}

impl FontInstance {
    /// Lay out `text`, feeding every glyph to `sink`, and return the final
    /// pen position.
    ///
    /// Glyphs seen for the first time are rasterized and uploaded before they
    /// reach the sink, so no glyph is skipped on first sight.
    pub fn layout(&mut self, text: &[u8], sink: &mut dyn LayoutSink) -> FontResult<f32> {
        let mut pen = 0.0f32;
        let mut previous: Option<u32> = None;

        for decoded in Utf8Decoder::new(text) {
            if decoded.codepoint == 0 {
                break;
            }

            let entry = self.ensure_glyph(decoded.codepoint)?;

            let kerning = match previous {
                Some(prev) => self.kerning(prev, entry.glyph_index),
                None => 0.0,
            };
            pen += kerning;

            let placed = PlacedGlyph {
                offset: decoded.offset,
                len: decoded.len,
                pen_x: pen,
                kerning,
                entry,
            };
            if sink.glyph(&placed).is_break() {
                return Ok(pen);
            }

            pen += entry.advance_x;
            previous = Some(entry.glyph_index);
        }

        Ok(pen)
    }

    /// Width of `text` in pixels.
    pub fn measure_width(&mut self, text: &[u8]) -> FontResult<f32> {
        self.layout(text, &mut MeasureSink)
    }

    /// Byte offset of the first codepoint whose right edge (pen after its
    /// advance) lies past `target` pixels, or the length of the run if the
    /// whole run fits.
    pub fn index_at_width(&mut self, text: &[u8], target: f32) -> FontResult<usize> {
        let mut sink = IndexAtWidthSink::new(target);
        self.layout(text, &mut sink)?;
        Ok(sink.found().unwrap_or_else(|| run_len(text)))
    }

    /// Append draw quads for `text` with its line box top-left at `origin`,
    /// returning the width of the run.
    pub fn layout_quads(
        &mut self,
        text: &[u8],
        origin: Vec2,
        quads: &mut Vec<GlyphQuad>,
    ) -> FontResult<f32> {
        let ascender = self.ascender();
        self.layout(text, &mut QuadSink::new(origin, ascender, quads))
    }
}

/// Length of the run up to the first NUL byte.
fn run_len(text: &[u8]) -> usize {
    text.iter().position(|&b| b == 0).unwrap_or(text.len())
}
