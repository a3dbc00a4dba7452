//! Font faces: the boundary to font parsing and glyph rasterization.
//!
//! The glyph cache and layout only see the [`FontFace`] trait. [`TtfFace`]
//! implements it with `ttf-parser` for tables, metrics, variation axes and
//! kerning (kept parsed through `owned_ttf_parser`), and `tiny-skia` for
//! anti-aliased coverage of glyph outlines.

use std::fmt;
use std::path::{Path, PathBuf};

use tiny_skia::{FillRule, Paint, Pixmap, Transform};
use owned_ttf_parser::{AsFaceRef, FaceMut, OwnedFace};
use tracing::warn;
use ttf_parser::{Face, GlyphId, OutlineBuilder, Tag};

use crate::error::{FontError, FontResult};
use crate::logging::targets;

/// Face-level vertical metrics at the selected pixel size.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LineMetrics {
    /// Distance from the baseline to the top of the line box.
    pub ascender: f32,
    /// Distance from the baseline to the bottom of the line box (negative).
    pub descender: f32,
    /// Extra space between lines.
    pub line_gap: f32,
}

impl LineMetrics {
    /// Baseline-to-baseline distance.
    pub fn line_height(&self) -> f32 {
        self.ascender - self.descender + self.line_gap
    }

    /// Height of the line box without the gap.
    pub fn text_height(&self) -> f32 {
        self.ascender - self.descender
    }
}

/// A rendered glyph with its metrics, as produced by the face.
///
/// Coverage is linear (not gamma corrected), one byte per pixel, row-major.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct GlyphBitmap {
    /// Bitmap width in pixels.
    pub width: u32,
    /// Bitmap height in pixels.
    pub height: u32,
    /// Pen-relative x offset of the bitmap's left edge.
    pub bearing_x: f32,
    /// Baseline-relative y offset of the bitmap's top edge (up is positive).
    pub bearing_y: f32,
    /// Horizontal pen advance.
    pub advance_x: f32,
    /// Coverage samples, `width * height` bytes.
    pub coverage: Vec<u8>,
}

impl GlyphBitmap {
    /// A glyph with no visible pixels that only advances the pen.
    pub fn empty(advance_x: f32) -> Self {
        Self {
            advance_x,
            ..Self::default()
        }
    }

    /// Whether there is nothing to upload.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Everything the glyph cache and layout need from a loaded, sized face.
pub trait FontFace {
    /// The pixel size the face was opened at.
    fn pixel_size(&self) -> u32;

    /// Ascender, descender and line gap in pixels.
    fn line_metrics(&self) -> LineMetrics;

    /// Width and height of the face bounding box in pixels.
    fn bounding_box_px(&self) -> (u32, u32);

    /// Whether [`kerning`](Self::kerning) can return non-zero values.
    fn has_kerning(&self) -> bool;

    /// Face glyph index for a codepoint, 0 for "missing glyph".
    fn glyph_index(&self, codepoint: u32) -> u32;

    /// Render a glyph's coverage bitmap and metrics.
    fn render_glyph(&self, glyph_index: u32) -> FontResult<GlyphBitmap>;

    /// Horizontal kerning between two glyph indices, in whole pixels
    /// (truncated toward zero).
    fn kerning(&self, left: u32, right: u32) -> f32;
}

/// Requested style-axis positions. `None` keeps the face default.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StyleAxes {
    /// `wght` axis.
    pub weight: Option<i32>,
    /// `slnt` axis.
    pub slant: Option<i32>,
    /// `wdth` axis.
    pub width: Option<i32>,
}

impl StyleAxes {
    /// No axes requested.
    pub const DEFAULT: Self = Self {
        weight: None,
        slant: None,
        width: None,
    };

    /// Request a weight.
    pub fn with_weight(mut self, weight: i32) -> Self {
        self.weight = Some(weight);
        self
    }

    /// Request a slant.
    pub fn with_slant(mut self, slant: i32) -> Self {
        self.slant = Some(slant);
        self
    }

    /// Request a width.
    pub fn with_width(mut self, width: i32) -> Self {
        self.width = Some(width);
        self
    }

    /// Whether any axis is requested.
    pub fn any(&self) -> bool {
        self.weight.is_some() || self.slant.is_some() || self.width.is_some()
    }

    fn requests(&self) -> [(Tag, &'static str, Option<i32>); 3] {
        [
            (Tag::from_bytes(b"wght"), "weight", self.weight),
            (Tag::from_bytes(b"slnt"), "slant", self.slant),
            (Tag::from_bytes(b"wdth"), "width", self.width),
        ]
    }
}

/// Clamp a requested axis value into `[min, max]`, warning when it is out of range.
pub fn clamp_axis(path: &Path, axis: &str, requested: i32, min: i32, max: i32) -> i32 {
    if requested < min {
        warn!(
            target: targets::FONT,
            path = %path.display(),
            axis,
            requested,
            min,
            "requested axis value below minimum"
        );
        min
    } else if requested > max {
        warn!(
            target: targets::FONT,
            path = %path.display(),
            axis,
            requested,
            max,
            "requested axis value above maximum"
        );
        max
    } else {
        requested
    }
}

/// A face parsed with `ttf-parser`, fixed at one pixel size and axis position.
///
/// The face is parsed once, with its variation coordinates applied, and kept
/// alongside the font bytes it borrows from.
pub struct TtfFace {
    path: PathBuf,
    face: OwnedFace,
    variations: Vec<(Tag, f32)>,
    pixel_size: u32,
    scale: f32,
    line_metrics: LineMetrics,
    bbox: (u32, u32),
    has_kerning: bool,
}

impl TtfFace {
    /// Load face 0 of a font file at `pixel_size`, applying `axes`.
    pub fn open(path: impl AsRef<Path>, pixel_size: u32, axes: &StyleAxes) -> FontResult<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path).map_err(|e| FontError::Load {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        Self::from_bytes(path, data, pixel_size, axes)
    }

    /// Build a face from font bytes already in memory.
    ///
    /// `path` is only used for diagnostics.
    pub fn from_bytes(
        path: impl Into<PathBuf>,
        data: Vec<u8>,
        pixel_size: u32,
        axes: &StyleAxes,
    ) -> FontResult<Self> {
        let path = path.into();
        if pixel_size == 0 {
            return Err(FontError::InvalidPixelSize(pixel_size));
        }

        let mut owned = OwnedFace::from_vec(data, 0).map_err(|e| FontError::Load {
            path: path.clone(),
            reason: e.to_string(),
        })?;

        let variations = resolve_variations(owned.as_face_ref(), &path, axes);
        for &(tag, value) in &variations {
            owned.set_variation(tag, value);
        }

        let (scale, line_metrics, bbox, has_kerning) = {
            let face = owned.as_face_ref();

            let scale = pixel_size as f32 / f32::from(face.units_per_em());
            let line_metrics = LineMetrics {
                ascender: f32::from(face.ascender()) * scale,
                descender: f32::from(face.descender()) * scale,
                line_gap: f32::from(face.line_gap()) * scale,
            };

            let bbox = face.global_bounding_box();
            let bbox_w = (f32::from(bbox.x_max) - f32::from(bbox.x_min)) * scale;
            let bbox_h = (f32::from(bbox.y_max) - f32::from(bbox.y_min)) * scale;

            (
                scale,
                line_metrics,
                (bbox_w.ceil().max(0.0) as u32, bbox_h.ceil().max(0.0) as u32),
                face.tables().kern.is_some(),
            )
        };

        Ok(Self {
            path,
            face: owned,
            variations,
            pixel_size,
            scale,
            line_metrics,
            bbox,
            has_kerning,
        })
    }

    /// The file the face was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Axis positions applied to the face, after clamping.
    pub fn variations(&self) -> impl Iterator<Item = ([u8; 4], f32)> + '_ {
        self.variations
            .iter()
            .map(|(tag, value)| (tag.to_bytes(), *value))
    }

    fn face(&self) -> &Face<'_> {
        self.face.as_face_ref()
    }

    fn rasterize_outline(&self, face: &Face<'_>, glyph: GlyphId) -> FontResult<Option<RasterizedOutline>> {
        let mut builder = PixelPathBuilder::new(self.scale);
        if face.outline_glyph(glyph, &mut builder).is_none() {
            return Ok(None);
        }
        let Some(path) = builder.finish() else {
            return Ok(None);
        };

        let bounds = path.bounds();
        let left = bounds.left().floor();
        let top = bounds.top().floor();
        let width = (bounds.right().ceil() - left) as u32;
        let height = (bounds.bottom().ceil() - top) as u32;
        if width == 0 || height == 0 {
            return Ok(None);
        }

        let mut pixmap = Pixmap::new(width, height).ok_or_else(|| FontError::Rasterization {
            glyph_index: u32::from(glyph.0),
            reason: format!("couldn't allocate {width}x{height} pixmap"),
        })?;

        let mut paint = Paint::default();
        paint.set_color(tiny_skia::Color::WHITE);
        paint.anti_alias = true;

        pixmap.fill_path(
            &path,
            &paint,
            FillRule::Winding,
            Transform::from_translate(-left, -top),
            None,
        );

        Ok(Some(RasterizedOutline {
            left,
            top,
            width,
            height,
            coverage: pixmap.pixels().iter().map(|p| p.alpha()).collect(),
        }))
    }
}

struct RasterizedOutline {
    left: f32,
    top: f32,
    width: u32,
    height: u32,
    coverage: Vec<u8>,
}

fn resolve_variations(face: &Face<'_>, path: &Path, axes: &StyleAxes) -> Vec<(Tag, f32)> {
    if !face.is_variable() {
        if axes.any() {
            warn!(
                target: targets::FONT,
                path = %path.display(),
                "not a variable font; weight, slant and width are ignored"
            );
        }
        return Vec::new();
    }

    let ranges = face
        .variation_axes()
        .into_iter()
        .map(|axis| (axis.tag, axis.min_value, axis.max_value));
    match_axes(ranges, path, axes)
}

/// Pair each requested axis with the face axis carrying its tag, clamped into
/// that axis' range. Requests for axes the face lacks are dropped.
fn match_axes(
    face_axes: impl IntoIterator<Item = (Tag, f32, f32)>,
    path: &Path,
    axes: &StyleAxes,
) -> Vec<(Tag, f32)> {
    let mut variations = Vec::new();
    for (tag, min, max) in face_axes {
        for (wanted, name, requested) in axes.requests() {
            if wanted != tag {
                continue;
            }
            if let Some(value) = requested {
                let clamped = clamp_axis(path, name, value, min as i32, max as i32);
                variations.push((tag, clamped as f32));
            }
        }
    }
    variations
}

impl FontFace for TtfFace {
    fn pixel_size(&self) -> u32 {
        self.pixel_size
    }

    fn line_metrics(&self) -> LineMetrics {
        self.line_metrics
    }

    fn bounding_box_px(&self) -> (u32, u32) {
        self.bbox
    }

    fn has_kerning(&self) -> bool {
        self.has_kerning
    }

    fn glyph_index(&self, codepoint: u32) -> u32 {
        let Some(ch) = char::from_u32(codepoint) else {
            return 0;
        };
        self.face()
            .glyph_index(ch)
            .map_or(0, |g| u32::from(g.0))
    }

    fn render_glyph(&self, glyph_index: u32) -> FontResult<GlyphBitmap> {
        let glyph = u16::try_from(glyph_index)
            .map(GlyphId)
            .map_err(|_| FontError::Rasterization {
                glyph_index,
                reason: "glyph index out of range".into(),
            })?;
        let face = self.face();

        let advance_x = face
            .glyph_hor_advance(glyph)
            .map_or(0.0, |adv| f32::from(adv) * self.scale);

        match self.rasterize_outline(face, glyph)? {
            None => Ok(GlyphBitmap::empty(advance_x)),
            Some(outline) => Ok(GlyphBitmap {
                width: outline.width,
                height: outline.height,
                bearing_x: outline.left,
                bearing_y: -outline.top,
                advance_x,
                coverage: outline.coverage,
            }),
        }
    }

    fn kerning(&self, left: u32, right: u32) -> f32 {
        let (Ok(left), Ok(right)) = (u16::try_from(left), u16::try_from(right)) else {
            return 0.0;
        };
        let Some(kern) = self.face().tables().kern else {
            return 0.0;
        };

        kern.subtables
            .into_iter()
            .filter(|st| st.horizontal && !st.variable)
            .find_map(|st| st.glyphs_kerning(GlyphId(left), GlyphId(right)))
            .map_or(0.0, |units| (f32::from(units) * self.scale).trunc())
    }
}

impl fmt::Debug for TtfFace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TtfFace")
            .field("path", &self.path)
            .field("pixel_size", &self.pixel_size)
            .field("variations", &self.variations.len())
            .field("has_kerning", &self.has_kerning)
            .finish_non_exhaustive()
    }
}

/// Converts `ttf-parser` outlines to a `tiny-skia` path in pixel space,
/// y pointing down, origin on the baseline at the pen position.
struct PixelPathBuilder {
    builder: tiny_skia::PathBuilder,
    scale: f32,
}

impl PixelPathBuilder {
    fn new(scale: f32) -> Self {
        Self {
            builder: tiny_skia::PathBuilder::new(),
            scale,
        }
    }

    fn x(&self, x: f32) -> f32 {
        x * self.scale
    }

    fn y(&self, y: f32) -> f32 {
        -y * self.scale
    }

    fn finish(self) -> Option<tiny_skia::Path> {
        self.builder.finish()
    }
}

impl OutlineBuilder for PixelPathBuilder {
    fn move_to(&mut self, x: f32, y: f32) {
        self.builder.move_to(self.x(x), self.y(y));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.builder.line_to(self.x(x), self.y(y));
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.builder
            .quad_to(self.x(x1), self.y(y1), self.x(x), self.y(y));
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.builder.cubic_to(
            self.x(x1),
            self.y(y1),
            self.x(x2),
            self.y(y2),
            self.x(x),
            self.y(y),
        );
    }

    fn close(&mut self) {
        self.builder.close();
    }
}
