//! Layered glyph atlas.
//!
//! Each font owns one atlas: a 2-D array texture of square layers split into
//! fixed-size cells, one glyph per cell. Glyphs are placed by ordinal, in the
//! order they are first rasterized, so placement never needs a packer.
//!
//! When a glyph's ordinal spills past the last layer, the surface grows by one
//! layer: a new `(n + 1)`-layer array is allocated, layers `0..n` are copied
//! into it at identical coordinates, and only then does it replace the old
//! array. A glyph's `(x, y, layer)` therefore never changes once recorded.

use tracing::info;

use crate::error::{FontError, FontResult};
use crate::logging::targets;

/// Storage for atlas layers.
///
/// Implemented by [`MemoryAtlas`] for headless use and by
/// `GpuAtlas` for a wgpu texture array.
pub trait AtlasSurface {
    /// Width and height of every layer.
    fn dimension(&self) -> u32;

    /// Current number of layers.
    fn layer_count(&self) -> u32;

    /// Add one layer, preserving the contents of every existing layer.
    ///
    /// Either the surface ends up with one more layer or it is unchanged.
    fn grow(&mut self) -> FontResult<()>;

    /// Write a `width * height` block of coverage at `(x, y)` in `layer`.
    fn write(&mut self, x: u32, y: u32, layer: u32, width: u32, height: u32, pixels: &[u8]);

    /// Read back one coverage byte, when the surface keeps a CPU copy.
    fn read(&self, x: u32, y: u32, layer: u32) -> Option<u8> {
        let _ = (x, y, layer);
        None
    }

    /// Texture view for drawing, when the surface lives on the GPU.
    #[cfg(feature = "gpu")]
    fn texture_view(&self) -> Option<&wgpu::TextureView> {
        None
    }
}

/// Where a cell lives in the atlas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CellLocation {
    /// Left edge in pixels.
    pub x: u32,
    /// Top edge in pixels.
    pub y: u32,
    /// Array layer.
    pub layer: u32,
}

/// Fixed cell layout of one font's atlas.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CellGrid {
    cell_size: u32,
    atlas_dim: u32,
    per_row: u32,
    per_layer: u32,
}

impl CellGrid {
    /// Lay out `cell_size` cells on `atlas_dim` square layers.
    ///
    /// Fails when not even one cell fits.
    pub fn new(cell_size: u32, atlas_dim: u32) -> FontResult<Self> {
        let cell_size = cell_size.max(1);
        let per_row = atlas_dim / cell_size;
        if per_row == 0 {
            return Err(FontError::CellTooLarge {
                cell_size,
                atlas_size: atlas_dim,
            });
        }
        Ok(Self {
            cell_size,
            atlas_dim,
            per_row,
            per_layer: per_row * per_row,
        })
    }

    /// Width and height of a cell.
    pub fn cell_size(&self) -> u32 {
        self.cell_size
    }

    /// Width and height of a layer.
    pub fn atlas_dim(&self) -> u32 {
        self.atlas_dim
    }

    /// Cells in one row of a layer.
    pub fn per_row(&self) -> u32 {
        self.per_row
    }

    /// Cells in one layer.
    pub fn per_layer(&self) -> u32 {
        self.per_layer
    }

    /// Layers needed to hold cell `ordinal`.
    pub fn layers_for(&self, ordinal: u32) -> u32 {
        ordinal / self.per_layer + 1
    }

    /// Pixel origin and layer of cell `ordinal`.
    pub fn locate(&self, ordinal: u32) -> CellLocation {
        let col = ordinal % self.per_row;
        let row = (ordinal % self.per_layer) / self.per_row;
        CellLocation {
            x: col * self.cell_size,
            y: row * self.cell_size,
            layer: ordinal / self.per_layer,
        }
    }
}

/// Statistics about atlas usage.
#[derive(Debug, Clone, Default)]
pub struct AtlasStats {
    /// Cells handed out.
    pub cells_allocated: u32,
    /// Times a layer was added.
    pub layer_growths: u64,
    /// Bytes written to the surface.
    pub bytes_uploaded: u64,
}

/// Hands out cells in ordinal order and grows the surface when needed.
pub struct AtlasPageStore {
    surface: Box<dyn AtlasSurface>,
    grid: CellGrid,
    allocated: u32,
    stats: AtlasStats,
}

impl AtlasPageStore {
    /// Wrap a surface that already has at least one layer.
    pub fn new(surface: Box<dyn AtlasSurface>, cell_size: u32) -> FontResult<Self> {
        let grid = CellGrid::new(cell_size, surface.dimension())?;
        Ok(Self {
            surface,
            grid,
            allocated: 0,
            stats: AtlasStats::default(),
        })
    }

    /// The cell layout.
    pub fn grid(&self) -> &CellGrid {
        &self.grid
    }

    /// Current number of layers.
    pub fn layer_count(&self) -> u32 {
        self.surface.layer_count()
    }

    /// Number of cells handed out so far.
    pub fn allocated(&self) -> u32 {
        self.allocated
    }

    /// Usage statistics.
    pub fn stats(&self) -> &AtlasStats {
        &self.stats
    }

    /// The underlying surface.
    pub fn surface(&self) -> &dyn AtlasSurface {
        self.surface.as_ref()
    }

    /// Make sure the layer holding ordinal `ordinal` exists, growing the
    /// surface one layer at a time, and return that layer.
    ///
    /// Every cached glyph reserves its layer this way, including glyphs with
    /// nothing to upload, so growth happens exactly when the glyph count
    /// crosses a layer boundary.
    pub fn reserve_layer(&mut self, ordinal: u32) -> FontResult<u32> {
        let needed = self.grid.layers_for(ordinal);
        while self.surface.layer_count() < needed {
            let before = self.surface.layer_count();
            self.surface.grow()?;
            self.stats.layer_growths += 1;
            info!(
                target: targets::ATLAS,
                from = before,
                to = self.surface.layer_count(),
                ordinal,
                "atlas grown"
            );
        }
        Ok(needed - 1)
    }

    /// Location of cell `ordinal`, growing the surface first if the cell lies
    /// past the last layer.
    pub fn allocate(&mut self, ordinal: u32) -> FontResult<CellLocation> {
        self.reserve_layer(ordinal)?;
        self.allocated = self.allocated.max(ordinal + 1);
        self.stats.cells_allocated = self.allocated;
        Ok(self.grid.locate(ordinal))
    }

    /// Copy a bitmap into an allocated cell.
    ///
    /// Bitmaps larger than a cell are clipped to the cell.
    pub fn upload(&mut self, cell: CellLocation, width: u32, height: u32, pixels: &[u8]) {
        let cell_size = self.grid.cell_size;
        if width <= cell_size && height <= cell_size {
            self.surface
                .write(cell.x, cell.y, cell.layer, width, height, pixels);
            self.stats.bytes_uploaded += u64::from(width * height);
            return;
        }

        let w = width.min(cell_size);
        let h = height.min(cell_size);
        let mut clipped = Vec::with_capacity((w * h) as usize);
        for row in pixels.chunks(width as usize).take(h as usize) {
            clipped.extend_from_slice(&row[..w as usize]);
        }
        self.surface.write(cell.x, cell.y, cell.layer, w, h, &clipped);
        self.stats.bytes_uploaded += u64::from(w * h);
    }
}

impl std::fmt::Debug for AtlasPageStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AtlasPageStore")
            .field("grid", &self.grid)
            .field("layers", &self.surface.layer_count())
            .field("allocated", &self.allocated)
            .finish()
    }
}

/// An atlas held in system memory.
///
/// Used without a GPU, and as the reference behavior for `GpuAtlas`.
#[derive(Clone)]
pub struct MemoryAtlas {
    dim: u32,
    layers: u32,
    pixels: Vec<u8>,
}

impl MemoryAtlas {
    /// One zeroed layer of `dim * dim` bytes.
    pub fn new(dim: u32) -> Self {
        Self {
            dim,
            layers: 1,
            pixels: vec![0; (dim * dim) as usize],
        }
    }

    fn layer_len(&self) -> usize {
        (self.dim * self.dim) as usize
    }

    /// Coverage byte at `(x, y)` in `layer`, or `None` outside the atlas.
    pub fn pixel(&self, x: u32, y: u32, layer: u32) -> Option<u8> {
        if x >= self.dim || y >= self.dim || layer >= self.layers {
            return None;
        }
        let idx = layer as usize * self.layer_len() + (y * self.dim + x) as usize;
        self.pixels.get(idx).copied()
    }

    /// All bytes of one layer.
    pub fn layer(&self, layer: u32) -> Option<&[u8]> {
        let len = self.layer_len();
        let start = layer as usize * len;
        self.pixels.get(start..start + len)
    }
}

impl AtlasSurface for MemoryAtlas {
    fn dimension(&self) -> u32 {
        self.dim
    }

    fn layer_count(&self) -> u32 {
        self.layers
    }

    fn grow(&mut self) -> FontResult<()> {
        let mut grown = vec![0; self.layer_len() * (self.layers as usize + 1)];
        grown[..self.pixels.len()].copy_from_slice(&self.pixels);
        self.pixels = grown;
        self.layers += 1;
        Ok(())
    }

    fn read(&self, x: u32, y: u32, layer: u32) -> Option<u8> {
        self.pixel(x, y, layer)
    }

    fn write(&mut self, x: u32, y: u32, layer: u32, width: u32, height: u32, pixels: &[u8]) {
        if layer >= self.layers || x + width > self.dim || y + height > self.dim {
            return;
        }
        let base = layer as usize * self.layer_len();
        for (row, src) in pixels.chunks(width as usize).take(height as usize).enumerate() {
            let start = base + ((y as usize + row) * self.dim as usize) + x as usize;
            self.pixels[start..start + src.len()].copy_from_slice(src);
        }
    }
}

impl std::fmt::Debug for MemoryAtlas {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemoryAtlas")
            .field("dim", &self.dim)
            .field("layers", &self.layers)
            .finish()
    }
}
