//! Font backend that places atlases on the GPU.

use std::sync::Arc;

use super::atlas::GpuAtlas;
use super::context::{GpuContext, GpuResources};
use crate::atlas::AtlasSurface;
use crate::context::FontBackend;
use crate::error::FontResult;
use crate::face::{FontFace, TtfFace};
use crate::font_cache::FontKey;

/// Opens faces from font files and creates [`GpuAtlas`] surfaces.
#[derive(Debug, Clone)]
pub struct WgpuBackend {
    gpu: Arc<GpuResources>,
}

impl WgpuBackend {
    /// A backend creating atlases on `gpu`'s device.
    pub fn new(gpu: &GpuContext) -> Self {
        Self {
            gpu: gpu.resources(),
        }
    }
}

impl FontBackend for WgpuBackend {
    fn open_face(&self, key: &FontKey) -> FontResult<Box<dyn FontFace>> {
        Ok(Box::new(TtfFace::open(&key.path, key.pixel_size, &key.axes)?))
    }

    fn create_atlas(&self, dimension: u32) -> FontResult<Box<dyn AtlasSurface>> {
        Ok(Box::new(GpuAtlas::new(Arc::clone(&self.gpu), dimension)?))
    }
}
