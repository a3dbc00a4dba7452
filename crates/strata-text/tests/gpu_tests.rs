//! GPU atlas and pipeline tests. They need an adapter, so they are ignored
//! by default; run them with `cargo test -- --ignored` on a machine with a GPU.
#![cfg(feature = "gpu")]

mod common;

use glam::{Mat4, Vec2};
use strata_text::gpu::{GpuAtlas, GpuContext, GraphicsConfig, TextRenderer};
use strata_text::{
    AtlasSurface, Color, FontBackend, FontContext, FontFace, FontKey, FontResult, RenderError,
    TextDrawList, wgpu,
};

fn gpu() -> GpuContext {
    common::init_tracing();
    GpuContext::new(GraphicsConfig::default()).unwrap()
}

#[test]
#[ignore = "requires GPU"]
fn test_gpu_atlas_grows_layers() {
    let gpu = gpu();
    let mut atlas = GpuAtlas::new(gpu.resources(), 64).unwrap();
    assert_eq!(atlas.dimension(), 64);
    assert_eq!(atlas.layer_count(), 1);

    atlas.write(0, 0, 0, 2, 2, &[255; 4]);
    atlas.grow().unwrap();
    atlas.grow().unwrap();
    assert_eq!(atlas.layer_count(), 3);
    assert!(atlas.texture_view().is_some());
    assert_eq!(atlas.texture().depth_or_array_layers(), 3);
}

#[test]
#[ignore = "requires GPU"]
fn test_gpu_atlas_rejects_oversized_dimension() {
    let gpu = gpu();
    let limit = gpu.device().limits().max_texture_dimension_2d;
    let err = GpuAtlas::new(gpu.resources(), limit + 1).unwrap_err();
    assert!(matches!(err, RenderError::TextureTooLarge { .. }));
}

#[test]
#[ignore = "requires GPU"]
fn test_render_stub_font_to_texture() {
    let gpu = gpu();
    let backend = strata_text::gpu::WgpuBackend::new(&gpu);

    // Stub faces with GPU atlases: render through a real pipeline.
    struct GpuStub(strata_text::gpu::WgpuBackend);
    impl FontBackend for GpuStub {
        fn open_face(&self, key: &FontKey) -> FontResult<Box<dyn FontFace>> {
            common::StubBackend::default().open_face(key)
        }
        fn create_atlas(&self, dimension: u32) -> FontResult<Box<dyn AtlasSurface>> {
            self.0.create_atlas(dimension)
        }
    }

    let mut fonts = FontContext::new(GpuStub(backend), common::bare_config()).unwrap();
    let id = fonts.font(&FontKey::new("stub.ttf", 14)).unwrap();

    let format = wgpu::TextureFormat::Rgba8Unorm;
    let target = gpu.device().create_texture(&wgpu::TextureDescriptor {
        label: Some("text_test_target"),
        size: wgpu::Extent3d {
            width: 64,
            height: 32,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    let view = target.create_view(&wgpu::TextureViewDescriptor::default());

    let mut renderer = TextRenderer::new(&gpu, format);
    let projection = Mat4::orthographic_rh(0.0, 64.0, 32.0, 0.0, -1.0, 1.0);
    let mut list = TextDrawList::new();
    for row in 0..3 {
        fonts
            .render_text(
                &mut list,
                id,
                projection,
                Vec2::new(0.0, row as f32 * 10.0),
                b"Hi!",
                Color::WHITE,
            )
            .unwrap();
    }
    assert_eq!(list.draws().len(), 3);
    renderer.render(&gpu, &fonts, &list, &view).unwrap();
    gpu.device().poll(wgpu::Maintain::Wait);
}
