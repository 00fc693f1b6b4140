// device.rs — the GPU seam. The batcher, flush engine and clip stack only
// ever talk to the GPU through `GpuDevice`; `GlDevice` backs it with real GL
// calls and `RecordingDevice` backs it headlessly for tests and tracing.

use crate::geometry::IRect;
use crate::vertex::{Topology, Vertex};

/// Opaque texture handle (GL texture name for `GlDevice`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u32);

/// Opaque vertex array handle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct VaoId(pub u32);

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TextureFormat {
    #[default]
    Rgba8,
    /// Single coverage channel, sampled as `.r` (glyph atlases).
    R8,
}

impl TextureFormat {
    pub fn bytes_per_pixel(self) -> usize {
        match self {
            Self::Rgba8 => 4,
            Self::R8 => 1,
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Filter {
    #[default]
    Linear,
    Nearest,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WrapMode {
    #[default]
    ClampToEdge,
    Repeat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureDesc {
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub filter: Filter,
}

impl TextureDesc {
    pub fn byte_len(&self) -> usize {
        self.width as usize * self.height as usize * self.format.bytes_per_pixel()
    }
}

/// Texture creation and sub-image updates. Split out of `GpuDevice` so glyph
/// sources can upload atlas pixels without seeing the rest of the device.
pub trait TextureStore {
    fn create_texture(&mut self, desc: &TextureDesc, pixels: &[u8]) -> TextureId;

    /// Replace the `region` of `texture` with tightly packed `pixels`.
    fn update_texture(&mut self, texture: TextureId, region: IRect, pixels: &[u8]);

    fn delete_texture(&mut self, texture: TextureId);
}

/// Everything the flush engine and clip stack need from the GPU. Every method
/// must be called on the thread that owns the current GL context.
pub trait GpuDevice: TextureStore {
    fn create_vertex_array(&mut self) -> VaoId;
    fn vertex_array_exists(&self, vao: VaoId) -> bool;
    fn delete_vertex_array(&mut self, vao: VaoId);
    fn bind_vertex_array(&mut self, vao: VaoId);

    /// Activate the shared shader program.
    fn use_program(&mut self);
    fn set_projection(&mut self, matrix: &[f32; 16]);
    fn set_gamma(&mut self, gamma: f32);

    /// Bind `texture` to unit 0, or unbind and switch the shader's texturing
    /// flag off for `None`.
    fn bind_texture(&mut self, texture: Option<TextureId>);

    /// Upload the used prefix of the staging arrays.
    fn upload_vertices(&mut self, vertices: &[Vertex]);
    fn upload_indices(&mut self, indices: &[u32]);

    /// Indexed triangles.
    fn draw_elements(&mut self, index_count: usize);
    fn draw_arrays(&mut self, topology: Topology, vertex_count: usize);

    fn set_viewport(&mut self, width: u32, height: u32);

    /// `Some` enables scissor testing with a top-left-origin box; `None`
    /// disables it.
    fn set_scissor(&mut self, scissor: Option<IRect>);

    /// Vertex and index counts the GPU-side buffers were allocated for.
    /// `None` when uploads are unbounded.
    fn buffer_capacity(&self) -> Option<(usize, usize)> {
        None
    }

    fn wrap_mode(&self, texture: TextureId) -> WrapMode;
    fn set_wrap_mode(&mut self, texture: TextureId, mode: WrapMode);
}
